use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Failed-login state for one (email, ip) pair.
///
/// A record exists only while a streak of failures is unresolved: it is created
/// by the first failure and deleted by the next successful login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub id: Uuid,
    pub email: String,
    pub ip: String,
    pub attempts: u32,
    pub last_attempt_at: DateTime<Utc>,
    pub banned_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoginAttempt {
    /// A fresh record with no failures counted yet.
    pub fn new(email: &str, ip: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.to_string(),
            ip: ip.to_string(),
            attempts: 0,
            last_attempt_at: now,
            banned_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_banned_at(&self, now: DateTime<Utc>) -> bool {
        self.banned_until.is_some_and(|until| until > now)
    }
}

/// Result of inspecting or updating the lockout state of an (email, ip) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockoutStatus {
    pub email: String,
    pub ip: String,
    pub failed_attempts: u32,
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutStatus {
    /// Status of a pair with no recorded failures.
    pub fn clear(email: &str, ip: &str) -> Self {
        Self {
            email: email.to_string(),
            ip: ip.to_string(),
            failed_attempts: 0,
            is_locked: false,
            locked_until: None,
        }
    }

    pub fn from_attempt(attempt: &LoginAttempt, now: DateTime<Utc>) -> Self {
        let is_locked = attempt.is_banned_at(now);
        Self {
            email: attempt.email.clone(),
            ip: attempt.ip.clone(),
            failed_attempts: attempt.attempts,
            is_locked,
            locked_until: if is_locked { attempt.banned_until } else { None },
        }
    }

    pub fn is_allowed(&self) -> bool {
        !self.is_locked
    }

    /// Seconds until the lock lifts, `None` when not locked.
    pub fn retry_after_seconds(&self) -> Option<i64> {
        self.locked_until
            .map(|until| (until - Utc::now()).num_seconds().max(0))
    }
}
