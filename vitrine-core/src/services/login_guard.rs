//! Adaptive login attempt guard.
//!
//! Failed logins are counted per (email, ip) pair. Once a pair crosses a
//! tier of [`LoginGuardConfig`] it is banned for that tier's duration:
//!
//! | failures | ban |
//! |----------|-----|
//! | 3–5 | 5 minutes |
//! | 6–8 | 10 minutes |
//! | 9+ | permanent |
//!
//! A successful login deletes the pair's record, which is the only way a ban
//! is lifted early. Further failures never shorten an existing ban.
//!
//! # Example
//!
//! ```rust,ignore
//! use vitrine_core::services::LoginGuardService;
//! use vitrine_core::config::LoginGuardConfig;
//!
//! let guard = LoginGuardService::new(repository, LoginGuardConfig::default());
//!
//! let status = guard.inspect("user@example.com", "203.0.113.7").await?;
//! if status.is_locked {
//!     // reject with 429
//! }
//!
//! // after the login handler ran
//! guard.record_outcome("user@example.com", "203.0.113.7", succeeded).await?;
//! ```

use std::sync::Arc;

use chrono::Utc;

use crate::{
    Error,
    config::LoginGuardConfig,
    repositories::LoginAttemptRepository,
    storage::{LockoutStatus, LoginAttempt},
};

/// Service tracking failed logins and deciding lockouts.
///
/// All state lives in the repository, so one service can be shared by every
/// request handler.
pub struct LoginGuardService<R: LoginAttemptRepository> {
    repository: Arc<R>,
    config: LoginGuardConfig,
}

impl<R: LoginAttemptRepository> LoginGuardService<R> {
    pub fn new(repository: Arc<R>, config: LoginGuardConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &LoginGuardConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Current lockout state of a pair. Disabled guards always report unlocked.
    pub async fn inspect(&self, email: &str, ip: &str) -> Result<LockoutStatus, Error> {
        if !self.config.enabled {
            return Ok(LockoutStatus::clear(email, ip));
        }

        let status = match self.repository.find(email, ip).await? {
            Some(attempt) => LockoutStatus::from_attempt(&attempt, Utc::now()),
            None => LockoutStatus::clear(email, ip),
        };

        Ok(status)
    }

    /// Record the result of an authentication attempt.
    pub async fn record_outcome(
        &self,
        email: &str,
        ip: &str,
        success: bool,
    ) -> Result<LockoutStatus, Error> {
        if success {
            self.record_success(email, ip).await
        } else {
            self.record_failure(email, ip).await
        }
    }

    /// Forget the failure streak of a pair. Safe to call when none exists.
    pub async fn record_success(&self, email: &str, ip: &str) -> Result<LockoutStatus, Error> {
        if !self.config.enabled {
            return Ok(LockoutStatus::clear(email, ip));
        }

        let removed = self.repository.delete(email, ip).await?;
        if removed > 0 {
            tracing::debug!(email = %email, ip = %ip, "Cleared failed login streak");
        }

        Ok(LockoutStatus::clear(email, ip))
    }

    /// Count one more failure and escalate the ban if a tier is reached.
    pub async fn record_failure(&self, email: &str, ip: &str) -> Result<LockoutStatus, Error> {
        if !self.config.enabled {
            return Ok(LockoutStatus::clear(email, ip));
        }

        let now = Utc::now();
        let mut attempt = self
            .repository
            .find(email, ip)
            .await?
            .unwrap_or_else(|| LoginAttempt::new(email, ip, now));

        attempt.attempts = attempt.attempts.saturating_add(1);
        attempt.last_attempt_at = now;
        attempt.updated_at = now;

        if let Some(ban) = self.config.ban_for(attempt.attempts) {
            let until = now + ban;
            attempt.banned_until = Some(match attempt.banned_until {
                Some(existing) if existing > until => existing,
                _ => until,
            });
        }

        let saved = self.repository.save(&attempt).await?;
        let status = LockoutStatus::from_attempt(&saved, now);

        if status.is_locked {
            tracing::warn!(
                email = %email,
                ip = %ip,
                attempts = saved.attempts,
                locked_until = ?status.locked_until,
                "Login locked after repeated failures"
            );
        }

        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LockoutTier, permanent_ban};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;

    struct MockLoginAttemptRepository {
        attempts: Mutex<Vec<LoginAttempt>>,
    }

    impl MockLoginAttemptRepository {
        fn new() -> Self {
            Self {
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn get(&self, email: &str, ip: &str) -> Option<LoginAttempt> {
            self.attempts
                .lock()
                .unwrap()
                .iter()
                .find(|a| a.email == email && a.ip == ip)
                .cloned()
        }
    }

    #[async_trait]
    impl LoginAttemptRepository for MockLoginAttemptRepository {
        async fn find(&self, email: &str, ip: &str) -> Result<Option<LoginAttempt>, Error> {
            Ok(self.get(email, ip))
        }

        async fn save(&self, attempt: &LoginAttempt) -> Result<LoginAttempt, Error> {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.retain(|a| !(a.email == attempt.email && a.ip == attempt.ip));
            attempts.push(attempt.clone());
            Ok(attempt.clone())
        }

        async fn delete(&self, email: &str, ip: &str) -> Result<u64, Error> {
            let mut attempts = self.attempts.lock().unwrap();
            let before_len = attempts.len();
            attempts.retain(|a| !(a.email == email && a.ip == ip));
            Ok((before_len - attempts.len()) as u64)
        }
    }

    const EMAIL: &str = "a@x.com";
    const IP: &str = "1.2.3.4";

    fn service() -> (
        Arc<MockLoginAttemptRepository>,
        LoginGuardService<MockLoginAttemptRepository>,
    ) {
        let repo = Arc::new(MockLoginAttemptRepository::new());
        let service = LoginGuardService::new(repo.clone(), LoginGuardConfig::default());
        (repo, service)
    }

    async fn fail_times(service: &LoginGuardService<MockLoginAttemptRepository>, n: u32) {
        for _ in 0..n {
            service.record_failure(EMAIL, IP).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_two_failures_not_locked() {
        let (_, service) = service();
        fail_times(&service, 2).await;

        let status = service.inspect(EMAIL, IP).await.unwrap();
        assert!(status.is_allowed());
        assert_eq!(status.failed_attempts, 2);
    }

    #[tokio::test]
    async fn test_three_failures_lock_for_five_minutes() {
        let (_, service) = service();
        fail_times(&service, 3).await;

        let status = service.inspect(EMAIL, IP).await.unwrap();
        assert!(status.is_locked);
        let retry = status.retry_after_seconds().unwrap();
        assert!(retry > 290 && retry <= 300, "retry was {retry}");
    }

    #[tokio::test]
    async fn test_six_failures_lock_for_ten_minutes() {
        let (_, service) = service();
        fail_times(&service, 6).await;

        let retry = service
            .inspect(EMAIL, IP)
            .await
            .unwrap()
            .retry_after_seconds()
            .unwrap();
        assert!(retry > 590 && retry <= 600, "retry was {retry}");
    }

    #[tokio::test]
    async fn test_nine_failures_lock_permanently() {
        let (_, service) = service();
        fail_times(&service, 9).await;

        let status = service.inspect(EMAIL, IP).await.unwrap();
        assert!(status.is_locked);
        let until = status.locked_until.unwrap();
        assert!(until > Utc::now() + permanent_ban() - Duration::days(1));
    }

    #[tokio::test]
    async fn test_success_deletes_record() {
        let (repo, service) = service();
        fail_times(&service, 4).await;
        assert!(service.inspect(EMAIL, IP).await.unwrap().is_locked);

        let status = service.record_outcome(EMAIL, IP, true).await.unwrap();
        assert!(status.is_allowed());
        assert!(repo.get(EMAIL, IP).is_none());
        assert!(service.inspect(EMAIL, IP).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_double_success_is_safe() {
        let (repo, service) = service();
        fail_times(&service, 1).await;

        service.record_outcome(EMAIL, IP, true).await.unwrap();
        service.record_outcome(EMAIL, IP, true).await.unwrap();

        assert!(repo.get(EMAIL, IP).is_none());
    }

    #[tokio::test]
    async fn test_pairs_tracked_separately() {
        let (_, service) = service();
        fail_times(&service, 3).await;

        assert!(
            service
                .inspect(EMAIL, "5.6.7.8")
                .await
                .unwrap()
                .is_allowed()
        );
        assert!(
            service
                .inspect("b@x.com", IP)
                .await
                .unwrap()
                .is_allowed()
        );
    }

    #[tokio::test]
    async fn test_ban_is_never_shortened() {
        let repo = Arc::new(MockLoginAttemptRepository::new());
        let config = LoginGuardConfig::default().with_tiers(vec![
            LockoutTier::new(1, Duration::hours(2)),
            LockoutTier::new(2, Duration::minutes(1)),
        ]);
        let service = LoginGuardService::new(repo.clone(), config);

        service.record_failure(EMAIL, IP).await.unwrap();
        let first = repo.get(EMAIL, IP).unwrap().banned_until.unwrap();

        service.record_failure(EMAIL, IP).await.unwrap();
        let second = repo.get(EMAIL, IP).unwrap().banned_until.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_prior_ban_persists_below_tier() {
        let (repo, service) = service();
        let now = Utc::now();
        let mut attempt = LoginAttempt::new(EMAIL, IP, now);
        attempt.attempts = 1;
        attempt.banned_until = Some(now + Duration::minutes(3));
        repo.save(&attempt).await.unwrap();

        let status = service.record_failure(EMAIL, IP).await.unwrap();
        assert_eq!(status.failed_attempts, 2);
        assert!(status.is_locked);
        assert_eq!(status.locked_until, attempt.banned_until);
    }

    #[tokio::test]
    async fn test_disabled_guard_records_nothing() {
        let repo = Arc::new(MockLoginAttemptRepository::new());
        let service = LoginGuardService::new(repo.clone(), LoginGuardConfig::disabled());

        for _ in 0..10 {
            let status = service.record_outcome(EMAIL, IP, false).await.unwrap();
            assert!(status.is_allowed());
        }

        assert!(repo.get(EMAIL, IP).is_none());
        assert!(!service.is_enabled());
    }
}
