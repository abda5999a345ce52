//! Configuration for the login guard, the reminder scheduler and the store pool.
//!
//! All configuration types provide a `Default` matching production behaviour and
//! `with_*` setters for overrides.

use chrono::Duration;
use chrono_tz::Tz;

use crate::time::DISPLAY_TZ;

/// One step of the lockout escalation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutTier {
    /// Failed attempts needed to reach this tier.
    pub min_attempts: u32,
    /// Ban length, counted from the failed attempt that reached the tier.
    pub ban: Duration,
}

impl LockoutTier {
    pub const fn new(min_attempts: u32, ban: Duration) -> Self {
        Self { min_attempts, ban }
    }
}

/// Length of the top-tier ban; long enough to be permanent in practice.
pub fn permanent_ban() -> Duration {
    Duration::days(365 * 100)
}

/// Configuration for the login attempt guard.
///
/// # Example
///
/// ```rust
/// use chrono::Duration;
/// use vitrine_core::config::{LockoutTier, LoginGuardConfig};
///
/// let config = LoginGuardConfig::default();
/// assert_eq!(config.ban_for(3), Some(Duration::minutes(5)));
/// assert_eq!(config.ban_for(2), None);
///
/// let strict = LoginGuardConfig::default()
///     .with_tiers(vec![LockoutTier::new(1, Duration::hours(1))]);
/// assert_eq!(strict.ban_for(1), Some(Duration::hours(1)));
/// ```
#[derive(Debug, Clone)]
pub struct LoginGuardConfig {
    /// When disabled every request is allowed and nothing is recorded.
    pub enabled: bool,
    tiers: Vec<LockoutTier>,
}

impl Default for LoginGuardConfig {
    /// 3 failures → 5 minutes, 6 → 10 minutes, 9 → permanent.
    fn default() -> Self {
        Self {
            enabled: true,
            tiers: Vec::new(),
        }
        .with_tiers(vec![
            LockoutTier::new(3, Duration::minutes(5)),
            LockoutTier::new(6, Duration::minutes(10)),
            LockoutTier::new(9, permanent_ban()),
        ])
    }
}

impl LoginGuardConfig {
    /// A configuration with protection switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Replace the escalation tiers. Order does not matter.
    pub fn with_tiers(mut self, mut tiers: Vec<LockoutTier>) -> Self {
        tiers.sort_by_key(|tier| std::cmp::Reverse(tier.min_attempts));
        self.tiers = tiers;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Tiers from the highest threshold to the lowest.
    pub fn tiers(&self) -> &[LockoutTier] {
        &self.tiers
    }

    /// Ban length for a failure count, `None` below the lowest tier.
    pub fn ban_for(&self, attempts: u32) -> Option<Duration> {
        self.tiers
            .iter()
            .find(|tier| attempts >= tier.min_attempts)
            .map(|tier| tier.ban)
    }
}

/// Configuration for the background reminder scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Pause between two polls of the store.
    pub poll_interval: std::time::Duration,
    /// How far ahead of `now` a reminder may be picked up and armed on a timer.
    /// Zero selects only reminders that are already due.
    pub lookahead: Duration,
    /// Zone used when rendering reminder times.
    pub timezone: Tz,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: std::time::Duration::from_secs(60),
            lookahead: Duration::zero(),
            timezone: DISPLAY_TZ,
        }
    }
}

impl SchedulerConfig {
    pub fn with_poll_interval(mut self, interval: std::time::Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }
}

/// Connection pool sizing shared by request handlers and background tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    /// Connections kept open while idle.
    pub min_connections: u32,
    /// Connections older than this are recycled.
    pub max_lifetime: std::time::Duration,
    pub idle_timeout: std::time::Duration,
    pub acquire_timeout: std::time::Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 5,
            max_lifetime: std::time::Duration::from_secs(60 * 60),
            idle_timeout: std::time::Duration::from_secs(10 * 60),
            acquire_timeout: std::time::Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self.min_connections = self.min_connections.min(max_connections);
        self
    }

    pub fn with_min_connections(mut self, min_connections: u32) -> Self {
        self.min_connections = min_connections.min(self.max_connections);
        self
    }

    pub fn with_max_lifetime(mut self, max_lifetime: std::time::Duration) -> Self {
        self.max_lifetime = max_lifetime;
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: std::time::Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_acquire_timeout(mut self, acquire_timeout: std::time::Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }
}
