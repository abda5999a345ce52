//! Repository trait for the login attempt guard.

use async_trait::async_trait;

use crate::{Error, storage::LoginAttempt};

/// Storage for per-(email, ip) failure streaks.
///
/// The pair is unique: at most one record exists for a given email and ip.
#[async_trait]
pub trait LoginAttemptRepository: Send + Sync + 'static {
    /// Load the record for a pair, if a failure streak is in progress.
    async fn find(&self, email: &str, ip: &str) -> Result<Option<LoginAttempt>, Error>;

    /// Insert or replace the record for `attempt.email` and `attempt.ip`.
    async fn save(&self, attempt: &LoginAttempt) -> Result<LoginAttempt, Error>;

    /// Remove the record for a pair. Returns the number of rows removed,
    /// which is zero when no streak was in progress.
    async fn delete(&self, email: &str, ip: &str) -> Result<u64, Error>;
}
