pub mod utilities;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ordering error: {0}")]
    Ordering(#[from] OrderingError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not the owner of {0}")]
    NotOwner(String),

    #[error("Too many failed login attempts, blocked until {until}")]
    RateLimited { until: DateTime<Utc> },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid position {0}: positions start at 0")]
    InvalidPosition(i32),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid tenant id: {0}")]
    InvalidTenantId(String),
}

#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("Failed to fetch rows of {kind} in partition '{partition}' from position {position}: {reason}")]
    Fetch {
        kind: &'static str,
        partition: String,
        position: i32,
        reason: String,
    },

    #[error("Failed to move {kind} {id} to position {position}: {reason}")]
    Shift {
        kind: &'static str,
        id: uuid::Uuid,
        position: i32,
        reason: String,
    },

    #[error("Cannot move {kind} {id} past position {position}")]
    Overflow {
        kind: &'static str,
        id: uuid::Uuid,
        position: i32,
    },
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification transport failed: {0}")]
    Transport(String),

    #[error("No recipient for event {0}")]
    MissingRecipient(uuid::Uuid),
}

/// The coarse classes callers translate into responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Unauthorized,
    RateLimited,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Storage(StorageError::NotFound) => ErrorKind::NotFound,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Auth(AuthError::RateLimited { .. }) => ErrorKind::RateLimited,
            Error::Auth(_) => ErrorKind::Unauthorized,
            Error::Storage(_) | Error::Ordering(_) | Error::Notification(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_validation_error(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    /// Retry instant carried by a rate-limit error.
    pub fn retry_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Error::Auth(AuthError::RateLimited { until }) => Some(*until),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let storage_error = Error::Storage(StorageError::NotFound);
        assert_eq!(storage_error.to_string(), "Storage error: Record not found");

        let validation_error = Error::Validation(ValidationError::InvalidPosition(-1));
        assert_eq!(
            validation_error.to_string(),
            "Validation error: Invalid position -1: positions start at 0"
        );
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::Storage(StorageError::NotFound).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            Error::Storage(StorageError::Database("boom".to_string())).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            Error::Validation(ValidationError::MissingField("title".to_string())).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            Error::Auth(AuthError::NotOwner("event".to_string())).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            Error::Auth(AuthError::RateLimited { until: Utc::now() }).kind(),
            ErrorKind::RateLimited
        );
        assert_eq!(
            Error::Notification(NotificationError::Transport("smtp".to_string())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_retry_at_only_for_rate_limit() {
        let until = Utc::now();
        assert_eq!(
            Error::Auth(AuthError::RateLimited { until }).retry_at(),
            Some(until)
        );
        assert!(Error::Auth(AuthError::Unauthorized).retry_at().is_none());
    }

    #[test]
    fn test_error_from_conversions() {
        let error: Error = ValidationError::MissingField("email".to_string()).into();
        assert!(error.is_validation_error());

        let error: Error = StorageError::NotFound.into();
        assert!(error.is_not_found());
        assert!(error.is_storage_error());
    }
}
