use crate::{
    Error,
    error::{StorageError, ValidationError},
};

/// Extension trait turning `Ok(None)` from a lookup into `StorageError::NotFound`.
pub trait FoundExt<T> {
    fn found(self) -> Result<T, Error>;
}

impl<T> FoundExt<T> for Result<Option<T>, Error> {
    fn found(self) -> Result<T, Error> {
        self.and_then(|value| value.ok_or(Error::Storage(StorageError::NotFound)))
    }
}

/// Reject blank strings for required text fields.
pub fn require_text(value: &str, field_name: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(format!(
            "{field_name} cannot be empty"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_found_ext() {
        let present: Result<Option<u8>, Error> = Ok(Some(7));
        assert_eq!(present.found().unwrap(), 7);

        let absent: Result<Option<u8>, Error> = Ok(None);
        assert!(absent.found().unwrap_err().is_not_found());
    }

    #[test]
    fn test_require_text() {
        assert!(require_text("Spring sale", "Title").is_ok());
        assert!(require_text("   ", "Title").is_err());
    }
}
