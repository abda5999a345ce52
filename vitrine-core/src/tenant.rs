//! Tenant identification.
//!
//! Each tenant runs its own reminder scheduler against its own store; the
//! tenant id labels that scheduler's logs and tasks.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

const MAX_TENANT_ID_LEN: usize = 253;

/// Strongly-typed tenant identifier, usually the tenant's domain name.
///
/// # Validation Rules
/// - Non-empty string
/// - ASCII alphanumeric characters plus `-`, `_` and `.`
/// - At most 253 characters (the length limit of a domain name)
///
/// ```rust
/// use vitrine_core::tenant::TenantId;
///
/// let tenant = TenantId::new("shop.example.com").unwrap();
/// assert_eq!(tenant.as_str(), "shop.example.com");
/// assert!(TenantId::new("no spaces").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(TenantId(id))
    }

    /// The tenant used by single-tenant deployments.
    pub fn default_tenant() -> Self {
        TenantId("default".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), ValidationError> {
        if id.is_empty() {
            return Err(ValidationError::InvalidTenantId(
                "tenant id cannot be empty".to_string(),
            ));
        }

        if id.len() > MAX_TENANT_ID_LEN {
            return Err(ValidationError::InvalidTenantId(format!(
                "tenant id cannot exceed {MAX_TENANT_ID_LEN} characters"
            )));
        }

        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(ValidationError::InvalidTenantId(format!(
                "tenant id contains invalid character '{c}'"
            )));
        }

        Ok(())
    }
}

impl Default for TenantId {
    fn default() -> Self {
        Self::default_tenant()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TenantId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TenantId::new(value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}
