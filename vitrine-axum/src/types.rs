use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use vitrine_core::time::DISPLAY_TZ;

/// Body of the guarded login request. Only `email` is read by the guard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginGuardOptions {
    /// Path of the login route. Only `POST` requests to it are guarded.
    pub login_path: String,
    /// Largest login body read before answering 413.
    pub body_limit: usize,
    /// Zone the lockout expiry is shown in.
    pub timezone: Tz,
    /// Key on `X-Forwarded-For` / `X-Real-IP` instead of the peer address.
    /// Only enable behind a proxy that overwrites these headers.
    pub trust_forwarded_headers: bool,
}

impl Default for LoginGuardOptions {
    fn default() -> Self {
        Self {
            login_path: "/v1/login/access-token".to_string(),
            body_limit: 64 * 1024,
            timezone: DISPLAY_TZ,
            trust_forwarded_headers: false,
        }
    }
}

impl LoginGuardOptions {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
            ..Default::default()
        }
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_forwarded_headers(mut self, trust: bool) -> Self {
        self.trust_forwarded_headers = trust;
        self
    }
}
