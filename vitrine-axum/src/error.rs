use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde_json::json;
use thiserror::Error;
use vitrine_core::{Error, ErrorKind, time::to_display};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Blocked until {}", .until.format("%H:%M:%S"))]
    RateLimited { until: DateTime<Tz> },

    #[error("Not found")]
    NotFound,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn retry_after(&self) -> Option<i64> {
        match self {
            ApiError::RateLimited { until } => {
                Some((until.with_timezone(&Utc) - Utc::now()).num_seconds().max(1))
            }
            _ => None,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => ApiError::NotFound,
            ErrorKind::Validation => ApiError::BadRequest(err.to_string()),
            ErrorKind::Unauthorized => ApiError::Unauthorized(err.to_string()),
            ErrorKind::RateLimited => match err.retry_at() {
                Some(until) => ApiError::RateLimited {
                    until: to_display(until),
                },
                None => ApiError::InternalError(err.to_string()),
            },
            ErrorKind::Internal => ApiError::InternalError(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::InternalError(detail) => {
                tracing::error!(error = %detail, "Request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        let mut response = (status, body).into_response();
        if let Some(seconds) = self.retry_after() {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use vitrine_core::error::{AuthError, StorageError, ValidationError};

    #[test]
    fn test_error_kind_mapping() {
        let cases = [
            (
                Error::Storage(StorageError::NotFound),
                StatusCode::NOT_FOUND,
            ),
            (
                Error::Validation(ValidationError::InvalidField("title".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::Auth(AuthError::NotOwner("item".to_string())),
                StatusCode::UNAUTHORIZED,
            ),
            (
                Error::Auth(AuthError::RateLimited {
                    until: Utc::now() + Duration::minutes(5),
                }),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                Error::Storage(StorageError::Database("boom".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_rate_limited_renders_display_clock() {
        let until = Utc.with_ymd_and_hms(2030, 1, 15, 12, 0, 0).unwrap();
        let err = ApiError::from(Error::Auth(AuthError::RateLimited { until }));
        assert_eq!(err.to_string(), "Blocked until 13:00:00");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = ApiError::InternalError("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Internal server error");
        assert_eq!(body["code"], 500);
    }

    #[test]
    fn test_retry_after_header() {
        let until = to_display(Utc::now() + Duration::minutes(5));
        let response = ApiError::RateLimited { until }.into_response();

        let retry: i64 = response.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry > 290 && retry <= 300);
    }
}
