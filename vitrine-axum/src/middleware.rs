use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use vitrine::Vitrine;
use vitrine_core::{
    repositories::{LoginAttemptRepository, LoginAttemptRepositoryAdapter, RepositoryProvider},
    services::LoginGuardService,
    time::in_zone,
};

use crate::{error::ApiError, extractors::ClientIp, types::*};

pub struct LoginGuardState<R: LoginAttemptRepository> {
    pub guard: Arc<LoginGuardService<R>>,
    pub options: LoginGuardOptions,
}

impl<R: LoginAttemptRepository> Clone for LoginGuardState<R> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            options: self.options.clone(),
        }
    }
}

impl<R: LoginAttemptRepository> LoginGuardState<R> {
    pub fn new(guard: Arc<LoginGuardService<R>>) -> Self {
        Self {
            guard,
            options: LoginGuardOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoginGuardOptions) -> Self {
        self.options = options;
        self
    }
}

impl<P: RepositoryProvider> LoginGuardState<LoginAttemptRepositoryAdapter<P>> {
    /// Guard of a Vitrine instance, showing lockouts in its display zone.
    pub fn from_vitrine(vitrine: &Vitrine<P>) -> Self {
        Self::new(vitrine.login_guard()).with_options(
            LoginGuardOptions::default().with_timezone(vitrine.scheduler_config().timezone),
        )
    }
}

/// Count failed logins per (email, ip) and reject locked pairs with 429.
///
/// Requests other than `POST` to the configured login path pass straight
/// through. The login body is read here and handed to the handler unchanged.
/// A 200 from the handler counts as a successful login, anything else as a
/// failure.
pub async fn login_guard<R>(
    State(state): State<LoginGuardState<R>>,
    request: Request,
    next: Next,
) -> Response
where
    R: LoginAttemptRepository,
{
    if request.method() != Method::POST
        || request.uri().path() != state.options.login_path
        || !state.guard.is_enabled()
    {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let bytes = match read_body(body, state.options.body_limit).await {
        Ok(bytes) => bytes,
        Err(e) => return e.into_response(),
    };

    let email = match serde_json::from_slice::<LoginRequest>(&bytes) {
        Ok(login) if !login.email.trim().is_empty() => login.email,
        _ => {
            return ApiError::BadRequest(
                "Email is not specified or the request body is incorrect".to_string(),
            )
            .into_response();
        }
    };
    let ip = ClientIp::from_parts(&parts, state.options.trust_forwarded_headers);

    let status = match state.guard.inspect(&email, ip.as_str()).await {
        Ok(status) => status,
        Err(e) => return ApiError::InternalError(e.to_string()).into_response(),
    };

    if let Some(until) = status.locked_until.filter(|_| status.is_locked) {
        tracing::info!(email = %email, ip = %ip.as_str(), "Rejected login from locked pair");
        return ApiError::RateLimited {
            until: in_zone(until, state.options.timezone),
        }
        .into_response();
    }

    let response = next
        .run(Request::from_parts(parts, Body::from(bytes)))
        .await;

    let success = response.status() == StatusCode::OK;
    if let Err(e) = state
        .guard
        .record_outcome(&email, ip.as_str(), success)
        .await
    {
        tracing::error!(
            email = %email,
            ip = %ip.as_str(),
            error = %e,
            "Failed to record login outcome"
        );
    }

    response
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        let inner = e.into_inner();
        if inner.is::<LengthLimitError>() {
            ApiError::PayloadTooLarge
        } else {
            tracing::debug!(error = %inner, "Failed to read login body");
            ApiError::BadRequest("Failed to read request body".to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        net::SocketAddr,
        sync::Mutex,
    };

    use async_trait::async_trait;
    use axum::{
        Json, Router,
        extract::ConnectInfo,
        http::header,
        routing::{get, post},
    };
    use tower::ServiceExt;
    use vitrine_core::{Error, LoginAttempt, LoginGuardConfig, error::StorageError};

    use super::*;
    use crate::with_login_guard;

    const LOGIN: &str = "/v1/login/access-token";

    #[derive(Default)]
    struct MockLoginAttemptRepository {
        attempts: Mutex<HashMap<(String, String), LoginAttempt>>,
    }

    #[async_trait]
    impl LoginAttemptRepository for MockLoginAttemptRepository {
        async fn find(&self, email: &str, ip: &str) -> Result<Option<LoginAttempt>, Error> {
            let attempts = self.attempts.lock().unwrap();
            Ok(attempts.get(&(email.to_string(), ip.to_string())).cloned())
        }

        async fn save(&self, attempt: &LoginAttempt) -> Result<LoginAttempt, Error> {
            let mut attempts = self.attempts.lock().unwrap();
            attempts.insert(
                (attempt.email.clone(), attempt.ip.clone()),
                attempt.clone(),
            );
            Ok(attempt.clone())
        }

        async fn delete(&self, email: &str, ip: &str) -> Result<u64, Error> {
            let mut attempts = self.attempts.lock().unwrap();
            Ok(attempts
                .remove(&(email.to_string(), ip.to_string()))
                .map_or(0, |_| 1))
        }
    }

    struct BrokenLoginAttemptRepository;

    #[async_trait]
    impl LoginAttemptRepository for BrokenLoginAttemptRepository {
        async fn find(&self, _email: &str, _ip: &str) -> Result<Option<LoginAttempt>, Error> {
            Err(StorageError::Database("connection refused".to_string()).into())
        }

        async fn save(&self, _attempt: &LoginAttempt) -> Result<LoginAttempt, Error> {
            Err(StorageError::Database("connection refused".to_string()).into())
        }

        async fn delete(&self, _email: &str, _ip: &str) -> Result<u64, Error> {
            Err(StorageError::Database("connection refused".to_string()).into())
        }
    }

    async fn login_handler(Json(login): Json<LoginRequest>) -> StatusCode {
        if login.password == "secret" {
            StatusCode::OK
        } else {
            StatusCode::UNAUTHORIZED
        }
    }

    /// App behind a proxy that sets `X-Forwarded-For`.
    fn app<R: LoginAttemptRepository>(repository: Arc<R>, config: LoginGuardConfig) -> Router {
        app_with(
            repository,
            config,
            LoginGuardOptions::new(LOGIN)
                .with_body_limit(1024)
                .with_forwarded_headers(true),
        )
    }

    fn app_with<R: LoginAttemptRepository>(
        repository: Arc<R>,
        config: LoginGuardConfig,
        options: LoginGuardOptions,
    ) -> Router {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let router = Router::new()
            .route(LOGIN, post(login_handler).get(|| async { "login form" }))
            .route("/health", get(|| async { "ok" }));

        let state = LoginGuardState::new(Arc::new(LoginGuardService::new(repository, config)))
            .with_options(options);

        with_login_guard(router, state)
    }

    fn login(email: &str, password: &str, ip: &str) -> Request {
        Request::builder()
            .method(Method::POST)
            .uri(LOGIN)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(
                serde_json::json!({ "email": email, "password": password }).to_string(),
            ))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_locks_after_three_failures() {
        let repository = Arc::new(MockLoginAttemptRepository::default());
        let app = app(repository.clone(), LoginGuardConfig::default());

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(login("a@x.com", "wrong", "1.2.3.4"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        // Even the right password is rejected while locked
        let response = app
            .clone()
            .oneshot(login("a@x.com", "secret", "1.2.3.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let retry: i64 = response.headers()[header::RETRY_AFTER]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert!(retry > 4 * 60 && retry <= 5 * 60);

        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("Blocked until "));
        assert_eq!(body["code"], 429);

        // The rejected request was not counted
        let stored = repository.find("a@x.com", "1.2.3.4").await.unwrap().unwrap();
        assert_eq!(stored.attempts, 3);

        // A different address is unaffected
        let response = app
            .oneshot(login("a@x.com", "secret", "5.6.7.8"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_success_clears_streak() {
        let repository = Arc::new(MockLoginAttemptRepository::default());
        let app = app(repository.clone(), LoginGuardConfig::default());

        for _ in 0..2 {
            app.clone()
                .oneshot(login("a@x.com", "wrong", "1.2.3.4"))
                .await
                .unwrap();
        }
        assert!(repository.find("a@x.com", "1.2.3.4").await.unwrap().is_some());

        let response = app
            .oneshot(login("a@x.com", "secret", "1.2.3.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(repository.find("a@x.com", "1.2.3.4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_malformed_body() {
        let repository = Arc::new(MockLoginAttemptRepository::default());
        let app = app(repository.clone(), LoginGuardConfig::default());

        let not_json = Request::builder()
            .method(Method::POST)
            .uri(LOGIN)
            .body(Body::from("email=a@x.com"))
            .unwrap();
        let response = app.clone().oneshot(not_json).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], 400);

        let response = app
            .oneshot(login("  ", "wrong", "1.2.3.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(repository.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_oversized_body() {
        let app = app(
            Arc::new(MockLoginAttemptRepository::default()),
            LoginGuardConfig::default(),
        );

        let request = Request::builder()
            .method(Method::POST)
            .uri(LOGIN)
            .body(Body::from(format!(
                r#"{{"email":"a@x.com","password":"{}"}}"#,
                "x".repeat(2048)
            )))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_other_routes_pass_through() {
        let repository = Arc::new(MockLoginAttemptRepository::default());
        let app = app(repository.clone(), LoginGuardConfig::default());

        let form = Request::builder().uri(LOGIN).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(form).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let health = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(health).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert!(repository.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_guard_records_nothing() {
        let repository = Arc::new(MockLoginAttemptRepository::default());
        let app = app(repository.clone(), LoginGuardConfig::disabled());

        for _ in 0..5 {
            let response = app
                .clone()
                .oneshot(login("a@x.com", "wrong", "1.2.3.4"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        assert!(repository.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_closed() {
        let app = app(
            Arc::new(BrokenLoginAttemptRepository),
            LoginGuardConfig::default(),
        );

        let response = app
            .oneshot(login("a@x.com", "secret", "1.2.3.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_peer_address_used_without_proxy_headers() {
        let repository = Arc::new(MockLoginAttemptRepository::default());
        let app = app(repository.clone(), LoginGuardConfig::default());

        let mut request = Request::builder()
            .method(Method::POST)
            .uri(LOGIN)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"a@x.com","password":"wrong"}"#))
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo("192.0.2.9:5000".parse::<SocketAddr>().unwrap()));

        app.oneshot(request).await.unwrap();
        assert!(repository.find("a@x.com", "192.0.2.9").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_spoofed_forwarded_for_does_not_reset_lockout() {
        let repository = Arc::new(MockLoginAttemptRepository::default());
        let app = app_with(
            repository.clone(),
            LoginGuardConfig::default(),
            LoginGuardOptions::new(LOGIN),
        );

        let from_peer = |n: usize, password: &str| {
            let mut request = login("a@x.com", password, &format!("10.0.0.{n}"));
            request
                .extensions_mut()
                .insert(ConnectInfo("192.0.2.9:5000".parse::<SocketAddr>().unwrap()));
            request
        };

        for n in 0..3 {
            let response = app.clone().oneshot(from_peer(n, "wrong")).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let response = app.oneshot(from_peer(3, "secret")).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let attempts = repository.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(attempts.contains_key(&("a@x.com".to_string(), "192.0.2.9".to_string())));
    }
}
