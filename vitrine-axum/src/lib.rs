//! # Vitrine Axum Integration
//!
//! Middleware that puts the Vitrine login guard in front of an existing login
//! route. The route itself stays in your application; the guard reads the
//! login body, rejects locked (email, ip) pairs with `429 Too Many Requests`
//! and records the outcome once your handler has answered.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::{Router, http::StatusCode, routing::post};
//! use vitrine::VitrineBuilder;
//! use vitrine_axum::{LoginGuardState, with_login_guard};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let vitrine = VitrineBuilder::new()
//!         .with_sqlite("sqlite://vitrine.db?mode=rwc")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     let app = Router::new().route("/v1/login/access-token", post(login));
//!     let app = with_login_guard(app, LoginGuardState::from_vitrine(&vitrine));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(
//!         listener,
//!         app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
//!     )
//!     .await?;
//!     Ok(())
//! }
//!
//! async fn login() -> StatusCode {
//!     StatusCode::UNAUTHORIZED
//! }
//! ```

mod error;
mod extractors;
mod middleware;
mod types;

pub use error::{ApiError, Result};
pub use extractors::ClientIp;
pub use middleware::{LoginGuardState, login_guard};
pub use types::{LoginGuardOptions, LoginRequest};

use axum::Router;
use vitrine_core::repositories::LoginAttemptRepository;

/// Wrap every route of `router` with [`login_guard`].
///
/// Only `POST` requests to [`LoginGuardOptions::login_path`] are inspected.
pub fn with_login_guard<R>(router: Router, state: LoginGuardState<R>) -> Router
where
    R: LoginAttemptRepository,
{
    router.layer(axum::middleware::from_fn_with_state(
        state,
        login_guard::<R>,
    ))
}
