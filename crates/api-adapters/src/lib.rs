//! # api-adapters
//!
//! The HTTP surface of the forum. Handlers translate requests into service
//! calls and `DomainError`s into `{"errors": [...]}` responses; they hold no
//! business rules of their own.

pub mod metrics;

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
pub mod state;

pub use metrics::Metrics;

#[cfg(feature = "web-axum")]
pub use error::ApiError;
#[cfg(feature = "web-axum")]
pub use state::AppState;

#[cfg(feature = "web-axum")]
use axum::{
    routing::{get, post},
    Router,
};

/// Builds the full application: versioned API routes, operational endpoints
/// and the middleware stack.
#[cfg(feature = "web-axum")]
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/category", get(handlers::list_categories).post(handlers::create_category))
        .route("/category/{category}", get(handlers::category_feed))
        .route("/thread", post(handlers::create_thread))
        .route("/thread/{id}", get(handlers::view_thread))
        .route("/post", post(handlers::create_post))
        .route("/user/{username}", get(handlers::view_user))
        .route("/log", post(handlers::record_view))
        .route("/log/top-threads", get(handlers::top_threads));

    let app = Router::new()
        .nest("/api/v1", api)
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics));

    middleware::apply(app, state.clone()).with_state(state)
}
