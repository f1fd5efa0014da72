//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: platform wiring (directory store, registry, dispatcher,
//!   runner, scheduler)
//! - `routes/`: HTTP routes + handlers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(digest_period: Duration) -> Router {
    let directory = services::directory_store().await;
    let services = Arc::new(services::build_services(directory, digest_period));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(services))
        .layer(ServiceBuilder::new())
}
