use axum::{routing::get, Router};

pub mod admin;
pub mod ingress;
pub mod system;

/// Router for all endpoints except the bare liveness probe.
pub fn router() -> Router {
    Router::new()
        .route(
            "/api/functions",
            get(ingress::introspect)
                .post(ingress::deliver)
                .put(ingress::sync_registration),
        )
        .nest("/admin", admin::router())
}
