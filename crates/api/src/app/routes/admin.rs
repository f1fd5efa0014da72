//! Operator routes: queue visibility and dead-letter replay.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use hireboard_core::InvocationId;
use hireboard_infra::InvocationStore;

use crate::app::errors::{json_error, store_error_to_response};
use crate::app::services::AppServices;

const DEAD_LETTER_LIMIT: usize = 100;

pub fn router() -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/dead-letters", get(dead_letters))
        .route("/dead-letters/:id/retry", post(retry_dead_letter))
}

async fn stats(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let queue = match services.invocations.stats() {
        Ok(stats) => stats,
        Err(e) => return store_error_to_response(e),
    };

    Json(json!({
        "started_at": services.started_at,
        "queue": queue,
        "runner": services.runner_stats(),
    }))
    .into_response()
}

async fn dead_letters(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.invocations.list_dead_letters(DEAD_LETTER_LIMIT) {
        Ok(entries) => Json(json!({
            "count": entries.len(),
            "dead_letters": entries,
        }))
        .into_response(),
        Err(e) => store_error_to_response(e),
    }
}

async fn retry_dead_letter(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: InvocationId = match id.parse() {
        Ok(id) => id,
        Err(_) => return json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid invocation id"),
    };

    match services.invocations.retry_dead_letter(id) {
        Ok(invocation) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "invocation_id": invocation.id,
                "function": invocation.function_slug,
                "attempt": invocation.attempt,
            })),
        )
            .into_response(),
        Err(e) => store_error_to_response(e),
    }
}
