//! Consistent JSON error responses.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use hireboard_infra::{DispatchError, InvocationStoreError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn dispatch_error_to_response(err: DispatchError) -> axum::response::Response {
    match err {
        DispatchError::Store(e) => store_error_to_response(e),
    }
}

pub fn store_error_to_response(err: InvocationStoreError) -> axum::response::Response {
    match err {
        InvocationStoreError::NotFound(id) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("invocation {id}"))
        }
        InvocationStoreError::AlreadyExists(id) => json_error(
            StatusCode::CONFLICT,
            "conflict",
            format!("invocation {id} already exists"),
        ),
        InvocationStoreError::Storage(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}
