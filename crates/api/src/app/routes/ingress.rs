//! The single event-ingress route.
//!
//! One path, three verbs:
//!
//! - `GET`  — handshake/introspection: app identity plus the function registry
//! - `POST` — event delivery: validate, assign an id, hand to the dispatcher
//! - `PUT`  — registration sync: the set of functions is fixed at startup, so
//!   this re-enumerates the registry and stamps the sync time
//!
//! The ingress never retries anything itself; it only delegates. An event
//! name no function is registered for is accepted (202, zero invocations)
//! because unknown events are normal for a webhook endpoint.

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use hireboard_events::{Event, Trigger};

use crate::app::errors::{dispatch_error_to_response, json_error};
use crate::app::services::AppServices;

#[derive(Debug, Deserialize)]
pub struct DeliverEventRequest {
    pub name: String,
    #[serde(default)]
    pub data: Option<JsonValue>,
}

fn registry_payload(services: &AppServices) -> JsonValue {
    let functions: Vec<JsonValue> = services
        .registry
        .functions()
        .iter()
        .map(|f| match f.trigger() {
            Trigger::Event { name } => json!({
                "slug": f.slug(),
                "trigger": { "kind": "event", "event": name },
            }),
            Trigger::Periodic { name, every } => json!({
                "slug": f.slug(),
                "trigger": { "kind": "periodic", "event": name, "every_secs": every.as_secs() },
            }),
        })
        .collect();

    json!({
        "app": "hireboard",
        "functions": functions,
    })
}

pub async fn introspect(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(registry_payload(&services))
}

pub async fn sync_registration(
    Extension(services): Extension<Arc<AppServices>>,
) -> impl IntoResponse {
    let mut payload = registry_payload(&services);
    payload["synced_at"] = json!(Utc::now());
    Json(payload)
}

pub async fn deliver(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<DeliverEventRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text());
        }
    };

    if request.name.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "invalid_event", "event name is required");
    }

    let event = Event::new(request.name, request.data.unwrap_or_else(|| json!({})));
    let event_id = event.id();

    let ids = match services.dispatcher.dispatch(&event) {
        Ok(ids) => ids,
        Err(e) => return dispatch_error_to_response(e),
    };

    if ids.is_empty() {
        tracing::debug!(event = %event.name(), "delivered event matched no functions");
    }

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "event_id": event_id,
            "invocations": ids,
        })),
    )
        .into_response()
}
