use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, ephemeral port, digest period long enough to
        // stay quiet for the duration of a test.
        let app = hireboard_api::app::build_app(Duration::from_secs(3_600)).await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn wait_for_succeeded(client: &reqwest::Client, base_url: &str, at_least: u64) {
    // Delivery is asynchronous (202 then background execution); poll the
    // operator stats until the runner has caught up.
    for _ in 0..100 {
        let stats: serde_json::Value = client
            .get(format!("{}/admin/stats", base_url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        if stats["runner"]["invocations_succeeded"].as_u64().unwrap_or(0) >= at_least {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("runner did not process {at_least} invocation(s) within timeout");
}

#[tokio::test]
async fn health_is_live() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn handshake_enumerates_the_registry() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .get(format!("{}/api/functions", srv.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["app"], "hireboard");
    let functions = body["functions"].as_array().unwrap();
    assert_eq!(functions.len(), 12);
    assert!(functions
        .iter()
        .any(|f| f["slug"] == "summarize-resume" && f["trigger"]["kind"] == "event"));
    assert!(functions
        .iter()
        .any(|f| f["slug"] == "prepare-daily-digest" && f["trigger"]["kind"] == "periodic"));
}

#[tokio::test]
async fn registration_sync_reports_the_same_set_with_a_timestamp() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .put(format!("{}/api/functions", srv.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["functions"].as_array().unwrap().len(), 12);
    assert!(body["synced_at"].is_string());
}

#[tokio::test]
async fn malformed_delivery_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/functions", srv.base_url))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_body");

    let res = client
        .post(format!("{}/api/functions", srv.base_url))
        .json(&json!({ "name": "", "data": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_event");
}

#[tokio::test]
async fn unknown_event_is_accepted_with_zero_invocations() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/functions", srv.base_url))
        .json(&json!({ "name": "something.else", "data": {} }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["event_id"].is_string());
    assert_eq!(body["invocations"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn delivered_lifecycle_event_is_executed_in_the_background() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/functions", srv.base_url))
        .json(&json!({
            "name": "user.created",
            "data": {
                "id": Uuid::now_v7(),
                "name": "Ada",
                "email": "ada@example.com",
            },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["invocations"].as_array().unwrap().len(), 1);

    wait_for_succeeded(&client, &srv.base_url, 1).await;
}

#[tokio::test]
async fn fatal_invocations_surface_as_dead_letters_and_can_be_retried() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    // Membership for endpoints that were never created: permanent input
    // error, dead-lettered without retries.
    let res = client
        .post(format!("{}/api/functions", srv.base_url))
        .json(&json!({
            "name": "organizationMembership.created",
            "data": { "user_id": Uuid::now_v7(), "org_id": Uuid::now_v7() },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    let mut entry_id = None;
    for _ in 0..100 {
        let body: serde_json::Value = client
            .get(format!("{}/admin/dead-letters", srv.base_url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if body["count"].as_u64().unwrap_or(0) >= 1 {
            entry_id = Some(
                body["dead_letters"][0]["invocation"]["id"]
                    .as_str()
                    .unwrap()
                    .to_string(),
            );
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let entry_id = entry_id.expect("invocation was not dead-lettered within timeout");

    let res = client
        .post(format!("{}/admin/dead-letters/{}/retry", srv.base_url, entry_id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
}
