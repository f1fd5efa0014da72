use std::time::Duration;

#[tokio::main]
async fn main() {
    hireboard_observability::init();

    let bind = std::env::var("HIREBOARD_BIND").unwrap_or_else(|_| {
        tracing::info!("HIREBOARD_BIND not set; using 0.0.0.0:8080");
        "0.0.0.0:8080".to_string()
    });

    let digest_period = std::env::var("HIREBOARD_DIGEST_PERIOD_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| {
            tracing::info!("HIREBOARD_DIGEST_PERIOD_SECS not set; using 86400 (daily)");
            Duration::from_secs(86_400)
        });

    let app = hireboard_api::app::build_app(digest_period).await;

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
