//! Health and Prometheus endpoints.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use eyre::{Result, WrapErr};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tracing::info;

/// Install the global Prometheus recorder.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .wrap_err("Failed to install Prometheus recorder")
}

pub fn router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/metrics", get(render))
        .with_state(handle)
}

async fn render(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}

pub async fn serve(handle: PrometheusHandle, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind admin server to {addr}"))?;

    info!(port, "Admin server listening");
    axum::serve(listener, router(handle))
        .await
        .wrap_err("Admin server failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn spawn(handle: PrometheusHandle) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(handle)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_health_and_metrics_endpoints() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let base = spawn(handle).await;

        let health = reqwest::get(format!("{base}/health")).await.unwrap();
        assert!(health.status().is_success());
        assert_eq!(health.text().await.unwrap(), "ok");

        let metrics = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert!(metrics.status().is_success());
    }
}
