use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::{RecommendationError, RecommendationResult};
use crate::models::TaskId;

/// Delivers a finished ranking to the external task store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultCallback: Send + Sync {
    /// `result` is the JSON-encoded list of item ids, e.g. `[11,10,12]`.
    async fn deliver(&self, task_id: TaskId, result: &str) -> RecommendationResult<()>;
}

/// Posts results to an HTTP endpoint as `?task_id=<id>&result=<json>`.
///
/// Any transport error or non-2xx status is a callback failure. No request
/// timeout is set.
#[derive(Debug, Clone)]
pub struct HttpResultCallback {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpResultCallback {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ResultCallback for HttpResultCallback {
    #[instrument(skip(self, result), fields(endpoint = %self.endpoint))]
    async fn deliver(&self, task_id: TaskId, result: &str) -> RecommendationResult<()> {
        let task_id = task_id.to_string();
        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[("task_id", task_id.as_str()), ("result", result)])
            .send()
            .await
            .map_err(|e| RecommendationError::Callback(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecommendationError::Callback(format!(
                "endpoint returned {status}"
            )));
        }

        debug!(%status, "Result delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Received = Arc<Mutex<Vec<HashMap<String, String>>>>;

    async fn accept(
        State(received): State<Received>,
        Query(params): Query<HashMap<String, String>>,
    ) -> StatusCode {
        received.lock().unwrap().push(params);
        StatusCode::OK
    }

    async fn spawn_store() -> (String, Received) {
        let received = Received::default();
        let app = Router::new()
            .route("/send_task_result", post(accept))
            .route("/broken", post(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{address}"), received)
    }

    #[tokio::test]
    async fn test_posts_task_id_and_result() {
        let (base, received) = spawn_store().await;
        let callback = HttpResultCallback::new(format!("{base}/send_task_result"));

        callback.deliver(1, "[11,10,12]").await.unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["task_id"], "1");
        assert_eq!(received[0]["result"], "[11,10,12]");
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let (base, _) = spawn_store().await;
        let callback = HttpResultCallback::new(format!("{base}/broken"));

        let result = callback.deliver(1, "[]").await;
        assert!(matches!(result, Err(RecommendationError::Callback(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let callback = HttpResultCallback::new(format!("http://{address}/send_task_result"));
        assert!(callback.deliver(1, "[]").await.is_err());
    }
}
