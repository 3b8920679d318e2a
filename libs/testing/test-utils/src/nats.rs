//! Disposable NATS server for broker integration tests.

use async_nats::jetstream;
use async_nats::Client;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::nats::Nats;

const NATS_TAG: &str = "2.10";
const CLIENT_PORT: u16 = 4222;

/// NATS container started with JetStream (`-js`).
///
/// The container lives as long as this value.
///
/// ```no_run
/// use test_utils::TestNats;
///
/// # async fn example() {
/// let nats = TestNats::new().await;
/// let url = nats.connection_string();
/// // build a connector for `url` and run the code under test
/// # }
/// ```
pub struct TestNats {
    _container: ContainerAsync<Nats>,
    client: Client,
    url: String,
}

impl TestNats {
    pub async fn new() -> Self {
        let container = Nats::default()
            .with_tag(NATS_TAG)
            .with_cmd(["-js"])
            .start()
            .await
            .expect("Failed to start NATS container");

        let port = container
            .get_host_port_ipv4(CLIENT_PORT)
            .await
            .expect("Failed to get NATS port");
        let url = format!("nats://127.0.0.1:{port}");

        let client = async_nats::connect(&url)
            .await
            .expect("Failed to connect to NATS");

        tracing::info!(%url, "Test NATS ready");
        Self {
            _container: container,
            client,
            url,
        }
    }

    /// Server address for connectors under test
    pub fn connection_string(&self) -> &str {
        &self.url
    }

    /// Side-channel client for inspecting server state
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Messages still stored in `stream`; 0 when the stream does not exist.
    pub async fn stored_messages(&self, stream: &str) -> u64 {
        let jetstream = jetstream::new(self.client.clone());
        match jetstream.get_stream(stream).await {
            Ok(mut stream) => stream
                .info()
                .await
                .map(|info| info.state.messages)
                .unwrap_or(0),
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_nats::jetstream::stream::{Config, RetentionPolicy};

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_jetstream_enabled() {
        let nats = TestNats::new().await;
        let jetstream = jetstream::new(nats.client());

        jetstream
            .create_stream(Config {
                name: "fixture_queue".to_string(),
                subjects: vec!["fixture_queue".to_string()],
                retention: RetentionPolicy::WorkQueue,
                ..Default::default()
            })
            .await
            .expect("Failed to create stream");

        jetstream
            .publish("fixture_queue", "{}".into())
            .await
            .expect("Failed to publish")
            .await
            .expect("Failed to get ack");

        assert_eq!(nats.stored_messages("fixture_queue").await, 1);
        assert_eq!(nats.stored_messages("missing").await, 0);
    }
}
