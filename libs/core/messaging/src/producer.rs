//! Producer for publishing jobs to a durable queue.

use crate::broker::Broker;
use crate::error::BrokerResult;
use crate::job::Job;
use crate::message::Message;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

/// Publishes jobs to one durable queue over an injected connection.
pub struct Producer {
    broker: Arc<dyn Broker>,
    queue: String,
    declared: OnceCell<()>,
}

impl Producer {
    pub fn new(broker: Arc<dyn Broker>, queue: impl Into<String>) -> Self {
        Self {
            broker,
            queue: queue.into(),
            declared: OnceCell::new(),
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Publish `job` and wait for the broker's persistence confirmation.
    ///
    /// The queue is declared on first use.
    #[instrument(skip(self, job), fields(queue = %self.queue, job_id = %job.job_id()))]
    pub async fn send<J: Job>(&self, job: &J) -> BrokerResult<()> {
        self.declared
            .get_or_try_init(|| self.broker.declare_queue(&self.queue))
            .await?;

        let message = Message::json(job)?;
        self.broker.publish(&self.queue, message).await?;
        debug!(job_type = job.job_type(), "Job published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Connector;
    use crate::memory::InMemoryBroker;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Ping {
        n: u8,
    }

    impl Job for Ping {
        fn job_id(&self) -> String {
            self.n.to_string()
        }
    }

    #[tokio::test]
    async fn test_send_declares_queue_and_publishes() {
        let broker = InMemoryBroker::new();
        let producer = Producer::new(broker.connect().await.unwrap(), "pings");

        producer.send(&Ping { n: 1 }).await.unwrap();
        producer.send(&Ping { n: 2 }).await.unwrap();

        let bodies: Vec<_> = broker
            .peek("pings")
            .iter()
            .map(|m| m.text().into_owned())
            .collect();
        assert_eq!(bodies, vec![r#"{"n":1}"#, r#"{"n":2}"#]);
    }

    #[tokio::test]
    async fn test_send_fails_when_disconnected() {
        let broker = InMemoryBroker::new();
        let producer = Producer::new(broker.connect().await.unwrap(), "pings");
        broker.sever_connections();

        assert!(producer.send(&Ping { n: 1 }).await.is_err());
    }
}
