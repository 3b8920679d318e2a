use messaging::{Broker, Producer};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::models::TaskDescriptor;

/// Publishes task descriptors to the durable task queue.
pub struct TaskDispatcher {
    producer: Producer,
}

impl TaskDispatcher {
    pub fn new(broker: Arc<dyn Broker>, queue: impl Into<String>) -> Self {
        Self {
            producer: Producer::new(broker, queue),
        }
    }

    pub fn queue(&self) -> &str {
        self.producer.queue()
    }

    /// Publish `descriptor` and wait for the broker to persist it.
    ///
    /// Returns `false` on any transport failure; the caller decides what
    /// happens to the task record.
    #[instrument(skip(self, descriptor), fields(task_id = ?descriptor.task_id, queue = %self.queue()))]
    pub async fn submit(&self, descriptor: &TaskDescriptor) -> bool {
        match self.producer.send(descriptor).await {
            Ok(()) => {
                info!("Task dispatched");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to dispatch task");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging::{Connector, InMemoryBroker};

    #[tokio::test]
    async fn test_submit_declares_queue_and_publishes() {
        let broker = InMemoryBroker::new();
        let connection = broker.connect().await.unwrap();
        let dispatcher = TaskDispatcher::new(connection, "ml_task_queue");

        assert!(dispatcher.submit(&TaskDescriptor::new(1, 7, 5)).await);
        assert!(dispatcher.submit(&TaskDescriptor::new(2, 7, 5)).await);

        let published = broker.peek("ml_task_queue");
        assert_eq!(published.len(), 2);
        assert_eq!(
            published[0].text(),
            r#"{"task_id":1,"user_id":7,"top_n":5}"#
        );
    }

    #[tokio::test]
    async fn test_submit_returns_false_on_transport_failure() {
        let broker = InMemoryBroker::new();
        let connection = broker.connect().await.unwrap();
        let dispatcher = TaskDispatcher::new(connection, "ml_task_queue");

        broker.sever_connections();
        assert!(!dispatcher.submit(&TaskDescriptor::new(1, 7, 5)).await);
    }
}
