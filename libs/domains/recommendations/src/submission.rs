use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::dispatcher::TaskDispatcher;
use crate::error::{RecommendationError, RecommendationResult};
use crate::models::{DEFAULT_TOP_N, TaskId, TaskRecord, TaskStatus, UserId};
use crate::repository::TaskStore;

/// Caller side of the pipeline: creates task records, dispatches them and
/// takes results back in.
pub struct TaskSubmitter<S: TaskStore> {
    store: Arc<S>,
    dispatcher: TaskDispatcher,
}

impl<S: TaskStore> TaskSubmitter<S> {
    pub fn new(store: Arc<S>, dispatcher: TaskDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Create a task and publish it.
    ///
    /// The record ends up QUEUED when the broker accepted the descriptor and
    /// FAILED otherwise.
    #[instrument(skip(self, query))]
    pub async fn submit(
        &self,
        user_id: UserId,
        top_n: Option<i64>,
        query: Option<String>,
    ) -> RecommendationResult<TaskRecord> {
        let record = self
            .store
            .create(user_id, top_n.unwrap_or(DEFAULT_TOP_N), query)
            .await?;

        let status = if self.dispatcher.submit(&record.descriptor()).await {
            TaskStatus::Queued
        } else {
            warn!(task_id = record.id, "Dispatch failed, marking task failed");
            TaskStatus::Failed
        };

        self.store.set_status(record.id, status).await
    }

    /// Store a delivered result and mark the task COMPLETED.
    ///
    /// Repeated delivery of the same result leaves the record unchanged apart
    /// from its update time.
    #[instrument(skip(self, result))]
    pub async fn receive_result(
        &self,
        task_id: TaskId,
        result: String,
    ) -> RecommendationResult<TaskRecord> {
        if self.store.get(task_id).await?.is_none() {
            return Err(RecommendationError::TaskNotFound(task_id));
        }

        let record = self.store.set_result(task_id, result).await?;
        info!("Task completed");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTaskStore;
    use crate::models::TaskDescriptor;
    use messaging::{Connector, InMemoryBroker};

    async fn submitter(broker: &InMemoryBroker) -> TaskSubmitter<InMemoryTaskStore> {
        let connection = broker.connect().await.unwrap();
        TaskSubmitter::new(
            Arc::new(InMemoryTaskStore::new()),
            TaskDispatcher::new(connection, "ml_task_queue"),
        )
    }

    #[tokio::test]
    async fn test_submit_queues_task() {
        let broker = InMemoryBroker::new();
        let submitter = submitter(&broker).await;

        let record = submitter
            .submit(7, None, Some("jazz".into()))
            .await
            .unwrap();
        assert_eq!(record.status, TaskStatus::Queued);
        assert_eq!(record.top_n, 10);

        let published = broker.peek("ml_task_queue");
        let descriptor: TaskDescriptor = serde_json::from_slice(&published[0].payload).unwrap();
        assert_eq!(descriptor.task_id, Some(record.id));
        assert_eq!(descriptor.query.as_deref(), Some("jazz"));
    }

    #[tokio::test]
    async fn test_submit_marks_failed_on_dispatch_failure() {
        let broker = InMemoryBroker::new();
        let submitter = submitter(&broker).await;
        broker.sever_connections();

        let record = submitter.submit(7, Some(5), None).await.unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_receive_result_is_idempotent() {
        let broker = InMemoryBroker::new();
        let submitter = submitter(&broker).await;
        let record = submitter.submit(7, Some(5), None).await.unwrap();

        let first = submitter
            .receive_result(record.id, "[11,10,12]".into())
            .await
            .unwrap();
        let second = submitter
            .receive_result(record.id, "[11,10,12]".into())
            .await
            .unwrap();

        assert_eq!(first.status, TaskStatus::Completed);
        assert_eq!(second.status, TaskStatus::Completed);
        assert_eq!(second.result, first.result);
    }

    #[tokio::test]
    async fn test_receive_result_unknown_task() {
        let broker = InMemoryBroker::new();
        let submitter = submitter(&broker).await;

        let err = submitter.receive_result(42, "[]".into()).await.unwrap_err();
        assert!(matches!(err, RecommendationError::TaskNotFound(42)));
    }
}
