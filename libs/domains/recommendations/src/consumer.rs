use messaging::{Connector, JobHandler, QueueWorker, WorkerConfig};
use std::sync::Arc;

use crate::models::TaskDescriptor;
use crate::processor::RecommendationProcessor;

/// Worker loop over the durable task queue.
///
/// Parses each delivery into a [`TaskDescriptor`], runs the
/// [`RecommendationProcessor`] and acks only when it succeeds.
pub type TaskQueueConsumer = QueueWorker<JobHandler<TaskDescriptor, RecommendationProcessor>>;

pub fn task_queue_consumer(
    connector: Arc<dyn Connector>,
    processor: RecommendationProcessor,
    config: WorkerConfig,
) -> TaskQueueConsumer {
    QueueWorker::new(connector, JobHandler::new(processor), config)
}
