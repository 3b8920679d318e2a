//! Processor trait for job execution.

use crate::error::ProcessingError;
use crate::job::Job;
use async_trait::async_trait;

/// Job processor.
///
/// `Ok(())` acknowledges the delivery. Any error rejects it without requeue,
/// whatever its category; the category only shows up in logs and metrics.
#[async_trait]
pub trait Processor<J: Job>: Send + Sync {
    async fn process(&self, job: &J) -> Result<(), ProcessingError>;

    /// Used for logging and metrics labels.
    fn name(&self) -> &'static str;
}
