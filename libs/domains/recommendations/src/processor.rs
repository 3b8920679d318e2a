use async_trait::async_trait;
use messaging::{ProcessingError, Processor};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::callback::ResultCallback;
use crate::candidates::CandidateFilter;
use crate::error::{RecommendationError, RecommendationResult};
use crate::models::{ItemId, TaskDescriptor};
use crate::repository::{ItemRepository, UserRepository};
use crate::scoring::ScoringEngine;

/// Body of the task queue consumer: rank, then report.
///
/// Any error leaves the message to be rejected without requeue; success is
/// only reported once the result callback has accepted the ranking.
#[derive(Clone)]
pub struct RecommendationProcessor {
    items: Arc<dyn ItemRepository>,
    users: Arc<dyn UserRepository>,
    engine: Arc<ScoringEngine>,
    callback: Arc<dyn ResultCallback>,
}

impl RecommendationProcessor {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        users: Arc<dyn UserRepository>,
        engine: Arc<ScoringEngine>,
        callback: Arc<dyn ResultCallback>,
    ) -> Self {
        Self {
            items,
            users,
            engine,
            callback,
        }
    }

    /// Rank candidates for the descriptor's user.
    pub async fn recommend(&self, descriptor: &TaskDescriptor) -> RecommendationResult<Vec<ItemId>> {
        let user_id = descriptor
            .user_id
            .ok_or_else(|| RecommendationError::Validation("missing user_id".to_string()))?;

        let filter = CandidateFilter::from_descriptor(descriptor);
        let candidates = self.items.candidates(&filter).await?;

        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(RecommendationError::UserNotFound(user_id))?;

        let ranked = self.engine.rank(
            &candidates,
            user.preference_vector.as_deref(),
            descriptor.effective_top_n(),
        )?;
        Ok(ranked)
    }

    /// Validate, rank and deliver one task.
    #[instrument(skip(self, descriptor), fields(task_id = ?descriptor.task_id, user_id = ?descriptor.user_id))]
    pub async fn handle(&self, descriptor: &TaskDescriptor) -> RecommendationResult<()> {
        let task_id = descriptor
            .task_id
            .ok_or_else(|| RecommendationError::Validation("missing task_id".to_string()))?;
        if descriptor.user_id.is_none() {
            return Err(RecommendationError::Validation("missing user_id".to_string()));
        }

        let ranked = self.recommend(descriptor).await?;
        let result = serde_json::to_string(&ranked)?;
        self.callback.deliver(task_id, &result).await?;

        info!(items = ranked.len(), "Recommendation delivered");
        Ok(())
    }
}

#[async_trait]
impl Processor<TaskDescriptor> for RecommendationProcessor {
    async fn process(&self, job: &TaskDescriptor) -> Result<(), ProcessingError> {
        self.handle(job).await.map_err(ProcessingError::from)
    }

    fn name(&self) -> &'static str {
        "recommendation_processor"
    }
}
