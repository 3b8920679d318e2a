use async_trait::async_trait;

use crate::candidates::CandidateFilter;
use crate::error::RecommendationResult;
use crate::models::{Item, ItemId, TaskId, TaskRecord, TaskStatus, User, UserId};

/// Read access to the item catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Items carrying an embedding that match `filter`, in catalog order
    async fn candidates(&self, filter: &CandidateFilter) -> RecommendationResult<Vec<Item>>;

    /// Items with the given ids, in catalog order; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[ItemId]) -> RecommendationResult<Vec<Item>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: UserId) -> RecommendationResult<Option<User>>;

    /// Replace the user's preference vector wholesale
    async fn set_preference_vector(&self, id: UserId, vector: Vec<f32>)
        -> RecommendationResult<()>;
}

/// User/item interaction state
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionRepository: Send + Sync {
    /// Mark `(user_id, item_id)` as liked; liking twice is a no-op
    async fn mark_liked(&self, user_id: UserId, item_id: ItemId) -> RecommendationResult<()>;

    /// All items currently liked by the user
    async fn liked_item_ids(&self, user_id: UserId) -> RecommendationResult<Vec<ItemId>>;
}

/// External task store
///
/// Owns the task lifecycle. The pipeline only creates records, moves them
/// to QUEUED or FAILED after dispatch, and stores results.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Create a task in status NEW
    async fn create(
        &self,
        user_id: UserId,
        top_n: i64,
        query: Option<String>,
    ) -> RecommendationResult<TaskRecord>;

    async fn get(&self, id: TaskId) -> RecommendationResult<Option<TaskRecord>>;

    async fn set_status(&self, id: TaskId, status: TaskStatus) -> RecommendationResult<TaskRecord>;

    /// Store the result and mark the task COMPLETED
    async fn set_result(&self, id: TaskId, result: String) -> RecommendationResult<TaskRecord>;
}
