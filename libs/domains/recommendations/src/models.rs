use chrono::{DateTime, Utc};
use messaging::Job;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub type TaskId = i64;
pub type UserId = i64;
pub type ItemId = i64;

/// Requested list length when the caller does not name one
pub const DEFAULT_TOP_N: i64 = 10;

/// Upper bound on the list length of a query-driven request
pub const MAX_QUERY_TOP_N: i64 = 50;

/// Recommendation request routed from the dispatcher to a worker.
///
/// Wire format is a flat JSON record:
/// `{"task_id": 1, "user_id": 7, "top_n": 5, "query": "jazz", "item_ids": [10, 11]}`.
/// Identifier fields are optional on the wire so that a worker can reject a
/// malformed descriptor instead of failing to parse it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_n: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_ids: Option<Vec<ItemId>>,
}

impl TaskDescriptor {
    pub fn new(task_id: TaskId, user_id: UserId, top_n: i64) -> Self {
        Self {
            task_id: Some(task_id),
            user_id: Some(user_id),
            top_n: Some(top_n),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_item_ids(mut self, item_ids: Vec<ItemId>) -> Self {
        self.item_ids = Some(item_ids);
        self
    }

    /// Free-text query, if a non-empty one was given.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.is_empty())
    }

    /// Explicit candidate ids, if a non-empty list was given.
    pub fn item_ids(&self) -> Option<&[ItemId]> {
        self.item_ids.as_deref().filter(|ids| !ids.is_empty())
    }

    /// List length the worker actually produces.
    ///
    /// With a query the requested length is honoured up to 50. Without one
    /// the length is always 10, whatever was requested.
    pub fn effective_top_n(&self) -> usize {
        if self.query().is_some() {
            let requested = self.top_n.unwrap_or(DEFAULT_TOP_N);
            requested.clamp(0, MAX_QUERY_TOP_N) as usize
        } else {
            DEFAULT_TOP_N as usize
        }
    }
}

impl Job for TaskDescriptor {
    fn job_id(&self) -> String {
        self.task_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn job_type(&self) -> &'static str {
        "recommendation_task"
    }
}

/// Lifecycle of a task record in the external store
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    New,
    Queued,
    /// Reachable in the state space, never entered by the worker
    Processing,
    Completed,
    Failed,
}

/// Task as tracked by the task store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub user_id: UserId,
    pub status: TaskStatus,
    /// JSON-encoded array of item ids in ranked order
    pub result: Option<String>,
    pub top_n: i64,
    pub query: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Descriptor published for this record.
    pub fn descriptor(&self) -> TaskDescriptor {
        TaskDescriptor {
            task_id: Some(self.id),
            user_id: Some(self.user_id),
            top_n: Some(self.top_n),
            query: self.query.clone(),
            item_ids: None,
        }
    }
}

/// Catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Static popularity used by the fallback ranking
    #[serde(default)]
    pub popularity: i64,
    /// Raw embedding, set at ingestion
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    /// Pre-projected embedding for the index-search strategy
    #[serde(default)]
    pub projected_embedding: Option<Vec<f32>>,
}

impl Item {
    pub fn new(id: ItemId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            image_url: None,
            popularity: 0,
            embedding: None,
            projected_embedding: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_popularity(mut self, popularity: i64) -> Self {
        self.popularity = popularity;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_projected_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.projected_embedding = Some(embedding);
        self
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

/// User with an optional preference vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    /// Mean of liked item embeddings; absent until the first usable like
    #[serde(default)]
    pub preference_vector: Option<Vec<f32>>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            preference_vector: None,
        }
    }

    pub fn with_preference_vector(mut self, vector: Vec<f32>) -> Self {
        self.preference_vector = Some(vector);
        self
    }
}

/// Candidate with its score, local to one ranking call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredItem {
    pub item_id: ItemId,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_n_clamped_with_query() {
        let descriptor = TaskDescriptor::new(1, 7, 100).with_query("jazz");
        assert_eq!(descriptor.effective_top_n(), 50);

        let descriptor = TaskDescriptor::new(1, 7, 5).with_query("jazz");
        assert_eq!(descriptor.effective_top_n(), 5);
    }

    #[test]
    fn test_top_n_fixed_without_query() {
        assert_eq!(TaskDescriptor::new(1, 7, 100).effective_top_n(), 10);
        assert_eq!(TaskDescriptor::new(1, 7, 3).effective_top_n(), 10);
        assert_eq!(
            TaskDescriptor::new(1, 7, 3)
                .with_item_ids(vec![1, 2])
                .effective_top_n(),
            10
        );
    }

    #[test]
    fn test_top_n_defaults_and_negative() {
        let mut descriptor = TaskDescriptor::new(1, 7, 0).with_query("jazz");
        descriptor.top_n = None;
        assert_eq!(descriptor.effective_top_n(), 10);

        descriptor.top_n = Some(-4);
        assert_eq!(descriptor.effective_top_n(), 0);
    }

    #[test]
    fn test_empty_query_and_ids_count_as_absent() {
        let descriptor = TaskDescriptor::new(1, 7, 30)
            .with_query("")
            .with_item_ids(vec![]);
        assert_eq!(descriptor.query(), None);
        assert_eq!(descriptor.item_ids(), None);
        assert_eq!(descriptor.effective_top_n(), 10);
    }

    #[test]
    fn test_descriptor_wire_format() {
        let descriptor: TaskDescriptor =
            serde_json::from_str(r#"{"task_id":1,"user_id":7,"top_n":5}"#).unwrap();
        assert_eq!(descriptor, TaskDescriptor::new(1, 7, 5));

        let missing: TaskDescriptor = serde_json::from_str(r#"{"user_id":7}"#).unwrap();
        assert_eq!(missing.task_id, None);
        assert_eq!(missing.job_id(), "unknown");

        let encoded = serde_json::to_string(&TaskDescriptor::new(2, 3, 4)).unwrap();
        assert_eq!(encoded, r#"{"task_id":2,"user_id":3,"top_n":4}"#);
    }

    #[test]
    fn test_task_status_strings() {
        assert_eq!(TaskStatus::Queued.to_string(), "queued");
        assert_eq!("completed".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
        assert_eq!(
            serde_json::to_string(&TaskStatus::Failed).unwrap(),
            r#""failed""#
        );
    }
}
