//! In-memory adapters for the repository ports.
//!
//! The worker binary loads its catalog from a JSON snapshot; tests build one
//! directly. Item order is ascending id, which is the tie-break order of every
//! ranking strategy.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::candidates::CandidateFilter;
use crate::error::{RecommendationError, RecommendationResult};
use crate::models::{Item, ItemId, TaskId, TaskRecord, TaskStatus, User, UserId};
use crate::repository::{InteractionRepository, ItemRepository, TaskStore, UserRepository};

/// A liked `(user, item)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub user_id: UserId,
    pub item_id: ItemId,
}

/// Serialized catalog contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub likes: Vec<Like>,
}

impl CatalogSnapshot {
    pub fn from_json(json: &str) -> RecommendationResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| RecommendationError::Catalog(format!("invalid catalog snapshot: {e}")))
    }

    pub async fn load(path: impl AsRef<Path>) -> RecommendationResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RecommendationError::Catalog(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    users: BTreeMap<UserId, User>,
    items: BTreeMap<ItemId, Item>,
    likes: BTreeMap<UserId, BTreeSet<ItemId>>,
}

/// Users, items and likes held in process memory
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let mut state = CatalogState::default();
        for user in snapshot.users {
            state.users.insert(user.id, user);
        }
        for item in snapshot.items {
            state.items.insert(item.id, item);
        }
        for like in snapshot.likes {
            state.likes.entry(like.user_id).or_default().insert(like.item_id);
        }

        info!(
            users = state.users.len(),
            items = state.items.len(),
            "Catalog loaded"
        );
        Self {
            state: RwLock::new(state),
        }
    }

    pub async fn insert_item(&self, item: Item) {
        self.state.write().await.items.insert(item.id, item);
    }

    pub async fn insert_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }
}

#[async_trait]
impl ItemRepository for InMemoryCatalog {
    async fn candidates(&self, filter: &CandidateFilter) -> RecommendationResult<Vec<Item>> {
        let state = self.state.read().await;
        Ok(state
            .items
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect())
    }

    async fn find_by_ids(&self, ids: &[ItemId]) -> RecommendationResult<Vec<Item>> {
        let state = self.state.read().await;
        Ok(state
            .items
            .values()
            .filter(|item| ids.contains(&item.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserRepository for InMemoryCatalog {
    async fn get_user(&self, id: UserId) -> RecommendationResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn set_preference_vector(&self, id: UserId, vector: Vec<f32>) -> RecommendationResult<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&id)
            .ok_or(RecommendationError::UserNotFound(id))?;
        user.preference_vector = Some(vector);
        Ok(())
    }
}

#[async_trait]
impl InteractionRepository for InMemoryCatalog {
    async fn mark_liked(&self, user_id: UserId, item_id: ItemId) -> RecommendationResult<()> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) {
            return Err(RecommendationError::UserNotFound(user_id));
        }
        if !state.items.contains_key(&item_id) {
            return Err(RecommendationError::ItemNotFound(item_id));
        }
        state.likes.entry(user_id).or_default().insert(item_id);
        Ok(())
    }

    async fn liked_item_ids(&self, user_id: UserId) -> RecommendationResult<Vec<ItemId>> {
        let state = self.state.read().await;
        Ok(state
            .likes
            .get(&user_id)
            .map(|liked| liked.iter().copied().collect())
            .unwrap_or_default())
    }
}

/// Task store held in process memory
#[derive(Debug)]
pub struct InMemoryTaskStore {
    next_id: AtomicI64,
    tasks: RwLock<BTreeMap<TaskId, TaskRecord>>,
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            tasks: RwLock::new(BTreeMap::new()),
        }
    }
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update<F>(&self, id: TaskId, apply: F) -> RecommendationResult<TaskRecord>
    where
        F: FnOnce(&mut TaskRecord) + Send,
    {
        let mut tasks = self.tasks.write().await;
        let record = tasks
            .get_mut(&id)
            .ok_or(RecommendationError::TaskNotFound(id))?;
        apply(record);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(
        &self,
        user_id: UserId,
        top_n: i64,
        query: Option<String>,
    ) -> RecommendationResult<TaskRecord> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();
        let record = TaskRecord {
            id,
            user_id,
            status: TaskStatus::New,
            result: None,
            top_n,
            query,
            created_at: now,
            updated_at: now,
        };
        self.tasks.write().await.insert(id, record.clone());
        debug!(task_id = id, user_id, "Task created");
        Ok(record)
    }

    async fn get(&self, id: TaskId) -> RecommendationResult<Option<TaskRecord>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn set_status(&self, id: TaskId, status: TaskStatus) -> RecommendationResult<TaskRecord> {
        self.update(id, |record| record.status = status).await
    }

    async fn set_result(&self, id: TaskId, result: String) -> RecommendationResult<TaskRecord> {
        self.update(id, |record| {
            record.result = Some(result);
            record.status = TaskStatus::Completed;
        })
        .await
    }
}
