use messaging::ProcessingError;
use std::fmt;
use thiserror::Error;

use crate::models::{ItemId, TaskId, UserId};

/// Whose vector a scoring error is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorOwner {
    User,
    Item(ItemId),
}

impl fmt::Display for VectorOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorOwner::User => write!(f, "user vector"),
            VectorOwner::Item(id) => write!(f, "item {id}"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("{0} has no embedding")]
    MissingVector(VectorOwner),

    #[error("{owner} is malformed: {reason}")]
    Malformed { owner: VectorOwner, reason: String },

    #[error("{owner} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        owner: VectorOwner,
        expected: usize,
        actual: usize,
    },

    #[error("Model error: {0}")]
    Model(String),
}

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("Invalid task descriptor: {0}")]
    Validation(String),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Scoring failed: {0}")]
    Scoring(#[from] ScoringError),

    #[error("Result callback failed: {0}")]
    Callback(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Task store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type RecommendationResult<T> = Result<T, RecommendationError>;

impl From<RecommendationError> for ProcessingError {
    fn from(err: RecommendationError) -> Self {
        match err {
            RecommendationError::Callback(_)
            | RecommendationError::Catalog(_)
            | RecommendationError::Store(_) => ProcessingError::transient_with_source("recommendation failed", err),
            _ => ProcessingError::permanent_with_source("recommendation failed", err),
        }
    }
}
