//! Recommendations Domain
//!
//! Asynchronous recommendation pipeline: task descriptors are published to a
//! durable queue, a worker ranks candidate items for the user and reports the
//! ranking back through a result callback.
//!
//! # Components
//!
//! - [`TaskDispatcher`]: publishes descriptors, returns `false` on transport failure
//! - [`TaskQueueConsumer`]: queue worker running the [`RecommendationProcessor`]
//! - [`ScoringEngine`]: popularity fallback or a personalized [`RankingStrategy`]
//! - [`EmbeddingAggregator`]: keeps user preference vectors in step with likes
//! - [`TaskSubmitter`]: caller side, task records and result intake

pub mod aggregator;
pub mod callback;
pub mod candidates;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod memory;
pub mod models;
pub mod processor;
pub mod repository;
pub mod scoring;
pub mod submission;

pub use aggregator::EmbeddingAggregator;
pub use callback::{HttpResultCallback, ResultCallback};
pub use candidates::CandidateFilter;
pub use consumer::{TaskQueueConsumer, task_queue_consumer};
pub use dispatcher::TaskDispatcher;
pub use error::{RecommendationError, RecommendationResult, ScoringError, VectorOwner};
pub use memory::{CatalogSnapshot, InMemoryCatalog, InMemoryTaskStore, Like};
pub use models::{Item, ItemId, ScoredItem, TaskDescriptor, TaskId, TaskRecord, TaskStatus, User, UserId};
pub use processor::RecommendationProcessor;
pub use repository::{InteractionRepository, ItemRepository, TaskStore, UserRepository};
pub use scoring::{
    FlatInnerProductIndex, LinearProjection, PairwiseScorer, RankingStrategy, ScoringEngine,
    StrategyKind,
};
pub use submission::TaskSubmitter;
