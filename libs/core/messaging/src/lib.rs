//! Backend-agnostic messaging for the recommendation pipeline.
//!
//! - **Broker ports**: [`Connector`], [`Broker`], [`QueueConsumer`], [`ReplyQueue`]
//! - **Durable queues**: [`Producer`] publishes, [`QueueWorker`] consumes with
//!   manual acknowledgement and a reconnecting state machine
//! - **Request/Reply**: [`RpcClient`] / [`RpcServer`] correlate plain-text
//!   calls over the same broker
//! - **Retries**: [`RetryPolicy`] wraps any fallible operation with a backoff
//!   and a reconnect hook
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────────┐     ┌───────────────┐
//! │   Producer   │────▶│   Broker (NATS / mem) │────▶│  QueueWorker  │
//! └──────────────┘     │     durable queues     │     │  + Processor  │
//!                      └───────────────────────┘     └───────────────┘
//! ┌──────────────┐   request (Correlation-Id, Reply-To)   ┌───────────┐
//! │  RpcClient   │───────────────────────────────────────▶│ RpcServer │
//! │ reply queue  │◀───────────────────────────────────────│           │
//! └──────────────┘                reply                   └───────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let connector: Arc<dyn Connector> = Arc::new(NatsConnector::new(config));
//!
//! let worker = QueueWorker::new(
//!     connector,
//!     JobHandler::new(processor),
//!     WorkerConfig::new("ml_task_queue"),
//! );
//! worker.run(shutdown_rx).await;
//! ```

mod broker;
mod error;
mod job;
mod memory;
mod message;
mod metrics;
mod processor;
mod producer;
mod retry;
mod rpc;
mod worker;

pub use broker::{Broker, Connector, QueueConsumer, ReplyQueue};
pub use error::{BrokerError, BrokerResult, ErrorCategory, ProcessingError, Retryable, RpcError};
pub use job::Job;
pub use memory::{InMemoryBroker, InMemoryConnection};
pub use message::{Acknowledger, Delivery, Message, CORRELATION_ID_HEADER, REPLY_TO_HEADER};
pub use self::metrics::{record_rpc_call, WorkerMetrics};
pub use processor::Processor;
pub use producer::Producer;
pub use retry::{BackoffStrategy, RetryPolicy};
pub use rpc::{RpcClient, RpcClientConfig, RpcHandler, RpcServer};
pub use worker::{ConsumerState, DeliveryHandler, JobHandler, Outcome, QueueWorker, WorkerConfig};
