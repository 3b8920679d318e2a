//! NATS backend for the `messaging` broker ports.
//!
//! ```text
//! ┌────────────────┐ publish + PublishAck ┌──────────────────────┐ pull, 1 at a time ┌──────────────┐
//! │    Producer    │─────────────────────▶│ JetStream work-queue │──────────────────▶│ QueueWorker  │
//! └────────────────┘                      │  stream per queue    │◀── ack / term ────└──────────────┘
//!                                         └──────────────────────┘
//! ┌────────────────┐  core NATS inbox  ┌────────────┐
//! │   RpcClient    │◀──────────────────│ RpcServer  │
//! └────────────────┘                   └────────────┘
//! ```
//!
//! - Every durable queue is a JetStream stream with work-queue retention whose
//!   only subject is the queue name, consumed through one shared durable pull
//!   consumer, so parallel worker processes split the load.
//! - Acknowledgement is explicit; a reject is `AckKind::Term`, which drops the
//!   message without redelivery.
//! - Reply queues are core NATS subscriptions on a private inbox subject and
//!   live as long as the connection.
//! - Correlation id and reply address travel as message headers.

mod connector;
mod headers;
mod queue;
mod reply;

pub use connector::{NatsBroker, NatsConnector};
pub use queue::durable_name;
