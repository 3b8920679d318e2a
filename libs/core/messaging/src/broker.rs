//! Backend-agnostic broker ports.
//!
//! A [`Connector`] produces explicitly owned [`Broker`] connections. Components
//! receive the connection (or the connector, when they reconnect on their own)
//! instead of reaching for a process-wide client.

use crate::error::BrokerResult;
use crate::message::{Delivery, Message};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// One live connection to the broker.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Create the durable queue if absent. Idempotent.
    async fn declare_queue(&self, queue: &str) -> BrokerResult<()>;

    /// Publish to a durable queue and wait for the broker to confirm persistence.
    async fn publish(&self, queue: &str, message: Message) -> BrokerResult<()>;

    /// Start consuming a durable queue with manual acknowledgement.
    async fn consume(&self, queue: &str) -> BrokerResult<Box<dyn QueueConsumer>>;

    /// Create a private, exclusive reply queue owned by this connection.
    async fn reply_queue(&self) -> BrokerResult<Box<dyn ReplyQueue>>;

    /// Send a reply to an address obtained from [`ReplyQueue::address`].
    ///
    /// Replies to addresses nobody listens on are dropped by the broker.
    async fn send_reply(&self, address: &str, message: Message) -> BrokerResult<()>;
}

/// Factory for broker connections.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> BrokerResult<Arc<dyn Broker>>;
}

/// A consumer attached to one durable queue.
#[async_trait]
pub trait QueueConsumer: Send {
    /// Wait for the next delivery. Errors when the connection goes away.
    async fn next(&mut self) -> BrokerResult<Delivery>;
}

/// A private queue receiving RPC replies.
#[async_trait]
pub trait ReplyQueue: Send {
    fn address(&self) -> &str;

    /// Wait up to `wait` for a reply. `Ok(None)` means nothing arrived.
    async fn recv(&mut self, wait: Duration) -> BrokerResult<Option<Message>>;
}
