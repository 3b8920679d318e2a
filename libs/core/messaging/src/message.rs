//! Messages as they travel through a broker.

use crate::error::BrokerResult;
use async_trait::async_trait;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// Header carrying the correlation id of an RPC request or reply.
pub const CORRELATION_ID_HEADER: &str = "Correlation-Id";

/// Header carrying the address a reply should be sent to.
pub const REPLY_TO_HEADER: &str = "Reply-To";

/// Body plus the metadata the request/reply protocol needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub payload: Vec<u8>,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
}

impl Message {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            ..Default::default()
        }
    }

    /// Serialize `value` as a flat JSON record.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> BrokerResult<Self> {
        Ok(Self::new(serde_json::to_vec(value)?))
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_reply_to(mut self, address: impl Into<String>) -> Self {
        self.reply_to = Some(address.into());
        self
    }

    /// Payload as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Settles a delivery with the broker that handed it out.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    /// Positive acknowledgement; the broker forgets the message.
    async fn ack(self: Box<Self>) -> BrokerResult<()>;

    /// Negative acknowledgement without requeue; the broker drops the message.
    async fn reject(self: Box<Self>) -> BrokerResult<()>;
}

/// A message handed out by a queue consumer, pending acknowledgement.
pub struct Delivery {
    pub message: Message,
    /// 1 on first delivery, incremented on every redelivery
    pub delivery_count: u32,
    acker: Box<dyn Acknowledger>,
}

impl Delivery {
    pub fn new(message: Message, delivery_count: u32, acker: Box<dyn Acknowledger>) -> Self {
        Self {
            message,
            delivery_count,
            acker,
        }
    }

    pub fn is_redelivery(&self) -> bool {
        self.delivery_count > 1
    }

    pub async fn ack(self) -> BrokerResult<()> {
        self.acker.ack().await
    }

    pub async fn reject(self) -> BrokerResult<()> {
        self.acker.reject().await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("message", &self.message)
            .field("delivery_count", &self.delivery_count)
            .finish_non_exhaustive()
    }
}
