use crate::headers::from_nats;
use async_nats::Subscriber;
use async_trait::async_trait;
use futures::StreamExt;
use messaging::{BrokerError, BrokerResult, Message, ReplyQueue};
use std::time::Duration;

/// Core NATS subscription on a private inbox subject.
pub(crate) struct NatsReplyQueue {
    address: String,
    subscriber: Subscriber,
}

impl NatsReplyQueue {
    pub(crate) fn new(address: String, subscriber: Subscriber) -> Self {
        Self {
            address,
            subscriber,
        }
    }
}

#[async_trait]
impl ReplyQueue for NatsReplyQueue {
    fn address(&self) -> &str {
        &self.address
    }

    async fn recv(&mut self, wait: Duration) -> BrokerResult<Option<Message>> {
        match tokio::time::timeout(wait, self.subscriber.next()).await {
            Ok(Some(message)) => Ok(Some(from_nats(&message.payload, message.headers.as_ref()))),
            Ok(None) => Err(BrokerError::Disconnected),
            Err(_) => Ok(None),
        }
    }
}
