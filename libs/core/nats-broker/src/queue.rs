use crate::headers::from_nats;
use async_nats::jetstream::consumer::pull::{Config as ConsumerConfig, Stream as MessageStream};
use async_nats::jetstream::consumer::{AckPolicy, Consumer};
use async_nats::jetstream::stream::{Config as StreamConfig, RetentionPolicy};
use async_nats::jetstream::{AckKind, Context};
use async_trait::async_trait;
use futures::StreamExt;
use messaging::{Acknowledger, BrokerError, BrokerResult, Delivery, QueueConsumer};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long the server waits for an ack before redelivering.
const ACK_WAIT: Duration = Duration::from_secs(30 * 60);

/// Name of the durable consumer shared by all workers of `queue`.
pub fn durable_name(queue: &str) -> String {
    format!("{queue}_workers")
}

/// Ensure the work-queue stream backing `queue` exists.
pub(crate) async fn ensure_stream(jetstream: &Context, queue: &str) -> BrokerResult<()> {
    match jetstream.get_stream(queue).await {
        Ok(_) => {
            debug!(queue, "Stream already exists");
            Ok(())
        }
        Err(_) => {
            info!(queue, "Creating stream");
            jetstream
                .create_stream(StreamConfig {
                    name: queue.to_string(),
                    subjects: vec![queue.to_string()],
                    retention: RetentionPolicy::WorkQueue,
                    ..Default::default()
                })
                .await
                .map_err(|e| BrokerError::declare(queue, e))?;
            Ok(())
        }
    }
}

/// Ensure the shared durable pull consumer of `queue` exists.
pub(crate) async fn ensure_consumer(
    jetstream: &Context,
    queue: &str,
) -> BrokerResult<Consumer<ConsumerConfig>> {
    let stream = jetstream
        .get_stream(queue)
        .await
        .map_err(|e| BrokerError::consume(queue, e))?;
    let name = durable_name(queue);

    match stream.get_consumer::<ConsumerConfig>(&name).await {
        Ok(consumer) => {
            debug!(queue, consumer = %name, "Consumer already exists");
            Ok(consumer)
        }
        Err(_) => {
            info!(queue, consumer = %name, "Creating consumer");
            stream
                .create_consumer(ConsumerConfig {
                    durable_name: Some(name.clone()),
                    name: Some(name),
                    ack_policy: AckPolicy::Explicit,
                    ack_wait: ACK_WAIT,
                    filter_subject: queue.to_string(),
                    ..Default::default()
                })
                .await
                .map_err(|e| BrokerError::consume(queue, e))
        }
    }
}

pub(crate) struct NatsQueueConsumer {
    queue: String,
    messages: MessageStream,
}

impl NatsQueueConsumer {
    pub(crate) fn new(queue: &str, messages: MessageStream) -> Self {
        Self {
            queue: queue.to_string(),
            messages,
        }
    }
}

#[async_trait]
impl QueueConsumer for NatsQueueConsumer {
    async fn next(&mut self) -> BrokerResult<Delivery> {
        let message = match self.messages.next().await {
            Some(Ok(message)) => message,
            Some(Err(e)) => return Err(BrokerError::consume(&self.queue, e)),
            None => return Err(BrokerError::Disconnected),
        };

        let delivery_count = match message.info() {
            Ok(info) => u32::try_from(info.delivered).unwrap_or(u32::MAX),
            Err(e) => {
                warn!(queue = %self.queue, error = %e, "Failed to read message info, assuming first delivery");
                1
            }
        };
        let body = from_nats(&message.payload, message.headers.as_ref());

        Ok(Delivery::new(
            body,
            delivery_count,
            Box::new(NatsAcker { message }),
        ))
    }
}

struct NatsAcker {
    message: async_nats::jetstream::Message,
}

#[async_trait]
impl Acknowledger for NatsAcker {
    async fn ack(self: Box<Self>) -> BrokerResult<()> {
        self.message
            .ack()
            .await
            .map_err(|e| BrokerError::Ack(e.to_string()))
    }

    async fn reject(self: Box<Self>) -> BrokerResult<()> {
        self.message
            .ack_with(AckKind::Term)
            .await
            .map_err(|e| BrokerError::Ack(e.to_string()))
    }
}
