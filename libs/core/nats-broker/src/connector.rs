use crate::headers::to_headers;
use crate::queue::{ensure_consumer, ensure_stream, NatsQueueConsumer};
use crate::reply::NatsReplyQueue;
use async_nats::jetstream::{self, Context};
use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use core_config::broker::BrokerConfig;
use messaging::{
    BackoffStrategy, Broker, BrokerError, BrokerResult, Connector, Message, QueueConsumer,
    ReplyQueue, RetryPolicy, RpcClientConfig,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Opens NATS connections from [`BrokerConfig`].
#[derive(Debug, Clone)]
pub struct NatsConnector {
    config: BrokerConfig,
}

impl NatsConnector {
    pub fn new(config: BrokerConfig) -> Self {
        Self { config }
    }

    pub async fn connect_nats(&self) -> BrokerResult<NatsBroker> {
        let client = ConnectOptions::new()
            .name(&self.config.connection_name)
            .connection_timeout(self.config.connect_timeout)
            .ping_interval(self.config.ping_interval)
            .connect(self.config.url.as_str())
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))?;

        info!(url = %self.config.url, name = %self.config.connection_name, "Connected to NATS");
        Ok(NatsBroker::new(client))
    }

    /// Client settings for the configured RPC queue. Retries wait out the
    /// reconnect delay.
    pub fn rpc_client_config(&self) -> RpcClientConfig {
        RpcClientConfig::new(self.config.rpc_queue.as_str()).with_retry(RetryPolicy::new(
            3,
            BackoffStrategy::Fixed(self.config.reconnect_delay),
        ))
    }
}

#[async_trait]
impl Connector for NatsConnector {
    async fn connect(&self) -> BrokerResult<Arc<dyn Broker>> {
        Ok(Arc::new(self.connect_nats().await?))
    }
}

/// One NATS connection plus its JetStream context.
#[derive(Clone)]
pub struct NatsBroker {
    client: Client,
    jetstream: Context,
}

impl NatsBroker {
    pub fn new(client: Client) -> Self {
        let jetstream = jetstream::new(client.clone());
        Self { client, jetstream }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Broker for NatsBroker {
    async fn declare_queue(&self, queue: &str) -> BrokerResult<()> {
        ensure_stream(&self.jetstream, queue).await
    }

    async fn publish(&self, queue: &str, message: Message) -> BrokerResult<()> {
        let headers = to_headers(&message);
        let ack = self
            .jetstream
            .publish_with_headers(queue.to_string(), headers, message.payload.into())
            .await
            .map_err(|e| BrokerError::publish(queue, e))?
            .await
            .map_err(|e| BrokerError::publish(queue, e))?;

        debug!(queue, sequence = ack.sequence, "Message persisted");
        Ok(())
    }

    async fn consume(&self, queue: &str) -> BrokerResult<Box<dyn QueueConsumer>> {
        let consumer = ensure_consumer(&self.jetstream, queue).await?;
        let messages = consumer
            .stream()
            .max_messages_per_batch(1)
            .messages()
            .await
            .map_err(|e| BrokerError::consume(queue, e))?;

        Ok(Box::new(NatsQueueConsumer::new(queue, messages)))
    }

    async fn reply_queue(&self) -> BrokerResult<Box<dyn ReplyQueue>> {
        let address = self.client.new_inbox();
        let subscriber = self
            .client
            .subscribe(address.clone())
            .await
            .map_err(|e| BrokerError::consume(&address, e))?;

        Ok(Box::new(NatsReplyQueue::new(address, subscriber)))
    }

    async fn send_reply(&self, address: &str, message: Message) -> BrokerResult<()> {
        let headers = to_headers(&message);
        self.client
            .publish_with_headers(address.to_string(), headers, message.payload.into())
            .await
            .map_err(|e| BrokerError::publish(address, e))?;
        self.client
            .flush()
            .await
            .map_err(|e| BrokerError::publish(address, e))?;
        Ok(())
    }
}
