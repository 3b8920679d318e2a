use crate::broker::Broker;
use crate::error::{BrokerResult, ProcessingError};
use crate::message::{Delivery, Message};
use crate::worker::{DeliveryHandler, Outcome};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Turns a plain-text request into a plain-text response.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn handle(&self, request: &str) -> Result<String, ProcessingError>;
}

/// Serves RPC requests; plug into a [`QueueWorker`](crate::QueueWorker)
/// consuming the RPC queue.
///
/// Every request is acknowledged, whatever the handler returns. A failed
/// handler produces no reply and is followed by a short pause.
pub struct RpcServer<H> {
    handler: H,
    failure_pause: Duration,
}

impl<H: RpcHandler> RpcServer<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            failure_pause: Duration::from_millis(500),
        }
    }

    pub fn with_failure_pause(mut self, pause: Duration) -> Self {
        self.failure_pause = pause;
        self
    }
}

#[async_trait]
impl<H: RpcHandler> DeliveryHandler for RpcServer<H> {
    async fn handle(&self, broker: &dyn Broker, delivery: Delivery) -> BrokerResult<Outcome> {
        let request = delivery.message.text().into_owned();
        let correlation_id = delivery.message.correlation_id.clone();

        match self.handler.handle(&request).await {
            Ok(response) => match delivery.message.reply_to.as_deref() {
                Some(address) => {
                    let mut reply = Message::new(response);
                    reply.correlation_id = correlation_id.clone();
                    broker.send_reply(address, reply).await?;
                    debug!(correlation_id = ?correlation_id, "RPC reply sent");
                }
                None => warn!(correlation_id = ?correlation_id, "RPC request has no reply address"),
            },
            Err(e) => {
                warn!(
                    correlation_id = ?correlation_id,
                    error = %e,
                    "RPC handler failed, acknowledging without reply"
                );
                tokio::time::sleep(self.failure_pause).await;
            }
        }

        delivery.ack().await?;
        Ok(Outcome::Acked)
    }

    fn name(&self) -> &'static str {
        "rpc_server"
    }
}
