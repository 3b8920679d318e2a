//! Queue worker: connection state machine around a delivery handler.
//!
//! ```text
//!   DISCONNECTED ──▶ CONNECTING ──▶ CONSUMING
//!        ▲                │              │
//!        └── delay ◀──────┴── transport ─┘
//! ```
//!
//! Transport failures in any state lead back to `Disconnected`, a fixed delay,
//! and a new connection attempt. The loop only ends when shutdown is signalled.

use crate::broker::{Broker, Connector};
use crate::error::BrokerResult;
use crate::job::Job;
use crate::message::Delivery;
use crate::metrics::WorkerMetrics;
use crate::processor::Processor;
use async_trait::async_trait;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Connection state of a [`QueueWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Disconnected,
    Connecting,
    Consuming,
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsumerState::Disconnected => write!(f, "disconnected"),
            ConsumerState::Connecting => write!(f, "connecting"),
            ConsumerState::Consuming => write!(f, "consuming"),
        }
    }
}

/// How a delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Acked,
    /// Negatively acknowledged without requeue
    Rejected { reason: &'static str },
}

/// Settles one delivery at a time.
///
/// Implementations must ack or reject the delivery themselves. Only transport
/// errors are returned; they send the worker back to `Disconnected`.
#[async_trait]
pub trait DeliveryHandler: Send + Sync {
    async fn handle(&self, broker: &dyn Broker, delivery: Delivery) -> BrokerResult<Outcome>;

    fn name(&self) -> &'static str;
}

/// Adapts a [`Processor`] to the ack-on-success, reject-on-anything-else rule.
pub struct JobHandler<J, P> {
    processor: P,
    _marker: PhantomData<fn() -> J>,
}

impl<J: Job, P: Processor<J>> JobHandler<J, P> {
    pub fn new(processor: P) -> Self {
        Self {
            processor,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<J: Job, P: Processor<J>> DeliveryHandler for JobHandler<J, P> {
    async fn handle(&self, _broker: &dyn Broker, delivery: Delivery) -> BrokerResult<Outcome> {
        let job: J = match serde_json::from_slice(&delivery.message.payload) {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, "Rejecting message that does not parse");
                delivery.reject().await?;
                return Ok(Outcome::Rejected {
                    reason: "invalid_payload",
                });
            }
        };

        let job_id = job.job_id();
        if delivery.is_redelivery() {
            debug!(job_id = %job_id, delivery_count = delivery.delivery_count, "Redelivered job");
        }

        match self.processor.process(&job).await {
            Ok(()) => {
                delivery.ack().await?;
                debug!(job_id = %job_id, processor = self.processor.name(), "Job acknowledged");
                Ok(Outcome::Acked)
            }
            Err(e) => {
                let category = e.category();
                warn!(
                    job_id = %job_id,
                    processor = self.processor.name(),
                    category = %category,
                    error = %e,
                    "Job failed, rejecting without requeue"
                );
                delivery.reject().await?;
                Ok(Outcome::Rejected {
                    reason: category.as_str(),
                })
            }
        }
    }

    fn name(&self) -> &'static str {
        self.processor.name()
    }
}

/// Worker settings.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub queue: String,
    /// Pause in `Disconnected` before the next connection attempt
    pub reconnect_delay: Duration,
}

impl WorkerConfig {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            reconnect_delay: Duration::from_secs(5),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

/// Consumes one durable queue, one message in flight at a time.
pub struct QueueWorker<H> {
    connector: Arc<dyn Connector>,
    handler: H,
    config: WorkerConfig,
    state: watch::Sender<ConsumerState>,
    metrics: WorkerMetrics,
}

impl<H: DeliveryHandler> QueueWorker<H> {
    pub fn new(connector: Arc<dyn Connector>, handler: H, config: WorkerConfig) -> Self {
        let metrics = WorkerMetrics::new(&config.queue, handler.name());
        let (state, _) = watch::channel(ConsumerState::Disconnected);
        Self {
            connector,
            handler,
            config,
            state,
            metrics,
        }
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// A message already being handled runs to completion; shutdown is only
    /// observed while connecting, waiting for a message, or backing off.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            queue = %self.config.queue,
            handler = self.handler.name(),
            "Starting queue worker"
        );

        while !*shutdown.borrow() {
            match self.connect_and_consume(&mut shutdown).await {
                Ok(()) => break,
                Err(e) => {
                    self.transition(ConsumerState::Disconnected);
                    self.metrics.reconnect();
                    warn!(
                        queue = %self.config.queue,
                        error = %e,
                        delay_ms = self.config.reconnect_delay.as_millis() as u64,
                        "Broker transport failure, reconnecting after delay"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }

        self.transition(ConsumerState::Disconnected);
        info!(queue = %self.config.queue, "Queue worker stopped");
    }

    /// `Ok(())` means shutdown was requested.
    async fn connect_and_consume(&self, shutdown: &mut watch::Receiver<bool>) -> BrokerResult<()> {
        self.transition(ConsumerState::Connecting);
        let broker = tokio::select! {
            connected = self.connector.connect() => connected?,
            _ = shutdown.changed() => return Ok(()),
        };
        broker.declare_queue(&self.config.queue).await?;
        let mut consumer = broker.consume(&self.config.queue).await?;
        self.transition(ConsumerState::Consuming);

        loop {
            let delivery = tokio::select! {
                next = consumer.next() => next?,
                _ = shutdown.changed() => return Ok(()),
            };

            self.metrics.message_received();
            let started = Instant::now();
            match self.handler.handle(broker.as_ref(), delivery).await? {
                Outcome::Acked => self.metrics.message_acked(started.elapsed()),
                Outcome::Rejected { reason } => self.metrics.message_rejected(reason),
            }
        }
    }

    fn transition(&self, next: ConsumerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(queue = %self.config.queue, from = %previous, to = %next, "Consumer state changed");
            self.metrics.set_consuming(next == ConsumerState::Consuming);
        }
    }
}
