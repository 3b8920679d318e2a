//! In-memory broker for tests and local runs.
//!
//! Mirrors the delivery model of the real backends: durable queues with
//! manual acknowledgement, redelivery of unacknowledged messages when a
//! connection drops, and private reply queues that die with their connection.
//! [`InMemoryBroker::sever_connections`] and [`InMemoryBroker::set_offline`]
//! simulate network trouble.

use crate::broker::{Broker, Connector, QueueConsumer, ReplyQueue};
use crate::error::{BrokerError, BrokerResult};
use crate::message::{Acknowledger, Delivery, Message};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    notify: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Default)]
struct State {
    /// Bumped on every simulated disconnect; stale connections fail
    generation: u64,
    offline: bool,
    connects: u64,
    next_tag: u64,
    queues: HashMap<String, QueueState>,
    reply_queues: HashMap<String, ReplyState>,
}

impl State {
    fn check(&self, generation: u64) -> BrokerResult<()> {
        if self.offline || generation != self.generation {
            Err(BrokerError::Disconnected)
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<(Message, u32)>,
    unacked: HashMap<u64, (Message, u32)>,
    acked: usize,
    rejected: usize,
}

struct ReplyState {
    generation: u64,
    messages: VecDeque<Message>,
}

/// Broker living in process memory. Cloning shares the same broker.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    shared: Arc<Shared>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every open connection.
    ///
    /// Unacknowledged messages go back to the front of their queue and are
    /// redelivered; reply queues are destroyed.
    pub fn sever_connections(&self) {
        {
            let mut state = self.shared.lock();
            state.generation += 1;
            let current = state.generation;
            for queue in state.queues.values_mut() {
                let mut pending: Vec<_> = queue.unacked.drain().collect();
                pending.sort_by_key(|(tag, _)| *tag);
                for (_, (message, count)) in pending.into_iter().rev() {
                    queue.ready.push_front((message, count));
                }
            }
            state.reply_queues.retain(|_, q| q.generation == current);
        }
        debug!("In-memory broker severed all connections");
        self.shared.notify.notify_waiters();
    }

    /// While offline, connection attempts fail and open connections are dead.
    pub fn set_offline(&self, offline: bool) {
        self.shared.lock().offline = offline;
        if offline {
            self.sever_connections();
        }
    }

    /// Number of successful `connect` calls so far.
    pub fn connect_count(&self) -> u64 {
        self.shared.lock().connects
    }

    /// Messages waiting to be delivered.
    pub fn ready_count(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.ready.len())
    }

    /// Messages delivered but not yet settled.
    pub fn unacked_count(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.unacked.len())
    }

    pub fn acked_count(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.acked)
    }

    /// Messages negatively acknowledged without requeue.
    pub fn rejected_count(&self, queue: &str) -> usize {
        self.with_queue(queue, |q| q.rejected)
    }

    /// Snapshot of messages waiting in `queue`.
    pub fn peek(&self, queue: &str) -> Vec<Message> {
        self.with_queue(queue, |q| q.ready.iter().map(|(m, _)| m.clone()).collect())
    }

    fn with_queue<T: Default>(&self, queue: &str, f: impl FnOnce(&QueueState) -> T) -> T {
        self.shared.lock().queues.get(queue).map(f).unwrap_or_default()
    }
}

#[async_trait]
impl Connector for InMemoryBroker {
    async fn connect(&self) -> BrokerResult<Arc<dyn Broker>> {
        let mut state = self.shared.lock();
        if state.offline {
            return Err(BrokerError::Connect("in-memory broker is offline".into()));
        }
        state.connects += 1;
        Ok(Arc::new(InMemoryConnection {
            shared: self.shared.clone(),
            generation: state.generation,
        }))
    }
}

/// One connection to an [`InMemoryBroker`].
pub struct InMemoryConnection {
    shared: Arc<Shared>,
    generation: u64,
}

#[async_trait]
impl Broker for InMemoryConnection {
    async fn declare_queue(&self, queue: &str) -> BrokerResult<()> {
        let mut state = self.shared.lock();
        state.check(self.generation)?;
        state.queues.entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn publish(&self, queue: &str, message: Message) -> BrokerResult<()> {
        {
            let mut state = self.shared.lock();
            state.check(self.generation)?;
            let target = state
                .queues
                .get_mut(queue)
                .ok_or_else(|| BrokerError::publish(queue, "queue not declared"))?;
            target.ready.push_back((message, 1));
        }
        self.shared.notify.notify_waiters();
        Ok(())
    }

    async fn consume(&self, queue: &str) -> BrokerResult<Box<dyn QueueConsumer>> {
        let state = self.shared.lock();
        state.check(self.generation)?;
        if !state.queues.contains_key(queue) {
            return Err(BrokerError::consume(queue, "queue not declared"));
        }
        Ok(Box::new(InMemoryConsumer {
            shared: self.shared.clone(),
            generation: self.generation,
            queue: queue.to_string(),
        }))
    }

    async fn reply_queue(&self) -> BrokerResult<Box<dyn ReplyQueue>> {
        let address = format!("_INBOX.mem.{}", uuid::Uuid::new_v4().simple());
        let mut state = self.shared.lock();
        state.check(self.generation)?;
        state.reply_queues.insert(
            address.clone(),
            ReplyState {
                generation: self.generation,
                messages: VecDeque::new(),
            },
        );
        Ok(Box::new(InMemoryReplyQueue {
            shared: self.shared.clone(),
            generation: self.generation,
            address,
        }))
    }

    async fn send_reply(&self, address: &str, message: Message) -> BrokerResult<()> {
        {
            let mut state = self.shared.lock();
            state.check(self.generation)?;
            match state.reply_queues.get_mut(address) {
                Some(queue) => queue.messages.push_back(message),
                None => debug!(address, "Dropping reply to unknown address"),
            }
        }
        self.shared.notify.notify_waiters();
        Ok(())
    }
}

struct InMemoryConsumer {
    shared: Arc<Shared>,
    generation: u64,
    queue: String,
}

impl InMemoryConsumer {
    fn try_take(&self) -> BrokerResult<Option<Delivery>> {
        let mut state = self.shared.lock();
        state.check(self.generation)?;
        state.next_tag += 1;
        let tag = state.next_tag;

        let queue = state
            .queues
            .get_mut(&self.queue)
            .ok_or_else(|| BrokerError::consume(&self.queue, "queue deleted"))?;
        let Some((message, count)) = queue.ready.pop_front() else {
            return Ok(None);
        };
        queue.unacked.insert(tag, (message.clone(), count + 1));

        let acker = InMemoryAcker {
            shared: self.shared.clone(),
            generation: self.generation,
            queue: self.queue.clone(),
            tag,
        };
        Ok(Some(Delivery::new(message, count, Box::new(acker))))
    }
}

#[async_trait]
impl QueueConsumer for InMemoryConsumer {
    async fn next(&mut self) -> BrokerResult<Delivery> {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(delivery) = self.try_take()? {
                return Ok(delivery);
            }
            notified.await;
        }
    }
}

struct InMemoryAcker {
    shared: Arc<Shared>,
    generation: u64,
    queue: String,
    tag: u64,
}

impl InMemoryAcker {
    fn settle(&self, accepted: bool) -> BrokerResult<()> {
        let mut state = self.shared.lock();
        state.check(self.generation)?;
        let queue = state
            .queues
            .get_mut(&self.queue)
            .ok_or_else(|| BrokerError::Ack(format!("queue '{}' deleted", self.queue)))?;
        if queue.unacked.remove(&self.tag).is_none() {
            return Err(BrokerError::Ack(format!("unknown delivery tag {}", self.tag)));
        }
        if accepted {
            queue.acked += 1;
        } else {
            queue.rejected += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl Acknowledger for InMemoryAcker {
    async fn ack(self: Box<Self>) -> BrokerResult<()> {
        self.settle(true)
    }

    async fn reject(self: Box<Self>) -> BrokerResult<()> {
        self.settle(false)
    }
}

struct InMemoryReplyQueue {
    shared: Arc<Shared>,
    generation: u64,
    address: String,
}

impl InMemoryReplyQueue {
    fn try_pop(&self) -> BrokerResult<Option<Message>> {
        let mut state = self.shared.lock();
        state.check(self.generation)?;
        let queue = state
            .reply_queues
            .get_mut(&self.address)
            .ok_or(BrokerError::Disconnected)?;
        Ok(queue.messages.pop_front())
    }
}

#[async_trait]
impl ReplyQueue for InMemoryReplyQueue {
    fn address(&self) -> &str {
        &self.address
    }

    async fn recv(&mut self, wait: Duration) -> BrokerResult<Option<Message>> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(message) = self.try_pop()? {
                return Ok(Some(message));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_pop();
            }
        }
    }
}

impl Drop for InMemoryReplyQueue {
    fn drop(&mut self) {
        self.shared.lock().reply_queues.remove(&self.address);
    }
}
