use crate::broker::{Broker, Connector, ReplyQueue};
use crate::error::{BrokerError, BrokerResult, RpcError};
use crate::message::Message;
use crate::metrics::record_rpc_call;
use crate::retry::RetryPolicy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// RPC client settings.
#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    /// Well-known queue the server consumes
    pub rpc_queue: String,
    /// Applied to transport failures only; a timeout is never retried
    pub retry: RetryPolicy,
    /// Upper bound of one wait on the reply queue
    pub poll_interval: Duration,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            rpc_queue: "rpc_queue".to_string(),
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl RpcClientConfig {
    pub fn new(rpc_queue: impl Into<String>) -> Self {
        Self {
            rpc_queue: rpc_queue.into(),
            ..Self::default()
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Calls waiting for a reply, keyed by correlation id.
///
/// `None` once the reply reader has stopped; no call can register after that.
struct Waiters(StdMutex<Option<HashMap<String, oneshot::Sender<Message>>>>);

impl Waiters {
    fn new() -> Self {
        Self(StdMutex::new(Some(HashMap::new())))
    }

    fn lock(&self) -> MutexGuard<'_, Option<HashMap<String, oneshot::Sender<Message>>>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn register(&self, correlation_id: &str) -> BrokerResult<oneshot::Receiver<Message>> {
        let (tx, rx) = oneshot::channel();
        self.lock()
            .as_mut()
            .ok_or(BrokerError::Disconnected)?
            .insert(correlation_id.to_string(), tx);
        Ok(rx)
    }

    fn forget(&self, correlation_id: &str) {
        if let Some(waiters) = self.lock().as_mut() {
            waiters.remove(correlation_id);
        }
    }

    fn take(&self, correlation_id: &str) -> Option<oneshot::Sender<Message>> {
        self.lock().as_mut()?.remove(correlation_id)
    }

    /// Drop every pending sender so the waiting calls see a disconnect.
    fn close(&self) {
        self.lock().take();
    }
}

/// One connection, its private reply queue and the task routing replies.
struct Session {
    broker: Arc<dyn Broker>,
    reply_to: String,
    waiters: Arc<Waiters>,
    reader: JoinHandle<()>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Request/reply client.
///
/// Calls on one client run concurrently. Each waits on its own channel, fed by
/// a reader task that routes replies by correlation id, so every call is bound
/// by its own timeout.
pub struct RpcClient {
    connector: Arc<dyn Connector>,
    config: RpcClientConfig,
    session: Mutex<Option<Arc<Session>>>,
}

impl RpcClient {
    /// Connect and declare the private reply queue.
    pub async fn connect(
        connector: Arc<dyn Connector>,
        config: RpcClientConfig,
    ) -> Result<Self, RpcError> {
        let session = open_session(connector.as_ref(), &config).await?;
        Ok(Self {
            connector,
            config,
            session: Mutex::new(Some(Arc::new(session))),
        })
    }

    /// Replace the session with a fresh connection and reply queue.
    pub async fn reconnect(&self) -> Result<(), RpcError> {
        let mut session = self.session.lock().await;
        *session = None;
        let fresh = open_session(self.connector.as_ref(), &self.config).await?;
        *session = Some(Arc::new(fresh));
        info!(rpc_queue = %self.config.rpc_queue, "RPC client reconnected");
        Ok(())
    }

    /// Send `payload` and wait up to `timeout` for the correlated reply.
    ///
    /// Transport failures resubmit the whole call on a fresh connection,
    /// within the configured retry policy.
    #[instrument(skip(self, payload), fields(rpc_queue = %self.config.rpc_queue))]
    pub async fn call(&self, payload: &str, timeout: Duration) -> Result<String, RpcError> {
        let result = self
            .config
            .retry
            .run(
                move || self.attempt(payload, timeout),
                move || self.reconnect(),
            )
            .await;

        record_rpc_call(match &result {
            Ok(_) => "ok",
            Err(RpcError::Timeout(_)) => "timeout",
            Err(RpcError::Transport(_)) => "transport_error",
        });
        result
    }

    async fn attempt(&self, payload: &str, timeout: Duration) -> Result<String, RpcError> {
        let deadline = Instant::now() + timeout;
        let session = self
            .session
            .lock()
            .await
            .clone()
            .ok_or(BrokerError::Disconnected)?;

        let correlation_id = Uuid::new_v4().to_string();
        let reply = session.waiters.register(&correlation_id)?;
        let request = Message::new(payload)
            .with_correlation_id(correlation_id.clone())
            .with_reply_to(session.reply_to.clone());
        if let Err(e) = session.broker.publish(&self.config.rpc_queue, request).await {
            session.waiters.forget(&correlation_id);
            return Err(e.into());
        }
        debug!(correlation_id = %correlation_id, "RPC request published");

        match tokio::time::timeout_at(deadline, reply).await {
            Ok(Ok(reply)) => Ok(reply.text().into_owned()),
            Ok(Err(_)) => Err(BrokerError::Disconnected.into()),
            Err(_) => {
                session.waiters.forget(&correlation_id);
                warn!(correlation_id = %correlation_id, timeout_ms = timeout.as_millis() as u64, "RPC call timed out");
                Err(RpcError::Timeout(timeout))
            }
        }
    }
}

async fn open_session(connector: &dyn Connector, config: &RpcClientConfig) -> BrokerResult<Session> {
    let broker = connector.connect().await?;
    broker.declare_queue(&config.rpc_queue).await?;
    let replies = broker.reply_queue().await?;
    let reply_to = replies.address().to_string();
    debug!(reply_to = %reply_to, "RPC reply queue ready");

    let waiters = Arc::new(Waiters::new());
    let reader = tokio::spawn(route_replies(replies, waiters.clone(), config.poll_interval));
    Ok(Session {
        broker,
        reply_to,
        waiters,
        reader,
    })
}

async fn route_replies(mut replies: Box<dyn ReplyQueue>, waiters: Arc<Waiters>, poll: Duration) {
    loop {
        match replies.recv(poll).await {
            Ok(Some(reply)) => {
                let waiter = reply
                    .correlation_id
                    .as_deref()
                    .and_then(|id| waiters.take(id));
                match waiter {
                    Some(tx) => {
                        let _ = tx.send(reply);
                    }
                    None => debug!(
                        received = ?reply.correlation_id,
                        "Ignoring reply with no waiting call"
                    ),
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "RPC reply queue failed");
                break;
            }
        }
    }
    waiters.close();
}
