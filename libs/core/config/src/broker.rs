use crate::{env_or_default, env_parse, ConfigError, FromEnv};
use std::time::Duration;

/// Broker connection settings shared by dispatchers, consumers and the RPC layer
#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// Server address, e.g. `nats://localhost:4222`
    pub url: String,
    /// Client name reported to the server
    pub connection_name: String,
    pub connect_timeout: Duration,
    /// Heartbeat interval
    pub ping_interval: Duration,
    /// Durable queue carrying task descriptors
    pub task_queue: String,
    /// Well-known queue the RPC server consumes
    pub rpc_queue: String,
    /// Pause between a transport failure and the next connection attempt
    pub reconnect_delay: Duration,
}

impl BrokerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_connection_name(mut self, name: impl Into<String>) -> Self {
        self.connection_name = name.into();
        self
    }

    pub fn with_task_queue(mut self, queue: impl Into<String>) -> Self {
        self.task_queue = queue.into();
        self
    }

    pub fn with_rpc_queue(mut self, queue: impl Into<String>) -> Self {
        self.rpc_queue = queue.into();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            connection_name: "recs-ml-worker".to_string(),
            connect_timeout: Duration::from_secs(2),
            ping_interval: Duration::from_secs(30),
            task_queue: "ml_task_queue".to_string(),
            rpc_queue: "rpc_queue".to_string(),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

impl FromEnv for BrokerConfig {
    /// Reads:
    /// - NATS_URL (default nats://localhost:4222)
    /// - BROKER_CONNECTION_NAME (default recs-ml-worker)
    /// - BROKER_CONNECT_TIMEOUT_SECS (default 2)
    /// - BROKER_PING_INTERVAL_SECS (default 30)
    /// - TASK_QUEUE (default ml_task_queue)
    /// - RPC_QUEUE (default rpc_queue)
    /// - RECONNECT_DELAY_SECS (default 5)
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            url: env_or_default("NATS_URL", &defaults.url),
            connection_name: env_or_default("BROKER_CONNECTION_NAME", &defaults.connection_name),
            connect_timeout: Duration::from_secs(env_parse("BROKER_CONNECT_TIMEOUT_SECS", 2u64)?),
            ping_interval: Duration::from_secs(env_parse("BROKER_PING_INTERVAL_SECS", 30u64)?),
            task_queue: env_or_default("TASK_QUEUE", &defaults.task_queue),
            rpc_queue: env_or_default("RPC_QUEUE", &defaults.rpc_queue),
            reconnect_delay: Duration::from_secs(env_parse("RECONNECT_DELAY_SECS", 5u64)?),
        })
    }
}
