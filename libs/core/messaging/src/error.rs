//! Error types for brokers, message processing and RPC.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error categories used for logging and metrics labels.
///
/// Task messages are never requeued, so the category does not change the
/// acknowledgement outcome. It tells operators whether a lost task was caused
/// by bad input or by a flaky collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Temporary failure (network timeout, service unavailable)
    Transient,
    /// Unrecoverable (invalid data, missing required fields)
    Permanent,
    /// Upstream service rate limited
    RateLimited,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::RateLimited => "rate_limited",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-level failure talking to the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to connect to broker: {0}")]
    Connect(String),

    #[error("broker connection lost")]
    Disconnected,

    #[error("failed to declare queue '{queue}': {details}")]
    Declare { queue: String, details: String },

    #[error("failed to publish to '{queue}': {details}")]
    Publish { queue: String, details: String },

    #[error("failed to consume from '{queue}': {details}")]
    Consume { queue: String, details: String },

    #[error("failed to acknowledge message: {0}")]
    Ack(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BrokerError {
    pub fn publish(queue: impl Into<String>, details: impl fmt::Display) -> Self {
        Self::Publish {
            queue: queue.into(),
            details: details.to_string(),
        }
    }

    pub fn consume(queue: impl Into<String>, details: impl fmt::Display) -> Self {
        Self::Consume {
            queue: queue.into(),
            details: details.to_string(),
        }
    }

    pub fn declare(queue: impl Into<String>, details: impl fmt::Display) -> Self {
        Self::Declare {
            queue: queue.into(),
            details: details.to_string(),
        }
    }

    /// Whether the failure came from the transport (and a reconnect may help).
    pub fn is_transport(&self) -> bool {
        !matches!(self, BrokerError::Serialization(_))
    }

    pub fn category(&self) -> ErrorCategory {
        if self.is_transport() {
            ErrorCategory::Transient
        } else {
            ErrorCategory::Permanent
        }
    }
}

pub type BrokerResult<T> = Result<T, BrokerError>;

/// Error returned by a [`Processor`](crate::Processor) for one job.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Transient error (network timeout, temporary unavailability)
    #[error("transient error: {message}")]
    Transient {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Permanent error (invalid data, business logic failure)
    #[error("permanent error: {message}")]
    Permanent {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Rate limited by upstream service
    #[error("rate limited: {message}")]
    RateLimited { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProcessingError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            source: None,
        }
    }

    pub fn transient_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transient {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
            source: None,
        }
    }

    pub fn permanent_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Permanent {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ProcessingError::Transient { .. } => ErrorCategory::Transient,
            ProcessingError::Permanent { .. } => ErrorCategory::Permanent,
            ProcessingError::RateLimited { .. } => ErrorCategory::RateLimited,
            ProcessingError::Serialization(_) => ErrorCategory::Permanent,
        }
    }
}

/// Failure of a single RPC call.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("rpc transport failure: {0}")]
    Transport(#[from] BrokerError),

    #[error("no reply within {0:?}")]
    Timeout(Duration),
}

/// Decides whether a [`RetryPolicy`](crate::RetryPolicy) may try again.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for BrokerError {
    fn is_retryable(&self) -> bool {
        self.is_transport()
    }
}

impl Retryable for RpcError {
    fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport(e) => e.is_transport(),
            RpcError::Timeout(_) => false,
        }
    }
}
