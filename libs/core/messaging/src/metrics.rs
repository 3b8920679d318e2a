//! Prometheus metrics for queue workers and RPC calls.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Metrics recorded by a [`QueueWorker`](crate::QueueWorker).
#[derive(Clone, Debug)]
pub struct WorkerMetrics {
    queue: String,
    handler: String,
}

impl WorkerMetrics {
    pub fn new(queue: &str, handler: &str) -> Self {
        Self {
            queue: queue.to_string(),
            handler: handler.to_string(),
        }
    }

    pub fn message_received(&self) {
        counter!(
            "recs_worker_messages_received_total",
            "queue" => self.queue.clone(),
            "handler" => self.handler.clone()
        )
        .increment(1);
    }

    pub fn message_acked(&self, duration: Duration) {
        counter!(
            "recs_worker_messages_acked_total",
            "queue" => self.queue.clone(),
            "handler" => self.handler.clone()
        )
        .increment(1);

        histogram!(
            "recs_worker_processing_seconds",
            "queue" => self.queue.clone(),
            "handler" => self.handler.clone()
        )
        .record(duration.as_secs_f64());
    }

    /// `reason` is an error category or `invalid_payload`.
    pub fn message_rejected(&self, reason: &str) {
        counter!(
            "recs_worker_messages_rejected_total",
            "queue" => self.queue.clone(),
            "handler" => self.handler.clone(),
            "reason" => reason.to_string()
        )
        .increment(1);
    }

    pub fn reconnect(&self) {
        counter!(
            "recs_worker_reconnects_total",
            "queue" => self.queue.clone(),
            "handler" => self.handler.clone()
        )
        .increment(1);
    }

    pub fn set_consuming(&self, consuming: bool) {
        gauge!(
            "recs_worker_consuming",
            "queue" => self.queue.clone(),
            "handler" => self.handler.clone()
        )
        .set(if consuming { 1.0 } else { 0.0 });
    }
}

/// Count an RPC call by outcome (`ok`, `timeout`, `transport_error`).
pub fn record_rpc_call(outcome: &'static str) {
    counter!("recs_rpc_calls_total", "outcome" => outcome).increment(1);
}
