//! Correlation-based request/reply over the broker.
//!
//! The client publishes plain-text requests to a well-known queue, tagging each
//! with a fresh correlation id and the address of its private reply queue. The
//! server consumes that queue one request at a time and replies to the given
//! address with the same correlation id.

mod client;
mod server;

pub use client::{RpcClient, RpcClientConfig};
pub use server::{RpcHandler, RpcServer};
