//! Test fixtures backed by testcontainers.
//!
//! Tests using them need Docker and are marked `#[ignore = "requires docker"]`;
//! run them with `cargo test -- --ignored`.

#[cfg(feature = "nats")]
mod nats;

#[cfg(feature = "nats")]
pub use nats::TestNats;
