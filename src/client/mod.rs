//! The `client` module provides a minimal protocol client for the broker.
//!
//! It is what the `produce` and `consume` CLI subcommands use, and what the
//! end-to-end tests drive the server with.

pub mod queue_client;
pub use queue_client::Client;
