//! # popmq
//!
//! `popmq` is a minimal message broker. Producers push byte-string messages
//! to named topics over TCP using a compact length-prefixed binary frame;
//! consumers pull them one at a time and acknowledge each one. A message that
//! is not acknowledged before its lease expires goes back to the head of its
//! topic, giving at-least-once delivery.
//!
//! ## Core Modules
//!
//! - `protocol`: the `Message` model and its wire codec.
//! - `broker`: per-topic queues, the topic registry, request dispatch and the
//!   redelivery sweeper.
//! - `persistence`: snapshot stores and the periodic snapshotter.
//! - `transport`: the TCP server loop.
//! - `client`: a small protocol client.
//! - `config`: server configuration loading.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod persistence;
pub mod protocol;
pub mod transport;
pub mod utils;
