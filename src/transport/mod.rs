//! The `transport` module is responsible for handling network communication
//! with clients over plain TCP.
//!
//! It accepts connections, runs the frame codec over each one, and forwards
//! decoded requests to the dispatcher.

pub mod tcp;

pub use tcp::{handle_connection, serve, start_tcp_server};
