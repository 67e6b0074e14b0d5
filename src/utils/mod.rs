//! The `utils` module provides the error types and logging setup shared
//! across the `popmq` crate.

pub mod error;
pub mod logging;
