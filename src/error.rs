//! Crate-wide error types.
//!
//! `main` only needs to distinguish startup-fatal errors (exit 1) from a
//! clean shutdown (exit 0); everything below the supervisor logs through
//! `log` instead of propagating (see §7 of the design).

use thiserror::Error;

use crate::adapters::AdapterError;
use crate::config::ConfigError;
use crate::queue::QueueError;

/// Top-level error returned by the supervisor's bring-up path.
#[derive(Debug, Error)]
pub enum KplexError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
