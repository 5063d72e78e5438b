//! Probe module for batch status checking.
//!
//! Supports ICMP ping and HTTP probes. Both probes convert every failure
//! mode into a result value at this boundary; nothing here propagates to
//! the batch runner as an error.

mod http;
mod ping;

pub use http::*;
pub use ping::*;

use std::time::Duration;
use thiserror::Error;

/// Probe error types, internal to the probe implementations.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("command failed: {0}")]
    Command(String),
}
