//! Configuration module for statuscheck.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

/// Output format for the rendered batch report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bound on each reachability probe (default: 5s)
    pub ping_timeout: Duration,
    /// Bound on each HTTP probe (default: 10s)
    pub http_timeout: Duration,
    /// Number of targets probed in parallel (default: 1, sequential)
    pub concurrency: usize,
    /// Report rendering (default: text)
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ping_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(10),
            concurrency: 1,
            output: OutputFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `STATUSCHECK_PING_TIMEOUT_SECS`: reachability probe bound (default: 5)
    /// - `STATUSCHECK_HTTP_TIMEOUT_SECS`: HTTP probe bound (default: 10)
    /// - `STATUSCHECK_CONCURRENCY`: parallel targets, min 1 (default: 1)
    /// - `STATUSCHECK_OUTPUT`: `text` or `json` (default: text)
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(secs_str) = env::var("STATUSCHECK_PING_TIMEOUT_SECS") {
            if let Ok(secs) = secs_str.parse::<u64>() {
                cfg.ping_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(secs_str) = env::var("STATUSCHECK_HTTP_TIMEOUT_SECS") {
            if let Ok(secs) = secs_str.parse::<u64>() {
                cfg.http_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(n_str) = env::var("STATUSCHECK_CONCURRENCY") {
            if let Ok(n) = n_str.parse::<usize>() {
                cfg.concurrency = n.max(1);
            }
        }

        if let Ok(fmt) = env::var("STATUSCHECK_OUTPUT") {
            if fmt.eq_ignore_ascii_case("json") {
                cfg.output = OutputFormat::Json;
            }
        }

        cfg
    }
}
