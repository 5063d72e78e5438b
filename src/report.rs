//! Result model for a batch run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::target::Target;

/// Why an HTTP probe obtained no response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cause", content = "detail")]
pub enum UnreachableCause {
    /// Connection refused, network unreachable, or DNS failure
    ConnectionRefused,
    /// The request exceeded its timeout
    Timeout,
    /// Any other transport or protocol failure, with a short diagnostic
    Other(String),
}

impl std::fmt::Display for UnreachableCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnreachableCause::ConnectionRefused => write!(f, "connection refused"),
            UnreachableCause::Timeout => write!(f, "timeout"),
            UnreachableCause::Other(msg) => write!(f, "{}", msg),
        }
    }
}

/// Normalized outcome of an HTTP probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome")]
pub enum HttpOutcome {
    /// Response received with a 2xx status
    Success { status: u16, reason: String },
    /// Response received with a non-2xx status
    Degraded { status: u16, reason: String },
    /// No response was obtained
    Unreachable(UnreachableCause),
    /// Target is an IP literal; no HTTP probe was issued
    NotApplicable,
}

impl HttpOutcome {
    /// Map a received status code to Success or Degraded on the [200,300)
    /// boundary. `reason` falls back to a synthesized phrase when the code
    /// has no canonical reason.
    pub fn from_status(status: u16, reason: Option<&str>) -> Self {
        let reason = reason
            .map(str::to_string)
            .unwrap_or_else(|| format!("status {}", status));
        if (200..300).contains(&status) {
            HttpOutcome::Success { status, reason }
        } else {
            HttpOutcome::Degraded { status, reason }
        }
    }
}

/// Per-target result: the unit of output, one per accepted input line.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub target: Target,
    pub reachable: bool,
    pub http: HttpOutcome,
}

/// Ordered collection of per-target results for one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub reports: Vec<TargetReport>,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_boundary() {
        assert!(matches!(
            HttpOutcome::from_status(200, Some("OK")),
            HttpOutcome::Success { status: 200, .. }
        ));
        assert!(matches!(
            HttpOutcome::from_status(299, None),
            HttpOutcome::Success { status: 299, .. }
        ));
        assert!(matches!(
            HttpOutcome::from_status(300, Some("Multiple Choices")),
            HttpOutcome::Degraded { status: 300, .. }
        ));
        assert!(matches!(
            HttpOutcome::from_status(404, Some("Not Found")),
            HttpOutcome::Degraded { status: 404, .. }
        ));
        assert!(matches!(
            HttpOutcome::from_status(199, None),
            HttpOutcome::Degraded { status: 199, .. }
        ));
    }

    #[test]
    fn test_synthesized_reason() {
        match HttpOutcome::from_status(299, None) {
            HttpOutcome::Success { reason, .. } => assert_eq!(reason, "status 299"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_reason_carried_through() {
        match HttpOutcome::from_status(404, Some("Not Found")) {
            HttpOutcome::Degraded { reason, .. } => assert_eq!(reason, "Not Found"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
