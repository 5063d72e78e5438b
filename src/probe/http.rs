//! HTTP probe implementation.
//!
//! One GET per target with a bounded wait; heterogeneous reqwest failures
//! are normalized into the small `HttpOutcome` taxonomy.

use std::time::Duration;

use crate::report::{HttpOutcome, UnreachableCause};

/// Probe `url` with a single GET.
///
/// Never errors outward: transport failures become
/// `HttpOutcome::Unreachable` with a classified cause. Redirects follow
/// reqwest's default bounded policy.
pub async fn probe_http(url: &str, timeout: Duration) -> HttpOutcome {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            return HttpOutcome::Unreachable(UnreachableCause::Other(format!(
                "client build failed: {}",
                e
            )))
        }
    };

    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();
            HttpOutcome::from_status(status.as_u16(), status.canonical_reason())
        }
        Err(e) => HttpOutcome::Unreachable(classify_error(e)),
    }
}

/// Collapse a reqwest error into an UnreachableCause.
///
/// Connect-phase failures (refused, unreachable, DNS) all count as
/// connection refusal; the diagnostic for anything else is the error's
/// top-level message without the URL, not a full chain.
fn classify_error(e: reqwest::Error) -> UnreachableCause {
    if e.is_timeout() {
        UnreachableCause::Timeout
    } else if e.is_connect() {
        UnreachableCause::ConnectionRefused
    } else {
        UnreachableCause::Other(e.without_url().to_string())
    }
}
