//! Target classification.
//!
//! Raw input lines become probe-ready targets: the host portion is
//! stripped of scheme and path for the ping, and name-based targets get a
//! fully-qualified URL for the HTTP probe. IP literals never receive an
//! HTTP probe.

use serde::Serialize;

/// Classification of an input target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TargetKind {
    /// A bare IP address; skip the HTTP probe
    IpLiteral,
    /// A hostname or URL; eligible for both probes
    NamedHost,
}

/// A probe-ready target derived from one trimmed, non-empty input line.
/// Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    /// The input line as entered (trimmed)
    pub raw: String,
    pub kind: TargetKind,
    /// Host portion with scheme prefix and path suffix stripped
    pub host: String,
    /// Fully-qualified probe URL; `Some` iff kind is NamedHost
    pub url: Option<String>,
}

/// Classification strategy. The default heuristic can be swapped for a
/// strict address parser without touching the batch runner.
pub trait TargetClassifier {
    fn classify(&self, raw: &str) -> Target;
}

/// Classifies by presence of an alphabetic character in the raw input:
/// any letter means NamedHost, otherwise (digits, dots, colons) IpLiteral.
///
/// Deliberately imprecise: it is the policy of treating anything
/// letter-free as an address, not an address parser. IPv6 literals with
/// hex letters (`::af`) classify as NamedHost and their HTTP probe fails
/// as unreachable; malformed hosts are accepted here and surface as probe
/// failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl TargetClassifier for HeuristicClassifier {
    fn classify(&self, raw: &str) -> Target {
        let host = strip_to_host(raw);
        let kind = if raw.chars().any(|c| c.is_alphabetic()) {
            TargetKind::NamedHost
        } else {
            TargetKind::IpLiteral
        };

        let url = match kind {
            TargetKind::NamedHost => Some(to_probe_url(raw)),
            TargetKind::IpLiteral => None,
        };

        Target {
            raw: raw.to_string(),
            kind,
            host,
            url,
        }
    }
}

/// Strip a leading `http://`/`https://` scheme and everything from the
/// first `/` onward.
fn strip_to_host(raw: &str) -> String {
    let without_scheme = raw
        .strip_prefix("http://")
        .or_else(|| raw.strip_prefix("https://"))
        .unwrap_or(raw);

    match without_scheme.split_once('/') {
        Some((host, _)) => host.to_string(),
        None => without_scheme.to_string(),
    }
}

/// Coerce a name-based target to a fully-qualified URL, defaulting to
/// https when no scheme is present.
fn to_probe_url(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    }
}

/// Split a block of input text into accepted targets: lines are trimmed
/// and blank lines discarded. Order is preserved.
pub fn parse_targets(input: &str) -> Vec<String> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ip_literal() {
        let target = HeuristicClassifier.classify("8.8.8.8");
        assert_eq!(target.kind, TargetKind::IpLiteral);
        assert_eq!(target.host, "8.8.8.8");
        assert!(target.url.is_none());
    }

    #[test]
    fn test_classify_bare_hostname() {
        let target = HeuristicClassifier.classify("google.com");
        assert_eq!(target.kind, TargetKind::NamedHost);
        assert_eq!(target.host, "google.com");
        assert_eq!(target.url.as_deref(), Some("https://google.com"));
    }

    #[test]
    fn test_classify_url_with_path_keeps_scheme() {
        let target = HeuristicClassifier.classify("http://example.com/path");
        assert_eq!(target.kind, TargetKind::NamedHost);
        assert_eq!(target.host, "example.com");
        assert_eq!(target.url.as_deref(), Some("http://example.com/path"));
    }

    #[test]
    fn test_classify_https_url() {
        let target = HeuristicClassifier.classify("https://example.com/a/b");
        assert_eq!(target.host, "example.com");
        assert_eq!(target.url.as_deref(), Some("https://example.com/a/b"));
    }

    #[test]
    fn test_classify_numeric_with_port_is_ip_literal() {
        // heuristic policy: no letters means address
        let target = HeuristicClassifier.classify("192.168.1.255");
        assert_eq!(target.kind, TargetKind::IpLiteral);
    }

    #[test]
    fn test_classify_hex_ipv6_is_named_host() {
        // known imprecision of the heuristic, kept as policy
        let target = HeuristicClassifier.classify("::af");
        assert_eq!(target.kind, TargetKind::NamedHost);
    }

    #[test]
    fn test_parse_targets_trims_and_drops_blanks() {
        let input = "google.com\n\n  8.8.8.8  \n\t\nexample.org\n";
        let targets = parse_targets(input);
        assert_eq!(targets, vec!["google.com", "8.8.8.8", "example.org"]);
    }

    #[test]
    fn test_parse_targets_empty_input() {
        assert!(parse_targets("").is_empty());
        assert!(parse_targets("\n  \n\t\n").is_empty());
    }
}
