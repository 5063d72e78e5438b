//! Batch runner: orchestrates classification and both probes across a
//! target list, producing one report per target in input order.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::probe;
use crate::report::{BatchReport, HttpOutcome, TargetReport, UnreachableCause};
use crate::target::{HeuristicClassifier, Target, TargetClassifier, TargetKind};

/// Runs one batch of probes. Classification strategy is pluggable; the
/// default is the alphabetic-character heuristic.
pub struct Runner<C: TargetClassifier = HeuristicClassifier> {
    classifier: C,
    cfg: Config,
}

impl Runner<HeuristicClassifier> {
    pub fn new(cfg: Config) -> Self {
        Self::with_classifier(cfg, HeuristicClassifier)
    }
}

impl<C: TargetClassifier> Runner<C> {
    pub fn with_classifier(cfg: Config, classifier: C) -> Self {
        Self { classifier, cfg }
    }

    /// Run the batch.
    ///
    /// Every accepted target gets a reachability probe; only NamedHost
    /// targets get an HTTP probe. Per-target failures are recorded as
    /// result values and never abort the batch. `on_progress(completed,
    /// total)` fires exactly once per target with a monotonically
    /// increasing count; the final call has `completed == total`. An
    /// empty target list returns an empty report without probing or
    /// progress calls.
    ///
    /// Targets are probed under a concurrency bound (`cfg.concurrency`,
    /// default 1, i.e. sequential); the report is ordered by input index
    /// regardless of completion order. Dropping the returned future
    /// aborts in-flight probes and discards reports already completed
    /// within it; there is no partial-report handoff on cancellation.
    pub async fn run(
        &self,
        targets: &[String],
        mut on_progress: impl FnMut(usize, usize),
    ) -> BatchReport {
        let started = Utc::now();

        if targets.is_empty() {
            return BatchReport {
                started,
                finished: Utc::now(),
                reports: Vec::new(),
            };
        }

        let total = targets.len();
        let classified: Vec<Target> = targets
            .iter()
            .map(|raw| self.classifier.classify(raw))
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.cfg.concurrency));
        let mut set: JoinSet<(usize, TargetReport)> = JoinSet::new();

        for (idx, target) in classified.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let ping_timeout = self.cfg.ping_timeout;
            let http_timeout = self.cfg.http_timeout;

            set.spawn(async move {
                // the semaphore is never closed, so the permit is always granted
                let _permit = semaphore.acquire_owned().await.ok();

                tracing::debug!("probing {}", target.raw);
                let reachable = probe::probe_ping(&target.host, ping_timeout).await;
                let http = match target.url.as_deref() {
                    Some(url) => probe::probe_http(url, http_timeout).await,
                    None => HttpOutcome::NotApplicable,
                };

                (idx, TargetReport { target, reachable, http })
            });
        }

        let mut slots: Vec<Option<TargetReport>> = (0..total).map(|_| None).collect();
        let mut completed = 0usize;

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, report)) => {
                    slots[idx] = Some(report);
                }
                Err(e) => {
                    // a panicked probe task still counts as a completed
                    // target; its slot is backfilled below
                    tracing::error!("probe task failed: {}", e);
                }
            }
            completed += 1;
            on_progress(completed, total);
        }

        let reports = slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| slot.unwrap_or_else(|| failed_report(classified[idx].clone())))
            .collect();

        BatchReport {
            started,
            finished: Utc::now(),
            reports,
        }
    }
}

/// Backfill report for a target whose probe task did not return.
fn failed_report(target: Target) -> TargetReport {
    let http = match target.kind {
        TargetKind::IpLiteral => HttpOutcome::NotApplicable,
        TargetKind::NamedHost => {
            HttpOutcome::Unreachable(UnreachableCause::Other("probe task failed".to_string()))
        }
    };
    TargetReport {
        target,
        reachable: false,
        http,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_config(concurrency: usize) -> Config {
        Config {
            ping_timeout: Duration::from_millis(500),
            http_timeout: Duration::from_secs(5),
            concurrency,
            ..Config::default()
        }
    }

    async fn one_shot_responder(response: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf).await;
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });
        port
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuits() {
        let runner = Runner::new(test_config(1));
        let mut calls = 0;
        let report = runner.run(&[], |_, _| calls += 1).await;
        assert!(report.is_empty());
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_reports_progress() {
        let ok_port = one_shot_responder(
            "HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok",
        )
        .await;
        let missing_port = one_shot_responder(
            "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        let targets = vec![
            format!("http://127.0.0.1:{}/", ok_port),
            "127.0.0.1".to_string(),
            format!("http://127.0.0.1:{}/", missing_port),
        ];

        let runner = Runner::new(test_config(2));
        let mut progress: Vec<(usize, usize)> = Vec::new();
        let report = runner.run(&targets, |done, total| progress.push((done, total))).await;

        assert_eq!(report.len(), 3);
        for (i, row) in report.reports.iter().enumerate() {
            assert_eq!(row.target.raw, targets[i]);
        }

        assert!(matches!(
            report.reports[0].http,
            HttpOutcome::Success { status: 200, .. }
        ));
        assert_eq!(report.reports[1].http, HttpOutcome::NotApplicable);
        assert!(matches!(
            report.reports[2].http,
            HttpOutcome::Degraded { status: 404, .. }
        ));

        // exactly one call per target, monotonic, final call == total
        assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);
        assert!(report.finished >= report.started);
    }

    #[tokio::test]
    async fn test_ip_literal_never_gets_http_probe() {
        // unroutable TEST-NET address: ping fails, and there must be no
        // HTTP attempt at all
        let targets = vec!["203.0.113.1".to_string()];
        let runner = Runner::new(test_config(1));
        let report = runner.run(&targets, |_, _| {}).await;

        assert_eq!(report.len(), 1);
        assert_eq!(report.reports[0].target.kind, TargetKind::IpLiteral);
        assert_eq!(report.reports[0].http, HttpOutcome::NotApplicable);
        assert!(!report.reports[0].reachable);
    }

    #[tokio::test]
    async fn test_per_target_failure_does_not_abort_batch() {
        let ok_port = one_shot_responder(
            "HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok",
        )
        .await;

        // first target fails both probes, second succeeds over HTTP
        let targets = vec![
            "definitely-not-a-real-host.invalid".to_string(),
            format!("http://127.0.0.1:{}/", ok_port),
        ];

        let runner = Runner::new(test_config(1));
        let report = runner.run(&targets, |_, _| {}).await;

        assert_eq!(report.len(), 2);
        assert!(!report.reports[0].reachable);
        assert!(matches!(
            report.reports[0].http,
            HttpOutcome::Unreachable(_)
        ));
        assert!(matches!(
            report.reports[1].http,
            HttpOutcome::Success { status: 200, .. }
        ));
    }
}
