//! statuscheck - batch website & IP status checker
//!
//! Reads a list of hostnames or IP addresses (one per line, from files
//! given as arguments or from stdin), probes each for ping reachability
//! and HTTP availability, and prints one status row per target.

mod config;
mod probe;
mod report;
mod runner;
mod target;

use std::io::Read;

use config::{Config, OutputFormat};
use report::{BatchReport, HttpOutcome, TargetReport};
use runner::Runner;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("statuscheck=info".parse()?),
        )
        .init();

    let cfg = Config::load();

    let input = read_input(std::env::args().skip(1))?;
    let targets = target::parse_targets(&input);

    if targets.is_empty() {
        tracing::warn!("no targets given; enter one website or IP per line");
        std::process::exit(2);
    }

    tracing::info!("checking {} targets...", targets.len());

    let runner = Runner::new(cfg.clone());
    let batch = runner
        .run(&targets, |completed, total| {
            tracing::info!("progress: {}/{}", completed, total);
        })
        .await;

    match cfg.output {
        OutputFormat::Text => render_text(&batch),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&batch)?),
    }

    Ok(())
}

/// Concatenate the given input files, or read stdin when none are given.
fn read_input(paths: impl Iterator<Item = String>) -> std::io::Result<String> {
    let paths: Vec<String> = paths.collect();
    if paths.is_empty() {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }

    let mut buf = String::new();
    for path in paths {
        buf.push_str(&std::fs::read_to_string(path)?);
        buf.push('\n');
    }
    Ok(buf)
}

fn render_text(batch: &BatchReport) {
    for row in &batch.reports {
        println!("{}", render_row(row));
    }
    println!("done: {} targets checked", batch.len());
}

/// One status row: target, ping verdict, HTTP outcome.
fn render_row(row: &TargetReport) -> String {
    let ping = if row.reachable {
        "✅ ping ok"
    } else {
        "❌ ping failed"
    };

    let http = match &row.http {
        HttpOutcome::Success { status, reason } => {
            format!("✅ online ({} {})", status, reason)
        }
        HttpOutcome::Degraded { status, reason } => {
            format!("⚠️ degraded ({} {})", status, reason)
        }
        HttpOutcome::Unreachable(cause) => format!("❌ offline ({})", cause),
        HttpOutcome::NotApplicable => "⚪ n/a (IP address)".to_string(),
    };

    format!("{} | {} | {}", row.target.raw, ping, http)
}
