//! Point Generalizer Runner
//!
//! Runs one generalization over a JSON feature file:
//! - Structured JSON logging on stderr
//! - Report (final set, ranking, warnings, manifest) as JSON on stdout or to a file
//! - Non-zero exit when dispersion does not converge, with the best-effort set still written
//!
//! ## Configuration
//!
//! Environment variables:
//! - `GENERALIZE_INPUT`: JSON array of source features (required)
//! - `GENERALIZE_POLICY`: JSON policy file (default: built-in policy)
//! - `GENERALIZE_OUTPUT`: Output path (default: stdout)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! GENERALIZE_INPUT=amenities.json cargo run --bin point_generalize --features cli
//! ```

use std::fs;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use point_generalizer::{
    GeneralizationError, GeneralizationPolicyV1, Generalizer, PlanarGeometryProvider,
    SourceFeature,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "point_generalize=info,point_generalizer=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true),
            )
            .init();
    }
}

fn load_policy() -> Result<GeneralizationPolicyV1, Box<dyn std::error::Error>> {
    match std::env::var("GENERALIZE_POLICY") {
        Ok(path) if !path.is_empty() => {
            let policy: GeneralizationPolicyV1 = serde_json::from_str(&fs::read_to_string(&path)?)?;
            info!(path = %path, params_hash = %policy.params_hash(), "Policy loaded");
            Ok(policy)
        }
        _ => {
            info!("GENERALIZE_POLICY not set, using default policy");
            Ok(GeneralizationPolicyV1::default())
        }
    }
}

fn write_output(bytes: &[u8]) -> std::io::Result<()> {
    match std::env::var("GENERALIZE_OUTPUT") {
        Ok(path) if !path.is_empty() => fs::write(path, bytes),
        _ => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.write_all(b"\n")
        }
    }
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let input = std::env::var("GENERALIZE_INPUT")
        .map_err(|_| "GENERALIZE_INPUT must name a JSON feature file")?;
    let policy = load_policy()?;

    let sources: Vec<SourceFeature> = serde_json::from_str(&fs::read_to_string(&input)?)?;
    info!(path = %input, features = sources.len(), "Input loaded");

    let provider = Arc::new(PlanarGeometryProvider::new(policy.footprint_segments));
    let generalizer = Generalizer::new(provider, policy);

    let start = Instant::now();
    match generalizer.generalize_with_report(&sources) {
        Ok(report) => {
            info!(
                output = report.final_set.len(),
                latency_ms = start.elapsed().as_millis() as u64,
                "Run finished"
            );
            write_output(&serde_json::to_vec_pretty(&report)?)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ GeneralizationError::DispersionNonConvergence { .. }) => {
            error!(error = %e, "Writing best-effort set");
            if let Some(best_effort) = e.best_effort() {
                write_output(&serde_json::to_vec_pretty(best_effort)?)?;
            }
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e.into()),
    }
}

fn main() -> ExitCode {
    init_tracing();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting point generalizer");

    match run() {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Generalization failed");
            ExitCode::FAILURE
        }
    }
}
