//! Replay recorded matching cases and report how the matcher decided them.
//! Usage: cargo run --release --bin replay-matches -- <cases.jsonl> [--stats-out stats.json]
//!
//! Each line is one case: the origin descriptor, the target platform, the
//! search results the platform returned, and optionally the id a human
//! picked as correct.

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use tunesync::config::{ConfigOverrides, MatchConfig};
use tunesync::matcher::explain_match;
use tunesync::models::{Candidate, MatchReport, TrackDescriptor};
use tunesync::platform::Platform;
use tunesync::progress::{
    create_progress_bar, create_spinner, format_duration, log_progress, set_log_only,
};
use tunesync::services::memory::{MemoryClient, MemoryFixture};
use tunesync::services::service_for;

#[derive(Parser)]
#[command(name = "replay-matches")]
#[command(about = "Evaluate the matcher against recorded search results")]
struct Args {
    /// JSON Lines file of recorded cases
    cases: PathBuf,

    /// Also write the stats JSON here
    #[arg(long)]
    stats_out: Option<PathBuf>,

    /// Matcher config (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Hide progress bars and log progress lines instead
    #[arg(long)]
    log_only: bool,
}

#[derive(Debug, Deserialize)]
struct Case {
    #[serde(default)]
    name: Option<String>,
    origin: TrackDescriptor,
    target: Platform,
    #[serde(default)]
    results: Vec<Candidate>,
    #[serde(default)]
    expected_id: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct ReplayStats {
    total: usize,
    matches: usize,
    no_matches: usize,
    errors: usize,
    by_stage: BTreeMap<String, usize>,
    expected_hits: usize,
    expected_misses: usize,
    match_rate: f64,
    expected_accuracy: Option<f64>,
}

const LOG_INTERVAL: u64 = 500;
const DEFAULT_FILTER: &str = "warn,replay_matches=info,tunesync::progress=info";

fn replay(case: &Case, config: &MatchConfig) -> Result<MatchReport> {
    let client = MemoryClient::new(MemoryFixture {
        search_results: case.results.clone(),
        ..MemoryFixture::default()
    });
    let service = service_for(case.target, Some(Arc::new(client)));
    Ok(explain_match(service.as_ref(), &case.origin, config)?)
}

fn read_cases(path: &Path) -> Result<(Vec<Case>, usize)> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut cases = Vec::new();
    let mut bad = 0;
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Case>(line) {
            Ok(case) => cases.push(case),
            Err(e) => {
                warn!(line = line_no + 1, error = %e, "Skipping malformed case");
                bad += 1;
            }
        }
    }
    Ok((cases, bad))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let config = match &args.config {
        Some(path) => MatchConfig::from_json_file(path).context("Failed to load matcher config")?,
        None => MatchConfig::default(),
    };
    let config = args.overrides.apply(config);

    let start = Instant::now();
    let spinner = create_spinner("Loading cases");
    let (cases, malformed) = read_cases(&args.cases)?;
    spinner.finish_and_clear();
    info!(cases = cases.len(), malformed, "Loaded cases");

    let total = cases.len() as u64;
    let pb = create_progress_bar(total, "Replaying");
    let done = AtomicU64::new(0);

    let outcomes: Vec<(&Case, Result<MatchReport>)> = cases
        .par_iter()
        .map(|case| {
            let outcome = replay(case, &config);
            pb.inc(1);
            let current = done.fetch_add(1, Ordering::Relaxed) + 1;
            log_progress("replay", current, total, LOG_INTERVAL);
            (case, outcome)
        })
        .collect();
    pb.finish_with_message("Replayed");

    let mut stats = ReplayStats {
        total: cases.len(),
        errors: malformed,
        ..ReplayStats::default()
    };
    for (case, outcome) in outcomes {
        let report = match outcome {
            Ok(report) => report,
            Err(e) => {
                warn!(case = case.name.as_deref().unwrap_or("?"), error = %e, "Replay failed");
                stats.errors += 1;
                continue;
            }
        };

        let stage = serde_json::to_value(report.stage)?
            .as_str()
            .unwrap_or("unknown")
            .to_string();
        *stats.by_stage.entry(stage).or_default() += 1;

        let winner = report.winner.as_ref().and_then(|w| w.track_id());
        if report.stage.is_match() {
            stats.matches += 1;
        } else {
            stats.no_matches += 1;
        }
        if let Some(expected) = &case.expected_id {
            if winner == Some(expected.as_str()) {
                stats.expected_hits += 1;
            } else {
                stats.expected_misses += 1;
            }
        }
    }

    if stats.total > 0 {
        stats.match_rate = stats.matches as f64 / stats.total as f64;
    }
    let labelled = stats.expected_hits + stats.expected_misses;
    if labelled > 0 {
        stats.expected_accuracy = Some(stats.expected_hits as f64 / labelled as f64);
    }

    let json = serde_json::to_string_pretty(&stats)?;
    if let Some(path) = &args.stats_out {
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    println!("{}", json);

    info!(
        elapsed = %format_duration(start.elapsed()),
        matches = stats.matches,
        total = stats.total,
        "Replay complete"
    );
    Ok(())
}
