//! Progress reporting for batch runs.
//!
//! Interactive runs get an `indicatif` bar. With `--log-only` the bars are
//! hidden and progress goes through `tracing` at fixed intervals instead, so
//! the output stays readable when tailed or piped to a file.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

static LOG_ONLY: AtomicBool = AtomicBool::new(false);

const BAR_TEMPLATE: &str = "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})";
const SPINNER_TEMPLATE: &str = "{msg} {spinner} [{elapsed_precise}]";

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// "4.2s" under a minute, "3.1m" above.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

fn styled(pb: ProgressBar, template: &str) -> ProgressBar {
    match ProgressStyle::default_bar().template(template) {
        Ok(style) => pb.with_style(style.progress_chars("=> ")),
        Err(_) => pb,
    }
}

/// Bar for `len` known steps. Hidden in log-only mode.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let pb = if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        pb
    } else {
        styled(pb, BAR_TEMPLATE)
    };
    pb.set_message(msg.to_string());
    pb
}

/// Spinner for loading steps of unknown length. Hidden in log-only mode.
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let pb = if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        pb
    } else {
        let pb = match ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
            Ok(style) => pb.with_style(style),
            Err(_) => pb,
        };
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    };
    pb.set_message(msg.to_string());
    pb
}

/// Whether step `current` of `total` should be logged at this interval.
pub fn should_log(current: u64, total: u64, interval: u64) -> bool {
    interval > 0 && (current % interval == 0 || current == total)
}

/// Emit a progress line every `interval` steps, in log-only mode only.
pub fn log_progress(phase: &str, current: u64, total: u64, interval: u64) {
    if is_log_only() && should_log(current, total, interval) {
        let pct = if total == 0 {
            100.0
        } else {
            100.0 * current as f64 / total as f64
        };
        info!(phase, current, total, "{:.1}%", pct);
    }
}
