//! Statistics collection and export for experiments.
//!
//! Tracks how many cases ran, how they ended and how long the sweep took,
//! with JSON and CSV export and a human-readable summary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::orchestrator::ExperimentOutcome;
use crate::selector::ExperimentResult;
use crate::types::ClockCount;

/// Aggregate statistics for an experiment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExperimentStats {
    /// Experiment metadata
    pub metadata: ExperimentMetadata,

    /// Case outcome statistics
    pub cases: CaseStats,

    /// Timing statistics
    pub timing: TimingStats,
}

/// Metadata about the experiment run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    /// Experiment name
    pub name: String,

    /// Start time (wall clock)
    pub start_time: Option<String>,

    /// End time (wall clock)
    pub end_time: Option<String>,

    /// Crate version
    pub version: String,

    /// Configuration file used (if any)
    pub config_file: Option<String>,
}

/// Case outcome statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CaseStats {
    /// Cases in the design space
    pub total: usize,

    /// Cases that produced a result
    pub succeeded: usize,

    /// Cases recorded as failures
    pub failed: usize,

    /// Failure counts keyed by failure kind
    pub failures_by_kind: BTreeMap<String, usize>,

    /// Lowest clock count among successful cases
    pub best_clocks: Option<ClockCount>,

    /// Highest clock count among successful cases
    pub worst_clocks: Option<ClockCount>,

    /// Mean clock count among successful cases
    pub mean_clocks: f64,
}

/// Timing/performance statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TimingStats {
    /// Total wall-clock time in milliseconds
    pub total_wall_time_ms: f64,

    /// Cases completed per wall-clock second
    pub cases_per_second: f64,
}

impl ExperimentStats {
    /// Creates a new empty statistics container.
    pub fn new() -> Self {
        Self {
            metadata: ExperimentMetadata {
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..ExperimentMetadata::default()
            },
            ..Self::default()
        }
    }

    /// Sets the experiment name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = name.into();
        self
    }

    /// Records the start time.
    pub fn record_start(&mut self) {
        self.metadata.start_time = Some(timestamp_now());
    }

    /// Records the end time.
    pub fn record_end(&mut self) {
        self.metadata.end_time = Some(timestamp_now());
    }

    /// Tallies the cases of a finished sweep.
    pub fn record_outcome(&mut self, outcome: &ExperimentOutcome) {
        self.cases.total = outcome.case_count();
        self.cases.succeeded = outcome.results.len();
        self.cases.failed = outcome.failures.len();
        self.cases.failures_by_kind = outcome
            .failures_by_kind()
            .into_iter()
            .map(|(kind, n)| (kind.to_string(), n))
            .collect();

        let clocks = outcome.results.iter().map(ExperimentResult::clock_count);
        self.cases.best_clocks = clocks.clone().min();
        self.cases.worst_clocks = clocks.clone().max();
        self.cases.mean_clocks = if outcome.results.is_empty() {
            0.0
        } else {
            clocks.map(|c| c as f64).sum::<f64>() / outcome.results.len() as f64
        };
    }

    /// Updates timing statistics based on wall clock time.
    pub fn compute_timing(&mut self, wall_time_ms: f64) {
        self.timing.total_wall_time_ms = wall_time_ms;

        if wall_time_ms > 0.0 {
            let seconds = wall_time_ms / 1000.0;
            self.timing.cases_per_second = self.cases.total as f64 / seconds;
        }
    }

    /// Exports statistics to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Exports statistics to JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self.to_json().map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e)
        })?;
        std::fs::write(path, json)
    }

    /// Exports summary statistics to CSV.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str("metric,value\n");

        // Case stats
        csv.push_str(&format!("cases_total,{}\n", self.cases.total));
        csv.push_str(&format!("cases_succeeded,{}\n", self.cases.succeeded));
        csv.push_str(&format!("cases_failed,{}\n", self.cases.failed));
        for (kind, count) in &self.cases.failures_by_kind {
            csv.push_str(&format!("failed_{},{}\n", kind, count));
        }
        if let Some(best) = self.cases.best_clocks {
            csv.push_str(&format!("best_clocks,{}\n", best));
        }
        if let Some(worst) = self.cases.worst_clocks {
            csv.push_str(&format!("worst_clocks,{}\n", worst));
        }
        csv.push_str(&format!("mean_clocks,{:.2}\n", self.cases.mean_clocks));

        // Timing stats
        csv.push_str(&format!("wall_time_ms,{:.2}\n", self.timing.total_wall_time_ms));
        csv.push_str(&format!("cases_per_second,{:.2}\n", self.timing.cases_per_second));

        csv
    }

    /// Exports summary statistics to CSV file.
    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        std::fs::write(path, self.to_csv())
    }

    /// Exports per-case results to CSV, one row per case.
    pub fn results_to_csv(results: &[ExperimentResult]) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str("case,clocks,area\n");

        // Data rows
        for result in results {
            csv.push_str(&format!(
                "{},{},{}\n",
                result.name(),
                result.clock_count(),
                result.area(),
            ));
        }

        csv
    }

    /// Writes a human-readable summary to a writer.
    pub fn write_summary<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "=== Experiment Statistics ===")?;
        writeln!(w)?;

        if !self.metadata.name.is_empty() {
            writeln!(w, "Name: {}", self.metadata.name)?;
        }
        if let Some(ref start) = self.metadata.start_time {
            writeln!(w, "Started: {}", start)?;
        }
        if let Some(ref end) = self.metadata.end_time {
            writeln!(w, "Ended: {}", end)?;
        }
        writeln!(w)?;

        writeln!(w, "--- Cases ---")?;
        writeln!(w, "Total: {}", self.cases.total)?;
        writeln!(w, "Succeeded: {}", self.cases.succeeded)?;
        writeln!(w, "Failed: {}", self.cases.failed)?;
        for (kind, count) in &self.cases.failures_by_kind {
            writeln!(w, "  {}: {}", kind, count)?;
        }
        if let (Some(best), Some(worst)) = (self.cases.best_clocks, self.cases.worst_clocks) {
            writeln!(w, "Clocks: best {}, worst {}, mean {:.2}", best, worst, self.cases.mean_clocks)?;
        }
        writeln!(w)?;

        writeln!(w, "--- Timing ---")?;
        writeln!(w, "Wall time: {:.2} ms", self.timing.total_wall_time_ms)?;
        writeln!(w, "Cases/sec: {:.2}", self.timing.cases_per_second)?;

        Ok(())
    }

    /// Returns a summary string.
    pub fn summary(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_summary(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// A simple timer for measuring wall-clock time.
#[derive(Debug)]
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Starts a new timer.
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Returns elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}

/// Returns current timestamp as seconds since the Unix epoch.
fn timestamp_now() -> String {
    let now = std::time::SystemTime::now();
    let duration = now.duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
    format!("{}s", duration.as_secs())
}

/// Statistics collector for one experiment run.
#[derive(Debug, Default)]
pub struct StatsCollector {
    stats: ExperimentStats,
    timer: Option<Timer>,
}

impl StatsCollector {
    /// Creates a new collector.
    pub fn new() -> Self {
        Self {
            stats: ExperimentStats::new(),
            timer: None,
        }
    }

    /// Sets the experiment name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.stats.metadata.name = name.into();
    }

    /// Records the configuration file the experiment was loaded from.
    pub fn set_config_file(&mut self, path: impl Into<String>) {
        self.stats.metadata.config_file = Some(path.into());
    }

    /// Starts timing.
    pub fn start(&mut self) {
        self.timer = Some(Timer::start());
        self.stats.record_start();
    }

    /// Tallies a finished sweep.
    pub fn record(&mut self, outcome: &ExperimentOutcome) {
        self.stats.record_outcome(outcome);
    }

    /// Stops timing and computes final statistics.
    pub fn stop(&mut self) {
        self.stats.record_end();
        if let Some(ref timer) = self.timer {
            self.stats.compute_timing(timer.elapsed_ms());
        }
    }

    /// Returns the collected statistics.
    pub fn stats(&self) -> &ExperimentStats {
        &self.stats
    }

    /// Consumes the collector and returns the statistics.
    pub fn into_stats(self) -> ExperimentStats {
        self.stats
    }
}
