//! Report artifacts.
//!
//! The [`Reporter`] writes a [`Selection`] to a directory as pretty-printed
//! JSON:
//!
//! | File | Content |
//! |------|---------|
//! | `all.json` | every successful case, name to clocks, ascending |
//! | `top_5.json` | first five entries of the ranking |
//! | `top_10.json` | first ten entries of the ranking |
//! | `winner.json` | `{name, clocks, area}`, omitted when no case succeeded |
//! | `failures.json` | failed cases with their failure kind and reason |
//! | `<case>/result.json` | clock count, coordinates and counters of one case |
//!
//! Case names only contain ASCII alphanumerics, `_` and `.`, so they are
//! used as directory names unchanged. A write failure leaves the in-memory
//! selection untouched.
//!
//! Writing into a directory that holds an earlier run first removes that
//! run's `winner.json` and case directories, so every artifact left behind
//! belongs to the current selection. Other files in the directory are kept.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ReportWriteError;
use crate::orchestrator::CaseFailure;
use crate::selector::{ExperimentResult, Selection};
use crate::sweep::{CaseName, Coordinates};

pub const ALL_FILE: &str = "all.json";
pub const TOP_5_FILE: &str = "top_5.json";
pub const TOP_10_FILE: &str = "top_10.json";
pub const WINNER_FILE: &str = "winner.json";
pub const FAILURES_FILE: &str = "failures.json";
pub const CASE_RESULT_FILE: &str = "result.json";

/// Serialized form of a [`CaseFailure`].
#[derive(Debug, Serialize)]
struct FailureRecord<'a> {
    name: &'a CaseName,
    coordinates: &'a Coordinates,
    kind: &'static str,
    reason: String,
}

impl<'a> From<&'a CaseFailure> for FailureRecord<'a> {
    fn from(failure: &'a CaseFailure) -> Self {
        FailureRecord {
            name: &failure.name,
            coordinates: &failure.coordinates,
            kind: failure.kind(),
            reason: failure.error.to_string(),
        }
    }
}

/// Writes experiment reports into one directory.
#[derive(Clone, Debug)]
pub struct Reporter {
    dir: PathBuf,
    per_case: bool,
}

impl Reporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            per_case: true,
        }
    }

    /// Enables or disables the per-case `result.json` artifacts.
    pub fn with_per_case(mut self, enabled: bool) -> Self {
        self.per_case = enabled;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes every artifact, returning the paths written.
    pub fn write(
        &self,
        selection: &Selection,
        results: &[ExperimentResult],
        failures: &[CaseFailure],
    ) -> Result<Vec<PathBuf>, ReportWriteError> {
        create_dir(&self.dir)?;
        self.clear_previous()?;
        let mut written = Vec::new();

        written.push(self.write_json(&self.dir.join(ALL_FILE), &selection.all)?);
        written.push(self.write_json(&self.dir.join(TOP_5_FILE), &selection.top_5)?);
        written.push(self.write_json(&self.dir.join(TOP_10_FILE), &selection.top_10)?);

        match &selection.winner {
            Some(winner) => written.push(self.write_json(&self.dir.join(WINNER_FILE), winner)?),
            None => tracing::warn!(dir = %self.dir.display(), "no case succeeded, skipping winner report"),
        }

        let records: Vec<FailureRecord<'_>> = failures.iter().map(FailureRecord::from).collect();
        written.push(self.write_json(&self.dir.join(FAILURES_FILE), &records)?);

        if self.per_case {
            for result in results {
                let case_dir = self.dir.join(result.name().as_str());
                create_dir(&case_dir)?;
                written.push(self.write_json(&case_dir.join(CASE_RESULT_FILE), result)?);
            }
        }

        tracing::info!(dir = %self.dir.display(), files = written.len(), "reports written");
        Ok(written)
    }

    /// Removes artifacts of an earlier run that this run may not overwrite.
    fn clear_previous(&self) -> Result<(), ReportWriteError> {
        let winner = self.dir.join(WINNER_FILE);
        if winner.is_file() {
            fs::remove_file(&winner).map_err(io_error(&winner))?;
        }

        for entry in fs::read_dir(&self.dir).map_err(io_error(&self.dir))? {
            let path = entry.map_err(io_error(&self.dir))?.path();
            if path.is_dir() && path.join(CASE_RESULT_FILE).is_file() {
                fs::remove_dir_all(&path).map_err(io_error(&path))?;
                tracing::debug!(dir = %path.display(), "removed stale case directory");
            }
        }
        Ok(())
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<PathBuf, ReportWriteError> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json).map_err(|source| ReportWriteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(path.to_path_buf())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ReportWriteError {
    let path = path.to_path_buf();
    move |source| ReportWriteError::Io { path, source }
}

fn create_dir(dir: &Path) -> Result<(), ReportWriteError> {
    fs::create_dir_all(dir).map_err(|source| ReportWriteError::Io {
        path: dir.to_path_buf(),
        source,
    })
}
