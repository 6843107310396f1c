//! Case execution.
//!
//! The [`Orchestrator`] turns each [`ExperimentCase`] into a fresh
//! container, validates it, hands it to the engine and clocks the engine
//! until it goes idle. Every run owns its engine handle for its whole
//! lifetime and tears it down on every exit path.
//!
//! A failed case, including one whose engine panics, is recorded as a
//! [`CaseFailure`] and never aborts the sweep. Cases run on a bounded
//! worker pool when the `parallel` feature is enabled (the default),
//! sequentially otherwise; results are always returned in generation order.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::bench::CaseBuilder;
use crate::engine::{EngineFactory, EngineHandle};
use crate::error::{ExperimentError, RunError};
use crate::selector::ExperimentResult;
use crate::sweep::{CaseName, Coordinates, DesignSpace, ExperimentCase};
use crate::types::{ClockCount, CounterValue};

/// Which engine counters are recorded with a result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterSelection {
    /// Record no counters
    None,
    /// Record every counter
    All,
    /// Record counters whose dotted path contains any of the fragments
    Matching(Vec<String>),
}

impl Default for CounterSelection {
    fn default() -> Self {
        CounterSelection::Matching(vec![".stats.".to_string()])
    }
}

impl CounterSelection {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            CounterSelection::None => false,
            CounterSelection::All => true,
            CounterSelection::Matching(fragments) => fragments.iter().any(|f| path.contains(f.as_str())),
        }
    }

    /// Keeps the selected counters, sorted by path.
    pub fn select(&self, counters: HashMap<String, CounterValue>) -> BTreeMap<String, CounterValue> {
        counters.into_iter().filter(|(path, _)| self.matches(path)).collect()
    }
}

/// Per-case run limits and collection settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Maximum number of clock calls; a model still busy afterwards times out
    pub step_cap: Option<ClockCount>,
    /// Wall-clock budget for the clock loop
    pub wall_timeout: Option<Duration>,
    pub counters: CounterSelection,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            step_cap: Some(1_000_000),
            wall_timeout: None,
            counters: CounterSelection::default(),
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_cap(mut self, cap: Option<ClockCount>) -> Self {
        self.step_cap = cap;
        self
    }

    pub fn with_wall_timeout(mut self, timeout: Duration) -> Self {
        self.wall_timeout = Some(timeout);
        self
    }

    pub fn with_counters(mut self, counters: CounterSelection) -> Self {
        self.counters = counters;
        self
    }
}

/// Stop flag for one case, shared between the run and its controller.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A case that did not produce a result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseFailure {
    pub name: CaseName,
    pub coordinates: Coordinates,
    pub error: RunError,
}

impl CaseFailure {
    /// Short label of the failure kind.
    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

/// Everything a sweep produced, in generation order.
#[derive(Clone, Debug, Default)]
pub struct ExperimentOutcome {
    pub results: Vec<ExperimentResult>,
    pub failures: Vec<CaseFailure>,
}

impl ExperimentOutcome {
    pub fn case_count(&self) -> usize {
        self.results.len() + self.failures.len()
    }

    /// Failure counts keyed by failure kind.
    pub fn failures_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts.entry(failure.kind()).or_insert(0) += 1;
        }
        counts
    }
}

/// Tears the engine handle down however the run exits.
struct RunGuard {
    handle: Box<dyn EngineHandle>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.handle.tear_down();
    }
}

/// Removes a case from the in-flight registry when dropped.
struct Registration<'a> {
    orchestrator: &'a Orchestrator,
    name: &'a CaseName,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.orchestrator.release(self.name);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs experiment cases against an engine.
pub struct Orchestrator {
    bench: Arc<dyn CaseBuilder>,
    engine: Arc<dyn EngineFactory>,
    options: RunOptions,
    /// Worker count (0 = one per available CPU)
    concurrency: usize,
    /// Cancel tokens of queued and running cases
    in_flight: Mutex<HashMap<CaseName, CancelToken>>,
}

impl Orchestrator {
    pub fn new(bench: Arc<dyn CaseBuilder>, engine: Arc<dyn EngineFactory>) -> Self {
        Self {
            bench,
            engine,
            options: RunOptions::default(),
            concurrency: 0,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the number of worker threads.
    ///
    /// Pass 0 for automatic detection (uses number of CPUs).
    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers;
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Workers used for a sweep of `cases` cases.
    pub fn worker_count(&self, cases: usize) -> usize {
        let configured = if self.concurrency == 0 {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            self.concurrency
        };
        configured.min(cases).max(1)
    }

    /// Requests a stop of the named case, queued or running.
    ///
    /// Returns `false` when no such case is in flight.
    pub fn cancel(&self, name: &str) -> bool {
        match self.in_flight.lock().get(name) {
            Some(token) => {
                tracing::info!(case = %name, "cancel requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Names of the cases currently queued or running, sorted.
    pub fn in_flight(&self) -> Vec<CaseName> {
        let mut names: Vec<CaseName> = self.in_flight.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn register(&self, name: &CaseName) -> CancelToken {
        self.in_flight
            .lock()
            .entry(name.clone())
            .or_default()
            .clone()
    }

    fn release(&self, name: &CaseName) {
        self.in_flight.lock().remove(name);
    }

    /// Runs one case to completion.
    pub fn run_case(&self, case: &ExperimentCase) -> Result<ExperimentResult, RunError> {
        let token = self.register(&case.name);
        let outcome = self.execute_isolated(case, &token);

        match &outcome {
            Ok(result) => tracing::debug!(case = %case.name, clocks = result.clock_count(), "case finished"),
            Err(err) => tracing::warn!(case = %case.name, kind = err.kind(), "case failed: {}", err),
        }
        outcome
    }

    /// Runs `execute`, turning a panic into a failure of this case alone.
    ///
    /// The case leaves the in-flight registry on every path.
    fn execute_isolated(&self, case: &ExperimentCase, token: &CancelToken) -> Result<ExperimentResult, RunError> {
        let _registration = Registration {
            orchestrator: self,
            name: &case.name,
        };
        panic::catch_unwind(AssertUnwindSafe(|| self.execute(case, token)))
            .unwrap_or_else(|payload| Err(RunError::EnginePanicked(panic_message(payload.as_ref()))))
    }

    fn execute(&self, case: &ExperimentCase, token: &CancelToken) -> Result<ExperimentResult, RunError> {
        if token.is_cancelled() {
            return Err(RunError::Cancelled { steps: 0 });
        }

        let container = self.bench.build(case)?;
        let report = container.validate();
        if !report.is_valid() {
            return Err(RunError::InvalidGraph(report));
        }

        let setup = self.bench.engine_setup(case);
        let handle = self.engine.build(&container, &setup)?;
        let mut run = RunGuard { handle };
        run.handle.validate().map_err(RunError::EngineRejected)?;
        run.handle.setup()?;
        tracing::debug!(case = %case.name, components = container.component_count(), "engine ready");

        let started = Instant::now();
        let mut steps: ClockCount = 0;
        loop {
            if token.is_cancelled() {
                return Err(RunError::Cancelled { steps });
            }
            if self.options.step_cap.map_or(false, |cap| steps >= cap) {
                return Err(RunError::Timeout { steps });
            }
            if self.options.wall_timeout.map_or(false, |limit| started.elapsed() >= limit) {
                return Err(RunError::Timeout { steps });
            }

            let busy = run.handle.clock(1)?;
            steps += 1;
            if !busy {
                break;
            }
        }

        let clock_count = run.handle.get_time();
        let counters = self.options.counters.select(run.handle.get_all_counter_values());
        Ok(ExperimentResult::new(
            case.name.clone(),
            case.coordinates.clone(),
            clock_count,
            counters,
        ))
    }

    /// Runs every case of `space`.
    ///
    /// Each case is registered before the sweep starts, so queued cases can
    /// be cancelled by name. Results come back in generation order.
    ///
    /// # Errors
    /// [`ExperimentError::Pool`] if the worker pool cannot be created.
    /// Per-case failures are returned in the outcome instead.
    pub fn run_all(&self, space: &DesignSpace) -> Result<ExperimentOutcome, ExperimentError> {
        let tokens: Vec<CancelToken> = space.iter().map(|case| self.register(&case.name)).collect();
        let workers = self.worker_count(space.len());
        tracing::info!(cases = space.len(), workers, "running design space");

        let run_one = |case: ExperimentCase| {
            let outcome = self.execute_isolated(&case, &tokens[case.index]);
            if let Err(err) = &outcome {
                tracing::warn!(case = %case.name, kind = err.kind(), "case failed: {}", err);
            } else {
                tracing::debug!(case = %case.name, "case finished");
            }
            (case, outcome)
        };

        let finished = self.dispatch(space, workers, &run_one);
        let finished = match finished {
            Ok(finished) => finished,
            Err(err) => {
                self.in_flight.lock().clear();
                return Err(err);
            }
        };

        let mut outcome = ExperimentOutcome::default();
        for (case, result) in finished {
            match result {
                Ok(result) => outcome.results.push(result),
                Err(error) => outcome.failures.push(CaseFailure {
                    name: case.name,
                    coordinates: case.coordinates,
                    error,
                }),
            }
        }
        tracing::info!(
            succeeded = outcome.results.len(),
            failed = outcome.failures.len(),
            "design space finished"
        );
        Ok(outcome)
    }

    #[cfg(not(feature = "parallel"))]
    fn dispatch<F>(
        &self,
        space: &DesignSpace,
        _workers: usize,
        run_one: &F,
    ) -> Result<Vec<(ExperimentCase, Result<ExperimentResult, RunError>)>, ExperimentError>
    where
        F: Fn(ExperimentCase) -> (ExperimentCase, Result<ExperimentResult, RunError>) + Sync,
    {
        Ok(space.iter().map(run_one).collect())
    }

    #[cfg(feature = "parallel")]
    fn dispatch<F>(
        &self,
        space: &DesignSpace,
        workers: usize,
        run_one: &F,
    ) -> Result<Vec<(ExperimentCase, Result<ExperimentResult, RunError>)>, ExperimentError>
    where
        F: Fn(ExperimentCase) -> (ExperimentCase, Result<ExperimentResult, RunError>) + Sync,
    {
        if workers <= 1 {
            return Ok(space.iter().map(run_one).collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("hestia-worker-{}", i))
            .build()
            .map_err(|e| ExperimentError::Pool(e.to_string()))?;

        let (tx, rx) = std::sync::mpsc::channel();
        pool.install(|| {
            space.iter().par_bridge().for_each_with(tx, |tx, case| {
                // The receiver outlives the pool
                let _ = tx.send(run_one(case));
            });
        });

        let mut finished: Vec<_> = rx.into_iter().collect();
        finished.sort_by_key(|(case, _)| case.index);
        Ok(finished)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("options", &self.options)
            .field("concurrency", &self.concurrency)
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}
