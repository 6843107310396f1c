//! Tests for case execution and failure isolation.
//!
//! These tests verify:
//! - Step caps and wall timeouts turning into per-case timeouts
//! - Engine faults, panics and rejections failing only their own case
//! - Cancellation of a running case by name
//! - Generation-order results regardless of worker count

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hestia::bench::NUMBER_BENCH_CONNECTION;
use hestia::{
    ClockCount, Container, CounterSelection, CounterValue, DesignSpace, EngineError, EngineFactory,
    EngineHandle, EngineSetup, ExperimentAxis, FifoModelEngine, NumberTestBench, Orchestrator,
    RunError, RunOptions,
};

// ============================================================================
// Test Engines
// ============================================================================

/// Never finishes.
struct StallHandle {
    time: ClockCount,
    torn_down: Arc<AtomicUsize>,
}

impl StallHandle {
    fn boxed(torn_down: Arc<AtomicUsize>) -> Box<dyn EngineHandle> {
        Box::new(Self { time: 0, torn_down })
    }
}

impl EngineHandle for StallHandle {
    fn validate(&self) -> Result<(), Vec<String>> {
        Ok(())
    }

    fn setup(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn clock(&mut self, n: ClockCount) -> Result<bool, EngineError> {
        self.time += n;
        Ok(true)
    }

    fn tear_down(&mut self) {
        self.torn_down.fetch_add(1, Ordering::SeqCst);
    }

    fn get_time(&self) -> ClockCount {
        self.time
    }

    fn get_all_counter_values(&self) -> HashMap<String, CounterValue> {
        HashMap::new()
    }
}

/// Faults after a few clocks.
struct FaultHandle {
    time: ClockCount,
}

impl EngineHandle for FaultHandle {
    fn validate(&self) -> Result<(), Vec<String>> {
        Ok(())
    }

    fn setup(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn clock(&mut self, n: ClockCount) -> Result<bool, EngineError> {
        self.time += n;
        if self.time == 3 {
            return Err(EngineError::Fault {
                clock: self.time,
                reason: "bus error".to_string(),
            });
        }
        Ok(true)
    }

    fn tear_down(&mut self) {}

    fn get_time(&self) -> ClockCount {
        self.time
    }

    fn get_all_counter_values(&self) -> HashMap<String, CounterValue> {
        HashMap::new()
    }
}

/// Panics on its second clock.
struct PanicHandle {
    time: ClockCount,
    torn_down: Arc<AtomicUsize>,
}

impl EngineHandle for PanicHandle {
    fn validate(&self) -> Result<(), Vec<String>> {
        Ok(())
    }

    fn setup(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn clock(&mut self, n: ClockCount) -> Result<bool, EngineError> {
        self.time += n;
        if self.time == 2 {
            panic!("model state corrupted at clock {}", self.time);
        }
        Ok(true)
    }

    fn tear_down(&mut self) {
        self.torn_down.fetch_add(1, Ordering::SeqCst);
    }

    fn get_time(&self) -> ClockCount {
        self.time
    }

    fn get_all_counter_values(&self) -> HashMap<String, CounterValue> {
        HashMap::new()
    }
}

/// Rejects every model it is given.
struct RejectingHandle;

impl EngineHandle for RejectingHandle {
    fn validate(&self) -> Result<(), Vec<String>> {
        Err(vec!["no memory map".to_string(), "no clock".to_string()])
    }

    fn setup(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    fn clock(&mut self, _n: ClockCount) -> Result<bool, EngineError> {
        Ok(false)
    }

    fn tear_down(&mut self) {}

    fn get_time(&self) -> ClockCount {
        0
    }

    fn get_all_counter_values(&self) -> HashMap<String, CounterValue> {
        HashMap::new()
    }
}

fn latency_of(container: &Container) -> u64 {
    container
        .connection(NUMBER_BENCH_CONNECTION)
        .map_or(0, |connection| connection.params.latency)
}

/// Delegates to the FIFO model except for the latency value `odd_one`,
/// which gets `special` instead.
fn engine_with<F>(odd_one: u64, special: F) -> Arc<dyn EngineFactory>
where
    F: Fn() -> Box<dyn EngineHandle> + Send + Sync + 'static,
{
    Arc::new(
        move |container: &Container, setup: &EngineSetup| -> Result<Box<dyn EngineHandle>, EngineError> {
            if latency_of(container) == odd_one {
                Ok(special())
            } else {
                FifoModelEngine.build(container, setup)
            }
        },
    )
}

fn bench() -> Arc<NumberTestBench> {
    Arc::new(NumberTestBench::new().with_num_transactions(10))
}

fn latency_space() -> DesignSpace {
    DesignSpace::new(vec![ExperimentAxis::new("latency", "l", [0, 1, 2])]).unwrap()
}

// ============================================================================
// Failure Isolation Tests
// ============================================================================

#[test]
fn test_stalled_case_times_out_alone() {
    let torn_down = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&torn_down);
    let orchestrator = Orchestrator::new(bench(), engine_with(2, move || StallHandle::boxed(Arc::clone(&counter))))
        .with_options(RunOptions::new().with_step_cap(Some(1000)));

    let outcome = orchestrator.run_all(&latency_space()).unwrap();

    let names: Vec<&str> = outcome.results.iter().map(|r| r.name().as_str()).collect();
    assert_eq!(names, vec!["l_0", "l_1"]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].name.as_str(), "l_2");
    assert_eq!(outcome.failures[0].error, RunError::Timeout { steps: 1000 });
    assert_eq!(torn_down.load(Ordering::SeqCst), 1);
}

#[test]
fn test_wall_timeout() {
    let torn_down = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&torn_down);
    let orchestrator = Orchestrator::new(bench(), engine_with(0, move || StallHandle::boxed(Arc::clone(&counter))))
        .with_options(
            RunOptions::new()
                .with_step_cap(None)
                .with_wall_timeout(Duration::from_millis(50)),
        );

    let space = DesignSpace::new(vec![ExperimentAxis::new("latency", "l", [0])]).unwrap();
    let outcome = orchestrator.run_all(&space).unwrap();

    assert!(outcome.results.is_empty());
    assert_eq!(outcome.failures[0].kind(), "timeout");
    assert_eq!(torn_down.load(Ordering::SeqCst), 1);
}

#[test]
fn test_engine_panic_fails_one_case() {
    let torn_down = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&torn_down);
    let orchestrator = Orchestrator::new(
        bench(),
        engine_with(1, move || {
            Box::new(PanicHandle {
                time: 0,
                torn_down: Arc::clone(&counter),
            })
        }),
    )
    .with_concurrency(2);

    let outcome = orchestrator.run_all(&latency_space()).unwrap();

    let names: Vec<&str> = outcome.results.iter().map(|r| r.name().as_str()).collect();
    assert_eq!(names, vec!["l_0", "l_2"]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].name.as_str(), "l_1");
    assert_eq!(outcome.failures[0].kind(), "engine_panicked");
    match &outcome.failures[0].error {
        RunError::EnginePanicked(message) => assert!(message.contains("model state corrupted")),
        other => panic!("unexpected failure: {:?}", other),
    }
    assert_eq!(torn_down.load(Ordering::SeqCst), 1);
    assert!(orchestrator.in_flight().is_empty());
}

#[test]
fn test_engine_panic_in_single_run() {
    let counter = Arc::new(AtomicUsize::new(0));
    let orchestrator = Orchestrator::new(
        bench(),
        engine_with(0, move || {
            Box::new(PanicHandle {
                time: 0,
                torn_down: Arc::clone(&counter),
            })
        }),
    );
    let case = latency_space().case_at(0).unwrap();

    let err = orchestrator.run_case(&case).unwrap_err();
    assert_eq!(err.kind(), "engine_panicked");
    assert!(orchestrator.in_flight().is_empty());
}

#[test]
fn test_engine_fault_fails_one_case() {
    let orchestrator = Orchestrator::new(bench(), engine_with(1, || Box::new(FaultHandle { time: 0 })));
    let outcome = orchestrator.run_all(&latency_space()).unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(
        outcome.failures[0].error,
        RunError::Engine(EngineError::Fault {
            clock: 3,
            reason: "bus error".to_string(),
        })
    );
}

#[test]
fn test_engine_rejection_lists_every_problem() {
    let orchestrator = Orchestrator::new(bench(), engine_with(0, || Box::new(RejectingHandle)));
    let outcome = orchestrator.run_all(&latency_space()).unwrap();

    assert_eq!(outcome.failures[0].kind(), "engine_rejected");
    match &outcome.failures[0].error {
        RunError::EngineRejected(problems) => assert_eq!(problems.len(), 2),
        other => panic!("unexpected failure: {:?}", other),
    }
    assert_eq!(outcome.results.len(), 2);
}

#[test]
fn test_invalid_axis_value_fails_build() {
    let orchestrator = Orchestrator::new(bench(), Arc::new(FifoModelEngine));
    let space = DesignSpace::new(vec![ExperimentAxis::new("capacity", "c", [0, 1, 2])]).unwrap();
    let outcome = orchestrator.run_all(&space).unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.failures_by_kind()["build"], 1);
    assert_eq!(outcome.failures[0].name.as_str(), "c_0");
}

// ============================================================================
// Cancellation Tests
// ============================================================================

#[test]
fn test_cancel_running_case() {
    let torn_down = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&torn_down);
    let orchestrator = Orchestrator::new(bench(), engine_with(0, move || StallHandle::boxed(Arc::clone(&counter))))
        .with_options(
            RunOptions::new()
                .with_step_cap(None)
                .with_wall_timeout(Duration::from_secs(30)),
        );
    let space = DesignSpace::new(vec![ExperimentAxis::new("latency", "l", [0])]).unwrap();

    let outcome = std::thread::scope(|s| {
        let run = s.spawn(|| orchestrator.run_all(&space));
        while !orchestrator.cancel("l_0") {
            std::thread::yield_now();
        }
        run.join().unwrap()
    })
    .unwrap();

    assert!(outcome.results.is_empty());
    assert_eq!(outcome.failures[0].kind(), "cancelled");
    assert!(orchestrator.in_flight().is_empty());
}

#[test]
fn test_cancel_unknown_case() {
    let orchestrator = Orchestrator::new(bench(), Arc::new(FifoModelEngine));
    assert!(!orchestrator.cancel("l_0"));
}

// ============================================================================
// Ordering and Counters
// ============================================================================

#[test]
fn test_results_in_generation_order_with_workers() {
    let space = DesignSpace::new(vec![
        ExperimentAxis::new("latency", "l", [2, 1, 0]),
        ExperimentAxis::new("capacity", "c", [1, 2]),
    ])
    .unwrap();

    let sequential = Orchestrator::new(bench(), Arc::new(FifoModelEngine))
        .with_concurrency(1)
        .run_all(&space)
        .unwrap();
    let parallel = Orchestrator::new(bench(), Arc::new(FifoModelEngine))
        .with_concurrency(4)
        .run_all(&space)
        .unwrap();

    assert_eq!(sequential.results, parallel.results);
    let names: Vec<String> = parallel.results.iter().map(|r| r.name().to_string()).collect();
    assert_eq!(names, vec!["l_2.c_1", "l_2.c_2", "l_1.c_1", "l_1.c_2", "l_0.c_1", "l_0.c_2"]);
}

#[test]
fn test_counter_selection() {
    let space = DesignSpace::new(vec![ExperimentAxis::new("latency", "l", [0])]).unwrap();

    let none = Orchestrator::new(bench(), Arc::new(FifoModelEngine))
        .with_options(RunOptions::new().with_counters(CounterSelection::None))
        .run_all(&space)
        .unwrap();
    assert!(none.results[0].counters().is_empty());

    let matching = Orchestrator::new(bench(), Arc::new(FifoModelEngine))
        .with_options(RunOptions::new().with_counters(CounterSelection::Matching(vec![".popped".to_string()])))
        .run_all(&space)
        .unwrap();
    let counters = matching.results[0].counters();
    assert_eq!(counters.len(), 1);
    assert_eq!(counters["producer_consumer.stats.popped"], 10);
}
