//! # Hestia
//!
//! Declarative composition of hardware test benches and design-space
//! exploration over them.
//!
//! ## Design Principles
//!
//! - **Graph first**: a test bench is a [`Container`] of [`Component`]s
//!   joined by typed, directed [`Connection`]s. The graph is validated
//!   before anything is simulated.
//! - **Engine agnostic**: simulation is delegated to an
//!   [`EngineFactory`]; the crate ships [`FifoModelEngine`], a cycle-level
//!   FIFO model, and accepts any other implementation.
//! - **Sweep everything**: axes of connection parameters span a
//!   [`DesignSpace`]. Every case is built, validated and run independently,
//!   and a failing case never aborts the sweep.
//! - **Deterministic selection**: results are ranked by clock count and the
//!   winner is broken out by area, then by name.
//!
//! ## Features
//!
//! - `parallel` - Run cases on a rayon worker pool
//!
//! ## Quick Start
//!
//! ```rust
//! use hestia::{DesignSpace, ExperimentAxis, FifoModelEngine, NumberTestBench, Orchestrator};
//! use hestia::selector::Selection;
//! use std::sync::Arc;
//!
//! let space = DesignSpace::new(vec![
//!     ExperimentAxis::new("latency", "l", [0, 1, 2]),
//! ])
//! .unwrap();
//!
//! let bench = NumberTestBench::new().with_num_transactions(10);
//! let orchestrator = Orchestrator::new(Arc::new(bench), Arc::new(FifoModelEngine));
//! let outcome = orchestrator.run_all(&space).unwrap();
//!
//! let selection = Selection::from_results(&outcome.results);
//! let winner = selection.winner.unwrap();
//! assert_eq!(winner.name.as_str(), "l_0");
//! assert_eq!(winner.clocks, 11);
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use hestia::{Experiment, FifoModelEngine};
//!
//! let experiment = Experiment::from_file("experiment.yaml", Arc::new(FifoModelEngine))?;
//! let report = experiment.run_and_report()?;
//! println!("{}", report.stats.summary());
//! ```

pub mod types;
pub mod error;
pub mod parameter;
pub mod port;
pub mod connection;
pub mod component;
pub mod container;
pub mod validator;
pub mod components;
pub mod registry;
pub mod config;
pub mod sweep;
pub mod engine;
pub mod bench;
pub mod orchestrator;
pub mod selector;
pub mod report;
pub mod stats;
pub mod experiment;

// Re-export commonly used types
pub use types::{Area, AxisValue, ClockCount, CounterValue};
pub use error::{EngineError, ExperimentError, GraphError, ReportWriteError, RunError};
pub use parameter::{Parameter, ParameterType, ParameterValue};
pub use port::{BindingRole, Port, PortDirection, PortRef};
pub use connection::{Connection, ConnectionParameters, InternalConnection, InternalConnectionKind};
pub use component::Component;
pub use container::Container;
pub use validator::{validate, ValidationIssue, ValidationReport};
pub use registry::{create_default_registry, ComponentRegistry};
pub use config::{ConfigError, ExperimentConfig, ExperimentConfigBuilder};
pub use sweep::{CaseName, Coordinate, Coordinates, DesignSpace, ExperimentAxis, ExperimentCase};
pub use engine::{EngineFactory, EngineHandle, EngineSetup, FifoModelEngine};
pub use bench::{CaseBuilder, ConfiguredBench, Driver, NumberTestBench, SocTestBench, SweepTarget};
pub use orchestrator::{CaseFailure, CounterSelection, ExperimentOutcome, Orchestrator, RunOptions};
pub use selector::{ExperimentResult, Ranking, Selection, Winner};
pub use report::Reporter;
pub use stats::{ExperimentStats, StatsCollector, Timer};
pub use experiment::{Experiment, ExperimentReport};

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over `level` when set. Calling this more than
/// once keeps the first subscriber.
///
/// # Example
///
/// ```rust,ignore
/// hestia::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
