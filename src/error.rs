//! Error types for graph construction, case execution and reporting.
//!
//! Errors are split by the stage that can raise them so that callers can
//! tell a malformed graph (rejected at construction) from a failed case
//! (recorded, sweep continues) from a malformed experiment (fatal before any
//! case runs).

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::parameter::ParameterType;
use crate::port::{BindingRole, PortDirection, PortRef};
use crate::types::{AxisValue, ClockCount};
use crate::validator::ValidationReport;

/// Errors raised while constructing or mutating an entity graph.
///
/// A call that returns one of these leaves the graph unmodified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("parameter `{name}` expects a {expected} value, got `{value}`")]
    TypeMismatch {
        name: String,
        expected: ParameterType,
        value: String,
    },

    #[error(
        "cannot connect {src} ({src_direction}) to {dst} ({dst_direction}): \
         source must be write-capable and destination read-capable"
    )]
    DirectionMismatch {
        src: PortRef,
        src_direction: PortDirection,
        dst: PortRef,
        dst_direction: PortDirection,
    },

    #[error("port {port} is already bound as a connection {role}")]
    DuplicateBinding { port: PortRef, role: BindingRole },

    #[error("invalid {kind} name `{name}`: names must be non-empty and contain no `.` or whitespace")]
    InvalidName { kind: &'static str, name: String },

    #[error("duplicate {kind} name `{name}`")]
    DuplicateName { kind: &'static str, name: String },

    #[error("unknown component `{0}`")]
    UnknownComponent(String),

    #[error("unknown port {0}")]
    UnknownPort(PortRef),

    #[error("component `{component}` has no parameter `{name}`")]
    UnknownParameter { component: String, name: String },

    #[error("unknown connection `{0}`")]
    UnknownConnection(String),

    #[error("invalid parameters for connection `{name}`: {reason}")]
    InvalidConnectionParameters { name: String, reason: String },

    #[error("unknown component kind `{0}`")]
    UnknownKind(String),

    #[error("malformed port reference `{0}`, expected `component.port`")]
    MalformedPortRef(String),
}

/// Errors reported by an engine implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("engine build failed: {0}")]
    Build(String),

    #[error("clock domain `{0}` is not registered")]
    UnknownClockDomain(String),

    #[error("engine setup failed: {0}")]
    Setup(String),

    #[error("engine fault at clock {clock}: {reason}")]
    Fault { clock: ClockCount, reason: String },
}

/// Failure of a single experiment case.
///
/// A `RunError` is recorded against its case; it never aborts the sweep.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("test bench construction failed: {0}")]
    Build(#[from] GraphError),

    #[error("container failed validation: {0}")]
    InvalidGraph(ValidationReport),

    #[error("engine rejected the model: {}", .0.join("; "))]
    EngineRejected(Vec<String>),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("engine still busy after {steps} clock steps")]
    Timeout { steps: u64 },

    #[error("run cancelled after {steps} clock steps")]
    Cancelled { steps: u64 },

    #[error("engine panicked: {0}")]
    EnginePanicked(String),
}

impl RunError {
    /// Short machine-readable label for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RunError::Build(_) => "build",
            RunError::InvalidGraph(_) => "invalid_graph",
            RunError::EngineRejected(_) => "engine_rejected",
            RunError::Engine(_) => "engine",
            RunError::Timeout { .. } => "timeout",
            RunError::Cancelled { .. } => "cancelled",
            RunError::EnginePanicked(_) => "engine_panicked",
        }
    }
}

/// Errors that are fatal to a whole experiment.
///
/// These are detected before any case executes.
#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error("experiment defines no axes")]
    NoAxes,

    #[error("axis `{0}` has no values")]
    EmptyAxis(String),

    #[error("axis `{axis}` has invalid prefix `{prefix}`: prefixes must be non-empty ASCII alphanumerics")]
    InvalidPrefix { axis: String, prefix: String },

    #[error("axis prefix `{0}` is used by more than one axis")]
    DuplicatePrefix(String),

    #[error("axis `{axis}` lists value {value} more than once")]
    DuplicateValue { axis: String, value: AxisValue },

    #[error("design space is too large to enumerate")]
    SpaceTooLarge,

    #[error("axis `{0}` does not name a tunable parameter of this test bench")]
    UnsupportedAxis(String),

    #[error("failed to start worker pool: {0}")]
    Pool(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Failure while writing report artifacts.
///
/// Rankings already computed in memory stay valid when this is raised.
#[derive(Error, Debug)]
pub enum ReportWriteError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_error_kinds() {
        assert_eq!(RunError::Timeout { steps: 1000 }.kind(), "timeout");
        assert_eq!(RunError::Cancelled { steps: 3 }.kind(), "cancelled");
        assert_eq!(RunError::EnginePanicked("boom".into()).kind(), "engine_panicked");
        let err = RunError::from(GraphError::UnknownComponent("cpu".into()));
        assert_eq!(err.kind(), "build");
    }

    #[test]
    fn test_error_messages() {
        let err = RunError::Timeout { steps: 1000 };
        assert_eq!(err.to_string(), "engine still busy after 1000 clock steps");

        let err = RunError::EngineRejected(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "engine rejected the model: a; b");

        let err = GraphError::TypeMismatch {
            name: "num_registers".into(),
            expected: ParameterType::UInt,
            value: "-1".into(),
        };
        assert!(err.to_string().contains("UINT"));
    }
}
