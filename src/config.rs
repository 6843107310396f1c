//! Configuration system for experiments.
//!
//! Experiments can be described declaratively in YAML or JSON and loaded
//! with [`ExperimentConfig::from_file`], or assembled in code with
//! [`ExperimentConfigBuilder`].
//!
//! # Configuration File Structure
//!
//! ```yaml
//! experiment:
//!   name: number_sweep
//!   output_dir: results
//!   concurrency: 4
//!   step_cap: 100000
//!   counters:
//!     matching: [".stats."]
//!
//! bench:
//!   num_transactions: 20
//!   clock_domain: clk
//!   clock_period: 1
//!
//! axes:
//!   - name: read_rate
//!     prefix: r
//!     values: [1, 2]
//!   - name: latency
//!     prefix: l
//!     values: [0, 1]
//! ```
//!
//! Without a `container` section the number producer/consumer bench is
//! used. A `container` section describes the components and connections
//! explicitly; components are created through the component registry:
//!
//! ```yaml
//! container:
//!   name: soc
//!   components:
//!     - name: driver
//!       kind: loop_driver
//!       parameters:
//!         num_iterations: 4
//!     - name: cpu
//!       kind: functional_processor
//!       attrs:
//!         memory_name: dram
//!   connections:
//!     - name: doorbell
//!       src: driver.doorbell
//!       dst: cpu.doorbell
//!   memory_regions:
//!     - name: dram
//!       size: 65536
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::bench::NUMBER_BENCH_CONNECTION;
use crate::connection::ConnectionParameters;
use crate::engine::{ClockDomain, MemoryRegion};
use crate::orchestrator::{CounterSelection, RunOptions};
use crate::parameter::ParameterValue;
use crate::sweep::ExperimentAxis;
use crate::types::{AxisValue, ClockCount};

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Experiment-wide parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExperimentParams {
    /// Experiment name, used in logs and statistics
    #[serde(default = "default_name")]
    pub name: String,

    /// Directory receiving the report artifacts
    #[serde(default)]
    pub output_dir: Option<String>,

    /// Worker count; 0 picks one worker per available CPU
    #[serde(default)]
    pub concurrency: usize,

    /// Maximum clock steps per case; `null` disables the cap
    #[serde(default = "default_step_cap")]
    pub step_cap: Option<ClockCount>,

    /// Optional wall-clock budget per case, in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Engine counters recorded with each result
    #[serde(default)]
    pub counters: CounterSelection,
}

fn default_name() -> String {
    "experiment".to_string()
}

fn default_step_cap() -> Option<ClockCount> {
    Some(1_000_000)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ExperimentParams {
    fn default() -> Self {
        Self {
            name: default_name(),
            output_dir: None,
            concurrency: 0,
            step_cap: default_step_cap(),
            timeout_ms: None,
            log_level: default_log_level(),
            counters: CounterSelection::default(),
        }
    }
}

impl ExperimentParams {
    /// Per-case run options derived from these parameters.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            step_cap: self.step_cap,
            wall_timeout: self.timeout_ms.map(Duration::from_millis),
            counters: self.counters.clone(),
        }
    }
}

/// Settings of the built-in number producer/consumer bench.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BenchConfig {
    /// Numbers written by the producer per case
    #[serde(default = "default_num_transactions")]
    pub num_transactions: u64,

    /// Clock domain the connection is timed in
    #[serde(default = "default_clock_domain")]
    pub clock_domain: String,

    /// Period of the clock domain in base clocks
    #[serde(default = "default_clock_period")]
    pub clock_period: ClockCount,
}

fn default_num_transactions() -> u64 {
    100
}

fn default_clock_domain() -> String {
    "clk".to_string()
}

fn default_clock_period() -> ClockCount {
    1
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            num_transactions: default_num_transactions(),
            clock_domain: default_clock_domain(),
            clock_period: default_clock_period(),
        }
    }
}

/// One experiment axis.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Tuned connection parameter: read_rate, write_rate, latency or capacity
    pub name: String,

    /// Prefix used in case names
    pub prefix: String,

    pub values: Vec<AxisValue>,

    /// Connections the axis applies to; empty means every connection
    #[serde(default)]
    pub connections: Vec<String>,
}

impl AxisConfig {
    pub fn to_axis(&self) -> ExperimentAxis {
        ExperimentAxis::new(&self.name, &self.prefix, self.values.iter().copied())
    }
}

/// A component instance of a declarative container.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub name: String,

    /// Kind tag resolved through the component registry
    pub kind: String,

    /// Construction attributes passed to the factory
    #[serde(default)]
    pub attrs: HashMap<String, String>,

    /// Parameter assignments, checked against the declared types
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterValue>,
}

/// A connection of a declarative container.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,

    /// Source endpoint as `component.port`
    pub src: String,

    /// Destination endpoint as `component.port`
    pub dst: String,

    #[serde(default)]
    pub params: ConnectionParameters,
}

/// A declarative container, instantiated fresh for every case.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub name: String,

    #[serde(default)]
    pub components: Vec<ComponentConfig>,

    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,

    #[serde(default)]
    pub clock_domains: Vec<ClockDomain>,

    #[serde(default)]
    pub memory_regions: Vec<MemoryRegion>,
}

impl ContainerConfig {
    /// Validates name uniqueness and clock domain periods.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut names = HashSet::new();
        for component in &self.components {
            if !names.insert(component.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate component name: {}",
                    component.name
                )));
            }
        }

        let mut names = HashSet::new();
        for connection in &self.connections {
            if !names.insert(connection.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate connection name: {}",
                    connection.name
                )));
            }
        }

        for domain in &self.clock_domains {
            if domain.period == 0 {
                return Err(ConfigError::Validation(format!(
                    "Clock domain {} has a zero period",
                    domain.name
                )));
            }
        }
        Ok(())
    }

    fn has_connection(&self, name: &str) -> bool {
        self.connections.iter().any(|c| c.name == name)
    }
}

/// Complete experiment configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub experiment: ExperimentParams,

    #[serde(default)]
    pub bench: BenchConfig,

    #[serde(default)]
    pub axes: Vec<AxisConfig>,

    /// Declarative container replacing the number bench
    #[serde(default)]
    pub container: Option<ContainerConfig>,
}

impl ExperimentConfig {
    /// Creates a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: ExperimentConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: ExperimentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Validates the configuration.
    ///
    /// Axis contents (prefixes, empty or repeated values) are checked when
    /// the design space is built.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.experiment.name.is_empty() {
            return Err(ConfigError::Validation("Experiment name is empty".to_string()));
        }
        if self.experiment.timeout_ms == Some(0) {
            return Err(ConfigError::Validation("timeout_ms must be positive".to_string()));
        }
        if self.experiment.step_cap == Some(0) {
            return Err(ConfigError::Validation("step_cap must be positive".to_string()));
        }
        if self.bench.clock_period == 0 {
            return Err(ConfigError::Validation("clock_period must be positive".to_string()));
        }

        let mut axis_names = HashSet::new();
        for axis in &self.axes {
            if !axis_names.insert(axis.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate axis name: {}",
                    axis.name
                )));
            }
        }

        if let Some(container) = &self.container {
            container.validate()?;
        }

        // Axis connection references must resolve
        for axis in &self.axes {
            for connection in &axis.connections {
                let known = match &self.container {
                    Some(container) => container.has_connection(connection),
                    None => connection == NUMBER_BENCH_CONNECTION,
                };
                if !known {
                    return Err(ConfigError::Validation(format!(
                        "Axis {} references unknown connection: {}",
                        axis.name, connection
                    )));
                }
            }
        }

        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Saves configuration to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The experiment axes, in sweep order.
    pub fn experiment_axes(&self) -> Vec<ExperimentAxis> {
        self.axes.iter().map(AxisConfig::to_axis).collect()
    }

    /// Returns the number of axes.
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }
}

/// Builder for creating ExperimentConfig programmatically.
#[derive(Default)]
pub struct ExperimentConfigBuilder {
    config: ExperimentConfig,
}

impl ExperimentConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the experiment name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.experiment.name = name.into();
        self
    }

    /// Sets the report output directory.
    pub fn output_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.experiment.output_dir = Some(dir.into());
        self
    }

    /// Sets the worker count.
    pub fn concurrency(mut self, workers: usize) -> Self {
        self.config.experiment.concurrency = workers;
        self
    }

    /// Sets or clears the per-case step cap.
    pub fn step_cap(mut self, cap: Option<ClockCount>) -> Self {
        self.config.experiment.step_cap = cap;
        self
    }

    /// Sets the per-case wall-clock budget.
    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.experiment.timeout_ms = Some(ms);
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.experiment.log_level = level.into();
        self
    }

    /// Selects the counters recorded with each result.
    pub fn counters(mut self, counters: CounterSelection) -> Self {
        self.config.experiment.counters = counters;
        self
    }

    /// Sets the number of transactions of the number bench.
    pub fn num_transactions(mut self, n: u64) -> Self {
        self.config.bench.num_transactions = n;
        self
    }

    /// Sets the bench clock domain.
    pub fn clock_domain(mut self, name: impl Into<String>, period: ClockCount) -> Self {
        self.config.bench.clock_domain = name.into();
        self.config.bench.clock_period = period;
        self
    }

    /// Adds an axis applying to every connection.
    pub fn add_axis(self, name: impl Into<String>, prefix: impl Into<String>, values: Vec<AxisValue>) -> Self {
        self.add_axis_on(name, prefix, values, Vec::new())
    }

    /// Adds an axis applying to the named connections.
    pub fn add_axis_on(
        mut self,
        name: impl Into<String>,
        prefix: impl Into<String>,
        values: Vec<AxisValue>,
        connections: Vec<String>,
    ) -> Self {
        self.config.axes.push(AxisConfig {
            name: name.into(),
            prefix: prefix.into(),
            values,
            connections,
        });
        self
    }

    /// Uses a declarative container instead of the number bench.
    pub fn container(mut self, container: ContainerConfig) -> Self {
        self.config.container = Some(container);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<ExperimentConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
