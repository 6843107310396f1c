//! Test benches: per-case container construction.
//!
//! A [`CaseBuilder`] builds a fresh [`Container`] for every
//! [`ExperimentCase`] and describes the clock domains and memory regions
//! the engine needs for it. Axes tune connection parameters; the axis name
//! selects the parameter (see [`SweepTarget`]).
//!
//! Three benches are provided:
//!
//! - [`NumberTestBench`]: a number producer feeding a consumer over a single
//!   timed connection
//! - [`SocTestBench`]: an application driver ringing a functional
//!   processor's doorbell, with a shared memory
//! - [`ConfiguredBench`]: any container described in configuration,
//!   resolved through a [`ComponentRegistry`]

use std::fmt;
use std::str::FromStr;

use crate::components;
use crate::config::{AxisConfig, ContainerConfig};
use crate::connection::ConnectionParameters;
use crate::container::Container;
use crate::engine::EngineSetup;
use crate::error::{ExperimentError, GraphError};
use crate::registry::ComponentRegistry;
use crate::sweep::{Coordinates, ExperimentAxis, ExperimentCase};
use crate::types::{AxisValue, ClockCount};

/// Name of the number bench's only connection.
pub const NUMBER_BENCH_CONNECTION: &str = "producer_consumer";

/// Name of the SoC bench's doorbell connection.
pub const SOC_BENCH_CONNECTION: &str = "doorbell";

/// Builds the container for each case.
///
/// Shared by every worker of a sweep, so implementations must be `Sync`.
pub trait CaseBuilder: Send + Sync {
    /// Builds a fresh container with the case's coordinates applied.
    fn build(&self, case: &ExperimentCase) -> Result<Container, GraphError>;

    /// Engine inputs for the case.
    fn engine_setup(&self, case: &ExperimentCase) -> EngineSetup;

    /// Checks that every axis can be applied by this bench.
    fn check_axes(&self, axes: &[ExperimentAxis]) -> Result<(), ExperimentError> {
        for axis in axes {
            axis.name.parse::<SweepTarget>()?;
        }
        Ok(())
    }
}

/// The connection parameter an axis tunes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SweepTarget {
    ReadRate,
    WriteRate,
    Latency,
    Capacity,
}

impl SweepTarget {
    pub fn apply(self, params: &mut ConnectionParameters, value: AxisValue) {
        match self {
            SweepTarget::ReadRate => params.read_rate = value,
            SweepTarget::WriteRate => params.write_rate = value,
            SweepTarget::Latency => params.latency = value,
            SweepTarget::Capacity => params.capacity = value,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SweepTarget::ReadRate => "read_rate",
            SweepTarget::WriteRate => "write_rate",
            SweepTarget::Latency => "latency",
            SweepTarget::Capacity => "capacity",
        }
    }
}

impl FromStr for SweepTarget {
    type Err = ExperimentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read_rate" => Ok(SweepTarget::ReadRate),
            "write_rate" => Ok(SweepTarget::WriteRate),
            "latency" => Ok(SweepTarget::Latency),
            "capacity" => Ok(SweepTarget::Capacity),
            other => Err(ExperimentError::UnsupportedAxis(other.to_string())),
        }
    }
}

impl fmt::Display for SweepTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Applies every coordinate to `params`.
///
/// Coordinates whose axis is not a [`SweepTarget`] are skipped; axes are
/// checked up front with [`CaseBuilder::check_axes`].
pub fn apply_coordinates(mut params: ConnectionParameters, coordinates: &Coordinates) -> ConnectionParameters {
    for coordinate in coordinates.iter() {
        if let Ok(target) = coordinate.axis.parse::<SweepTarget>() {
            target.apply(&mut params, coordinate.value);
        }
    }
    params
}

/// Number producer to consumer over one timed connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumberTestBench {
    num_transactions: u64,
    clock_domain: String,
    clock_period: ClockCount,
}

impl Default for NumberTestBench {
    fn default() -> Self {
        Self {
            num_transactions: 100,
            clock_domain: "clk".to_string(),
            clock_period: 1,
        }
    }
}

impl NumberTestBench {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_num_transactions(mut self, n: u64) -> Self {
        self.num_transactions = n;
        self
    }

    pub fn with_clock_domain(mut self, name: impl Into<String>, period: ClockCount) -> Self {
        self.clock_domain = name.into();
        self.clock_period = period;
        self
    }

    pub fn num_transactions(&self) -> u64 {
        self.num_transactions
    }
}

impl CaseBuilder for NumberTestBench {
    fn build(&self, case: &ExperimentCase) -> Result<Container, GraphError> {
        let mut container = Container::new("number_test_bench");
        let mut producer = components::producer("producer");
        components::set_num_transactions(&mut producer, self.num_transactions)?;
        container.add_component(producer)?;
        container.add_component(components::consumer("consumer"))?;

        let params = apply_coordinates(
            ConnectionParameters::new().timed(self.clock_domain.as_str()),
            &case.coordinates,
        );
        container.connect(NUMBER_BENCH_CONNECTION, "producer.out", "consumer.in", params)?;
        Ok(container)
    }

    fn engine_setup(&self, _case: &ExperimentCase) -> EngineSetup {
        EngineSetup::new().with_clock_domain(self.clock_domain.as_str(), self.clock_period)
    }
}

/// The program an application driver loads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Driver {
    /// One straight-line program, one doorbell
    Simple,
    /// `iterations` x `ops_per_iteration` operations
    Loop { iterations: u64, ops_per_iteration: u64 },
}

/// Application driver ringing a functional processor, with shared memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocTestBench {
    driver: Driver,
    memory_name: String,
    memory_size: u64,
    clock_domain: String,
    clock_period: ClockCount,
}

impl Default for SocTestBench {
    fn default() -> Self {
        Self {
            driver: Driver::Simple,
            memory_name: "mem".to_string(),
            memory_size: 1 << 20,
            clock_domain: "clk".to_string(),
            clock_period: 1,
        }
    }
}

impl SocTestBench {
    pub fn new(driver: Driver) -> Self {
        Self {
            driver,
            ..Self::default()
        }
    }

    pub fn with_memory(mut self, name: impl Into<String>, size: u64) -> Self {
        self.memory_name = name.into();
        self.memory_size = size;
        self
    }

    pub fn with_clock_domain(mut self, name: impl Into<String>, period: ClockCount) -> Self {
        self.clock_domain = name.into();
        self.clock_period = period;
        self
    }
}

impl CaseBuilder for SocTestBench {
    fn build(&self, case: &ExperimentCase) -> Result<Container, GraphError> {
        let mut container = Container::new("soc_test_bench");
        let driver = match self.driver {
            Driver::Simple => components::simple_application("driver", &self.memory_name),
            Driver::Loop {
                iterations,
                ops_per_iteration,
            } => {
                let mut driver = components::loop_application("driver", &self.memory_name);
                components::set_num_iterations(&mut driver, iterations)?;
                components::set_num_ops_per_iteration(&mut driver, ops_per_iteration)?;
                driver
            }
        };
        container.add_component(driver)?;
        container.add_component(components::functional_processor("processor", &self.memory_name))?;
        container.add_component(components::memory("memory", &self.memory_name))?;

        let params = apply_coordinates(
            ConnectionParameters::new().timed(self.clock_domain.as_str()),
            &case.coordinates,
        );
        container.connect(SOC_BENCH_CONNECTION, "driver.doorbell", "processor.doorbell", params)?;
        Ok(container)
    }

    fn engine_setup(&self, _case: &ExperimentCase) -> EngineSetup {
        EngineSetup::new()
            .with_clock_domain(self.clock_domain.as_str(), self.clock_period)
            .with_memory_region(self.memory_name.as_str(), self.memory_size)
    }
}

/// A container described in configuration.
///
/// Components are created through the registry on every build, so each
/// case gets its own graph. An axis applies to the connections it names, or
/// to every connection when it names none.
#[derive(Clone, Debug)]
pub struct ConfiguredBench {
    registry: ComponentRegistry,
    container: ContainerConfig,
    /// Axis name to targeted connections (empty = all)
    targets: Vec<(String, SweepTarget, Vec<String>)>,
}

impl ConfiguredBench {
    /// Creates the bench and builds the base container once.
    ///
    /// # Errors
    /// Fatal configuration problems: an axis that is not a [`SweepTarget`],
    /// or a container that cannot be constructed.
    pub fn new(
        registry: ComponentRegistry,
        container: ContainerConfig,
        axes: &[AxisConfig],
    ) -> Result<Self, ExperimentError> {
        let targets = axes
            .iter()
            .map(|axis| -> Result<_, ExperimentError> {
                let target = axis.name.parse::<SweepTarget>()?;
                Ok((axis.name.clone(), target, axis.connections.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let bench = Self {
            registry,
            container,
            targets,
        };
        bench.instantiate(&Coordinates::default())?;
        Ok(bench)
    }

    fn params_for(&self, connection: &str, base: &ConnectionParameters, coordinates: &Coordinates) -> ConnectionParameters {
        let mut params = base.clone();
        for (axis, target, connections) in &self.targets {
            if !connections.is_empty() && !connections.iter().any(|c| c == connection) {
                continue;
            }
            if let Some(value) = coordinates.get(axis) {
                target.apply(&mut params, value);
            }
        }
        params
    }

    fn instantiate(&self, coordinates: &Coordinates) -> Result<Container, GraphError> {
        let mut container = Container::new(self.container.name.as_str());
        for spec in &self.container.components {
            let mut component = self.registry.create(&spec.kind, &spec.name, &spec.attrs)?;
            for (name, value) in &spec.parameters {
                component.set_parameter(name, value.to_string())?;
            }
            container.add_component(component)?;
        }
        for spec in &self.container.connections {
            let params = self.params_for(&spec.name, &spec.params, coordinates);
            container.connect(spec.name.as_str(), &spec.src, &spec.dst, params)?;
        }
        Ok(container)
    }
}

impl CaseBuilder for ConfiguredBench {
    fn build(&self, case: &ExperimentCase) -> Result<Container, GraphError> {
        self.instantiate(&case.coordinates)
    }

    fn engine_setup(&self, _case: &ExperimentCase) -> EngineSetup {
        EngineSetup {
            clock_domains: self.container.clock_domains.clone(),
            memory_regions: self.container.memory_regions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::params;
    use crate::config::{ComponentConfig, ConnectionConfig};
    use crate::parameter::ParameterValue;
    use crate::registry::create_default_registry;
    use crate::sweep::DesignSpace;
    use std::collections::{BTreeMap, HashMap};

    fn space(axes: Vec<ExperimentAxis>) -> DesignSpace {
        DesignSpace::new(axes).unwrap()
    }

    #[test]
    fn test_sweep_target_parse() {
        assert_eq!("read_rate".parse::<SweepTarget>().unwrap(), SweepTarget::ReadRate);
        assert_eq!(SweepTarget::Capacity.to_string(), "capacity");
        assert!(matches!(
            "clock_speed".parse::<SweepTarget>(),
            Err(ExperimentError::UnsupportedAxis(name)) if name == "clock_speed"
        ));
    }

    #[test]
    fn test_number_bench_applies_coordinates() {
        let space = space(vec![
            ExperimentAxis::new("read_rate", "r", [2]),
            ExperimentAxis::new("write_rate", "w", [3]),
            ExperimentAxis::new("latency", "l", [4]),
            ExperimentAxis::new("capacity", "c", [5]),
        ]);
        let case = space.case_at(0).unwrap();
        let bench = NumberTestBench::new().with_num_transactions(20);
        let container = bench.build(&case).unwrap();

        let conn = &container.connection(NUMBER_BENCH_CONNECTION).unwrap().params;
        assert_eq!((conn.read_rate, conn.write_rate, conn.latency, conn.capacity), (2, 3, 4, 5));
        assert_eq!(conn.clock_domain.as_deref(), Some("clk"));
        assert_eq!(
            container
                .component("producer")
                .unwrap()
                .parameter(params::NUM_TRANSACTIONS)
                .unwrap()
                .as_uint(),
            Some(20)
        );
        assert!(container.validate().is_valid());
        assert!(bench.engine_setup(&case).clock_domain("clk").is_some());
    }

    #[test]
    fn test_fresh_container_per_case() {
        let space = space(vec![ExperimentAxis::new("latency", "l", [0, 7])]);
        let bench = NumberTestBench::new();
        let first = bench.build(&space.case_at(0).unwrap()).unwrap();
        let second = bench.build(&space.case_at(1).unwrap()).unwrap();
        assert_eq!(first.connection(NUMBER_BENCH_CONNECTION).unwrap().params.latency, 0);
        assert_eq!(second.connection(NUMBER_BENCH_CONNECTION).unwrap().params.latency, 7);
    }

    #[test]
    fn test_zero_capacity_fails_case() {
        let space = space(vec![ExperimentAxis::new("capacity", "c", [0])]);
        let err = NumberTestBench::new().build(&space.case_at(0).unwrap()).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConnectionParameters { .. }));
    }

    #[test]
    fn test_check_axes() {
        let bench = NumberTestBench::new();
        assert!(bench.check_axes(&[ExperimentAxis::new("latency", "l", [1])]).is_ok());
        assert!(bench.check_axes(&[ExperimentAxis::new("voltage", "v", [1])]).is_err());
    }

    #[test]
    fn test_soc_bench() {
        let space = space(vec![ExperimentAxis::new("latency", "l", [2])]);
        let case = space.case_at(0).unwrap();
        let bench = SocTestBench::new(Driver::Loop {
            iterations: 3,
            ops_per_iteration: 4,
        });
        let container = bench.build(&case).unwrap();
        assert!(container.validate().is_valid());
        assert_eq!(
            container.component("driver").unwrap().parameter(params::NUM_ITERATIONS).unwrap().as_uint(),
            Some(3)
        );
        assert_eq!(container.connection(SOC_BENCH_CONNECTION).unwrap().params.latency, 2);
        assert!(bench.engine_setup(&case).memory_region("mem").is_some());
    }

    fn two_stage_config() -> ContainerConfig {
        let producer = ComponentConfig {
            name: "producer".into(),
            kind: "number_producer".into(),
            attrs: HashMap::new(),
            parameters: BTreeMap::from([("num_transactions".to_string(), ParameterValue::UInt(5))]),
        };
        let consumer = |name: &str| ComponentConfig {
            name: name.into(),
            kind: "number_consumer".into(),
            attrs: HashMap::new(),
            parameters: BTreeMap::new(),
        };
        ContainerConfig {
            name: "configured".into(),
            components: vec![producer, consumer("consumer")],
            connections: vec![ConnectionConfig {
                name: "pc".into(),
                src: "producer.out".into(),
                dst: "consumer.in".into(),
                params: ConnectionParameters::new().with_capacity(2),
            }],
            clock_domains: Vec::new(),
            memory_regions: Vec::new(),
        }
    }

    #[test]
    fn test_configured_bench() {
        let axes = vec![AxisConfig {
            name: "latency".into(),
            prefix: "l".into(),
            values: vec![3],
            connections: vec!["pc".into()],
        }];
        let bench = ConfiguredBench::new(create_default_registry(), two_stage_config(), &axes).unwrap();
        let space = space(axes.iter().map(AxisConfig::to_axis).collect());
        let container = bench.build(&space.case_at(0).unwrap()).unwrap();

        let conn = &container.connection("pc").unwrap().params;
        assert_eq!(conn.latency, 3);
        assert_eq!(conn.capacity, 2);
        assert_eq!(
            container.component("producer").unwrap().parameter("num_transactions").unwrap().as_uint(),
            Some(5)
        );
    }

    #[test]
    fn test_configured_bench_rejects_bad_container() {
        let mut config = two_stage_config();
        config.components[0].kind = "gpu".into();
        let err = ConfiguredBench::new(create_default_registry(), config, &[]).unwrap_err();
        assert!(matches!(err, ExperimentError::Graph(GraphError::UnknownKind(_))));

        let mut config = two_stage_config();
        config.components[0]
            .parameters
            .insert("num_transactions".into(), ParameterValue::String("many".into()));
        assert!(ConfiguredBench::new(create_default_registry(), config, &[]).is_err());
    }
}
