//! Engine contract.
//!
//! The cycle-level engine is an external collaborator. The orchestrator only
//! talks to it through [`EngineFactory`] and [`EngineHandle`]:
//!
//! 1. clock domains and memory regions are described in an [`EngineSetup`]
//!    and supplied together with the container to [`EngineFactory::build`]
//! 2. [`EngineHandle::validate`] lets the engine reject the model
//! 3. [`EngineHandle::setup`] prepares the run
//! 4. [`EngineHandle::clock`] advances time and reports whether the model is
//!    still busy
//! 5. [`EngineHandle::tear_down`] releases engine resources
//!
//! A handle is owned by exactly one run for its whole lifetime.
//! [`model::FifoModelEngine`] is a deterministic reference implementation.

pub mod model;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::container::Container;
use crate::error::EngineError;
use crate::types::{ClockCount, CounterValue};

pub use model::FifoModelEngine;

/// A named clock with its period in base clocks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClockDomain {
    pub name: String,
    /// Period in base clocks (at least 1)
    pub period: ClockCount,
}

impl ClockDomain {
    pub fn new(name: impl Into<String>, period: ClockCount) -> Self {
        Self {
            name: name.into(),
            period,
        }
    }
}

/// A named memory region available to the model.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryRegion {
    pub name: String,
    /// Size in bytes
    pub size: u64,
}

impl MemoryRegion {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Inputs the engine needs before a container can be built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSetup {
    #[serde(default)]
    pub clock_domains: Vec<ClockDomain>,
    #[serde(default)]
    pub memory_regions: Vec<MemoryRegion>,
}

impl EngineSetup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock_domain(mut self, name: impl Into<String>, period: ClockCount) -> Self {
        self.clock_domains.push(ClockDomain::new(name, period));
        self
    }

    pub fn with_memory_region(mut self, name: impl Into<String>, size: u64) -> Self {
        self.memory_regions.push(MemoryRegion::new(name, size));
        self
    }

    pub fn clock_domain(&self, name: &str) -> Option<&ClockDomain> {
        self.clock_domains.iter().find(|d| d.name == name)
    }

    pub fn memory_region(&self, name: &str) -> Option<&MemoryRegion> {
        self.memory_regions.iter().find(|m| m.name == name)
    }
}

/// Builds engine handles from containers.
///
/// Shared by every worker of a sweep, so implementations must be `Sync`.
pub trait EngineFactory: Send + Sync {
    /// Builds a fresh handle for `container`.
    fn build(&self, container: &Container, setup: &EngineSetup) -> Result<Box<dyn EngineHandle>, EngineError>;
}

/// A built model, driven by a single run.
pub trait EngineHandle: Send {
    /// Checks the built model, returning every problem found.
    fn validate(&self) -> Result<(), Vec<String>>;

    /// Prepares the model for clocking. Called once, after [`validate`](Self::validate).
    fn setup(&mut self) -> Result<(), EngineError>;

    /// Advances the model by `n` base clocks.
    ///
    /// Returns `true` while the model still has work to do.
    fn clock(&mut self, n: ClockCount) -> Result<bool, EngineError>;

    /// Releases engine resources. Safe to call more than once.
    fn tear_down(&mut self);

    /// Base clocks elapsed so far.
    fn get_time(&self) -> ClockCount;

    /// Every counter the model exposes, keyed by dotted path.
    fn get_all_counter_values(&self) -> HashMap<String, CounterValue>;
}

impl<F> EngineFactory for F
where
    F: Fn(&Container, &EngineSetup) -> Result<Box<dyn EngineHandle>, EngineError> + Send + Sync,
{
    fn build(&self, container: &Container, setup: &EngineSetup) -> Result<Box<dyn EngineHandle>, EngineError> {
        self(container, setup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Stays busy for a fixed number of clocks.
    struct CountdownHandle {
        remaining: ClockCount,
        time: ClockCount,
    }

    impl EngineHandle for CountdownHandle {
        fn validate(&self) -> Result<(), Vec<String>> {
            Ok(())
        }

        fn setup(&mut self) -> Result<(), EngineError> {
            Ok(())
        }

        fn clock(&mut self, n: ClockCount) -> Result<bool, EngineError> {
            let step = n.min(self.remaining);
            self.remaining -= step;
            self.time += n;
            Ok(self.remaining > 0)
        }

        fn tear_down(&mut self) {
            self.remaining = 0;
        }

        fn get_time(&self) -> ClockCount {
            self.time
        }

        fn get_all_counter_values(&self) -> HashMap<String, CounterValue> {
            HashMap::from([("countdown.stats.remaining".to_string(), self.remaining as CounterValue)])
        }
    }

    #[test]
    fn test_closure_factory() {
        let factory = |_: &Container, _: &EngineSetup| -> Result<Box<dyn EngineHandle>, EngineError> {
            Ok(Box::new(CountdownHandle {
                remaining: 3,
                time: 0,
            }))
        };

        let mut handle = factory.build(&Container::new("empty"), &EngineSetup::new()).unwrap();
        handle.setup().unwrap();
        assert!(handle.clock(1).unwrap());
        assert!(handle.clock(1).unwrap());
        assert!(!handle.clock(1).unwrap());
        assert_eq!(handle.get_time(), 3);
        assert_eq!(handle.get_all_counter_values()["countdown.stats.remaining"], 0);
        handle.tear_down();
    }

    #[test]
    fn test_setup_lookup() {
        let setup = EngineSetup::new()
            .with_clock_domain("clk", 1)
            .with_memory_region("mem", 4096);
        assert_eq!(setup.clock_domain("clk").map(|d| d.period), Some(1));
        assert!(setup.clock_domain("slow").is_none());
        assert_eq!(setup.memory_region("mem").map(|m| m.size), Some(4096));
    }
}
