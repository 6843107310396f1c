//! Deterministic FIFO flow model.
//!
//! Every container connection becomes a bounded queue. Source components
//! (number producers and application drivers) push their quota of items
//! into their outgoing connections; every reader drains its inputs. The
//! model is busy until all quotas are exhausted and every queue is empty.
//!
//! Per active clock, each connection first pops up to `read_rate` items
//! whose latency has elapsed, then accepts up to `write_rate` new items
//! while below `capacity`. An item pushed at clock `t` can be popped at
//! `t + 1 + latency` at the earliest. A timed connection is only active on
//! clocks that are a multiple of its domain's period.
//!
//! Counters are exposed as `<connection>.stats.pushed`,
//! `<connection>.stats.popped`, `<connection>.stats.occupancy` and
//! `<component>.stats.produced`.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::components::{kinds, params};
use crate::connection::ConnectionParameters;
use crate::container::Container;
use crate::engine::{EngineFactory, EngineHandle, EngineSetup};
use crate::error::EngineError;
use crate::types::{ClockCount, CounterValue};

/// Factory for [`FifoModelHandle`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FifoModelEngine;

impl FifoModelEngine {
    pub fn new() -> Self {
        Self
    }
}

impl EngineFactory for FifoModelEngine {
    fn build(&self, container: &Container, setup: &EngineSetup) -> Result<Box<dyn EngineHandle>, EngineError> {
        Ok(Box::new(FifoModelHandle::new(container, setup)?))
    }
}

#[derive(Debug)]
struct Channel {
    name: String,
    params: ConnectionParameters,
    period: ClockCount,
    src_component: String,
    /// Clock at which each queued item becomes readable
    in_flight: VecDeque<ClockCount>,
    pushed: u64,
    popped: u64,
}

#[derive(Debug)]
struct Source {
    remaining: u64,
    produced: u64,
}

/// A built FIFO flow model.
#[derive(Debug)]
pub struct FifoModelHandle {
    container: String,
    channels: Vec<Channel>,
    sources: BTreeMap<String, Source>,
    issues: Vec<String>,
    now: ClockCount,
    ready: bool,
    torn_down: bool,
}

fn uint_parameter(container: &Container, component: &str, name: &str) -> Result<u64, EngineError> {
    container
        .component(component)
        .and_then(|c| c.parameter(name))
        .and_then(|p| p.as_uint())
        .ok_or_else(|| EngineError::Build(format!("`{}` has no UINT parameter `{}`", component, name)))
}

fn counter(value: u64) -> CounterValue {
    CounterValue::try_from(value).unwrap_or(CounterValue::MAX)
}

impl FifoModelHandle {
    /// Builds the model, recording setup problems for [`validate`](EngineHandle::validate).
    pub fn new(container: &Container, setup: &EngineSetup) -> Result<Self, EngineError> {
        let mut issues = Vec::new();
        let domain_period = |owner: &str, params: &ConnectionParameters, issues: &mut Vec<String>| {
            match params.clock_domain.as_deref().filter(|_| params.is_timed) {
                None => 1,
                Some(domain) => match setup.clock_domain(domain) {
                    Some(d) if d.period > 0 => d.period,
                    Some(_) => {
                        issues.push(format!("clock domain `{}` has a zero period", domain));
                        1
                    }
                    None => {
                        issues.push(format!("`{}` uses unregistered clock domain `{}`", owner, domain));
                        1
                    }
                },
            }
        };

        let mut sources = BTreeMap::new();
        for component in container.components() {
            let quota = match component.kind() {
                kinds::NUMBER_PRODUCER => Some(uint_parameter(container, component.name(), params::NUM_TRANSACTIONS)?),
                kinds::SIMPLE_DRIVER => Some(1),
                kinds::LOOP_DRIVER => {
                    let iterations = uint_parameter(container, component.name(), params::NUM_ITERATIONS)?;
                    let ops = uint_parameter(container, component.name(), params::NUM_OPS_PER_ITERATION)?;
                    Some(iterations.saturating_mul(ops))
                }
                _ => None,
            };
            if let Some(remaining) = quota {
                sources.insert(
                    component.name().to_string(),
                    Source {
                        remaining,
                        produced: 0,
                    },
                );
            }

            if let Some(memory) = component.parameter(params::MEMORY_NAME).and_then(|p| p.as_str()) {
                if setup.memory_region(memory).is_none() {
                    issues.push(format!(
                        "`{}` uses unregistered memory region `{}`",
                        component.name(),
                        memory
                    ));
                }
            }
            for internal in component.internal_connections() {
                let owner = format!("{}.{}", component.name(), internal.name);
                domain_period(&owner, &internal.params, &mut issues);
            }
        }

        let channels: Vec<Channel> = container
            .connections()
            .map(|c| Channel {
                name: c.name.clone(),
                period: domain_period(&c.name, &c.params, &mut issues),
                params: c.params.clone(),
                src_component: c.src.component.clone(),
                in_flight: VecDeque::new(),
                pushed: 0,
                popped: 0,
            })
            .collect();

        for name in sources.keys() {
            if !channels.iter().any(|c| &c.src_component == name) {
                issues.push(format!("source `{}` has no outgoing connection", name));
            }
        }

        tracing::trace!(
            container = %container.name(),
            channels = channels.len(),
            sources = sources.len(),
            "fifo model built"
        );

        Ok(Self {
            container: container.name().to_string(),
            channels,
            sources,
            issues,
            now: 0,
            ready: false,
            torn_down: false,
        })
    }

    fn step(&mut self) {
        let now = self.now;
        for channel in &mut self.channels {
            if now % channel.period != 0 {
                continue;
            }

            let mut popped = 0;
            while popped < channel.params.read_rate
                && channel.in_flight.front().map_or(false, |&ready_at| ready_at <= now)
            {
                channel.in_flight.pop_front();
                channel.popped += 1;
                popped += 1;
            }

            if let Some(source) = self.sources.get_mut(&channel.src_component) {
                let mut pushed = 0;
                while pushed < channel.params.write_rate
                    && source.remaining > 0
                    && (channel.in_flight.len() as u64) < channel.params.capacity
                {
                    channel
                        .in_flight
                        .push_back(now + 1 + channel.params.latency);
                    channel.pushed += 1;
                    source.remaining -= 1;
                    source.produced += 1;
                    pushed += 1;
                }
            }
        }
        self.now += 1;
    }

    fn is_busy(&self) -> bool {
        self.sources.values().any(|s| s.remaining > 0)
            || self.channels.iter().any(|c| !c.in_flight.is_empty())
    }
}

impl EngineHandle for FifoModelHandle {
    fn validate(&self) -> Result<(), Vec<String>> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(self.issues.clone())
        }
    }

    fn setup(&mut self) -> Result<(), EngineError> {
        if self.ready {
            return Err(EngineError::Setup(format!("`{}` is already set up", self.container)));
        }
        self.ready = true;
        Ok(())
    }

    fn clock(&mut self, n: ClockCount) -> Result<bool, EngineError> {
        if !self.ready || self.torn_down {
            return Err(EngineError::Setup(format!(
                "`{}` cannot be clocked before setup or after tear down",
                self.container
            )));
        }
        for _ in 0..n {
            self.step();
        }
        Ok(self.is_busy())
    }

    fn tear_down(&mut self) {
        if !self.torn_down {
            tracing::trace!(container = %self.container, time = self.now, "fifo model torn down");
        }
        self.torn_down = true;
        for channel in &mut self.channels {
            channel.in_flight.clear();
        }
    }

    fn get_time(&self) -> ClockCount {
        self.now
    }

    fn get_all_counter_values(&self) -> HashMap<String, CounterValue> {
        let mut counters = HashMap::new();
        for channel in &self.channels {
            counters.insert(format!("{}.stats.pushed", channel.name), counter(channel.pushed));
            counters.insert(format!("{}.stats.popped", channel.name), counter(channel.popped));
            counters.insert(
                format!("{}.stats.occupancy", channel.name),
                counter(channel.in_flight.len() as u64),
            );
        }
        for (name, source) in &self.sources {
            counters.insert(format!("{}.stats.produced", name), counter(source.produced));
        }
        counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components;

    fn number_bench(transactions: u64, params: ConnectionParameters) -> Container {
        let mut c = Container::new("number_bench");
        c.add_component(components::producer("producer")).unwrap();
        c.add_component(components::consumer("consumer")).unwrap();
        c.set_parameter("producer", params::NUM_TRANSACTIONS, transactions.to_string())
            .unwrap();
        c.connect("producer_consumer", "producer.out", "consumer.in", params)
            .unwrap();
        c
    }

    fn run(container: &Container, setup: &EngineSetup) -> (ClockCount, HashMap<String, CounterValue>) {
        let mut handle = FifoModelEngine.build(container, setup).unwrap();
        handle.validate().unwrap();
        handle.setup().unwrap();
        while handle.clock(1).unwrap() {}
        let result = (handle.get_time(), handle.get_all_counter_values());
        handle.tear_down();
        result
    }

    #[test]
    fn test_unit_latency_throughput() {
        let (time, counters) = run(&number_bench(10, ConnectionParameters::new()), &EngineSetup::new());
        assert_eq!(time, 11);
        assert_eq!(counters["producer_consumer.stats.pushed"], 10);
        assert_eq!(counters["producer_consumer.stats.popped"], 10);
        assert_eq!(counters["producer.stats.produced"], 10);
    }

    #[test]
    fn test_latency_and_capacity() {
        let setup = EngineSetup::new();
        let (serial, _) = run(
            &number_bench(10, ConnectionParameters::new().with_latency(1)),
            &setup,
        );
        assert_eq!(serial, 21);

        let (overlapped, _) = run(
            &number_bench(10, ConnectionParameters::new().with_latency(1).with_capacity(2)),
            &setup,
        );
        assert_eq!(overlapped, 12);
    }

    #[test]
    fn test_timed_connection_uses_domain_period() {
        let setup = EngineSetup::new().with_clock_domain("slow", 2);
        let (time, _) = run(&number_bench(10, ConnectionParameters::new().timed("slow")), &setup);
        assert_eq!(time, 21);
    }

    #[test]
    fn test_unregistered_domain_rejected() {
        let container = number_bench(10, ConnectionParameters::new().timed("clk"));
        let handle = FifoModelEngine.build(&container, &EngineSetup::new()).unwrap();
        let issues = handle.validate().unwrap_err();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("`clk`"));
    }

    #[test]
    fn test_zero_transactions_idle_after_first_clock() {
        let (time, _) = run(&number_bench(0, ConnectionParameters::new()), &EngineSetup::new());
        assert_eq!(time, 1);
    }

    #[test]
    fn test_clock_requires_setup() {
        let container = number_bench(1, ConnectionParameters::new());
        let mut handle = FifoModelEngine.build(&container, &EngineSetup::new()).unwrap();
        assert!(matches!(handle.clock(1), Err(EngineError::Setup(_))));
        handle.setup().unwrap();
        assert!(handle.setup().is_err());
        handle.tear_down();
        assert!(handle.clock(1).is_err());
    }
}
