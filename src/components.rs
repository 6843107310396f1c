//! Built-in component library.
//!
//! Constructors for the components the bundled engine models implement:
//! number producer/consumer for throughput benches, four processor
//! micro-architectures, a shared memory and two application drivers.
//!
//! # Available Components
//!
//! | Constructor | Kind tag |
//! |-------------|----------|
//! | [`producer`] | `number_producer` |
//! | [`consumer`] | `number_consumer` |
//! | [`functional_processor`] | `functional_processor` |
//! | [`memory_bound_processor`] | `memory_bound_processor` |
//! | [`performant_processor`] | `performant_processor` |
//! | [`pipelined_processor`] | `pipelined_processor` |
//! | [`memory`] | `memory` |
//! | [`simple_application`] | `simple_driver` |
//! | [`loop_application`] | `loop_driver` |
//!
//! The `set_*` helpers assign one library parameter with its native type.
//! They fail with [`GraphError::UnknownParameter`] on a component that does
//! not declare that parameter.

use crate::component::Component;
use crate::connection::{ConnectionParameters, InternalConnection, InternalConnectionKind};
use crate::error::GraphError;
use crate::parameter::Parameter;
use crate::port::PortDirection;

pub mod kinds {
    pub const NUMBER_PRODUCER: &str = "number_producer";
    pub const NUMBER_CONSUMER: &str = "number_consumer";
    pub const FUNCTIONAL_PROCESSOR: &str = "functional_processor";
    pub const MEMORY_BOUND_PROCESSOR: &str = "memory_bound_processor";
    pub const PERFORMANT_PROCESSOR: &str = "performant_processor";
    pub const PIPELINED_PROCESSOR: &str = "pipelined_processor";
    pub const MEMORY: &str = "memory";
    pub const SIMPLE_DRIVER: &str = "simple_driver";
    pub const LOOP_DRIVER: &str = "loop_driver";
}

pub mod params {
    pub const NUM_TRANSACTIONS: &str = "num_transactions";
    pub const MIN_NUMBER: &str = "min_number";
    pub const MAX_NUMBER: &str = "max_number";
    pub const MEMORY_NAME: &str = "memory_name";
    pub const NUM_REGISTERS: &str = "num_registers";
    pub const NUM_ITERATIONS: &str = "num_iterations";
    pub const NUM_OPS_PER_ITERATION: &str = "num_ops_per_iteration";
    pub const MODE: &str = "mode";
}

const DEFAULT_NUM_TRANSACTIONS: u64 = 100;
const DEFAULT_NUM_REGISTERS: u64 = 10;

/// Writes `num_transactions` random numbers in `[min_number, max_number]`.
pub fn producer(name: &str) -> Component {
    Component::new(name, kinds::NUMBER_PRODUCER)
        .with_port("out", PortDirection::Write)
        .with_parameter(Parameter::uint(params::NUM_TRANSACTIONS, DEFAULT_NUM_TRANSACTIONS))
        .with_parameter(Parameter::uint(params::MIN_NUMBER, 0))
        .with_parameter(Parameter::uint(params::MAX_NUMBER, 100))
}

/// Reads numbers until its input drains.
pub fn consumer(name: &str) -> Component {
    Component::new(name, kinds::NUMBER_CONSUMER).with_port("in", PortDirection::Read)
}

/// Executes an application image directly from memory, one instruction per doorbell.
pub fn functional_processor(name: &str, memory_name: &str) -> Component {
    Component::new(name, kinds::FUNCTIONAL_PROCESSOR)
        .with_port("doorbell", PortDirection::Read)
        .with_parameter(Parameter::string(params::MEMORY_NAME, memory_name))
        .with_parameter(Parameter::uint(params::NUM_REGISTERS, DEFAULT_NUM_REGISTERS))
}

fn with_memory_ports(component: Component) -> Component {
    component
        .with_port("doorbell", PortDirection::Read)
        .with_port("instruction_request", PortDirection::Write)
        .with_port("instruction_response", PortDirection::Read)
        .with_port("data_request", PortDirection::Write)
        .with_port("data_response", PortDirection::Read)
}

/// Fetches instructions and data through the memory ports, decoding into a FIFO.
pub fn memory_bound_processor(name: &str, memory_name: &str) -> Result<Component, GraphError> {
    let mut cpu = with_memory_ports(Component::new(name, kinds::MEMORY_BOUND_PROCESSOR))
        .with_parameter(Parameter::string(params::MEMORY_NAME, memory_name))
        .with_parameter(Parameter::uint(params::NUM_REGISTERS, DEFAULT_NUM_REGISTERS));
    cpu.add_internal_connection(InternalConnection::new(
        "decoded_instruction",
        name,
        InternalConnectionKind::Fifo,
        ConnectionParameters::default(),
    ))?;
    Ok(cpu)
}

fn staged_processor(name: &str, kind: &str, domain: &str, memory_name: &str) -> Result<Component, GraphError> {
    let mut cpu = with_memory_ports(Component::new(name, kind))
        .with_parameter(Parameter::string(params::MEMORY_NAME, memory_name))
        .with_parameter(Parameter::uint(params::NUM_REGISTERS, DEFAULT_NUM_REGISTERS));
    let stage_params = ConnectionParameters::new().timed(domain);
    for stage in ["fetcher", "decoder", "executor", "write_back"] {
        cpu.add_internal_connection(InternalConnection::new(
            stage,
            name,
            InternalConnectionKind::Pipeline,
            stage_params.clone(),
        ))?;
    }
    Ok(cpu)
}

/// Four timed pipeline stages with a single instruction in flight.
pub fn performant_processor(name: &str, domain: &str, memory_name: &str) -> Result<Component, GraphError> {
    staged_processor(name, kinds::PERFORMANT_PROCESSOR, domain, memory_name)
}

/// Four timed pipeline stages with overlapping instructions.
pub fn pipelined_processor(name: &str, domain: &str, memory_name: &str) -> Result<Component, GraphError> {
    staged_processor(name, kinds::PIPELINED_PROCESSOR, domain, memory_name)
}

/// Shared memory serving any number of requesters.
pub fn memory(name: &str, memory_name: &str) -> Component {
    Component::new(name, kinds::MEMORY)
        .with_port("requests", PortDirection::ReadArray)
        .with_port("responses", PortDirection::WriteArray)
        .with_parameter(Parameter::string(params::MEMORY_NAME, memory_name))
}

/// Loads a straight-line program and rings the processor doorbell once.
pub fn simple_application(name: &str, memory_name: &str) -> Component {
    Component::new(name, kinds::SIMPLE_DRIVER)
        .with_port("doorbell", PortDirection::Write)
        .with_parameter(Parameter::string(params::MEMORY_NAME, memory_name))
}

/// Loads a loop of `num_iterations` x `num_ops_per_iteration` operations.
///
/// `mode` selects the operation mix (`alu` by default).
pub fn loop_application(name: &str, memory_name: &str) -> Component {
    Component::new(name, kinds::LOOP_DRIVER)
        .with_port("doorbell", PortDirection::Write)
        .with_parameter(Parameter::string(params::MEMORY_NAME, memory_name))
        .with_parameter(Parameter::uint(params::NUM_ITERATIONS, 100))
        .with_parameter(Parameter::uint(params::NUM_OPS_PER_ITERATION, 100))
        .with_parameter(Parameter::string(params::MODE, "alu"))
}

// ============================================================================
// Parameter Setters
// ============================================================================

/// Number of values a producer writes.
pub fn set_num_transactions(component: &mut Component, n: u64) -> Result<(), GraphError> {
    component.set_parameter(params::NUM_TRANSACTIONS, n.to_string())
}

pub fn set_min_number(component: &mut Component, n: u64) -> Result<(), GraphError> {
    component.set_parameter(params::MIN_NUMBER, n.to_string())
}

pub fn set_max_number(component: &mut Component, n: u64) -> Result<(), GraphError> {
    component.set_parameter(params::MAX_NUMBER, n.to_string())
}

/// Name of the memory region a processor, memory or driver addresses.
pub fn set_memory_name(component: &mut Component, name: &str) -> Result<(), GraphError> {
    component.set_parameter(params::MEMORY_NAME, name)
}

pub fn set_num_registers(component: &mut Component, n: u64) -> Result<(), GraphError> {
    component.set_parameter(params::NUM_REGISTERS, n.to_string())
}

pub fn set_num_iterations(component: &mut Component, n: u64) -> Result<(), GraphError> {
    component.set_parameter(params::NUM_ITERATIONS, n.to_string())
}

pub fn set_num_ops_per_iteration(component: &mut Component, n: u64) -> Result<(), GraphError> {
    component.set_parameter(params::NUM_OPS_PER_ITERATION, n.to_string())
}

/// Operation mix of a loop driver.
pub fn set_mode(component: &mut Component, mode: &str) -> Result<(), GraphError> {
    component.set_parameter(params::MODE, mode)
}
