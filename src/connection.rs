//! Connections between ports and wiring inside components.
//!
//! Connections carry [`ConnectionParameters`] that govern throughput and
//! latency inside the engine. This crate only carries and structurally
//! validates them; the timing semantics belong to the engine.
//!
//! # Example
//!
//! ```
//! use hestia::connection::ConnectionParameters;
//!
//! let params = ConnectionParameters::new()
//!     .with_latency(2)
//!     .with_capacity(4)
//!     .with_rates(1, 2)
//!     .timed("clk");
//!
//! assert!(params.check().is_ok());
//! assert_eq!(params.clock_domain.as_deref(), Some("clk"));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::GraphError;
use crate::port::PortRef;

/// Timing parameters of a connection or internal connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionParameters {
    /// Transfer latency in clocks
    #[serde(default)]
    pub latency: u64,
    /// Number of items the connection can hold (at least 1)
    #[serde(default = "default_one")]
    pub capacity: u64,
    /// Items the reader may pop per clock (at least 1)
    #[serde(default = "default_one")]
    pub read_rate: u64,
    /// Items the writer may push per clock (at least 1)
    #[serde(default = "default_one")]
    pub write_rate: u64,
    /// Whether transfers are clocked by `clock_domain`
    #[serde(default)]
    pub is_timed: bool,
    /// Clock domain identifier, required when `is_timed` is set
    #[serde(default)]
    pub clock_domain: Option<String>,
}

fn default_one() -> u64 {
    1
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        Self {
            latency: 0,
            capacity: 1,
            read_rate: 1,
            write_rate: 1,
            is_timed: false,
            clock_domain: None,
        }
    }
}

impl ConnectionParameters {
    /// Creates parameters with the defaults (untimed, unit capacity and rates).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: u64) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the read and write rates.
    pub fn with_rates(mut self, read_rate: u64, write_rate: u64) -> Self {
        self.read_rate = read_rate;
        self.write_rate = write_rate;
        self
    }

    /// Marks the connection as timed in the given clock domain.
    pub fn timed(mut self, clock_domain: impl Into<String>) -> Self {
        self.is_timed = true;
        self.clock_domain = Some(clock_domain.into());
        self
    }

    /// Checks the structural ranges, returning the first violation.
    pub fn check(&self) -> Result<(), String> {
        if self.capacity < 1 {
            return Err(format!("capacity must be at least 1, got {}", self.capacity));
        }
        if self.read_rate < 1 {
            return Err(format!("read_rate must be at least 1, got {}", self.read_rate));
        }
        if self.write_rate < 1 {
            return Err(format!("write_rate must be at least 1, got {}", self.write_rate));
        }
        match (&self.clock_domain, self.is_timed) {
            (None, true) => Err("timed connection has no clock domain".to_string()),
            (Some(domain), _) if !is_identifier(domain) => {
                Err(format!("clock domain `{}` is not an identifier", domain))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn validate_for(&self, name: &str) -> Result<(), GraphError> {
        self.check()
            .map_err(|reason| GraphError::InvalidConnectionParameters {
                name: name.to_string(),
                reason,
            })
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A directed binding from a write-capable port to a read-capable port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Connection name, unique within its container
    pub name: String,
    /// Source endpoint (write-capable)
    pub src: PortRef,
    /// Destination endpoint (read-capable)
    pub dst: PortRef,
    /// Timing parameters
    pub params: ConnectionParameters,
}

impl Connection {
    pub fn new(name: impl Into<String>, src: PortRef, dst: PortRef, params: ConnectionParameters) -> Self {
        Self {
            name: name.into(),
            src,
            dst,
            params,
        }
    }
}

/// Kind of wiring inside a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InternalConnectionKind {
    Fifo,
    Pipeline,
}

impl fmt::Display for InternalConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InternalConnectionKind::Fifo => f.write_str("FIFO"),
            InternalConnectionKind::Pipeline => f.write_str("PIPELINE"),
        }
    }
}

/// Wiring between the internal stages of a component.
///
/// An internal connection may consume ports of its owning component; those
/// ports count as bound during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalConnection {
    /// Name, unique within the owning component
    pub name: String,
    pub kind: InternalConnectionKind,
    /// Name of the owning component
    pub owner: String,
    pub params: ConnectionParameters,
    /// Ports of the owner consumed by this connection
    #[serde(default)]
    pub ports: Vec<String>,
}

impl InternalConnection {
    pub fn new(
        name: impl Into<String>,
        owner: impl Into<String>,
        kind: InternalConnectionKind,
        params: ConnectionParameters,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            owner: owner.into(),
            params,
            ports: Vec::new(),
        }
    }

    /// Marks a port of the owning component as consumed by this connection.
    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.ports.push(port.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = ConnectionParameters::default();
        assert_eq!(p.latency, 0);
        assert_eq!(p.capacity, 1);
        assert_eq!(p.read_rate, 1);
        assert_eq!(p.write_rate, 1);
        assert!(!p.is_timed);
        assert!(p.check().is_ok());
    }

    #[test]
    fn test_range_violations() {
        assert!(ConnectionParameters::new().with_capacity(0).check().is_err());
        assert!(ConnectionParameters::new().with_rates(0, 1).check().is_err());
        assert!(ConnectionParameters::new().with_rates(1, 0).check().is_err());
    }

    #[test]
    fn test_timed_requires_domain() {
        let mut p = ConnectionParameters::new();
        p.is_timed = true;
        let err = p.check().unwrap_err();
        assert!(err.contains("clock domain"));

        assert!(ConnectionParameters::new().timed("clk").check().is_ok());
        assert!(ConnectionParameters::new().timed("9clk").check().is_err());
    }

    #[test]
    fn test_validate_for_names_connection() {
        let err = ConnectionParameters::new()
            .with_capacity(0)
            .validate_for("producer_consumer")
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::InvalidConnectionParameters { ref name, .. } if name == "producer_consumer"
        ));
    }

    #[test]
    fn test_yaml_defaults() {
        let p: ConnectionParameters = serde_yaml::from_str("latency: 3").unwrap();
        assert_eq!(p.latency, 3);
        assert_eq!(p.capacity, 1);
        assert_eq!(p.read_rate, 1);
    }

    #[test]
    fn test_internal_connection_ports() {
        let ic = InternalConnection::new(
            "decoded_instruction",
            "cpu",
            InternalConnectionKind::Fifo,
            ConnectionParameters::default(),
        )
        .with_port("doorbell");
        assert_eq!(ic.ports, vec!["doorbell".to_string()]);
        assert_eq!(ic.kind.to_string(), "FIFO");
    }
}
