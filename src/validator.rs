//! Structural validation of a container before it is handed to the engine.
//!
//! Construction already rejects direction mismatches, duplicate scalar
//! bindings and out-of-range parameters. What remains to check is that the
//! graph is complete: every scalar port must be bound exactly once, either
//! by a container connection or by an internal connection of its own
//! component. Array ports may be bound any number of times, including zero.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::container::Container;
use crate::port::{BindingRole, PortRef};

/// A single problem found by the validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// A scalar port that no connection binds
    UnboundPort { port: PortRef },
    /// A scalar port bound more than once
    MultiplyBoundPort { port: PortRef, bindings: usize },
    /// A connection endpoint whose direction cannot serve its role
    DirectionMismatch { connection: String, port: PortRef, role: BindingRole },
    /// A connection endpoint that no longer resolves to a port
    DanglingEndpoint { connection: String, port: PortRef },
}

impl ValidationIssue {
    /// The port the issue is reported against.
    pub fn port(&self) -> &PortRef {
        match self {
            ValidationIssue::UnboundPort { port }
            | ValidationIssue::MultiplyBoundPort { port, .. }
            | ValidationIssue::DirectionMismatch { port, .. }
            | ValidationIssue::DanglingEndpoint { port, .. } => port,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::UnboundPort { port } => write!(f, "{} is not bound", port),
            ValidationIssue::MultiplyBoundPort { port, bindings } => {
                write!(f, "{} is bound {} times", port, bindings)
            }
            ValidationIssue::DirectionMismatch { connection, port, role } => {
                write!(f, "{} cannot be the {} of `{}`", port, role, connection)
            }
            ValidationIssue::DanglingEndpoint { connection, port } => {
                write!(f, "`{}` references missing port {}", connection, port)
            }
        }
    }
}

/// Outcome of validating a container.
///
/// Holds every issue found, so callers can either check [`is_valid`] or
/// enumerate the offending ports and components.
///
/// [`is_valid`]: ValidationReport::is_valid
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub container: String,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Offending ports, in report order.
    pub fn offending_ports(&self) -> impl Iterator<Item = &PortRef> {
        self.issues.iter().map(ValidationIssue::port)
    }

    /// Names of components with at least one issue, sorted and deduplicated.
    pub fn offending_components(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .offending_ports()
            .map(|p| p.component.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "`{}` is valid", self.container);
        }
        write!(f, "`{}` has {} issue(s): ", self.container, self.issues.len())?;
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", issue)?;
        }
        Ok(())
    }
}

/// Validates `container`, collecting every issue.
pub fn validate(container: &Container) -> ValidationReport {
    let mut issues = Vec::new();

    for connection in container.connections() {
        for (port_ref, role) in [
            (&connection.src, BindingRole::Source),
            (&connection.dst, BindingRole::Destination),
        ] {
            match container.port(port_ref) {
                None => issues.push(ValidationIssue::DanglingEndpoint {
                    connection: connection.name.clone(),
                    port: port_ref.clone(),
                }),
                Some(port) => {
                    let fits = match role {
                        BindingRole::Source => port.direction.is_write(),
                        BindingRole::Destination => port.direction.is_read(),
                    };
                    if !fits {
                        issues.push(ValidationIssue::DirectionMismatch {
                            connection: connection.name.clone(),
                            port: port_ref.clone(),
                            role,
                        });
                    }
                }
            }
        }
    }

    for component in container.components() {
        for port in component.ports() {
            if port.direction.is_array() {
                continue;
            }
            let port_ref = port.to_ref();
            let role = if port.direction.is_write() {
                BindingRole::Source
            } else {
                BindingRole::Destination
            };
            let bindings =
                container.bindings(&port_ref, role) + component.internal_bindings(&port.name);
            match bindings {
                1 => {}
                0 => issues.push(ValidationIssue::UnboundPort { port: port_ref }),
                n => issues.push(ValidationIssue::MultiplyBoundPort {
                    port: port_ref,
                    bindings: n,
                }),
            }
        }
    }

    if !issues.is_empty() {
        tracing::debug!(container = %container.name(), issues = issues.len(), "validation failed");
    }

    ValidationReport {
        container: container.name().to_string(),
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::connection::{ConnectionParameters, InternalConnection, InternalConnectionKind};
    use crate::port::PortDirection;

    fn container() -> Container {
        let mut c = Container::new("bench");
        let mut producer = Component::new("producer", "number_producer");
        producer.add_port("out", PortDirection::Write).unwrap();
        let mut consumer = Component::new("consumer", "number_consumer");
        consumer.add_port("in", PortDirection::Read).unwrap();
        c.add_component(producer).unwrap();
        c.add_component(consumer).unwrap();
        c
    }

    #[test]
    fn test_unbound_ports_enumerated() {
        let c = container();
        let report = c.validate();
        assert!(!report.is_valid());
        assert_eq!(report.issues.len(), 2);
        assert_eq!(report.offending_components(), vec!["consumer", "producer"]);
    }

    #[test]
    fn test_fully_bound_is_valid() {
        let mut c = container();
        c.connect("pc", "producer.out", "consumer.in", ConnectionParameters::new())
            .unwrap();
        let report = c.validate();
        assert!(report.is_valid(), "{}", report);
    }

    #[test]
    fn test_internal_binding_counts() {
        let mut c = container();
        c.add_internal_connection(
            "consumer",
            InternalConnection::new("sink", "consumer", InternalConnectionKind::Fifo, ConnectionParameters::new())
                .with_port("in"),
        )
        .unwrap();
        let report = c.validate();
        assert_eq!(
            report.issues,
            vec![ValidationIssue::UnboundPort {
                port: PortRef::new("producer", "out")
            }]
        );

        // Binding the same scalar port externally as well is one binding too many
        c.connect("pc", "producer.out", "consumer.in", ConnectionParameters::new())
            .unwrap();
        let report = c.validate();
        assert_eq!(
            report.issues,
            vec![ValidationIssue::MultiplyBoundPort {
                port: PortRef::new("consumer", "in"),
                bindings: 2
            }]
        );
    }

    #[test]
    fn test_unbound_array_ports_are_fine() {
        let mut c = Container::new("mem_only");
        let mut mem = Component::new("mem", "memory");
        mem.add_port("requests", PortDirection::ReadArray).unwrap();
        mem.add_port("responses", PortDirection::WriteArray).unwrap();
        c.add_component(mem).unwrap();
        assert!(c.validate().is_valid());
    }

    #[test]
    fn test_report_display() {
        let report = container().validate();
        let text = report.to_string();
        assert!(text.contains("2 issue(s)"));
        assert!(text.contains("producer.out is not bound"));
    }
}
