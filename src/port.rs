//! Ports and port references.
//!
//! A port is a typed connection point on a component. Direction decides the
//! role a port may take in a connection: write-capable ports are sources,
//! read-capable ports are destinations. Array ports may take part in any
//! number of connections; scalar ports in at most one per role.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GraphError;

/// Direction (and arity) of a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Read,
    Write,
    ReadArray,
    WriteArray,
}

impl PortDirection {
    /// Returns true if the port can be a connection destination.
    #[inline]
    pub fn is_read(&self) -> bool {
        matches!(self, PortDirection::Read | PortDirection::ReadArray)
    }

    /// Returns true if the port can be a connection source.
    #[inline]
    pub fn is_write(&self) -> bool {
        matches!(self, PortDirection::Write | PortDirection::WriteArray)
    }

    /// Returns true if the port may fan in or out to several connections.
    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, PortDirection::ReadArray | PortDirection::WriteArray)
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PortDirection::Read => "READ",
            PortDirection::Write => "WRITE",
            PortDirection::ReadArray => "READ_ARRAY",
            PortDirection::WriteArray => "WRITE_ARRAY",
        };
        f.write_str(s)
    }
}

/// The role a port plays in a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingRole {
    Source,
    Destination,
}

impl fmt::Display for BindingRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingRole::Source => f.write_str("source"),
            BindingRole::Destination => f.write_str("destination"),
        }
    }
}

/// A connection point on a component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port name, unique within the owning component
    pub name: String,
    /// Direction and arity
    pub direction: PortDirection,
    /// Name of the owning component (non-owning back reference)
    pub owner: String,
}

impl Port {
    /// Creates a new port owned by `owner`.
    pub fn new(name: impl Into<String>, direction: PortDirection, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction,
            owner: owner.into(),
        }
    }

    /// Returns a reference to this port usable as a connection endpoint.
    pub fn to_ref(&self) -> PortRef {
        PortRef::new(&self.owner, &self.name)
    }
}

/// Addresses a port by component and port name, written `component.port`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortRef {
    pub component: String,
    pub port: String,
}

impl PortRef {
    pub fn new(component: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.port)
    }
}

impl FromStr for PortRef {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((component, port))
                if !component.is_empty() && !port.is_empty() && !port.contains('.') =>
            {
                Ok(PortRef::new(component, port))
            }
            _ => Err(GraphError::MalformedPortRef(s.to_string())),
        }
    }
}
