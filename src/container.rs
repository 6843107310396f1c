//! Containers: top-level assemblies of components and connections.
//!
//! A container is the unit handed to the engine. Every mutation checks its
//! preconditions before touching any state, so a rejected call leaves the
//! container exactly as it was.
//!
//! # Example
//!
//! ```
//! use hestia::container::Container;
//! use hestia::components;
//! use hestia::connection::ConnectionParameters;
//!
//! let mut bench = Container::new("bench");
//! bench.add_component(components::producer("producer")).unwrap();
//! bench.add_component(components::consumer("consumer")).unwrap();
//! bench
//!     .connect("producer_consumer", "producer.out", "consumer.in", ConnectionParameters::new())
//!     .unwrap();
//!
//! assert!(bench.validate().is_valid());
//! ```

use serde::Serialize;
use std::collections::BTreeMap;

use crate::component::Component;
use crate::connection::{Connection, ConnectionParameters, InternalConnection};
use crate::error::GraphError;
use crate::port::{BindingRole, Port, PortRef};
use crate::validator::{self, ValidationReport};

/// A top-level assembly of components and the connections between them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Container {
    name: String,
    components: BTreeMap<String, Component>,
    connections: BTreeMap<String, Connection>,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: BTreeMap::new(),
            connections: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a component. Component names are unique within a container.
    ///
    /// The component name and its port names must be usable in a
    /// `component.port` reference, otherwise [`GraphError::InvalidName`].
    pub fn add_component(&mut self, component: Component) -> Result<(), GraphError> {
        check_name("component", component.name())?;
        for port in component.ports() {
            check_name("port", &port.name)?;
        }
        if self.components.contains_key(component.name()) {
            return Err(GraphError::DuplicateName {
                kind: "component",
                name: component.name().to_string(),
            });
        }
        self.components.insert(component.name().to_string(), component);
        Ok(())
    }

    /// Adds a connection from `src` to `dst`.
    ///
    /// # Errors
    /// - [`GraphError::DirectionMismatch`] if `src` is not write-capable or
    ///   `dst` is not read-capable
    /// - [`GraphError::DuplicateBinding`] if a scalar endpoint is already
    ///   bound by another connection in the same role
    /// - [`GraphError::InvalidConnectionParameters`] for out-of-range params
    pub fn add_connection(
        &mut self,
        name: impl Into<String>,
        src: PortRef,
        dst: PortRef,
        params: ConnectionParameters,
    ) -> Result<(), GraphError> {
        let name = name.into();
        if self.connections.contains_key(&name) {
            return Err(GraphError::DuplicateName {
                kind: "connection",
                name,
            });
        }
        params.validate_for(&name)?;

        let src_port = self.resolve(&src)?;
        let dst_port = self.resolve(&dst)?;
        if !src_port.direction.is_write() || !dst_port.direction.is_read() {
            return Err(GraphError::DirectionMismatch {
                src_direction: src_port.direction,
                dst_direction: dst_port.direction,
                src,
                dst,
            });
        }
        if !src_port.direction.is_array() && self.bindings(&src, BindingRole::Source) > 0 {
            return Err(GraphError::DuplicateBinding {
                port: src,
                role: BindingRole::Source,
            });
        }
        if !dst_port.direction.is_array() && self.bindings(&dst, BindingRole::Destination) > 0 {
            return Err(GraphError::DuplicateBinding {
                port: dst,
                role: BindingRole::Destination,
            });
        }

        tracing::trace!(container = %self.name, connection = %name, %src, %dst, "connection added");
        self.connections
            .insert(name.clone(), Connection::new(name, src, dst, params));
        Ok(())
    }

    /// Adds a connection using `component.port` endpoint strings.
    pub fn connect(
        &mut self,
        name: impl Into<String>,
        src: &str,
        dst: &str,
        params: ConnectionParameters,
    ) -> Result<(), GraphError> {
        let src = src.parse()?;
        let dst = dst.parse()?;
        self.add_connection(name, src, dst, params)
    }

    /// Adds an internal connection to the named component.
    pub fn add_internal_connection(
        &mut self,
        component: &str,
        connection: InternalConnection,
    ) -> Result<(), GraphError> {
        self.components
            .get_mut(component)
            .ok_or_else(|| GraphError::UnknownComponent(component.to_string()))?
            .add_internal_connection(connection)
    }

    /// Assigns a component parameter from text.
    pub fn set_parameter(&mut self, component: &str, name: &str, value: impl AsRef<str>) -> Result<(), GraphError> {
        self.components
            .get_mut(component)
            .ok_or_else(|| GraphError::UnknownComponent(component.to_string()))?
            .set_parameter(name, value)
    }

    /// Replaces the timing parameters of an existing connection.
    pub fn set_connection_params(&mut self, name: &str, params: ConnectionParameters) -> Result<(), GraphError> {
        params.validate_for(name)?;
        let connection = self
            .connections
            .get_mut(name)
            .ok_or_else(|| GraphError::UnknownConnection(name.to_string()))?;
        connection.params = params;
        Ok(())
    }

    /// Checks that every scalar port is bound exactly once.
    pub fn validate(&self) -> ValidationReport {
        validator::validate(self)
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    /// Mutable access to a component, for parameter helpers.
    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.get_mut(name)
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn connection(&self, name: &str) -> Option<&Connection> {
        self.connections.get(name)
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Looks up the port addressed by `port_ref`.
    pub fn port(&self, port_ref: &PortRef) -> Option<&Port> {
        self.components
            .get(&port_ref.component)
            .and_then(|c| c.port(&port_ref.port))
    }

    fn resolve(&self, port_ref: &PortRef) -> Result<&Port, GraphError> {
        let component = self
            .components
            .get(&port_ref.component)
            .ok_or_else(|| GraphError::UnknownComponent(port_ref.component.clone()))?;
        component
            .port(&port_ref.port)
            .ok_or_else(|| GraphError::UnknownPort(port_ref.clone()))
    }

    /// Number of connections using `port` in `role`.
    pub(crate) fn bindings(&self, port: &PortRef, role: BindingRole) -> usize {
        self.connections
            .values()
            .filter(|c| match role {
                BindingRole::Source => &c.src == port,
                BindingRole::Destination => &c.dst == port,
            })
            .count()
    }
}

fn check_name(kind: &'static str, name: &str) -> Result<(), GraphError> {
    if name.is_empty() || name.contains(|c: char| c == '.' || c.is_whitespace()) {
        return Err(GraphError::InvalidName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}
