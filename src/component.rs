//! Components: named units exposing ports and parameters.
//!
//! A component owns its ports, parameters and internal connections. The
//! kind tag names the engine model that implements it (for example
//! `number_producer` or `pipelined_processor`).

use serde::Serialize;
use std::collections::BTreeMap;

use crate::connection::InternalConnection;
use crate::error::GraphError;
use crate::parameter::Parameter;
use crate::port::{Port, PortDirection, PortRef};

/// A named unit of the entity graph.
///
/// # Example
///
/// ```
/// use hestia::component::Component;
/// use hestia::parameter::Parameter;
/// use hestia::port::PortDirection;
///
/// let mut producer = Component::new("producer", "number_producer");
/// producer.add_port("out", PortDirection::Write).unwrap();
/// producer.add_parameter(Parameter::uint("num_transactions", 100)).unwrap();
///
/// producer.set_parameter("num_transactions", "20").unwrap();
/// assert!(producer.set_parameter("num_transactions", "-3").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Component {
    name: String,
    kind: String,
    ports: BTreeMap<String, Port>,
    parameters: BTreeMap<String, Parameter>,
    internal_connections: BTreeMap<String, InternalConnection>,
}

impl Component {
    /// Creates a component with no ports or parameters.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            ports: BTreeMap::new(),
            parameters: BTreeMap::new(),
            internal_connections: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the kind tag naming the engine model.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Builder form of [`add_port`](Self::add_port), for fixed declarations.
    ///
    /// # Panics
    /// If the component already has a port of the same name. Use
    /// [`add_port`](Self::add_port) for names that are not known statically.
    pub fn with_port(mut self, name: impl Into<String>, direction: PortDirection) -> Self {
        let name = name.into();
        assert!(
            !self.ports.contains_key(&name),
            "component `{}` declares port `{}` twice",
            self.name,
            name
        );
        let port = Port::new(name.clone(), direction, self.name.clone());
        self.ports.insert(name, port);
        self
    }

    /// Builder form of [`add_parameter`](Self::add_parameter), for fixed declarations.
    ///
    /// # Panics
    /// If the component already has a parameter of the same name.
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        assert!(
            !self.parameters.contains_key(&parameter.name),
            "component `{}` declares parameter `{}` twice",
            self.name,
            parameter.name
        );
        self.parameters.insert(parameter.name.clone(), parameter);
        self
    }

    /// Adds a port. Port names are unique within a component.
    pub fn add_port(&mut self, name: impl Into<String>, direction: PortDirection) -> Result<&Port, GraphError> {
        let name = name.into();
        if self.ports.contains_key(&name) {
            return Err(GraphError::DuplicateName { kind: "port", name });
        }
        let port = Port::new(name.clone(), direction, self.name.clone());
        Ok(self.ports.entry(name).or_insert(port))
    }

    /// Adds a parameter with its default value.
    pub fn add_parameter(&mut self, parameter: Parameter) -> Result<(), GraphError> {
        if self.parameters.contains_key(&parameter.name) {
            return Err(GraphError::DuplicateName {
                kind: "parameter",
                name: parameter.name,
            });
        }
        self.parameters.insert(parameter.name.clone(), parameter);
        Ok(())
    }

    /// Assigns a parameter from text, checked against its declared type.
    pub fn set_parameter(&mut self, name: &str, value: impl AsRef<str>) -> Result<(), GraphError> {
        let parameter = self
            .parameters
            .get_mut(name)
            .ok_or_else(|| GraphError::UnknownParameter {
                component: self.name.clone(),
                name: name.to_string(),
            })?;
        parameter.set(value)
    }

    /// Adds an internal connection owned by this component.
    ///
    /// The connection's owner is set to this component. Every port it
    /// consumes must exist here, and its parameters must be in range.
    pub fn add_internal_connection(&mut self, mut connection: InternalConnection) -> Result<(), GraphError> {
        if self.internal_connections.contains_key(&connection.name) {
            return Err(GraphError::DuplicateName {
                kind: "internal connection",
                name: connection.name,
            });
        }
        connection.params.validate_for(&connection.name)?;
        if let Some(missing) = connection.ports.iter().find(|p| !self.ports.contains_key(*p)) {
            return Err(GraphError::UnknownPort(PortRef::new(&self.name, missing)));
        }
        connection.owner = self.name.clone();
        self.internal_connections.insert(connection.name.clone(), connection);
        Ok(())
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.get(name)
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    pub fn internal_connection(&self, name: &str) -> Option<&InternalConnection> {
        self.internal_connections.get(name)
    }

    pub fn internal_connections(&self) -> impl Iterator<Item = &InternalConnection> {
        self.internal_connections.values()
    }

    /// Number of internal connections consuming `port`.
    pub(crate) fn internal_bindings(&self, port: &str) -> usize {
        self.internal_connections
            .values()
            .map(|ic| ic.ports.iter().filter(|p| p.as_str() == port).count())
            .sum()
    }
}
