//! Component factory registry for configuration-driven containers.
//!
//! The registry maps kind tags to constructors, so a container can be
//! described declaratively (kind + name + attributes) and materialized per
//! case.
//!
//! # Example
//!
//! ```
//! use hestia::registry::ComponentRegistry;
//! use hestia::component::Component;
//! use hestia::port::PortDirection;
//! use std::collections::HashMap;
//!
//! let mut registry = ComponentRegistry::new();
//! registry.register("blinker", |name, _attrs| {
//!     Ok(Component::new(name, "blinker").with_port("led", PortDirection::Write))
//! });
//!
//! let blinker = registry.create("blinker", "b0", &HashMap::new()).unwrap();
//! assert_eq!(blinker.kind(), "blinker");
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::component::Component;
use crate::components::{self, kinds};
use crate::error::GraphError;

/// Type alias for component factory functions.
///
/// Receives the instance name and free-form construction attributes.
pub type ComponentFactory =
    Arc<dyn Fn(&str, &HashMap<String, String>) -> Result<Component, GraphError> + Send + Sync>;

/// Attribute naming the memory a component is attached to.
pub const ATTR_MEMORY_NAME: &str = "memory_name";
/// Attribute naming the clock domain of timed internal stages.
pub const ATTR_DOMAIN: &str = "domain";

const DEFAULT_MEMORY_NAME: &str = "mem";
const DEFAULT_DOMAIN: &str = "clk";

/// A registry of component factories keyed by kind tag.
#[derive(Default, Clone)]
pub struct ComponentRegistry {
    factories: HashMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for `kind`, replacing any previous one.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&str, &HashMap<String, String>) -> Result<Component, GraphError> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    /// Creates a component of `kind` named `name`.
    ///
    /// # Errors
    /// [`GraphError::UnknownKind`] if no factory is registered for `kind`,
    /// or whatever the factory itself reports.
    pub fn create(
        &self,
        kind: &str,
        name: &str,
        attrs: &HashMap<String, String>,
    ) -> Result<Component, GraphError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| GraphError::UnknownKind(kind.to_string()))?;
        factory(name, attrs)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered kind tags, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn unregister(&mut self, kind: &str) -> bool {
        self.factories.remove(kind).is_some()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

fn attr<'a>(attrs: &'a HashMap<String, String>, key: &str, default: &'a str) -> &'a str {
    attrs.get(key).map(String::as_str).unwrap_or(default)
}

/// Creates a registry with every component of the built-in library.
///
/// Processors and memories read the `memory_name` attribute (default
/// `mem`); staged processors also read `domain` (default `clk`).
pub fn create_default_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();

    registry.register(kinds::NUMBER_PRODUCER, |name, _| Ok(components::producer(name)));
    registry.register(kinds::NUMBER_CONSUMER, |name, _| Ok(components::consumer(name)));

    registry.register(kinds::FUNCTIONAL_PROCESSOR, |name, attrs| {
        Ok(components::functional_processor(
            name,
            attr(attrs, ATTR_MEMORY_NAME, DEFAULT_MEMORY_NAME),
        ))
    });
    registry.register(kinds::MEMORY_BOUND_PROCESSOR, |name, attrs| {
        components::memory_bound_processor(name, attr(attrs, ATTR_MEMORY_NAME, DEFAULT_MEMORY_NAME))
    });
    registry.register(kinds::PERFORMANT_PROCESSOR, |name, attrs| {
        components::performant_processor(
            name,
            attr(attrs, ATTR_DOMAIN, DEFAULT_DOMAIN),
            attr(attrs, ATTR_MEMORY_NAME, DEFAULT_MEMORY_NAME),
        )
    });
    registry.register(kinds::PIPELINED_PROCESSOR, |name, attrs| {
        components::pipelined_processor(
            name,
            attr(attrs, ATTR_DOMAIN, DEFAULT_DOMAIN),
            attr(attrs, ATTR_MEMORY_NAME, DEFAULT_MEMORY_NAME),
        )
    });
    registry.register(kinds::MEMORY, |name, attrs| {
        Ok(components::memory(name, attr(attrs, ATTR_MEMORY_NAME, DEFAULT_MEMORY_NAME)))
    });
    registry.register(kinds::SIMPLE_DRIVER, |name, attrs| {
        Ok(components::simple_application(
            name,
            attr(attrs, ATTR_MEMORY_NAME, DEFAULT_MEMORY_NAME),
        ))
    });
    registry.register(kinds::LOOP_DRIVER, |name, attrs| {
        Ok(components::loop_application(
            name,
            attr(attrs, ATTR_MEMORY_NAME, DEFAULT_MEMORY_NAME),
        ))
    });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortDirection;

    #[test]
    fn test_registry_basic() {
        let mut registry = ComponentRegistry::new();
        assert!(registry.is_empty());

        registry.register("test", |name, _| Ok(Component::new(name, "test")));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("test"));
        assert!(registry.unregister("test"));
        assert!(!registry.unregister("test"));
    }

    #[test]
    fn test_unknown_kind() {
        let registry = ComponentRegistry::new();
        let err = registry.create("gpu", "g0", &HashMap::new()).unwrap_err();
        assert_eq!(err, GraphError::UnknownKind("gpu".into()));
    }

    #[test]
    fn test_default_registry() {
        let registry = create_default_registry();
        assert_eq!(registry.len(), 9);
        assert!(registry.contains(kinds::NUMBER_PRODUCER));
        assert!(registry.contains(kinds::LOOP_DRIVER));

        let kinds = registry.kinds();
        let mut sorted = kinds.clone();
        sorted.sort_unstable();
        assert_eq!(kinds, sorted);
    }

    #[test]
    fn test_default_registry_attrs() {
        let registry = create_default_registry();
        let mut attrs = HashMap::new();
        attrs.insert(ATTR_DOMAIN.to_string(), "core_clk".to_string());
        attrs.insert(ATTR_MEMORY_NAME.to_string(), "dram".to_string());

        let cpu = registry.create(kinds::PIPELINED_PROCESSOR, "cpu", &attrs).unwrap();
        assert_eq!(cpu.name(), "cpu");
        assert_eq!(
            cpu.internal_connection("decoder").unwrap().params.clock_domain.as_deref(),
            Some("core_clk")
        );
        assert_eq!(cpu.parameter("memory_name").unwrap().as_str(), Some("dram"));
        assert_eq!(cpu.port("doorbell").unwrap().direction, PortDirection::Read);
    }
}
