//! Agent registry.
//!
//! Maps agent type tags to factories. Registration usually happens once at
//! startup, but the map sits behind a read/write lock so registration may
//! race with concurrent lookups.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use sagaflow_protocols::{Agent, AgentFactory, RegistryError};

/// Registry resolving `(type, instance id)` pairs into agents.
pub struct AgentRegistry {
    factories: RwLock<HashMap<String, AgentFactory>>,
}

impl AgentRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Register a factory for `agent_type`.
    ///
    /// Re-registering a type replaces the previous factory.
    pub fn register<F>(&self, agent_type: impl Into<String>, factory: F)
    where
        F: Fn(&str) -> Arc<dyn Agent> + Send + Sync + 'static,
    {
        self.register_factory(agent_type, Arc::new(factory));
    }

    pub fn register_factory(&self, agent_type: impl Into<String>, factory: AgentFactory) {
        let agent_type = agent_type.into();
        debug!("Registering agent type: {}", agent_type);
        self.factories.write().insert(agent_type, factory);
    }

    /// Remove a type. Returns whether it was registered.
    pub fn unregister(&self, agent_type: &str) -> bool {
        self.factories.write().remove(agent_type).is_some()
    }

    /// Build an agent of `agent_type` with the given instance id.
    pub fn get(&self, agent_type: &str, id: &str) -> Result<Arc<dyn Agent>, RegistryError> {
        let factory = self
            .factories
            .read()
            .get(agent_type)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(agent_type.to_string()))?;
        Ok(factory(id))
    }

    /// All registered type tags, sorted.
    pub fn list_types(&self) -> Vec<String> {
        let mut types: Vec<_> = self.factories.read().keys().cloned().collect();
        types.sort();
        types
    }

    pub fn contains(&self, agent_type: &str) -> bool {
        self.factories.read().contains_key(agent_type)
    }

    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("types", &self.list_types())
            .finish()
    }
}
