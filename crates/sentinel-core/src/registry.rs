//! Agent registry, keyed by agent type

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::agent::Agent;
use crate::error::RouterError;

/// Write-once handle to the finished registry, for agents that need a
/// read-only view of their siblings but are built before the registry is.
pub type RegistrySlot = Arc<OnceLock<Arc<AgentRegistry>>>;

pub fn registry_slot() -> RegistrySlot {
    Arc::new(OnceLock::new())
}

/// Immutable once shared. Every agent appears under exactly one type.
#[derive(Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: BTreeMap::new(),
        }
    }

    /// Register an agent under its own type. A second agent of the same type is rejected.
    pub fn register(&mut self, agent: Arc<dyn Agent>) -> Result<(), RouterError> {
        let agent_type = agent.agent_type().to_string();
        if self.agents.contains_key(&agent_type) {
            return Err(RouterError::DuplicateAgent(agent_type));
        }
        debug!("Registering agent: {} ({})", agent_type, agent.name());
        self.agents.insert(agent_type, agent);
        Ok(())
    }

    pub fn get(&self, agent_type: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(agent_type).cloned()
    }

    pub fn contains(&self, agent_type: &str) -> bool {
        self.agents.contains_key(agent_type)
    }

    /// Registered types in sorted order
    pub fn agent_types(&self) -> Vec<&str> {
        self.agents.keys().map(|k| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Agent>)> {
        self.agents.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.agent_types())
            .finish()
    }
}
