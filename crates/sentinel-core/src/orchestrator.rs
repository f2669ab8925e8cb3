//! Orchestrator - composition root for the router
//!
//! Owns the agent registry, the dispatcher, and the background health
//! supervisor. Lifecycle: `initializing -> operational -> shutting_down ->
//! shutdown`, with `error` reachable from `initializing` when an agent
//! fails to start.

use anyhow::Result;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use sentinel_store::{AgentRecord, AgentStore, ConversationRecord};

use crate::agent::Agent;
use crate::agents::default_roster;
use crate::classifier::{Classifier, RoutingConfig};
use crate::diagnostics::Diagnostics;
use crate::dispatcher::{Dispatcher, store_call};
use crate::error::{FailureKind, RouterError};
use crate::registry::{AgentRegistry, RegistrySlot, registry_slot};
use crate::supervisor::{HealthSupervisor, collect_health};
use crate::types::{AgentStatus, MASTER_AGENT, OrchestratorStatus, Response, SystemStatus};

const MASTER_AGENT_NAME: &str = "Master Agent";

/// Runtime settings for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Time between supervisor ticks
    pub health_interval: Duration,
    /// Deadline for each store call
    pub store_timeout: Duration,
    pub routing: RoutingConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            health_interval: Duration::from_secs(60),
            store_timeout: Duration::from_secs(5),
            routing: RoutingConfig::default(),
        }
    }
}

/// Everything that exists only between a successful initialize and shutdown
struct Running {
    registry: Arc<AgentRegistry>,
    dispatcher: Arc<Dispatcher>,
    supervisor: Arc<HealthSupervisor>,
    supervisor_handle: Mutex<Option<JoinHandle<()>>>,
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    store: Arc<dyn AgentStore>,
    diagnostics: Diagnostics,
    slot: RegistrySlot,
    status: Mutex<OrchestratorStatus>,
    started: Mutex<bool>,
    running: RwLock<Option<Arc<Running>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("Orchestrator mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn AgentStore>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            config,
            store,
            diagnostics,
            slot: registry_slot(),
            status: Mutex::new(OrchestratorStatus::Initializing),
            started: Mutex::new(false),
            running: RwLock::new(None),
        }
    }

    /// Slot filled with the registry once initialization succeeds. Hand it
    /// to agents passed to [`Orchestrator::initialize_with`] that need to
    /// see their siblings.
    pub fn registry_slot(&self) -> RegistrySlot {
        self.slot.clone()
    }

    pub fn status(&self) -> OrchestratorStatus {
        *lock(&self.status)
    }

    fn set_status(&self, status: OrchestratorStatus) {
        let mut current = lock(&self.status);
        debug!("Orchestrator: {} -> {}", *current, status);
        *current = status;
    }

    fn running(&self) -> Option<Arc<Running>> {
        self.running
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn registry(&self) -> Option<Arc<AgentRegistry>> {
        self.running().map(|r| r.registry.clone())
    }

    /// Start the built-in specialists
    pub async fn initialize(&self) -> Result<(), RouterError> {
        let mut registry = AgentRegistry::new();
        for agent in default_roster(self.slot.clone()) {
            registry.register(agent)?;
        }
        self.initialize_with(registry).await
    }

    /// Start a caller-built set of agents
    pub async fn initialize_with(&self, registry: AgentRegistry) -> Result<(), RouterError> {
        {
            let mut started = lock(&self.started);
            match self.status() {
                OrchestratorStatus::Initializing if !*started => *started = true,
                OrchestratorStatus::Initializing | OrchestratorStatus::Operational => {
                    return Err(RouterError::AlreadyInitialized);
                }
                other => return Err(RouterError::Unavailable(other)),
            }
        }

        info!("Initializing orchestrator with {} agents", registry.len());

        let mut started_agents: Vec<Arc<dyn Agent>> = Vec::new();
        for (agent_type, agent) in registry.iter() {
            if let Err(source) = agent.initialize().await {
                error!(agent_type = %agent_type, "Agent failed to initialize: {:#}", source);
                shutdown_agents(&started_agents).await;
                self.set_status_if_initializing(OrchestratorStatus::Error);
                return Err(RouterError::AgentInit {
                    agent_type: agent_type.to_string(),
                    source,
                });
            }
            started_agents.push(Arc::clone(agent));
        }

        let registry = Arc::new(registry);
        if self.slot.set(Arc::clone(&registry)).is_err() {
            warn!("Registry slot was already filled, keeping the existing registry");
        }

        self.register_in_store(&registry).await;

        let dispatcher = Arc::new(Dispatcher::new(
            Classifier::new(&self.config.routing),
            Arc::clone(&registry),
            Arc::clone(&self.store),
            self.config.store_timeout,
            self.diagnostics.clone(),
        ));

        let supervisor = Arc::new(HealthSupervisor::new(
            Arc::clone(&registry),
            Arc::clone(&self.store),
            self.config.health_interval,
            self.config.store_timeout,
            self.diagnostics.clone(),
        ));

        // Published under the status lock; a shutdown that got in first wins.
        let superseded = {
            let mut status = lock(&self.status);
            if *status == OrchestratorStatus::Initializing {
                let handle = Arc::clone(&supervisor).spawn();
                *self
                    .running
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::new(Running {
                    registry: Arc::clone(&registry),
                    dispatcher,
                    supervisor,
                    supervisor_handle: Mutex::new(Some(handle)),
                }));
                debug!("Orchestrator: {} -> {}", *status, OrchestratorStatus::Operational);
                *status = OrchestratorStatus::Operational;
                None
            } else {
                Some(*status)
            }
        };

        if let Some(status) = superseded {
            warn!("Orchestrator became {} during initialization, rolling back", status);
            shutdown_agents(&started_agents).await;
            match store_call(self.config.store_timeout, self.store.mark_all_inactive()).await {
                Ok(count) => debug!("Marked {} stored agents inactive", count),
                Err(e) => self.diagnostics.emit(FailureKind::Persistence, "initialize", e),
            }
            return Err(RouterError::Unavailable(status));
        }

        info!("Orchestrator operational");
        Ok(())
    }

    /// Only an in-flight initialization may leave `initializing`
    fn set_status_if_initializing(&self, next: OrchestratorStatus) {
        let mut current = lock(&self.status);
        if *current == OrchestratorStatus::Initializing {
            debug!("Orchestrator: {} -> {}", *current, next);
            *current = next;
        }
    }

    /// Upsert one store row per agent plus the master row. Existing rows
    /// only get their status and heartbeat refreshed.
    async fn register_in_store(&self, registry: &AgentRegistry) {
        let mut entries: Vec<(&str, &str)> = vec![(MASTER_AGENT, MASTER_AGENT_NAME)];
        entries.extend(registry.iter().map(|(agent_type, agent)| (agent_type, agent.name())));

        let timeout = self.config.store_timeout;
        let active = AgentStatus::Active.as_str();

        for (agent_type, name) in entries {
            let outcome = async {
                if store_call(timeout, self.store.agent_exists(agent_type)).await? {
                    store_call(timeout, self.store.touch_agent(agent_type, active)).await?;
                    debug!("Refreshed stored agent '{}'", agent_type);
                } else {
                    let record = AgentRecord::new(agent_type, name, active);
                    store_call(timeout, self.store.insert_agent(&record)).await?;
                    debug!("Registered agent '{}' in store", agent_type);
                }
                anyhow::Ok(())
            }
            .await;

            if let Err(e) = outcome {
                self.diagnostics.emit(FailureKind::Persistence, agent_type, e);
            }
        }
    }

    /// Route one message. Fails only when the orchestrator is not operational.
    pub async fn process_message(
        &self,
        message: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Response, RouterError> {
        match self.status() {
            OrchestratorStatus::Operational => {}
            OrchestratorStatus::Initializing => return Err(RouterError::NotInitialized),
            other => return Err(RouterError::Unavailable(other)),
        }
        let running = self.running().ok_or(RouterError::NotInitialized)?;
        Ok(running.dispatcher.dispatch(message, user_id, session_id).await)
    }

    /// Orchestrator status plus a live health check of every agent
    pub async fn get_status(&self) -> SystemStatus {
        let agents = match self.running() {
            Some(running) => collect_health(&running.registry).await.agents,
            None => Default::default(),
        };
        SystemStatus {
            orchestrator: self.status(),
            agents,
        }
    }

    /// Session log, oldest first
    pub async fn history(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationRecord>> {
        store_call(
            self.config.store_timeout,
            self.store.session_history(session_id, limit),
        )
        .await
    }

    /// Stop supervision, shut every agent down, and mark all stored agents
    /// inactive. Safe to call more than once.
    pub async fn shutdown(&self) {
        {
            let mut status = lock(&self.status);
            match *status {
                OrchestratorStatus::ShuttingDown | OrchestratorStatus::Shutdown => {
                    debug!("Shutdown already {}", *status);
                    return;
                }
                _ => *status = OrchestratorStatus::ShuttingDown,
            }
        }
        info!("Shutting down orchestrator");

        if let Some(running) = self.running() {
            running.supervisor.stop();
            let handle = lock(&running.supervisor_handle).take();
            if let Some(handle) = handle
                && let Err(e) = handle.await
            {
                error!("Health supervisor task panicked: {}", e);
            }

            for (agent_type, agent) in running.registry.iter() {
                match agent.shutdown().await {
                    Ok(()) => debug!("Agent '{}' shut down", agent_type),
                    Err(e) => warn!(agent_type = %agent_type, "Error shutting down agent: {:#}", e),
                }
            }

            match store_call(self.config.store_timeout, self.store.mark_all_inactive()).await {
                Ok(count) => debug!("Marked {} stored agents inactive", count),
                Err(e) => self.diagnostics.emit(FailureKind::Persistence, "shutdown", e),
            }
        }

        self.set_status(OrchestratorStatus::Shutdown);
        info!("Orchestrator shut down");
    }
}

async fn shutdown_agents(agents: &[Arc<dyn Agent>]) {
    for agent in agents {
        if let Err(e) = agent.shutdown().await {
            warn!(agent_type = %agent.agent_type(), "Rollback shutdown failed: {:#}", e);
        }
    }
}
