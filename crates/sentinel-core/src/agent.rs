//! Agent contract and the lifecycle state every agent shares

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::types::{AgentResult, AgentStatus, AgentStatusReport, Task};

/// A specialist that handles one class of request
#[async_trait]
pub trait Agent: Send + Sync {
    /// Registry key, e.g. `individual`
    fn agent_type(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    async fn process(&self, task: &Task) -> Result<AgentResult>;

    async fn get_status(&self) -> Result<AgentStatusReport>;

    /// `initializing -> active`
    async fn initialize(&self) -> Result<()>;

    /// `active -> inactive`
    async fn shutdown(&self) -> Result<()>;
}

/// Identity and status bookkeeping embedded by each specialist.
///
/// The status mutex is only held for the duration of a read or a write,
/// never across an await.
#[derive(Debug)]
pub struct AgentCore {
    agent_id: String,
    agent_type: String,
    name: String,
    status: Mutex<AgentStatus>,
    created_at: DateTime<Utc>,
}

impl AgentCore {
    pub fn new(agent_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            agent_id: Uuid::new_v4().to_string(),
            agent_type: agent_type.into(),
            name: name.into(),
            status: Mutex::new(AgentStatus::Initializing),
            created_at: Utc::now(),
        }
    }

    pub fn agent_type(&self) -> &str {
        &self.agent_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn status(&self) -> AgentStatus {
        *self.status.lock().unwrap_or_else(|poisoned| {
            warn!("Agent status mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn set_status(&self, status: AgentStatus) {
        let mut guard = self.status.lock().unwrap_or_else(|poisoned| {
            warn!("Agent status mutex was poisoned, recovering");
            poisoned.into_inner()
        });
        if *guard != status {
            debug!("Agent '{}': {} -> {}", self.agent_type, *guard, status);
            *guard = status;
        }
    }

    pub fn report(&self) -> AgentStatusReport {
        AgentStatusReport {
            agent_type: self.agent_type.clone(),
            agent_name: self.name.clone(),
            agent_id: self.agent_id.clone(),
            status: self.status(),
            created_at: self.created_at,
        }
    }

    pub fn activate(&self) {
        self.set_status(AgentStatus::Active);
    }

    pub fn deactivate(&self) {
        self.set_status(AgentStatus::Inactive);
    }

    /// Run one unit of the agent's own work. A failure moves the agent to
    /// `error` before the error is handed back.
    pub async fn guard<F>(&self, work: F) -> Result<AgentResult>
    where
        F: Future<Output = Result<AgentResult>> + Send,
    {
        match work.await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(agent_type = %self.agent_type, "Agent operation failed: {:#}", e);
                self.set_status(AgentStatus::Error);
                Err(e)
            }
        }
    }
}
