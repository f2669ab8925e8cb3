//! Shared types for sentinel-core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Identifier the dispatcher answers under when it degrades a request itself
pub const MASTER_AGENT: &str = "master";

/// `agent_used` value when no agent was resolved for a message
pub const NO_AGENT: &str = "none";

/// Lifecycle state of a single agent
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Initializing,
    Active,
    Inactive,
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of the orchestrator itself
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorStatus {
    Initializing,
    Operational,
    ShuttingDown,
    Shutdown,
    Error,
}

impl std::fmt::Display for OrchestratorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Operational => write!(f, "operational"),
            Self::ShuttingDown => write!(f, "shutting_down"),
            Self::Shutdown => write!(f, "shutdown"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A single unit of work handed to exactly one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub message: String,
    pub user_id: String,
    pub session_id: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl Task {
    /// Build a task with a fresh id of the form `<agent_type>_<uuid>`
    pub fn new(
        agent_type: &str,
        message: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        context: Map<String, Value>,
    ) -> Self {
        Self {
            task_id: format!("{}_{}", agent_type, Uuid::new_v4().simple()),
            message: message.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            context,
        }
    }
}

/// What an agent hands back from `process`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    /// Soft failure the agent recovered from but wants surfaced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResult {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn failed(text: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_actions(mut self, actions: &[&str]) -> Self {
        self.suggested_actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }
}

/// Final answer returned to the boundary layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub response: String,
    pub agent_used: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// No registered agent matched the routing decision
    pub fn unrouted() -> Self {
        Self {
            response: "I apologize, but I couldn't determine which specialist to route your request to. \
                       Could you please rephrase your question?"
                .to_string(),
            agent_used: NO_AGENT.to_string(),
            confidence: 0.0,
            data: None,
            suggested_actions: Vec::new(),
            error: None,
        }
    }

    /// Something failed inside the dispatch path
    pub fn degraded(error: &anyhow::Error) -> Self {
        let detail = format!("{:#}", error);
        Self {
            response: format!("I encountered an error processing your request: {}", detail),
            agent_used: MASTER_AGENT.to_string(),
            confidence: 0.0,
            data: None,
            suggested_actions: Vec::new(),
            error: Some(detail),
        }
    }
}

/// Classifier output: where a message goes and how sure we are
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingDecision {
    pub agent_type: String,
    pub confidence: f64,
    pub matched_context: Map<String, Value>,
}

/// Output of `Agent::get_status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatusReport {
    pub agent_type: String,
    pub agent_name: String,
    pub agent_id: String,
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
}

/// Health of one agent as seen by the supervisor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentHealth {
    pub status: AgentStatus,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentHealth {
    pub fn from_status(status: AgentStatus) -> Self {
        Self {
            status,
            healthy: status == AgentStatus::Active,
            error: None,
        }
    }

    /// The status lookup itself failed
    pub fn unreachable(error: impl Into<String>) -> Self {
        Self {
            status: AgentStatus::Error,
            healthy: false,
            error: Some(error.into()),
        }
    }
}

/// One supervisor tick's aggregate snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub timestamp: DateTime<Utc>,
    pub agents: BTreeMap<String, AgentHealth>,
}

impl HealthReport {
    pub fn healthy_count(&self) -> usize {
        self.agents.values().filter(|a| a.healthy).count()
    }

    pub fn total_count(&self) -> usize {
        self.agents.len()
    }
}

/// Output of `Orchestrator::get_status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub orchestrator: OrchestratorStatus,
    pub agents: BTreeMap<String, AgentHealth>,
}
