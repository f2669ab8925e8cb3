//! Error types for sentinel-core

use thiserror::Error;

use crate::types::OrchestratorStatus;

/// Failures surfaced by the orchestrator's public operations
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Orchestrator not initialized")]
    NotInitialized,

    #[error("Orchestrator already initialized")]
    AlreadyInitialized,

    #[error("Orchestrator unavailable (status: {0})")]
    Unavailable(OrchestratorStatus),

    #[error("Agent type '{0}' is already registered")]
    DuplicateAgent(String),

    #[error("Failed to initialize agent '{agent_type}': {source}")]
    AgentInit {
        agent_type: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Classes of recovered failure, reported through diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Classification,
    AgentNotFound,
    AgentProcessing,
    Persistence,
    SupervisionTick,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classification => write!(f, "classification"),
            Self::AgentNotFound => write!(f, "agent_not_found"),
            Self::AgentProcessing => write!(f, "agent_processing"),
            Self::Persistence => write!(f, "persistence"),
            Self::SupervisionTick => write!(f, "supervision_tick"),
        }
    }
}
