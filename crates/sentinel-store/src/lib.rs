//! sentinel-store - persistence for the sentinel router
//!
//! This crate provides:
//! - The `AgentStore` trait the router talks to
//! - Agent registration and health snapshot records
//! - The append-only conversation log
//! - A SQLite implementation of the store

pub mod records;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

pub use records::{AgentRecord, ConversationRecord};
pub use sqlite::SqliteStore;

/// Storage operations used by the orchestrator, dispatcher, and supervisor.
///
/// Implementations must be safe to share across tasks. Every method may
/// suspend; callers bound them with a timeout.
#[async_trait]
pub trait AgentStore: Send + Sync {
    /// Whether a registration row exists for this agent type
    async fn agent_exists(&self, agent_type: &str) -> Result<bool>;

    /// Insert a new registration row
    async fn insert_agent(&self, record: &AgentRecord) -> Result<()>;

    /// Update only status and heartbeat. Returns false if no row matched.
    async fn touch_agent(&self, agent_type: &str, status: &str) -> Result<bool>;

    /// Record a health snapshot (status, detail, heartbeat). Returns false if no row matched.
    async fn update_agent_health(
        &self,
        agent_type: &str,
        status: &str,
        health: &JsonValue,
    ) -> Result<bool>;

    /// Mark every registered agent inactive. Returns the number of rows touched.
    async fn mark_all_inactive(&self) -> Result<usize>;

    async fn get_agent(&self, agent_type: &str) -> Result<Option<AgentRecord>>;

    async fn list_agents(&self) -> Result<Vec<AgentRecord>>;

    /// Append one exchange to the conversation log
    async fn log_conversation(&self, record: &ConversationRecord) -> Result<()>;

    /// Most recent `limit` exchanges of a session, oldest first
    async fn session_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>>;
}
