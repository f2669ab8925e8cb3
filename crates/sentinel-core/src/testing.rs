//! Test doubles shared by the unit tests in this crate

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sentinel_store::{AgentRecord, AgentStore, ConversationRecord};

use crate::agent::{Agent, AgentCore};
use crate::types::{AgentResult, AgentStatusReport, Task};

/// In-memory store that records every call
#[derive(Default)]
pub struct MemoryStore {
    pub agents: Mutex<BTreeMap<String, AgentRecord>>,
    pub conversations: Mutex<Vec<ConversationRecord>>,
    pub health_updates: AtomicUsize,
}

impl MemoryStore {
    pub fn conversations(&self) -> Vec<ConversationRecord> {
        self.conversations.lock().unwrap().clone()
    }

    pub fn agent(&self, agent_type: &str) -> Option<AgentRecord> {
        self.agents.lock().unwrap().get(agent_type).cloned()
    }

    pub fn health_updates(&self) -> usize {
        self.health_updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentStore for MemoryStore {
    async fn agent_exists(&self, agent_type: &str) -> Result<bool> {
        Ok(self.agents.lock().unwrap().contains_key(agent_type))
    }

    async fn insert_agent(&self, record: &AgentRecord) -> Result<()> {
        let mut agents = self.agents.lock().unwrap();
        if agents.contains_key(&record.agent_type) {
            bail!("duplicate agent {}", record.agent_type);
        }
        agents.insert(record.agent_type.clone(), record.clone());
        Ok(())
    }

    async fn touch_agent(&self, agent_type: &str, status: &str) -> Result<bool> {
        let mut agents = self.agents.lock().unwrap();
        Ok(match agents.get_mut(agent_type) {
            Some(record) => {
                record.status = status.to_string();
                record.last_heartbeat = chrono::Utc::now();
                true
            }
            None => false,
        })
    }

    async fn update_agent_health(
        &self,
        agent_type: &str,
        status: &str,
        health: &JsonValue,
    ) -> Result<bool> {
        self.health_updates.fetch_add(1, Ordering::SeqCst);
        let mut agents = self.agents.lock().unwrap();
        Ok(match agents.get_mut(agent_type) {
            Some(record) => {
                record.status = status.to_string();
                record.health_status = health.clone();
                record.last_heartbeat = chrono::Utc::now();
                true
            }
            None => false,
        })
    }

    async fn mark_all_inactive(&self) -> Result<usize> {
        let mut agents = self.agents.lock().unwrap();
        for record in agents.values_mut() {
            record.status = "inactive".to_string();
        }
        Ok(agents.len())
    }

    async fn get_agent(&self, agent_type: &str) -> Result<Option<AgentRecord>> {
        Ok(self.agent(agent_type))
    }

    async fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        Ok(self.agents.lock().unwrap().values().cloned().collect())
    }

    async fn log_conversation(&self, record: &ConversationRecord) -> Result<()> {
        self.conversations.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn session_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>> {
        let all: Vec<_> = self
            .conversations()
            .into_iter()
            .filter(|c| c.session_id == session_id)
            .collect();
        let skip = all.len().saturating_sub(limit);
        Ok(all.into_iter().skip(skip).collect())
    }
}

/// Store whose every call fails, optionally after a delay
#[derive(Default)]
pub struct FailingStore {
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FailingStore {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn fail<T>(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Err(anyhow!("store offline"))
    }
}

#[async_trait]
impl AgentStore for FailingStore {
    async fn agent_exists(&self, _agent_type: &str) -> Result<bool> {
        self.fail().await
    }

    async fn insert_agent(&self, _record: &AgentRecord) -> Result<()> {
        self.fail().await
    }

    async fn touch_agent(&self, _agent_type: &str, _status: &str) -> Result<bool> {
        self.fail().await
    }

    async fn update_agent_health(
        &self,
        _agent_type: &str,
        _status: &str,
        _health: &JsonValue,
    ) -> Result<bool> {
        self.fail().await
    }

    async fn mark_all_inactive(&self) -> Result<usize> {
        self.fail().await
    }

    async fn get_agent(&self, _agent_type: &str) -> Result<Option<AgentRecord>> {
        self.fail().await
    }

    async fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        self.fail().await
    }

    async fn log_conversation(&self, _record: &ConversationRecord) -> Result<()> {
        self.fail().await
    }

    async fn session_history(
        &self,
        _session_id: &str,
        _limit: usize,
    ) -> Result<Vec<ConversationRecord>> {
        self.fail().await
    }
}

/// Delay used by [`Fault::SlowInit`]
pub const SLOW_INIT: Duration = Duration::from_millis(300);

/// How a `StubAgent` misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    /// `process` returns `Err`
    Process,
    /// `process` panics
    ProcessPanic,
    /// `process` returns a result carrying a soft error
    SoftProcess,
    /// `get_status` returns `Err`
    Status,
    /// `get_status` panics
    StatusPanic,
    /// `initialize` returns `Err`
    Init,
    /// `initialize` succeeds after [`SLOW_INIT`]
    SlowInit,
    /// `shutdown` returns `Err`
    Shutdown,
}

/// Configurable agent for exercising the dispatch and supervision paths
pub struct StubAgent {
    core: AgentCore,
    fault: Fault,
    pub processed: AtomicUsize,
}

impl StubAgent {
    pub fn new(agent_type: &str) -> Self {
        Self::with_fault(agent_type, Fault::None)
    }

    pub fn with_fault(agent_type: &str, fault: Fault) -> Self {
        Self {
            core: AgentCore::new(agent_type, format!("{} stub", agent_type)),
            fault,
            processed: AtomicUsize::new(0),
        }
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Agent for StubAgent {
    fn agent_type(&self) -> &str {
        self.core.agent_type()
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    async fn process(&self, task: &Task) -> Result<AgentResult> {
        self.processed.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::Process => {
                self.core
                    .guard(async { Err(anyhow!("lookup exploded")) })
                    .await
            }
            Fault::ProcessPanic => panic!("lookup panicked"),
            Fault::SoftProcess => {
                Ok(AgentResult::failed("Partial answer", "directory unreachable"))
            }
            _ => Ok(AgentResult::reply(format!("handled: {}", task.message))
                .with_data(serde_json::json!({ "task_id": task.task_id }))
                .with_actions(&["Next step"])),
        }
    }

    async fn get_status(&self) -> Result<AgentStatusReport> {
        match self.fault {
            Fault::Status => Err(anyhow!("status probe failed")),
            Fault::StatusPanic => panic!("status probe panicked"),
            _ => Ok(self.core.report()),
        }
    }

    async fn initialize(&self) -> Result<()> {
        match self.fault {
            Fault::Init => bail!("init refused"),
            Fault::SlowInit => tokio::time::sleep(SLOW_INIT).await,
            _ => {}
        }
        self.core.activate();
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.core.deactivate();
        if self.fault == Fault::Shutdown {
            bail!("shutdown hiccup");
        }
        Ok(())
    }
}
