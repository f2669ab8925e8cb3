//! Background health supervision
//!
//! Polls every registered agent on a fixed interval and persists the
//! latest status, health detail, and heartbeat per agent. One agent's
//! failure never stops collection or persistence for the others, and a
//! failed tick never stops the loop.

use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sentinel_store::AgentStore;

use crate::diagnostics::Diagnostics;
use crate::dispatcher::store_call;
use crate::error::FailureKind;
use crate::registry::AgentRegistry;
use crate::types::{AgentHealth, HealthReport};

/// Shortest allowed interval between ticks
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Query every agent's status. Per-agent failures, panics included, are
/// recorded in the report.
pub async fn collect_health(registry: &AgentRegistry) -> HealthReport {
    let mut agents = BTreeMap::new();
    for (agent_type, agent) in registry.iter() {
        let agent = Arc::clone(agent);
        let probe = tokio::spawn(async move { agent.get_status().await });
        let health = match probe.await {
            Ok(Ok(report)) => AgentHealth::from_status(report.status),
            Ok(Err(e)) => {
                warn!(agent_type = %agent_type, "Status check failed: {:#}", e);
                AgentHealth::unreachable(format!("{:#}", e))
            }
            Err(e) => {
                warn!(agent_type = %agent_type, "Status check panicked: {}", e);
                AgentHealth::unreachable(format!("Status check panicked: {}", e))
            }
        };
        agents.insert(agent_type.to_string(), health);
    }
    HealthReport {
        timestamp: Utc::now(),
        agents,
    }
}

pub struct HealthSupervisor {
    registry: Arc<AgentRegistry>,
    store: Arc<dyn AgentStore>,
    interval: Duration,
    store_timeout: Duration,
    diagnostics: Diagnostics,
    cancel: CancellationToken,
}

impl HealthSupervisor {
    /// Intervals below [`MIN_INTERVAL`] are raised to it
    pub fn new(
        registry: Arc<AgentRegistry>,
        store: Arc<dyn AgentStore>,
        interval: Duration,
        store_timeout: Duration,
        diagnostics: Diagnostics,
    ) -> Self {
        if interval < MIN_INTERVAL {
            warn!(
                "Health check interval {:?} is below the minimum, using {:?}",
                interval, MIN_INTERVAL
            );
        }
        Self {
            registry,
            store,
            interval: interval.max(MIN_INTERVAL),
            store_timeout,
            diagnostics,
            cancel: CancellationToken::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One collection and persistence pass
    pub async fn tick(&self) -> HealthReport {
        let report = collect_health(&self.registry).await;

        for (agent_type, health) in &report.agents {
            if let Some(err) = &health.error {
                self.diagnostics
                    .emit(FailureKind::SupervisionTick, agent_type.as_str(), err);
            }

            let detail = json!({
                "status": health.status,
                "healthy": health.healthy,
                "error": health.error,
                "checked_at": report.timestamp.to_rfc3339(),
            });

            let update = self
                .store
                .update_agent_health(agent_type, health.status.as_str(), &detail);
            match store_call(self.store_timeout, update).await {
                Ok(true) => {}
                Ok(false) => debug!("No stored row for agent '{}', heartbeat skipped", agent_type),
                Err(e) => self
                    .diagnostics
                    .emit(FailureKind::Persistence, agent_type.as_str(), e),
            }
        }

        debug!(
            "Health check: {}/{} agents healthy",
            report.healthy_count(),
            report.total_count()
        );
        report
    }

    /// Start the loop. The first tick runs immediately.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Idempotent. The loop exits once any in-flight tick completes.
    pub fn stop(&self) {
        if !self.cancel.is_cancelled() {
            info!("Stopping health supervisor");
            self.cancel.cancel();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            "Health supervisor started: {} agents, every {}s",
            self.registry.len(),
            self.interval.as_secs()
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    // Never cancelled mid-flight: once the loop has exited,
                    // no further heartbeats are written.
                    let this = Arc::clone(&self);
                    if let Err(e) = tokio::spawn(async move { this.tick().await }).await {
                        self.diagnostics.emit(
                            FailureKind::SupervisionTick,
                            "supervisor",
                            format!("Health check task panicked: {}", e),
                        );
                    }
                }
            }
        }

        info!("Health supervisor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::testing::{FailingStore, Fault, MemoryStore, StubAgent};
    use crate::types::AgentStatus;
    use sentinel_store::AgentRecord;

    async fn registry_of(agents: Vec<StubAgent>) -> Arc<AgentRegistry> {
        let mut registry = AgentRegistry::new();
        for agent in agents {
            agent.initialize().await.unwrap();
            registry.register(Arc::new(agent)).unwrap();
        }
        Arc::new(registry)
    }

    async fn seeded_store(types: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::default());
        for t in types {
            store
                .insert_agent(&AgentRecord::new(*t, *t, "initializing"))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_collect_health_isolates_failures() {
        let registry = registry_of(vec![
            StubAgent::new("a"),
            StubAgent::with_fault("b", Fault::Status),
            StubAgent::new("c"),
        ])
        .await;

        let report = collect_health(&registry).await;
        assert_eq!(report.total_count(), 3);
        assert_eq!(report.healthy_count(), 2);
        assert!(report.healthy_count() <= report.total_count());

        let b = &report.agents["b"];
        assert_eq!(b.status, AgentStatus::Error);
        assert!(!b.healthy);
        assert!(b.error.as_deref().unwrap().contains("status probe failed"));
    }

    #[tokio::test]
    async fn test_collect_health_isolates_panics() {
        let registry = registry_of(vec![
            StubAgent::with_fault("a", Fault::StatusPanic),
            StubAgent::new("b"),
        ])
        .await;

        let report = collect_health(&registry).await;
        assert_eq!(report.total_count(), 2);
        assert_eq!(report.healthy_count(), 1);
        assert_eq!(report.agents["a"].status, AgentStatus::Error);
        assert!(report.agents["a"].error.as_deref().unwrap().contains("panicked"));
        assert!(report.agents["b"].healthy);
    }

    #[tokio::test]
    async fn test_tick_persists_healthy_agent_next_to_panicking_one() {
        let registry = registry_of(vec![
            StubAgent::with_fault("a", Fault::StatusPanic),
            StubAgent::new("b"),
        ])
        .await;
        let store = seeded_store(&["a", "b"]).await;
        let (diagnostics, mut rx) = Diagnostics::channel();

        let supervisor = HealthSupervisor::new(
            registry,
            store.clone(),
            Duration::from_secs(60),
            Duration::from_secs(1),
            diagnostics,
        );
        let report = supervisor.tick().await;
        assert_eq!(report.healthy_count(), 1);

        assert_eq!(store.health_updates(), 2);
        let b = store.agent("b").unwrap();
        assert_eq!(b.status, "active");
        assert_eq!(b.health_status["healthy"], true);
        let a = store.agent("a").unwrap();
        assert_eq!(a.status, "error");
        assert_eq!(a.health_status["healthy"], false);

        let d = rx.try_recv().unwrap();
        assert_eq!(d.kind, FailureKind::SupervisionTick);
        assert_eq!(d.context, "a");
    }

    #[tokio::test]
    async fn test_inactive_agent_is_unhealthy() {
        let registry = registry_of(vec![StubAgent::new("a")]).await;
        registry.get("a").unwrap().shutdown().await.unwrap();

        let report = collect_health(&registry).await;
        assert_eq!(report.agents["a"], AgentHealth::from_status(AgentStatus::Inactive));
        assert_eq!(report.healthy_count(), 0);
    }

    #[tokio::test]
    async fn test_tick_persists_each_agent() {
        let registry = registry_of(vec![
            StubAgent::new("a"),
            StubAgent::with_fault("b", Fault::Status),
        ])
        .await;
        let store = seeded_store(&["a", "b"]).await;
        let (diagnostics, mut rx) = Diagnostics::channel();

        let supervisor = HealthSupervisor::new(
            registry,
            store.clone(),
            Duration::from_secs(60),
            Duration::from_secs(1),
            diagnostics,
        );
        supervisor.tick().await;

        let a = store.agent("a").unwrap();
        assert_eq!(a.status, "active");
        assert_eq!(a.health_status["healthy"], true);

        let b = store.agent("b").unwrap();
        assert_eq!(b.status, "error");
        assert_eq!(b.health_status["healthy"], false);

        let d = rx.try_recv().unwrap();
        assert_eq!(d.kind, FailureKind::SupervisionTick);
        assert_eq!(d.context, "b");
    }

    #[tokio::test]
    async fn test_tick_survives_store_failure() {
        let registry = registry_of(vec![StubAgent::new("a"), StubAgent::new("b")]).await;
        let store = Arc::new(FailingStore::default());
        let (diagnostics, mut rx) = Diagnostics::channel();

        let supervisor = HealthSupervisor::new(
            registry,
            store.clone(),
            Duration::from_secs(60),
            Duration::from_secs(1),
            diagnostics,
        );
        let report = supervisor.tick().await;

        assert_eq!(report.healthy_count(), 2);
        // both agents were attempted
        assert_eq!(store.calls(), 2);
        assert_eq!(rx.try_recv().unwrap().kind, FailureKind::Persistence);
        assert_eq!(rx.try_recv().unwrap().kind, FailureKind::Persistence);
    }

    #[tokio::test]
    async fn test_interval_is_clamped() {
        let supervisor = HealthSupervisor::new(
            Arc::new(AgentRegistry::new()),
            Arc::new(MemoryStore::default()),
            Duration::from_millis(10),
            Duration::from_secs(1),
            Diagnostics::new(),
        );
        assert_eq!(supervisor.interval(), MIN_INTERVAL);
    }

    #[tokio::test]
    async fn test_loop_ticks_then_stops() {
        let registry = registry_of(vec![StubAgent::new("a")]).await;
        let store = seeded_store(&["a"]).await;

        let supervisor = Arc::new(HealthSupervisor::new(
            registry,
            store.clone(),
            Duration::from_secs(60),
            Duration::from_secs(1),
            Diagnostics::new(),
        ));
        let handle = supervisor.clone().spawn();

        // first tick fires immediately
        for _ in 0..100 {
            if store.health_updates() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.health_updates(), 1);
        assert_eq!(store.agent("a").unwrap().status, "active");

        supervisor.stop();
        supervisor.stop();
        assert!(supervisor.is_stopped());
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop should exit promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn test_loop_survives_panicking_agent() {
        let registry = registry_of(vec![StubAgent::with_fault("a", Fault::StatusPanic)]).await;
        let (diagnostics, mut rx) = Diagnostics::channel();

        let supervisor = Arc::new(HealthSupervisor::new(
            registry,
            Arc::new(MemoryStore::default()),
            Duration::from_secs(60),
            Duration::from_secs(1),
            diagnostics,
        ));
        let handle = supervisor.clone().spawn();

        let d = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(d.kind, FailureKind::SupervisionTick);
        assert!(d.detail.contains("panicked"));
        assert!(!handle.is_finished());

        supervisor.stop();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_before_spawn() {
        let supervisor = Arc::new(HealthSupervisor::new(
            Arc::new(AgentRegistry::new()),
            Arc::new(MemoryStore::default()),
            Duration::from_secs(60),
            Duration::from_secs(1),
            Diagnostics::new(),
        ));
        supervisor.stop();
        let handle = supervisor.clone().spawn();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
