//! sentinel-core - routing and supervision for sentinel agents
//!
//! This crate provides:
//! - The `Agent` contract and the built-in specialist agents
//! - A keyword classifier that picks one agent per message
//! - A dispatcher that invokes the agent and logs the exchange
//! - A background supervisor that persists agent health
//! - The orchestrator that wires all of it together

pub mod agent;
pub mod agents;
pub mod classifier;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod orchestrator;
pub mod registry;
pub mod supervisor;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use agent::{Agent, AgentCore};
pub use classifier::{Classifier, RouteRule, RoutingConfig};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use dispatcher::Dispatcher;
pub use error::{FailureKind, RouterError};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use registry::{AgentRegistry, RegistrySlot, registry_slot};
pub use supervisor::{HealthSupervisor, collect_health};
pub use types::{
    AgentHealth, AgentResult, AgentStatus, AgentStatusReport, HealthReport, OrchestratorStatus,
    Response, RoutingDecision, SystemStatus, Task,
};
