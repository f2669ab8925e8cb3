//! Single-message dispatch: classify, resolve, invoke, log

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, json};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use sentinel_store::{AgentStore, ConversationRecord};

use crate::agent::Agent;
use crate::classifier::Classifier;
use crate::diagnostics::Diagnostics;
use crate::error::FailureKind;
use crate::registry::AgentRegistry;
use crate::types::{AgentResult, Response, RoutingDecision, Task};

/// Reply text used when an agent returns no text of its own
pub const DEFAULT_REPLY: &str = "I've processed your request.";

/// Run a store operation under a deadline. Elapsing counts as a failure.
pub(crate) async fn store_call<T, F>(limit: Duration, op: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, op)
        .await
        .map_err(|_| anyhow!("store call timed out after {:?}", limit))?
}

pub struct Dispatcher {
    classifier: Classifier,
    registry: Arc<AgentRegistry>,
    store: Arc<dyn AgentStore>,
    store_timeout: Duration,
    diagnostics: Diagnostics,
}

impl Dispatcher {
    pub fn new(
        classifier: Classifier,
        registry: Arc<AgentRegistry>,
        store: Arc<dyn AgentStore>,
        store_timeout: Duration,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            classifier,
            registry,
            store,
            store_timeout,
            diagnostics,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Route one message to one agent. Never fails: every failure below
    /// this point becomes a well-formed response.
    pub async fn dispatch(&self, message: &str, user_id: &str, session_id: &str) -> Response {
        let decision = self.classifier.classify(message);

        let Some(agent) = self.registry.get(&decision.agent_type) else {
            self.diagnostics.emit(
                FailureKind::AgentNotFound,
                decision.agent_type.as_str(),
                format!("No agent registered for type '{}'", decision.agent_type),
            );
            return Response::unrouted();
        };

        let task = Task::new(
            &decision.agent_type,
            message,
            user_id,
            session_id,
            decision.matched_context.clone(),
        );
        debug!(
            task_id = %task.task_id,
            agent_type = %decision.agent_type,
            "Dispatching task (confidence {:.2})",
            decision.confidence
        );

        let outcome = invoke(agent, task.clone()).await.with_context(|| {
            format!("Agent '{}' failed to process the request", decision.agent_type)
        });

        let response = match outcome {
            Ok(result) => {
                if let Some(err) = &result.error {
                    self.diagnostics
                        .emit(FailureKind::AgentProcessing, task.task_id.as_str(), err);
                }
                compose(&decision, result)
            }
            Err(e) => {
                self.diagnostics
                    .emit(FailureKind::AgentProcessing, task.task_id.as_str(), &e);
                Response::degraded(&e)
            }
        };

        self.log(&task, &decision, &response).await;

        info!(
            agent_type = %decision.agent_type,
            task_id = %task.task_id,
            "Dispatched to {} (answered as {})",
            decision.agent_type,
            response.agent_used
        );
        response
    }

    async fn log(&self, task: &Task, decision: &RoutingDecision, response: &Response) {
        let mut metadata = Map::new();
        metadata.insert("task_id".to_string(), json!(task.task_id));
        metadata.insert("confidence".to_string(), json!(response.confidence));
        metadata.insert("routing".to_string(), json!(decision.matched_context));
        if let Some(err) = &response.error {
            metadata.insert("error".to_string(), json!(err));
        }

        let record = ConversationRecord::new(
            task.user_id.as_str(),
            task.session_id.as_str(),
            task.message.as_str(),
            response.response.as_str(),
            decision.agent_type.as_str(),
        )
        .with_metadata(metadata.into());

        if let Err(e) = store_call(self.store_timeout, self.store.log_conversation(&record)).await {
            self.diagnostics
                .emit(FailureKind::Persistence, task.task_id.as_str(), e);
        }
    }
}

/// Run `process` on its own task so a panicking agent surfaces as an error
async fn invoke(agent: Arc<dyn Agent>, task: Task) -> Result<AgentResult> {
    match tokio::spawn(async move { agent.process(&task).await }).await {
        Ok(outcome) => outcome,
        Err(e) => Err(anyhow!("agent task panicked: {}", e)),
    }
}

fn compose(decision: &RoutingDecision, result: AgentResult) -> Response {
    Response {
        response: result.response.unwrap_or_else(|| DEFAULT_REPLY.to_string()),
        agent_used: decision.agent_type.clone(),
        confidence: decision.confidence,
        data: result.data,
        suggested_actions: result.suggested_actions,
        error: result.error,
    }
}
