//! User entity and behavior analytics

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::{INDIVIDUAL, find_word, mentions};
use crate::agent::{Agent, AgentCore};
use crate::types::{AgentResult, AgentStatusReport, Task};

pub struct IndividualAgent {
    core: AgentCore,
}

impl IndividualAgent {
    pub fn new() -> Self {
        Self {
            core: AgentCore::new(INDIVIDUAL, "Individual/UEBA Agent"),
        }
    }

    async fn handle(&self, task: &Task) -> Result<AgentResult> {
        let lower = task.message.to_lowercase();
        if mentions(&lower, &["search", "find", "lookup"]) {
            Ok(self.search(&task.message))
        } else if mentions(&lower, &["analyze", "behavior", "anomaly"]) {
            Ok(self.analyze_behavior())
        } else if mentions(&lower, &["risk", "score"]) {
            Ok(self.risk_score())
        } else {
            Ok(self.info())
        }
    }

    fn search(&self, message: &str) -> AgentResult {
        let query = match find_word(message, |w| w.contains('@')) {
            Some(email) => json!({ "email": email }),
            None => json!({ "name": message.trim() }),
        };
        AgentResult::reply("No individuals found matching your search criteria.")
            .with_data(json!({ "query": query, "matches": [] }))
    }

    fn analyze_behavior(&self) -> AgentResult {
        AgentResult::reply(
            "I've analyzed the behavior patterns. No significant anomalies detected in recent activity.",
        )
        .with_data(json!({
            "anomalies": [],
            "baseline": "established",
            "analysis_period": "30 days"
        }))
        .with_actions(&[
            "Review access logs",
            "Check recent transactions",
            "Investigate if suspicious",
        ])
    }

    fn risk_score(&self) -> AgentResult {
        AgentResult::reply(
            "The current risk score is 25 (Low). The user has normal access patterns and no associated incidents.",
        )
        .with_data(json!({
            "risk_score": 25,
            "risk_level": "low",
            "factors": ["Normal access patterns", "No incidents", "Standard privileges"]
        }))
    }

    fn info(&self) -> AgentResult {
        AgentResult::reply(
            "I can help you with individual user analysis. You can search for users, analyze their behavior, \
             check risk scores, or investigate anomalies. What would you like to know?",
        )
        .with_actions(&[
            "Search for a user",
            "Analyze behavior patterns",
            "Check risk assessment",
        ])
    }
}

impl Default for IndividualAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for IndividualAgent {
    fn agent_type(&self) -> &str {
        self.core.agent_type()
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    async fn process(&self, task: &Task) -> Result<AgentResult> {
        self.core.guard(self.handle(task)).await
    }

    async fn get_status(&self) -> Result<AgentStatusReport> {
        Ok(self.core.report())
    }

    async fn initialize(&self) -> Result<()> {
        self.core.activate();
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.core.deactivate();
        Ok(())
    }
}
