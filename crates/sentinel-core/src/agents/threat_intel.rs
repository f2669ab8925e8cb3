//! Threat intelligence and sanctions screening

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::{THREAT_INTEL, mentions};
use crate::agent::{Agent, AgentCore};
use crate::types::{AgentResult, AgentStatusReport, Task};

/// Lists consulted by a sanctions check
const SANCTIONS_LISTS: [&str; 4] = ["UN", "US", "UK", "EU"];

pub struct ThreatIntelAgent {
    core: AgentCore,
}

impl ThreatIntelAgent {
    pub fn new() -> Self {
        Self {
            core: AgentCore::new(THREAT_INTEL, "Threat Intelligence Agent"),
        }
    }

    async fn handle(&self, task: &Task) -> Result<AgentResult> {
        let lower = task.message.to_lowercase();
        let result = if mentions(&lower, &["sanctions", "blacklist"]) {
            Self::check_sanctions(&task.message)
        } else if mentions(&lower, &["ioc", "indicator", "threat"]) {
            Self::check_threat()
        } else if mentions(&lower, &["search"]) {
            Self::search()
        } else {
            Self::info()
        };
        Ok(result)
    }

    fn check_sanctions(message: &str) -> AgentResult {
        // short words are too noisy to screen
        let terms: Vec<&str> = message
            .split_whitespace()
            .filter(|w| w.chars().count() > 3)
            .collect();
        AgentResult::reply(format!(
            "No matches found in sanctions lists ({}).",
            SANCTIONS_LISTS.join(", ")
        ))
        .with_data(json!({
            "search_terms": terms,
            "lists": SANCTIONS_LISTS,
            "matches": []
        }))
    }

    fn check_threat() -> AgentResult {
        AgentResult::reply(
            "Threat Intelligence Check: Analyzing indicators. No active threats detected matching your criteria.",
        )
        .with_data(json!({
            "threats_found": 0,
            "iocs_checked": 0,
            "status": "clear"
        }))
        .with_actions(&["View threat feed", "Check IOCs", "Review recent threats"])
    }

    fn search() -> AgentResult {
        AgentResult::reply("No threats found.").with_data(json!([]))
    }

    fn info() -> AgentResult {
        AgentResult::reply(
            "I can help you with threat intelligence, check sanctions lists, analyze IOCs, and search \
             threat databases. What would you like to investigate?",
        )
        .with_actions(&["Check sanctions list", "Search threats", "Analyze IOCs"])
    }
}

impl Default for ThreatIntelAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for ThreatIntelAgent {
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
