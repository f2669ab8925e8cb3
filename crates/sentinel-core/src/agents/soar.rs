//! Security orchestration, automation and response

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::{SOAR, mentions};
use crate::agent::{Agent, AgentCore};
use crate::types::{AgentResult, AgentStatusReport, Task};

/// Playbooks shipped with the platform
const PLAYBOOKS: [(&str, &str); 3] = [
    ("malware-containment", "Isolate infected hosts and collect samples"),
    ("phishing-response", "Quarantine reported mail and reset exposed credentials"),
    ("account-compromise", "Disable the account, revoke sessions, notify the owner"),
];

pub struct SoarAgent {
    core: AgentCore,
}

impl SoarAgent {
    pub fn new() -> Self {
        Self {
            core: AgentCore::new(SOAR, "SOAR Agent"),
        }
    }

    async fn handle(&self, task: &Task) -> Result<AgentResult> {
        let lower = task.message.to_lowercase();
        let result = if mentions(&lower, &["playbook"]) {
            Self::playbooks()
        } else if mentions(&lower, &["automate", "workflow"]) {
            Self::workflow()
        } else if mentions(&lower, &["block", "contain"]) {
            Self::execute_response()
        } else {
            Self::info()
        };
        Ok(result)
    }

    fn playbooks() -> AgentResult {
        let playbooks: Vec<_> = PLAYBOOKS
            .iter()
            .map(|(name, description)| {
                json!({ "name": name, "description": description, "status": "active" })
            })
            .collect();
        AgentResult::reply(format!(
            "Found {} active playbook(s) available for automation.",
            playbooks.len()
        ))
        .with_data(json!(playbooks))
        .with_actions(&["View playbook details", "Execute playbook", "Create new playbook"])
    }

    fn workflow() -> AgentResult {
        AgentResult::reply(
            "I can help you create automated workflows. Workflows can trigger on specific conditions \
             (e.g., high-severity alerts) and execute actions like blocking IPs, quarantining systems, \
             or sending notifications.",
        )
        .with_data(json!({
            "available_actions": [
                "Block IP",
                "Quarantine host",
                "Send notification",
                "Create ticket",
                "Run script"
            ]
        }))
        .with_actions(&["Create workflow", "View existing workflows", "Test workflow"])
    }

    fn execute_response() -> AgentResult {
        AgentResult::reply(
            "Response action executed. IP address blocked, host quarantined, and security team notified.",
        )
        .with_data(json!({
            "actions_taken": ["Block IP", "Quarantine host", "Send notification"],
            "status": "completed"
        }))
        .with_actions(&[
            "View execution log",
            "Check incident status",
            "Review response effectiveness",
        ])
    }

    fn info() -> AgentResult {
        AgentResult::reply(
            "I handle Security Orchestration, Automation, and Response. I can manage playbooks, create \
             automated workflows, and execute response actions. What would you like to automate?",
        )
        .with_actions(&["View playbooks", "Create workflow", "Execute response"])
    }
}

impl Default for SoarAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for SoarAgent {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    async fn ask(message: &str) -> AgentResult {
        let task = Task::new(SOAR, message, "u1", "s1", Map::new());
        SoarAgent::new().process(&task).await.unwrap()
    }

    #[tokio::test]
    async fn test_block_executes_response() {
        let result = ask("please block this IP and contain the threat").await;
        assert_eq!(result.data.unwrap()["status"], "completed");
        assert_eq!(result.suggested_actions[0], "View execution log");
    }

    #[tokio::test]
    async fn test_playbooks_listed() {
        let result = ask("which playbook handles phishing").await;
        assert!(result.response.unwrap().starts_with("Found 3 active playbook(s)"));
        assert_eq!(result.data.unwrap().as_array().map(|a| a.len()), Some(3));
    }

    #[tokio::test]
    async fn test_workflow() {
        let result = ask("automate triage").await;
        assert!(result.data.unwrap()["available_actions"].is_array());
    }

    #[tokio::test]
    async fn test_info() {
        let result = ask("response").await;
        assert!(result.response.unwrap().starts_with("I handle Security Orchestration"));
    }
}
