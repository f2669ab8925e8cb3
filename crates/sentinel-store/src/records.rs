//! Rows persisted by the store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Registration and latest health snapshot of one agent type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub agent_type: String,
    pub name: String,
    pub status: String,
    pub health_status: JsonValue,
    pub last_heartbeat: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AgentRecord {
    /// A fresh registration, reported healthy as of now
    pub fn new(
        agent_type: impl Into<String>,
        name: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            agent_type: agent_type.into(),
            name: name.into(),
            status: status.into(),
            health_status: serde_json::json!({ "status": "healthy" }),
            last_heartbeat: now,
            created_at: now,
        }
    }
}

/// One message/response exchange. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub user_id: String,
    pub session_id: String,
    pub message: String,
    pub response: String,
    pub agent_used: String,
    #[serde(default = "empty_object")]
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
}

fn empty_object() -> JsonValue {
    JsonValue::Object(Default::default())
}

impl ConversationRecord {
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        message: impl Into<String>,
        response: impl Into<String>,
        agent_used: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            message: message.into(),
            response: response.into(),
            agent_used: agent_used.into(),
            metadata: empty_object(),
            created_at: Utc::now(),
        }
    }

    /// Attach auxiliary metadata (task id, routing context)
    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_record_defaults() {
        let record = AgentRecord::new("soar", "SOAR Agent", "active");
        assert_eq!(record.agent_type, "soar");
        assert_eq!(record.status, "active");
        assert_eq!(record.health_status["status"], "healthy");
        assert_eq!(record.created_at, record.last_heartbeat);
    }

    #[test]
    fn test_conversation_metadata_defaults_to_empty_object() {
        let record = ConversationRecord::new("u1", "s1", "hi", "hello", "threat_intel");
        assert!(record.metadata.as_object().is_some_and(|m| m.is_empty()));

        let json = r#"{
            "user_id": "u1", "session_id": "s1", "message": "m",
            "response": "r", "agent_used": "soar",
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let parsed: ConversationRecord = serde_json::from_str(json).unwrap();
        assert!(parsed.metadata.is_object());
    }
}
