//! SQLite implementation of the agent store

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value as JsonValue;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::AgentStore;
use crate::records::{AgentRecord, ConversationRecord};

/// SQLite-backed store (thread-safe via Arc<Mutex>)
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file and initialize the schema
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open SQLite database at {:?}", path.as_ref()))?;
        info!("Opened sentinel store at {:?}", path.as_ref());
        Self::from_connection(conn)
    }

    /// Private in-memory database, mostly for tests and one-shot runs
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a statement block on the blocking pool while holding the connection lock
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|poisoned| {
                warn!("Database mutex was poisoned, recovering");
                poisoned.into_inner()
            });
            f(&conn)
        })
        .await
        .context("spawn_blocking task panicked")?
    }
}

/// Create tables if they don't exist. Safe to call multiple times.
fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS agents (
            agent_type TEXT PRIMARY KEY,
            id TEXT NOT NULL,
            name TEXT NOT NULL,
            status TEXT NOT NULL,
            health_status TEXT NOT NULL,
            last_heartbeat TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create agents table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS chat_conversations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            session_id TEXT NOT NULL,
            message TEXT NOT NULL,
            response TEXT NOT NULL,
            agent_used TEXT NOT NULL,
            metadata TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )
    .context("Failed to create chat_conversations table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_conversations_session ON chat_conversations(session_id)",
        [],
    )
    .context("Failed to create chat_conversations session index")?;

    debug!("Store schema initialized");
    Ok(())
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            warn!("Failed to parse stored timestamp '{}': {}", raw, e);
            Utc::now()
        }
    }
}

fn parse_json(raw: &str) -> JsonValue {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Failed to parse stored JSON column: {}", e);
        JsonValue::Null
    })
}

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<AgentRecord> {
    let health: String = row.get(4)?;
    let heartbeat: String = row.get(5)?;
    let created: String = row.get(6)?;
    Ok(AgentRecord {
        agent_type: row.get(0)?,
        id: row.get(1)?,
        name: row.get(2)?,
        status: row.get(3)?,
        health_status: parse_json(&health),
        last_heartbeat: parse_timestamp(&heartbeat),
        created_at: parse_timestamp(&created),
    })
}

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationRecord> {
    let metadata: String = row.get(5)?;
    let created: String = row.get(6)?;
    Ok(ConversationRecord {
        user_id: row.get(0)?,
        session_id: row.get(1)?,
        message: row.get(2)?,
        response: row.get(3)?,
        agent_used: row.get(4)?,
        metadata: parse_json(&metadata),
        created_at: parse_timestamp(&created),
    })
}

const AGENT_COLUMNS: &str =
    "agent_type, id, name, status, health_status, last_heartbeat, created_at";

#[async_trait]
impl AgentStore for SqliteStore {
    async fn agent_exists(&self, agent_type: &str) -> Result<bool> {
        let agent_type = agent_type.to_owned();
        self.with_conn(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM agents WHERE agent_type = ?1",
                    params![&agent_type],
                    |_| Ok(()),
                )
                .optional()
                .context("Failed to query agent existence")?;
            Ok(found.is_some())
        })
        .await
    }

    async fn insert_agent(&self, record: &AgentRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            let health = serde_json::to_string(&record.health_status)
                .context("Failed to serialize health status")?;
            conn.execute(
                "INSERT INTO agents
                    (agent_type, id, name, status, health_status, last_heartbeat, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &record.agent_type,
                    &record.id,
                    &record.name,
                    &record.status,
                    &health,
                    record.last_heartbeat.to_rfc3339(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .context("Failed to insert agent")?;
            debug!("Inserted agent registration: {}", record.agent_type);
            Ok(())
        })
        .await
    }

    async fn touch_agent(&self, agent_type: &str, status: &str) -> Result<bool> {
        let agent_type = agent_type.to_owned();
        let status = status.to_owned();
        self.with_conn(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE agents SET status = ?1, last_heartbeat = ?2 WHERE agent_type = ?3",
                    params![&status, Utc::now().to_rfc3339(), &agent_type],
                )
                .context("Failed to update agent heartbeat")?;
            Ok(rows > 0)
        })
        .await
    }

    async fn update_agent_health(
        &self,
        agent_type: &str,
        status: &str,
        health: &JsonValue,
    ) -> Result<bool> {
        let agent_type = agent_type.to_owned();
        let status = status.to_owned();
        let health = serde_json::to_string(health).context("Failed to serialize health status")?;
        self.with_conn(move |conn| {
            let rows = conn
                .execute(
                    "UPDATE agents SET status = ?1, health_status = ?2, last_heartbeat = ?3
                     WHERE agent_type = ?4",
                    params![&status, &health, Utc::now().to_rfc3339(), &agent_type],
                )
                .context("Failed to update agent health")?;
            if rows == 0 {
                debug!("Health update for unregistered agent type: {}", agent_type);
            }
            Ok(rows > 0)
        })
        .await
    }

    async fn mark_all_inactive(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let rows = conn
                .execute(
                    "UPDATE agents SET status = 'inactive', last_heartbeat = ?1",
                    params![Utc::now().to_rfc3339()],
                )
                .context("Failed to mark agents inactive")?;
            info!("Marked {} agent registrations inactive", rows);
            Ok(rows)
        })
        .await
    }

    async fn get_agent(&self, agent_type: &str) -> Result<Option<AgentRecord>> {
        let agent_type = agent_type.to_owned();
        self.with_conn(move |conn| {
            let sql = format!("SELECT {} FROM agents WHERE agent_type = ?1", AGENT_COLUMNS);
            conn.query_row(&sql, params![&agent_type], agent_from_row)
                .optional()
                .context("Failed to query agent")
        })
        .await
    }

    async fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM agents ORDER BY agent_type", AGENT_COLUMNS);
            let mut stmt = conn.prepare(&sql).context("Failed to prepare agent listing")?;
            let agents = stmt
                .query_map([], agent_from_row)
                .context("Failed to list agents")?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(agents)
        })
        .await
    }

    async fn log_conversation(&self, record: &ConversationRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            let metadata =
                serde_json::to_string(&record.metadata).context("Failed to serialize metadata")?;
            conn.execute(
                "INSERT INTO chat_conversations
                    (user_id, session_id, message, response, agent_used, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    &record.user_id,
                    &record.session_id,
                    &record.message,
                    &record.response,
                    &record.agent_used,
                    &metadata,
                    record.created_at.to_rfc3339(),
                ],
            )
            .context("Failed to insert conversation")?;
            debug!(
                "Logged conversation for session {} (agent: {})",
                record.session_id, record.agent_used
            );
            Ok(())
        })
        .await
    }

    async fn session_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationRecord>> {
        let session_id = session_id.to_owned();
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT user_id, session_id, message, response, agent_used, metadata, created_at
                     FROM (
                        SELECT * FROM chat_conversations
                        WHERE session_id = ?1
                        ORDER BY id DESC
                        LIMIT ?2
                     )
                     ORDER BY id ASC",
                )
                .context("Failed to prepare session history query")?;
            let records = stmt
                .query_map(params![&session_id, limit as i64], conversation_from_row)
                .context("Failed to query session history")?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
        .await
    }
}
