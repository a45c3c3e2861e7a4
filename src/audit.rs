// 🧾 Audit Trail - every resolution is an event
//
// Append-only SQLite table. One row per resolve() call made through a
// binary, holding the raw input, the filter and the full outcome as JSON.

use crate::outcome::Outcome;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

pub const RESOLUTION_EVENT: &str = "resolution";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    /// Raw identifier as the caller sent it
    pub lookup_id: String,
    pub outcome: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        lookup_id: &str,
        outcome: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            lookup_id: lookup_id.to_string(),
            outcome: outcome.to_string(),
            data,
            actor: actor.to_string(),
        }
    }

    /// Event describing one finished resolution
    pub fn resolution(raw_id: &str, name_filter: Option<&str>, outcome: &Outcome, actor: &str) -> Result<Self> {
        let data = serde_json::json!({
            "name_filter": name_filter,
            "result": serde_json::to_value(outcome)?,
        });
        Ok(Event::new(RESOLUTION_EVENT, raw_id, outcome.label(), data, actor))
    }
}

pub fn setup_audit(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            lookup_id TEXT NOT NULL,
            outcome TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_lookup ON events(lookup_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)",
        [],
    )?;

    Ok(())
}

pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, lookup_id, outcome, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.lookup_id,
            event.outcome,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Events for one raw identifier, newest first
pub fn get_events_for_id(conn: &Connection, lookup_id: &str) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, lookup_id, outcome, data, actor
         FROM events
         WHERE lookup_id = ?1
         ORDER BY id DESC",
    )?;

    let rows = stmt
        .query_map(params![lookup_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut events = Vec::with_capacity(rows.len());
    for (event_id, timestamp, event_type, lookup_id, outcome, data, actor) in rows {
        events.push(Event {
            timestamp: DateTime::parse_from_rfc3339(&timestamp)
                .with_context(|| format!("Bad timestamp on event {}", event_id))?
                .with_timezone(&Utc),
            data: serde_json::from_str(&data)
                .with_context(|| format!("Bad data payload on event {}", event_id))?,
            event_id,
            event_type,
            lookup_id,
            outcome,
            actor,
        });
    }

    Ok(events)
}

pub fn count_events(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// AUDIT LOG HANDLE
// ============================================================================

/// Shared handle used by the binaries
pub struct AuditLog {
    conn: Mutex<Connection>,
}

impl AuditLog {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open audit database {}", path.display()))?;
        setup_audit(&conn)?;
        Ok(AuditLog { conn: Mutex::new(conn) })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_audit(&conn)?;
        Ok(AuditLog { conn: Mutex::new(conn) })
    }

    pub fn record_resolution(
        &self,
        raw_id: &str,
        name_filter: Option<&str>,
        outcome: &Outcome,
        actor: &str,
    ) -> Result<Event> {
        let event = Event::resolution(raw_id, name_filter, outcome, actor)?;
        let conn = self.conn.lock().map_err(|_| anyhow!("audit connection lock poisoned"))?;
        insert_event(&conn, &event)?;
        Ok(event)
    }

    pub fn events_for_id(&self, lookup_id: &str) -> Result<Vec<Event>> {
        let conn = self.conn.lock().map_err(|_| anyhow!("audit connection lock poisoned"))?;
        get_events_for_id(&conn, lookup_id)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.conn.lock().map_err(|_| anyhow!("audit connection lock poisoned"))?;
        count_events(&conn)
    }
}
