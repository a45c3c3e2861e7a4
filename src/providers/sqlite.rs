// SQLite registry provider
//
// A local copy of a person registry, populated with `import_csv` (the
// CLI `import` command) and queried by tax ID or by embedded personal
// number. WAL mode so the server can read while an import runs.

use super::csv_file::load_registry_csv;
use super::Provider;
use crate::error::ProviderError;
use crate::identifier::{LookupId, TaxId};
use crate::outcome::CandidateRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub fn setup_registry(conn: &Connection) -> Result<()> {
    // Enable WAL mode for concurrent readers
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS people (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tax_id TEXT NOT NULL,
            personal TEXT NOT NULL,
            name TEXT NOT NULL,
            birth_date TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (tax_id, name)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_people_tax_id ON people(tax_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_people_personal ON people(personal)",
        [],
    )?;

    Ok(())
}

/// Insert records, skipping exact (tax_id, name) duplicates
///
/// Returns the number of rows actually inserted.
pub fn insert_records(conn: &Connection, records: &[CandidateRecord]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;

    for record in records {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO people (tax_id, personal, name, birth_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.tax_id.as_str(),
                record.tax_id.personal_digits(),
                record.name,
                record.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
            ],
        )?;

        if changed == 0 {
            duplicates += 1;
        } else {
            inserted += 1;
        }
    }

    tracing::info!(inserted, duplicates, "Registry rows written");

    Ok(inserted)
}

/// Load a registry CSV into the database
pub fn import_csv(conn: &Connection, csv_path: &Path) -> Result<usize> {
    let records = load_registry_csv(csv_path)?;
    insert_records(conn, &records)
}

pub fn count_people(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM people", [], |row| row.get(0))?;
    Ok(count)
}

fn query_people(conn: &Connection, id: &LookupId) -> Result<Vec<CandidateRecord>, ProviderError> {
    let (sql, key) = match id {
        LookupId::Full(tax_id) => (
            "SELECT name, tax_id, birth_date FROM people WHERE tax_id = ?1 ORDER BY id",
            tax_id.as_str().to_string(),
        ),
        LookupId::Personal(personal) => match personal.padded() {
            Some(padded) => (
                "SELECT name, tax_id, birth_date FROM people WHERE personal = ?1 ORDER BY id",
                padded,
            ),
            None => return Ok(Vec::new()),
        },
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![key], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (name, tax_id, birth_date) = row?;
        let tax_id = TaxId::parse(&tax_id)
            .map_err(|e| ProviderError::Parse(format!("stored tax_id {:?}: {}", tax_id, e)))?;

        let mut record = CandidateRecord::new(name, tax_id);
        if let Some(date) = birth_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        {
            record = record.with_birth_date(date);
        }
        records.push(record);
    }

    Ok(records)
}

pub struct SqliteProvider {
    name: String,
    accepts_personal: bool,
    db: Arc<Mutex<Connection>>,
}

impl SqliteProvider {
    pub fn open(name: &str, db_path: &Path, accepts_personal: bool) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open registry database {}", db_path.display()))?;
        setup_registry(&conn)?;
        Ok(SqliteProvider::from_connection(name, conn, accepts_personal))
    }

    pub fn from_connection(name: &str, conn: Connection, accepts_personal: bool) -> Self {
        SqliteProvider {
            name: name.to_string(),
            accepts_personal,
            db: Arc::new(Mutex::new(conn)),
        }
    }
}

#[async_trait]
impl Provider for SqliteProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_personal(&self) -> bool {
        self.accepts_personal
    }

    async fn query(&self, id: &LookupId) -> Result<Vec<CandidateRecord>, ProviderError> {
        let db = Arc::clone(&self.db);
        let id = id.clone();

        // rusqlite is blocking; keep it off the async workers
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| ProviderError::Storage("registry connection lock poisoned".to_string()))?;
            query_people(&conn, &id)
        })
        .await
        .map_err(|e| ProviderError::Storage(format!("registry query task failed: {}", e)))?
    }
}
