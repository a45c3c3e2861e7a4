// CSV registry provider
//
// Loads a registry extract once at startup. Expected headers:
//
//   name,tax_id[,birth_date]
//
// tax_id may be hyphenated ("20-47156273-5"); birth_date accepts
// YYYY-MM-DD, DD/MM/YYYY, or an ISO timestamp (date part is kept).

use super::memory::MemoryProvider;
use super::Provider;
use crate::error::ProviderError;
use crate::identifier::{LookupId, TaxId};
use crate::outcome::CandidateRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

/// One CSV row as it appears in the file
#[derive(Debug, Deserialize)]
struct RegistryRow {
    name: String,
    tax_id: String,
    #[serde(default)]
    birth_date: Option<String>,
}

/// Parse a registry date in the formats sources actually emit
pub fn parse_birth_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    // "2006-08-03 12:00:00-03:00" / "2006-08-03T12:00:00" → date part
    let date_part = raw.split(|c| c == ' ' || c == 'T').next().unwrap_or(raw);

    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%d/%m/%Y"))
        .ok()
}

/// Load and validate every row of a registry CSV
pub fn load_registry_csv(csv_path: &Path) -> Result<Vec<CandidateRecord>> {
    let mut rdr = ::csv::ReaderBuilder::new()
        .trim(::csv::Trim::All)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open registry CSV {}", csv_path.display()))?;

    let mut records = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        let row: RegistryRow = result.context("Failed to deserialize registry row")?;

        // header is line 1
        let line = index + 2;
        let tax_id = TaxId::parse(&row.tax_id)
            .with_context(|| format!("Invalid tax_id {:?} on line {}", row.tax_id, line))?;

        let mut record = CandidateRecord::new(row.name, tax_id);
        if let Some(date) = row.birth_date.as_deref().and_then(parse_birth_date) {
            record = record.with_birth_date(date);
        }

        records.push(record);
    }

    Ok(records)
}

pub struct CsvProvider {
    inner: MemoryProvider,
}

impl CsvProvider {
    pub fn open(name: &str, csv_path: &Path, accepts_personal: bool) -> Result<Self> {
        let records = load_registry_csv(csv_path)?;

        tracing::info!(
            provider = name,
            path = %csv_path.display(),
            records = records.len(),
            "Loaded registry CSV"
        );

        Ok(CsvProvider {
            inner: MemoryProvider::with_records(name, records).with_personal_search(accepts_personal),
        })
    }

    pub fn count(&self) -> usize {
        self.inner.count()
    }
}

#[async_trait]
impl Provider for CsvProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn accepts_personal(&self) -> bool {
        self.inner.accepts_personal()
    }

    async fn query(&self, id: &LookupId) -> Result<Vec<CandidateRecord>, ProviderError> {
        self.inner.query(id).await
    }
}
