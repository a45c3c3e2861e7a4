// 🔌 Provider Framework
//
// Every data source (registry extract, local database, remote web service)
// implements ONE trait. The resolution engine is written against this
// trait only, never against a concrete source.
//
// Adding a source = implementing `Provider`, nothing else changes.

pub mod csv_file;
pub mod http;
pub mod memory;
pub mod sqlite;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::identifier::LookupId;
use crate::outcome::CandidateRecord;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub use self::csv_file::{load_registry_csv, CsvProvider};
pub use self::http::{HttpProvider, HttpTokenSource};
pub use self::memory::MemoryProvider;
pub use self::sqlite::{import_csv, insert_records, setup_registry, SqliteProvider};

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// A data source able to answer "who holds this ID?"
///
/// Contract:
/// - `Ok(vec![])` means the source was reachable and has no record
/// - `Err(_)` means the query itself failed (transport, parse, auth...)
/// - records come back in the source's own display/confidence order
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short stable name, used in logs and record provenance
    fn name(&self) -> &str;

    /// Whether this source can search by bare personal number
    ///
    /// Sources that only index full tax IDs leave this `false`; the engine
    /// then queries them once per calculated tax-ID candidate instead.
    fn accepts_personal(&self) -> bool {
        false
    }

    async fn query(&self, id: &LookupId) -> std::result::Result<Vec<CandidateRecord>, ProviderError>;
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Records of `records` that answer `id` (exact tax ID, or embedded
/// personal number), in their original order
pub(crate) fn select_by_id(records: &[CandidateRecord], id: &LookupId) -> Vec<CandidateRecord> {
    match id {
        LookupId::Full(tax_id) => records
            .iter()
            .filter(|r| &r.tax_id == tax_id)
            .cloned()
            .collect(),
        LookupId::Personal(personal) => match personal.padded() {
            Some(padded) => records
                .iter()
                .filter(|r| r.tax_id.personal_digits() == padded)
                .cloned()
                .collect(),
            None => Vec::new(),
        },
    }
}

// ============================================================================
// FACTORY
// ============================================================================

/// Build a provider from its configuration entry
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    let provider: Arc<dyn Provider> = match config {
        ProviderConfig::Csv {
            name,
            path,
            accepts_personal,
        } => Arc::new(CsvProvider::open(name, path, *accepts_personal)?),

        ProviderConfig::Sqlite {
            name,
            path,
            accepts_personal,
        } => Arc::new(SqliteProvider::open(name, path, *accepts_personal)?),

        ProviderConfig::Http {
            name,
            base_url,
            accepts_personal,
            token,
        } => {
            let mut provider = HttpProvider::new(name, base_url)?.with_personal_search(*accepts_personal);
            if let Some(token) = token {
                provider = provider.with_token_source(HttpTokenSource::from_config(token)?);
            }
            Arc::new(provider)
        }
    };

    Ok(provider)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{normalize, TaxId};

    fn record(name: &str, tax_id: &str) -> CandidateRecord {
        CandidateRecord::new(name, TaxId::parse(tax_id).unwrap())
    }

    #[test]
    fn test_select_by_full_id() {
        let records = vec![
            record("PEREZ JUAN", "20471562735"),
            record("PEREZ ANA", "27111111112"),
        ];

        let hits = select_by_id(&records, &normalize("20-47156273-5").unwrap());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "PEREZ JUAN");
    }

    #[test]
    fn test_select_by_personal_number_keeps_order() {
        let records = vec![
            record("PEREZ JUAN", "20471562735"),
            record("GOMEZ ANA", "27111111112"),
            record("PEREZ JUANA", "23471562734"),
        ];

        let hits = select_by_id(&records, &normalize("47156273").unwrap());
        let names: Vec<&str> = hits.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["PEREZ JUAN", "PEREZ JUANA"]);
    }

    #[test]
    fn test_select_by_short_personal_number_uses_padding() {
        let records = vec![record("LOPEZ EVA", "27012345675")];
        let hits = select_by_id(&records, &normalize("1234567").unwrap());
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_build_csv_provider_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.csv");
        std::fs::write(&path, "name,tax_id\nPEREZ JUAN,20471562735\n").unwrap();

        let provider = build_provider(&ProviderConfig::Csv {
            name: "extract".into(),
            path: path.clone(),
            accepts_personal: true,
        })
        .unwrap();

        assert_eq!(provider.name(), "extract");
        assert!(provider.accepts_personal());
    }

    #[test]
    fn test_build_provider_fails_for_missing_file() {
        let result = build_provider(&ProviderConfig::Csv {
            name: "extract".into(),
            path: "/definitely/not/here.csv".into(),
            accepts_personal: false,
        });
        assert!(result.is_err());
    }
}
