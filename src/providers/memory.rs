// In-memory provider - a fixed record set held in process
//
// Used for fixtures, embedding the engine in tests, and as the backing
// store of the CSV provider.

use super::{select_by_id, Provider};
use crate::error::ProviderError;
use crate::identifier::LookupId;
use crate::outcome::CandidateRecord;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

pub struct MemoryProvider {
    name: String,
    accepts_personal: bool,
    records: Arc<RwLock<Vec<CandidateRecord>>>,
}

impl MemoryProvider {
    pub fn new(name: impl Into<String>) -> Self {
        MemoryProvider {
            name: name.into(),
            accepts_personal: false,
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_records(name: impl Into<String>, records: Vec<CandidateRecord>) -> Self {
        let provider = MemoryProvider::new(name);
        if let Ok(mut guard) = provider.records.write() {
            *guard = records;
        }
        provider
    }

    /// Builder pattern: allow bare personal-number searches
    pub fn with_personal_search(mut self, accepts: bool) -> Self {
        self.accepts_personal = accepts;
        self
    }

    pub fn insert(&self, record: CandidateRecord) {
        if let Ok(mut guard) = self.records.write() {
            guard.push(record);
        }
    }

    pub fn count(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_personal(&self) -> bool {
        self.accepts_personal
    }

    async fn query(&self, id: &LookupId) -> Result<Vec<CandidateRecord>, ProviderError> {
        let records = self
            .records
            .read()
            .map_err(|_| ProviderError::Storage("record store lock poisoned".to_string()))?;

        Ok(select_by_id(&records, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{normalize, TaxId};

    fn record(name: &str, tax_id: &str) -> CandidateRecord {
        CandidateRecord::new(name, TaxId::parse(tax_id).unwrap())
    }

    #[tokio::test]
    async fn test_query_full_id() {
        let provider = MemoryProvider::with_records(
            "fixture",
            vec![record("PEREZ JUAN", "20471562735")],
        );

        let hits = provider.query(&normalize("20471562735").unwrap()).await.unwrap();
        assert_eq!(hits.len(), 1);

        let misses = provider.query(&normalize("27471562731").unwrap()).await.unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_count() {
        let provider = MemoryProvider::new("fixture").with_personal_search(true);
        assert_eq!(provider.count(), 0);

        provider.insert(record("PEREZ JUAN", "20471562735"));
        provider.insert(record("PEREZ JUANA", "23471562734"));

        assert_eq!(provider.count(), 2);
        assert!(provider.accepts_personal());

        let hits = provider.query(&normalize("47156273").unwrap()).await.unwrap();
        assert_eq!(hits.len(), 2);
    }
}
