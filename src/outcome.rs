// 📋 Resolution Outcome - what a single resolve() call concluded
//
// Exactly one variant is active; there are no partially-filled outcomes.
// Records never merge across providers: every multi-record variant holds
// the records of ONE provider query, in that provider's order.

use crate::error::InvalidInput;
use crate::identifier::TaxId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// CANDIDATE RECORD
// ============================================================================

/// A person record as returned by one provider query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Legal name as the registry spells it ("PEREZ JUAN")
    pub name: String,

    pub tax_id: TaxId,

    /// Priority position of the provider that produced it (0 = highest)
    #[serde(default)]
    pub source_rank: usize,

    /// Name of the provider that produced it
    #[serde(default)]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
}

impl CandidateRecord {
    pub fn new(name: impl Into<String>, tax_id: TaxId) -> Self {
        CandidateRecord {
            name: name.into(),
            tax_id,
            source_rank: 0,
            source: String::new(),
            birth_date: None,
        }
    }

    /// Builder pattern: attach date of birth
    pub fn with_birth_date(mut self, birth_date: NaiveDate) -> Self {
        self.birth_date = Some(birth_date);
        self
    }

    /// Builder pattern: stamp provenance
    pub fn with_source(mut self, source: impl Into<String>, rank: usize) -> Self {
        self.source = source.into();
        self.source_rank = rank;
        self
    }
}

// ============================================================================
// NO-MATCH POLICY
// ============================================================================

/// What to return when records were found but none matched the name filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchPolicy {
    /// First record ever observed → `NoMatchBestEffort`
    #[default]
    BestEffort,

    /// Every record of the first non-empty query → `NoMatchShowAll`
    ShowAll,
}

// ============================================================================
// OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum Outcome {
    /// No filter, the winning provider returned exactly one record
    Resolved(CandidateRecord),

    /// No filter, the winning provider returned several records
    ResolvedMultiple(Vec<CandidateRecord>),

    /// Filter matched exactly one record of the winning provider
    FilteredSingle(CandidateRecord),

    /// Filter matched several records of the winning provider
    FilteredMultiple(Vec<CandidateRecord>),

    /// Filter matched nothing; all records of the first non-empty query
    NoMatchShowAll(Vec<CandidateRecord>),

    /// Filter matched nothing; first record found under the ID
    NoMatchBestEffort(CandidateRecord),

    /// Every provider answered, none had a record
    NotFound,

    /// The raw identifier was malformed
    InvalidInput(InvalidInput),

    /// Every provider query failed; carries the last failure
    ProviderError { provider: String, reason: String },
}

impl Outcome {
    /// Stable machine label, e.g. "filtered_single"
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Resolved(_) => "resolved",
            Outcome::ResolvedMultiple(_) => "resolved_multiple",
            Outcome::FilteredSingle(_) => "filtered_single",
            Outcome::FilteredMultiple(_) => "filtered_multiple",
            Outcome::NoMatchShowAll(_) => "no_match_show_all",
            Outcome::NoMatchBestEffort(_) => "no_match_best_effort",
            Outcome::NotFound => "not_found",
            Outcome::InvalidInput(_) => "invalid_input",
            Outcome::ProviderError { .. } => "provider_error",
        }
    }

    /// A single confident answer (no filter, or the filter picked one)
    pub fn resolved_record(&self) -> Option<&CandidateRecord> {
        match self {
            Outcome::Resolved(record) | Outcome::FilteredSingle(record) => Some(record),
            _ => None,
        }
    }

    pub fn tax_id(&self) -> Option<&TaxId> {
        self.resolved_record().map(|r| &r.tax_id)
    }

    pub fn name(&self) -> Option<&str> {
        self.resolved_record().map(|r| r.name.as_str())
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_record().is_some()
    }

    /// Something was found under the ID, even if the filter rejected it
    pub fn found_anything(&self) -> bool {
        !self.records().is_empty()
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::InvalidInput(_) | Outcome::ProviderError { .. })
    }

    /// All records carried by this outcome, in order
    pub fn records(&self) -> Vec<&CandidateRecord> {
        match self {
            Outcome::Resolved(r) | Outcome::FilteredSingle(r) | Outcome::NoMatchBestEffort(r) => {
                vec![r]
            }
            Outcome::ResolvedMultiple(rs)
            | Outcome::FilteredMultiple(rs)
            | Outcome::NoMatchShowAll(rs) => rs.iter().collect(),
            Outcome::NotFound | Outcome::InvalidInput(_) | Outcome::ProviderError { .. } => {
                Vec::new()
            }
        }
    }

    /// One-line description for logs and the CLI
    pub fn summary(&self) -> String {
        match self {
            Outcome::Resolved(r) | Outcome::FilteredSingle(r) => {
                format!("{}: {} {} (via {})", self.label(), r.tax_id, r.name, r.source)
            }
            Outcome::NoMatchBestEffort(r) => format!(
                "{}: filter did not match; found {} {} (via {})",
                self.label(),
                r.tax_id,
                r.name,
                r.source
            ),
            Outcome::ResolvedMultiple(rs)
            | Outcome::FilteredMultiple(rs)
            | Outcome::NoMatchShowAll(rs) => {
                format!("{}: {} records", self.label(), rs.len())
            }
            Outcome::NotFound => "not_found: no provider holds a record for this ID".to_string(),
            Outcome::InvalidInput(reason) => format!("invalid_input: {}", reason),
            Outcome::ProviderError { provider, reason } => {
                format!("provider_error: {} failed: {}", provider, reason)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
