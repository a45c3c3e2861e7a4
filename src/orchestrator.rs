// 🌊 Resolution Engine - the provider waterfall
//
// resolve(raw_id, name_filter) walks the providers in priority order and
// stops at the first query that settles the question:
//
//   1. normalize           → InvalidInput on failure, no provider touched
//   2. full tax ID stage   → every provider, queried with the tax ID
//   3. personal stage      → every provider, queried with the personal
//                            number (if it accepts it) or with each
//                            calculated tax-ID candidate in prefix order
//
// A query failure or timeout counts as "no records" for that query. Only
// when not a single query succeeded does the failure surface.

use crate::checksum;
use crate::config::ResolverConfig;
use crate::error::ProviderError;
use crate::identifier::{normalize, LookupId, PersonalNumber, TaxId};
use crate::name_match::NameFilter;
use crate::outcome::{CandidateRecord, NoMatchPolicy, Outcome};
use crate::providers::{build_provider, Provider};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_BATCH_CONCURRENCY: usize = 8;

/// One entry of a batch resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl ResolveRequest {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        ResolveRequest {
            id: id.into(),
            name: name.map(str::to_string),
        }
    }
}

// ============================================================================
// WATERFALL STATE (one per resolve call)
// ============================================================================

struct Waterfall<'a> {
    filter: Option<&'a NameFilter>,
    policy: NoMatchPolicy,
    /// Records of the first non-empty query, kept for the no-match outcomes
    first_seen: Option<Vec<CandidateRecord>>,
    succeeded: usize,
    last_failure: Option<(String, ProviderError)>,
}

impl<'a> Waterfall<'a> {
    fn new(filter: Option<&'a NameFilter>, policy: NoMatchPolicy) -> Self {
        Waterfall {
            filter,
            policy,
            first_seen: None,
            succeeded: 0,
            last_failure: None,
        }
    }

    /// Feed one successful query; `Some` means the waterfall stops here
    fn observe(&mut self, records: Vec<CandidateRecord>) -> Option<Outcome> {
        self.succeeded += 1;

        if records.is_empty() {
            return None;
        }

        let Some(filter) = self.filter else {
            return Some(if records.len() == 1 {
                Outcome::Resolved(records.into_iter().next()?)
            } else {
                Outcome::ResolvedMultiple(records)
            });
        };

        let mut matched: Vec<CandidateRecord> = records
            .iter()
            .filter(|r| filter.matches(&r.name))
            .cloned()
            .collect();

        match matched.len() {
            0 => {
                if self.first_seen.is_none() {
                    self.first_seen = Some(records);
                }
                None
            }
            1 => matched.pop().map(Outcome::FilteredSingle),
            _ => Some(Outcome::FilteredMultiple(matched)),
        }
    }

    fn record_failure(&mut self, provider: &str, error: ProviderError) {
        self.last_failure = Some((provider.to_string(), error));
    }

    /// Records were found but the filter rejected all of them
    fn no_match(&mut self) -> Option<Outcome> {
        let records = self.first_seen.take()?;
        match self.policy {
            NoMatchPolicy::ShowAll => Some(Outcome::NoMatchShowAll(records)),
            NoMatchPolicy::BestEffort => records.into_iter().next().map(Outcome::NoMatchBestEffort),
        }
    }

    fn exhausted(mut self) -> Outcome {
        if let Some(outcome) = self.no_match() {
            return outcome;
        }

        match self.last_failure.take() {
            Some((provider, error)) if self.succeeded == 0 => Outcome::ProviderError {
                provider,
                reason: error.to_string(),
            },
            _ => Outcome::NotFound,
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct ResolutionEngine {
    providers: Vec<Arc<dyn Provider>>,
    query_timeout: Duration,
    no_match_policy: NoMatchPolicy,
    batch_concurrency: usize,
}

impl ResolutionEngine {
    /// Providers in priority order (index 0 = highest)
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        ResolutionEngine {
            providers,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            no_match_policy: NoMatchPolicy::default(),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }

    /// Builder pattern: per-query timeout
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Builder pattern: what to return when the filter matches nothing
    pub fn with_no_match_policy(mut self, policy: NoMatchPolicy) -> Self {
        self.no_match_policy = policy;
        self
    }

    /// Builder pattern: max resolutions in flight during a batch
    pub fn with_batch_concurrency(mut self, limit: usize) -> Self {
        self.batch_concurrency = limit.max(1);
        self
    }

    /// Build every configured provider, in config order
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let mut providers = Vec::with_capacity(config.providers.len());
        for provider_config in &config.providers {
            let provider = build_provider(provider_config).with_context(|| {
                format!(
                    "Failed to set up {} provider {:?}",
                    provider_config.kind(),
                    provider_config.name()
                )
            })?;
            providers.push(provider);
        }

        Ok(ResolutionEngine::new(providers)
            .with_query_timeout(config.query_timeout())
            .with_no_match_policy(config.no_match_policy))
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    #[instrument(skip(self), fields(providers = self.providers.len()))]
    pub async fn resolve(&self, raw_id: &str, name_filter: Option<&str>) -> Outcome {
        let id = match normalize(raw_id) {
            Ok(id) => id,
            Err(reason) => {
                info!(%reason, "Rejected identifier");
                return Outcome::InvalidInput(reason);
            }
        };

        // Blank filter = no filter
        let filter = name_filter.and_then(NameFilter::new);
        let mut waterfall = Waterfall::new(filter.as_ref(), self.no_match_policy);

        let settled = self.run(&id, &mut waterfall).await;
        let outcome = match settled {
            Some(outcome) => outcome,
            None => waterfall.exhausted(),
        };

        info!(outcome = outcome.label(), "Resolution finished");
        outcome
    }

    async fn run(&self, id: &LookupId, waterfall: &mut Waterfall<'_>) -> Option<Outcome> {
        let (personal, already_asked) = match id {
            LookupId::Personal(personal) => (personal.clone(), None),
            LookupId::Full(tax_id) => {
                if let Some(outcome) = self.full_stage(tax_id, waterfall).await {
                    return Some(outcome);
                }
                // Found under the exact ID but the name disagreed: no fallback
                if waterfall.first_seen.is_some() {
                    return waterfall.no_match();
                }
                debug!(%tax_id, "Nothing under full tax ID, falling back to personal number");
                (tax_id.personal(), Some(tax_id))
            }
        };

        self.personal_stage(&personal, already_asked, waterfall).await
    }

    async fn full_stage(&self, tax_id: &TaxId, waterfall: &mut Waterfall<'_>) -> Option<Outcome> {
        let id = LookupId::Full(tax_id.clone());
        for (rank, provider) in self.providers.iter().enumerate() {
            if let Some(outcome) = self.step(rank, provider, &id, waterfall).await {
                return Some(outcome);
            }
        }
        None
    }

    async fn personal_stage(
        &self,
        personal: &PersonalNumber,
        already_asked: Option<&TaxId>,
        waterfall: &mut Waterfall<'_>,
    ) -> Option<Outcome> {
        let candidates: Vec<TaxId> = checksum::candidates(personal)
            .into_iter()
            .filter(|c| Some(c) != already_asked)
            .collect();
        debug!(%personal, candidates = candidates.len(), "Personal number stage");

        let personal_id = LookupId::Personal(personal.clone());

        for (rank, provider) in self.providers.iter().enumerate() {
            if provider.accepts_personal() {
                if let Some(outcome) = self.step(rank, provider, &personal_id, waterfall).await {
                    return Some(outcome);
                }
                continue;
            }

            for candidate in &candidates {
                let id = LookupId::Full(candidate.clone());
                if let Some(outcome) = self.step(rank, provider, &id, waterfall).await {
                    return Some(outcome);
                }
            }
        }

        None
    }

    async fn step(
        &self,
        rank: usize,
        provider: &Arc<dyn Provider>,
        id: &LookupId,
        waterfall: &mut Waterfall<'_>,
    ) -> Option<Outcome> {
        match self.attempt(rank, provider.as_ref(), id).await {
            Ok(records) => waterfall.observe(records),
            Err(error) => {
                waterfall.record_failure(provider.name(), error);
                None
            }
        }
    }

    /// One bounded provider query, records stamped with their provenance
    async fn attempt(
        &self,
        rank: usize,
        provider: &dyn Provider,
        id: &LookupId,
    ) -> std::result::Result<Vec<CandidateRecord>, ProviderError> {
        let name = provider.name();
        debug!(provider = %name, %id, kind = id.kind().as_str(), "Querying provider");

        let result = match tokio::time::timeout(self.query_timeout, provider.query(id)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.query_timeout.as_millis() as u64)),
        };

        match result {
            Ok(records) => {
                debug!(provider = %name, %id, records = records.len(), "Provider answered");
                Ok(records
                    .into_iter()
                    .map(|r| r.with_source(name, rank))
                    .collect())
            }
            Err(error) => {
                warn!(provider = %name, %id, %error, "Provider query failed");
                Err(error)
            }
        }
    }

    /// Resolve many IDs concurrently; outcomes come back in input order
    pub async fn resolve_batch(self: &Arc<Self>, requests: Vec<ResolveRequest>) -> Vec<Outcome> {
        let total = requests.len();
        let permits = Arc::new(Semaphore::new(self.batch_concurrency));
        let mut tasks = JoinSet::new();

        for (index, request) in requests.into_iter().enumerate() {
            let engine = Arc::clone(self);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let outcome = engine.resolve(&request.id, request.name.as_deref()).await;
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<Outcome>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => warn!(error = %e, "Batch resolution task failed"),
            }
        }

        info!(total, "Batch resolution finished");

        outcomes
            .into_iter()
            .map(|o| {
                o.unwrap_or_else(|| Outcome::ProviderError {
                    provider: "engine".to_string(),
                    reason: "resolution task aborted".to_string(),
                })
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidInput;
    use crate::providers::MemoryProvider;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum Behaviour {
        Answer(HashMap<String, Vec<CandidateRecord>>),
        Fail,
        Hang,
    }

    /// Provider with canned answers that logs every query it receives
    struct ScriptedProvider {
        name: String,
        accepts_personal: bool,
        behaviour: Behaviour,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedProvider {
        fn answering(name: &str, calls: &Arc<Mutex<Vec<String>>>) -> Self {
            ScriptedProvider {
                name: name.to_string(),
                accepts_personal: false,
                behaviour: Behaviour::Answer(HashMap::new()),
                calls: Arc::clone(calls),
            }
        }

        fn failing(name: &str, calls: &Arc<Mutex<Vec<String>>>) -> Self {
            ScriptedProvider {
                behaviour: Behaviour::Fail,
                ..ScriptedProvider::answering(name, calls)
            }
        }

        fn hanging(name: &str, calls: &Arc<Mutex<Vec<String>>>) -> Self {
            ScriptedProvider {
                behaviour: Behaviour::Hang,
                ..ScriptedProvider::answering(name, calls)
            }
        }

        fn personal(mut self) -> Self {
            self.accepts_personal = true;
            self
        }

        fn with(mut self, id: &str, records: Vec<CandidateRecord>) -> Self {
            if let Behaviour::Answer(answers) = &mut self.behaviour {
                answers.insert(id.to_string(), records);
            }
            self
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn accepts_personal(&self) -> bool {
            self.accepts_personal
        }

        async fn query(&self, id: &LookupId) -> std::result::Result<Vec<CandidateRecord>, ProviderError> {
            self.calls.lock().unwrap().push(format!("{}:{}", self.name, id));
            match &self.behaviour {
                Behaviour::Answer(answers) => Ok(answers.get(id.as_str()).cloned().unwrap_or_default()),
                Behaviour::Fail => Err(ProviderError::Transport("connection refused".into())),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn record(name: &str, tax_id: &str) -> CandidateRecord {
        CandidateRecord::new(name, TaxId::parse(tax_id).unwrap())
    }

    fn create_test_engine(providers: Vec<ScriptedProvider>) -> ResolutionEngine {
        let providers: Vec<Arc<dyn Provider>> = providers
            .into_iter()
            .map(|p| Arc::new(p) as Arc<dyn Provider>)
            .collect();
        ResolutionEngine::new(providers).with_query_timeout(Duration::from_millis(50))
    }

    fn calls_log() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn taken(calls: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        calls.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_personal_number_resolves_first_candidate() {
        let calls = calls_log();
        let engine = create_test_engine(vec![ScriptedProvider::answering("A", &calls)
            .with("20471562735", vec![record("PEREZ JUAN", "20471562735")])]);

        let outcome = engine.resolve("47156273", None).await;

        assert_eq!(outcome.tax_id().unwrap().as_str(), "20471562735");
        assert_eq!(outcome.name(), Some("PEREZ JUAN"));
        assert!(matches!(outcome, Outcome::Resolved(_)));
        assert_eq!(taken(&calls), vec!["A:20471562735"]);
    }

    #[tokio::test]
    async fn test_unmatched_filter_returns_best_effort() {
        let calls = calls_log();
        let engine = create_test_engine(vec![ScriptedProvider::answering("A", &calls)
            .with("20471562735", vec![record("PEREZ JUAN", "20471562735")])]);

        let outcome = engine.resolve("47156273", Some("MARIA")).await;

        match outcome {
            Outcome::NoMatchBestEffort(rec) => {
                assert_eq!(rec.name, "PEREZ JUAN");
                assert_eq!(rec.source, "A");
            }
            other => panic!("expected best effort, got {:?}", other),
        }
        // every candidate was tried before giving up (27 has no valid digit)
        assert_eq!(taken(&calls), vec!["A:20471562735", "A:23471562734"]);
    }

    #[tokio::test]
    async fn test_full_id_falls_back_to_personal_number() {
        let calls = calls_log();
        let engine = create_test_engine(vec![
            ScriptedProvider::answering("A", &calls),
            ScriptedProvider::answering("B", &calls)
                .personal()
                .with("47156273", vec![record("PEREZ JUAN", "20471562735")]),
        ]);

        let outcome = engine.resolve("20-47156273-5", None).await;

        assert!(matches!(outcome, Outcome::Resolved(_)));
        assert_eq!(
            taken(&calls),
            vec![
                "A:20471562735",
                "B:20471562735",
                "A:23471562734",
                "B:47156273",
            ]
        );
    }

    #[tokio::test]
    async fn test_full_id_found_but_unmatched_does_not_fall_back() {
        let calls = calls_log();
        let engine = create_test_engine(vec![ScriptedProvider::answering("A", &calls)
            .with("20471562735", vec![record("PEREZ JUAN", "20471562735")])
            .with("23471562734", vec![record("PEREZ MARIA", "23471562734")])]);

        let outcome = engine.resolve("20471562735", Some("MARIA")).await;

        assert_eq!(outcome.label(), "no_match_best_effort");
        assert_eq!(outcome.records()[0].name, "PEREZ JUAN");
        assert_eq!(taken(&calls), vec!["A:20471562735"]);
    }

    #[tokio::test]
    async fn test_full_id_filter_moves_on_to_next_provider() {
        let calls = calls_log();
        let engine = create_test_engine(vec![
            ScriptedProvider::answering("A", &calls)
                .with("20471562735", vec![record("PEREZ JUAN", "20471562735")]),
            ScriptedProvider::answering("B", &calls)
                .with("20471562735", vec![record("PEREZ MARIA", "20471562735")]),
            ScriptedProvider::answering("C", &calls)
                .personal()
                .with("47156273", vec![record("PEREZ MARIA", "20471562735")]),
        ]);

        match engine.resolve("20471562735", Some("maria")).await {
            Outcome::FilteredSingle(rec) => {
                assert_eq!(rec.name, "PEREZ MARIA");
                assert_eq!(rec.source, "B");
                assert_eq!(rec.source_rank, 1);
            }
            other => panic!("expected filtered single, got {:?}", other),
        }
        assert_eq!(taken(&calls), vec!["A:20471562735", "B:20471562735"]);
    }

    #[tokio::test]
    async fn test_invalid_input_touches_no_provider() {
        let calls = calls_log();
        let engine = create_test_engine(vec![ScriptedProvider::answering("A", &calls)]);

        assert_eq!(
            engine.resolve("12AB", None).await,
            Outcome::InvalidInput(InvalidInput::NonNumeric)
        );
        assert_eq!(
            engine.resolve("12345", None).await,
            Outcome::InvalidInput(InvalidInput::BadLength(5))
        );
        assert!(taken(&calls).is_empty());
    }

    #[tokio::test]
    async fn test_best_effort_comes_from_higher_priority_provider() {
        let calls = calls_log();
        let engine = create_test_engine(vec![
            ScriptedProvider::answering("A", &calls)
                .with("23471562734", vec![record("PEREZ JUAN", "23471562734")]),
            ScriptedProvider::answering("B", &calls)
                .with("20471562735", vec![record("GOMEZ PEDRO", "20471562735")]),
        ]);

        let outcome = engine.resolve("47156273", Some("MARIA")).await;

        match outcome {
            Outcome::NoMatchBestEffort(rec) => {
                assert_eq!(rec.name, "PEREZ JUAN");
                assert_eq!(rec.source, "A");
                assert_eq!(rec.source_rank, 0);
            }
            other => panic!("expected best effort, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_filter_picks_from_winning_provider_only() {
        let calls = calls_log();
        let engine = create_test_engine(vec![
            ScriptedProvider::answering("A", &calls),
            ScriptedProvider::answering("B", &calls).personal().with(
                "47156273",
                vec![
                    record("PEREZ JUAN", "20471562735"),
                    record("GOMEZ ANA", "23471562734"),
                    record("PEREZ JUANA", "23471562734"),
                ],
            ),
        ]);

        match engine.resolve("47156273", Some("juan")).await {
            Outcome::FilteredMultiple(records) => {
                let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
                assert_eq!(names, vec!["PEREZ JUAN", "PEREZ JUANA"]);
                assert!(records.iter().all(|r| r.source == "B" && r.source_rank == 1));
            }
            other => panic!("expected filtered multiple, got {:?}", other),
        }

        match engine.resolve("47156273", Some("Gómez")).await {
            Outcome::FilteredSingle(rec) => assert_eq!(rec.name, "GOMEZ ANA"),
            other => panic!("expected filtered single, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_filter_multiple_records() {
        let calls = calls_log();
        let engine = create_test_engine(vec![ScriptedProvider::answering("A", &calls).personal().with(
            "47156273",
            vec![
                record("PEREZ JUAN", "20471562735"),
                record("PEREZ JUANA", "23471562734"),
            ],
        )]);

        let outcome = engine.resolve("47156273", None).await;
        assert_eq!(outcome.label(), "resolved_multiple");
        assert_eq!(outcome.records().len(), 2);

        // a blank filter is no filter
        let outcome = engine.resolve("47156273", Some("   ")).await;
        assert_eq!(outcome.label(), "resolved_multiple");
    }

    #[tokio::test]
    async fn test_show_all_policy() {
        let calls = calls_log();
        let engine = create_test_engine(vec![ScriptedProvider::answering("A", &calls).personal().with(
            "47156273",
            vec![
                record("PEREZ JUAN", "20471562735"),
                record("PEREZ JUANA", "23471562734"),
            ],
        )])
        .with_no_match_policy(NoMatchPolicy::ShowAll);

        match engine.resolve("47156273", Some("MARIA")).await {
            Outcome::NoMatchShowAll(records) => assert_eq!(records.len(), 2),
            other => panic!("expected show all, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_every_query_failing_surfaces_last_failure() {
        let calls = calls_log();
        let engine = create_test_engine(vec![
            ScriptedProvider::failing("A", &calls),
            ScriptedProvider::failing("B", &calls),
        ]);

        match engine.resolve("47156273", None).await {
            Outcome::ProviderError { provider, reason } => {
                assert_eq!(provider, "B");
                assert!(reason.contains("connection refused"));
            }
            other => panic!("expected provider error, got {:?}", other),
        }
        assert_eq!(taken(&calls).len(), 4);
    }

    #[tokio::test]
    async fn test_failure_is_skipped_when_another_provider_answers() {
        let calls = calls_log();
        let engine = create_test_engine(vec![
            ScriptedProvider::failing("A", &calls),
            ScriptedProvider::answering("B", &calls),
        ]);

        assert_eq!(engine.resolve("47156273", None).await, Outcome::NotFound);

        let calls = calls_log();
        let engine = create_test_engine(vec![
            ScriptedProvider::failing("A", &calls),
            ScriptedProvider::answering("B", &calls)
                .with("20471562735", vec![record("PEREZ JUAN", "20471562735")]),
        ]);

        let outcome = engine.resolve("47156273", None).await;
        assert_eq!(outcome.resolved_record().unwrap().source, "B");
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let calls = calls_log();
        let engine = create_test_engine(vec![ScriptedProvider::hanging("slow", &calls).personal()]);

        match engine.resolve("47156273", None).await {
            Outcome::ProviderError { provider, reason } => {
                assert_eq!(provider, "slow");
                assert!(reason.contains("timed out after 50 ms"));
            }
            other => panic!("expected provider error, got {:?}", other),
        }

        let calls = calls_log();
        let engine = create_test_engine(vec![
            ScriptedProvider::hanging("slow", &calls).personal(),
            ScriptedProvider::answering("fast", &calls)
                .with("20471562735", vec![record("PEREZ JUAN", "20471562735")]),
        ]);
        assert_eq!(engine.resolve("47156273", None).await.name(), Some("PEREZ JUAN"));
    }

    #[tokio::test]
    async fn test_no_providers_is_not_found() {
        let engine = ResolutionEngine::new(Vec::new());
        assert_eq!(engine.resolve("20471562735", None).await, Outcome::NotFound);
    }

    #[tokio::test]
    async fn test_resolve_batch_keeps_input_order() {
        let provider = MemoryProvider::with_records(
            "memory",
            vec![
                record("PEREZ JUAN", "20471562735"),
                record("LOPEZ EVA", "20012345675"),
            ],
        );
        let engine = Arc::new(
            ResolutionEngine::new(vec![Arc::new(provider) as Arc<dyn Provider>])
                .with_batch_concurrency(2),
        );

        let outcomes = engine
            .resolve_batch(vec![
                ResolveRequest::new("47156273", None),
                ResolveRequest::new("12AB", None),
                ResolveRequest::new("1234567", Some("eva")),
                ResolveRequest::new("30111222", None),
            ])
            .await;

        let labels: Vec<&str> = outcomes.iter().map(|o| o.label()).collect();
        assert_eq!(
            labels,
            vec!["resolved", "invalid_input", "filtered_single", "not_found"]
        );
    }

    #[tokio::test]
    async fn test_from_config_builds_providers_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("people.csv");
        std::fs::write(&csv_path, "name,tax_id\nPEREZ JUAN,20471562735\n").unwrap();

        let config = ResolverConfig::from_toml_str(&format!(
            "query_timeout_ms = 750\n\n[[providers]]\nkind = \"csv\"\nname = \"extract\"\npath = {:?}\n",
            csv_path.display().to_string()
        ))
        .unwrap();

        let engine = ResolutionEngine::from_config(&config).unwrap();
        assert_eq!(engine.provider_names(), vec!["extract"]);
        assert_eq!(engine.query_timeout(), Duration::from_millis(750));

        let outcome = engine.resolve("47156273", Some("juan perez")).await;
        assert_eq!(outcome.label(), "filtered_single");
    }
}
