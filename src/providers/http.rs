// HTTP registry provider
//
// Queries a JSON web service:
//
//   GET {base_url}?id=<digits>&kind=<personal|full>
//   Authorization: Bearer <token>          (when a token source is set)
//
//   200 {"records": [{"name": "...", "tax_id": "...", "birth_date": "..."}]}
//   404 → no record
//   401/403 → cached token dropped, query fails with Auth
//
// Tokens come from an OAuth client-credentials endpoint and are cached
// until shortly before they expire.

use super::csv_file::parse_birth_date;
use super::Provider;
use crate::config::TokenConfig;
use crate::error::ProviderError;
use crate::identifier::{LookupId, TaxId};
use crate::outcome::CandidateRecord;
use crate::token::{Token, TokenCache, TokenSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde::Deserialize;

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Debug, Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<WireRecord>,
}

#[derive(Debug, Deserialize)]
struct WireRecord {
    name: String,
    tax_id: String,
    #[serde(default)]
    birth_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Convert wire records, skipping rows whose tax_id is unusable
fn into_candidates(provider: &str, records: Vec<WireRecord>) -> Vec<CandidateRecord> {
    records
        .into_iter()
        .filter_map(|wire| match TaxId::parse(&wire.tax_id) {
            Ok(tax_id) => {
                let mut record = CandidateRecord::new(wire.name, tax_id);
                if let Some(date) = wire.birth_date.as_deref().and_then(parse_birth_date) {
                    record = record.with_birth_date(date);
                }
                Some(record)
            }
            Err(e) => {
                tracing::warn!(provider, tax_id = %wire.tax_id, error = %e, "Skipping record with invalid tax_id");
                None
            }
        })
        .collect()
}

// ============================================================================
// TOKEN SOURCE
// ============================================================================

pub struct HttpTokenSource {
    client: reqwest::Client,
    url: String,
    client_id: String,
    client_secret: String,
    default_ttl_secs: i64,
}

impl HttpTokenSource {
    pub fn new(
        url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        HttpTokenSource {
            client: reqwest::Client::new(),
            url: url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            default_ttl_secs: crate::config::DEFAULT_TOKEN_TTL_SECS as i64,
        }
    }

    /// Build from config, reading the secret from the named env variable
    pub fn from_config(config: &TokenConfig) -> Result<Self> {
        let secret = std::env::var(&config.client_secret_env).with_context(|| {
            format!(
                "Client secret variable {} is not set",
                config.client_secret_env
            )
        })?;

        let mut source = HttpTokenSource::new(&config.url, &config.client_id, secret);
        source.default_ttl_secs = config.ttl_secs as i64;
        Ok(source)
    }
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    async fn fetch(&self) -> Result<Token, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Auth(format!(
                "token endpoint answered {}",
                status
            )));
        }

        let body: TokenResponse = response.json().await?;
        let ttl = body.expires_in.unwrap_or(self.default_ttl_secs);

        Ok(Token::new(body.access_token, Utc::now() + Duration::seconds(ttl)))
    }
}

// ============================================================================
// PROVIDER
// ============================================================================

pub struct HttpProvider {
    name: String,
    base_url: reqwest::Url,
    accepts_personal: bool,
    client: reqwest::Client,
    tokens: Option<TokenCache<HttpTokenSource>>,
}

impl HttpProvider {
    pub fn new(name: &str, base_url: &str) -> Result<Self> {
        let base_url = reqwest::Url::parse(base_url)
            .with_context(|| format!("Invalid base_url {:?} for provider {}", base_url, name))?;

        Ok(HttpProvider {
            name: name.to_string(),
            base_url,
            accepts_personal: false,
            client: reqwest::Client::new(),
            tokens: None,
        })
    }

    /// Builder pattern: allow bare personal-number searches
    pub fn with_personal_search(mut self, accepts: bool) -> Self {
        self.accepts_personal = accepts;
        self
    }

    /// Builder pattern: authenticate every query with a cached bearer token
    pub fn with_token_source(mut self, source: HttpTokenSource) -> Self {
        self.tokens = Some(TokenCache::new(source));
        self
    }

    fn request_url(&self, id: &LookupId) -> reqwest::Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("id", id.as_str())
            .append_pair("kind", id.kind().as_str());
        url
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_personal(&self) -> bool {
        self.accepts_personal
    }

    async fn query(&self, id: &LookupId) -> Result<Vec<CandidateRecord>, ProviderError> {
        let mut request = self.client.get(self.request_url(id));

        if let Some(tokens) = &self.tokens {
            request = request.bearer_auth(tokens.acquire().await?);
        }

        let response = request.send().await?;
        let status = response.status();

        match status {
            StatusCode::NOT_FOUND => return Ok(Vec::new()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                if let Some(tokens) = &self.tokens {
                    tokens.invalidate().await;
                }
                return Err(ProviderError::Auth(format!("{} rejected credentials ({})", self.name, status)));
            }
            s if !s.is_success() => {
                return Err(ProviderError::Transport(format!("{} answered {}", self.name, status)));
            }
            _ => {}
        }

        let body: RecordsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(into_candidates(&self.name, body.records))
    }
}
