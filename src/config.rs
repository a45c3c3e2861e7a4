// ⚙️ Resolver Configuration
//
// One TOML file describes which providers exist and in which priority
// order they are consulted. The `[[providers]]` array order IS the
// waterfall order.
//
// Environment overrides (applied after the file is read):
//   IDENTITY_RESOLVER_PRIMARY=<name>     → move that provider to the front
//   IDENTITY_RESOLVER_TIMEOUT_MS=<ms>    → per-query timeout

use crate::outcome::NoMatchPolicy;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "IDENTITY_RESOLVER_CONFIG";
pub const ENV_PRIMARY: &str = "IDENTITY_RESOLVER_PRIMARY";
pub const ENV_TIMEOUT_MS: &str = "IDENTITY_RESOLVER_TIMEOUT_MS";

pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

fn default_query_timeout_ms() -> u64 {
    DEFAULT_QUERY_TIMEOUT_MS
}

fn default_token_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

// ============================================================================
// TOP-LEVEL CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    #[serde(default)]
    pub no_match_policy: NoMatchPolicy,

    /// Optional SQLite file receiving one event per resolution
    #[serde(default)]
    pub audit_db: Option<PathBuf>,

    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            no_match_policy: NoMatchPolicy::default(),
            audit_db: None,
            providers: Vec::new(),
        }
    }
}

// ============================================================================
// PROVIDERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    Csv {
        name: String,
        path: PathBuf,
        #[serde(default)]
        accepts_personal: bool,
    },
    Sqlite {
        name: String,
        path: PathBuf,
        #[serde(default)]
        accepts_personal: bool,
    },
    Http {
        name: String,
        base_url: String,
        #[serde(default)]
        accepts_personal: bool,
        #[serde(default)]
        token: Option<TokenConfig>,
    },
}

impl ProviderConfig {
    pub fn name(&self) -> &str {
        match self {
            ProviderConfig::Csv { name, .. }
            | ProviderConfig::Sqlite { name, .. }
            | ProviderConfig::Http { name, .. } => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProviderConfig::Csv { .. } => "csv",
            ProviderConfig::Sqlite { .. } => "sqlite",
            ProviderConfig::Http { .. } => "http",
        }
    }
}

/// OAuth client-credentials settings of an HTTP provider
///
/// The secret itself never lives in the file; `client_secret_env` names
/// the environment variable holding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub url: String,
    pub client_id: String,
    pub client_secret_env: String,

    /// Used when the token endpoint does not send `expires_in`
    #[serde(default = "default_token_ttl_secs")]
    pub ttl_secs: u64,
}

// ============================================================================
// LOADING
// ============================================================================

impl ResolverConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ResolverConfig =
            toml::from_str(contents).context("Failed to parse resolver config")?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file and apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config = ResolverConfig::from_toml_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.apply_env()?;

        tracing::info!(
            path = %path.display(),
            providers = config.providers.len(),
            "Loaded resolver config"
        );

        Ok(config)
    }

    /// Config file if a path is given, otherwise defaults (plus env)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => ResolverConfig::from_file(path),
            None => {
                let mut config = ResolverConfig::default();
                config.apply_env()?;
                Ok(config)
            }
        }
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(raw) = std::env::var(ENV_TIMEOUT_MS) {
            self.query_timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of milliseconds", ENV_TIMEOUT_MS))?;
        }

        if let Ok(primary) = std::env::var(ENV_PRIMARY) {
            let primary = primary.trim();
            if !primary.is_empty() {
                self.apply_primary(primary)?;
            }
        }

        Ok(())
    }

    /// Move the named provider to the front, keeping the rest in order
    pub fn apply_primary(&mut self, name: &str) -> Result<()> {
        let Some(index) = self.providers.iter().position(|p| p.name() == name) else {
            bail!("Primary provider {:?} is not configured", name);
        };

        let provider = self.providers.remove(index);
        self.providers.insert(0, provider);
        Ok(())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.query_timeout_ms == 0 {
            bail!("query_timeout_ms must be greater than zero");
        }

        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.name()) {
                bail!("Duplicate provider name {:?}", provider.name());
            }
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
