// Identity Resolver - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod audit;          // Resolution audit trail (SQLite)
pub mod checksum;       // Tax-ID candidate calculation (mod 11)
pub mod config;         // TOML + env configuration
pub mod error;
pub mod identifier;     // Raw input → personal number / tax ID
pub mod name_match;     // Fuzzy name filter
pub mod orchestrator;   // Provider waterfall
pub mod outcome;
pub mod providers;      // Provider trait + CSV / SQLite / HTTP / memory adapters
pub mod token;          // Expiring access-token cache

// Re-export commonly used types
pub use audit::{AuditLog, Event};
pub use checksum::{candidates, check_digit, Prefix};
pub use config::{ProviderConfig, ResolverConfig, TokenConfig};
pub use error::{InvalidInput, ProviderError};
pub use identifier::{normalize, IdKind, LookupId, PersonalNumber, TaxId};
pub use name_match::{matches, normalize_name, NameFilter};
pub use orchestrator::{ResolutionEngine, ResolveRequest};
pub use outcome::{CandidateRecord, NoMatchPolicy, Outcome};
pub use providers::{
    build_provider, CsvProvider, HttpProvider, MemoryProvider, Provider, SqliteProvider,
};
pub use token::{Token, TokenCache, TokenSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
