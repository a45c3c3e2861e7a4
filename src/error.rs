// Error types shared by the engine and the provider adapters
//
// Two shapes, never conflated:
//   InvalidInput   - the caller's identifier is malformed (pure validation)
//   ProviderError  - a single provider query failed (transport, parse, auth...)
// "No data" is NOT an error: providers return an empty Vec for that.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a raw identifier was rejected before any provider was queried
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", content = "length", rename_all = "snake_case")]
pub enum InvalidInput {
    /// Something other than digits remained after stripping separators
    #[error("non-numeric")]
    NonNumeric,

    /// Digit count is neither 7-9 (personal number) nor 11 (tax ID)
    #[error("bad length: {0} digits (expected 7-9 or 11)")]
    BadLength(usize),
}

/// Failure of one provider query
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network / HTTP level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The source answered but the payload could not be understood
    #[error("parse error: {0}")]
    Parse(String),

    /// The query did not finish within its budget
    #[error("timed out after {0} ms")]
    Timeout(u64),

    /// Credentials were rejected or could not be acquired
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Local storage (CSV file, SQLite) could not be read
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Parse(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for ProviderError {
    fn from(err: rusqlite::Error) -> Self {
        ProviderError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_messages() {
        assert_eq!(InvalidInput::NonNumeric.to_string(), "non-numeric");
        assert_eq!(
            InvalidInput::BadLength(5).to_string(),
            "bad length: 5 digits (expected 7-9 or 11)"
        );
    }

    #[test]
    fn test_invalid_input_serializes_with_reason_tag() {
        let json = serde_json::to_value(InvalidInput::BadLength(5)).unwrap();
        assert_eq!(json["reason"], "bad_length");
        assert_eq!(json["length"], 5);

        let json = serde_json::to_value(InvalidInput::NonNumeric).unwrap();
        assert_eq!(json["reason"], "non_numeric");
    }

    #[test]
    fn test_provider_error_messages() {
        assert_eq!(ProviderError::Timeout(250).to_string(), "timed out after 250 ms");
        assert!(ProviderError::Auth("expired".into())
            .to_string()
            .contains("expired"));
    }
}
