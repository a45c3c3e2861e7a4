// Identifier normalization
//
// A raw input is either a bare personal number (7-9 digits) or a full
// 11-digit tax ID (prefix + personal number + check digit). Separators
// ("20-47156273-5", "20 47156273 5") are stripped first; any other
// non-digit, dots included, makes the input non-numeric.

use crate::checksum;
use crate::error::InvalidInput;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the personal-number field inside a tax ID
pub const PERSONAL_WIDTH: usize = 8;

/// Digit count of a full tax ID
pub const TAX_ID_LEN: usize = 11;

// ============================================================================
// ID KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    /// 7-9 digit national ID number
    Personal,
    /// 11 digit checksummed tax ID
    Full,
}

impl IdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdKind::Personal => "personal",
            IdKind::Full => "full",
        }
    }
}

// ============================================================================
// PERSONAL NUMBER
// ============================================================================

/// Bare national ID number, digits exactly as the caller typed them
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonalNumber(String);

impl PersonalNumber {
    /// Build from already-stripped digits. Length must be 7-9.
    pub fn new(digits: &str) -> Result<Self, InvalidInput> {
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvalidInput::NonNumeric);
        }
        match digits.len() {
            7..=9 => Ok(PersonalNumber(digits.to_string())),
            n => Err(InvalidInput::BadLength(n)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Zero-padded 8-digit form used inside a tax ID
    ///
    /// A 9-digit number only fits when its extra leading digit is a zero;
    /// otherwise there is no embeddable form and `None` is returned.
    pub fn padded(&self) -> Option<String> {
        let significant = self.0.trim_start_matches('0');
        if significant.len() > PERSONAL_WIDTH {
            return None;
        }
        Some(format!("{:0>width$}", significant, width = PERSONAL_WIDTH))
    }
}

impl fmt::Display for PersonalNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// TAX ID
// ============================================================================

/// 11-digit tax ID: prefix(2) + personal(8) + check digit(1)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxId(String);

impl TaxId {
    /// Parse a tax ID, accepting the usual separators ("20-47156273-5")
    ///
    /// The check digit is NOT validated here: registries do hold records
    /// with odd check digits, and dropping them would hide real people.
    /// Use `has_valid_check_digit` when that matters.
    pub fn parse(raw: &str) -> Result<Self, InvalidInput> {
        let digits = strip_separators(raw);
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvalidInput::NonNumeric);
        }
        if digits.len() != TAX_ID_LEN {
            return Err(InvalidInput::BadLength(digits.len()));
        }
        Ok(TaxId(digits))
    }

    /// Assemble from parts produced by the calculator
    pub(crate) fn from_parts(prefix: u8, padded_personal: &str, check_digit: u8) -> Self {
        TaxId(format!("{:02}{}{}", prefix, padded_personal, check_digit))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Two-digit category prefix ("20", "27", "23", ...)
    pub fn prefix(&self) -> &str {
        &self.0[..2]
    }

    /// Zero-padded personal number field
    pub fn personal_digits(&self) -> &str {
        &self.0[2..10]
    }

    /// Personal number embedded in this tax ID (fallback path)
    pub fn personal(&self) -> PersonalNumber {
        PersonalNumber(self.personal_digits().to_string())
    }

    pub fn check_digit(&self) -> u8 {
        self.0.as_bytes()[10] - b'0'
    }

    /// Hyphenated display form: "20-47156273-5"
    pub fn formatted(&self) -> String {
        format!("{}-{}-{}", self.prefix(), self.personal_digits(), self.check_digit())
    }

    /// Whether the check digit agrees with the modulo-11 rule for its prefix
    pub fn has_valid_check_digit(&self) -> bool {
        let prefix: u8 = match self.prefix().parse() {
            Ok(p) => p,
            Err(_) => return false,
        };
        checksum::check_digit(prefix, self.personal_digits()) == Some(self.check_digit())
    }
}

impl fmt::Display for TaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TaxId {
    type Error = InvalidInput;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TaxId::parse(&value)
    }
}

impl From<TaxId> for String {
    fn from(id: TaxId) -> Self {
        id.0
    }
}

// ============================================================================
// LOOKUP ID (normalizer output / provider query key)
// ============================================================================

/// A validated identifier, classified by kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LookupId {
    Personal(PersonalNumber),
    Full(TaxId),
}

impl LookupId {
    pub fn kind(&self) -> IdKind {
        match self {
            LookupId::Personal(_) => IdKind::Personal,
            LookupId::Full(_) => IdKind::Full,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LookupId::Personal(p) => p.as_str(),
            LookupId::Full(t) => t.as_str(),
        }
    }
}

impl fmt::Display for LookupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate and classify a raw identifier
///
/// - strips hyphens and whitespace
/// - any other non-digit → `InvalidInput::NonNumeric`
/// - 11 digits → `Full`, 7-9 digits → `Personal`, else `BadLength`
pub fn normalize(raw: &str) -> Result<LookupId, InvalidInput> {
    let digits = strip_separators(raw);

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(InvalidInput::NonNumeric);
    }

    match digits.len() {
        TAX_ID_LEN => Ok(LookupId::Full(TaxId(digits))),
        7..=9 => Ok(LookupId::Personal(PersonalNumber(digits))),
        n => Err(InvalidInput::BadLength(n)),
    }
}

fn strip_separators(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
