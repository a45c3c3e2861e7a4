// Tax ID candidate calculator
//
// Given a bare personal number, derive every plausible 11-digit tax ID:
// one per allowed prefix, each with its modulo-11 check digit.
//
//   base   = prefix ++ zero_pad(personal, 8)          (10 digits)
//   sum    = Σ base[i] * [5,4,3,2,7,6,5,4,3,2][i]
//   r      = sum mod 11
//   check  = 0        if r == 0
//          = 9        if r == 1 and prefix == 23
//          = (skip)   if r == 1 otherwise
//          = 11 - r   else
//
// The "23 with remainder 1 → 9" case is how the registry assigns IDs for
// that prefix.

use crate::identifier::{PersonalNumber, TaxId};
use serde::{Deserialize, Serialize};

const WEIGHTS: [u32; 10] = [5, 4, 3, 2, 7, 6, 5, 4, 3, 2];

// ============================================================================
// PREFIX
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prefix {
    /// 20 - individual (male)
    Male,
    /// 27 - individual (female)
    Female,
    /// 23 - either; also absorbs the remainder-1 case
    Either,
}

impl Prefix {
    /// Priority order: the two individual prefixes first, "either" last
    pub const PRIORITY: [Prefix; 3] = [Prefix::Male, Prefix::Female, Prefix::Either];

    pub fn code(&self) -> u8 {
        match self {
            Prefix::Male => 20,
            Prefix::Female => 27,
            Prefix::Either => 23,
        }
    }
}

// ============================================================================
// CHECK DIGIT
// ============================================================================

/// Check digit for `prefix` + 8-digit `padded_personal`, or `None` when the
/// combination has no valid check digit.
pub fn check_digit(prefix: u8, padded_personal: &str) -> Option<u8> {
    if padded_personal.len() != 8 || !padded_personal.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let base = format!("{:02}{}", prefix, padded_personal);
    let sum: u32 = base
        .bytes()
        .zip(WEIGHTS.iter())
        .map(|(b, w)| u32::from(b - b'0') * w)
        .sum();

    match sum % 11 {
        0 => Some(0),
        1 if prefix == Prefix::Either.code() => Some(9),
        1 => None,
        r => Some((11 - r) as u8),
    }
}

/// Ordered tax-ID candidates for a personal number (at most one per prefix)
///
/// Example:
/// ```
/// use identity_resolver::{candidates, PersonalNumber};
///
/// let personal = PersonalNumber::new("47156273").unwrap();
/// let ids: Vec<String> = candidates(&personal).iter().map(|t| t.to_string()).collect();
/// assert_eq!(ids, vec!["20471562735", "23471562734"]);
/// ```
pub fn candidates(personal: &PersonalNumber) -> Vec<TaxId> {
    let padded = match personal.padded() {
        Some(p) => p,
        None => return Vec::new(),
    };

    Prefix::PRIORITY
        .iter()
        .filter_map(|prefix| {
            check_digit(prefix.code(), &padded)
                .map(|dv| TaxId::from_parts(prefix.code(), &padded, dv))
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
