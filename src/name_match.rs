// 🔤 Name Matcher - does a free-text filter match a registry name?
//
// Registry names come back as "PEREZ JUAN CARLOS", callers type "jonatan",
// "josé", "carriso". The matcher is deliberately permissive and
// word-anchored: it is asymmetric (filter vs. name), not a similarity score.

use strsim::levenshtein;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Filters up to this many characters only match as prefix/substring
const SHORT_FILTER_LEN: usize = 3;

/// Filters up to this many characters tolerate a single edit, longer ones two
const ONE_EDIT_MAX_LEN: usize = 6;

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalize a name for comparison
///
/// - Unicode NFKD decomposition
/// - Drop combining marks (accents)
/// - Lowercase
/// - Collapse whitespace
///
/// Example: "  José   PÉREZ " → "jose perez"
pub fn normalize_name(s: &str) -> String {
    let stripped: String = s
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// MATCHING
// ============================================================================

/// Does `filter` flexibly match `candidate_name`?
///
/// Evaluated in order, first hit wins:
/// 1. filter is a substring of the name
/// 2. per word `w` of the name:
///    a. short filter (≤3 chars): prefix of `w` or substring of `w`
///    b. filter ⊂ `w` or `w` ⊂ filter
///    c. edit distance(filter, `w`) within tolerance (1 if ≤6 chars, else 2)
///    d. edit distance(filter, first len(filter) chars of `w`) within tolerance
pub fn matches(filter: &str, candidate_name: &str) -> bool {
    matches_normalized(&normalize_name(filter), &normalize_name(candidate_name))
}

/// Same as `matches`, for inputs already passed through `normalize_name`
pub fn matches_normalized(filter: &str, name: &str) -> bool {
    if name.contains(filter) {
        return true;
    }

    let filter_len = filter.chars().count();
    let tolerance = if filter_len <= ONE_EDIT_MAX_LEN { 1 } else { 2 };

    for word in name.split_whitespace() {
        if filter_len <= SHORT_FILTER_LEN {
            if word.starts_with(filter) || word.contains(filter) {
                return true;
            }
            continue;
        }

        if word.contains(filter) || filter.contains(word) {
            return true;
        }

        if levenshtein(filter, word) <= tolerance {
            return true;
        }

        // "JONATAN" typed against "JONATHANS": compare against the word's head
        if word.chars().count() >= filter_len {
            let head: String = word.chars().take(filter_len).collect();
            if levenshtein(filter, &head) <= tolerance {
                return true;
            }
        }
    }

    false
}

// ============================================================================
// NAME FILTER
// ============================================================================

/// Caller-supplied name filter, normalized once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFilter {
    raw: String,
    normalized: String,
}

impl NameFilter {
    /// Build a filter; blank input means "no filter" and yields `None`
    pub fn new(raw: &str) -> Option<Self> {
        let normalized = normalize_name(raw);
        if normalized.is_empty() {
            return None;
        }
        Some(NameFilter {
            raw: raw.trim().to_string(),
            normalized,
        })
    }

    /// The filter as the caller typed it (trimmed)
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn matches(&self, candidate_name: &str) -> bool {
        matches_normalized(&self.normalized, &normalize_name(candidate_name))
    }
}

// ============================================================================
// TESTS
// ============================================================================
