//! Cache key normalization.
//!
//! Cache tiers treat keys as opaque exact-match strings; normalization
//! happens once at the caller boundary so "ua456 " and "UA456" address the
//! same entry.

/// Normalize a flight identifier into canonical cache-key form.
///
/// Trims surrounding whitespace and uppercases the remainder. Returns `None`
/// for blank input — a malformed lookup key is a routine miss, not an error.
pub fn normalize_key(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_ascii_uppercase())
}
