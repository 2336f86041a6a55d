//! Username canonicalization used for every identity comparison.
//!
//! The service is case-preserving but case-insensitive about usernames,
//! and records occasionally arrive with stray whitespace. All equality
//! checks in the conversation engine go through here; raw string
//! comparison of usernames is a bug.

/// Canonical form of a username: trimmed, lowercased.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Whether two usernames refer to the same identity.
///
/// A name that is empty after trimming matches nothing, not even another
/// empty name. Malformed records must never group together just because
/// both sides are blank.
pub fn same_identity(a: &str, b: &str) -> bool {
    let a = normalize(a);
    if a.is_empty() {
        return false;
    }
    a == normalize(b)
}
