//! Validators for caller-supplied identifiers and search input.

/// Returns `true` if `id` is a positive identifier.
///
/// `kind` names the entity (e.g. `"movie"`) in the warning logged on rejection.
#[must_use]
pub fn is_valid_id(id: i64, kind: &str) -> bool {
    if id <= 0 {
        tracing::warn!(id, kind, "Invalid {kind} ID received.");
        return false;
    }
    true
}

/// Returns `true` if `query` contains anything besides whitespace.
#[must_use]
pub fn is_valid_search_query(query: &str) -> bool {
    if query.trim().is_empty() {
        tracing::warn!("Empty search query received.");
        return false;
    }
    true
}
