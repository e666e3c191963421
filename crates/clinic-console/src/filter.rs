//! Free-text filter over a record's searchable fields.

use clinic_models::Resource;

/// Canonical form of a user query: trimmed and lower-cased.
#[must_use]
pub fn normalize_query(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Whether `record` matches an already-normalised query.
///
/// An empty query matches everything. Otherwise any searchable field must
/// contain the query as a case-insensitive substring.
#[must_use]
pub fn matches<R: Resource>(record: &R, query: &str) -> bool {
    query.is_empty()
        || record
            .search_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(query))
}

/// Indices of the records matching `query`, in collection order.
#[must_use]
pub fn visible_indices<R: Resource>(records: &[R], query: &str) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| matches(*record, query))
        .map(|(index, _)| index)
        .collect()
}
