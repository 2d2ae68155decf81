//! Normalization of verifier findings into [`Violation`] records.

use crate::models::{RawFinding, Violation};
use serde_json::Value as Json;

/// Reduce a resource path to its bare file name: the query string and any
/// directory prefix are dropped. Synthetic labels such as `(embedded-js-0)`
/// pass through unchanged.
pub fn resource_label(path: &str) -> &str {
    let no_query = path.split_once('?').map_or(path, |(p, _)| p);
    no_query.rsplit_once('/').map_or(no_query, |(_, file)| file)
}

/// Map one raw finding to a [`Violation`].
///
/// `message_field` names the field holding the human-readable reason
/// (`"message"` for markup verifiers, `"reason"` for script verifiers, ...).
/// Missing fields degrade to zero/empty values.
pub fn normalize(raw: &RawFinding, resource: &str, message_field: &str) -> Violation {
    Violation {
        resource: resource_label(resource).to_string(),
        line: raw.get("line").and_then(Json::as_u64).unwrap_or(0),
        reason: raw
            .get(message_field)
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string(),
        evidence: raw
            .get("evidence")
            .and_then(Json::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        raw: raw.clone(),
    }
}

/// Normalize a whole findings collection, skipping `null` placeholders.
pub fn normalize_all(findings: &[RawFinding], resource: &str, message_field: &str) -> Vec<Violation> {
    findings
        .iter()
        .filter(|f| !f.is_null())
        .map(|f| normalize(f, resource, message_field))
        .collect()
}
