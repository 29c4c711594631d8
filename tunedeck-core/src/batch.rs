//! Batch track-id normalization for multi-track URL requests.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasher;
use tracing::debug;

pub const BATCH_MESSAGE_SEPARATOR: &str = "; ";

/// Status code a batch audio response carries on success
const BATCH_SUCCESS_CODE: i64 = 200;

/// Result of normalizing caller-supplied track ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResolutionMaps {
    /// raw id -> canonical id, only for ids that parsed
    pub normalized: HashMap<String, String>,
    /// Distinct ids in first-seen order; one backend request entry each
    pub request_ids: Vec<i64>,
    /// Raw ids that failed to parse, in input order
    pub invalid: Vec<String>,
}

/// Parse raw ids into canonical integer ids.
///
/// Invalid ids never abort the batch, they are collected in
/// [`BatchResolutionMaps::invalid`].
#[must_use]
pub fn normalize_track_ids<S: AsRef<str>>(raw_ids: &[S]) -> BatchResolutionMaps {
    let mut maps = BatchResolutionMaps::default();
    let mut seen = HashSet::new();

    for raw in raw_ids {
        let raw = raw.as_ref();
        match raw.trim().parse::<i64>() {
            Ok(id) => {
                maps.normalized.insert(raw.to_string(), id.to_string());
                if seen.insert(id) {
                    maps.request_ids.push(id);
                }
            }
            Err(e) => {
                debug!("Skipping invalid track id {raw:?}: {e}");
                maps.invalid.push(raw.to_string());
            }
        }
    }

    maps
}

/// Re-expand backend results (keyed by canonical id) to every raw id that
/// normalized to a resolved id, duplicates included.
#[must_use]
pub fn project_urls<N: BuildHasher, B: BuildHasher>(
    normalized: &HashMap<String, String, N>,
    backend_urls: &HashMap<String, String, B>,
) -> HashMap<String, String> {
    normalized
        .iter()
        .filter_map(|(raw, canonical)| {
            backend_urls
                .get(canonical)
                .map(|url| (raw.clone(), url.clone()))
        })
        .collect()
}

/// Summarize what went wrong in a batch, or `""` when every id got a URL.
///
/// `total` counts every raw id, `succeeded` those that got a URL and
/// `invalid` those that failed to parse. Whatever else failed had no
/// playable source.
#[must_use]
pub fn describe_partial_failure(total: usize, succeeded: usize, invalid: usize) -> String {
    let failed = total.saturating_sub(succeeded);
    if failed == 0 {
        return String::new();
    }

    let sourceless = failed.saturating_sub(invalid);
    let mut parts = Vec::with_capacity(2);

    if invalid > 0 {
        parts.push(if invalid == 1 {
            "1 track id is invalid".to_string()
        } else {
            format!("{invalid} track ids are invalid")
        });
    }
    if sourceless > 0 {
        parts.push(if sourceless == 1 {
            "1 track has no playable source".to_string()
        } else {
            format!("{sourceless} tracks have no playable source")
        });
    }

    parts.join(BATCH_MESSAGE_SEPARATOR)
}

/// Read `{ "code": 200, "data": [{ "id": .., "url": .. }] }` into canonical
/// id -> URL. Entries without an id or with an empty URL are skipped.
#[must_use]
pub fn extract_track_urls(payload: &Value) -> HashMap<String, String> {
    if payload.get("code").and_then(Value::as_i64) != Some(BATCH_SUCCESS_CODE) {
        return HashMap::new();
    }

    let Some(entries) = payload.get("data").and_then(Value::as_array) else {
        return HashMap::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let id = match entry.get("id")? {
                Value::Number(n) => n.to_string(),
                Value::String(s) if !s.is_empty() => s.clone(),
                _ => return None,
            };
            let url = entry.get("url").and_then(Value::as_str)?;
            (!url.is_empty()).then(|| (id, url.to_string()))
        })
        .collect()
}
