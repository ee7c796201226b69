//! util
//!
//! Small stateless helpers shared across the crate.
//!
//! - [`log`]: namespaced diagnostic logging (`Truck.<module>@<method>: ...`)
//! - [`join_url`]: join URL segments with exactly one slash between them
//! - [`key_segment`]: render a primary key value as a path segment
//! - [`is_empty_body`]: decide whether a response body carries no entity
//! - [`loose_eq`]: compare lookup values the way a query string would

use std::fmt::Display;

use serde_json::Value;

/// Log target used for every diagnostic emitted by the model layer.
pub const LOG_TARGET: &str = "truck";

/// Emit a namespaced diagnostic.
///
/// Diagnostics are warnings about expected, locally handled conditions
/// (empty responses, wrong-typed models, lookup misses). They never abort
/// the operation that produced them.
///
/// # Example
///
/// ```
/// truck::util::log("ModelCollection", "delete", "Model couldn't be found in collection.");
/// ```
pub fn log(module: &str, method: &str, msg: impl Display) {
    tracing::warn!(target: LOG_TARGET, "Truck.{}@{}: {}", module, method, msg);
}

/// Join URL segments.
///
/// Empty segments are skipped, slashes at segment boundaries collapse to a
/// single `/`, and a leading slash or scheme on the first segment is kept.
///
/// # Example
///
/// ```
/// use truck::util::join_url;
///
/// assert_eq!(join_url(["https://api.dev/api/", "/resume", "1"]), "https://api.dev/api/resume/1");
/// assert_eq!(join_url(["/", "resume"]), "/resume");
/// assert_eq!(join_url(["/resume/1", "", "sync"]), "/resume/1/sync");
/// ```
pub fn join_url<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Option<String> = None;

    for part in parts {
        let part = part.as_ref();
        if part.is_empty() {
            continue;
        }

        match out.as_mut() {
            None => out = Some(part.trim_end_matches('/').to_string()),
            Some(url) => {
                let trimmed = part.trim_matches('/');
                if trimmed.is_empty() {
                    continue;
                }
                url.push('/');
                url.push_str(trimmed);
            }
        }
    }

    match out {
        Some(url) if url.is_empty() => "/".to_string(),
        Some(url) => url,
        None => String::new(),
    }
}

/// Render a primary key value as a URL path segment.
///
/// Returns `None` for an absent key (null or empty string).
pub fn key_segment(key: &Value) -> Option<String> {
    match key {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Whether a response body carries no entity at all.
///
/// Null, an empty string and `false` count as empty. An empty object does
/// not: it still hydrates into an instance.
pub fn is_empty_body(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Bool(b) => !b,
        _ => false,
    }
}

/// Whether a field value counts as missing for an existing entity.
///
/// `false` and `0` are meaningful and therefore not blank.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Compare two values for lookups.
///
/// Equal values match. A number and a string match when they render to the
/// same path segment, so `1` finds `"1"`. With `ignore_case`, strings are
/// compared case-insensitively.
pub fn loose_eq(a: &Value, b: &Value, ignore_case: bool) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => ignore_case && x.to_lowercase() == y.to_lowercase(),
        (Value::String(_), Value::Number(_)) | (Value::Number(_), Value::String(_)) => {
            key_segment(a) == key_segment(b)
        }
        _ => false,
    }
}
