//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use crate::error::{Error, Result};
use crate::http::{Request, Response};
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};

/// What the paginator knows when asking a strategy about a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageContext {
    /// Logical page the response belongs to (1-based)
    pub page: u32,
    /// Items counted so far, including this page
    pub total_results: u64,
}

/// Hooks a concrete pagination variant plugs into the paginator
///
/// The paginator owns the page counter, dispatch and counting; a strategy
/// only says how a page is requested, where its items are and when to stop.
pub trait PaginationStrategy: Clone + Send + Sync + 'static {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Encode the cursor for `page` into a clone of the request template
    fn apply_pagination(&self, request: Request, page: u32) -> Request;

    /// Termination predicate used in synchronous mode
    fn is_last_page(&self, response: &Response, context: &PageContext) -> Result<bool>;

    /// Pull the item collection out of a page
    fn page_items(&self, response: &Response) -> Result<Vec<JsonValue>>;

    /// Whether this strategy can be paginated with prefetching
    fn supports_async(&self) -> bool {
        false
    }

    /// Total page count reported by the first page, used in async mode
    fn total_pages(&self, _response: &Response) -> Result<u32> {
        Err(Error::AsyncUnsupported {
            strategy: self.name().to_string(),
        })
    }

    /// Called after a page is yielded, with that page's response
    fn on_next(&mut self, _response: &Response) -> Result<()> {
        Ok(())
    }

    /// Called on rewind to restore the resume point
    fn on_rewind(&mut self) {}

    /// Called when a snapshot is taken to freeze the current position
    fn on_snapshot(&mut self) {}

    /// Check that a request template can be paginated by this strategy
    fn validate(&self, _request: &Request) -> Result<()> {
        Ok(())
    }
}

/// Where a pagination parameter is written on the outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    /// Query string parameter
    #[default]
    Query,
    /// Top-level field of the JSON body
    Body,
    /// Request header
    Header,
}

impl ParamLocation {
    /// Write `key = value` onto the request
    pub fn apply(self, request: &mut Request, key: &str, value: impl Into<JsonValue>) {
        let value = value.into();
        match self {
            ParamLocation::Query => request.set_query(key, value_to_param(&value)),
            ParamLocation::Header => request.set_header(key, value_to_param(&value)),
            ParamLocation::Body => request.set_body_field(key, value),
        }
    }

    /// Whether the request already carries `key` at this location
    pub fn is_set(self, request: &Request, key: &str) -> bool {
        match self {
            ParamLocation::Query => request.query.contains_key(key),
            ParamLocation::Header => request.headers.contains_key(key),
            ParamLocation::Body => request
                .body
                .as_ref()
                .and_then(JsonValue::as_object)
                .is_some_and(|map| map.contains_key(key)),
        }
    }
}

fn value_to_param(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Stop conditions for pagination
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopCondition {
    /// Stop when page is empty (no records)
    #[default]
    EmptyPage,

    /// Stop when a field has a specific value
    Field {
        /// Path to the field
        path: String,
        /// Expected value to stop
        value: JsonValue,
    },

    /// Stop when the items seen so far reach a total count
    TotalCount {
        /// Path to total count field
        path: String,
    },

    /// Stop when page number reaches total pages
    TotalPages {
        /// Path to total pages field
        path: String,
    },
}

impl StopCondition {
    /// Create a field-based stop condition
    pub fn field(path: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::Field {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Create a total count stop condition
    pub fn total_count(path: impl Into<String>) -> Self {
        Self::TotalCount { path: path.into() }
    }

    /// Create a total pages stop condition
    pub fn total_pages(path: impl Into<String>) -> Self {
        Self::TotalPages { path: path.into() }
    }
}

/// Result of checking a stop condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopResult {
    /// Continue pagination
    Continue,
    /// Stop pagination
    Stop,
}

impl StopResult {
    /// Check if we should continue
    pub fn should_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    /// Check if we should stop
    pub fn should_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

/// Check a stop condition against a decoded page
pub fn check_stop_condition(
    condition: &StopCondition,
    body: &JsonValue,
    records_count: usize,
    context: &PageContext,
) -> StopResult {
    let stop = match condition {
        StopCondition::EmptyPage => records_count == 0,
        StopCondition::Field { path, value } => {
            extract_path(body, path).is_some_and(|field| &field == value)
        }
        StopCondition::TotalCount { path } => extract_u64(body, path)
            .is_some_and(|total| context.total_results >= total),
        StopCondition::TotalPages { path } => extract_u64(body, path)
            .is_some_and(|total_pages| u64::from(context.page) >= total_pages),
    };

    if stop {
        StopResult::Stop
    } else {
        StopResult::Continue
    }
}

// ============================================================================
// Path helpers
// ============================================================================

/// Extract a value using simple dot-notation path
///
/// Supports `a.b`, a leading `$.`, and array indexing like `data[0]` or
/// `data[-1]`.
pub fn extract_path(value: &JsonValue, path: &str) -> Option<JsonValue> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    if path.is_empty() || path == "$" {
        return Some(value.clone());
    }

    let mut current = value;
    for part in path.split('.') {
        if let Some(bracket_pos) = part.find('[') {
            let name = &part[..bracket_pos];
            let index_str = part[bracket_pos + 1..].strip_suffix(']')?;

            if !name.is_empty() {
                current = current.get(name)?;
            }

            let index = index_str.parse::<i64>().ok()?;
            let JsonValue::Array(arr) = current else {
                return None;
            };
            #[allow(clippy::cast_possible_wrap)]
            let idx = if index < 0 {
                arr.len() as i64 + index
            } else {
                index
            };
            current = arr.get(usize::try_from(idx).ok()?)?;
        } else {
            current = current.get(part)?;
        }
    }

    Some(current.clone())
}

/// Extract a scalar as a string (strings, numbers and booleans)
pub fn extract_string(value: &JsonValue, path: &str) -> Option<String> {
    match extract_path(value, path)? {
        JsonValue::String(s) => Some(s),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extract a non-negative integer, accepting numeric strings
pub fn extract_u64(value: &JsonValue, path: &str) -> Option<u64> {
    match extract_path(value, path)? {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Extract the item array of a page
///
/// Wildcard paths go through jsonpath-rust. A missing path or a non-array
/// value is a malformed page, never an empty one.
pub fn extract_items(value: &JsonValue, path: &str) -> Result<Vec<JsonValue>> {
    if path.contains('*') {
        return extract_with_jsonpath(value, path);
    }

    match extract_path(value, path) {
        Some(JsonValue::Array(items)) => Ok(items),
        Some(other) => Err(Error::malformed_page(
            path,
            format!("expected an array, found {}", json_kind(&other)),
        )),
        None => Err(Error::malformed_page(path, "field not found")),
    }
}

/// Extract items using jsonpath-rust
fn extract_with_jsonpath(value: &JsonValue, path: &str) -> Result<Vec<JsonValue>> {
    use jsonpath_rust::JsonPath;

    let path = if path.starts_with('$') {
        path.to_string()
    } else {
        format!("$.{path}")
    };

    let jp = JsonPath::try_from(path.as_str())
        .map_err(|e| Error::json_path(format!("Invalid JSONPath: {e}")))?;

    match jp.find(value) {
        JsonValue::Array(arr) => Ok(arr),
        JsonValue::Null => Ok(vec![]),
        other => Ok(vec![other]),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
