//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{
    check_stop_condition, extract_items, extract_string, extract_u64, PageContext,
    PaginationStrategy, ParamLocation, StopCondition,
};
use crate::error::{Error, Result};
use crate::http::{Request, Response};
use crate::types::JsonValue;
use serde::{Deserialize, Serialize};

fn default_items_path() -> String {
    "data".to_string()
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_start_page() -> u32 {
    1
}

fn default_offset_param() -> String {
    "offset".to_string()
}

fn default_limit_param() -> String {
    "limit".to_string()
}

fn default_cursor_param() -> String {
    "cursor".to_string()
}

fn default_cursor_path() -> String {
    "next_cursor".to_string()
}

/// Decode the body and its items once for termination checks
fn decode_page(
    response: &Response,
    items_path: &str,
) -> Result<(JsonValue, Vec<JsonValue>)> {
    let body = response.json_value()?;
    let items = extract_items(&body, items_path)?;
    Ok((body, items))
}

// ============================================================================
// Page Number Pagination
// ============================================================================

/// Page number pagination (e.g., traditional web pagination)
///
/// Uses page number parameter to paginate.
/// Common patterns:
/// - `?page=2`
/// - `?page=2&per_page=50`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageNumberStrategy {
    /// Path to the item array in each page
    #[serde(default = "default_items_path")]
    pub items_path: String,
    /// Parameter name for page number
    #[serde(default = "default_page_param")]
    pub page_param: String,
    /// Number the API gives its first page (usually 0 or 1)
    #[serde(default = "default_start_page")]
    pub start_page: u32,
    /// Where the page parameters are written
    #[serde(default)]
    pub location: ParamLocation,
    /// Optional page size parameter name
    #[serde(default)]
    pub page_size_param: Option<String>,
    /// Page size; a shorter page ends pagination
    #[serde(default)]
    pub page_size: Option<u32>,
    /// Stop condition
    #[serde(default)]
    pub stop_condition: StopCondition,
    /// Path to the total page count, enables async pagination
    #[serde(default)]
    pub total_pages_path: Option<String>,
}

impl Default for PageNumberStrategy {
    fn default() -> Self {
        Self {
            items_path: default_items_path(),
            page_param: default_page_param(),
            start_page: default_start_page(),
            location: ParamLocation::default(),
            page_size_param: None,
            page_size: None,
            stop_condition: StopCondition::default(),
            total_pages_path: None,
        }
    }
}

impl PageNumberStrategy {
    /// Create a new page number strategy
    pub fn new(items_path: impl Into<String>, page_param: impl Into<String>) -> Self {
        Self {
            items_path: items_path.into(),
            page_param: page_param.into(),
            ..Default::default()
        }
    }

    /// Set the number of the API's first page
    #[must_use]
    pub fn with_start_page(mut self, start_page: u32) -> Self {
        self.start_page = start_page;
        self
    }

    /// Set page size parameter
    #[must_use]
    pub fn with_page_size(mut self, param: impl Into<String>, size: u32) -> Self {
        self.page_size_param = Some(param.into());
        self.page_size = Some(size);
        self
    }

    /// Set stop condition
    #[must_use]
    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = condition;
        self
    }

    /// Read the total page count from this path, enabling async pagination
    #[must_use]
    pub fn with_total_pages(mut self, path: impl Into<String>) -> Self {
        self.total_pages_path = Some(path.into());
        self
    }

    /// Set where parameters are written
    #[must_use]
    pub fn with_location(mut self, location: ParamLocation) -> Self {
        self.location = location;
        self
    }

    /// Page number sent to the API for a logical page
    pub fn api_page(&self, page: u32) -> u32 {
        self.start_page + page.saturating_sub(1)
    }
}

impl PaginationStrategy for PageNumberStrategy {
    fn name(&self) -> &'static str {
        "page_number"
    }

    fn apply_pagination(&self, mut request: Request, page: u32) -> Request {
        self.location
            .apply(&mut request, &self.page_param, self.api_page(page));
        if let (Some(param), Some(size)) = (&self.page_size_param, self.page_size) {
            self.location.apply(&mut request, param, size);
        }
        request
    }

    fn is_last_page(&self, response: &Response, context: &PageContext) -> Result<bool> {
        let (body, items) = decode_page(response, &self.items_path)?;

        if check_stop_condition(&self.stop_condition, &body, items.len(), context).should_stop()
        {
            return Ok(true);
        }

        // If we have a page size and got fewer records, we're done
        if let Some(size) = self.page_size {
            if items.len() < size as usize {
                return Ok(true);
            }
        }

        if let Some(path) = &self.total_pages_path {
            if let Some(total) = extract_u64(&body, path) {
                return Ok(u64::from(context.page) >= total);
            }
        }

        Ok(false)
    }

    fn page_items(&self, response: &Response) -> Result<Vec<JsonValue>> {
        extract_items(&response.json_value()?, &self.items_path)
    }

    fn supports_async(&self) -> bool {
        self.total_pages_path.is_some()
    }

    fn total_pages(&self, response: &Response) -> Result<u32> {
        let Some(path) = &self.total_pages_path else {
            return Err(Error::AsyncUnsupported {
                strategy: self.name().to_string(),
            });
        };
        let body = response.json_value()?;
        extract_u64(&body, path)
            .map(|total| total.min(u64::from(u32::MAX)) as u32)
            .ok_or_else(|| Error::MissingTotalPages { path: path.clone() })
    }

    fn validate(&self, request: &Request) -> Result<()> {
        if self.location.is_set(request, &self.page_param) {
            return Err(Error::invalid_value(
                &self.page_param,
                "request template already sets the page parameter",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Offset Pagination
// ============================================================================

/// Offset-based pagination (e.g., SQL-style pagination)
///
/// Uses offset and limit parameters to paginate.
/// Common patterns:
/// - `?offset=100&limit=50`
/// - `?skip=100&take=50`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetStrategy {
    /// Path to the item array in each page
    #[serde(default = "default_items_path")]
    pub items_path: String,
    /// Parameter name for offset
    #[serde(default = "default_offset_param")]
    pub offset_param: String,
    /// Parameter name for limit
    #[serde(default = "default_limit_param")]
    pub limit_param: String,
    /// Number of records per page
    pub limit: u32,
    /// Where the parameters are written
    #[serde(default)]
    pub location: ParamLocation,
    /// Stop condition
    #[serde(default)]
    pub stop_condition: StopCondition,
    /// Path to the total record count, enables async pagination
    #[serde(default)]
    pub total_count_path: Option<String>,
}

impl OffsetStrategy {
    /// Create a new offset strategy
    pub fn new(items_path: impl Into<String>, limit: u32) -> Self {
        Self {
            items_path: items_path.into(),
            offset_param: default_offset_param(),
            limit_param: default_limit_param(),
            limit,
            location: ParamLocation::default(),
            stop_condition: StopCondition::default(),
            total_count_path: None,
        }
    }

    /// Set the offset and limit parameter names
    #[must_use]
    pub fn with_params(
        mut self,
        offset_param: impl Into<String>,
        limit_param: impl Into<String>,
    ) -> Self {
        self.offset_param = offset_param.into();
        self.limit_param = limit_param.into();
        self
    }

    /// Set stop condition
    #[must_use]
    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = condition;
        self
    }

    /// Read the total record count from this path, enabling async pagination
    #[must_use]
    pub fn with_total_count(mut self, path: impl Into<String>) -> Self {
        self.total_count_path = Some(path.into());
        self
    }

    /// Offset sent to the API for a logical page
    pub fn offset_for(&self, page: u32) -> u64 {
        u64::from(page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl PaginationStrategy for OffsetStrategy {
    fn name(&self) -> &'static str {
        "offset"
    }

    fn apply_pagination(&self, mut request: Request, page: u32) -> Request {
        self.location
            .apply(&mut request, &self.offset_param, self.offset_for(page));
        self.location
            .apply(&mut request, &self.limit_param, self.limit);
        request
    }

    fn is_last_page(&self, response: &Response, context: &PageContext) -> Result<bool> {
        let (body, items) = decode_page(response, &self.items_path)?;

        if check_stop_condition(&self.stop_condition, &body, items.len(), context).should_stop()
        {
            return Ok(true);
        }

        // If we got fewer records than limit, we're done
        if items.len() < self.limit as usize {
            return Ok(true);
        }

        if let Some(path) = &self.total_count_path {
            if let Some(total) = extract_u64(&body, path) {
                let seen = self.offset_for(context.page) + items.len() as u64;
                return Ok(seen >= total);
            }
        }

        Ok(false)
    }

    fn page_items(&self, response: &Response) -> Result<Vec<JsonValue>> {
        extract_items(&response.json_value()?, &self.items_path)
    }

    fn supports_async(&self) -> bool {
        self.total_count_path.is_some() && self.limit > 0
    }

    fn total_pages(&self, response: &Response) -> Result<u32> {
        let Some(path) = &self.total_count_path else {
            return Err(Error::AsyncUnsupported {
                strategy: self.name().to_string(),
            });
        };
        if self.limit == 0 {
            return Err(Error::invalid_value("limit", "must be greater than zero"));
        }
        let body = response.json_value()?;
        let total = extract_u64(&body, path)
            .ok_or_else(|| Error::MissingTotalPages { path: path.clone() })?;
        let pages = total.div_ceil(u64::from(self.limit));
        Ok(pages.min(u64::from(u32::MAX)) as u32)
    }

    fn validate(&self, request: &Request) -> Result<()> {
        if self.limit == 0 {
            return Err(Error::invalid_value("limit", "must be greater than zero"));
        }
        if self.location.is_set(request, &self.offset_param) {
            return Err(Error::invalid_value(
                &self.offset_param,
                "request template already sets the offset parameter",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Cursor-based pagination (e.g., Stripe, Slack)
///
/// Uses a cursor value from the response to fetch the next page.
/// Common patterns:
/// - `?starting_after=obj_123`
/// - `?cursor=abc123`
///
/// The first page is requested without a cursor parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorStrategy {
    /// Path to the item array in each page
    #[serde(default = "default_items_path")]
    pub items_path: String,
    /// Parameter name for cursor
    #[serde(default = "default_cursor_param")]
    pub cursor_param: String,
    /// Path to extract the next cursor from response
    #[serde(default = "default_cursor_path")]
    pub cursor_path: String,
    /// Where the cursor is written
    #[serde(default)]
    pub location: ParamLocation,
    /// Stop condition
    #[serde(default)]
    pub stop_condition: StopCondition,
    /// Cursor for the next request
    #[serde(default)]
    cursor: Option<String>,
    /// Cursor restored on rewind
    #[serde(default)]
    starting_cursor: Option<String>,
}

impl CursorStrategy {
    /// Create a new cursor strategy
    pub fn new(
        items_path: impl Into<String>,
        cursor_param: impl Into<String>,
        cursor_path: impl Into<String>,
    ) -> Self {
        Self {
            items_path: items_path.into(),
            cursor_param: cursor_param.into(),
            cursor_path: cursor_path.into(),
            location: ParamLocation::default(),
            stop_condition: StopCondition::default(),
            cursor: None,
            starting_cursor: None,
        }
    }

    /// Set stop condition
    #[must_use]
    pub fn with_stop_condition(mut self, condition: StopCondition) -> Self {
        self.stop_condition = condition;
        self
    }

    /// Set where the cursor is written
    #[must_use]
    pub fn with_location(mut self, location: ParamLocation) -> Self {
        self.location = location;
        self
    }

    /// Start from a known cursor instead of the first page
    #[must_use]
    pub fn starting_at(mut self, cursor: impl Into<String>) -> Self {
        let cursor = cursor.into();
        self.cursor = Some(cursor.clone());
        self.starting_cursor = Some(cursor);
        self
    }

    /// Cursor the next request will carry
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    fn next_cursor(&self, body: &JsonValue) -> Option<String> {
        extract_string(body, &self.cursor_path).filter(|cursor| !cursor.is_empty())
    }
}

impl PaginationStrategy for CursorStrategy {
    fn name(&self) -> &'static str {
        "cursor"
    }

    fn apply_pagination(&self, mut request: Request, _page: u32) -> Request {
        if let Some(cursor) = &self.cursor {
            self.location
                .apply(&mut request, &self.cursor_param, cursor.as_str());
        }
        request
    }

    fn is_last_page(&self, response: &Response, context: &PageContext) -> Result<bool> {
        let (body, items) = decode_page(response, &self.items_path)?;

        if check_stop_condition(&self.stop_condition, &body, items.len(), context).should_stop()
        {
            return Ok(true);
        }

        Ok(self.next_cursor(&body).is_none())
    }

    fn page_items(&self, response: &Response) -> Result<Vec<JsonValue>> {
        extract_items(&response.json_value()?, &self.items_path)
    }

    fn on_next(&mut self, response: &Response) -> Result<()> {
        let body = response.json_value()?;
        self.cursor = self.next_cursor(&body);
        Ok(())
    }

    fn on_rewind(&mut self) {
        self.cursor.clone_from(&self.starting_cursor);
    }

    fn on_snapshot(&mut self) {
        self.starting_cursor.clone_from(&self.cursor);
    }

    fn validate(&self, request: &Request) -> Result<()> {
        if self.location.is_set(request, &self.cursor_param) {
            return Err(Error::invalid_value(
                &self.cursor_param,
                "request template already sets the cursor parameter",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Any Strategy
// ============================================================================

/// One of the built-in strategies, selected by a `type` tag in config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Strategy {
    /// Page number pagination
    PageNumber(PageNumberStrategy),
    /// Offset/limit pagination
    Offset(OffsetStrategy),
    /// Continuation token pagination
    Cursor(CursorStrategy),
}

impl From<PageNumberStrategy> for Strategy {
    fn from(strategy: PageNumberStrategy) -> Self {
        Self::PageNumber(strategy)
    }
}

impl From<OffsetStrategy> for Strategy {
    fn from(strategy: OffsetStrategy) -> Self {
        Self::Offset(strategy)
    }
}

impl From<CursorStrategy> for Strategy {
    fn from(strategy: CursorStrategy) -> Self {
        Self::Cursor(strategy)
    }
}

macro_rules! delegate {
    ($self:expr, $inner:ident => $call:expr) => {
        match $self {
            Strategy::PageNumber($inner) => $call,
            Strategy::Offset($inner) => $call,
            Strategy::Cursor($inner) => $call,
        }
    };
}

impl PaginationStrategy for Strategy {
    fn name(&self) -> &'static str {
        delegate!(self, s => s.name())
    }

    fn apply_pagination(&self, request: Request, page: u32) -> Request {
        delegate!(self, s => s.apply_pagination(request, page))
    }

    fn is_last_page(&self, response: &Response, context: &PageContext) -> Result<bool> {
        delegate!(self, s => s.is_last_page(response, context))
    }

    fn page_items(&self, response: &Response) -> Result<Vec<JsonValue>> {
        delegate!(self, s => s.page_items(response))
    }

    fn supports_async(&self) -> bool {
        delegate!(self, s => s.supports_async())
    }

    fn total_pages(&self, response: &Response) -> Result<u32> {
        delegate!(self, s => s.total_pages(response))
    }

    fn on_next(&mut self, response: &Response) -> Result<()> {
        delegate!(self, s => s.on_next(response))
    }

    fn on_rewind(&mut self) {
        delegate!(self, s => s.on_rewind());
    }

    fn on_snapshot(&mut self) {
        delegate!(self, s => s.on_snapshot());
    }

    fn validate(&self, request: &Request) -> Result<()> {
        delegate!(self, s => s.validate(request))
    }
}
