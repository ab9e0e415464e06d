//! Resumable paginator state
//!
//! A snapshot is everything a paginator needs to carry on except the
//! connector (supplied again on resume) and the last response (transient).

use crate::error::{Error, Result};
use crate::http::Request;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Current snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable paginator state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatorSnapshot<S> {
    /// Format version
    pub(crate) version: u32,
    /// Request template, without hooks
    pub(crate) request: Request,
    /// Strategy, including any cursor it carries
    pub(crate) strategy: S,
    /// Page the resumed paginator starts from
    pub(crate) starting_page: u32,
    /// Items received before `starting_page`
    pub(crate) total_results: u64,
    /// Whether the caller opted into async pagination
    #[serde(default)]
    pub(crate) async_enabled: bool,
    /// Whether the sequence had already ended
    #[serde(default)]
    pub(crate) exhausted: bool,
}

impl<S> PaginatorSnapshot<S> {
    /// Page the resumed paginator starts from
    pub fn starting_page(&self) -> u32 {
        self.starting_page
    }

    /// Items received before the resume point
    pub fn total_results(&self) -> u64 {
        self.total_results
    }

    /// Whether the sequence had already ended
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Request template the paginator was built with
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Strategy state at snapshot time
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub(crate) fn check_version(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(Error::resume_mismatch(format!(
                "snapshot version {} is not supported (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        if self.starting_page == 0 {
            return Err(Error::resume_mismatch("starting page must be at least 1"));
        }
        Ok(())
    }
}

impl<S: Serialize> PaginatorSnapshot<S> {
    /// Encode as JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::snapshot(format!("Failed to serialize snapshot: {e}")))
    }

    /// Encode as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::snapshot(format!("Failed to serialize snapshot: {e}")))
    }
}

impl<S: DeserializeOwned> PaginatorSnapshot<S> {
    /// Decode from JSON
    ///
    /// A snapshot taken with a different strategy type fails here.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::snapshot(format!("Failed to parse snapshot: {e}")))
    }
}
