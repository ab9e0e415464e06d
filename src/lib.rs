// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Solidafy Pager
//!
//! Resumable pagination over HTTP APIs.
//!
//! ## Features
//!
//! - **Pagination strategies**: Page number, offset/limit and cursor
//! - **Item counting on arrival**: Every page's items are tallied as soon as
//!   its response lands, including prefetched pages
//! - **Fail fast**: A failed page raises immediately and ends the sequence
//! - **Async prefetching**: Keep one page in flight ahead of the consumer
//! - **Snapshots**: Serialize a paginator's position and resume it later,
//!   in another process if needed
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_pager::http::{ConnectorConfig, HttpConnector, Request};
//! use solidafy_pager::pagination::{PageNumberStrategy, Paginator, StopCondition};
//!
//! #[tokio::main]
//! async fn main() -> solidafy_pager::Result<()> {
//!     let connector = HttpConnector::with_config(
//!         ConnectorConfig::builder().base_url("https://api.example.com").build(),
//!     )?;
//!     let strategy = PageNumberStrategy::default()
//!         .with_stop_condition(StopCondition::field("has_more", false));
//!
//!     let mut paginator = Paginator::new(&connector, &Request::get("/superheroes"), strategy);
//!     let heroes = paginator.collect_items().await?;
//!
//!     // Save the position and pick it up later
//!     let snapshot = paginator.snapshot().to_json()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Paginator                           │
//! │  next_page() → ResponseFuture   items() / pages() streams   │
//! │  snapshot() → PaginatorSnapshot   resume(snapshot)          │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//! ┌────────────────┬────────────┴───────────┬──────────────────┐
//! │   Strategies   │      Interceptor       │       HTTP       │
//! ├────────────────┼────────────────────────┼──────────────────┤
//! │ Page Number    │ throw on failure       │ Connector trait  │
//! │ Offset         │ count items on arrival │ reqwest client   │
//! │ Cursor         │                        │ send / send_async│
//! └────────────────┴────────────────────────┴──────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the pager
pub mod error;

/// Common types and type aliases
pub mod types;

/// Requests, responses and connectors
pub mod http;

/// Paginator and pagination strategies
pub mod pagination;

/// Config files
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{load_config, load_config_from_str, PagerConfig};
pub use http::{Connector, HttpConnector, Request, Response};
pub use pagination::{Paginator, PaginatorSnapshot, Strategy};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
