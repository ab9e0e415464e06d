//! Pagination module
//!
//! Supports: Page Number, Offset, Cursor
//!
//! # Overview
//!
//! A [`Paginator`] turns one request template into a lazy sequence of
//! pages. Strategies decide how each page is encoded and when the sequence
//! ends; the paginator drives the fetches, counts items as pages arrive and
//! can snapshot its position so a later process can resume it.

mod interceptor;
mod paginator;
mod snapshot;
mod strategies;
mod types;

pub use interceptor::ThrowAndCountItems;
pub use paginator::{Collected, Paginator, PaginatorStatus};
pub use snapshot::{PaginatorSnapshot, SNAPSHOT_VERSION};
pub use strategies::{CursorStrategy, OffsetStrategy, PageNumberStrategy, Strategy};
pub use types::{
    check_stop_condition, extract_items, extract_path, extract_string, extract_u64, PageContext,
    PaginationStrategy, ParamLocation, StopCondition, StopResult,
};
