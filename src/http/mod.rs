//! HTTP layer module
//!
//! Provides the request/response model the paginator drives, plus a
//! reqwest-backed connector.
//!
//! # Features
//!
//! - **Request templates**: Clone-able requests with query, headers and JSON body
//! - **Response hooks**: Per-request callbacks run once when a response arrives
//! - **Sync and async dispatch**: `Connector::send` awaits in place, `send_async`
//!   spawns the round-trip and hands back a `ResponseFuture`

mod connector;
mod hooks;
mod request;
mod response;

pub use connector::{
    send_async, Connector, ConnectorConfig, ConnectorConfigBuilder, HttpConnector, ResponseFuture,
};
pub use hooks::{ResponseHook, ResponseHooks};
pub use request::Request;
pub use response::Response;

#[cfg(test)]
mod tests;
