//! Request templates
//!
//! A `Request` describes one outgoing call relative to a connector's base
//! URL. Paginators keep one as a template and clone it per page.

use super::hooks::{ResponseHook, ResponseHooks};
use crate::types::{JsonValue, Method, StringMap};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An outgoing HTTP request
///
/// Hooks are runtime-only and never serialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Request {
    /// HTTP method
    #[serde(default)]
    pub method: Method,
    /// Path relative to the connector base URL, or an absolute URL
    pub path: String,
    /// Query parameters
    #[serde(default, skip_serializing_if = "StringMap::is_empty")]
    pub query: StringMap,
    /// Request headers
    #[serde(default, skip_serializing_if = "StringMap::is_empty")]
    pub headers: StringMap,
    /// JSON body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonValue>,
    #[serde(skip)]
    hooks: ResponseHooks,
}

impl Request {
    /// Create a new request
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a GET request
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Create a POST request
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_query(key, value);
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(key, value);
        self
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    /// Set or replace a query parameter in place
    pub fn set_query(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.insert(key.into(), value.into());
    }

    /// Set or replace a header in place
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    /// Set a top-level field on the JSON body, creating an object body if needed
    ///
    /// A non-object body is replaced.
    pub fn set_body_field(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        let body = self
            .body
            .get_or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
        if !body.is_object() {
            *body = JsonValue::Object(serde_json::Map::new());
        }
        if let JsonValue::Object(map) = body {
            map.insert(key.into(), value.into());
        }
    }

    /// Get a query parameter
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Register a hook to run when this request's response arrives
    pub fn on_response(&mut self, hook: impl ResponseHook + 'static) {
        self.hooks.push(Arc::new(hook));
    }

    /// Register a hook, builder style
    #[must_use]
    pub fn with_hook(mut self, hook: impl ResponseHook + 'static) -> Self {
        self.on_response(hook);
        self
    }

    /// Hooks attached to this request
    pub fn hooks(&self) -> &ResponseHooks {
        &self.hooks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = Request::get("/superheroes")
            .query("per_page", "5")
            .header("Accept", "application/json")
            .json(json!({"filter": "flying"}));

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/superheroes");
        assert_eq!(request.query_param("per_page"), Some("5"));
        assert_eq!(
            request.headers.get("Accept"),
            Some(&"application/json".to_string())
        );
        assert_eq!(request.body, Some(json!({"filter": "flying"})));
    }

    #[test]
    fn test_set_body_field() {
        let mut request = Request::post("/search");
        request.set_body_field("page", 2);
        assert_eq!(request.body, Some(json!({"page": 2})));

        let mut request = Request::post("/search").json(json!({"q": "bat"}));
        request.set_body_field("page", 3);
        assert_eq!(request.body, Some(json!({"q": "bat", "page": 3})));

        let mut request = Request::post("/search").json(json!(["not", "an", "object"]));
        request.set_body_field("page", 1);
        assert_eq!(request.body, Some(json!({"page": 1})));
    }

    #[test]
    fn test_clone_does_not_touch_original() {
        let template = Request::get("/items").query("page", "1");
        let mut page_two = template.clone();
        page_two.set_query("page", "2");
        page_two.on_response(|_: &crate::http::Response| -> crate::Result<()> { Ok(()) });

        assert_eq!(template.query_param("page"), Some("1"));
        assert!(template.hooks().is_empty());
        assert_eq!(page_two.hooks().len(), 1);
    }

    #[test]
    fn test_serialization_skips_hooks() {
        let request = Request::get("/items")
            .query("per_page", "10")
            .with_hook(|_: &crate::http::Response| -> crate::Result<()> { Ok(()) });

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, json!({"method": "GET", "path": "/items", "query": {"per_page": "10"}}));

        let restored: Request = serde_json::from_value(json).unwrap();
        assert!(restored.hooks().is_empty());
        assert_eq!(restored.query_param("per_page"), Some("10"));
    }
}
