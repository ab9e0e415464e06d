//! Pager configuration files
//!
//! A config file describes one paginated endpoint: where the API lives,
//! the request template, and how it is paginated.
//!
//! ```yaml
//! base_url: https://api.example.com
//! timeout_secs: 30
//! headers: { Accept: application/json }
//! request: { method: GET, path: /superheroes, query: { per_page: "5" } }
//! pagination:
//!   type: page_number
//!   items_path: data
//!   page_size: 5
//!   stop_condition: { type: field, path: has_more, value: false }
//! async: false
//! ```

use crate::error::{Error, Result};
use crate::http::{Connector, ConnectorConfig, HttpConnector, Request};
use crate::pagination::{PaginationStrategy, Paginator, Strategy};
use crate::types::StringMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

fn default_timeout_secs() -> u64 {
    30
}

/// One paginated endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagerConfig {
    /// Base URL for API requests
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: StringMap,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Request template for the first page
    pub request: Request,

    /// Pagination strategy
    pub pagination: Strategy,

    /// Prefetch pages ahead of the consumer
    #[serde(default, rename = "async")]
    pub async_enabled: bool,

    /// First logical page to fetch
    #[serde(default)]
    pub starting_page: Option<u32>,
}

impl PagerConfig {
    /// Check the config for values that can never work
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::missing_field("base_url"));
        }
        Url::parse(&self.base_url)
            .map_err(|e| Error::invalid_value("base_url", e.to_string()))?;

        if self.request.path.trim().is_empty() {
            return Err(Error::missing_field("request.path"));
        }

        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("timeout_secs", "must be greater than zero"));
        }

        if self.starting_page == Some(0) {
            return Err(Error::invalid_value("starting_page", "pages are numbered from 1"));
        }

        self.pagination
            .validate(&self.request)
            .map_err(|e| Error::invalid_value("pagination", e.to_string()))?;

        if self.async_enabled && !self.pagination.supports_async() {
            return Err(Error::invalid_value(
                "async",
                format!(
                    "strategy '{}' needs a total page or total count path to run async",
                    self.pagination.name()
                ),
            ));
        }

        Ok(())
    }

    /// HTTP settings for the connector
    pub fn connector_config(&self) -> ConnectorConfig {
        let mut builder = ConnectorConfig::builder()
            .base_url(&self.base_url)
            .timeout(Duration::from_secs(self.timeout_secs));
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent);
        }
        builder.build()
    }

    /// Build the reqwest-backed connector
    pub fn build_connector(&self) -> Result<HttpConnector> {
        HttpConnector::with_config(self.connector_config())
    }

    /// Build a paginator over `connector`
    pub fn build_paginator<C>(&self, connector: &C) -> Result<Paginator<C, Strategy>>
    where
        C: Connector + Clone,
    {
        let paginator = Paginator::new(connector, &self.request, self.pagination.clone())
            .starting_at(self.starting_page.unwrap_or(1));
        paginator.with_async(self.async_enabled)
    }
}

/// Load a pager config from a YAML or JSON file
///
/// Files ending in `.json` are parsed as JSON, everything else as YAML.
pub fn load_config(path: impl AsRef<Path>) -> Result<PagerConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    debug!("Loading {} config from {}", if is_json { "JSON" } else { "YAML" }, path.display());

    if is_json {
        let config: PagerConfig = serde_json::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    } else {
        load_config_from_str(&content)
    }
}

/// Load a pager config from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<PagerConfig> {
    let config: PagerConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse config YAML: {e}")))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{PageNumberStrategy, StopCondition};
    use crate::types::Method;
    use std::io::Write;
    use tempfile::Builder;

    const PAGE_NUMBER_YAML: &str = r#"
base_url: https://api.example.com
timeout_secs: 10
headers:
  Accept: application/json
request:
  method: GET
  path: /superheroes
  query:
    per_page: "5"
pagination:
  type: page_number
  items_path: data
  page_size: 5
  stop_condition:
    type: field
    path: has_more
    value: false
"#;

    #[test]
    fn test_load_from_str() {
        let config = load_config_from_str(PAGE_NUMBER_YAML).unwrap();

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.request.method, Method::GET);
        assert_eq!(config.request.query_param("per_page"), Some("5"));
        assert!(!config.async_enabled);

        let Strategy::PageNumber(strategy) = &config.pagination else {
            panic!("Expected page number strategy");
        };
        assert_eq!(strategy.page_param, "page");
        assert_eq!(strategy.page_size, Some(5));
        assert_eq!(
            strategy.stop_condition,
            StopCondition::field("has_more", false)
        );
    }

    #[test]
    fn test_connector_config() {
        let config = load_config_from_str(PAGE_NUMBER_YAML).unwrap();
        let http = config.connector_config();

        assert_eq!(http.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(http.timeout, Duration::from_secs(10));
        assert_eq!(
            http.default_headers.get("Accept"),
            Some(&"application/json".to_string())
        );
        assert!(config.build_connector().is_ok());
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(PAGE_NUMBER_YAML.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.request.path, "/superheroes");
    }

    #[test]
    fn test_load_json_file() {
        let json = serde_json::json!({
            "base_url": "https://api.example.com",
            "request": { "path": "/items" },
            "pagination": { "type": "offset", "limit": 20, "total_count_path": "total" },
            "async": true
        });
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(json.to_string().as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert!(config.async_enabled);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.pagination.supports_async());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/nonexistent/pager.yaml").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_invalid_yaml() {
        let err = load_config_from_str("base_url: [unclosed").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_validation_errors() {
        let base = load_config_from_str(PAGE_NUMBER_YAML).unwrap();

        let mut config = base.clone();
        config.base_url = String::new();
        assert!(matches!(
            config.validate(),
            Err(Error::MissingConfigField { .. })
        ));

        let mut config = base.clone();
        config.base_url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfigValue { .. })
        ));

        let mut config = base.clone();
        config.async_enabled = true;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfigValue { ref field, .. }) if field == "async"
        ));

        let mut config = base.clone();
        config.request = config.request.query("page", "2");
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfigValue { ref field, .. }) if field == "pagination"
        ));

        let mut config = base;
        config.starting_page = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_paginator() {
        let mut config = load_config_from_str(PAGE_NUMBER_YAML).unwrap();
        config.starting_page = Some(4);
        config.pagination = Strategy::PageNumber(
            PageNumberStrategy::default().with_total_pages("meta.pages"),
        );
        config.async_enabled = true;

        let connector = config.build_connector().unwrap();
        let paginator = config.build_paginator(&connector).unwrap();

        assert_eq!(paginator.page(), 4);
        assert_eq!(paginator.starting_page(), 4);
        assert!(paginator.is_async_enabled());
    }
}
