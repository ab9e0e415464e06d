//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_config, PagerConfig};
use crate::error::{Error, Result, ResultExt};
use crate::http::Connector;
use crate::pagination::{PaginationStrategy, Paginator, PaginatorSnapshot, Strategy};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Fetch {
                items,
                max_pages,
                snapshot_out,
                resume,
            } => {
                self.fetch(
                    *items,
                    *max_pages,
                    snapshot_out.as_deref(),
                    resume.as_deref(),
                )
                .await
            }
            Commands::Validate => self.validate(),
        }
    }

    /// Load the pager config
    fn load_config(&self) -> Result<PagerConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -c flag)"))?;
        load_config(path)
    }

    /// Fetch pages, optionally resuming and saving a snapshot
    async fn fetch(
        &self,
        items: bool,
        max_pages: Option<usize>,
        snapshot_out: Option<&Path>,
        resume: Option<&Path>,
    ) -> Result<()> {
        let config = self.load_config()?;
        let connector = config.build_connector()?;

        let mut paginator = match resume {
            Some(path) => {
                let json = fs::read_to_string(path).map_err(|e| {
                    Error::snapshot(format!(
                        "Failed to read snapshot '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
                Paginator::resume(&connector, PaginatorSnapshot::<Strategy>::from_json(&json)?)?
            }
            None => config.build_paginator(&connector)?,
        };

        let items = if items && paginator.is_async_enabled() {
            info!("Async pagination yields whole pages, printing pages instead of items");
            false
        } else {
            items
        };

        let outcome = self.drain(&mut paginator, items, max_pages).await;

        // Saved on failure too, so a rerun retries the failed page
        if let Some(path) = snapshot_out {
            let snapshot = paginator.snapshot();
            fs::write(path, snapshot.to_json_pretty()?)
                .with_context(|| format!("Failed to write snapshot '{}'", path.display()))?;
            info!(
                "Snapshot saved to {} (resumes at page {})",
                path.display(),
                snapshot.starting_page()
            );
        }

        let pages = outcome?;
        info!(
            "Fetched {} pages, {} results in total",
            pages,
            paginator.total_results()
        );
        Ok(())
    }

    async fn drain<C: Connector>(
        &self,
        paginator: &mut Paginator<C, Strategy>,
        items: bool,
        max_pages: Option<usize>,
    ) -> Result<usize> {
        let first_page = paginator.page();
        let mut pages = 0;

        while max_pages.map_or(true, |max| pages < max) {
            let Some(response) = paginator.next_response().await else {
                break;
            };
            let response = response?;
            let page = first_page as usize + pages;
            pages += 1;

            if items {
                for item in paginator.strategy().page_items(&response)? {
                    self.output_message(&item);
                }
            } else {
                self.output_message(&json!({
                    "type": "PAGE",
                    "page": page,
                    "status": response.status(),
                    "body": response.json_value()?,
                }));
            }
        }

        Ok(pages)
    }

    /// Validate the config file
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Config is valid: {} pagination of {} {}{}",
                    config.pagination.name(),
                    config.request.method,
                    config.base_url.trim_end_matches('/'),
                    config.request.path
                ),
            },
            "pagination": config.pagination,
            "async": config.async_enabled,
        }));

        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
