//! CLI commands and argument parsing

use crate::types::LogLevel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Solidafy Pager CLI
#[derive(Parser, Debug)]
#[command(name = "solidafy-pager")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pager config file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log level (overrides --verbose)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Level the subscriber is installed with
    pub fn tracing_level(&self) -> tracing::Level {
        match self.log_level {
            Some(level) => level.into(),
            None if self.verbose => tracing::Level::DEBUG,
            None => tracing::Level::INFO,
        }
    }
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch pages and print them as JSON lines
    Fetch {
        /// Print individual items instead of whole pages
        #[arg(long)]
        items: bool,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,

        /// Write a resumable snapshot here when done
        #[arg(long)]
        snapshot_out: Option<PathBuf>,

        /// Resume from a snapshot instead of starting fresh
        #[arg(long)]
        resume: Option<PathBuf>,
    },

    /// Validate the config file
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from([
            "solidafy-pager",
            "--config",
            "pager.yaml",
            "fetch",
            "--items",
            "--max-pages",
            "3",
            "--snapshot-out",
            "snap.json",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("pager.yaml")));
        assert_eq!(cli.format, OutputFormat::Json);
        let Commands::Fetch {
            items,
            max_pages,
            snapshot_out,
            resume,
        } = cli.command
        else {
            panic!("Expected fetch");
        };
        assert!(items);
        assert_eq!(max_pages, Some(3));
        assert_eq!(snapshot_out, Some(PathBuf::from("snap.json")));
        assert!(resume.is_none());
    }

    #[test]
    fn test_tracing_level() {
        let cli = Cli::try_parse_from(["solidafy-pager", "validate"]).unwrap();
        assert_eq!(cli.tracing_level(), tracing::Level::INFO);

        let cli = Cli::try_parse_from(["solidafy-pager", "-v", "validate"]).unwrap();
        assert_eq!(cli.tracing_level(), tracing::Level::DEBUG);

        let cli =
            Cli::try_parse_from(["solidafy-pager", "-v", "--log-level", "warn", "validate"]).unwrap();
        assert_eq!(cli.tracing_level(), tracing::Level::WARN);
    }
}
