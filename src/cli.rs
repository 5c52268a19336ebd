//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// SiteScope - website quality scorecard dashboard
///
/// Loads a workbook of website-quality scores and presents averages,
/// correlations, top performers and a side-by-side comparison, either
/// as a live dashboard or as a single HTML/JSON file.
///
/// Examples:
///   sitescope
///   sitescope --data data_sites_web.xlsx --port 8080
///   sitescope --output rapport.html --select site-a.fr,site-b.fr
///   sitescope --output rapport.json --format json
///   sitescope --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Score workbook (xlsx, xls, ods)
    ///
    /// Defaults to data_sites_web.xlsx or the path in .sitescope.toml.
    #[arg(short, long, value_name = "FILE", env = "SITESCOPE_DATA")]
    pub data: Option<PathBuf>,

    /// Worksheet to read (first sheet if not set)
    #[arg(long, value_name = "NAME")]
    pub sheet: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .sitescope.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Render the report once to this file instead of serving the dashboard
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format for --output (html, json)
    #[arg(long, default_value = "html", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Sites to compare (comma-separated)
    ///
    /// Defaults to the first sites of the workbook.
    #[arg(short, long, value_name = "SITES", value_delimiter = ',')]
    pub select: Option<Vec<String>>,

    /// Number of sites in the top performers table
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Interface for the dashboard server
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Port for the dashboard server
    #[arg(short, long, value_name = "PORT", env = "SITESCOPE_PORT")]
    pub port: Option<u16>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .sitescope.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Self-contained HTML page (default)
    #[default]
    Html,
    /// JSON document
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        if self.port == Some(0) {
            return Err("--port must be between 1 and 65535".to_string());
        }

        if self.format == OutputFormat::Json && self.output.is_none() {
            return Err("--format json requires --output".to_string());
        }

        if let Some(ref sites) = self.select {
            if sites.iter().any(|s| s.trim().is_empty()) {
                return Err("--select contains an empty site name".to_string());
            }
        }

        if let Some(ref output) = self.output {
            if output.is_dir() {
                return Err(format!("Output path is a directory: {}", output.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Sites passed with --select, trimmed.
    pub fn selection(&self) -> Option<Vec<String>> {
        self.select
            .as_ref()
            .map(|sites| sites.iter().map(|s| s.trim().to_string()).collect())
    }
}
