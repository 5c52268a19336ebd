//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.sitescope.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".sitescope.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Data source settings.
    #[serde(default)]
    pub data: DataConfig,

    /// Dashboard server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Where the scores come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the score workbook.
    #[serde(default = "default_data_path")]
    pub path: String,

    /// Worksheet to read. The first sheet when unset.
    #[serde(default)]
    pub sheet: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            sheet: None,
        }
    }
}

fn default_data_path() -> String {
    "data_sites_web.xlsx".to_string()
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8501
}

/// Report content settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Page title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Number of sites in the top performers table.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Number of sites compared when nothing has been selected yet.
    #[serde(default = "default_selection_size")]
    pub default_selection: usize,

    /// Signature line in the footer.
    #[serde(default = "default_prepared_by")]
    pub prepared_by: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            top_n: default_top_n(),
            default_selection: default_selection_size(),
            prepared_by: default_prepared_by(),
        }
    }
}

fn default_title() -> String {
    "Analyse des Performances des Sites Web".to_string()
}

fn default_top_n() -> usize {
    5
}

fn default_selection_size() -> usize {
    3
}

fn default_prepared_by() -> String {
    "Préparé par l'équipe d'analyse web".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values given explicitly on the command line override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.data.path = data.display().to_string();
        }
        if let Some(ref sheet) = args.sheet {
            self.data.sheet = Some(sheet.clone());
        }

        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(top) = args.top {
            self.report.top_n = top;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Log level once the file and the command line are merged.
    ///
    /// `verbose = true` in the file raises the level like `--verbose`;
    /// `--quiet` still wins.
    pub fn log_level(&self, args: &crate::cli::Args) -> tracing::Level {
        if self.general.verbose && !args.quiet {
            tracing::Level::DEBUG
        } else {
            args.log_level()
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
