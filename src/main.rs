//! SiteScope - website quality scorecard dashboard
//!
//! Loads a workbook of per-site quality scores and presents averages,
//! criterion correlations, the best performers and a side-by-side
//! comparison of selected sites, either live in the browser or as a
//! single rendered file.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Invalid arguments, data that cannot be loaded, or server failure

mod analysis;
mod cli;
mod config;
mod loader;
mod models;
mod report;
mod server;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use loader::LoadError;
use report::PageMode;
use server::{Dashboard, DashboardError, DashboardSettings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config comes first: it can raise the log level
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(config.log_level(&args));

    info!("SiteScope v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    if let Err(e) = run(args, config).await {
        error!("{:#}", e);
        if is_load_error(&e) {
            eprintln!("\n❌ Erreur lors du chargement des données: {}", e);
        } else {
            eprintln!("\n❌ Error: {:#}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .sitescope.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the data file, port, title and more.");
    Ok(())
}

/// Initialize logging at the resolved level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Render once to a file, or serve the dashboard.
async fn run(args: Args, config: Config) -> Result<()> {
    let mut settings = DashboardSettings::from(&config);
    settings.initial_selection = args.selection();
    let dashboard = Dashboard::new(settings);

    if let Some(ref output) = args.output {
        return render_to_file(&dashboard, args.format, output);
    }

    // Fail before binding if the data is unusable
    println!(
        "📥 Loading scores: {}",
        dashboard.settings().data_path.display()
    );
    let table = dashboard.table()?;
    println!("   {} sites loaded", table.len());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    server::serve(Arc::new(dashboard), &addr).await
}

/// Compute the report once and write it as HTML or JSON.
fn render_to_file(dashboard: &Dashboard, format: OutputFormat, output: &Path) -> Result<()> {
    println!(
        "📥 Loading scores: {}",
        dashboard.settings().data_path.display()
    );
    let report = dashboard.report(None)?;

    println!("\n📝 Generating report...");
    let content = match format {
        OutputFormat::Html => report::generate_html_report(&report, PageMode::Static)?,
        OutputFormat::Json => report::generate_json_report(&report)?,
    };

    std::fs::write(output, &content)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    println!("\n📊 Summary:");
    println!("   Sites analysed: {}", report.metadata.site_count);
    for metric in report.key_metrics.iter().skip(1) {
        println!("   {}: {}", metric.label, metric.value);
    }
    if let Some(best) = report.top_sites.first() {
        println!(
            "   Best site: {} ({})",
            best.site,
            analysis::format_score(best.mean)
        );
    }
    println!("\n✅ Report saved to: {}", output.display());
    Ok(())
}

/// Where the configuration came from. Logged once logging is up.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    Builtin,
    Unreadable(anyhow::Error),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::DefaultFile => info!("Loaded default config from {}", CONFIG_FILE),
            ConfigSource::Builtin => debug!("No config file found, using defaults"),
            ConfigSource::Unreadable(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigSource::Builtin)),
        Err(e) => Ok((Config::default(), ConfigSource::Unreadable(e))),
    }
}

/// Whether the failure came from reading the score workbook.
fn is_load_error(e: &anyhow::Error) -> bool {
    e.downcast_ref::<LoadError>().is_some()
        || matches!(
            e.downcast_ref::<DashboardError>(),
            Some(DashboardError::Load(_))
        )
}
