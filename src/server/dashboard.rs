//! Request-level dashboard logic.
//!
//! A [`Dashboard`] owns the settings and the table cache. Each method
//! answers one kind of request: the full page, the comparison fragment
//! alone, or the report as data.

use crate::analysis;
use crate::config::Config;
use crate::loader::{LoadError, TableCache};
use crate::models::{Report, ReportMetadata, ScoreTable};
use crate::report::{self, PageMode};
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors surfaced to the user of the dashboard.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The workbook could not be loaded. Nothing is rendered.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The selection names sites that are not in the workbook.
    #[error("unknown sites: {}", .0.join(", "))]
    UnknownSites(Vec<String>),

    #[error(transparent)]
    Render(#[from] anyhow::Error),
}

/// Settings the dashboard needs, resolved from config and CLI.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub data_path: PathBuf,
    pub sheet: Option<String>,
    pub title: String,
    pub top_n: usize,
    pub default_selection: usize,
    pub prepared_by: String,
    /// Explicit initial selection; overrides `default_selection`.
    pub initial_selection: Option<Vec<String>>,
}

impl From<&Config> for DashboardSettings {
    fn from(config: &Config) -> Self {
        Self {
            data_path: PathBuf::from(&config.data.path),
            sheet: config.data.sheet.clone(),
            title: config.report.title.clone(),
            top_n: config.report.top_n,
            default_selection: config.report.default_selection,
            prepared_by: config.report.prepared_by.clone(),
            initial_selection: None,
        }
    }
}

/// The scorecard dashboard.
pub struct Dashboard {
    settings: DashboardSettings,
    cache: TableCache,
}

impl Dashboard {
    pub fn new(settings: DashboardSettings) -> Self {
        Self {
            settings,
            cache: TableCache::new(),
        }
    }

    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    /// The score table, from cache when the file is unchanged.
    pub fn table(&self) -> Result<Arc<ScoreTable>, LoadError> {
        self.cache
            .get(&self.settings.data_path, self.settings.sheet.as_deref())
    }

    /// Drop the cached table so the next request rereads the workbook.
    pub fn clear_cache(&self) -> bool {
        self.cache.invalidate()
    }

    /// Resolve the selection for a full render.
    ///
    /// `None` means the user has not chosen yet: use the configured
    /// initial selection, or the first sites of the table.
    fn resolve_selection(&self, table: &ScoreTable, selection: Option<Vec<String>>) -> Vec<String> {
        selection
            .or_else(|| self.settings.initial_selection.clone())
            .unwrap_or_else(|| analysis::default_selection(table, self.settings.default_selection))
    }

    /// Compute the whole report.
    pub fn report(&self, selection: Option<Vec<String>>) -> Result<Report, DashboardError> {
        let table = self.table()?;
        let selection = self.resolve_selection(&table, selection);
        debug!("Building report for {} selected sites", selection.len());

        report::build_report(
            &table,
            self.metadata(&table),
            self.settings.top_n,
            &selection,
        )
        .map_err(DashboardError::UnknownSites)
    }

    /// Render the full page.
    pub fn page(
        &self,
        selection: Option<Vec<String>>,
        mode: PageMode,
    ) -> Result<String, DashboardError> {
        let report = self.report(selection)?;
        Ok(report::generate_html_report(&report, mode)?)
    }

    /// Render only the comparison section for a new selection.
    ///
    /// Nothing else is recomputed. An empty selection renders nothing.
    pub fn comparison_fragment(&self, selection: &[String]) -> Result<String, DashboardError> {
        if selection.is_empty() {
            return Ok(String::new());
        }

        let table = self.table()?;
        let comparison =
            analysis::comparison(&table, selection).map_err(DashboardError::UnknownSites)?;
        Ok(report::generate_comparison_section(&comparison)?)
    }

    /// Render the page shown when an error stops the report.
    pub fn error_page(&self, error: &DashboardError) -> String {
        report::generate_error_page(&self.settings.title, &error.to_string())
    }

    fn metadata(&self, table: &ScoreTable) -> ReportMetadata {
        ReportMetadata {
            title: self.settings.title.clone(),
            data_file: self.settings.data_path.display().to_string(),
            data_updated: modification_date(&self.settings.data_path),
            generated_at: Utc::now(),
            site_count: table.len(),
            prepared_by: self.settings.prepared_by.clone(),
        }
    }
}

/// Local calendar date of the file's last modification.
fn modification_date(path: &Path) -> Option<NaiveDate> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Local>::from(modified).date_naive())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn fixture_settings() -> DashboardSettings {
        let mut settings = DashboardSettings::from(&Config::default());
        settings.data_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/sites.xlsx");
        settings
    }

    #[test]
    fn test_report_uses_first_three_sites_by_default() {
        let dashboard = Dashboard::new(fixture_settings());
        let report = dashboard.report(None).unwrap();

        let compared: Vec<String> = report
            .comparison
            .unwrap()
            .sites
            .into_iter()
            .map(|s| s.site)
            .collect();
        assert_eq!(compared, vec!["alpha.example", "beta.example", "gamma.example"]);
        assert_eq!(report.metadata.site_count, 6);
        assert!(report.metadata.data_updated.is_some());
    }

    #[test]
    fn test_report_ranks_fixture() {
        let dashboard = Dashboard::new(fixture_settings());
        let report = dashboard.report(Some(vec![])).unwrap();

        let top: Vec<&str> = report.top_sites.iter().map(|r| r.site.as_str()).collect();
        assert_eq!(
            top,
            vec![
                "gamma.example",
                "epsilon.example",
                "alpha.example",
                "zeta.example",
                "beta.example"
            ]
        );
        assert!(report.comparison.is_none());
        assert_eq!(report.key_metrics[0].value, "6");
        assert_eq!(report.key_metrics[3].value, "8.33");
    }

    #[test]
    fn test_initial_selection_override() {
        let mut settings = fixture_settings();
        settings.initial_selection = Some(vec!["zeta.example".to_string()]);
        let dashboard = Dashboard::new(settings);

        let report = dashboard.report(None).unwrap();
        assert_eq!(report.comparison.unwrap().sites[0].site, "zeta.example");
    }

    #[test]
    fn test_comparison_fragment() {
        let dashboard = Dashboard::new(fixture_settings());

        assert_eq!(dashboard.comparison_fragment(&[]).unwrap(), "");

        let html = dashboard
            .comparison_fragment(&["delta.example".to_string()])
            .unwrap();
        assert!(html.contains("<svg"));
        assert!(html.contains("delta.example"));
        assert!(!html.contains("Indicateurs Clés"));
    }

    #[test]
    fn test_unknown_site_rejected() {
        let dashboard = Dashboard::new(fixture_settings());
        let err = dashboard
            .comparison_fragment(&["nope.example".to_string()])
            .unwrap_err();
        assert!(matches!(err, DashboardError::UnknownSites(ref s) if s[0] == "nope.example"));

        let err = dashboard
            .report(Some(vec!["nope.example".to_string()]))
            .unwrap_err();
        assert!(matches!(err, DashboardError::UnknownSites(_)));
    }

    #[test]
    fn test_missing_file_halts_report() {
        let mut settings = fixture_settings();
        settings.data_path = PathBuf::from("missing/data_sites_web.xlsx");
        let dashboard = Dashboard::new(settings);

        let err = dashboard.page(None, PageMode::Interactive).unwrap_err();
        assert!(matches!(err, DashboardError::Load(LoadError::NotFound(_))));

        let page = dashboard.error_page(&err);
        assert!(page.contains("Erreur lors du chargement des données"));
        assert!(!page.contains("Indicateurs Clés"));
    }

    #[test]
    fn test_table_is_cached_between_requests() {
        let dashboard = Dashboard::new(fixture_settings());
        let first = dashboard.table().unwrap();
        let second = dashboard.table().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(dashboard.clear_cache());
        let third = dashboard.table().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(*first, *third);
    }
}
