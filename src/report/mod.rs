//! Report assembly and rendering.

pub mod charts;
pub mod generator;

pub use generator::*;

use crate::analysis;
use crate::models::{Report, ReportMetadata, ScoreTable};

/// Compute every section of the report from a loaded table.
///
/// An empty `selection` leaves the comparison out. Fails with the
/// unknown identifiers if the selection names sites that are not in the
/// table.
pub fn build_report(
    table: &ScoreTable,
    metadata: ReportMetadata,
    top_n: usize,
    selection: &[String],
) -> Result<Report, Vec<String>> {
    let comparison = if selection.is_empty() {
        None
    } else {
        Some(analysis::comparison(table, selection)?)
    };

    Ok(Report {
        metadata,
        key_metrics: analysis::key_metrics(table),
        criterion_averages: analysis::criterion_means(table),
        correlations: analysis::correlation_matrix(table),
        top_sites: analysis::top_sites(table, top_n),
        sites: table.sites().map(String::from).collect(),
        comparison,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::models::{Criterion, ReportMetadata, ScoreTable, SiteScores};
    use chrono::{NaiveDate, Utc};

    pub fn metadata(site_count: usize) -> ReportMetadata {
        ReportMetadata {
            title: "Analyse des Performances des Sites Web".to_string(),
            data_file: "data_sites_web.xlsx".to_string(),
            data_updated: NaiveDate::from_ymd_opt(2024, 10, 21),
            generated_at: Utc::now(),
            site_count,
            prepared_by: "Préparé par l'équipe d'analyse web".to_string(),
        }
    }

    pub fn table() -> ScoreTable {
        let row = |site: &str, value: f64| SiteScores {
            site: site.to_string(),
            scores: (0..Criterion::ALL.len())
                .map(|i| value + (i % 3) as f64)
                .collect(),
        };
        ScoreTable::from_rows(vec![
            row("a.fr", 5.0),
            row("b.fr", 7.0),
            row("c.fr", 1.0),
            row("<d>.fr", 3.0),
        ])
        .expect("unique sites")
    }
}
