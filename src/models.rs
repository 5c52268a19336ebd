//! Data models for the scorecard dashboard.
//!
//! This module contains the core data structures used throughout
//! the application: the scored criteria, the loaded score table, and
//! the aggregates and report built from it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Header of the identifier column in the source workbook.
pub const SITE_COLUMN: &str = "Sites internet";

/// One scored quality dimension.
///
/// The column names are matched exactly (case and accents included)
/// against the header row of the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    LoadSpeed,
    CrossPlatform,
    ImageOptimization,
    IntuitiveNavigation,
    ResponsiveDesign,
    CallsToAction,
    SslCertificate,
    AttackProtection,
    MetaTags,
    OpenGraph,
    SocialMedia,
}

impl Criterion {
    /// Every criterion, in workbook column order.
    pub const ALL: [Criterion; 11] = [
        Criterion::LoadSpeed,
        Criterion::CrossPlatform,
        Criterion::ImageOptimization,
        Criterion::IntuitiveNavigation,
        Criterion::ResponsiveDesign,
        Criterion::CallsToAction,
        Criterion::SslCertificate,
        Criterion::AttackProtection,
        Criterion::MetaTags,
        Criterion::OpenGraph,
        Criterion::SocialMedia,
    ];

    /// Exact column header for this criterion.
    pub fn column_name(&self) -> &'static str {
        match self {
            Criterion::LoadSpeed => "Vitesse de chargement",
            Criterion::CrossPlatform => "Compatibilité multiplateforme",
            Criterion::ImageOptimization => "Optimisation des images",
            Criterion::IntuitiveNavigation => "Navigation intuitive",
            Criterion::ResponsiveDesign => "Design responsive",
            Criterion::CallsToAction => "Appels à l'action (CTA)",
            Criterion::SslCertificate => "Certificat SSL",
            Criterion::AttackProtection => "Protection contre les attaques",
            Criterion::MetaTags => "Balises Meta",
            Criterion::OpenGraph => "Open graph personnalisé",
            Criterion::SocialMedia => "Intégration des réseaux sociaux",
        }
    }

    /// Position of this criterion in [`Criterion::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One site and its scores, in [`Criterion::ALL`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteScores {
    /// Unique site identifier.
    pub site: String,
    /// Scores indexed by criterion position. Missing or non-numeric
    /// cells are `NaN`.
    pub scores: Vec<f64>,
}

impl SiteScores {
    /// Score for a single criterion.
    pub fn score(&self, criterion: Criterion) -> f64 {
        self.scores[criterion.index()]
    }
}

/// The loaded workbook: one row per site, one column per criterion.
///
/// Rows keep the order of the source file. Site identifiers are unique.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoreTable {
    rows: Vec<SiteScores>,
    index: HashMap<String, usize>,
}

impl ScoreTable {
    /// Build a table from rows, rejecting duplicate identifiers.
    ///
    /// Returns the first duplicated identifier on failure.
    pub fn from_rows(rows: Vec<SiteScores>) -> Result<Self, String> {
        let mut index = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if index.insert(row.site.clone(), i).is_some() {
                return Err(row.site.clone());
            }
        }
        Ok(Self { rows, index })
    }

    /// Number of sites.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in file order.
    pub fn rows(&self) -> &[SiteScores] {
        &self.rows
    }

    /// Look up a site by identifier.
    pub fn get(&self, site: &str) -> Option<&SiteScores> {
        self.index.get(site).map(|&i| &self.rows[i])
    }

    pub fn contains(&self, site: &str) -> bool {
        self.index.contains_key(site)
    }

    /// Site identifiers in file order.
    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.site.as_str())
    }

    /// All values of one criterion, in row order.
    pub fn column(&self, criterion: Criterion) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |r| r.score(criterion))
    }
}

/// Mean score of one criterion across all sites.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriterionAverage {
    pub criterion: Criterion,
    pub mean: f64,
}

/// Pairwise Pearson correlations between criteria.
///
/// `values[i][j]` is the coefficient between `Criterion::ALL[i]` and
/// `Criterion::ALL[j]`. Undefined coefficients are `NaN` and serialize
/// as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub criteria: Vec<Criterion>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: Criterion, b: Criterion) -> f64 {
        self.values[a.index()][b.index()]
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.criteria.len()
    }
}

/// A site ranked by its mean score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSite {
    /// 1-based rank.
    pub rank: usize,
    pub site: String,
    pub mean: f64,
    /// Full score row, in criterion order.
    pub scores: Vec<f64>,
}

/// A labelled scalar shown as a card at the top of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetric {
    pub label: String,
    pub value: String,
}

/// Scores of the selected sites, prepared for the comparison chart.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Comparison {
    pub criteria: Vec<Criterion>,
    pub sites: Vec<SiteScores>,
}

impl Comparison {
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

/// Metadata about a rendered report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Title shown at the top of the page.
    pub title: String,
    /// Path of the source workbook.
    pub data_file: String,
    /// Modification date of the source workbook, when known.
    pub data_updated: Option<NaiveDate>,
    /// Date and time the report was rendered.
    pub generated_at: DateTime<Utc>,
    /// Number of sites in the table.
    pub site_count: usize,
    /// Signature line in the page footer.
    pub prepared_by: String,
}

/// The complete scorecard report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub key_metrics: Vec<KeyMetric>,
    /// Criterion means, highest first.
    pub criterion_averages: Vec<CriterionAverage>,
    pub correlations: CorrelationMatrix,
    /// Best sites by mean score, highest first.
    pub top_sites: Vec<RankedSite>,
    /// All site identifiers in table order (the selection choices).
    pub sites: Vec<String>,
    /// Comparison of the selected sites; `None` when nothing is selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
}
