//! Score aggregation and statistics.
//!
//! This module computes the derived views of a [`ScoreTable`]: the mean
//! of each criterion, the correlation matrix between criteria, and the
//! ranking of sites by their mean score.

use crate::models::{
    Comparison, CorrelationMatrix, Criterion, CriterionAverage, KeyMetric, RankedSite,
    ScoreTable, SiteScores,
};
use std::cmp::Ordering;

/// Arithmetic mean of the present values.
///
/// Missing values (`NaN`) are skipped. `NaN` only when nothing is left.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Pearson correlation coefficient of two series.
///
/// Only positions where both values are present take part. Returns `NaN`
/// for fewer than two such pairs or when either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(&x, &y)| (x, y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let mx = mean(pairs.iter().map(|p| p.0));
    let my = mean(pairs.iter().map(|p| p.1));

    let (mut cov, mut vx, mut vy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }

    if vx == 0.0 || vy == 0.0 {
        return f64::NAN;
    }
    (cov / (vx.sqrt() * vy.sqrt())).clamp(-1.0, 1.0)
}

/// Descending order with `NaN` after every number.
fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

/// Mean of every criterion, highest first.
///
/// Always returns one entry per criterion.
pub fn criterion_means(table: &ScoreTable) -> Vec<CriterionAverage> {
    let mut averages: Vec<CriterionAverage> = Criterion::ALL
        .iter()
        .map(|&criterion| CriterionAverage {
            criterion,
            mean: mean(table.column(criterion)),
        })
        .collect();

    averages.sort_by(|a, b| descending_nan_last(a.mean, b.mean));
    averages
}

/// Mean of a single criterion.
pub fn criterion_mean(table: &ScoreTable, criterion: Criterion) -> f64 {
    mean(table.column(criterion))
}

/// Pairwise Pearson correlations across all criteria.
pub fn correlation_matrix(table: &ScoreTable) -> CorrelationMatrix {
    let columns: Vec<Vec<f64>> = Criterion::ALL
        .iter()
        .map(|&c| table.column(c).collect())
        .collect();
    let n = columns.len();

    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = if i == j {
                // A column correlates perfectly with itself unless it is constant.
                let self_r = pearson(&columns[i], &columns[i]);
                if self_r.is_nan() {
                    f64::NAN
                } else {
                    1.0
                }
            } else {
                pearson(&columns[i], &columns[j])
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        criteria: Criterion::ALL.to_vec(),
        values,
    }
}

/// Mean score across all criteria for each site, in table order.
pub fn row_means(table: &ScoreTable) -> Vec<(String, f64)> {
    table
        .rows()
        .iter()
        .map(|row| (row.site.clone(), mean(row.scores.iter().copied())))
        .collect()
}

/// The `n` best sites by mean score.
///
/// Ties keep table order. Sites with an undefined mean rank last.
pub fn top_sites(table: &ScoreTable, n: usize) -> Vec<RankedSite> {
    let mut ranked: Vec<(&SiteScores, f64)> = table
        .rows()
        .iter()
        .zip(row_means(table))
        .map(|(row, (_, mean))| (row, mean))
        .collect();

    // `sort_by` is stable, which keeps ties in file order.
    ranked.sort_by(|a, b| descending_nan_last(a.1, b.1));
    ranked.truncate(n);

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (row, mean))| RankedSite {
            rank: i + 1,
            site: row.site.clone(),
            mean,
            scores: row.scores.clone(),
        })
        .collect()
}

/// Summary cards shown at the top of the report.
pub fn key_metrics(table: &ScoreTable) -> Vec<KeyMetric> {
    let card = |label: &str, value: String| KeyMetric {
        label: label.to_string(),
        value,
    };

    vec![
        card("Nombre de Sites Analysés", table.len().to_string()),
        card(
            "Vitesse de Chargement Moyenne",
            format_score(criterion_mean(table, Criterion::LoadSpeed)),
        ),
        card(
            "Score de Compatibilité Moyen",
            format_score(criterion_mean(table, Criterion::CrossPlatform)),
        ),
        card(
            "Score SSL Moyen",
            format_score(criterion_mean(table, Criterion::SslCertificate)),
        ),
    ]
}

/// Format a score with two decimals, `n/a` when undefined.
pub fn format_score(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:.2}", value)
    }
}

/// The first `count` sites in table order.
pub fn default_selection(table: &ScoreTable, count: usize) -> Vec<String> {
    table.sites().take(count).map(String::from).collect()
}

/// Identifiers in `selection` that are not in the table.
pub fn unknown_sites(table: &ScoreTable, selection: &[String]) -> Vec<String> {
    selection
        .iter()
        .filter(|s| !table.contains(s))
        .cloned()
        .collect()
}

/// Scores of the selected sites, in selection order.
///
/// Repeated identifiers are kept once. Fails with the list of unknown
/// identifiers if any selected site is not in the table.
pub fn comparison(table: &ScoreTable, selection: &[String]) -> Result<Comparison, Vec<String>> {
    let unknown = unknown_sites(table, selection);
    if !unknown.is_empty() {
        return Err(unknown);
    }

    let mut sites: Vec<SiteScores> = Vec::with_capacity(selection.len());
    for site in selection {
        if sites.iter().any(|s| &s.site == site) {
            continue;
        }
        if let Some(row) = table.get(site) {
            sites.push(row.clone());
        }
    }

    Ok(Comparison {
        criteria: Criterion::ALL.to_vec(),
        sites,
    })
}
