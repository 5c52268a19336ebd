//! HTML and JSON report generation.
//!
//! This module turns a computed [`Report`] into a self-contained HTML
//! page (inline CSS, inline SVG charts, a few lines of script for the
//! site selector) or into pretty-printed JSON.

use super::charts;
use crate::analysis::format_score;
use crate::models::{Comparison, Criterion, KeyMetric, RankedSite, Report, ReportMetadata};
use anyhow::{Context, Result};

const INTRO: &str = "Cette présentation offre un aperçu détaillé des performances de nos sites web \
basé sur des critères clés. Notre objectif est d'identifier les forces et les axes \
d'amélioration pour optimiser notre présence en ligne.";

const PERFORMANCE_NARRATIVE: &str = "Ce graphique présente la performance moyenne de nos sites web \
pour chaque critère évalué. Il nous permet d'identifier rapidement nos points forts et nos axes \
d'amélioration.";

const CORRELATION_NARRATIVE: &str = "La matrice de corrélation ci-dessus illustre les relations \
entre les différents critères. Une corrélation forte (proche de 1 ou -1) indique que deux critères \
évoluent souvent ensemble, tandis qu'une corrélation faible (proche de 0) suggère une indépendance \
relative.";

const TOP_NARRATIVE: &str = "Ce tableau présente nos sites les plus performants en moyenne sur \
tous les critères. Ces sites peuvent servir de modèles pour l'amélioration des autres.";

const COMPARISON_NARRATIVE: &str = "Ce graphique permet de comparer directement les performances \
des sites sélectionnés sur tous les critères. Utilisez cette visualisation pour identifier les \
forces spécifiques de chaque site et les domaines nécessitant une amélioration.";

/// How the page is going to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMode {
    /// Served by the dashboard: the site selector is live.
    Interactive,
    /// Written to a file: the selection is fixed.
    Static,
}

/// Generate the complete HTML page.
pub fn generate_html_report(report: &Report, mode: PageMode) -> Result<String> {
    let performance_chart = charts::criterion_bar_chart(&report.criterion_averages)
        .context("Failed to draw the criterion chart")?;
    let heatmap = charts::correlation_heatmap(&report.correlations)
        .context("Failed to draw the correlation heatmap")?;
    let comparison = match &report.comparison {
        Some(comparison) => generate_comparison_section(comparison)?,
        None => String::new(),
    };
    let selected: Vec<&str> = report
        .comparison
        .as_ref()
        .map(|c| c.sites.iter().map(|s| s.site.as_str()).collect())
        .unwrap_or_default();

    let mut body = String::new();
    body.push_str(&generate_header(&report.metadata));
    body.push_str(&generate_metrics_section(&report.key_metrics));
    body.push_str(&figure_section(
        "📈 Performance Globale par Critère",
        &performance_chart,
        PERFORMANCE_NARRATIVE,
    ));
    body.push_str(&figure_section(
        "🔗 Corrélations entre les Critères",
        &heatmap,
        CORRELATION_NARRATIVE,
    ));
    body.push_str(&generate_top_sites_section(&report.top_sites));
    body.push_str(&generate_selection_section(
        &report.sites,
        &selected,
        &comparison,
        mode,
    ));
    body.push_str(&generate_footer(&report.metadata));

    let script = match mode {
        PageMode::Interactive => format!("<script>{}</script>", inline_javascript()),
        PageMode::Static => String::new(),
    };

    Ok(page(&report.metadata.title, &body, &script))
}

/// Generate the comparison chart and its narrative.
///
/// This is also the body of the `/compare` response, so it must stand on
/// its own. An empty comparison yields an empty string.
pub fn generate_comparison_section(comparison: &Comparison) -> Result<String> {
    if comparison.is_empty() {
        return Ok(String::new());
    }

    let chart =
        charts::comparison_chart(comparison).context("Failed to draw the comparison chart")?;

    let mut section = String::new();
    section.push_str("<div class=\"figure\">");
    section.push_str(&chart);
    section.push_str("</div>\n");
    section.push_str(&format!("<p class=\"narrative\">{}</p>\n", COMPARISON_NARRATIVE));
    Ok(section)
}

/// Generate the page shown instead of the report when the data cannot
/// be loaded.
pub fn generate_error_page(title: &str, message: &str) -> String {
    let body = format!(
        "<div class=\"error\"><strong>Erreur lors du chargement des données:</strong> {}</div>\n",
        escape_html(message)
    );
    page(title, &body, "")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

fn page(title: &str, body: &str, script: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="fr">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{css}</style>
</head>
<body>
    <div class="container">
{body}
    </div>
    {script}
</body>
</html>
"#,
        title = escape_html(title),
        css = inline_css(),
        body = body,
        script = script,
    )
}

fn generate_header(metadata: &ReportMetadata) -> String {
    format!(
        "<header>\n<h1>📊 {}</h1>\n<p>{}</p>\n</header>\n",
        escape_html(&metadata.title),
        INTRO
    )
}

/// Generate the key metric cards.
fn generate_metrics_section(metrics: &[KeyMetric]) -> String {
    let mut section = String::new();

    section.push_str("<section>\n<h2>🔑 Indicateurs Clés de Performance</h2>\n");
    section.push_str("<div class=\"metrics\">\n");
    for metric in metrics {
        section.push_str(&format!(
            "<div class=\"metric\"><h3>{}</h3><div class=\"value\">{}</div></div>\n",
            escape_html(&metric.label),
            escape_html(&metric.value)
        ));
    }
    section.push_str("</div>\n</section>\n");

    section
}

fn figure_section(heading: &str, svg: &str, narrative: &str) -> String {
    format!(
        "<section>\n<h2>{}</h2>\n<div class=\"figure\">{}</div>\n<p class=\"narrative\">{}</p>\n</section>\n",
        heading, svg, narrative
    )
}

/// Generate the table of best sites with all their scores.
fn generate_top_sites_section(top: &[RankedSite]) -> String {
    let mut section = String::new();

    section.push_str("<section>\n<h2>🏆 Analyse des Sites les Plus Performants</h2>\n");
    section.push_str("<div class=\"table-wrap\"><table>\n<thead><tr><th>#</th><th>Sites internet</th>");
    for criterion in Criterion::ALL {
        section.push_str(&format!("<th>{}</th>", escape_html(criterion.column_name())));
    }
    section.push_str("<th>Moyenne</th></tr></thead>\n<tbody>\n");

    for entry in top {
        section.push_str(&format!(
            "<tr><td>{}</td><td>{}</td>",
            entry.rank,
            escape_html(&entry.site)
        ));
        for score in &entry.scores {
            section.push_str(&format!("<td>{}</td>", format_cell(*score)));
        }
        section.push_str(&format!(
            "<td class=\"mean\">{}</td></tr>\n",
            format_score(entry.mean)
        ));
    }

    section.push_str("</tbody>\n</table></div>\n");
    section.push_str(&format!("<p class=\"narrative\">{}</p>\n", TOP_NARRATIVE));
    section.push_str("</section>\n");

    section
}

/// Generate the site selector and the comparison container.
fn generate_selection_section(
    sites: &[String],
    selected: &[&str],
    comparison: &str,
    mode: PageMode,
) -> String {
    let mut section = String::new();

    section.push_str("<section>\n<h2>🔍 Comparaison Détaillée des Sites</h2>\n");

    match mode {
        PageMode::Interactive => {
            section.push_str("<form id=\"site-form\" method=\"get\" action=\"\">\n");
            // Keeps `sites` in the query when nothing is selected.
            section.push_str("<input type=\"hidden\" name=\"sites\" value=\"\">\n");
            section.push_str(
                "<label for=\"sites\">Sélectionnez des sites à comparer</label>\n\
                 <select id=\"sites\" name=\"sites\" multiple size=\"8\">\n",
            );
            for site in sites {
                let mark = if selected.contains(&site.as_str()) {
                    " selected"
                } else {
                    ""
                };
                let site = escape_html(site);
                section.push_str(&format!(
                    "<option value=\"{}\"{}>{}</option>\n",
                    site, mark, site
                ));
            }
            section.push_str("</select>\n<noscript><button type=\"submit\">Comparer</button></noscript>\n</form>\n");
        }
        PageMode::Static => {
            if !selected.is_empty() {
                let names: Vec<String> = selected.iter().map(|s| escape_html(s)).collect();
                section.push_str(&format!(
                    "<p class=\"selection\">Sites sélectionnés : {}</p>\n",
                    names.join(", ")
                ));
            }
        }
    }

    section.push_str(&format!("<div id=\"comparison\">{}</div>\n", comparison));
    section.push_str("</section>\n");

    section
}

fn generate_footer(metadata: &ReportMetadata) -> String {
    let mut footer = String::new();

    footer.push_str("<footer>\n<hr>\n<p>");
    footer.push_str(&escape_html(&metadata.prepared_by));
    if let Some(date) = metadata.data_updated {
        footer.push_str(&format!(
            " | Données mises à jour le {}",
            date.format("%d/%m/%Y")
        ));
    }
    footer.push_str("</p>\n</footer>\n");

    footer
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        "n/a".to_string()
    } else if value.fract() == 0.0 {
        format!("{}", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn inline_css() -> &'static str {
    r#"
* { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: system-ui, -apple-system, 'Segoe UI', sans-serif; line-height: 1.6; color: #111827; background: #ffffff; }
.container { max-width: 1200px; margin: 0 auto; padding: 2rem; }
header { margin-bottom: 2rem; padding-bottom: 1rem; border-bottom: 2px solid #e5e7eb; }
header h1 { font-size: 2rem; font-weight: 700; margin-bottom: 0.5rem; }
section { margin-bottom: 2.5rem; }
section h2 { font-size: 1.5rem; font-weight: 700; margin-bottom: 1rem; }
.metrics { display: grid; grid-template-columns: repeat(4, 1fr); gap: 1rem; }
.metric { background: #f9fafb; padding: 1rem; border-radius: 0.5rem; border-left: 4px solid #3b82f6; }
.metric h3 { font-size: 0.875rem; font-weight: 600; color: #6b7280; margin-bottom: 0.5rem; }
.metric .value { font-size: 1.75rem; font-weight: 700; }
.figure { overflow-x: auto; }
.figure svg { max-width: 100%; height: auto; }
.narrative { margin-top: 0.75rem; color: #374151; }
.table-wrap { overflow-x: auto; }
table { width: 100%; border-collapse: collapse; font-size: 0.8rem; }
thead { background: #f9fafb; }
th { padding: 0.5rem; text-align: left; font-weight: 600; color: #374151; border-bottom: 2px solid #e5e7eb; }
td { padding: 0.5rem; border-bottom: 1px solid #e5e7eb; }
td.mean { font-weight: 700; }
tbody tr:hover { background: #f3f4f6; }
form { margin-bottom: 1rem; }
form label { display: block; font-weight: 600; margin-bottom: 0.25rem; }
select { min-width: 24rem; padding: 0.25rem; }
.error { background: #fef2f2; color: #991b1b; border-left: 4px solid #dc2626; padding: 1rem; border-radius: 0.5rem; }
footer { margin-top: 2rem; color: #6b7280; font-size: 0.875rem; }
footer hr { border: none; border-top: 1px solid #e5e7eb; margin-bottom: 1rem; }
"#
}

/// Re-render only the comparison when the selection changes.
fn inline_javascript() -> &'static str {
    r#"
(function () {
    var select = document.getElementById('sites');
    var target = document.getElementById('comparison');
    if (!select || !target) { return; }
    select.addEventListener('change', function () {
        var params = new URLSearchParams();
        Array.prototype.forEach.call(select.selectedOptions, function (opt) {
            params.append('sites', opt.value);
        });
        fetch('compare?' + params.toString())
            .then(function (res) { return res.text(); })
            .then(function (html) { target.innerHTML = html; });
    });
})();
"#
}
