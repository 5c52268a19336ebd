//! SVG chart rendering.
//!
//! Every chart is drawn with plotters into an in-memory SVG string so it
//! can be inlined in the HTML page. Category axes are plain `f64` ranges
//! with one unit per category; their labels are drawn directly on the
//! root area, rotated under the x axis.

use crate::models::{Comparison, CorrelationMatrix, CriterionAverage};
use anyhow::Result;
use plotters::chart::SeriesLabelPosition;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontTransform;
use std::ops::Range;

const FONT: &str = "sans-serif";
const BAR_COLOR: RGBColor = RGBColor(76, 114, 176);
const MISSING_COLOR: RGBColor = RGBColor(200, 200, 200);
/// Room under the x axis for rotated criterion names.
const CATEGORY_LABEL_AREA: u32 = 210;

/// Bar chart of the mean score per criterion, in the given order.
pub fn criterion_bar_chart(averages: &[CriterionAverage]) -> Result<String> {
    let labels: Vec<String> = averages.iter().map(|a| a.criterion.to_string()).collect();
    let values: Vec<f64> = averages.iter().map(|a| a.mean).collect();
    let n = values.len().max(1) as f64;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (1100, 620)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Performance Moyenne par Critère", (FONT, 24))
            .margin(16)
            .x_label_area_size(CATEGORY_LABEL_AREA)
            .y_label_area_size(56)
            .build_cartesian_2d(0f64..n, value_axis(values.iter().copied()))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_formatter(&|_| String::new())
            .y_desc("Score Moyen")
            .axis_desc_style((FONT, 14))
            .draw()?;

        chart.draw_series(finite_points(&values).map(|(i, v)| {
            let x = i as f64;
            Rectangle::new([(x + 0.15, 0.0), (x + 0.85, v)], BAR_COLOR.filled())
        }))?;

        let value_style = TextStyle::from((FONT, 12).into_font())
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        chart.draw_series(finite_points(&values).map(|(i, v)| {
            Text::new(format!("{:.2}", v), (i as f64 + 0.5, v), value_style.clone())
        }))?;

        draw_category_labels(&root, &labels, |i| chart.backend_coord(&(i as f64 + 0.5, 0.0)))?;
        root.present()?;
    }
    Ok(svg)
}

/// Annotated heatmap of the correlation matrix.
///
/// The first criterion is the top row. Undefined coefficients are grey
/// cells labelled `n/a`.
pub fn correlation_heatmap(matrix: &CorrelationMatrix) -> Result<String> {
    let labels: Vec<String> = matrix.criteria.iter().map(|c| c.to_string()).collect();
    let n = matrix.size();
    let extent = n.max(1) as f64;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (1000, 960)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Matrice de Corrélation des Critères", (FONT, 24))
            .margin(16)
            .x_label_area_size(CATEGORY_LABEL_AREA)
            .y_label_area_size(CATEGORY_LABEL_AREA)
            .build_cartesian_2d(0f64..extent, 0f64..extent)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_label_formatter(&|_| String::new())
            .y_label_formatter(&|_| String::new())
            .draw()?;

        let cells: Vec<(f64, f64, f64)> = (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .map(|(i, j)| {
                let r = matrix.get(matrix.criteria[i], matrix.criteria[j]);
                (j as f64, (n - 1 - i) as f64, r)
            })
            .collect();

        chart.draw_series(cells.iter().map(|&(x, y, r)| {
            Rectangle::new([(x, y), (x + 1.0, y + 1.0)], heat_color(r).filled())
        }))?;

        let annotation = TextStyle::from((FONT, 12).into_font())
            .pos(Pos::new(HPos::Center, VPos::Center));
        chart.draw_series(cells.iter().map(|&(x, y, r)| {
            let text = if r.is_nan() {
                "n/a".to_string()
            } else {
                format!("{:.2}", r)
            };
            Text::new(text, (x + 0.5, y + 0.5), annotation.clone())
        }))?;

        draw_category_labels(&root, &labels, |j| chart.backend_coord(&(j as f64 + 0.5, 0.0)))?;

        let row_style =
            TextStyle::from((FONT, 12).into_font()).pos(Pos::new(HPos::Right, VPos::Center));
        for (i, label) in labels.iter().enumerate() {
            let (px, py) = chart.backend_coord(&(0.0, (n - 1 - i) as f64 + 0.5));
            root.draw(&Text::new(label.as_str(), (px - 8, py), row_style.clone()))?;
        }
        root.present()?;
    }
    Ok(svg)
}

/// Grouped bar chart: one group per criterion, one bar per selected site.
///
/// An empty comparison renders nothing.
pub fn comparison_chart(comparison: &Comparison) -> Result<String> {
    if comparison.is_empty() {
        return Ok(String::new());
    }

    let labels: Vec<String> = comparison.criteria.iter().map(|c| c.to_string()).collect();
    let n = labels.len().max(1) as f64;
    let k = comparison.sites.len();
    let bar_width = 0.8 / k as f64;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (1100, 640)).into_drawing_area();
        root.fill(&WHITE)?;

        let all_scores = comparison.sites.iter().flat_map(|s| s.scores.iter().copied());
        let mut chart = ChartBuilder::on(&root)
            .caption("Comparaison des Sites Sélectionnés", (FONT, 24))
            .margin(16)
            .x_label_area_size(CATEGORY_LABEL_AREA)
            .y_label_area_size(56)
            .build_cartesian_2d(0f64..n, value_axis(all_scores))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_label_formatter(&|_| String::new())
            .y_desc("Score")
            .axis_desc_style((FONT, 14))
            .draw()?;

        for (j, site) in comparison.sites.iter().enumerate() {
            let color = Palette99::pick(j).mix(0.9);
            let offset = 0.1 + j as f64 * bar_width;
            chart
                .draw_series(finite_points(&site.scores).map(|(i, v)| {
                    let x = i as f64 + offset;
                    Rectangle::new([(x, 0.0), (x + bar_width, v)], color.filled())
                }))?
                .label(site.site.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.85))
            .border_style(&BLACK)
            .label_font((FONT, 12))
            .draw()?;

        draw_category_labels(&root, &labels, |i| chart.backend_coord(&(i as f64 + 0.5, 0.0)))?;
        root.present()?;
    }
    Ok(svg)
}

/// Draw rotated category names hanging below the x axis.
///
/// `anchor` maps a category index to the backend pixel of its axis
/// position.
fn draw_category_labels<F>(
    root: &DrawingArea<SVGBackend<'_>, Shift>,
    labels: &[String],
    anchor: F,
) -> Result<()>
where
    F: Fn(usize) -> (i32, i32),
{
    let style = TextStyle::from((FONT, 12).into_font().transform(FontTransform::Rotate90))
        .pos(Pos::new(HPos::Left, VPos::Center));

    for (i, label) in labels.iter().enumerate() {
        let (x, y) = anchor(i);
        root.draw(&Text::new(label.as_str(), (x, y + 8), style.clone()))?;
    }
    Ok(())
}

/// Indices and values of the finite entries of a series.
fn finite_points(values: &[f64]) -> impl Iterator<Item = (usize, f64)> + '_ {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
}

/// Value axis from zero (or the lowest negative value) to a little
/// above the highest value.
fn value_axis(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let hi = if hi > 0.0 { hi * 1.1 } else { 1.0 };
    lo..hi
}

/// Diverging blue, white, red scale over [-1, 1].
fn heat_color(r: f64) -> RGBColor {
    if r.is_nan() {
        return MISSING_COLOR;
    }

    const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const NEUTRAL: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

    let t = r.clamp(-1.0, 1.0);
    let (from, to, w) = if t < 0.0 {
        (NEUTRAL, COLD, -t)
    } else {
        (NEUTRAL, WARM, t)
    };
    let mix = |a: f64, b: f64| (a + (b - a) * w).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Criterion, SiteScores};

    fn averages() -> Vec<CriterionAverage> {
        Criterion::ALL
            .iter()
            .enumerate()
            .map(|(i, &criterion)| CriterionAverage {
                criterion,
                mean: 10.0 - i as f64 * 0.5,
            })
            .collect()
    }

    #[test]
    fn test_bar_chart_renders_svg_with_labels() {
        let svg = criterion_bar_chart(&averages()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Balises Meta"));
        assert!(svg.contains("10.00"));
    }

    #[test]
    fn test_bar_chart_skips_nan() {
        let mut avgs = averages();
        avgs[0].mean = f64::NAN;
        let svg = criterion_bar_chart(&avgs).unwrap();
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn test_heatmap_annotations() {
        let n = Criterion::ALL.len();
        let mut values = vec![vec![0.25; n]; n];
        for (i, row) in values.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        values[0][1] = f64::NAN;
        values[1][0] = f64::NAN;
        let matrix = CorrelationMatrix {
            criteria: Criterion::ALL.to_vec(),
            values,
        };

        let svg = correlation_heatmap(&matrix).unwrap();
        assert!(svg.contains("1.00"));
        assert!(svg.contains("0.25"));
        assert!(svg.contains("n/a"));
    }

    #[test]
    fn test_comparison_chart_has_legend() {
        let comparison = Comparison {
            criteria: Criterion::ALL.to_vec(),
            sites: vec![
                SiteScores {
                    site: "alpha".to_string(),
                    scores: vec![4.0; 11],
                },
                SiteScores {
                    site: "beta".to_string(),
                    scores: vec![6.0; 11],
                },
            ],
        };

        let svg = comparison_chart(&comparison).unwrap();
        assert!(svg.contains("alpha"));
        assert!(svg.contains("beta"));
    }

    #[test]
    fn test_empty_comparison_renders_nothing() {
        assert!(comparison_chart(&Comparison::default()).unwrap().is_empty());
    }

    #[test]
    fn test_heat_color_scale() {
        assert_eq!(heat_color(0.0), RGBColor(221, 221, 221));
        assert_eq!(heat_color(1.0), RGBColor(180, 4, 38));
        assert_eq!(heat_color(-1.0), RGBColor(59, 76, 192));
        assert_eq!(heat_color(f64::NAN), MISSING_COLOR);
    }

    #[test]
    fn test_value_axis() {
        assert_eq!(value_axis([2.0, 10.0].into_iter()), 0.0..11.0);
        assert_eq!(value_axis([f64::NAN].into_iter()), 0.0..1.0);
        assert_eq!(value_axis([-2.0, 5.0].into_iter()).start, -2.0);
    }
}
