//! Workbook loading.
//!
//! Reads the identifier column and the fixed set of criteria columns
//! from a spreadsheet into a [`ScoreTable`]. Any missing file or column
//! is a load failure; nothing downstream runs on a partial table.

pub mod cache;

pub use cache::TableCache;

use crate::models::{Criterion, ScoreTable, SiteScores, SITE_COLUMN};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while loading the score workbook.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open workbook {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("workbook contains no sheet")]
    NoSheet,

    #[error("failed to read sheet '{sheet}': {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("duplicate site identifier: {0}")]
    DuplicateSite(String),
}

/// Load the score table from a workbook on disk.
///
/// `sheet` selects a worksheet by name; `None` reads the first sheet.
pub fn load_score_table(path: &Path, sheet: Option<&str>) -> Result<ScoreTable, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    debug!("Opening workbook {}", path.display());
    let mut workbook = open_workbook_auto(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let range = match sheet {
        Some(name) => workbook
            .worksheet_range(name)
            .map_err(|source| LoadError::Sheet {
                sheet: name.to_string(),
                source,
            })?,
        None => {
            let first = workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or(LoadError::NoSheet)?;
            workbook
                .worksheet_range_at(0)
                .ok_or(LoadError::NoSheet)?
                .map_err(|source| LoadError::Sheet {
                    sheet: first,
                    source,
                })?
        }
    };

    let table = table_from_range(&range)?;
    if table.is_empty() {
        warn!("No site rows in {}", path.display());
    }
    info!(
        "Loaded {} sites x {} criteria from {}",
        table.len(),
        Criterion::ALL.len(),
        path.display()
    );
    Ok(table)
}

/// Build a score table from an in-memory sheet.
///
/// The first row is the header. Columns are located by exact header
/// text; extra columns are ignored. Fully blank rows and rows without a
/// site identifier are skipped.
pub fn table_from_range(range: &Range<Data>) -> Result<ScoreTable, LoadError> {
    let mut rows = range.rows();
    let header: Vec<String> = rows
        .next()
        .map(|cells| cells.iter().map(cell_text).collect())
        .unwrap_or_default();

    let position = |name: &str| header.iter().position(|h| h.trim() == name);

    let mut missing = Vec::new();
    let site_col = position(SITE_COLUMN);
    if site_col.is_none() {
        missing.push(SITE_COLUMN.to_string());
    }
    let criterion_cols: Vec<Option<usize>> = Criterion::ALL
        .iter()
        .map(|c| {
            let col = position(c.column_name());
            if col.is_none() {
                missing.push(c.column_name().to_string());
            }
            col
        })
        .collect();

    let site_col = match site_col {
        Some(col) if missing.is_empty() => col,
        _ => return Err(LoadError::MissingColumns(missing)),
    };
    let criterion_cols: Vec<usize> = criterion_cols.into_iter().flatten().collect();

    // 1-based sheet row of the first data row
    let first_row = range.start().map_or(0, |(row, _)| row as usize) + 2;

    let mut sites = Vec::new();
    for (i, cells) in rows.enumerate() {
        if cells.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let site = cells.get(site_col).map(cell_text).unwrap_or_default();
        if site.is_empty() {
            warn!("Skipping row {}: no value in '{}'", first_row + i, SITE_COLUMN);
            continue;
        }
        let scores = criterion_cols
            .iter()
            .map(|&col| cells.get(col).map(cell_number).unwrap_or(f64::NAN))
            .collect();
        sites.push(SiteScores { site, scores });
    }

    ScoreTable::from_rows(sites).map_err(LoadError::DuplicateSite)
}

/// Text content of a cell, as used for headers and identifiers.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Numeric content of a cell. Anything that is not a number is `NaN`.
fn cell_number(cell: &Data) -> f64 {
    match cell {
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::Bool(b) => f64::from(u8::from(*b)),
        Data::String(s) => s.trim().replace(',', ".").parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/sites.xlsx")
    }

    fn header_cells() -> Vec<Data> {
        std::iter::once(SITE_COLUMN)
            .chain(Criterion::ALL.iter().map(|c| c.column_name()))
            .map(|h| Data::String(h.to_string()))
            .collect()
    }

    fn build_range(header: Vec<Data>, rows: Vec<Vec<Data>>) -> Range<Data> {
        let width = header.len() as u32;
        let height = rows.len() as u32 + 1;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (c, cell) in header.into_iter().enumerate() {
            range.set_value((0, c as u32), cell);
        }
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                range.set_value((r as u32 + 1, c as u32), cell);
            }
        }
        range
    }

    fn data_row(site: &str, value: f64) -> Vec<Data> {
        std::iter::once(Data::String(site.to_string()))
            .chain(Criterion::ALL.iter().map(|_| Data::Float(value)))
            .collect()
    }

    #[test]
    fn test_table_from_range() {
        let range = build_range(
            header_cells(),
            vec![data_row("a.fr", 5.0), data_row("b.fr", 10.0)],
        );

        let table = table_from_range(&range).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.sites().collect::<Vec<_>>(), vec!["a.fr", "b.fr"]);
        assert_eq!(table.get("b.fr").unwrap().score(Criterion::OpenGraph), 10.0);
    }

    #[test]
    fn test_columns_found_in_any_order() {
        let mut header = header_cells();
        header.reverse();
        let mut row = data_row("a.fr", 1.0);
        row.reverse();
        row[0] = Data::Int(7); // Intégration des réseaux sociaux

        let table = table_from_range(&build_range(header, vec![row])).unwrap();
        let site = table.get("a.fr").unwrap();
        assert_eq!(site.score(Criterion::SocialMedia), 7.0);
        assert_eq!(site.score(Criterion::LoadSpeed), 1.0);
    }

    #[test]
    fn test_missing_columns_are_listed() {
        let header: Vec<Data> = header_cells()
            .into_iter()
            .filter(|h| *h != Data::String("Certificat SSL".to_string()))
            .collect();
        let range = build_range(header, vec![]);

        match table_from_range(&range) {
            Err(LoadError::MissingColumns(cols)) => {
                assert_eq!(cols, vec!["Certificat SSL".to_string()]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_header_match_is_accent_sensitive() {
        let header: Vec<Data> = header_cells()
            .into_iter()
            .map(|h| match h {
                Data::String(s) if s == "Balises Meta" => Data::String("balises meta".into()),
                other => other,
            })
            .collect();
        match table_from_range(&build_range(header, vec![])) {
            Err(LoadError::MissingColumns(cols)) => assert_eq!(cols, vec!["Balises Meta"]),
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_site_rejected() {
        let range = build_range(
            header_cells(),
            vec![data_row("a.fr", 1.0), data_row("a.fr", 2.0)],
        );
        assert!(matches!(
            table_from_range(&range),
            Err(LoadError::DuplicateSite(ref s)) if s == "a.fr"
        ));
    }

    #[test]
    fn test_rows_without_site_are_skipped() {
        let mut blank = data_row("", 6.0);
        blank[0] = Data::Empty;
        let range = build_range(
            header_cells(),
            vec![
                data_row("a.fr", 1.0),
                blank,
                data_row("  ", 7.0),
                data_row("b.fr", 2.0),
            ],
        );

        let table = table_from_range(&range).unwrap();
        assert_eq!(table.sites().collect::<Vec<_>>(), vec!["a.fr", "b.fr"]);
        assert!(!table.contains(""));
    }

    #[test]
    fn test_non_numeric_cells_become_nan() {
        let mut row = data_row("a.fr", 3.0);
        row[1] = Data::String("rapide".into());
        row[2] = Data::Empty;
        row[3] = Data::String("4,5".into());
        let table = table_from_range(&build_range(header_cells(), vec![row])).unwrap();
        let site = table.get("a.fr").unwrap();
        assert!(site.score(Criterion::LoadSpeed).is_nan());
        assert!(site.score(Criterion::CrossPlatform).is_nan());
        assert_eq!(site.score(Criterion::ImageOptimization), 4.5);
    }

    #[test]
    fn test_load_fixture_workbook() {
        let table = load_score_table(&fixture(), None).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(table.rows()[0].site, "alpha.example");
        assert_eq!(
            table.get("delta.example").unwrap().score(Criterion::SslCertificate),
            0.0
        );
    }

    #[test]
    fn test_load_named_sheet() {
        assert!(load_score_table(&fixture(), Some("Scores")).is_ok());
        assert!(matches!(
            load_score_table(&fixture(), Some("Absent")),
            Err(LoadError::Sheet { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_score_table(Path::new("does/not/exist.xlsx"), None).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
        assert!(err.to_string().contains("exist.xlsx"));
    }

    #[test]
    fn test_load_unreadable_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();
        assert!(matches!(
            load_score_table(&path, None),
            Err(LoadError::Open { .. })
        ));
    }
}
