//! Memoized table loading.
//!
//! The cache holds at most one table, keyed by the canonical path of the
//! workbook, the sheet name and the file modification time. A request for
//! an unchanged file returns the same `Arc`; a newer file is reloaded.

use super::{load_score_table, LoadError};
use crate::models::ScoreTable;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;
use tracing::{debug, info};

/// Identity of a loaded workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub path: PathBuf,
    pub sheet: Option<String>,
    pub modified: SystemTime,
}

impl CacheKey {
    /// Stat the file and build its key.
    pub fn for_file(path: &Path, sheet: Option<&str>) -> Result<Self, LoadError> {
        let io_err = |source: std::io::Error| {
            if source.kind() == ErrorKind::NotFound {
                LoadError::NotFound(path.to_path_buf())
            } else {
                LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        };

        let canonical = fs::canonicalize(path).map_err(io_err)?;
        let modified = fs::metadata(&canonical)
            .and_then(|m| m.modified())
            .map_err(io_err)?;

        Ok(Self {
            path: canonical,
            sheet: sheet.map(String::from),
            modified,
        })
    }
}

struct CacheEntry {
    key: CacheKey,
    table: Arc<ScoreTable>,
}

/// Process-wide memo of the last loaded score table.
#[derive(Default)]
pub struct TableCache {
    entry: Mutex<Option<CacheEntry>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the table for `path`, reading the workbook only on a miss.
    pub fn get(&self, path: &Path, sheet: Option<&str>) -> Result<Arc<ScoreTable>, LoadError> {
        self.get_or_load(path, sheet, load_score_table)
    }

    /// Same as [`TableCache::get`] with a custom loader.
    ///
    /// Failed loads are not cached and leave any previous entry intact.
    pub fn get_or_load<F>(
        &self,
        path: &Path,
        sheet: Option<&str>,
        load: F,
    ) -> Result<Arc<ScoreTable>, LoadError>
    where
        F: FnOnce(&Path, Option<&str>) -> Result<ScoreTable, LoadError>,
    {
        let key = CacheKey::for_file(path, sheet)?;
        let mut entry = self.lock();

        if let Some(cached) = entry.as_ref() {
            if cached.key == key {
                debug!("Table cache hit for {}", key.path.display());
                return Ok(Arc::clone(&cached.table));
            }
            info!("{} changed on disk, reloading", key.path.display());
        } else {
            debug!("Table cache miss for {}", key.path.display());
        }

        let table = Arc::new(load(path, sheet)?);
        *entry = Some(CacheEntry {
            key,
            table: Arc::clone(&table),
        });
        Ok(table)
    }

    /// Drop the cached table. Returns whether anything was cached.
    pub fn invalidate(&self) -> bool {
        let dropped = self.lock().take().is_some();
        if dropped {
            info!("Table cache cleared");
        }
        dropped
    }

    #[cfg(test)]
    fn is_cached(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Criterion, SiteScores};
    use std::cell::Cell;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample_table() -> ScoreTable {
        ScoreTable::from_rows(vec![SiteScores {
            site: "a.fr".to_string(),
            scores: vec![1.0; Criterion::ALL.len()],
        }])
        .unwrap()
    }

    fn touch_later(path: &Path) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();
    }

    #[test]
    fn test_second_get_is_a_hit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scores.xlsx");
        fs::write(&path, b"x").unwrap();

        let cache = TableCache::new();
        let loads = Cell::new(0);
        let loader = |_: &Path, _: Option<&str>| {
            loads.set(loads.get() + 1);
            Ok(sample_table())
        };

        let first = cache.get_or_load(&path, None, loader).unwrap();
        let second = cache.get_or_load(&path, None, loader).unwrap();

        assert_eq!(loads.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_modified_file_is_reloaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scores.xlsx");
        fs::write(&path, b"x").unwrap();

        let cache = TableCache::new();
        let loads = Cell::new(0);
        let loader = |_: &Path, _: Option<&str>| {
            loads.set(loads.get() + 1);
            Ok(sample_table())
        };

        let first = cache.get_or_load(&path, None, loader).unwrap();
        touch_later(&path);
        let second = cache.get_or_load(&path, None, loader).unwrap();

        assert_eq!(loads.get(), 2);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scores.xlsx");
        fs::write(&path, b"x").unwrap();

        let cache = TableCache::new();
        assert!(!cache.invalidate());

        let first = cache
            .get_or_load(&path, None, |_, _| Ok(sample_table()))
            .unwrap();
        assert!(cache.is_cached());
        assert!(cache.invalidate());
        assert!(!cache.is_cached());

        let second = cache
            .get_or_load(&path, None, |_, _| Ok(sample_table()))
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn test_sheet_is_part_of_the_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scores.xlsx");
        fs::write(&path, b"x").unwrap();

        let cache = TableCache::new();
        let a = cache
            .get_or_load(&path, Some("A"), |_, _| Ok(sample_table()))
            .unwrap();
        let b = cache
            .get_or_load(&path, Some("B"), |_, _| Ok(sample_table()))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scores.xlsx");
        fs::write(&path, b"x").unwrap();

        let cache = TableCache::new();
        let result = cache.get_or_load(&path, None, |_, _| Err(LoadError::NoSheet));
        assert!(matches!(result, Err(LoadError::NoSheet)));
        assert!(!cache.is_cached());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let cache = TableCache::new();
        let result = cache.get(Path::new("nowhere/scores.xlsx"), None);
        assert!(matches!(result, Err(LoadError::NotFound(_))));
    }

    #[test]
    fn test_real_workbook_is_memoized() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/sites.xlsx");
        let cache = TableCache::new();
        let first = cache.get(&path, None).unwrap();
        let second = cache.get(&path, None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.len(), 6);
    }
}
