//! On-disk cache for raw per-day factor scores.
//!
//! One JSON map per (symbol, date) under a symbol-specific directory.
//! Cached values are raw: decay, standardization and aggregation happen
//! after the cache, never before it.

use crate::error::Result;
use osaka_traits::{CrossSection, Date};
use std::fs;
use std::path::{Path, PathBuf};

/// File cache for per-day factor scores.
#[derive(Debug, Clone)]
pub struct DailyCache {
    dir: PathBuf,
}

impl DailyCache {
    /// Cache rooted at `base/symbol`.
    pub fn new(base: impl AsRef<Path>, symbol: &str) -> Self {
        Self {
            dir: base.as_ref().join(symbol),
        }
    }

    /// Platform cache directory for osaka daily scores.
    pub fn default_base() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("osaka")
            .join("daily")
    }

    /// Directory holding this symbol's cache entries.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, date: Date) -> PathBuf {
        self.dir.join(format!("{}.json", date))
    }

    /// Whether an entry exists for `date`.
    pub fn contains(&self, date: Date) -> bool {
        self.path(date).is_file()
    }

    /// Load the cached cross-section for `date`, if present.
    pub fn load(&self, date: Date) -> Result<Option<CrossSection>> {
        let path = self.path(date);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Persist the raw cross-section for `date`.
    pub fn store(&self, date: Date, values: &CrossSection) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(date), serde_json::to_string(values)?)?;
        Ok(())
    }

    /// Remove all cached entries for this symbol.
    pub fn clear(&self) -> Result<()> {
        if self.dir.is_dir() {
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join("osaka-daily-cache-tests")
            .join(format!("{}-{}", name, std::process::id()))
    }

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_store_and_load() {
        let cache = DailyCache::new(scratch("roundtrip"), "rv_dir");
        cache.clear().unwrap();

        let mut cs = CrossSection::new();
        cs.insert("000001.SZ".to_string(), Some(0.6));
        cs.insert("600000.SH".to_string(), None);

        assert!(!cache.contains(date(2017, 4, 28)));
        cache.store(date(2017, 4, 28), &cs).unwrap();
        assert!(cache.contains(date(2017, 4, 28)));

        let back = cache.load(date(2017, 4, 28)).unwrap().unwrap();
        assert_eq!(back, cs);

        cache.clear().unwrap();
    }

    #[test]
    fn test_load_missing_is_none() {
        let cache = DailyCache::new(scratch("missing"), "rv_dir");
        cache.clear().unwrap();
        assert!(cache.load(date(2017, 4, 28)).unwrap().is_none());
    }

    #[test]
    fn test_entries_partitioned_by_symbol() {
        let base = scratch("partition");
        let a = DailyCache::new(&base, "rv_dir_1");
        let b = DailyCache::new(&base, "rv_dir_2");
        a.clear().unwrap();
        b.clear().unwrap();

        let mut cs = CrossSection::new();
        cs.insert("000001.SZ".to_string(), Some(1.0));
        a.store(date(2017, 4, 28), &cs).unwrap();

        assert!(a.contains(date(2017, 4, 28)));
        assert!(!b.contains(date(2017, 4, 28)));

        a.clear().unwrap();
    }
}
