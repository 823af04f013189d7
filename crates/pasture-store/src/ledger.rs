use std::path::{Path, PathBuf};

use pasture_core::error::AppError;
use pasture_core::ledger::Ledger;
use pasture_core::traits::LedgerStore;

use crate::fs::write_atomic;

/// Read the ledger at `path`.
///
/// A missing file is a first run. An unreadable or corrupt file is logged
/// and treated as empty; already-scraped URLs may be scraped again.
pub fn load(path: &Path) -> Ledger {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No ledger yet, starting empty");
            return Ledger::new();
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ledger unreadable, starting empty");
            return Ledger::new();
        }
    };

    match serde_json::from_str::<Ledger>(&raw) {
        Ok(ledger) => {
            tracing::debug!(path = %path.display(), entries = ledger.len(), "Ledger loaded");
            ledger
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ledger corrupt, starting empty");
            Ledger::new()
        }
    }
}

/// Write the ledger as a sorted JSON array, atomically.
pub fn save(ledger: &Ledger, path: &Path) -> Result<(), AppError> {
    let json = serde_json::to_vec(ledger)?;
    write_atomic(path, &json)?;
    tracing::debug!(path = %path.display(), entries = ledger.len(), "Ledger saved");
    Ok(())
}

/// [`LedgerStore`] backed by one JSON file.
#[derive(Debug, Clone)]
pub struct LedgerFile {
    path: PathBuf,
}

impl LedgerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for LedgerFile {
    fn load(&self) -> Ledger {
        load(&self.path)
    }

    fn save(&self, ledger: &Ledger) -> Result<(), AppError> {
        save(ledger, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("processed_urls.json")).is_empty());
    }

    #[test]
    fn corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_urls.json");
        std::fs::write(&path, "[\"abc\", ").unwrap();
        assert!(load(&path).is_empty());
    }

    #[test]
    fn reads_unsorted_legacy_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_urls.json");
        std::fs::write(&path, r#"["ccc", "aaa", "bbb", "aaa"]"#).unwrap();

        let ledger = load(&path);
        assert_eq!(ledger.len(), 3);
        assert!(ledger.contains("bbb"));
    }

    #[test]
    fn load_then_save_is_byte_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_urls.json");

        let ledger: Ledger = ["f2", "f1", "f3"].into_iter().map(String::from).collect();
        save(&ledger, &path).unwrap();
        let first = std::fs::read(&path).unwrap();

        save(&load(&path), &path).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(String::from_utf8(first).unwrap(), r#"["f1","f2","f3"]"#);
    }

    #[test]
    fn store_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LedgerFile::new(dir.path().join("nested/processed_urls.json"));

        let mut ledger = store.load();
        ledger.add("deadbeef");
        store.save(&ledger).unwrap();

        assert!(store.load().contains("deadbeef"));
        assert!(store.path().exists());
    }
}
