use std::path::{Path, PathBuf};

pub const LEDGER_FILE: &str = "processed_urls.json";
pub const STATS_FILE: &str = "stats.json";
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Locations of everything Pasture writes, all under one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub output_dir: PathBuf,
}

impl StoreConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Read `PASTURE_OUTPUT_DIR`, defaulting to `output`.
    pub fn from_env() -> Self {
        let dir = std::env::var_os("PASTURE_OUTPUT_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
        Self::new(dir)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.output_dir.join(LEDGER_FILE)
    }

    pub fn stats_path(&self) -> PathBuf {
        self.output_dir.join(STATS_FILE)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_under_output_dir() {
        let config = StoreConfig::new("/data/pasture");
        assert_eq!(config.ledger_path(), PathBuf::from("/data/pasture/processed_urls.json"));
        assert_eq!(config.stats_path(), PathBuf::from("/data/pasture/stats.json"));
        assert_eq!(StoreConfig::default().output_dir(), Path::new("output"));
    }
}
