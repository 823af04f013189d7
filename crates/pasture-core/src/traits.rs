use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::ledger::Ledger;
use crate::tags::TagSet;

/// Fetches a raw response body (HTML, JSON or XML) from a URL.
pub trait Fetcher: Send + Sync + Clone + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Converts raw HTML into clean Markdown, dropping the given tags.
pub trait Cleaner: Send + Sync + Clone {
    fn clean(&self, html: &str, remove_tags: &TagSet) -> Result<String, AppError>;
}

/// External scrape-and-convert collaborator used by the orchestrator.
///
/// Bounding a hung page is the implementation's job (fetch timeouts);
/// the orchestrator awaits whatever comes back.
pub trait Scraper: Send + Sync {
    fn scrape(
        &self,
        url: &str,
        remove_tags: &TagSet,
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Writes Markdown artifacts.
pub trait ArtifactStore: Send + Sync {
    /// Write `contents` to `path`, creating parent directories as needed.
    fn write(
        &self,
        path: &Path,
        contents: &str,
    ) -> impl Future<Output = Result<PathBuf, AppError>> + Send;
}

/// Loads and saves the processed-URL ledger.
pub trait LedgerStore: Send + Sync {
    /// Never fails: missing or corrupt state yields an empty ledger.
    fn load(&self) -> Ledger;

    fn save(&self, ledger: &Ledger) -> Result<(), AppError>;
}
