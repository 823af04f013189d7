use std::path::{Path, PathBuf};

use pasture_core::factory::PastureFactory;
use pasture_core::pipeline::Orchestrator;
use pasture_core::testutil::{MockFetcher, MockScraper};
use pasture_store::{FsArtifactStore, LedgerFile, StoreConfig};

pub type FileOrchestrator = Orchestrator<MockFetcher, MockScraper, FsArtifactStore, LedgerFile>;

pub const WORLDNEWS_URL: &str = "https://www.reddit.com/r/worldnews/.json";

/// Pinned megathread, a blacklisted headline and one clean story.
pub const WORLDNEWS: &str = r#"{"data": {"children": [
    {"data": {"id": "p1", "title": "Live thread", "url": "https://news.example.com/live", "stickied": true}},
    {"data": {"id": "p2", "title": "Politics this week", "url": "https://news.example.com/politics"}},
    {"data": {"id": "p3", "title": "New comet spotted", "url": "https://news.example.com/comet?utm_source=reddit&utm_medium=social"}}
]}}"#;

pub fn orchestrator(store: &StoreConfig, fetcher: MockFetcher, scraper: MockScraper) -> FileOrchestrator {
    Orchestrator::new(
        PastureFactory::new(fetcher),
        scraper,
        FsArtifactStore::new(),
        LedgerFile::new(store.ledger_path()),
        store.output_dir(),
    )
}

/// Every file under `dir`, relative and sorted, with its contents.
pub fn snapshot(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files = Vec::new();
    collect(dir, dir, &mut files);
    files.sort();
    files
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<(PathBuf, Vec<u8>)>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(root, &path, out);
        } else {
            let rel = path.strip_prefix(root).unwrap().to_path_buf();
            out.push((rel, std::fs::read(&path).unwrap()));
        }
    }
}

/// Markdown artifacts only.
pub fn artifacts(dir: &Path) -> Vec<PathBuf> {
    snapshot(dir)
        .into_iter()
        .map(|(path, _)| path)
        .filter(|p| p.extension().is_some_and(|e| e == "md"))
        .collect()
}
