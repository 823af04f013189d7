//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit and integration tests.
//! All mocks share state through `Arc<Mutex<_>>` so a clone kept by the test
//! can assert on what the code under test did.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::ledger::Ledger;
use crate::pipeline::{PassEvent, PassReporter};
use crate::tags::TagSet;
use crate::traits::{ArtifactStore, Cleaner, Fetcher, LedgerStore, Scraper};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher with per-URL responses.
///
/// Lookup order: queued responses (consumed one per call), exact URL routes,
/// the fallback body. Anything else is an HTTP 404.
#[derive(Clone, Default)]
pub struct MockFetcher {
    queued: Arc<Mutex<Vec<Result<String, AppError>>>>,
    routes: Arc<Mutex<HashMap<String, String>>>,
    fallback: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    /// Returns `body` for every URL.
    pub fn new(body: &str) -> Self {
        let fetcher = Self::default();
        *fetcher.fallback.lock().unwrap() = Some(body.to_string());
        fetcher
    }

    /// Fails the first call with `error`; later calls are 404s.
    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        let fetcher = Self::default();
        *fetcher.queued.lock().unwrap() = responses;
        fetcher
    }

    /// Serves each body at its exact URL.
    pub fn routed<'a>(routes: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let fetcher = Self::default();
        fetcher.routes.lock().unwrap().extend(
            routes
                .into_iter()
                .map(|(url, body)| (url.to_string(), body.to_string())),
        );
        fetcher
    }

    /// Add or replace a route on an existing fetcher (and its clones).
    pub fn route(&self, url: &str, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(url.to_string());

        {
            let mut queued = self.queued.lock().unwrap();
            if !queued.is_empty() {
                return queued.remove(0);
            }
        }

        if let Some(body) = self.routes.lock().unwrap().get(url) {
            return Ok(body.clone());
        }

        self.fallback
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::HttpError(format!("HTTP 404 Not Found for {url}")))
    }
}

// ---------------------------------------------------------------------------
// MockCleaner
// ---------------------------------------------------------------------------

/// Mock cleaner that returns its input and records the tag sets it was given.
#[derive(Clone, Default)]
pub struct MockCleaner {
    error: Arc<Mutex<Option<AppError>>>,
    seen_tags: Arc<Mutex<Vec<TagSet>>>,
}

impl MockCleaner {
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Fails the next call.
    pub fn with_error(error: AppError) -> Self {
        let cleaner = Self::default();
        *cleaner.error.lock().unwrap() = Some(error);
        cleaner
    }

    pub fn seen_tags(&self) -> Vec<TagSet> {
        self.seen_tags.lock().unwrap().clone()
    }
}

impl Cleaner for MockCleaner {
    fn clean(&self, html: &str, remove_tags: &TagSet) -> Result<String, AppError> {
        self.seen_tags.lock().unwrap().push(remove_tags.clone());
        if let Some(e) = self.error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(html.to_string())
    }
}

// ---------------------------------------------------------------------------
// MockScraper
// ---------------------------------------------------------------------------

/// Mock scraper returning a fixed Markdown body, or failing every call.
#[derive(Clone)]
pub struct MockScraper {
    outcome: Arc<Mutex<Result<String, String>>>,
    calls: Arc<Mutex<Vec<(String, TagSet)>>>,
}

impl MockScraper {
    pub fn new(markdown: &str) -> Self {
        Self {
            outcome: Arc::new(Mutex::new(Ok(markdown.to_string()))),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: Arc::new(Mutex::new(Err(message.to_string()))),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Switch a failing scraper to succeed from now on.
    pub fn recover(&self, markdown: &str) {
        *self.outcome.lock().unwrap() = Ok(markdown.to_string());
    }

    /// URLs scraped so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn tags_for(&self, url: &str) -> Option<TagSet> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, tags)| tags.clone())
    }
}

impl Scraper for MockScraper {
    async fn scrape(&self, url: &str, remove_tags: &TagSet) -> Result<String, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), remove_tags.clone()));
        self.outcome
            .lock()
            .unwrap()
            .clone()
            .map_err(AppError::ScrapeError)
    }
}

// ---------------------------------------------------------------------------
// MockArtifactStore
// ---------------------------------------------------------------------------

/// In-memory artifact store.
#[derive(Clone, Default)]
pub struct MockArtifactStore {
    written: Arc<Mutex<Vec<(PathBuf, String)>>>,
    fail: bool,
}

impl MockArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write fails with an I/O error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn written(&self) -> Vec<(PathBuf, String)> {
        self.written.lock().unwrap().clone()
    }
}

impl ArtifactStore for MockArtifactStore {
    async fn write(&self, path: &Path, contents: &str) -> Result<PathBuf, AppError> {
        if self.fail {
            return Err(AppError::Io(std::io::Error::other("disk full")));
        }
        self.written
            .lock()
            .unwrap()
            .push((path.to_path_buf(), contents.to_string()));
        Ok(path.to_path_buf())
    }
}

// ---------------------------------------------------------------------------
// MemoryLedgerStore
// ---------------------------------------------------------------------------

/// Ledger store that keeps the last saved ledger in memory.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    ledger: Arc<Mutex<Ledger>>,
    saves: Arc<Mutex<usize>>,
    fail_saves: bool,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            ..Self::default()
        }
    }

    pub fn failing_saves() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }

    pub fn saved(&self) -> Ledger {
        self.ledger.lock().unwrap().clone()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self) -> Ledger {
        self.ledger.lock().unwrap().clone()
    }

    fn save(&self, ledger: &Ledger) -> Result<(), AppError> {
        if self.fail_saves {
            return Err(AppError::Io(std::io::Error::other("read-only filesystem")));
        }
        *self.ledger.lock().unwrap() = ledger.clone();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Pass reporter that records event names.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Arc<Mutex<Vec<String>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl PassReporter for RecordingReporter {
    fn report(&self, event: PassEvent<'_>) {
        let label = match &event {
            PassEvent::PassStarted { .. } => "PassStarted",
            PassEvent::SourceStarted { .. } => "SourceStarted",
            PassEvent::SourceFetched { .. } => "SourceFetched",
            PassEvent::SourceFailed { .. } => "SourceFailed",
            PassEvent::ItemSkipped { .. } => "ItemSkipped",
            PassEvent::ItemScraped { .. } => "ItemScraped",
            PassEvent::ItemFailed { .. } => "ItemFailed",
            PassEvent::SourceFinished { .. } => "SourceFinished",
            PassEvent::LedgerSaveFailed { .. } => "LedgerSaveFailed",
            PassEvent::PassFinished { .. } => "PassFinished",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}
