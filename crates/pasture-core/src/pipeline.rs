//! One pass over the configured sources: fetch, filter, dedup, scrape, store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Config, SourceConfig};
use crate::error::AppError;
use crate::factory::PastureFactory;
use crate::ledger::Ledger;
use crate::models::SourceKind;
use crate::tags::TagSet;
use crate::traits::{ArtifactStore, Fetcher, LedgerStore, Scraper};
use crate::urlnorm;

/// Why an item that survived filtering was not scraped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Media,
    Duplicate,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Media => "media",
            SkipReason::Duplicate => "duplicate",
        }
    }
}

/// Events emitted while a pass runs.
#[derive(Debug, Clone)]
pub enum PassEvent<'a> {
    PassStarted {
        sources: usize,
    },
    SourceStarted {
        source: &'a str,
        kind: SourceKind,
        endpoint: &'a str,
    },
    SourceFetched {
        source: &'a str,
        fetched: usize,
        kept: usize,
    },
    /// The source could not be built or fetched; it contributes nothing.
    SourceFailed {
        source: &'a str,
        error: &'a AppError,
    },
    ItemSkipped {
        source: &'a str,
        url: &'a str,
        reason: SkipReason,
    },
    ItemScraped {
        source: &'a str,
        url: &'a str,
        fingerprint: &'a str,
        path: &'a Path,
    },
    ItemFailed {
        source: &'a str,
        url: &'a str,
        error: &'a AppError,
    },
    SourceFinished {
        report: &'a SourceReport,
    },
    LedgerSaveFailed {
        error: &'a AppError,
    },
    PassFinished {
        report: &'a PassReport,
    },
}

/// Receives pass events. The default implementation drops them.
pub trait PassReporter: Send + Sync {
    fn report(&self, event: PassEvent<'_>) {
        let _ = event;
    }
}

impl PassReporter for () {}

impl<A: PassReporter, B: PassReporter> PassReporter for (A, B) {
    fn report(&self, event: PassEvent<'_>) {
        self.0.report(event.clone());
        self.1.report(event);
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPassReporter;

impl PassReporter for TracingPassReporter {
    fn report(&self, event: PassEvent<'_>) {
        match event {
            PassEvent::PassStarted { sources } => {
                tracing::info!(%sources, "Pass started");
            }
            PassEvent::SourceStarted {
                source,
                kind,
                endpoint,
            } => {
                tracing::info!(%source, %kind, %endpoint, "Processing source");
            }
            PassEvent::SourceFetched {
                source,
                fetched,
                kept,
            } => {
                tracing::info!(%source, %fetched, %kept, "Filtered items");
            }
            PassEvent::SourceFailed { source, error } if error.is_transport() => {
                tracing::warn!(%source, %error, "Source unreachable; will retry next pass");
            }
            PassEvent::SourceFailed { source, error } => {
                tracing::error!(%source, %error, "Source failed");
            }
            PassEvent::ItemSkipped {
                source,
                url,
                reason,
            } => {
                tracing::debug!(%source, %url, reason = reason.as_str(), "Skipping item");
            }
            PassEvent::ItemScraped {
                source,
                url,
                fingerprint,
                path,
            } => {
                tracing::info!(
                    %source,
                    %url,
                    fingerprint = %&fingerprint[..fingerprint.len().min(8)],
                    path = %path.display(),
                    "Saved article"
                );
            }
            PassEvent::ItemFailed { source, url, error } => {
                tracing::warn!(%source, %url, %error, "Scrape failed; will retry next pass");
            }
            PassEvent::SourceFinished { report } => {
                tracing::info!(
                    source = %report.source,
                    scraped = report.scraped,
                    duplicates = report.duplicates,
                    failed = report.failed,
                    "Source done"
                );
            }
            PassEvent::LedgerSaveFailed { error } => {
                tracing::error!(%error, "Failed to save ledger");
            }
            PassEvent::PassFinished { report } => {
                tracing::info!(
                    sources = report.sources.len(),
                    scraped = report.scraped(),
                    duplicates = report.duplicates(),
                    errors = report.errors(),
                    elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
                    "Pass finished"
                );
            }
        }
    }
}

/// Per-source counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    pub kept: usize,
    /// Exclusion rule -> items dropped.
    pub excluded: BTreeMap<String, usize>,
    /// Blacklist term -> items dropped.
    pub blacklisted: BTreeMap<String, usize>,
    pub media_skipped: usize,
    pub duplicates: usize,
    pub scraped: usize,
    pub failed: usize,
    /// Set when the source could not be created or fetched.
    pub error: Option<String>,
}

impl SourceReport {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }

    pub fn blacklisted_total(&self) -> usize {
        self.blacklisted.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    pub ledger_saved: bool,
}

impl PassReport {
    pub fn scraped(&self) -> usize {
        self.sources.iter().map(|s| s.scraped).sum()
    }

    pub fn duplicates(&self) -> usize {
        self.sources.iter().map(|s| s.duplicates).sum()
    }

    pub fn failed(&self) -> usize {
        self.sources.iter().map(|s| s.failed).sum()
    }

    pub fn blacklisted(&self) -> usize {
        self.sources.iter().map(SourceReport::blacklisted_total).sum()
    }

    /// Item failures plus sources that failed outright.
    pub fn errors(&self) -> usize {
        self.failed() + self.sources.iter().filter(|s| s.error.is_some()).count()
    }

    /// Blacklist hits per term across all sources.
    pub fn blacklist_hits(&self) -> BTreeMap<String, usize> {
        let mut hits = BTreeMap::new();
        for source in &self.sources {
            for (term, count) in &source.blacklisted {
                *hits.entry(term.clone()).or_default() += count;
            }
        }
        hits
    }
}

/// Drives passes over the configured sources.
///
/// Generic over every collaborator so the whole pipeline runs in tests
/// without network, browser or disk.
pub struct Orchestrator<F, S, A, L>
where
    F: Fetcher,
    S: Scraper,
    A: ArtifactStore,
    L: LedgerStore,
{
    factory: PastureFactory<F>,
    scraper: S,
    artifacts: A,
    ledger_store: L,
    output_dir: PathBuf,
}

impl<F, S, A, L> Orchestrator<F, S, A, L>
where
    F: Fetcher,
    S: Scraper,
    A: ArtifactStore,
    L: LedgerStore,
{
    pub fn new(
        factory: PastureFactory<F>,
        scraper: S,
        artifacts: A,
        ledger_store: L,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            factory,
            scraper,
            artifacts,
            ledger_store,
            output_dir: output_dir.into(),
        }
    }

    pub fn load_ledger(&self) -> Ledger {
        self.ledger_store.load()
    }

    /// Build every configured source once so configuration errors surface
    /// before any work starts.
    pub fn preflight(&self, config: &Config) -> Result<(), AppError> {
        for source in &config.sources {
            self.factory.create(source)?;
        }
        Ok(())
    }

    /// Every source in configuration order, then one ledger save.
    pub async fn run_pass<R: PassReporter>(
        &self,
        config: &Config,
        ledger: &mut Ledger,
        reporter: &R,
    ) -> PassReport {
        self.run_sources(config, &config.sources, ledger, reporter)
            .await
    }

    /// A pass restricted to one named source. `None` if the name is unknown.
    pub async fn run_source<R: PassReporter>(
        &self,
        config: &Config,
        name: &str,
        ledger: &mut Ledger,
        reporter: &R,
    ) -> Option<PassReport> {
        let source = config.source(name)?;
        Some(
            self.run_sources(config, std::slice::from_ref(source), ledger, reporter)
                .await,
        )
    }

    async fn run_sources<R: PassReporter>(
        &self,
        config: &Config,
        sources: &[SourceConfig],
        ledger: &mut Ledger,
        reporter: &R,
    ) -> PassReport {
        let started_at = Utc::now();
        reporter.report(PassEvent::PassStarted {
            sources: sources.len(),
        });

        let mut reports = Vec::with_capacity(sources.len());
        for source in sources {
            let report = self.process_source(config, source, ledger, reporter).await;
            reporter.report(PassEvent::SourceFinished { report: &report });
            reports.push(report);
        }

        let ledger_saved = match self.ledger_store.save(ledger) {
            Ok(()) => true,
            Err(e) => {
                reporter.report(PassEvent::LedgerSaveFailed { error: &e });
                false
            }
        };

        let report = PassReport {
            started_at,
            finished_at: Utc::now(),
            sources: reports,
            ledger_saved,
        };
        reporter.report(PassEvent::PassFinished { report: &report });
        report
    }

    async fn process_source<R: PassReporter>(
        &self,
        config: &Config,
        source: &SourceConfig,
        ledger: &mut Ledger,
        reporter: &R,
    ) -> SourceReport {
        let mut report = SourceReport::new(&source.name);

        let pasture = match self.factory.create(source) {
            Ok(pasture) => pasture,
            Err(e) => {
                reporter.report(PassEvent::SourceFailed {
                    source: &source.name,
                    error: &e,
                });
                report.error = Some(e.to_string());
                return report;
            }
        };

        reporter.report(PassEvent::SourceStarted {
            source: &source.name,
            kind: pasture.kind(),
            endpoint: pasture.endpoint(),
        });

        let tags = config.effective_tags(source);

        let items = match pasture.try_fetch().await {
            Ok(items) => items,
            Err(e) => {
                reporter.report(PassEvent::SourceFailed {
                    source: &source.name,
                    error: &e,
                });
                report.error = Some(e.to_string());
                Vec::new()
            }
        };
        report.fetched = items.len();

        let outcome = pasture.filter_with_outcome(items, Utc::now());
        report.kept = outcome.kept.len();
        report.excluded = outcome
            .excluded
            .iter()
            .map(|(rule, count)| (rule.to_string(), *count))
            .collect();
        report.blacklisted = outcome.blacklisted.clone();

        reporter.report(PassEvent::SourceFetched {
            source: &source.name,
            fetched: report.fetched,
            kept: report.kept,
        });

        let partition = pasture.output_partition(&self.output_dir);

        for item in &outcome.kept {
            let url = pasture.extract_url(item);

            if urlnorm::is_media_url(url) {
                report.media_skipped += 1;
                reporter.report(PassEvent::ItemSkipped {
                    source: &source.name,
                    url,
                    reason: SkipReason::Media,
                });
                continue;
            }

            let fingerprint = urlnorm::fingerprint(url);
            if ledger.contains(&fingerprint) {
                report.duplicates += 1;
                reporter.report(PassEvent::ItemSkipped {
                    source: &source.name,
                    url,
                    reason: SkipReason::Duplicate,
                });
                continue;
            }

            match self.store_item(url, &fingerprint, &tags, &partition).await {
                Ok(path) => {
                    // Recorded immediately so a later source in the same pass
                    // sees it as a duplicate.
                    ledger.add(fingerprint.clone());
                    report.scraped += 1;
                    reporter.report(PassEvent::ItemScraped {
                        source: &source.name,
                        url,
                        fingerprint: &fingerprint,
                        path: &path,
                    });
                }
                Err(e) => {
                    report.failed += 1;
                    reporter.report(PassEvent::ItemFailed {
                        source: &source.name,
                        url,
                        error: &e,
                    });
                }
            }
        }

        report
    }

    async fn store_item(
        &self,
        url: &str,
        fingerprint: &str,
        tags: &TagSet,
        partition: &Path,
    ) -> Result<PathBuf, AppError> {
        let markdown = self.scraper.scrape(url, tags).await?;
        let path = partition.join(format!("{fingerprint}.md"));
        self.artifacts.write(&path, &markdown).await
    }
}
