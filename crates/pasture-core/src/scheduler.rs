//! Run-mode decision and per-source timers.
//!
//! Single-pass mode runs the orchestrator once. Continuous mode runs one full
//! pass, then re-runs each source on its own interval. Timers fire one at a
//! time into the same task, so the ledger is never written concurrently.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, SourceConfig};
use crate::error::AppError;
use crate::ledger::Ledger;
use crate::pipeline::{Orchestrator, PassReporter};
use crate::traits::{ArtifactStore, Fetcher, LedgerStore, Scraper};

/// Interval for sources that declare none once continuous mode is active.
pub const DEFAULT_INTERVAL_MINUTES: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    SinglePass,
    Continuous,
}

impl RunMode {
    /// Continuous as soon as any source declares a positive interval.
    pub fn for_config(config: &Config) -> Self {
        if config.sources.iter().any(|s| s.interval_minutes.is_some()) {
            RunMode::Continuous
        } else {
            RunMode::SinglePass
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Armed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTimer {
    pub source: String,
    pub every: Duration,
    pub next_due: Instant,
}

pub fn interval_minutes(source: &SourceConfig) -> u64 {
    source.interval_minutes.unwrap_or(DEFAULT_INTERVAL_MINUTES)
}

pub struct Scheduler {
    state: SchedulerState,
    timers: Vec<SourceTimer>,
    minute: Duration,
    mode: Option<RunMode>,
    watcher: Option<ConfigWatcher>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            timers: Vec::new(),
            minute: Duration::from_secs(60),
            mode: None,
            watcher: None,
        }
    }

    /// Length of one configured "minute". Only tests shorten it.
    pub fn with_minute(mut self, minute: Duration) -> Self {
        self.minute = minute;
        self
    }

    /// Override the mode derived from the configuration.
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_watcher(mut self, watcher: ConfigWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn timers(&self) -> &[SourceTimer] {
        &self.timers
    }

    /// One timer per configured source, in configuration order.
    ///
    /// Sources that already had a timer with the same interval keep their due
    /// time; new or changed sources become due one interval from `now`.
    pub fn arm(&mut self, config: &Config, now: Instant) {
        let previous = std::mem::take(&mut self.timers);

        self.timers = config
            .sources
            .iter()
            .map(|source| {
                let every = self.period(source);
                let next_due = previous
                    .iter()
                    .find(|t| t.source == source.name && t.every == every)
                    .map_or(now + every, |t| t.next_due);
                SourceTimer {
                    source: source.name.clone(),
                    every,
                    next_due,
                }
            })
            .collect();

        self.state = SchedulerState::Armed;
    }

    fn period(&self, source: &SourceConfig) -> Duration {
        let minutes = u32::try_from(interval_minutes(source)).unwrap_or(u32::MAX);
        self.minute.saturating_mul(minutes)
    }

    /// Earliest timer; ties go to the source listed first.
    pub fn next_due(&self) -> Option<&SourceTimer> {
        self.timers.iter().min_by_key(|t| t.next_due)
    }

    fn reschedule(&mut self, source: &str, now: Instant) {
        if let Some(timer) = self.timers.iter_mut().find(|t| t.source == source) {
            timer.next_due = now + timer.every;
        }
    }

    /// Run until the configuration is exhausted (single-pass) or `cancel`
    /// fires (continuous). A pass that has started always completes.
    pub async fn run<F, S, A, L, R>(
        &mut self,
        orchestrator: &Orchestrator<F, S, A, L>,
        config: &mut Config,
        ledger: &mut Ledger,
        reporter: &R,
        cancel: CancellationToken,
    ) where
        F: Fetcher,
        S: Scraper,
        A: ArtifactStore,
        L: LedgerStore,
        R: PassReporter,
    {
        let mode = self.mode.unwrap_or_else(|| RunMode::for_config(config));
        tracing::info!(?mode, sources = config.sources.len(), "Scheduler starting");

        self.state = SchedulerState::Running;
        orchestrator.run_pass(config, ledger, reporter).await;

        if mode == RunMode::SinglePass || cancel.is_cancelled() {
            self.state = SchedulerState::Idle;
            return;
        }

        self.arm(config, Instant::now());
        for timer in &self.timers {
            tracing::info!(
                source = %timer.source,
                every_secs = timer.every.as_secs(),
                "Timer armed"
            );
        }

        loop {
            let deadline = self
                .next_due()
                .map_or_else(|| Instant::now() + self.minute, |t| t.next_due);

            tokio::select! {
                () = tokio::time::sleep_until(deadline) => {}
                () = cancel.cancelled() => break,
            }

            self.reload(orchestrator, config);

            let now = Instant::now();
            let Some(due) = self
                .next_due()
                .filter(|t| t.next_due <= now)
                .map(|t| t.source.clone())
            else {
                continue;
            };

            self.state = SchedulerState::Running;
            orchestrator.run_source(config, &due, ledger, reporter).await;
            self.reschedule(&due, Instant::now());
            self.state = SchedulerState::Armed;
        }

        tracing::info!("Scheduler stopped");
        self.state = SchedulerState::Idle;
    }

    fn reload<F, S, A, L>(&mut self, orchestrator: &Orchestrator<F, S, A, L>, config: &mut Config)
    where
        F: Fetcher,
        S: Scraper,
        A: ArtifactStore,
        L: LedgerStore,
    {
        let Some(reloaded) = self.watcher.as_mut().and_then(ConfigWatcher::poll) else {
            return;
        };

        match reloaded.and_then(|new| orchestrator.preflight(&new).map(|()| new)) {
            Ok(new) => {
                tracing::info!(sources = new.sources.len(), "Configuration reloaded");
                *config = new;
                self.arm(config, Instant::now());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring changed configuration");
            }
        }
    }
}

/// Detects changes to the configuration file by modification time.
#[derive(Debug, Clone)]
pub struct ConfigWatcher {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = modified(&path);
        Self {
            path,
            last_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Some` with the freshly parsed file when it changed since the last poll.
    pub fn poll(&mut self) -> Option<Result<Config, AppError>> {
        let current = modified(&self.path);
        if current.is_none() || current == self.last_modified {
            return None;
        }
        self.last_modified = current;
        Some(Config::load(&self.path))
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}
