//! Run statistics kept next to the ledger.
//!
//! `stats.json` holds the most recent pass records and one aggregate per
//! calendar day. It is informational only: failing to read or write it never
//! affects a pass.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, Utc};
use pasture_core::error::AppError;
use pasture_core::pipeline::{PassEvent, PassReport, PassReporter};
use serde::{Deserialize, Serialize};

use crate::fs::write_atomic;

pub const MAX_SESSIONS: usize = 100;
pub const MAX_DAYS: usize = 90;

/// One pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<String>,
    pub scraped: usize,
    pub duplicates: usize,
    pub blacklisted: usize,
    pub errors: usize,
    pub blacklist_hits: BTreeMap<String, usize>,
    pub scraped_by_source: BTreeMap<String, usize>,
}

impl SessionRecord {
    pub fn from_report(report: &PassReport) -> Self {
        Self {
            started_at: report.started_at,
            finished_at: report.finished_at,
            sources: report.sources.iter().map(|s| s.source.clone()).collect(),
            scraped: report.scraped(),
            duplicates: report.duplicates(),
            blacklisted: report.blacklisted(),
            errors: report.errors(),
            blacklist_hits: report.blacklist_hits(),
            scraped_by_source: report
                .sources
                .iter()
                .filter(|s| s.scraped > 0)
                .map(|s| (s.source.clone(), s.scraped))
                .collect(),
        }
    }
}

/// Totals for one local calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub passes: usize,
    pub scraped: usize,
    pub duplicates: usize,
    pub blacklisted: usize,
    pub errors: usize,
    pub blacklist_hits: BTreeMap<String, usize>,
    pub scraped_by_source: BTreeMap<String, usize>,
}

impl DailyStats {
    fn absorb(&mut self, session: &SessionRecord) {
        self.passes += 1;
        self.scraped += session.scraped;
        self.duplicates += session.duplicates;
        self.blacklisted += session.blacklisted;
        self.errors += session.errors;
        for (term, count) in &session.blacklist_hits {
            *self.blacklist_hits.entry(term.clone()).or_default() += count;
        }
        for (source, count) in &session.scraped_by_source {
            *self.scraped_by_source.entry(source.clone()).or_default() += count;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
    /// Keyed by local date, `YYYY-MM-DD`.
    #[serde(default)]
    pub daily: BTreeMap<NaiveDate, DailyStats>,
}

impl Stats {
    /// Append a pass, keeping the newest sessions and days only.
    pub fn record(&mut self, report: &PassReport) {
        let session = SessionRecord::from_report(report);
        let day = report.finished_at.with_timezone(&Local).date_naive();

        self.daily.entry(day).or_default().absorb(&session);
        while self.daily.len() > MAX_DAYS {
            self.daily.pop_first();
        }

        self.sessions.push(session);
        if self.sessions.len() > MAX_SESSIONS {
            let excess = self.sessions.len() - MAX_SESSIONS;
            self.sessions.drain(..excess);
        }
    }

    /// The newest `days` daily aggregates, newest first.
    pub fn recent_days(&self, days: usize) -> Vec<(NaiveDate, &DailyStats)> {
        self.daily
            .iter()
            .rev()
            .take(days)
            .map(|(day, stats)| (*day, stats))
            .collect()
    }
}

/// Persists [`Stats`] and records every finished pass.
#[derive(Debug, Clone)]
pub struct StatsFile {
    path: PathBuf,
}

impl StatsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or corrupt files yield empty stats.
    pub fn load(&self) -> Stats {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %self.path.display(), error = %e, "Stats file corrupt, starting fresh");
                Stats::default()
            }),
            Err(_) => Stats::default(),
        }
    }

    pub fn record_pass(&self, report: &PassReport) -> Result<(), AppError> {
        let mut stats = self.load();
        stats.record(report);
        let json = serde_json::to_vec_pretty(&stats)?;
        write_atomic(&self.path, &json)
    }
}

impl PassReporter for StatsFile {
    fn report(&self, event: PassEvent<'_>) {
        if let PassEvent::PassFinished { report } = event {
            if let Err(e) = self.record_pass(report) {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to write stats");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use pasture_core::pipeline::SourceReport;

    fn report(at: DateTime<Utc>, scraped: usize, hits: &[(&str, usize)]) -> PassReport {
        PassReport {
            started_at: at - TimeDelta::seconds(5),
            finished_at: at,
            sources: vec![SourceReport {
                source: "worldnews".into(),
                scraped,
                duplicates: 1,
                failed: 1,
                blacklisted: hits.iter().map(|(t, c)| (t.to_string(), *c)).collect(),
                ..Default::default()
            }],
            ledger_saved: true,
        }
    }

    #[test]
    fn record_aggregates_by_day() {
        let now = Utc::now();
        let mut stats = Stats::default();
        stats.record(&report(now, 2, &[("politics", 1)]));
        stats.record(&report(now, 3, &[("politics", 2), ("crypto", 1)]));

        assert_eq!(stats.sessions.len(), 2);
        let (_, today) = stats.recent_days(1)[0];
        assert_eq!(today.passes, 2);
        assert_eq!(today.scraped, 5);
        assert_eq!(today.duplicates, 2);
        assert_eq!(today.errors, 2);
        assert_eq!(today.blacklisted, 4);
        assert_eq!(today.blacklist_hits.get("politics"), Some(&3));
        assert_eq!(today.scraped_by_source.get("worldnews"), Some(&5));
    }

    #[test]
    fn retention_limits_sessions_and_days() {
        let now = Utc::now();
        let mut stats = Stats::default();
        for day in 0..(MAX_DAYS as i64 + 20) {
            stats.record(&report(now - TimeDelta::days(day), 1, &[]));
        }

        assert_eq!(stats.sessions.len(), MAX_SESSIONS);
        assert_eq!(stats.daily.len(), MAX_DAYS);
        let newest = stats.recent_days(1)[0].0;
        assert_eq!(newest, now.with_timezone(&Local).date_naive());
    }

    #[test]
    fn reporter_writes_on_pass_finished_only() {
        let dir = tempfile::tempdir().unwrap();
        let file = StatsFile::new(dir.path().join("stats.json"));

        file.report(PassEvent::PassStarted { sources: 1 });
        assert!(!file.path().exists());

        let r = report(Utc::now(), 1, &[]);
        file.report(PassEvent::PassFinished { report: &r });
        file.report(PassEvent::PassFinished { report: &r });

        let stats = file.load();
        assert_eq!(stats.sessions.len(), 2);
        assert_eq!(stats.recent_days(7).len(), 1);
    }

    #[test]
    fn corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.json");
        std::fs::write(&path, "{oops").unwrap();

        let file = StatsFile::new(&path);
        assert_eq!(file.load(), Stats::default());
        file.record_pass(&report(Utc::now(), 1, &[])).unwrap();
        assert_eq!(file.load().sessions.len(), 1);
    }
}
