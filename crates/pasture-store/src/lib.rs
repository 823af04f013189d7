pub mod artifacts;
pub mod config;
mod fs;
pub mod ledger;
pub mod stats;

pub use artifacts::FsArtifactStore;
pub use config::StoreConfig;
pub use ledger::LedgerFile;
pub use stats::{DailyStats, SessionRecord, Stats, StatsFile};
