pub mod config;
pub mod error;
pub mod factory;
pub mod ledger;
pub mod models;
pub mod pasture;
pub mod pipeline;
pub mod scheduler;
pub mod scrape;
pub mod tags;
pub mod traits;
pub mod urlnorm;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::{Config, GlobalPolicy, SourceConfig};
pub use error::AppError;
pub use factory::PastureFactory;
pub use ledger::Ledger;
pub use models::{Item, ItemFlags, SourceKind, compute_hash};
pub use pasture::Pasture;
pub use pipeline::{
    Orchestrator, PassEvent, PassReport, PassReporter, SourceReport, TracingPassReporter,
};
pub use scheduler::{ConfigWatcher, RunMode, Scheduler};
pub use scrape::PageScraper;
pub use tags::TagSet;
pub use traits::{ArtifactStore, Cleaner, Fetcher, LedgerStore, Scraper};
