use std::time::Duration;

use pasture_core::config::Config;
use pasture_core::scheduler::{Scheduler, SchedulerState};
use pasture_core::testutil::{MockFetcher, MockScraper};
use pasture_core::urlnorm;
use pasture_store::{StoreConfig, ledger};
use tokio_util::sync::CancellationToken;

use crate::integration::common::{WORLDNEWS, WORLDNEWS_URL, artifacts, orchestrator};

const WORLDNEWS_LATER: &str = r#"{"data": {"children": [
    {"data": {"id": "p3", "title": "New comet spotted", "url": "https://news.example.com/comet"}},
    {"data": {"id": "p4", "title": "Comet visible tonight", "url": "https://news.example.com/comet-tonight"}}
]}}"#;

#[tokio::test(start_paused = true)]
async fn timer_firing_picks_up_new_items_and_persists_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreConfig::new(dir.path());
    let fetcher = MockFetcher::routed([(WORLDNEWS_URL, WORLDNEWS)]);
    let scraper = MockScraper::new("# body");
    let orch = orchestrator(&store, fetcher.clone(), scraper.clone());

    let mut config = Config::from_toml_str(
        r#"
        [worldnews]
        blacklist = "politics"
        interval = 1
        "#,
    )
    .unwrap();
    let mut ledger = orch.load_ledger();
    let mut scheduler = Scheduler::new();

    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    let feed = fetcher.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        feed.route(WORLDNEWS_URL, WORLDNEWS_LATER);
        tokio::time::sleep(Duration::from_secs(60)).await;
        stopper.cancel();
    });

    scheduler
        .run(&orch, &mut config, &mut ledger, &(), cancel)
        .await;

    assert_eq!(scheduler.state(), SchedulerState::Idle);
    assert_eq!(fetcher.calls().len(), 2);
    assert_eq!(scraper.calls().len(), 2);

    let persisted = ledger::load(&store.ledger_path());
    assert_eq!(persisted.len(), 2);
    assert!(persisted.contains(&urlnorm::fingerprint("https://news.example.com/comet-tonight")));
    assert_eq!(artifacts(dir.path()).len(), 2);
}
