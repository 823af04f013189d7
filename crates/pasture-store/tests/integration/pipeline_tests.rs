use chrono::Local;
use pasture_core::config::Config;
use pasture_core::pipeline::TracingPassReporter;
use pasture_core::tags::TagSet;
use pasture_core::testutil::{MockFetcher, MockScraper};
use pasture_core::urlnorm;
use pasture_store::{StatsFile, StoreConfig, ledger};

use crate::integration::common::{WORLDNEWS, WORLDNEWS_URL, artifacts, orchestrator, snapshot};

fn worldnews_config() -> Config {
    Config::from_toml_str(
        r#"
        [global]
        remove_tags = "script, style, nav"

        [worldnews]
        url = "https://www.reddit.com/r/worldnews/.json"
        blacklist = "politics"
        remove_tags = "-nav, form"
        "#,
    )
    .unwrap()
}

#[tokio::test]
async fn worldnews_pass_writes_one_artifact_and_one_ledger_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreConfig::new(dir.path());
    let scraper = MockScraper::new("# New comet spotted\n\nAstronomers...");
    let orch = orchestrator(
        &store,
        MockFetcher::routed([(WORLDNEWS_URL, WORLDNEWS)]),
        scraper.clone(),
    );

    let mut ledger = orch.load_ledger();
    assert!(ledger.is_empty());
    let report = orch.run_pass(&worldnews_config(), &mut ledger, &()).await;

    assert_eq!(report.scraped(), 1);
    assert_eq!(scraper.calls().len(), 1);

    let fp = urlnorm::fingerprint("https://news.example.com/comet");
    let today = Local::now().date_naive();
    let expected = std::path::PathBuf::from(today.format("%Y/%m/%d").to_string())
        .join("worldnews")
        .join(format!("{fp}.md"));
    assert_eq!(artifacts(dir.path()), vec![expected.clone()]);
    assert_eq!(
        std::fs::read_to_string(dir.path().join(&expected)).unwrap(),
        "# New comet spotted\n\nAstronomers..."
    );

    let persisted = ledger::load(&store.ledger_path());
    assert_eq!(persisted.len(), 1);
    assert!(persisted.contains(&fp));
}

#[tokio::test]
async fn second_pass_on_unchanged_feed_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreConfig::new(dir.path());
    let scraper = MockScraper::new("# body");
    let orch = orchestrator(
        &store,
        MockFetcher::routed([(WORLDNEWS_URL, WORLDNEWS)]),
        scraper.clone(),
    );
    let config = worldnews_config();

    let mut ledger = orch.load_ledger();
    orch.run_pass(&config, &mut ledger, &()).await;
    let before = snapshot(dir.path());

    // fresh process: reload the ledger from disk
    let mut ledger = orch.load_ledger();
    let report = orch.run_pass(&config, &mut ledger, &()).await;

    assert_eq!(report.scraped(), 0);
    assert_eq!(report.duplicates(), 1);
    assert_eq!(scraper.calls().len(), 1);
    assert_eq!(snapshot(dir.path()), before);
}

#[tokio::test]
async fn corrupt_ledger_is_replaced_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreConfig::new(dir.path());
    std::fs::write(store.ledger_path(), "{not json").unwrap();

    let orch = orchestrator(
        &store,
        MockFetcher::routed([(WORLDNEWS_URL, WORLDNEWS)]),
        MockScraper::new("# body"),
    );
    let mut ledger = orch.load_ledger();
    assert!(ledger.is_empty());

    let report = orch.run_pass(&worldnews_config(), &mut ledger, &()).await;
    assert!(report.ledger_saved);
    assert_eq!(ledger::load(&store.ledger_path()).len(), 1);
}

#[tokio::test]
async fn effective_tags_reach_the_scraper() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreConfig::new(dir.path());
    let scraper = MockScraper::new("# body");
    let orch = orchestrator(
        &store,
        MockFetcher::routed([(WORLDNEWS_URL, WORLDNEWS)]),
        scraper.clone(),
    );

    let mut ledger = orch.load_ledger();
    orch.run_pass(&worldnews_config(), &mut ledger, &()).await;

    let tags = scraper
        .tags_for("https://news.example.com/comet?utm_source=reddit&utm_medium=social")
        .unwrap();
    let expected: TagSet = ["script", "style", "form"].iter().map(|t| t.to_string()).collect();
    assert_eq!(tags, expected);
}

#[tokio::test]
async fn stats_file_records_each_pass() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreConfig::new(dir.path());
    let orch = orchestrator(
        &store,
        MockFetcher::routed([(WORLDNEWS_URL, WORLDNEWS)]),
        MockScraper::new("# body"),
    );
    let reporter = (TracingPassReporter, StatsFile::new(store.stats_path()));
    let config = worldnews_config();

    let mut ledger = orch.load_ledger();
    orch.run_pass(&config, &mut ledger, &reporter).await;
    orch.run_pass(&config, &mut ledger, &reporter).await;

    let stats = StatsFile::new(store.stats_path()).load();
    assert_eq!(stats.sessions.len(), 2);
    assert_eq!(stats.sessions[0].scraped, 1);
    assert_eq!(stats.sessions[1].duplicates, 1);

    let (_, today) = stats.recent_days(1)[0];
    assert_eq!(today.passes, 2);
    assert_eq!(today.scraped, 1);
    assert_eq!(today.blacklist_hits.get("politics"), Some(&2));
}
