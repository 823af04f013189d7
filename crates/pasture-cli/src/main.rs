use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use pasture_client::{HtmdCleaner, ReqwestFetcher};
use pasture_core::scheduler::interval_minutes;
use pasture_core::traits::Scraper;
use pasture_core::urlnorm::{fingerprint, is_media_url, normalize};
use pasture_core::{
    Config, ConfigWatcher, Orchestrator, PageScraper, PastureFactory, RunMode, Scheduler,
    TracingPassReporter,
};
use pasture_store::{FsArtifactStore, LedgerFile, StatsFile, StoreConfig};

#[derive(Parser)]
#[command(
    name = "pasture",
    version,
    about = "Scrape articles linked from feeds into Markdown"
)]
struct Cli {
    /// Path to the TOML source configuration
    #[arg(short, long, global = true, env = "PASTURE_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Root directory for articles, the ledger and stats
    #[arg(short, long, global = true, env = "PASTURE_OUTPUT_DIR", default_value = "output")]
    output: PathBuf,

    #[command(flatten)]
    run: RunArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone)]
struct RunArgs {
    /// Request timeout in seconds, for feeds and article pages
    #[arg(long, env = "PASTURE_TIMEOUT_SECS", default_value_t = 30)]
    timeout: u64,

    /// User-Agent sent with every HTTP request
    #[arg(long, env = "PASTURE_USER_AGENT")]
    user_agent: Option<String>,

    /// Render article pages in headless Chromium (needs the `browser` feature)
    #[arg(long, default_value_t = false)]
    browser: bool,

    /// Run a single pass even if sources declare intervals
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Reload the configuration file when it changes
    #[arg(long, default_value_t = false)]
    watch_config: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline (the default when no command is given)
    Run(RunArgs),

    /// Validate the configuration and show how each source resolves
    Check,

    /// Show daily totals from stats.json
    Stats {
        /// Number of most recent days to show
        #[arg(short, long, default_value_t = 7)]
        days: usize,
    },

    /// Show the normalized form and fingerprint of a URL
    Fingerprint {
        /// Article URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pasture=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = StoreConfig::new(&cli.output);

    match cli.command.unwrap_or(Commands::Run(cli.run)) {
        Commands::Run(args) => cmd_run(&cli.config, &store, &args).await?,
        Commands::Check => cmd_check(&cli.config)?,
        Commands::Stats { days } => cmd_stats(&store, days),
        Commands::Fingerprint { url } => cmd_fingerprint(&url),
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<Config> {
    Config::load(path)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

async fn cmd_run(config_path: &Path, store: &StoreConfig, args: &RunArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let timeout = Duration::from_secs(args.timeout);
    let feeds = match &args.user_agent {
        Some(user_agent) => ReqwestFetcher::with_user_agent(timeout, user_agent),
        None => ReqwestFetcher::with_timeout(timeout),
    }
    .map_err(|e| anyhow::anyhow!(e))?;

    if args.browser {
        #[cfg(feature = "browser")]
        {
            let pages = pasture_client::BrowserFetcher::with_timeout(timeout)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            let scraper = PageScraper::new(pages, HtmdCleaner::new());
            return run_pipeline(config_path, config, store, feeds, scraper, args).await;
        }

        #[cfg(not(feature = "browser"))]
        anyhow::bail!("--browser requires pasture to be built with the `browser` feature");
    }

    let scraper = PageScraper::new(feeds.clone(), HtmdCleaner::new());
    run_pipeline(config_path, config, store, feeds, scraper, args).await
}

async fn run_pipeline<S: Scraper>(
    config_path: &Path,
    mut config: Config,
    store: &StoreConfig,
    feeds: ReqwestFetcher,
    scraper: S,
    args: &RunArgs,
) -> Result<()> {
    let orchestrator = Orchestrator::new(
        PastureFactory::new(feeds),
        scraper,
        FsArtifactStore::new(),
        LedgerFile::new(store.ledger_path()),
        store.output_dir(),
    );

    orchestrator
        .preflight(&config)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Configuration rejected")?;

    let reporter = (TracingPassReporter, StatsFile::new(store.stats_path()));
    let mut ledger = orchestrator.load_ledger();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown signal received, stopping after the current pass");
                on_signal.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Cannot listen for shutdown signal"),
        }
    });

    let mut scheduler = Scheduler::new();
    if args.once {
        scheduler = scheduler.with_mode(RunMode::SinglePass);
    }
    if args.watch_config {
        scheduler = scheduler.with_watcher(ConfigWatcher::new(config_path));
    }

    scheduler
        .run(&orchestrator, &mut config, &mut ledger, &reporter, cancel)
        .await;

    Ok(())
}

fn cmd_check(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let factory = PastureFactory::new(ReqwestFetcher::new().map_err(|e| anyhow::anyhow!(e))?);
    let mode = RunMode::for_config(&config);

    println!(
        "{}: {} source(s), {}",
        config_path.display(),
        config.sources.len(),
        match mode {
            RunMode::SinglePass => "single pass",
            RunMode::Continuous => "continuous",
        }
    );

    let mut invalid = 0;
    for source in &config.sources {
        match factory.create(source) {
            Ok(pasture) => {
                let every = match mode {
                    RunMode::SinglePass => "-".to_string(),
                    RunMode::Continuous => format!("{}m", interval_minutes(source)),
                };
                let tags: Vec<_> = config
                    .effective_tags(source)
                    .into_iter()
                    .collect();
                println!(
                    "  {:<20} {:<10} every {:<6} {}",
                    source.name,
                    factory.resolve_type(source),
                    every,
                    pasture.endpoint()
                );
                println!("  {:<20} strip: {}", "", tags.join(", "));
            }
            Err(e) => {
                invalid += 1;
                println!("  {:<20} ERROR {e}", source.name);
            }
        }
    }

    if invalid > 0 {
        anyhow::bail!("{invalid} source(s) are invalid");
    }
    Ok(())
}

fn cmd_stats(store: &StoreConfig, days: usize) {
    let stats = StatsFile::new(store.stats_path()).load();
    let recent = stats.recent_days(days);

    if recent.is_empty() {
        println!("No passes recorded yet in {}", store.stats_path().display());
        return;
    }

    println!(
        "{:<12} {:>6} {:>8} {:>10} {:>11} {:>7}",
        "Date", "Passes", "Scraped", "Duplicates", "Blacklisted", "Errors"
    );
    for (day, totals) in &recent {
        println!(
            "{:<12} {:>6} {:>8} {:>10} {:>11} {:>7}",
            day.format("%Y-%m-%d").to_string(),
            totals.passes,
            totals.scraped,
            totals.duplicates,
            totals.blacklisted,
            totals.errors
        );
    }

    let mut hits: Vec<(&String, usize)> = Vec::new();
    for (_, totals) in &recent {
        for (term, count) in &totals.blacklist_hits {
            match hits.iter_mut().find(|(t, _)| *t == term) {
                Some((_, total)) => *total += count,
                None => hits.push((term, *count)),
            }
        }
    }
    if !hits.is_empty() {
        hits.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        println!();
        println!("Top blacklist terms:");
        for (term, count) in hits.iter().take(10) {
            println!("  {term:<24} {count}");
        }
    }
}

fn cmd_fingerprint(url: &str) {
    println!("Normalized:  {}", normalize(url));
    println!("Fingerprint: {}", fingerprint(url));
    if is_media_url(url) {
        println!("Media:       yes (skipped by the pipeline)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bare_invocation_runs_pipeline() {
        let cli = Cli::try_parse_from(["pasture", "--once"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.run.once);
        assert!(!cli.run.watch_config);
    }

    #[test]
    fn run_subcommand_takes_flags() {
        let cli = Cli::try_parse_from([
            "pasture",
            "--config",
            "sources.toml",
            "run",
            "--watch-config",
            "--timeout",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("sources.toml"));
        match cli.command {
            Some(Commands::Run(args)) => {
                assert!(args.watch_config);
                assert_eq!(args.timeout, 5);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn global_options_combine_with_any_command() {
        let cli = Cli::try_parse_from(["pasture", "--output", "d", "stats", "--days", "3"]).unwrap();
        assert_eq!(cli.output, PathBuf::from("d"));
        assert!(matches!(cli.command, Some(Commands::Stats { days: 3 })));

        let cli = Cli::try_parse_from(["pasture", "check", "--config", "sources.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("sources.toml"));
        assert!(matches!(cli.command, Some(Commands::Check)));
    }

    #[test]
    fn user_agent_is_optional() {
        let cli = Cli::try_parse_from(["pasture", "run", "--user-agent", "pasture-test/1.0"]).unwrap();
        match cli.command {
            Some(Commands::Run(args)) => assert_eq!(args.user_agent.as_deref(), Some("pasture-test/1.0")),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn stats_days_defaults_to_a_week() {
        let cli = Cli::try_parse_from(["pasture", "stats"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Stats { days: 7 })));
    }
}
