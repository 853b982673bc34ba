//! CLI command definitions, routing, and tracing setup.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use devread_core::{CrawlProgress, CycleSummary, Orchestrator};
use devread_crawler::{HttpFetcher, SourceAdapter, SourceRegistry};
use devread_shared::{
    AppConfig, DevreadError, FetchConfig, PoolConfig, init_config, load_config, normalize_tag,
    resolve_db_path,
};
use devread_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// devread: keep a local index of posts from developer blogs.
#[derive(Parser)]
#[command(
    name = "devread",
    version,
    about = "Crawl developer blogs and keep a deduplicated local index of their posts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Database path (overrides `defaults.db_path`).
    #[arg(long, global = true, env = "DEVREAD_DB")]
    pub db: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run one crawl cycle per source.
    Crawl {
        /// Source to crawl (repeatable). Defaults to the enabled sources.
        #[arg(short, long = "source")]
        sources: Vec<String>,
    },

    /// Crawl every enabled source on a fixed interval until interrupted.
    Watch {
        /// Seconds between cycles (overrides `defaults.interval_secs`).
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// List stored posts, newest first.
    List {
        /// Only posts carrying this tag.
        #[arg(short, long)]
        tag: Option<String>,

        /// Maximum number of posts to print.
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Show the built-in sources.
    Sources,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "devread=info",
        1 => "devread=debug",
        _ => "devread=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Crawl { sources } => cmd_crawl(db, &sources).await,
        Command::Watch { interval } => cmd_watch(db, interval).await,
        Command::List { tag, limit } => cmd_list(db, tag.as_deref(), limit).await,
        Command::Sources => cmd_sources(),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn open_storage(db: Option<PathBuf>, config: &AppConfig) -> Result<Storage> {
    let path = match db {
        Some(path) => path,
        None => resolve_db_path(config)?,
    };
    info!(path = %path.display(), "opening post store");
    Ok(Storage::open(&path).await?)
}

fn orchestrator(
    config: &AppConfig,
    storage: Storage,
) -> Result<Orchestrator<HttpFetcher, Storage>> {
    let fetcher = HttpFetcher::new(&FetchConfig::from(config))?;
    Ok(Orchestrator::new(
        fetcher,
        Arc::new(storage),
        PoolConfig::from(config),
    ))
}

async fn run_cycles(
    orchestrator: &Orchestrator<HttpFetcher, Storage>,
    adapters: &[&dyn SourceAdapter],
) {
    for adapter in adapters {
        let progress = CliProgress::new();
        orchestrator.crawl(*adapter, &progress).await;
    }
}

async fn cmd_crawl(db: Option<PathBuf>, sources: &[String]) -> Result<()> {
    let config = load_config()?;
    let registry = SourceRegistry::new();
    let names = if sources.is_empty() {
        config.sources.enabled.as_slice()
    } else {
        sources
    };
    let adapters = registry.select(names)?;

    let storage = open_storage(db, &config).await?;
    let orchestrator = orchestrator(&config, storage)?;

    run_cycles(&orchestrator, &adapters).await;
    Ok(())
}

async fn cmd_watch(db: Option<PathBuf>, interval: Option<u64>) -> Result<()> {
    let config = load_config()?;
    let registry = SourceRegistry::new();
    let adapters = registry.select(&config.sources.enabled)?;

    let secs = interval.unwrap_or(config.defaults.interval_secs);
    if secs == 0 {
        return Err(
            DevreadError::validation("watch interval must be at least one second").into(),
        );
    }

    let storage = open_storage(db, &config).await?;
    let orchestrator = orchestrator(&config, storage)?;

    info!(
        interval_secs = secs,
        sources = adapters.len(),
        "watching sources, Ctrl-C stops after the current cycle"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C, watching until killed");
            std::future::pending::<()>().await;
        }
    };

    let orchestrator = &orchestrator;
    let adapters = adapters.as_slice();
    let cycles = watch_until(Duration::from_secs(secs), shutdown, move || {
        run_cycles(orchestrator, adapters)
    })
    .await;

    info!(cycles, "stopping watch");
    Ok(())
}

/// Run `cycle` on every tick of `period` until `shutdown` resolves.
///
/// The first tick fires immediately. A shutdown requested while a cycle is
/// running takes effect once that cycle has finished, so a pool is never
/// abandoned mid-drain. Returns the number of cycles run.
async fn watch_until<S, C, Fut>(period: Duration, shutdown: S, mut cycle: C) -> usize
where
    S: Future<Output = ()>,
    C: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut cycles = 0;
    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => return cycles,
            _ = ticker.tick() => {}
        }
        cycle().await;
        cycles += 1;
    }
}

async fn cmd_list(db: Option<PathBuf>, tag: Option<&str>, limit: u32) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(db, &config).await?;

    let posts = match tag {
        Some(tag) => storage.list_posts_by_tag(&normalize_tag(tag), limit).await?,
        None => storage.list_posts(limit).await?,
    };
    let total = storage.count_posts().await?;

    if posts.is_empty() {
        println!("No posts stored yet. Run `devread crawl` first.");
        return Ok(());
    }

    for post in &posts {
        println!("{}", post.name());
        println!("    {}", post.link());
        if !post.tags().is_empty() {
            println!("    tags: {}", post.tags().join(", "));
        }
    }
    println!();
    println!("  Showing {} of {total} posts", posts.len());

    Ok(())
}

fn cmd_sources() -> Result<()> {
    let config = load_config()?;
    let registry = SourceRegistry::new();

    for adapter in registry.all() {
        let enabled = config.sources.enabled.iter().any(|n| n == adapter.name());
        println!(
            "  {:<14} {:<5} {:<9} {}",
            adapter.name(),
            adapter.strategy().to_string(),
            if enabled { "enabled" } else { "disabled" },
            adapter.locations().len(),
        );
    }

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl CrawlProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, summary: &CycleSummary) {
        self.spinner.finish_and_clear();
        println!(
            "  {:<14} {} new, {} updated, {} unchanged, {} failed  ({} pages, {} unreachable, {:.1}s)",
            summary.source,
            summary.inserted,
            summary.updated,
            summary.unchanged,
            summary.failed,
            summary.documents_visited,
            summary.documents_failed,
            summary.elapsed.as_secs_f64(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn shutdown_during_a_cycle_waits_for_it_to_finish() {
        let (tx, rx) = oneshot::channel::<()>();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        let cycles = {
            let (started, finished) = (Arc::clone(&started), Arc::clone(&finished));
            watch_until(
                Duration::from_millis(5),
                async {
                    let _ = rx.await;
                },
                move || {
                    let (tx, started, finished) =
                        (Arc::clone(&tx), Arc::clone(&started), Arc::clone(&finished));
                    async move {
                        if started.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                            if let Some(tx) = tx.lock().unwrap().take() {
                                tx.send(()).unwrap();
                            }
                        }
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        finished.fetch_add(1, Ordering::SeqCst);
                    }
                },
            )
            .await
        };

        assert_eq!(cycles, 2);
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(finished.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn shutdown_before_first_tick_runs_nothing() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let cycles = watch_until(Duration::from_millis(5), async {}, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {}
        })
        .await;

        assert_eq!(cycles, 0);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
