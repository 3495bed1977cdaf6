use anyhow::Result;
use clap::Parser;
use common::{Config, ReqwestFetcher};
use leetcode::cache::{BADGES_CACHE_KEY, STATS_CACHE_KEY};
use leetcode::{render_markdown, Cache, Endpoints, FileBackend, StatsController, SystemClock};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Discard cached stats and badges before fetching
    #[arg(long)]
    refresh: bool,

    /// Discard cached stats and badges, then exit
    #[arg(long)]
    clear_cache: bool,

    /// Do not look up the contest rating
    #[arg(long)]
    skip_contest: bool,
}

fn build_cache(config: &Config) -> Result<Cache> {
    let clock = Arc::new(SystemClock);
    if config.cache.disabled {
        info!("Cache disabled, nothing will be persisted");
        return Ok(Cache::disabled(clock));
    }

    let dir = config.require_cache_dir()?;
    info!("Using cache directory {}", dir.display());
    Ok(Cache::new(
        Arc::new(FileBackend::new(dir.clone())),
        clock,
        config.cache.ttl,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load environment variables
    let _ = dotenv::dotenv();

    // Configure tracing, stdout is reserved for the rendered widget
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration and open the cache
    let config = Config::from_env()?;
    let cache = build_cache(&config)?;

    if args.clear_cache {
        cache.clear(STATS_CACHE_KEY);
        cache.clear(BADGES_CACHE_KEY);
        info!("Cache cleared");
        return Ok(());
    }

    // Build the controller
    let fetcher = ReqwestFetcher::new(&config.http.user_agent, config.http.request_timeout)?;
    let endpoints = Endpoints::for_user(&config.endpoints, &config.username);
    let controller = Arc::new(
        StatsController::new(Arc::new(fetcher), cache, endpoints)
            .with_request_timeout(config.http.request_timeout),
    );

    // Show cached data first unless a manual refresh was requested
    if !args.refresh {
        if let Some(state) = controller.load_initial().await {
            info!(
                "Loaded cached snapshot with {} solved",
                state.snapshot.stats.total_solved
            );
        }
    }

    // Contest lookup runs as its own task beside the stats refresh
    let contest_task = (!args.skip_contest).then(|| {
        let controller = controller.clone();
        tokio::spawn(async move { controller.refresh_contest().await })
    });

    let state = if args.refresh {
        controller.manual_refresh().await
    } else {
        controller.refresh().await
    };

    // Wait for the contest lookup
    let contest = match contest_task {
        Some(task) => match task.await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Contest lookup task failed: {}", e);
                None
            }
        },
        None => None,
    };

    if let Some(error) = &state.error {
        warn!("Finished with errors ({:?} data): {}", state.source, error);
    } else {
        info!("Finished with {:?} data", state.source);
    }

    // Print the widget
    println!("{}", render_markdown(&state, contest.as_ref()));

    Ok(())
}
