//! devicesync - a terminal view of a device fleet that keeps working offline.
//!
//! Shows the cached device list immediately, syncs it with the backend when
//! the network allows, and prints every state change as it happens.

mod probe;
mod render;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use devicesync_core::api::mock::MOCK_DELAY_MS;
use devicesync_core::{
    AttemptOutcome, CacheStore, Config, FileStore, HttpDeviceSource, KeyValueStore, LifecycleEvent,
    MemoryStore, MockDeviceSource, RemoteDataSource, SyncCoordinator, WatchNetworkMonitor,
};

// ============================================================================
// Constants
// ============================================================================

/// How often the reachability probe runs (in seconds)
const PROBE_INTERVAL_SECS: u64 = 15;

const USAGE: &str = "\
Usage: devicesync [OPTIONS]

Options:
  --mock             Use the simulated backend instead of DEVICESYNC_API_URL
  --fail-rate <f>    Fraction of simulated calls that fail (with --mock)
  --once             Run the start sync, print the result and exit
  --clear-cache      Delete the cached device list before starting
  --no-persist       Keep the device list in memory only
  --log-dir <dir>    Write logs to a daily file in <dir> instead of stderr
  -h, --help         Show this help

Commands (interactive mode):
  r          refresh now
  f          focus event
  g          foreground event
  d <id>     fetch one device
  q          quit";

#[derive(Debug, Default)]
struct Args {
    mock: bool,
    fail_rate: Option<f64>,
    once: bool,
    clear_cache: bool,
    no_persist: bool,
    log_dir: Option<PathBuf>,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut args = Self::default();
        let mut iter = std::env::args().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--mock" => args.mock = true,
                "--once" => args.once = true,
                "--clear-cache" => args.clear_cache = true,
                "--no-persist" => args.no_persist = true,
                "--fail-rate" => {
                    let value = iter.next().context("--fail-rate requires a value")?;
                    let rate: f64 = value
                        .parse()
                        .with_context(|| format!("Invalid --fail-rate: {}", value))?;
                    args.fail_rate = Some(rate);
                }
                "--log-dir" => {
                    let value = iter.next().context("--log-dir requires a directory")?;
                    args.log_dir = Some(PathBuf::from(value));
                }
                "-h" | "--help" => {
                    println!("{}", USAGE);
                    std::process::exit(0);
                }
                other => bail!("Unknown argument: {} (see --help)", other),
            }
        }
        Ok(args)
    }
}

/// Initialize the tracing subscriber for logging.
///
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug). With a
/// log directory, output goes to a daily file and the returned guard must be
/// held until exit so buffered lines get flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "devicesync.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse()?;
    let _log_guard = init_tracing(args.log_dir.as_deref());
    info!("devicesync starting");

    let config = Config::load()?;
    let engine_config = config.engine_config();
    let store: Arc<dyn KeyValueStore> = if args.no_persist {
        Arc::new(MemoryStore::new())
    } else {
        let cache_dir = config.cache_dir()?;
        let store = FileStore::new(cache_dir.clone())
            .with_context(|| format!("Failed to open cache directory {}", cache_dir.display()))?;
        Arc::new(store)
    };
    let cache = CacheStore::new(store).with_key(engine_config.cache_key.clone());

    if args.clear_cache {
        cache.clear()?;
        println!("Cache cleared");
    }

    let shutdown = CancellationToken::new();
    let network = Arc::new(WatchNetworkMonitor::new(true));

    let remote: Arc<dyn RemoteDataSource> = if args.mock {
        let source = match args.fail_rate {
            Some(rate) => MockDeviceSource::new(Duration::from_millis(MOCK_DELAY_MS), rate),
            None => MockDeviceSource::default(),
        };
        info!("Using simulated backend");
        Arc::new(source)
    } else {
        let Some(base_url) = config.api_base_url.clone() else {
            bail!("No API URL configured. Set DEVICESYNC_API_URL or run with --mock");
        };
        let mut source = HttpDeviceSource::new(&base_url, config.request_timeout())?;
        if let Some(token) = config.api_token.clone() {
            source = source.with_token(token);
        }

        let client = probe::client()?;
        network.set_connected(probe::check(&client, &base_url).await);
        tokio::spawn(probe::run(
            client,
            base_url,
            Arc::clone(&network),
            Duration::from_secs(PROBE_INTERVAL_SECS),
            shutdown.clone(),
        ));
        Arc::new(source)
    };

    let engine = SyncCoordinator::new(remote, cache, network, engine_config);

    let result = if args.once {
        run_once(&engine).await
    } else {
        run_interactive(&engine).await
    };

    engine.dispose();
    shutdown.cancel();
    info!("devicesync shutting down");
    result
}

/// Run the start attempt, print where it landed and exit.
async fn run_once(engine: &SyncCoordinator) -> Result<()> {
    let outcome = engine.start().await;
    debug!(?outcome, "Start attempt finished");

    let bound = engine.config().staleness_bound;
    render::print_state(&engine.state(), chrono::Utc::now(), bound);

    if outcome == AttemptOutcome::Failed {
        bail!("Sync failed, showing cached data");
    }
    Ok(())
}

async fn run_interactive(engine: &SyncCoordinator) -> Result<()> {
    let printer = {
        let mut states = engine.subscribe();
        let bound = engine.config().staleness_bound;
        tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let state = states.borrow_and_update().clone();
                render::print_state(&state, chrono::Utc::now(), bound);
            }
        })
    };

    let starter = {
        let engine = engine.clone();
        tokio::spawn(async move {
            let outcome = engine.start().await;
            debug!(?outcome, "Start attempt finished");
        })
    };

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    engine.attach_lifecycle(events_rx);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "q" => break,
            "r" => {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let outcome = engine.request_refresh().await;
                    debug!(?outcome, "Refresh finished");
                });
            }
            "f" => {
                let _ = events_tx.send(LifecycleEvent::Focus);
            }
            "g" => {
                let _ = events_tx.send(LifecycleEvent::Foreground);
            }
            _ => match line.strip_prefix("d ") {
                Some(id) => {
                    let engine = engine.clone();
                    let id = id.trim().to_string();
                    tokio::spawn(async move {
                        match engine.fetch_device(&id).await {
                            Ok(device) => render::print_device_detail(&device, chrono::Utc::now()),
                            Err(e) => println!("Could not fetch {}: {}", id, e),
                        }
                    });
                }
                None => println!("Unknown command: {} (r, f, g, d <id>, q)", line),
            },
        }
    }

    starter.abort();
    printer.abort();
    Ok(())
}
