//! ==============================================================================
//! main.rs - maceta host entry point
//! ==============================================================================
//!
//! purpose:
//!     wires the realtime feed, the aggregator and the dashboard together.
//!
//! responsibilities:
//!     - load host.toml (or --config) and set up logging
//!     - pick the feed: firebase rest polling, or the in-memory tree
//!     - optionally run the simulator into the in-memory tree
//!     - start discovery and apply feed events one at a time
//!     - serve the dashboard until ctrl-c, then release every subscription
//!
//! architecture:
//!
//!     ┌──────────────────────────────────────────────────────────────┐
//!     │                     maceta host (this file)                   │
//!     │  ┌─────────────┐   ┌──────────────┐   ┌──────────────────┐   │
//!     │  │  feed       │──►│ event loop   │──►│ aggregator       │   │
//!     │  │ (firebase / │   │ (drive)      │   │ Arc<RwLock<..>>  │   │
//!     │  │  memory)    │   └──────────────┘   └────────┬─────────┘   │
//!     │  └─────▲───────┘                               │             │
//!     │        │ simulator (optional)          ┌───────┴─────────┐   │
//!     │        └───────────────────            │ web server      │   │
//!     │                                        │ (port 3000)     │   │
//!     │                                        └─────────────────┘   │
//!     └──────────────────────────────────────────────────────────────┘
//!
//! ==============================================================================

use maceta_host::aggregator::{self, Aggregator};
use maceta_host::config::{FeedKind, HostConfig};
use maceta_host::feed::RealtimeFeed;
use maceta_host::firebase::FirebaseFeed;
use maceta_host::memory_feed::MemoryFeed;
use maceta_host::selection::View;
use maceta_host::server::{self, AppState};
use maceta_host::simulator::Simulator;
use maceta_host::timefmt::parse_timezone;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "maceta-host", about = "Live dashboard for networked plant pots")]
struct Args {
    /// path to host.toml (default: ./config/host.toml, then ../config/host.toml)
    #[arg(long, env = "MACETA_CONFIG")]
    config: Option<PathBuf>,

    /// run against the in-memory feed with simulated sensors
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // step 1: load configuration
    let mut config = match &args.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::load_or_default(),
    };
    if args.simulate {
        config.feed.kind = FeedKind::Memory;
        config.simulator.enabled = true;
    }

    // step 2: logging (RUST_LOG wins over the config)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("invalid logging.level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("===========================================================");
    println!("  Maceta Host - plant pot monitor");
    println!("===========================================================");
    config.print_summary();

    // step 3: the feed
    let mut simulator = None;
    let feed: Arc<dyn RealtimeFeed> = match config.feed.kind {
        FeedKind::Firebase => {
            if config.simulator.enabled {
                tracing::warn!("[STARTUP] simulator needs feed.kind = \"memory\"; ignoring it");
            }
            Arc::new(FirebaseFeed::new(&config.feed))
        }
        FeedKind::Memory => {
            let memory = MemoryFeed::new();
            if config.simulator.enabled {
                simulator = Some(Simulator::new(memory.clone(), config.simulator.sensors.clone()));
            }
            Arc::new(memory)
        }
    };

    // step 4: the aggregator and its event loop
    let (mut agg, events) = Aggregator::new(feed);
    for view in View::ALL {
        agg = agg.with_policy(view, config.dashboard.policy(view));
    }
    let mut agg = agg.with_reading_log(config.logging.show_sensor_data);
    agg.start();

    let shared = Arc::new(RwLock::new(agg));
    let event_loop = tokio::spawn(aggregator::drive(shared.clone(), events));
    tracing::info!("[STARTUP] ✓ Sensor discovery started");

    let simulator_task = simulator.map(|sim| {
        let interval = Duration::from_secs(config.simulator.interval_seconds);
        tokio::spawn(sim.run(interval))
    });

    // step 5: serve until ctrl-c
    let state = AppState {
        aggregator: shared.clone(),
        language: config.dashboard.language,
        timezone: parse_timezone(&config.dashboard.timezone),
    };
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("[SHUTDOWN] could not listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("[SHUTDOWN] ctrl-c received");
    };
    let served = server::serve(state, &config.server.bind, shutdown).await;

    // step 6: teardown
    if let Some(task) = simulator_task {
        task.abort();
    }
    shared.write().await.shutdown();
    event_loop.abort();

    served
}
