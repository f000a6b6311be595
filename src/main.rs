use anyhow::Context;
use api_client::LiveConnector;
use clap::{Parser, Subcommand};
use configuration::{Config, load_config};
use engine::{DryRunGateway, LiveEngine, ProtectiveOrderScheduler, TradingCore};
use events::EngineEvent;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use strategies::StrategyRegistry;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// The main entry point for the Vegas tunnel signal engine.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; environment overrides are optional.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    // Keep the guard alive so the rolling file writer flushes on exit.
    let _log_guard = configuration::init_tracing(&config.logging)?;

    let registry = StrategyRegistry::from_config(&config.strategies)?;

    match cli.command {
        Commands::Live => run_live(config, registry).await,
        Commands::CheckConfig => {
            let symbols: Vec<&str> = config.enabled_bots().map(|b| b.symbol.as_str()).collect();
            println!(
                "Configuration OK: {} on {}/{} for [{}]",
                registry.names().join(", "),
                config.live.fast_timeframe,
                config.live.slow_timeframe,
                symbols.join(", ")
            );
            Ok(())
        }
        Commands::Info => {
            let infos = registry
                .names()
                .iter()
                .map(|name| registry.get(name).map(|s| s.info()))
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", serde_json::to_string_pretty(&infos)?);
            Ok(())
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Multi-timeframe Vegas tunnel signal engine for crypto futures.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream live klines and emit signals until Ctrl-C.
    Live,
    /// Load and validate the configuration, then exit.
    CheckConfig,
    /// Print the registered strategies and their parameters as JSON.
    Info,
}

// ==============================================================================
// Live Command Logic
// ==============================================================================

async fn run_live(config: Config, registry: StrategyRegistry) -> anyhow::Result<()> {
    let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    let core = Arc::new(TradingCore::new(&config, &registry, events_tx.clone())?);
    let shutdown = CancellationToken::new();

    if config.live.live_trading_enabled {
        tracing::warn!("Live market data enabled; protective orders are still dry-run only");
    }
    let scheduler = ProtectiveOrderScheduler::new(
        Arc::new(DryRunGateway),
        Duration::from_secs(config.live.protective_order_delay_secs),
        events_tx,
        shutdown.clone(),
    );
    let engine = Arc::new(LiveEngine::new(Arc::clone(&core), scheduler));
    let connector = LiveConnector::new(config.live.live_trading_enabled)?;

    let mut tasks = vec![tokio::spawn(log_events(core.subscribe(), shutdown.clone()))];
    for symbol in core.symbols() {
        // Slow first so the higher-timeframe filter starts filling before entries are checked.
        for timeframe in [core.slow_timeframe(), core.fast_timeframe()] {
            let bars = connector.subscribe_to_bars(&symbol, timeframe, shutdown.clone())?;
            tasks.push(engine.spawn_feed(symbol.clone(), timeframe, bars, shutdown.clone()));
        }
    }
    tracing::info!(symbols = ?core.symbols(), feeds = tasks.len() - 1, "Live engine running. Press Ctrl-C to stop.");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    shutdown.cancel();

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Task failed during shutdown");
        }
    }
    tracing::info!("Live engine stopped");
    Ok(())
}

/// Writes every engine event to the log as JSON until shutdown.
async fn log_events(mut events: broadcast::Receiver<EngineEvent>, shutdown: CancellationToken) {
    loop {
        let received = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = events.recv() => received,
        };
        match received {
            Ok(event) => match event.to_json() {
                Ok(json) => tracing::info!(target: "events", "{json}"),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize event"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event logger lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
