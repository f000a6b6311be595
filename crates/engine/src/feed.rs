use crate::LiveEngine;
use core_types::{PriceBar, Timeframe};
use events::LogLevel;
use series_store::AppendOutcome;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Consumes one `(symbol, timeframe)` subscription until it ends or `shutdown` fires.
///
/// Each closed bar is ingested; a closed fast bar then drives the symbol's
/// entry or exit decision synchronously, so an evaluation always sees the bar
/// that triggered it. Rejected bars are logged by the core and skipped.
pub async fn run_feed(
    engine: Arc<LiveEngine>,
    symbol: String,
    timeframe: Timeframe,
    mut bars: mpsc::Receiver<PriceBar>,
    shutdown: CancellationToken,
) {
    tracing::info!(%symbol, %timeframe, "Feed started");
    let is_fast = timeframe == engine.core().fast_timeframe();

    loop {
        let bar = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!(%symbol, %timeframe, "Feed shutting down");
                break;
            }
            bar = bars.recv() => bar,
        };
        let Some(bar) = bar else {
            tracing::warn!(%symbol, %timeframe, "Bar stream ended");
            engine
                .core()
                .notify(LogLevel::Warn, format!("{symbol} {timeframe} bar stream ended"));
            break;
        };

        match engine.core().on_closed_bar(&symbol, timeframe, bar) {
            Ok(AppendOutcome::Appended { .. }) if is_fast => {
                if let Err(e) = engine.on_fast_bar(&symbol) {
                    tracing::error!(%symbol, error = %e, "Evaluation failed");
                }
            }
            Ok(_) => {}
            // Already logged and broadcast by the core.
            Err(_) => {}
        }
    }
}
