use crate::error::ApiError;
use chrono::{TimeZone, Utc};
use core_types::{PriceBar, Timeframe};
use futures_util::stream::{Stream, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use url::Url;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const CHANNEL_CAPACITY: usize = 1024;
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const STALE_AFTER: Duration = Duration::from_secs(120);

// --- WebSocket Deserialization Structs ---
#[derive(Debug, Deserialize)]
struct WsStreamWrapper<T> {
    #[allow(dead_code)]
    stream: String,
    data: T,
}

#[derive(Debug, Deserialize)]
struct WsKlineEvent {
    #[serde(rename = "e")]
    event_type: String,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "k")]
    kline: WsKline,
}

#[derive(Debug, Deserialize)]
struct WsKline {
    #[serde(rename = "t")]
    open_time: i64,
    #[serde(rename = "o")]
    open: String,
    #[serde(rename = "c")]
    close: String,
    #[serde(rename = "h")]
    high: String,
    #[serde(rename = "l")]
    low: String,
    #[serde(rename = "v")]
    volume: String,
    #[serde(rename = "x")]
    is_closed: bool,
}

fn decimal(field: &str, raw: &str) -> Result<Decimal, ApiError> {
    Decimal::from_str(raw).map_err(|e| ApiError::InvalidData(format!("{field} '{raw}': {e}")))
}

/// Converts one combined-stream text frame into a bar.
///
/// Returns `Ok(None)` for well-formed frames that are not kline events. Both
/// closed and still-forming klines are returned; `PriceBar::closed` tells them apart.
pub fn parse_kline_message(text: &str) -> Result<Option<PriceBar>, ApiError> {
    let wrapper: WsStreamWrapper<WsKlineEvent> =
        serde_json::from_str(text).map_err(|e| ApiError::Deserialization(e.to_string()))?;
    let event = wrapper.data;
    if event.event_type != "kline" {
        return Ok(None);
    }

    let k = event.kline;
    let open_time = Utc
        .timestamp_millis_opt(k.open_time)
        .single()
        .ok_or_else(|| ApiError::InvalidData(format!("open time {}", k.open_time)))?;

    Ok(Some(PriceBar {
        symbol: event.symbol,
        open_time,
        open: decimal("open", &k.open)?,
        high: decimal("high", &k.high)?,
        low: decimal("low", &k.low)?,
        close: decimal("close", &k.close)?,
        volume: decimal("volume", &k.volume)?,
        closed: k.is_closed,
    }))
}

/// Why a connected stream stopped being read.
#[derive(Debug, PartialEq, Eq)]
enum StreamEnd {
    Shutdown,
    ReceiverDropped,
    Disconnected,
    /// No text frame arrived for longer than the staleness limit.
    Stale,
}

/// Reads one connected stream, forwarding every parsed bar into `tx`.
///
/// A health check runs every `HEALTH_CHECK_INTERVAL`; once no data frame has
/// arrived for more than `stale_after` the stream is given up so the caller can
/// resubscribe. Pings and pongs do not count as data.
async fn forward_bars<S>(
    stream: &mut S,
    tx: &mpsc::Sender<PriceBar>,
    shutdown: &CancellationToken,
    stale_after: Duration,
    symbol: &str,
    timeframe: Timeframe,
) -> StreamEnd
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    let mut health = tokio::time::interval(HEALTH_CHECK_INTERVAL);
    health.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_data = Instant::now();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return StreamEnd::Shutdown,
            _ = health.tick() => {
                let silent = last_data.elapsed();
                if silent > stale_after {
                    tracing::warn!(symbol, %timeframe, ?silent, "Kline stream went silent. Resubscribing.");
                    return StreamEnd::Stale;
                }
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    last_data = Instant::now();
                    match parse_kline_message(&text) {
                        Ok(Some(bar)) => {
                            if tx.send(bar).await.is_err() {
                                return StreamEnd::ReceiverDropped;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::warn!(symbol, %timeframe, error = %e, "Skipping unparseable stream message");
                        }
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "WebSocket connection closed");
                    return StreamEnd::Disconnected;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::error!(error = %e, "WebSocket message error");
                    return StreamEnd::Disconnected;
                }
                None => return StreamEnd::Disconnected,
            }
        }
    }
}

/// Handles connection to the Binance futures WebSocket API and manages kline subscriptions.
pub struct LiveConnector {
    base_url: Url,
}

impl LiveConnector {
    /// Connects to production when `live_mode` is set, to the futures testnet otherwise.
    pub fn new(live_mode: bool) -> Result<Self, ApiError> {
        let base_url = if live_mode {
            "wss://fstream.binance.com"
        } else {
            "wss://stream.binancefuture.com"
        };
        Ok(Self {
            base_url: Url::parse(base_url)?,
        })
    }

    pub fn stream_url(&self, symbol: &str, timeframe: Timeframe) -> Url {
        let mut url = self.base_url.clone();
        url.set_path("/stream");
        url.set_query(Some(&format!(
            "streams={}@kline_{}",
            symbol.to_lowercase(),
            timeframe.as_str()
        )));
        url
    }

    /// Subscribes to one `(symbol, timeframe)` kline stream.
    ///
    /// A background task owns the connection, reconnects after
    /// `RECONNECT_DELAY` on any disconnect or after `STALE_AFTER` without data,
    /// and forwards every parsed bar (closed or not) into the returned channel. The task ends when `shutdown` is cancelled
    /// or the receiver is dropped.
    pub fn subscribe_to_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        shutdown: CancellationToken,
    ) -> Result<mpsc::Receiver<PriceBar>, ApiError> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let url = self.stream_url(symbol, timeframe);
        let symbol = symbol.to_uppercase();

        tracing::debug!(%url, "Subscribing to kline stream");

        tokio::spawn(async move {
            loop {
                tracing::info!(%symbol, %timeframe, "Connecting to kline stream...");
                let connected = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    result = connect_async(url.as_str()) => result,
                };

                match connected {
                    Ok((mut stream, _)) => {
                        tracing::info!(%symbol, %timeframe, "Kline stream connected.");
                        match forward_bars(&mut stream, &tx, &shutdown, STALE_AFTER, &symbol, timeframe).await {
                            StreamEnd::Shutdown => {
                                tracing::info!(%symbol, %timeframe, "Kline stream shutting down.");
                                return;
                            }
                            StreamEnd::ReceiverDropped => {
                                tracing::info!(%symbol, %timeframe, "Receiver dropped. Closing kline stream.");
                                return;
                            }
                            StreamEnd::Disconnected | StreamEnd::Stale => {}
                        }
                    }
                    Err(e) => {
                        tracing::error!(%symbol, %timeframe, error = %e, "WebSocket connection error.");
                    }
                }

                tracing::warn!(%symbol, %timeframe, "Kline stream disconnected. Reconnecting in {:?}...", RECONNECT_DELAY);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                }
            }
        });

        Ok(rx)
    }
}
