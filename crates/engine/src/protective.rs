use crate::error::EngineError;
use async_trait::async_trait;
use chrono::Utc;
use core_types::OpenPosition;
use events::{EngineEvent, LogLevel, LogMessage, ProtectiveOrder, ProtectiveOrderKind};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Where protective orders go. Implemented by the exchange execution layer.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn place_protective_order(
        &self,
        position: &OpenPosition,
        kind: ProtectiveOrderKind,
        trigger_price: Decimal,
    ) -> Result<(), EngineError>;
}

/// Logs the orders it would place. Used when live trading is disabled.
#[derive(Debug, Default)]
pub struct DryRunGateway;

#[async_trait]
impl OrderGateway for DryRunGateway {
    async fn place_protective_order(
        &self,
        position: &OpenPosition,
        kind: ProtectiveOrderKind,
        trigger_price: Decimal,
    ) -> Result<(), EngineError> {
        tracing::info!(
            symbol = %position.symbol,
            position_id = %position.position_id,
            ?kind,
            %trigger_price,
            "[DRY RUN] Protective order"
        );
        Ok(())
    }
}

/// Places stop-loss and take-profit orders a fixed delay after a position opens.
///
/// Every scheduled task runs under a child of the scheduler's root token and is
/// keyed by position id, so closing the position (or shutting down) cancels any
/// order that has not been placed yet.
pub struct ProtectiveOrderScheduler {
    gateway: Arc<dyn OrderGateway>,
    delay: Duration,
    events: broadcast::Sender<EngineEvent>,
    root: CancellationToken,
    pending: Arc<Mutex<HashMap<Uuid, Pending>>>,
    generation: AtomicU64,
}

/// The cancellation handle of the latest placement scheduled for a position.
struct Pending {
    generation: u64,
    token: CancellationToken,
}

/// Drops the entry for `position_id` only while it still belongs to `generation`;
/// a rescheduled position keeps its newer entry.
fn release(pending: &Mutex<HashMap<Uuid, Pending>>, position_id: Uuid, generation: u64) {
    let mut pending = pending.lock();
    if pending.get(&position_id).is_some_and(|entry| entry.generation == generation) {
        pending.remove(&position_id);
    }
}

impl ProtectiveOrderScheduler {
    pub fn new(
        gateway: Arc<dyn OrderGateway>,
        delay: Duration,
        events: broadcast::Sender<EngineEvent>,
        root: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            delay,
            events,
            root,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Spawns the delayed placement for `position`. Missing levels are skipped.
    pub fn schedule(
        &self,
        position: OpenPosition,
        stop_loss: Option<Decimal>,
        take_profit: Option<Decimal>,
    ) -> JoinHandle<()> {
        let token = self.root.child_token();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let entry = Pending {
            generation,
            token: token.clone(),
        };
        if let Some(previous) = self.pending.lock().insert(position.position_id, entry) {
            previous.token.cancel();
        }

        let gateway = Arc::clone(&self.gateway);
        let events = self.events.clone();
        let pending = Arc::clone(&self.pending);
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(position_id = %position.position_id, "Protective orders cancelled before placement");
                    release(&pending, position.position_id, generation);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let orders = [
                (ProtectiveOrderKind::StopLoss, stop_loss),
                (ProtectiveOrderKind::TakeProfit, take_profit),
            ];
            for (kind, level) in orders {
                let Some(trigger_price) = level else { continue };
                if token.is_cancelled() {
                    break;
                }
                match gateway.place_protective_order(&position, kind, trigger_price).await {
                    Ok(()) => {
                        let _ = events.send(EngineEvent::ProtectiveOrderPlaced(ProtectiveOrder {
                            position_id: position.position_id,
                            symbol: position.symbol.clone(),
                            kind,
                            side: position.side.opposite(),
                            trigger_price,
                            placed_at: Utc::now(),
                        }));
                    }
                    Err(e) => {
                        tracing::error!(symbol = %position.symbol, ?kind, error = %e, "Failed to place protective order");
                        let _ = events.send(EngineEvent::Log(LogMessage::new(
                            LogLevel::Error,
                            format!("Failed to place {kind:?} for {} at {trigger_price}: {e}", position.symbol),
                        )));
                    }
                }
            }

            release(&pending, position.position_id, generation);
        })
    }

    /// Cancels the pending placement for a position. Returns false if nothing was pending.
    pub fn cancel(&self, position_id: Uuid) -> bool {
        match self.pending.lock().remove(&position_id) {
            Some(entry) => {
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}
