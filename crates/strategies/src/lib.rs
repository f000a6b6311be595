//! # Vegas Strategy Library
//!
//! This crate contains the trading logic of the system: the EMA indicator,
//! the tunnel classifier built on it, and the dual-timeframe Vegas tunnel
//! entry and trailing-exit rules.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** No I/O, no clocks, no shared state. Every evaluation is a
//!   function of the bar history it is handed. It depends only on `core-types`
//!   and `configuration`.
//! - **Exact Arithmetic:** Every indicator is computed in `Decimal`, so flat
//!   series stay flat and equal tunnel bounds compare equal.
//! - **Validated Construction:** `VegasTunnel::new` rejects inconsistent
//!   parameters, so a registered strategy is always usable.
//!
//! ## Public API
//!
//! - `ema`: the seeded exponential moving average.
//! - `tunnel::classify` / `tunnel::latest`: per-bar tunnel snapshots.
//! - `VegasTunnel`: entry (`assess`, `evaluate`) and exit (`check_trailing_exit`) rules.
//! - `StrategyRegistry`: named strategy instances for the engine.

pub mod error;
pub mod exit;
pub mod indicators;
pub mod registry;
pub mod tunnel;
pub mod vegas_tunnel;

pub use error::StrategyError;
pub use indicators::ema;
pub use registry::StrategyRegistry;
pub use tunnel::{Band, TunnelState};
pub use vegas_tunnel::{Assessment, MarketView, SetupPhase, StrategyInfo, VegasTunnel};
