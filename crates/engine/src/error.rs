use core_types::Timeframe;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] configuration::ConfigError),

    #[error("API client error: {0}")]
    ApiClient(#[from] api_client::ApiError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] strategies::StrategyError),

    #[error("Bar rejected: {0}")]
    Series(#[from] series_store::SeriesError),

    #[error("Bot with symbol '{0}' not found in the engine.")]
    BotNotFound(String),

    #[error("Bar for '{received}' delivered on the '{expected}' subscription")]
    SymbolMismatch { expected: String, received: String },

    #[error("Timeframe {0} is neither the fast nor the slow timeframe")]
    UnsupportedTimeframe(Timeframe),

    #[error("Signal cannot open a position: {0}")]
    InvalidSignal(String),

    #[error("Order gateway error: {0}")]
    Gateway(String),
}
