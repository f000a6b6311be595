use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use logging::init_tracing;
pub use settings::{
    Config, LiveBotConfig, LiveConfig, LoggingConfig, SeriesConfig, Strategies, TunnelPeriods,
    VegasTunnelParams,
};

/// Loads and validates the application configuration.
///
/// The TOML file at `path` is read first, then any `VEGAS__<SECTION>__<KEY>`
/// environment variables are layered on top of it
/// (e.g. `VEGAS__LIVE__LIVE_TRADING_ENABLED=true`).
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path.as_ref()))
        .add_source(
            config::Environment::with_prefix("VEGAS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
