use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    #[error("Strategy received invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Strategy '{0}' is not registered")]
    StrategyNotFound(String),

    #[error("Strategy '{0}' is already registered")]
    AlreadyRegistered(String),
}
