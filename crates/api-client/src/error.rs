use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid stream URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Failed to deserialize the stream message: {0}")]
    Deserialization(String),

    #[error("Invalid data format from API: {0}")]
    InvalidData(String),
}
