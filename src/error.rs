use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("WebSocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("liveness HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("push channel closed by server")]
    ConnectionClosed,

    #[error("metrics server error: {0}")]
    Metrics(String),
}
