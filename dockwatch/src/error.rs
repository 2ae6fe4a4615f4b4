//! Error type shared by the transport, the log sink and the config layer.

/// Errors surfaced by the remote client and by attached log streams.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backend URL could not be parsed or reached
    #[error("Failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// WebSocket level failure
    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame did not decode as the expected JSON shape
    #[error("Failed to decode message: {0}")]
    Decode(#[from] serde_json::Error),

    /// The backend reported a failure inside the stream
    #[error("Remote error: {0}")]
    Remote(String),

    /// The connection went away before a reply arrived
    #[error("Connection closed")]
    Closed,

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Invalid profile or command line configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
