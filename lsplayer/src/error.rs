//! Error types for the playback layer

/// Result type alias for player and controller operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The external viewer could not be started
    #[error("Failed to spawn viewer `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(#[from] lsclient::Error),

    /// `play()` was called before any source was loaded
    #[error("No source loaded")]
    NoSource,

    /// The controller task is gone, commands can no longer be delivered
    #[error("Playback controller stopped")]
    ControllerGone,

    #[error("Controller task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
