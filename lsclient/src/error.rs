//! Error types for the LiveStream API client

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the stream server
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request did not complete within the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// The server answered with a non-2xx status
    #[error("HTTP error! status: {0}")]
    HttpStatus(u16),

    /// Connection, DNS or transport failure
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The envelope reported `success: false` or carried no data
    #[error("Request rejected by server: {0}")]
    Rejected(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a rejection error
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Whether the failure happened before any HTTP answer was received
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Timeout | Error::Network(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if let Some(status) = err.status() {
            Error::HttpStatus(status.as_u16())
        } else if err.is_decode() {
            Error::Other(format!("Invalid response body: {}", err))
        } else {
            Error::Network(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Error::Timeout.to_string(), "Request timeout");
        assert_eq!(Error::HttpStatus(503).to_string(), "HTTP error! status: 503");
        assert!(Error::rejected("offline").to_string().contains("offline"));
    }

    #[test]
    fn test_is_transport() {
        assert!(Error::Timeout.is_transport());
        assert!(!Error::HttpStatus(500).is_transport());
        assert!(!Error::other("x").is_transport());
    }
}
