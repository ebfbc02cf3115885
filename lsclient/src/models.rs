//! Data models for the stream server API
//!
//! Every endpoint answers with the same JSON envelope:
//! `{"success": true, "data": {...}}`.

use serde::{Deserialize, Serialize};

// ============================================================================
// Envelope
// ============================================================================

/// Generic response envelope
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Best human readable reason carried by the envelope
    pub fn reason(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "no data".to_string())
    }

    /// Unwraps the payload, failing when the server reported an error
    pub fn into_data(self) -> crate::Result<T> {
        if !self.success {
            return Err(crate::Error::rejected(self.reason()));
        }
        let reason = self.reason();
        self.data.ok_or_else(|| crate::Error::rejected(reason))
    }
}

// ============================================================================
// Stream status
// ============================================================================

/// Broadcast state as reported by the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveState {
    Live,
    #[default]
    #[serde(other)]
    Offline,
}

/// Response data of `GET /api/stream/status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    pub is_live: bool,
    #[serde(default)]
    pub status: LiveState,
    #[serde(default)]
    pub viewers: u64,
}

impl StreamStatus {
    pub fn live(viewers: u64) -> Self {
        Self {
            is_live: true,
            status: LiveState::Live,
            viewers,
        }
    }

    pub fn offline() -> Self {
        Self::default()
    }
}

/// Response data of `GET /api/stream/url`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamUrlInfo {
    pub hls_url: String,
    pub stream_key: String,
}

impl StreamUrlInfo {
    /// URL info derived from configuration, before any server confirmation
    pub fn from_settings(settings: &lsconfig::Settings) -> Self {
        Self {
            hls_url: settings.hls_url(),
            stream_key: settings.media.stream_key.clone(),
        }
    }
}

/// Response data of `GET /api/stream/stats`
///
/// The server omits fields it cannot measure yet, so everything is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStats {
    /// Kbps
    #[serde(default)]
    pub bitrate: Option<f64>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub viewers: Option<u64>,
    /// Seconds since the broadcast started
    #[serde(default)]
    pub uptime: Option<u64>,
}

/// Response data of `GET /api/info`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub rtmp_port: Option<u16>,
    #[serde(default)]
    pub http_port: Option<u16>,
    #[serde(default)]
    pub api_port: Option<u16>,
    #[serde(default)]
    pub stream_key: Option<String>,
}
