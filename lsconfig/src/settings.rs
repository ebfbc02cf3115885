//! Strongly typed view of the `livestream` configuration block.
//!
//! Every field carries a serde default so a partial YAML document (or an
//! empty one) still produces a usable configuration. The rest of the
//! workspace depends on these structs rather than on raw YAML paths.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Top-level configuration block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub media: MediaSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub player: PlayerSettings,
    #[serde(default)]
    pub ui: UiSettings,
    #[serde(default)]
    pub logger: LoggerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            api: ApiSettings::default(),
            media: MediaSettings::default(),
            polling: PollingSettings::default(),
            player: PlayerSettings::default(),
            ui: UiSettings::default(),
            logger: LoggerSettings::default(),
        }
    }
}

impl Settings {
    /// Absolute URLs of every API operation.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.api.base_url)
    }

    /// HLS manifest URL: `{media}/live/{stream_key}/index.m3u8`.
    pub fn hls_url(&self) -> String {
        format!(
            "{}/live/{}/index.m3u8",
            self.media.base_url.trim_end_matches('/'),
            self.media.stream_key
        )
    }
}

/// REST API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "ApiSettings::default_base_url")]
    pub base_url: String,
    #[serde(default = "ApiSettings::default_request_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub retry: RetrySettings,
}

impl ApiSettings {
    fn default_base_url() -> String {
        "http://localhost:3000".to_string()
    }

    const fn default_request_timeout() -> u64 {
        10_000
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            request_timeout_ms: Self::default_request_timeout(),
            retry: RetrySettings::default(),
        }
    }
}

/// Exponential backoff for retried requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "RetrySettings::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "RetrySettings::default_base_delay")]
    pub base_delay_ms: u64,
}

impl RetrySettings {
    const fn default_max_attempts() -> u32 {
        3
    }

    const fn default_base_delay() -> u64 {
        1_000
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            base_delay_ms: Self::default_base_delay(),
        }
    }
}

/// Media server (HLS delivery).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSettings {
    #[serde(default = "MediaSettings::default_base_url")]
    pub base_url: String,
    #[serde(default = "MediaSettings::default_stream_key")]
    pub stream_key: String,
}

impl MediaSettings {
    fn default_base_url() -> String {
        "http://localhost:8000".to_string()
    }

    fn default_stream_key() -> String {
        "live".to_string()
    }
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            stream_key: Self::default_stream_key(),
        }
    }
}

/// Poll cadences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    #[serde(default = "PollingSettings::default_status_interval")]
    pub status_interval_ms: u64,
    #[serde(default = "PollingSettings::default_stats_interval")]
    pub stats_interval_ms: u64,
}

impl PollingSettings {
    const fn default_status_interval() -> u64 {
        3_000
    }

    const fn default_stats_interval() -> u64 {
        5_000
    }

    /// A zero interval is invalid and replaced by the default.
    pub fn status_interval(&self) -> Duration {
        non_zero_interval(
            "status_interval_ms",
            self.status_interval_ms,
            Self::default_status_interval(),
        )
    }

    pub fn stats_interval(&self) -> Duration {
        non_zero_interval(
            "stats_interval_ms",
            self.stats_interval_ms,
            Self::default_stats_interval(),
        )
    }
}

fn non_zero_interval(key: &str, millis: u64, default: u64) -> Duration {
    if millis == 0 {
        warn!(key, "Poll interval cannot be zero, using {} ms", default);
        return Duration::from_millis(default);
    }
    Duration::from_millis(millis)
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            status_interval_ms: Self::default_status_interval(),
            stats_interval_ms: Self::default_stats_interval(),
        }
    }
}

/// External viewer and buffering parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerSettings {
    /// Viewer executable launched on playback (`mpv`, `ffplay`...).
    /// Empty means monitor only: the manifest is followed but nothing is shown.
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub hls: HlsSettings,
}

/// Buffering knobs, translated into options of the configured viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HlsSettings {
    /// Verbose viewer output.
    #[serde(default)]
    pub debug: bool,
    /// Demux on a separate thread.
    #[serde(default = "default_true")]
    pub enable_worker: bool,
    #[serde(default = "default_true")]
    pub low_latency_mode: bool,
    /// Target forward buffer, in seconds.
    #[serde(default = "HlsSettings::default_max_buffer_length")]
    pub max_buffer_length: u32,
    /// Upper bound of the cached duration, in seconds.
    #[serde(default = "HlsSettings::default_max_max_buffer_length")]
    pub max_max_buffer_length: u32,
    /// Bytes.
    #[serde(default = "HlsSettings::default_max_buffer_size")]
    pub max_buffer_size: u64,
}

fn default_true() -> bool {
    true
}

impl HlsSettings {
    const fn default_max_buffer_length() -> u32 {
        30
    }

    const fn default_max_max_buffer_length() -> u32 {
        600
    }

    const fn default_max_buffer_size() -> u64 {
        60 * 1000 * 1000
    }
}

impl Default for HlsSettings {
    fn default() -> Self {
        Self {
            debug: false,
            enable_worker: true,
            low_latency_mode: true,
            max_buffer_length: Self::default_max_buffer_length(),
            max_max_buffer_length: Self::default_max_max_buffer_length(),
            max_buffer_size: Self::default_max_buffer_size(),
        }
    }
}

/// Presentation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    #[serde(default = "UiSettings::default_toast_duration")]
    pub toast_duration_ms: u64,
    #[serde(default = "UiSettings::default_max_log_entries")]
    pub max_log_entries: usize,
}

impl UiSettings {
    const fn default_toast_duration() -> u64 {
        4_000
    }

    const fn default_max_log_entries() -> usize {
        50
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            toast_duration_ms: Self::default_toast_duration(),
            max_log_entries: Self::default_max_log_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerSettings {
    #[serde(default = "LoggerSettings::default_min_level")]
    pub min_level: String,
}

impl LoggerSettings {
    fn default_min_level() -> String {
        "INFO".to_string()
    }
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            min_level: Self::default_min_level(),
        }
    }
}

/// Absolute URLs of the REST operations, built once from the API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub status: String,
    pub url: String,
    pub stats: String,
    pub start: String,
    pub stop: String,
    pub info: String,
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            status: format!("{}/api/stream/status", base),
            url: format!("{}/api/stream/url", base),
            stats: format!("{}/api/stream/stats", base),
            start: format!("{}/api/stream/start", base),
            stop: format!("{}/api/stream/stop", base),
            info: format!("{}/api/info", base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_values() {
        let settings = Settings::default();
        assert_eq!(settings.polling.status_interval(), Duration::from_secs(3));
        assert_eq!(settings.polling.stats_interval(), Duration::from_secs(5));
        assert_eq!(settings.api.request_timeout(), Duration::from_secs(10));
        assert_eq!(settings.ui.max_log_entries, 50);
        assert_eq!(settings.player.hls.max_buffer_size, 60_000_000);
        assert!(settings.player.command.is_empty());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "media:\n  stream_key: studio\n";
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.media.stream_key, "studio");
        assert_eq!(settings.media.base_url, "http://localhost:8000");
        assert_eq!(settings.api.retry.max_attempts, 3);
    }

    #[test]
    fn test_zero_poll_interval_falls_back() {
        let yaml = "polling:\n  status_interval_ms: 0\n  stats_interval_ms: 0\n";
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.polling.status_interval(), Duration::from_secs(3));
        assert_eq!(settings.polling.stats_interval(), Duration::from_secs(5));

        let yaml = "polling:\n  status_interval_ms: 250\n";
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.polling.status_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_hls_url() {
        let mut settings = Settings::default();
        settings.media.base_url = "https://media.example.org/".to_string();
        settings.media.stream_key = "main".to_string();
        assert_eq!(
            settings.hls_url(),
            "https://media.example.org/live/main/index.m3u8"
        );
    }

    #[test]
    fn test_endpoints() {
        let endpoints = Endpoints::new("https://api.example.org/");
        assert_eq!(endpoints.status, "https://api.example.org/api/stream/status");
        assert_eq!(endpoints.stop, "https://api.example.org/api/stream/stop");
        assert_eq!(endpoints.info, "https://api.example.org/api/info");
    }
}
