//! Presentation surface of the playback controller.
//!
//! The controller never formats anything itself: it hands typed snapshots to
//! a [`Presenter`]. [`ConsolePresenter`] is the terminal implementation used
//! by the binary. It renders through `tracing` under the `livestream::ui`
//! target and keeps a bounded journal of the activity log.

use crate::model::{LogLevel, NotifyKind, PlaybackState};
use chrono::{DateTime, Local};
use lsclient::{ServerInfo, StreamStats, StreamStatus, StreamUrlInfo};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Rendering surface driven by the controller
pub trait Presenter: Send + Sync {
    fn render_status(&self, status: &StreamStatus);
    fn render_stats(&self, stats: &StreamStats);
    fn reset_stats(&self);
    /// `None` means no active stream
    fn render_stream_url(&self, info: Option<&StreamUrlInfo>);
    fn render_server_info(&self, info: &ServerInfo);
    fn render_phase(&self, state: &PlaybackState);
    fn log(&self, level: LogLevel, message: &str);
    fn notify(&self, kind: NotifyKind, message: &str);
    fn clear_log(&self);
}

// ============================================================================
// Formatting
// ============================================================================

/// `HH:MM:SS`, hours are not wrapped at 24.
pub fn format_uptime(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

pub fn format_viewers(count: u64) -> String {
    if count == 1 {
        "1 viewer".to_string()
    } else {
        format!("{} viewers", count)
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Text of every statistics cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsView {
    pub bitrate: String,
    pub resolution: String,
    pub fps: String,
    pub codec: String,
    pub viewers: String,
    pub uptime: String,
}

impl StatsView {
    /// Cells shown while nothing is playing
    pub fn placeholder() -> Self {
        Self {
            bitrate: "-- Kbps".to_string(),
            resolution: "--x--".to_string(),
            fps: "--".to_string(),
            codec: "--".to_string(),
            viewers: "0".to_string(),
            uptime: "--:--:--".to_string(),
        }
    }
}

impl From<&StreamStats> for StatsView {
    fn from(stats: &StreamStats) -> Self {
        Self {
            bitrate: format!("{} Kbps", format_number(stats.bitrate.unwrap_or(0.0))),
            resolution: stats
                .resolution
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "--x--".to_string()),
            fps: stats
                .fps
                .filter(|fps| *fps > 0.0)
                .map(format_number)
                .unwrap_or_else(|| "--".to_string()),
            codec: stats
                .codec
                .clone()
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "--".to_string()),
            viewers: stats.viewers.unwrap_or(0).to_string(),
            uptime: stats
                .uptime
                .filter(|u| *u > 0)
                .map(format_uptime)
                .unwrap_or_else(|| "--:--:--".to_string()),
        }
    }
}

// ============================================================================
// Journal
// ============================================================================

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

/// Activity log, newest entry first, bounded in size
#[derive(Debug, Clone)]
pub struct LogJournal {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogJournal {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        self.entries.push_front(LogEntry {
            timestamp: Local::now(),
            level,
            message: message.into(),
        });
        // oldest entries are evicted
        self.entries.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries, newest first
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

// ============================================================================
// Console presenter
// ============================================================================

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: NotifyKind,
    pub message: String,
    pub expires_at: Instant,
}

/// Terminal presenter writing through `tracing`
pub struct ConsolePresenter {
    journal: Mutex<LogJournal>,
    toasts: Mutex<Vec<Toast>>,
    toast_duration: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConsolePresenter {
    pub fn new(max_log_entries: usize, toast_duration: Duration) -> Self {
        Self {
            journal: Mutex::new(LogJournal::new(max_log_entries)),
            toasts: Mutex::new(Vec::new()),
            toast_duration,
        }
    }

    pub fn from_settings(settings: &lsconfig::Settings) -> Self {
        Self::new(settings.ui.max_log_entries, settings.ui.toast_duration())
    }

    /// Copy of the journal, newest first
    pub fn journal(&self) -> Vec<LogEntry> {
        lock(&self.journal).entries().cloned().collect()
    }

    /// Toasts whose display duration has not elapsed yet
    pub fn active_toasts(&self) -> Vec<Toast> {
        let now = Instant::now();
        let mut toasts = lock(&self.toasts);
        toasts.retain(|t| t.expires_at > now);
        toasts.clone()
    }
}

impl Presenter for ConsolePresenter {
    fn render_status(&self, status: &StreamStatus) {
        let label = if status.is_live { "🔴 LIVE" } else { "⚫ OFFLINE" };
        info!(
            target: "livestream::ui",
            live = status.is_live,
            "{} · {}",
            label,
            format_viewers(status.viewers)
        );
    }

    fn render_stats(&self, stats: &StreamStats) {
        let view = StatsView::from(stats);
        info!(
            target: "livestream::ui",
            "📊 {} | {} | {} fps | {} | {} viewers | uptime {}",
            view.bitrate,
            view.resolution,
            view.fps,
            view.codec,
            view.viewers,
            view.uptime
        );
    }

    fn reset_stats(&self) {
        let view = StatsView::placeholder();
        info!(
            target: "livestream::ui",
            "📊 {} | {} | {} fps | {} | {} viewers | uptime {}",
            view.bitrate,
            view.resolution,
            view.fps,
            view.codec,
            view.viewers,
            view.uptime
        );
    }

    fn render_stream_url(&self, info: Option<&StreamUrlInfo>) {
        match info {
            Some(info) => info!(
                target: "livestream::ui",
                "🔗 HLS URL: {} (stream key: {})",
                info.hls_url,
                info.stream_key
            ),
            None => info!(target: "livestream::ui", "🔗 No active stream right now"),
        }
    }

    fn render_server_info(&self, info: &ServerInfo) {
        let port = |p: Option<u16>| p.map(|p| p.to_string()).unwrap_or_else(|| "--".into());
        info!(
            target: "livestream::ui",
            "🖥️ {} v{} (RTMP {}, HTTP {}, API {}, stream key {})",
            info.name,
            info.version,
            port(info.rtmp_port),
            port(info.http_port),
            port(info.api_port),
            info.stream_key.as_deref().unwrap_or("--")
        );
    }

    fn render_phase(&self, state: &PlaybackState) {
        match &state.last_error {
            Some(err) => info!(target: "livestream::ui", phase = %state.phase, "Player {} ({})", state.phase, err),
            None => info!(target: "livestream::ui", phase = %state.phase, "Player {}", state.phase),
        }
    }

    fn log(&self, level: LogLevel, message: &str) {
        lock(&self.journal).push(level, message);
        match level {
            LogLevel::Info | LogLevel::Success => info!(target: "livestream::ui", "{}", message),
            LogLevel::Warning => warn!(target: "livestream::ui", "{}", message),
            LogLevel::Error => error!(target: "livestream::ui", "{}", message),
        }
    }

    fn notify(&self, kind: NotifyKind, message: &str) {
        let now = Instant::now();
        {
            let mut toasts = lock(&self.toasts);
            toasts.retain(|t| t.expires_at > now);
            toasts.push(Toast {
                kind,
                message: message.to_string(),
                expires_at: now + self.toast_duration,
            });
        }
        match kind {
            NotifyKind::Error => error!(target: "livestream::ui", "{} {}", kind.icon(), message),
            NotifyKind::Warning => warn!(target: "livestream::ui", "{} {}", kind.icon(), message),
            _ => info!(target: "livestream::ui", "{} {}", kind.icon(), message),
        }
    }

    fn clear_log(&self) {
        lock(&self.journal).clear();
    }
}
