//! Shared value types of the playback layer.

use std::fmt;

/// Lifecycle phase of the playback controller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    Idle,
    Checking,
    Loading,
    Playing,
    Stopped,
    Error,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Checking => "checking",
            Phase::Loading => "loading",
            Phase::Playing => "playing",
            Phase::Stopped => "stopped",
            Phase::Error => "error",
        }
    }

    /// Playback is attached or being attached
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Loading | Phase::Playing)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot published to observers on every phase change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub phase: Phase,
    pub last_error: Option<String>,
}

/// Severity of a journal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }
}

/// Kind of a transient notification (toast)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotifyKind {
    pub fn icon(&self) -> &'static str {
        match self {
            NotifyKind::Success => "✔",
            NotifyKind::Error => "✖",
            NotifyKind::Warning => "⚠",
            NotifyKind::Info => "ℹ",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_activity() {
        assert!(Phase::Loading.is_active());
        assert!(Phase::Playing.is_active());
        assert!(!Phase::Idle.is_active());
        assert!(!Phase::Stopped.is_active());
        assert_eq!(Phase::Checking.to_string(), "checking");
    }

    #[test]
    fn test_default_state() {
        let state = PlaybackState::default();
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.last_error.is_none());
    }
}
