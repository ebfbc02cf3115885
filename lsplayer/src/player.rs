//! Media player abstraction and the process-backed HLS engine.
//!
//! The controller drives a [`MediaPlayer`] and listens to its
//! [`PlayerEvent`]s. [`HlsProcessPlayer`] follows the manifest itself and
//! hands the actual rendering to an external viewer (`mpv`, `ffplay`...).

use crate::error::{Error, Result};
use crate::events::PlayerEventBus;
use async_trait::async_trait;
use lsconfig::HlsSettings;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delay before a recovery attempt re-fetches the manifest
pub const DEFAULT_RECOVERY_DELAY: Duration = Duration::from_millis(1000);

/// Timeout of a manifest request
pub const DEFAULT_MANIFEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerErrorKind {
    Network,
    Media,
    Other,
}

impl fmt::Display for PlayerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlayerErrorKind::Network => "networkError",
            PlayerErrorKind::Media => "mediaError",
            PlayerErrorKind::Other => "otherError",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    ManifestParsed {
        variants: usize,
        segments: usize,
    },
    Error {
        kind: PlayerErrorKind,
        fatal: bool,
        details: String,
    },
    Playing,
    Paused,
    Ended,
}

impl PlayerEvent {
    pub fn fatal(kind: PlayerErrorKind, details: impl Into<String>) -> Self {
        PlayerEvent::Error {
            kind,
            fatal: true,
            details: details.into(),
        }
    }
}

/// Playback engine driven by the controller.
///
/// `destroy` detaches the source and closes every subscription, so no event
/// of a torn down session can reach the controller.
#[async_trait]
pub trait MediaPlayer: Send {
    /// Attaches `url` and starts fetching its manifest.
    async fn load(&mut self, url: &str) -> Result<()>;

    /// Starts rendering. An error means playback was refused, not fatal.
    async fn play(&mut self) -> Result<()>;

    /// Restarts loading after a network failure.
    async fn start_load(&mut self) -> Result<()>;

    async fn recover_media_error(&mut self) -> Result<()>;

    async fn destroy(&mut self);

    fn has_source(&self) -> bool;

    fn subscribe(&self) -> UnboundedReceiver<PlayerEvent>;
}

// ============================================================================
// Manifest
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestSummary {
    /// `#EXT-X-STREAM-INF` entries of a master playlist
    pub variants: usize,
    /// `#EXTINF` entries of a media playlist
    pub segments: usize,
}

/// Returns `None` when `body` is not an HLS playlist.
pub fn parse_manifest(body: &str) -> Option<ManifestSummary> {
    let mut lines = body
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty());

    if lines.next() != Some("#EXTM3U") {
        return None;
    }

    let mut summary = ManifestSummary {
        variants: 0,
        segments: 0,
    };
    for line in lines {
        if line.starts_with("#EXT-X-STREAM-INF") {
            summary.variants += 1;
        } else if line.starts_with("#EXTINF") {
            summary.segments += 1;
        }
    }
    Some(summary)
}

async fn fetch_manifest(http: &reqwest::Client, url: &str, timeout: Duration) -> PlayerEvent {
    let response = match http.get(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(err) => {
            return PlayerEvent::fatal(
                PlayerErrorKind::Network,
                format!("manifest request failed: {}", err),
            )
        }
    };

    let status = response.status();
    if !status.is_success() {
        return PlayerEvent::fatal(
            PlayerErrorKind::Network,
            format!("manifest HTTP status {}", status.as_u16()),
        );
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            return PlayerEvent::fatal(
                PlayerErrorKind::Network,
                format!("manifest body: {}", err),
            )
        }
    };

    match parse_manifest(&body) {
        Some(summary) => PlayerEvent::ManifestParsed {
            variants: summary.variants,
            segments: summary.segments,
        },
        None => PlayerEvent::fatal(PlayerErrorKind::Media, "not an HLS playlist"),
    }
}

// ============================================================================
// External viewer
// ============================================================================

/// Viewer families whose buffering options are known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKind {
    Mpv,
    Ffplay,
    Other,
}

impl ViewerKind {
    /// Detects the family from the executable name, `/usr/bin/mpv` included.
    pub fn detect(command: &str) -> Self {
        let name = Path::new(command.trim())
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match name.as_str() {
            "mpv" => ViewerKind::Mpv,
            "ffplay" => ViewerKind::Ffplay,
            _ => ViewerKind::Other,
        }
    }
}

/// Viewer options carrying the HLS buffering settings.
///
/// ffplay has no cache tuning, only latency and verbosity are forwarded.
pub fn buffering_args(kind: ViewerKind, hls: &HlsSettings) -> Vec<String> {
    let mut args = Vec::new();
    match kind {
        ViewerKind::Mpv => {
            args.push("--cache=yes".to_string());
            args.push(format!("--demuxer-readahead-secs={}", hls.max_buffer_length));
            args.push(format!("--cache-secs={}", hls.max_max_buffer_length));
            args.push(format!("--demuxer-max-bytes={}", hls.max_buffer_size));
            let thread = if hls.enable_worker { "yes" } else { "no" };
            args.push(format!("--demuxer-thread={}", thread));
            if hls.low_latency_mode {
                args.push("--profile=low-latency".to_string());
            }
            if hls.debug {
                args.push("--msg-level=all=debug".to_string());
            }
        }
        ViewerKind::Ffplay => {
            if hls.low_latency_mode {
                args.extend(
                    ["-fflags", "nobuffer", "-flags", "low_delay", "-framedrop"]
                        .map(String::from),
                );
            }
            if hls.debug {
                args.extend(["-loglevel", "debug"].map(String::from));
            }
        }
        ViewerKind::Other => {}
    }
    args
}

struct Viewer {
    kill: oneshot::Sender<()>,
    task: JoinHandle<()>,
    /// Set before the exit is reported
    exited: Arc<AtomicBool>,
}

impl Viewer {
    fn watch(mut child: Child, bus: PlayerEventBus) -> Self {
        let (kill, kill_rx) = oneshot::channel::<()>();
        let exited = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&exited);
        let task = tokio::spawn(async move {
            let killed = tokio::select! {
                status = child.wait() => {
                    flag.store(true, Ordering::SeqCst);
                    match status {
                        Ok(status) if status.success() => bus.broadcast(PlayerEvent::Ended),
                        Ok(status) => bus.broadcast(PlayerEvent::fatal(
                            PlayerErrorKind::Other,
                            format!("viewer exited with {}", status),
                        )),
                        Err(err) => bus.broadcast(PlayerEvent::fatal(
                            PlayerErrorKind::Other,
                            format!("viewer wait failed: {}", err),
                        )),
                    }
                    false
                }
                _ = kill_rx => true,
            };

            if killed {
                if let Err(err) = child.kill().await {
                    debug!("Viewer already gone: {}", err);
                }
            }
        });
        Self { kill, task, exited }
    }

    fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    async fn stop(self) {
        let _ = self.kill.send(());
        if let Err(err) = self.task.await {
            debug!("Viewer watcher ended abnormally: {}", err);
        }
    }
}

// ============================================================================
// HlsProcessPlayer
// ============================================================================

/// HLS player following the manifest over HTTP and delegating rendering to
/// an external viewer process.
///
/// With an empty viewer command the player runs in monitor-only mode:
/// manifests are checked and `play()` reports `Playing` without spawning
/// anything.
pub struct HlsProcessPlayer {
    http: reqwest::Client,
    command: String,
    args: Vec<String>,
    manifest_timeout: Duration,
    recovery_delay: Duration,
    bus: PlayerEventBus,
    source: Option<String>,
    loader: Option<JoinHandle<()>>,
    viewer: Option<Viewer>,
}

impl HlsProcessPlayer {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            command: command.into(),
            args,
            manifest_timeout: DEFAULT_MANIFEST_TIMEOUT,
            recovery_delay: DEFAULT_RECOVERY_DELAY,
            bus: PlayerEventBus::new(),
            source: None,
            loader: None,
            viewer: None,
        }
    }

    /// Buffering options come first so that `player.args` can override them.
    pub fn from_settings(settings: &lsconfig::Settings) -> Self {
        let command = settings.player.command.clone();
        let kind = ViewerKind::detect(&command);
        let mut args = buffering_args(kind, &settings.player.hls);
        if kind == ViewerKind::Other && !command.trim().is_empty() {
            debug!(command = %command, "Unknown viewer, HLS buffering settings not forwarded");
        }
        args.extend(settings.player.args.iter().cloned());

        Self::new(command, args).manifest_timeout(settings.api.request_timeout())
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    pub fn manifest_timeout(mut self, timeout: Duration) -> Self {
        self.manifest_timeout = timeout;
        self
    }

    pub fn recovery_delay(mut self, delay: Duration) -> Self {
        self.recovery_delay = delay;
        self
    }

    pub fn is_monitor_only(&self) -> bool {
        self.command.trim().is_empty()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn spawn_loader(&mut self, delay: Duration) -> Result<()> {
        let url = self.source.clone().ok_or(Error::NoSource)?;
        if let Some(loader) = self.loader.take() {
            loader.abort();
        }

        let http = self.http.clone();
        let bus = self.bus.clone();
        let timeout = self.manifest_timeout;
        self.loader = Some(tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            debug!(url = %url, "Fetching HLS manifest");
            let event = fetch_manifest(&http, &url, timeout).await;
            bus.broadcast(event);
        }));
        Ok(())
    }

    async fn teardown(&mut self) {
        if let Some(loader) = self.loader.take() {
            loader.abort();
        }
        if let Some(viewer) = self.viewer.take() {
            viewer.stop().await;
            info!("🛑 Viewer stopped");
        }
    }
}

#[async_trait]
impl MediaPlayer for HlsProcessPlayer {
    async fn load(&mut self, url: &str) -> Result<()> {
        self.teardown().await;
        self.source = Some(url.to_string());
        self.spawn_loader(Duration::ZERO)
    }

    async fn play(&mut self) -> Result<()> {
        let url = self.source.clone().ok_or(Error::NoSource)?;

        if self.is_monitor_only() {
            debug!("No viewer configured, monitoring only");
            self.bus.broadcast(PlayerEvent::Playing);
            return Ok(());
        }
        match &self.viewer {
            Some(viewer) if viewer.has_exited() => {
                debug!("Previous viewer has exited, starting a new one");
                if let Some(viewer) = self.viewer.take() {
                    viewer.stop().await;
                }
            }
            Some(_) => return Ok(()),
            None => {}
        }

        let mut command = Command::new(&self.command);
        command
            .args(&self.args)
            .arg(&url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match command.spawn() {
            Ok(child) => {
                info!(command = %self.command, "▶️ Viewer started");
                self.bus.broadcast(PlayerEvent::Playing);
                self.viewer = Some(Viewer::watch(child, self.bus.clone()));
            }
            Err(source) => {
                let err = Error::Spawn {
                    command: self.command.clone(),
                    source,
                };
                warn!("{}", err);
                self.bus
                    .broadcast(PlayerEvent::fatal(PlayerErrorKind::Other, err.to_string()));
            }
        }
        Ok(())
    }

    async fn start_load(&mut self) -> Result<()> {
        self.spawn_loader(self.recovery_delay)
    }

    /// Re-checks the manifest after the recovery delay, the viewer keeps running.
    async fn recover_media_error(&mut self) -> Result<()> {
        self.spawn_loader(self.recovery_delay)
    }

    async fn destroy(&mut self) {
        self.teardown().await;
        self.source = None;
        self.bus.close();
    }

    fn has_source(&self) -> bool {
        self.source.is_some()
    }

    fn subscribe(&self) -> UnboundedReceiver<PlayerEvent> {
        self.bus.subscribe()
    }
}

impl Drop for HlsProcessPlayer {
    fn drop(&mut self) {
        if let Some(loader) = self.loader.take() {
            loader.abort();
        }
    }
}
