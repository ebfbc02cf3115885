//! Playback controller.
//!
//! A single tokio task owns the whole playback state. Commands, player
//! events, timer ticks and API completions are multiplexed with
//! `tokio::select!`, so state is only ever mutated from that task.
//!
//! Each kind of API request (status, stats, remote stop) has at most one
//! request in flight. A tick that fires while the previous request is still
//! unresolved is skipped.

use crate::error::{Error, Result};
use crate::model::{LogLevel, NotifyKind, Phase, PlaybackState};
use crate::player::{MediaPlayer, PlayerErrorKind, PlayerEvent};
use crate::presenter::Presenter;
use futures::future::BoxFuture;
use lsclient::{
    ApiResponse, RetryPolicy, ServerInfo, StreamApi, StreamStats, StreamStatus, StreamUrlInfo,
};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Commands accepted by the controller task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerCommand {
    Load,
    Stop,
    RefreshStats,
    ClearLog,
    Shutdown,
}

/// Timing and source parameters of the controller
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub status_interval: Duration,
    pub stats_interval: Duration,
    /// Applied to the startup server info request
    pub retry: RetryPolicy,
    /// Manifest handed to the player
    pub hls_url: String,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from_settings(&lsconfig::Settings::default())
    }
}

impl ControllerOptions {
    pub fn from_settings(settings: &lsconfig::Settings) -> Self {
        Self {
            status_interval: settings.polling.status_interval(),
            stats_interval: settings.polling.stats_interval(),
            retry: RetryPolicy::from(&settings.api.retry),
            hls_url: settings.hls_url(),
        }
    }

    /// Replaces zero poll periods, which `tokio::time::interval` rejects.
    fn validated(mut self) -> Self {
        let defaults = lsconfig::PollingSettings::default();
        if self.status_interval.is_zero() {
            warn!("Status interval cannot be zero, using the default");
            self.status_interval = defaults.status_interval();
        }
        if self.stats_interval.is_zero() {
            warn!("Stats interval cannot be zero, using the default");
            self.stats_interval = defaults.stats_interval();
        }
        self
    }
}

/// Cloneable command side of a running controller
#[derive(Clone)]
pub struct ControllerHandle {
    commands: mpsc::Sender<ControllerCommand>,
    state: watch::Receiver<PlaybackState>,
}

impl ControllerHandle {
    pub async fn send(&self, command: ControllerCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::ControllerGone)
    }

    /// Re-checks the stream and starts playback when it is live
    pub async fn load(&self) -> Result<()> {
        self.send(ControllerCommand::Load).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send(ControllerCommand::Stop).await
    }

    pub async fn refresh_stats(&self) -> Result<()> {
        self.send(ControllerCommand::RefreshStats).await
    }

    pub async fn clear_log(&self) -> Result<()> {
        self.send(ControllerCommand::ClearLog).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(ControllerCommand::Shutdown).await
    }

    /// Current snapshot
    pub fn state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }
}

/// Join side of the controller task
pub struct ControllerTask {
    join_handle: JoinHandle<()>,
}

impl ControllerTask {
    pub fn is_finished(&self) -> bool {
        self.join_handle.is_finished()
    }

    pub async fn wait(self) -> Result<()> {
        if let Err(err) = self.join_handle.await {
            if err.is_cancelled() {
                warn!("Playback controller cancelled: {err}");
                return Ok(());
            }
            return Err(Error::Join(err));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckReason {
    Poll,
    ManualLoad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopOrigin {
    Manual,
    Offline,
}

struct StatusOutcome {
    status: lsclient::Result<StreamStatus>,
    /// Only requested when the stream is live
    stream_url: Option<lsclient::Result<StreamUrlInfo>>,
}

struct StartupReport {
    connected: bool,
    server_info: lsclient::Result<ServerInfo>,
}

type Pending<T> = Option<BoxFuture<'static, T>>;

async fn resolve<T>(slot: &mut Pending<T>) -> T {
    match slot {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn next_event(events: &mut Option<UnboundedReceiver<PlayerEvent>>) -> Option<PlayerEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}

fn pending<F, T>(fut: F) -> Pending<T>
where
    F: Future<Output = T> + Send + 'static,
{
    Some(Box::pin(fut))
}

/// Playback state machine, see the module documentation
pub struct PlaybackController {
    api: Arc<dyn StreamApi>,
    player: Box<dyn MediaPlayer>,
    presenter: Arc<dyn Presenter>,
    options: ControllerOptions,

    state: PlaybackState,
    state_tx: watch::Sender<PlaybackState>,
    auto_start_suppressed: bool,

    status_timer: Option<Interval>,
    stats_timer: Option<Interval>,

    startup: Pending<StartupReport>,
    status_req: Pending<StatusOutcome>,
    status_reason: CheckReason,
    /// Phase to restore when a check ends without a transition
    status_prev: Phase,
    stats_req: Pending<lsclient::Result<StreamStats>>,
    stop_req: Pending<lsclient::Result<ApiResponse<Value>>>,

    player_events: Option<UnboundedReceiver<PlayerEvent>>,
}

impl PlaybackController {
    /// Spawns the controller task.
    pub fn spawn(
        api: Arc<dyn StreamApi>,
        player: Box<dyn MediaPlayer>,
        presenter: Arc<dyn Presenter>,
        options: ControllerOptions,
    ) -> (ControllerHandle, ControllerTask) {
        let (tx, rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(PlaybackState::default());

        let controller = Self {
            api,
            player,
            presenter,
            options: options.validated(),
            state: PlaybackState::default(),
            state_tx,
            auto_start_suppressed: false,
            status_timer: None,
            stats_timer: None,
            startup: None,
            status_req: None,
            status_reason: CheckReason::Poll,
            status_prev: Phase::Idle,
            stats_req: None,
            stop_req: None,
            player_events: None,
        };

        let join_handle = tokio::spawn(controller.run(rx));

        (
            ControllerHandle {
                commands: tx,
                state: state_rx,
            },
            ControllerTask { join_handle },
        )
    }

    async fn run(mut self, mut commands: mpsc::Receiver<ControllerCommand>) {
        info!(hls_url = %self.options.hls_url, "Starting playback controller");
        self.presenter.log(LogLevel::Info, "🚀 Application initialised");
        self.presenter.reset_stats();
        self.begin_startup();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(ControllerCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                report = resolve(&mut self.startup) => {
                    self.startup = None;
                    self.finish_startup(report);
                }
                _ = tick(&mut self.status_timer) => self.on_status_tick(),
                _ = tick(&mut self.stats_timer) => self.on_stats_tick(),
                outcome = resolve(&mut self.status_req) => {
                    self.status_req = None;
                    self.on_status(outcome).await;
                }
                stats = resolve(&mut self.stats_req) => {
                    self.stats_req = None;
                    self.on_stats(stats);
                }
                response = resolve(&mut self.stop_req) => {
                    self.stop_req = None;
                    self.on_remote_stop(response);
                }
                event = next_event(&mut self.player_events) => match event {
                    Some(event) => self.on_player_event(event).await,
                    None => self.player_events = None,
                },
            }
        }

        self.teardown_player().await;
        self.stats_timer = None;
        self.status_timer = None;
        info!("Playback controller stopped");
    }

    // ========================================================================
    // State
    // ========================================================================

    /// Changes the phase. The stats timer runs exactly while Playing.
    fn set_phase(&mut self, phase: Phase) {
        let previous = self.state.phase;
        if previous == phase {
            return;
        }

        self.state.phase = phase;
        if phase == Phase::Playing {
            self.state.last_error = None;
            self.start_stats_polling();
        } else if previous == Phase::Playing {
            self.stop_stats_polling();
        }

        debug!(from = %previous, to = %phase, "Phase change");
        self.state_tx.send_replace(self.state.clone());
        self.presenter.render_phase(&self.state);
    }

    fn start_stats_polling(&mut self) {
        let mut timer = interval(self.options.stats_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // first tick completes immediately
        self.stats_timer = Some(timer);
        self.presenter
            .log(LogLevel::Info, "📊 Automatic stats refresh started");
    }

    fn stop_stats_polling(&mut self) {
        self.stats_req = None;
        if self.stats_timer.take().is_some() {
            self.presenter
                .log(LogLevel::Info, "📊 Automatic stats refresh stopped");
        }
    }

    // ========================================================================
    // Startup
    // ========================================================================

    fn begin_startup(&mut self) {
        self.presenter
            .log(LogLevel::Info, "🔍 Checking API connection...");
        let api = Arc::clone(&self.api);
        let retry = self.options.retry;
        self.startup = pending(async move {
            let connected = api.check_connection().await;
            let server_info = retry.run(|| api.get_server_info()).await;
            StartupReport {
                connected,
                server_info,
            }
        });
    }

    fn finish_startup(&mut self, report: StartupReport) {
        if report.connected {
            self.presenter
                .log(LogLevel::Success, "✅ Connected to the API");
            self.presenter
                .notify(NotifyKind::Success, "Connected to server");
        } else {
            self.presenter
                .log(LogLevel::Error, "❌ API connection error");
            self.presenter.notify(
                NotifyKind::Error,
                "Error: cannot reach the server. Check that it is running.",
            );
        }

        match report.server_info {
            Ok(info) => {
                self.presenter.render_server_info(&info);
                self.presenter
                    .log(LogLevel::Info, "📋 Server information loaded");
            }
            Err(err) => {
                warn!("Server info unavailable: {}", err);
                self.presenter
                    .log(LogLevel::Warning, "⚠️ Could not load server information");
            }
        }

        // first tick completes immediately: initial status check
        let mut timer = interval(self.options.status_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.status_timer = Some(timer);

        self.presenter.log(
            LogLevel::Success,
            "✅ System ready, monitoring the stream automatically",
        );
    }

    // ========================================================================
    // Status
    // ========================================================================

    fn issue_status_check(&mut self, reason: CheckReason) {
        let api = Arc::clone(&self.api);
        self.status_reason = reason;
        self.status_prev = self.state.phase;
        self.status_req = pending(async move {
            let status = api.get_status().await;
            let stream_url = match &status {
                Ok(status) if status.is_live => Some(api.get_stream_url().await),
                _ => None,
            };
            StatusOutcome { status, stream_url }
        });
    }

    fn on_status_tick(&mut self) {
        if self.status_req.is_some() {
            debug!("Status request still in flight, skipping tick");
            return;
        }
        self.issue_status_check(CheckReason::Poll);
        if self.state.phase == Phase::Idle {
            self.set_phase(Phase::Checking);
        }
    }

    /// Phase to go back to when a check ends without a transition
    fn restore_after_check(&mut self) {
        if self.state.phase == Phase::Checking {
            let previous = self.status_prev;
            self.set_phase(previous);
        }
    }

    async fn on_status(&mut self, outcome: StatusOutcome) {
        let reason = std::mem::replace(&mut self.status_reason, CheckReason::Poll);
        let manual = reason == CheckReason::ManualLoad;

        let status = match outcome.status {
            Ok(status) => status,
            Err(err) => {
                warn!("Status check failed: {}", err);
                self.presenter
                    .log(LogLevel::Warning, "⚠️ Error checking stream status");
                self.restore_after_check();
                if manual {
                    self.report_no_stream();
                }
                return;
            }
        };

        self.presenter.render_status(&status);

        if status.is_live {
            match outcome.stream_url {
                Some(Ok(info)) => self.presenter.render_stream_url(Some(&info)),
                Some(Err(err)) => debug!("Stream URL unavailable: {}", err),
                None => {}
            }

            if manual {
                self.auto_start_suppressed = false;
                self.start_playback().await;
            } else if self.state.phase == Phase::Checking && !self.auto_start_suppressed {
                self.presenter.log(
                    LogLevel::Info,
                    "🎬 Live stream detected, loading automatically...",
                );
                self.start_playback().await;
            } else {
                self.restore_after_check();
            }
        } else {
            self.presenter.render_stream_url(None);
            if self.auto_start_suppressed {
                debug!("Stream went offline, auto-start re-enabled");
                self.auto_start_suppressed = false;
            }

            if self.state.phase.is_active() || self.player.has_source() {
                self.presenter.log(LogLevel::Warning, "📴 Stream stopped");
                self.stop_playback(StopOrigin::Offline).await;
            } else {
                self.restore_after_check();
            }

            if manual {
                self.report_no_stream();
            }
        }
    }

    fn report_no_stream(&self) {
        self.presenter.notify(
            NotifyKind::Warning,
            "No active stream. Start broadcasting from OBS.",
        );
        self.presenter
            .log(LogLevel::Warning, "⚠️ No stream available");
    }

    // ========================================================================
    // Stats
    // ========================================================================

    fn issue_stats_request(&mut self) {
        if self.stats_req.is_some() {
            debug!("Stats request still in flight, skipping");
            return;
        }
        let api = Arc::clone(&self.api);
        self.stats_req = pending(async move { api.get_stats().await });
    }

    fn on_stats_tick(&mut self) {
        self.issue_stats_request();
    }

    fn on_stats(&mut self, stats: lsclient::Result<StreamStats>) {
        match stats {
            Ok(stats) => self.presenter.render_stats(&stats),
            Err(err) => debug!("Error updating stats: {}", err),
        }
    }

    // ========================================================================
    // Playback
    // ========================================================================

    async fn teardown_player(&mut self) {
        self.player.destroy().await;
        self.player_events = None;
    }

    async fn start_playback(&mut self) {
        // a fresh session: previous subscriptions die with the old source
        self.teardown_player().await;
        self.player_events = Some(self.player.subscribe());

        let url = self.options.hls_url.clone();
        self.presenter
            .log(LogLevel::Info, &format!("📺 Stream URL: {}", url));
        self.presenter
            .log(LogLevel::Info, "🎬 Initialising HLS player...");
        self.set_phase(Phase::Loading);

        if let Err(err) = self.player.load(&url).await {
            self.presenter
                .log(LogLevel::Error, &format!("❌ Error loading stream: {}", err));
            self.presenter
                .notify(NotifyKind::Error, &format!("Error: {}", err));
            self.fail(err.to_string()).await;
        }
    }

    async fn stop_playback(&mut self, origin: StopOrigin) {
        self.presenter.log(LogLevel::Info, "🛑 Stopping stream...");

        // local cleanup first
        self.teardown_player().await;
        self.set_phase(Phase::Stopped);
        self.stats_req = None;
        self.presenter.reset_stats();

        if self.stop_req.is_some() {
            debug!(?origin, "Remote stop already in flight");
        } else {
            let api = Arc::clone(&self.api);
            self.stop_req = pending(async move { api.stop_stream().await });
        }

        self.set_phase(Phase::Idle);
    }

    fn on_remote_stop(&mut self, response: lsclient::Result<ApiResponse<Value>>) {
        match response {
            Ok(response) if response.success => {
                self.presenter
                    .log(LogLevel::Success, "✅ Stream stopped successfully");
                self.presenter.notify(NotifyKind::Info, "Stream stopped");
            }
            Ok(response) => {
                self.presenter.log(
                    LogLevel::Warning,
                    &format!("⚠️ Error while stopping: {}", response.reason()),
                );
            }
            Err(err) => {
                self.presenter
                    .log(LogLevel::Warning, &format!("⚠️ Error while stopping: {}", err));
            }
        }
    }

    /// Unrecoverable playback failure: Error, teardown, then Idle.
    async fn fail(&mut self, details: String) {
        self.state.last_error = Some(details);
        self.set_phase(Phase::Error);
        self.teardown_player().await;
        self.stats_req = None;
        self.presenter.reset_stats();
        self.auto_start_suppressed = true;
        self.set_phase(Phase::Idle);
    }

    async fn on_player_event(&mut self, event: PlayerEvent) {
        match event {
            PlayerEvent::ManifestParsed { variants, segments } => {
                let loading = self.state.phase == Phase::Loading;
                // a manual re-check interrupted the load
                let interrupted =
                    self.state.phase == Phase::Checking && self.status_prev == Phase::Loading;
                if !loading && !interrupted {
                    debug!(variants, segments, "Manifest refreshed");
                    return;
                }
                self.presenter
                    .log(LogLevel::Success, "✅ Stream loaded successfully");
                self.presenter
                    .notify(NotifyKind::Success, "Stream loaded, playing...");
                if let Err(err) = self.player.play().await {
                    debug!("Autoplay refused: {}", err);
                    self.presenter.log(
                        LogLevel::Warning,
                        "⚠️ Autoplay blocked, start playback manually",
                    );
                }
                if loading {
                    self.set_phase(Phase::Playing);
                } else {
                    // settles to Playing unless the check decides otherwise
                    self.status_prev = Phase::Playing;
                }
            }
            PlayerEvent::Error {
                kind,
                fatal: false,
                details,
            } => {
                debug!(%kind, "Non-fatal player error: {}", details);
            }
            PlayerEvent::Error { kind, details, .. } => {
                warn!(%kind, "Fatal player error: {}", details);
                self.presenter
                    .log(LogLevel::Error, &format!("❌ Fatal HLS error: {}", kind));
                match kind {
                    PlayerErrorKind::Network => {
                        self.presenter.log(
                            LogLevel::Warning,
                            "🔄 Network error, trying to recover...",
                        );
                        self.presenter
                            .notify(NotifyKind::Warning, "Connection error, retrying...");
                        if let Err(err) = self.player.start_load().await {
                            debug!("Reload not possible: {}", err);
                        }
                    }
                    PlayerErrorKind::Media => {
                        self.presenter.log(
                            LogLevel::Warning,
                            "🔄 Media error, trying to recover...",
                        );
                        if let Err(err) = self.player.recover_media_error().await {
                            debug!("Media recovery not possible: {}", err);
                        }
                    }
                    PlayerErrorKind::Other => {
                        self.presenter.log(
                            LogLevel::Error,
                            "💥 Unrecoverable error, load the stream again",
                        );
                        self.presenter
                            .notify(NotifyKind::Error, "Unrecoverable playback error");
                        self.fail(details).await;
                    }
                }
            }
            PlayerEvent::Playing => self
                .presenter
                .log(LogLevel::Info, "▶️ Playback started"),
            PlayerEvent::Paused => self
                .presenter
                .log(LogLevel::Info, "⏸️ Playback paused"),
            PlayerEvent::Ended => self
                .presenter
                .log(LogLevel::Info, "⏹️ Playback ended"),
        }
    }

    // ========================================================================
    // Commands
    // ========================================================================

    async fn handle_command(&mut self, command: ControllerCommand) {
        debug!(?command, phase = %self.state.phase, "Controller command");
        match command {
            ControllerCommand::Load => self.on_load(),
            ControllerCommand::Stop => self.on_stop().await,
            ControllerCommand::RefreshStats => {
                self.issue_stats_request();
                self.presenter.notify(NotifyKind::Info, "Statistics updated");
            }
            ControllerCommand::ClearLog => {
                self.presenter.clear_log();
                self.presenter.notify(NotifyKind::Info, "Log cleared");
            }
            ControllerCommand::Shutdown => {}
        }
    }

    fn on_load(&mut self) {
        self.presenter
            .log(LogLevel::Info, "🔍 Checking stream availability...");
        self.auto_start_suppressed = false;

        if self.status_req.is_some() {
            // the pending check answers the load
            self.status_reason = CheckReason::ManualLoad;
        } else {
            self.issue_status_check(CheckReason::ManualLoad);
        }
        self.set_phase(Phase::Checking);
    }

    async fn on_stop(&mut self) {
        let active = self.state.phase.is_active() || self.player.has_source();

        // a poll issued before the stop must not resurrect playback
        if self.status_req.take().is_some() {
            debug!("Dropping in-flight status request");
        }
        self.status_reason = CheckReason::Poll;

        if active {
            self.stop_playback(StopOrigin::Manual).await;
        } else {
            self.restore_after_check();
            debug!(phase = %self.state.phase, "Stop requested, nothing is playing");
        }
    }
}
