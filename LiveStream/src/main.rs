mod console;
mod logging;

use console::{ConsoleCommand, HELP};
use lsclient::LiveStreamClient;
use lsconfig::Config;
use lsplayer::{
    ConsolePresenter, ControllerHandle, ControllerOptions, HlsProcessPlayer, PlaybackController,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

/// Runs one console command, returns `false` when the user asked to quit
async fn dispatch(
    handle: &ControllerHandle,
    presenter: &ConsolePresenter,
    command: ConsoleCommand,
) -> lsplayer::Result<bool> {
    match command {
        ConsoleCommand::Load => handle.load().await?,
        ConsoleCommand::Stop => handle.stop().await?,
        ConsoleCommand::Stats => handle.refresh_stats().await?,
        ConsoleCommand::Clear => handle.clear_log().await?,
        ConsoleCommand::State => {
            let state = handle.state();
            match state.last_error {
                Some(err) => info!("Phase: {} (last error: {})", state.phase, err),
                None => info!("Phase: {}", state.phase),
            }
            for entry in presenter.journal().iter().take(10) {
                info!(
                    "  [{}] {} {}",
                    entry.timestamp.format("%H:%M:%S"),
                    entry.level.as_str(),
                    entry.message
                );
            }
        }
        ConsoleCommand::Help => info!("{}", HELP),
        ConsoleCommand::Quit => return Ok(false),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // optional first argument: configuration directory
    let config_dir = std::env::args().nth(1).unwrap_or_default();
    let config = Config::load_config(&config_dir)?;
    logging::init_logging(&config);

    let settings = config.settings()?;
    info!("🎥 LiveStream monitor v{}", env!("CARGO_PKG_VERSION"));
    info!("📡 API: {}", settings.api.base_url);
    info!("🌐 Media: {}", settings.media.base_url);
    info!("📺 HLS: {}", settings.hls_url());

    let client = LiveStreamClient::from_settings(&settings).await?;
    let player = HlsProcessPlayer::from_settings(&settings);
    if player.is_monitor_only() {
        info!("No viewer configured (player.command), monitoring only");
    }
    let presenter = Arc::new(ConsolePresenter::from_settings(&settings));

    let (handle, task) = PlaybackController::spawn(
        Arc::new(client),
        Box::new(player),
        presenter.clone(),
        ControllerOptions::from_settings(&settings),
    );

    info!("{}", HELP);
    info!("Press Ctrl+C to stop...");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut state = handle.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("🛑 Ctrl+C received, shutting down");
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    error!("❌ Playback controller stopped unexpectedly");
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<ConsoleCommand>() {
                    Ok(command) => match dispatch(&handle, &presenter, command).await {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(err) => {
                            error!("❌ {}", err);
                            break;
                        }
                    },
                    Err(msg) => warn!("{}", msg),
                },
                Ok(None) => {
                    info!("stdin closed, waiting for Ctrl+C");
                    stdin_open = false;
                }
                Err(err) => {
                    warn!("⚠️ Cannot read stdin: {}", err);
                    stdin_open = false;
                }
            },
        }
    }

    if let Err(err) = handle.shutdown().await {
        warn!("⚠️ {}", err);
    }
    if let Err(err) = task.wait().await {
        error!("❌ Playback controller failed: {}", err);
    }

    info!("👋 LiveStream stopped");
    Ok(())
}
