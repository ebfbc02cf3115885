//! Playback side of LiveStream
//!
//! - [`controller`]: the playback state machine, polling the stream server
//!   and driving the player
//! - [`player`]: the [`MediaPlayer`] abstraction and [`HlsProcessPlayer`],
//!   which follows the HLS manifest and delegates rendering to an external
//!   viewer
//! - [`presenter`]: the [`Presenter`] abstraction and the terminal
//!   [`ConsolePresenter`]
//!
//! # Example
//!
//! ```no_run
//! use lsclient::LiveStreamClient;
//! use lsplayer::{ConsolePresenter, ControllerOptions, HlsProcessPlayer, PlaybackController};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = lsconfig::Settings::default();
//!     let client = LiveStreamClient::from_settings(&settings).await?;
//!
//!     let (handle, task) = PlaybackController::spawn(
//!         Arc::new(client),
//!         Box::new(HlsProcessPlayer::from_settings(&settings)),
//!         Arc::new(ConsolePresenter::from_settings(&settings)),
//!         ControllerOptions::from_settings(&settings),
//!     );
//!
//!     handle.load().await?;
//!     handle.shutdown().await?;
//!     task.wait().await?;
//!     Ok(())
//! }
//! ```

pub mod controller;
pub mod error;
pub mod events;
pub mod model;
pub mod player;
pub mod presenter;

pub use controller::{
    ControllerCommand, ControllerHandle, ControllerOptions, ControllerTask, PlaybackController,
};
pub use error::{Error, Result};
pub use events::PlayerEventBus;
pub use model::{LogLevel, NotifyKind, Phase, PlaybackState};
pub use player::{
    buffering_args, HlsProcessPlayer, MediaPlayer, PlayerErrorKind, PlayerEvent, ViewerKind,
};
pub use presenter::{format_uptime, ConsolePresenter, LogJournal, Presenter, StatsView};
