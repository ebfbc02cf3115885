//! LiveStream server API client
//!
//! This crate provides a Rust client for the REST API exposed by the
//! LiveStream server (RTMP ingest + HLS delivery):
//!
//! - **Stream status**: live/offline flag and viewer count
//! - **Stream URL**: HLS manifest URL and stream key
//! - **Statistics**: bitrate, resolution, fps, codec, viewers, uptime
//! - **Commands**: server-side start/stop signals
//! - **Server info**: name, version and listening ports
//!
//! Every request is bounded by a timeout; [`request_with_retry`] adds
//! exponential backoff on top of any operation, and
//! [`LiveStreamClient::check_connection`] offers a soft health probe.
//!
//! # Example
//!
//! ```no_run
//! use lsclient::{request_with_retry, LiveStreamClient};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = LiveStreamClient::builder()
//!         .api_base("http://localhost:3000")
//!         .timeout(Duration::from_secs(10))
//!         .build()
//!         .await?;
//!
//!     if !client.check_connection().await {
//!         eprintln!("server unreachable");
//!     }
//!
//!     let info = request_with_retry(|| client.get_server_info(), 3, Duration::from_secs(1)).await?;
//!     println!("{} v{}", info.name, info.version);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod models;
pub mod retry;

// Re-exports
pub use api::StreamApi;
pub use client::{ClientBuilder, LiveStreamClient};
pub use error::{Error, Result};
pub use models::{ApiResponse, LiveState, ServerInfo, StreamStats, StreamStatus, StreamUrlInfo};
pub use retry::{request_with_retry, RetryPolicy};
