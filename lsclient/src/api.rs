//! Async seam over the stream server operations.
//!
//! The playback controller only depends on this trait, so it can be driven
//! by [`LiveStreamClient`] in production and by an in-memory double in tests.

use crate::client::LiveStreamClient;
use crate::error::Result;
use crate::models::{ApiResponse, ServerInfo, StreamStats, StreamStatus, StreamUrlInfo};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait StreamApi: Send + Sync {
    async fn get_status(&self) -> Result<StreamStatus>;
    async fn get_stream_url(&self) -> Result<StreamUrlInfo>;
    async fn get_stats(&self) -> Result<StreamStats>;
    async fn start_stream(&self) -> Result<ApiResponse<Value>>;
    async fn stop_stream(&self) -> Result<ApiResponse<Value>>;
    async fn get_server_info(&self) -> Result<ServerInfo>;

    /// Soft health probe, never fails
    async fn check_connection(&self) -> bool {
        self.get_server_info().await.is_ok()
    }
}

#[async_trait]
impl StreamApi for LiveStreamClient {
    async fn get_status(&self) -> Result<StreamStatus> {
        LiveStreamClient::get_status(self).await
    }

    async fn get_stream_url(&self) -> Result<StreamUrlInfo> {
        LiveStreamClient::get_stream_url(self).await
    }

    async fn get_stats(&self) -> Result<StreamStats> {
        LiveStreamClient::get_stats(self).await
    }

    async fn start_stream(&self) -> Result<ApiResponse<Value>> {
        LiveStreamClient::start_stream(self).await
    }

    async fn stop_stream(&self) -> Result<ApiResponse<Value>> {
        LiveStreamClient::stop_stream(self).await
    }

    async fn get_server_info(&self) -> Result<ServerInfo> {
        LiveStreamClient::get_server_info(self).await
    }

    async fn check_connection(&self) -> bool {
        LiveStreamClient::check_connection(self).await
    }
}
