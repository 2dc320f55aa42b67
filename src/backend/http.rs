use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::wire::{
    self, Ack, AnalyzeResponse, CaptureResponse, IssuesResponse, ListResponse, LoadResponse,
    PacketsRequest, SaveRequest, StatisticsResponse,
};
use super::{Backend, CapturedPackets};
use crate::analysis::{Analysis, Issue, Statistics};
use crate::capture::{CaptureMode, CaptureRequest, Packet};
use crate::config::BackendConfig;
use crate::error::{AnalyzerError, Result};
use crate::storage::{StorageFormat, StoredCaptureRecord};

/// JSON-over-HTTP client for the traffic-processing service.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AnalyzerError::validation(format!("invalid backend URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AnalyzerError::validation(format!(
                "backend URL '{}' cannot carry a path",
                base_url
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        Self::new(&config.base_url, Duration::from_millis(config.timeout_ms))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AnalyzerError::validation("backend URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        wire::decode(status, &body)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn health(&self) -> Result<()> {
        let url = self.endpoint(&["health"])?;
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AnalyzerError::Transport(format!(
                "health check returned HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn capture(&self, request: CaptureRequest) -> Result<CapturedPackets> {
        let url = self.endpoint(&["capture"])?;
        let response: CaptureResponse = self.send(self.client.post(url).json(&request)).await?;
        Ok(CapturedPackets {
            packets: response.packets,
            mode: response.mode.as_deref().and_then(CaptureMode::parse),
        })
    }

    async fn analyze(&self, packets: &[Packet]) -> Result<Vec<Analysis>> {
        let url = self.endpoint(&["analyze"])?;
        let response: AnalyzeResponse = self
            .send(self.client.post(url).json(&PacketsRequest { packets }))
            .await?;
        Ok(response.analyses)
    }

    async fn statistics(&self, packets: &[Packet]) -> Result<Statistics> {
        let url = self.endpoint(&["statistics"])?;
        let response: StatisticsResponse = self
            .send(self.client.post(url).json(&PacketsRequest { packets }))
            .await?;
        Ok(response.statistics)
    }

    async fn detect_issues(&self, packets: &[Packet]) -> Result<Vec<Issue>> {
        let url = self.endpoint(&["detect-issues"])?;
        let response: IssuesResponse = self
            .send(self.client.post(url).json(&PacketsRequest { packets }))
            .await?;
        Ok(response.issues)
    }

    async fn save_capture(&self, packets: &[Packet], filename: &str, format: StorageFormat) -> Result<()> {
        let url = self.endpoint(&["storage", "save"])?;
        let body = SaveRequest { packets, filename, format };
        let _: Ack = self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }

    async fn load_capture(&self, filename: &str) -> Result<Vec<Packet>> {
        let url = self.endpoint(&["storage", "load", filename])?;
        let response: LoadResponse = self.send(self.client.get(url)).await?;
        Ok(response.packets)
    }

    async fn list_captures(&self) -> Result<Vec<StoredCaptureRecord>> {
        let url = self.endpoint(&["storage", "captures"])?;
        let response: ListResponse = self.send(self.client.get(url)).await?;
        Ok(response.captures)
    }

    async fn delete_capture(&self, filename: &str) -> Result<()> {
        let url = self.endpoint(&["storage", "delete", filename])?;
        let _: Ack = self.send(self.client.delete(url)).await?;
        Ok(())
    }
}
