//! The request/response boundary to the traffic-processing service.
//!
//! Capture, protocol analysis, statistics, issue detection and capture storage
//! all live behind this service. The core only depends on the [`Backend`]
//! trait; [`HttpBackend`] is the JSON-over-HTTP implementation.

pub mod http;
pub mod wire;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;

use crate::analysis::{Analysis, Issue, Statistics};
use crate::capture::{CaptureMode, CaptureRequest, Packet};
use crate::error::Result;
use crate::storage::{StorageFormat, StoredCaptureRecord};

pub use http::HttpBackend;

/// Output of the capture stage.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPackets {
    pub packets: Vec<Packet>,
    /// Mode reported by the service, if it reported a recognisable one.
    pub mode: Option<CaptureMode>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Succeeds when the service answers its health endpoint with a 2xx.
    async fn health(&self) -> Result<()>;

    async fn capture(&self, request: CaptureRequest) -> Result<CapturedPackets>;

    async fn analyze(&self, packets: &[Packet]) -> Result<Vec<Analysis>>;

    async fn statistics(&self, packets: &[Packet]) -> Result<Statistics>;

    async fn detect_issues(&self, packets: &[Packet]) -> Result<Vec<Issue>>;

    async fn save_capture(&self, packets: &[Packet], filename: &str, format: StorageFormat) -> Result<()>;

    async fn load_capture(&self, filename: &str) -> Result<Vec<Packet>>;

    async fn list_captures(&self) -> Result<Vec<StoredCaptureRecord>>;

    async fn delete_capture(&self, filename: &str) -> Result<()>;
}
