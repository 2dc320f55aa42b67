use std::sync::Arc;

use super::packet::{ensure_unique_numbers, CaptureMode, CaptureRequest, Packet};
use crate::analysis::{reconcile_analyses, Analysis, Issue, Statistics};
use crate::backend::Backend;
use crate::error::{AnalyzerError, Result};
use crate::session::{CaptureSession, SessionSnapshot, SessionStore};

/// Results of the three stages that run over a captured packet list.
struct Derived {
    analyses: Vec<Analysis>,
    statistics: Option<Statistics>,
    issues: Vec<Issue>,
}

/// Runs capture -> (analyze | statistics | detect-issues) and publishes the
/// merged session.
///
/// Only the capture stage can abort a run. The other three are issued
/// together once packets are in hand, and a failure in any of them leaves its
/// part of the session empty (or absent, for statistics). Nothing is
/// published until every stage has settled.
pub struct CaptureOrchestrator {
    backend: Arc<dyn Backend>,
    store: Arc<SessionStore>,
    max_count: u32,
}

impl CaptureOrchestrator {
    pub fn new(backend: Arc<dyn Backend>, store: Arc<SessionStore>, max_count: u32) -> Self {
        Self {
            backend,
            store,
            max_count,
        }
    }

    pub fn max_count(&self) -> u32 {
        self.max_count
    }

    pub async fn run_capture(&self, count: u32, real_capture: bool) -> Result<SessionSnapshot> {
        let request = CaptureRequest::new(count, real_capture, self.max_count)?;
        let writer = self.store.writer().await;

        log::info!(
            "Capturing {} packets ({})",
            request.count,
            CaptureMode::for_request(real_capture)
        );
        let captured = self.backend.capture(request).await.map_err(|e| {
            log::warn!("Capture stage failed: {}", e);
            e
        })?;
        ensure_unique_numbers(&captured.packets)?;

        let mode = captured
            .mode
            .unwrap_or_else(|| CaptureMode::for_request(real_capture));
        let derived = self.derive(&captured.packets).await;

        Ok(writer.publish(CaptureSession {
            packets: captured.packets,
            analyses: derived.analyses,
            statistics: derived.statistics,
            issues: derived.issues,
            mode: Some(mode),
        }))
    }

    /// Re-runs the three derived stages over the current packets, keeping the
    /// packets and mode as they are. Used after a load.
    pub async fn reanalyze(&self) -> Result<SessionSnapshot> {
        let writer = self.store.writer().await;
        let current = writer.current();
        if current.is_empty() {
            return Err(AnalyzerError::validation("no packets to analyze"));
        }

        log::info!("Re-analyzing {} packets", current.packets.len());
        let derived = self.derive(&current.packets).await;

        Ok(writer.publish(CaptureSession {
            packets: current.packets.clone(),
            analyses: derived.analyses,
            statistics: derived.statistics,
            issues: derived.issues,
            mode: current.mode,
        }))
    }

    async fn derive(&self, packets: &[Packet]) -> Derived {
        let (analyses, statistics, issues) = tokio::join!(
            self.backend.analyze(packets),
            self.backend.statistics(packets),
            self.backend.detect_issues(packets),
        );

        let analyses = match analyses {
            Ok(analyses) => reconcile_analyses(packets, analyses),
            Err(e) => {
                log::warn!("Analysis stage failed, continuing without analyses: {}", e);
                Vec::new()
            }
        };

        let statistics = match statistics.and_then(|stats| stats.validate().map(|_| stats)) {
            Ok(stats) => Some(stats),
            Err(e) => {
                log::warn!("Statistics stage failed, continuing without statistics: {}", e);
                None
            }
        };

        let issues = match issues {
            Ok(issues) => issues,
            Err(e) => {
                log::warn!("Issue detection failed, continuing without issues: {}", e);
                Vec::new()
            }
        };

        Derived {
            analyses,
            statistics,
            issues,
        }
    }
}
