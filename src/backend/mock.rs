//! Scripted in-memory service used by unit tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{Backend, CapturedPackets};
use crate::analysis::{
    Analysis, Issue, LayerInfo, PacketSizeAnalysis, ProtocolShare, Severity, SizeClass, Statistics,
};
use crate::capture::{CaptureMode, CaptureRequest, Packet};
use crate::error::{AnalyzerError, Result};
use crate::storage::{StorageFormat, StoredCaptureRecord};

#[derive(Default)]
struct Script {
    capture_error: Option<String>,
    analyze_error: Option<String>,
    statistics_error: Option<String>,
    issues_error: Option<String>,
    list_error: Option<String>,
    captured: Option<Vec<Packet>>,
    analyses: Option<Vec<Analysis>>,
    statistics: Option<Statistics>,
    issues: Option<Vec<Issue>>,
    stored: HashMap<String, (Vec<Packet>, StorageFormat)>,
}

pub struct MockBackend {
    script: Mutex<Script>,
    healthy: AtomicBool,
    health_delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
    health_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            healthy: AtomicBool::new(true),
            health_delay: Mutex::new(None),
            calls: AtomicUsize::new(0),
            health_calls: AtomicUsize::new(0),
        }
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    /// Calls made to anything other than the health endpoint.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Makes the health endpoint take `delay` before answering.
    pub fn set_health_delay(&self, delay: Duration) {
        *self.health_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail_capture(&self, message: &str) {
        self.script().capture_error = Some(message.to_string());
    }

    pub fn fail_analyze(&self, message: &str) {
        self.script().analyze_error = Some(message.to_string());
    }

    pub fn fail_statistics(&self, message: &str) {
        self.script().statistics_error = Some(message.to_string());
    }

    pub fn fail_issues(&self, message: &str) {
        self.script().issues_error = Some(message.to_string());
    }

    pub fn fail_list(&self, message: &str) {
        self.script().list_error = Some(message.to_string());
    }

    pub fn set_captured(&self, packets: Vec<Packet>) {
        self.script().captured = Some(packets);
    }

    pub fn set_analyses(&self, analyses: Vec<Analysis>) {
        self.script().analyses = Some(analyses);
    }

    pub fn set_statistics(&self, statistics: Statistics) {
        self.script().statistics = Some(statistics);
    }

    pub fn set_issues(&self, issues: Vec<Issue>) {
        self.script().issues = Some(issues);
    }

    pub fn insert_stored(&self, name: &str, packets: Vec<Packet>) {
        self.script()
            .stored
            .insert(name.to_string(), (packets, StorageFormat::Json));
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn scripted_error(error: &Option<String>) -> Result<()> {
    match error {
        Some(message) => Err(AnalyzerError::Backend(message.clone())),
        None => Ok(()),
    }
}

/// Packets numbered 1..=count, alternating TCP/UDP/ICMP with growing sizes.
pub fn generated_packets(count: u32, real: bool) -> Vec<Packet> {
    const PROTOCOLS: [&str; 3] = ["TCP", "UDP", "ICMP"];
    (1..=count)
        .map(|n| {
            let protocol = PROTOCOLS[(n as usize - 1) % PROTOCOLS.len()];
            let mut packet = Packet::new(n, protocol, 40 + 200 * n as u64)
                .with_addresses(format!("10.0.0.{}", n), "192.168.1.1")
                .with_summary(format!("{} packet {}", protocol, n));
            packet.real_packet = real;
            packet
        })
        .collect()
}

/// Statistics consistent with `packets`.
pub fn statistics_for(packets: &[Packet]) -> Statistics {
    let total = packets.len() as u64;
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut sizes = PacketSizeAnalysis::default();
    for packet in packets {
        *counts.entry(packet.protocol.clone()).or_insert(0) += 1;
        match SizeClass::of(packet.length) {
            SizeClass::Small => sizes.small.count += 1,
            SizeClass::Medium => sizes.medium.count += 1,
            SizeClass::Large => sizes.large.count += 1,
        }
    }
    let total_data: u64 = packets.iter().map(|p| p.length).sum();

    Statistics {
        total_packets: total,
        total_data,
        traffic_rate: total as f64,
        protocol_distribution: counts
            .into_iter()
            .map(|(protocol, count)| {
                let percentage = count as f64 / total as f64 * 100.0;
                (protocol, ProtocolShare { count, percentage })
            })
            .collect(),
        packet_size_analysis: sizes,
        average_packet_size: if total > 0 { total_data as f64 / total as f64 } else { 0.0 },
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn health(&self) -> Result<()> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.health_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AnalyzerError::Transport("connection refused".to_string()))
        }
    }

    async fn capture(&self, request: CaptureRequest) -> Result<CapturedPackets> {
        self.record_call();
        let script = self.script();
        scripted_error(&script.capture_error)?;
        let packets = script
            .captured
            .clone()
            .unwrap_or_else(|| generated_packets(request.count, request.real_capture));
        Ok(CapturedPackets {
            packets,
            mode: Some(CaptureMode::for_request(request.real_capture)),
        })
    }

    async fn analyze(&self, packets: &[Packet]) -> Result<Vec<Analysis>> {
        self.record_call();
        let script = self.script();
        scripted_error(&script.analyze_error)?;
        if let Some(analyses) = &script.analyses {
            return Ok(analyses.clone());
        }
        Ok(packets
            .iter()
            .map(|packet| Analysis {
                packet_number: packet.number,
                protocol: packet.protocol.clone(),
                summary: packet.summary.clone(),
                layers: BTreeMap::from([(
                    packet.protocol.to_ascii_lowercase(),
                    LayerInfo {
                        description: Some(format!("{} header", packet.protocol)),
                        educational_note: None,
                    },
                )]),
            })
            .collect())
    }

    async fn statistics(&self, packets: &[Packet]) -> Result<Statistics> {
        self.record_call();
        let script = self.script();
        scripted_error(&script.statistics_error)?;
        Ok(script.statistics.clone().unwrap_or_else(|| statistics_for(packets)))
    }

    async fn detect_issues(&self, packets: &[Packet]) -> Result<Vec<Issue>> {
        self.record_call();
        let script = self.script();
        scripted_error(&script.issues_error)?;
        if let Some(issues) = &script.issues {
            return Ok(issues.clone());
        }
        Ok(packets
            .iter()
            .filter(|p| SizeClass::of(p.length) == SizeClass::Large)
            .map(|p| Issue {
                kind: "large_packet".to_string(),
                severity: Severity::Low,
                description: format!("Packet {} is {} bytes", p.number, p.length),
                details: None,
                suggestion: Some("Check MTU settings".to_string()),
            })
            .collect())
    }

    async fn save_capture(&self, packets: &[Packet], filename: &str, format: StorageFormat) -> Result<()> {
        self.record_call();
        self.script()
            .stored
            .insert(filename.to_string(), (packets.to_vec(), format));
        Ok(())
    }

    async fn load_capture(&self, filename: &str) -> Result<Vec<Packet>> {
        self.record_call();
        self.script()
            .stored
            .get(filename)
            .map(|(packets, _)| packets.clone())
            .ok_or_else(|| AnalyzerError::Backend("Failed to load capture".to_string()))
    }

    async fn list_captures(&self) -> Result<Vec<StoredCaptureRecord>> {
        self.record_call();
        let script = self.script();
        scripted_error(&script.list_error)?;
        let mut records: Vec<StoredCaptureRecord> = script
            .stored
            .iter()
            .map(|(name, (packets, _))| StoredCaptureRecord {
                filename: name.clone(),
                size: packets.len() as u64 * 128,
                modified: Utc::now(),
            })
            .collect();
        records.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(records)
    }

    async fn delete_capture(&self, filename: &str) -> Result<()> {
        self.record_call();
        match self.script().stored.remove(filename) {
            Some(_) => Ok(()),
            None => Err(AnalyzerError::Backend("Failed to delete capture".to_string())),
        }
    }
}
