use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{AnalyzerError, Result};

/// One captured packet as reported by the capture stage.
///
/// `number` is 1-based and unique within a session; ordering of the packet
/// list is capture order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub protocol: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub length: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default)]
    pub src_ip: Option<String>,
    #[serde(default)]
    pub dst_ip: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub real_packet: bool,
}

impl Packet {
    pub fn new(number: u32, protocol: impl Into<String>, length: u64) -> Self {
        Self {
            number,
            timestamp: None,
            protocol: protocol.into(),
            length,
            summary: String::new(),
            src_ip: None,
            dst_ip: None,
            real_packet: false,
        }
    }

    pub fn with_addresses(mut self, src_ip: impl Into<String>, dst_ip: impl Into<String>) -> Self {
        self.src_ip = Some(src_ip.into());
        self.dst_ip = Some(dst_ip.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn captured_live(mut self) -> Self {
        self.real_packet = true;
        self
    }
}

// The service fills absent packet fields with null.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    #[serde(alias = "simulation")]
    Simulated,
    Real,
    Loaded,
}

impl CaptureMode {
    pub fn for_request(real_capture: bool) -> Self {
        if real_capture {
            CaptureMode::Real
        } else {
            CaptureMode::Simulated
        }
    }

    /// Lenient parse of the mode string the capture endpoint reports.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulated" | "simulation" => Some(CaptureMode::Simulated),
            "real" => Some(CaptureMode::Real),
            "loaded" => Some(CaptureMode::Loaded),
            _ => None,
        }
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureMode::Simulated => "simulated",
            CaptureMode::Real => "real",
            CaptureMode::Loaded => "loaded",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CaptureRequest {
    pub count: u32,
    #[serde(rename = "realCapture")]
    pub real_capture: bool,
}

impl CaptureRequest {
    pub fn new(count: u32, real_capture: bool, max_count: u32) -> Result<Self> {
        if count == 0 {
            return Err(AnalyzerError::validation("packet count must be at least 1"));
        }
        if count > max_count {
            return Err(AnalyzerError::validation(format!(
                "packet count {} exceeds the limit of {}",
                count, max_count
            )));
        }
        Ok(Self { count, real_capture })
    }
}

/// Rejects a packet list whose numbers are not unique.
pub fn ensure_unique_numbers(packets: &[Packet]) -> Result<()> {
    let mut seen = HashSet::with_capacity(packets.len());
    for packet in packets {
        if !seen.insert(packet.number) {
            return Err(AnalyzerError::MalformedResponse(format!(
                "duplicate packet number {}",
                packet.number
            )));
        }
    }
    Ok(())
}
