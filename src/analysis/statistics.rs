use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AnalyzerError, Result};

/// Tolerance on the sum of rounded protocol percentages.
const PERCENTAGE_SUM_TOLERANCE: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtocolShare {
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBucket {
    pub count: u64,
}

/// Packet counts per size class: small < 100 B, medium < 1024 B, large otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacketSizeAnalysis {
    #[serde(default)]
    pub small: SizeBucket,
    #[serde(default)]
    pub medium: SizeBucket,
    #[serde(default)]
    pub large: SizeBucket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn of(length: u64) -> Self {
        match length {
            0..=99 => SizeClass::Small,
            100..=1023 => SizeClass::Medium,
            _ => SizeClass::Large,
        }
    }
}

impl PacketSizeAnalysis {
    pub fn total(&self) -> u64 {
        self.small.count + self.medium.count + self.large.count
    }

    pub fn count(&self, class: SizeClass) -> u64 {
        match class {
            SizeClass::Small => self.small.count,
            SizeClass::Medium => self.medium.count,
            SizeClass::Large => self.large.count,
        }
    }
}

/// Session-level aggregate produced by the statistics stage.
///
/// Only the object forms of `protocol_distribution` and
/// `packet_size_analysis` entries are accepted; a payload using bare numbers
/// fails to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_packets: u64,
    #[serde(default)]
    pub total_data: u64,
    #[serde(default)]
    pub traffic_rate: f64,
    #[serde(default)]
    pub protocol_distribution: BTreeMap<String, ProtocolShare>,
    pub packet_size_analysis: PacketSizeAnalysis,
    #[serde(default)]
    pub average_packet_size: f64,
}

impl Statistics {
    /// Checks the cross-field invariants of an ingested payload.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("traffic_rate", self.traffic_rate),
            ("average_packet_size", self.average_packet_size),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(malformed(format!("{} must be a non-negative number, got {}", name, value)));
            }
        }

        let mut protocol_total = 0u64;
        let mut percentage_total = 0.0;
        for (protocol, share) in &self.protocol_distribution {
            if !share.percentage.is_finite() || !(0.0..=100.0).contains(&share.percentage) {
                return Err(malformed(format!(
                    "percentage for {} out of range: {}",
                    protocol, share.percentage
                )));
            }
            protocol_total += share.count;
            percentage_total += share.percentage;
        }

        if protocol_total != self.total_packets {
            return Err(malformed(format!(
                "protocol counts sum to {} but total_packets is {}",
                protocol_total, self.total_packets
            )));
        }

        if protocol_total > 0 && (percentage_total - 100.0).abs() > PERCENTAGE_SUM_TOLERANCE {
            return Err(malformed(format!(
                "protocol percentages sum to {:.1}",
                percentage_total
            )));
        }

        let bucket_total = self.packet_size_analysis.total();
        if bucket_total != self.total_packets {
            return Err(malformed(format!(
                "size buckets sum to {} but total_packets is {}",
                bucket_total, self.total_packets
            )));
        }

        Ok(())
    }

    /// Protocols ordered by packet count, highest first.
    pub fn top_protocols(&self) -> Vec<(&str, &ProtocolShare)> {
        let mut protocols: Vec<_> = self
            .protocol_distribution
            .iter()
            .map(|(name, share)| (name.as_str(), share))
            .collect();
        protocols.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        protocols
    }

    pub fn top_protocol(&self) -> Option<&str> {
        self.top_protocols().first().map(|(name, _)| *name)
    }

    pub fn protocol_percentage(&self, protocol: &str) -> f64 {
        self.protocol_distribution
            .get(protocol)
            .map(|share| share.percentage)
            .unwrap_or(0.0)
    }
}

fn malformed(message: String) -> AnalyzerError {
    AnalyzerError::MalformedResponse(format!("statistics: {}", message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Statistics {
        serde_json::from_value(json!({
            "total_packets": 5,
            "total_data": 580,
            "traffic_rate": 1.25,
            "protocol_distribution": {
                "TCP": {"count": 3, "percentage": 60.0},
                "UDP": {"count": 1, "percentage": 20.0},
                "ICMP": {"count": 1, "percentage": 20.0}
            },
            "packet_size_analysis": {
                "small": {"count": 2},
                "medium": {"count": 3},
                "large": {"count": 0}
            },
            "average_packet_size": 116.0
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_statistics() {
        let stats = sample();
        assert!(stats.validate().is_ok());
        assert_eq!(stats.top_protocol(), Some("TCP"));
        assert_eq!(stats.protocol_percentage("UDP"), 20.0);
        assert_eq!(stats.protocol_percentage("ARP"), 0.0);
    }

    #[test]
    fn test_bare_number_shapes_are_rejected() {
        let bare_protocol = json!({
            "total_packets": 1,
            "protocol_distribution": {"TCP": 1},
            "packet_size_analysis": {"small": {"count": 1}}
        });
        assert!(serde_json::from_value::<Statistics>(bare_protocol).is_err());

        let bare_bucket = json!({
            "total_packets": 1,
            "protocol_distribution": {"TCP": {"count": 1, "percentage": 100.0}},
            "packet_size_analysis": {"small": 1}
        });
        assert!(serde_json::from_value::<Statistics>(bare_bucket).is_err());

        let unknown_bucket = json!({
            "total_packets": 1,
            "protocol_distribution": {"TCP": {"count": 1, "percentage": 100.0}},
            "packet_size_analysis": {"jumbo": {"count": 1}}
        });
        assert!(serde_json::from_value::<Statistics>(unknown_bucket).is_err());
    }

    #[test]
    fn test_count_mismatch_is_rejected() {
        let mut stats = sample();
        stats.total_packets = 6;
        assert!(stats.validate().unwrap_err().is_transport());

        let mut stats = sample();
        stats.packet_size_analysis.large.count = 1;
        assert!(stats.validate().is_err());
    }

    #[test]
    fn test_percentage_out_of_range() {
        let mut stats = sample();
        if let Some(share) = stats.protocol_distribution.get_mut("TCP") {
            share.percentage = 160.0;
        }
        assert!(stats.validate().is_err());
    }

    #[test]
    fn test_empty_traffic_is_valid() {
        let stats: Statistics = serde_json::from_value(json!({
            "total_packets": 0,
            "packet_size_analysis": {}
        }))
        .unwrap();
        assert!(stats.validate().is_ok());
        assert_eq!(stats.top_protocol(), None);
    }

    #[test]
    fn test_size_class_boundaries() {
        assert_eq!(SizeClass::of(99), SizeClass::Small);
        assert_eq!(SizeClass::of(100), SizeClass::Medium);
        assert_eq!(SizeClass::of(1023), SizeClass::Medium);
        assert_eq!(SizeClass::of(1024), SizeClass::Large);
    }
}
