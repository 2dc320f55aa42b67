use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::capture::Packet;

/// Composable packet predicates, combined with AND.
///
/// Protocol matching is a case-insensitive substring test; address matching
/// is a plain substring test. A criterion that is absent or blank does not
/// constrain anything, and a packet without the address being tested never
/// matches an address criterion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub protocol: Option<String>,
    pub src_ip: Option<String>,
    pub dst_ip: Option<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn with_src_ip(mut self, src_ip: impl Into<String>) -> Self {
        self.src_ip = Some(src_ip.into());
        self
    }

    pub fn with_dst_ip(mut self, dst_ip: impl Into<String>) -> Self {
        self.dst_ip = Some(dst_ip.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        active(&self.protocol).is_none() && active(&self.src_ip).is_none() && active(&self.dst_ip).is_none()
    }

    pub fn matches(&self, packet: &Packet) -> bool {
        if let Some(protocol) = active(&self.protocol) {
            if !packet.protocol.to_lowercase().contains(&protocol.to_lowercase()) {
                return false;
            }
        }

        if let Some(src_ip) = active(&self.src_ip) {
            if !packet.src_ip.as_deref().is_some_and(|ip| ip.contains(src_ip)) {
                return false;
            }
        }

        if let Some(dst_ip) = active(&self.dst_ip) {
            if !packet.dst_ip.as_deref().is_some_and(|ip| ip.contains(dst_ip)) {
                return false;
            }
        }

        true
    }

    /// Matching packets, in their original order, as a new list.
    pub fn apply(&self, packets: &[Packet]) -> Vec<Packet> {
        packets.iter().filter(|p| self.matches(p)).cloned().collect()
    }
}

fn active(criterion: &Option<String>) -> Option<&str> {
    criterion.as_deref().map(str::trim).filter(|c| !c.is_empty())
}

/// Applies every criteria set in turn.
pub fn apply_all(packets: &[Packet], criteria: &[FilterCriteria]) -> Vec<Packet> {
    packets
        .iter()
        .filter(|p| criteria.iter().all(|c| c.matches(p)))
        .cloned()
        .collect()
}

/// Distinct non-empty protocol names, for a protocol picker.
pub fn distinct_protocols(packets: &[Packet]) -> BTreeSet<String> {
    packets
        .iter()
        .map(|p| p.protocol.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
