use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::capture::Packet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub educational_note: Option<String>,
}

/// Per-packet protocol breakdown produced by the analyze stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub packet_number: u32,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub summary: String,
    /// Keyed by layer name ("ethernet", "ip", "tcp", ...).
    #[serde(default)]
    pub layers: BTreeMap<String, LayerInfo>,
}

impl Analysis {
    pub fn layer(&self, name: &str) -> Option<&LayerInfo> {
        self.layers.get(name)
    }
}

/// Drops analyses for unknown packet numbers and repeated numbers (first wins).
pub fn reconcile_analyses(packets: &[Packet], analyses: Vec<Analysis>) -> Vec<Analysis> {
    let known: HashSet<u32> = packets.iter().map(|p| p.number).collect();
    let mut seen = HashSet::with_capacity(analyses.len());
    let total = analyses.len();

    let kept: Vec<Analysis> = analyses
        .into_iter()
        .filter(|analysis| known.contains(&analysis.packet_number) && seen.insert(analysis.packet_number))
        .collect();

    if kept.len() != total {
        log::warn!(
            "Discarded {} analyses with unknown or repeated packet numbers",
            total - kept.len()
        );
    }
    kept
}
