use chrono::{DateTime, Utc};

use crate::analysis::Analysis;
use crate::capture::Packet;

/// Human-readable size: "0 B", "512 B", "1.5 KB", "2.25 MB".
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        return format!("{} {}", bytes, UNITS[0]);
    }

    let rounded = format!("{:.2}", size);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit_index])
}

pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_rate(packets_per_second: f64) -> String {
    format!("{:.2} pkt/s", packets_per_second)
}

/// Truncate string to at most `max_len` characters, marking the cut with "...".
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// One listing line: number, protocol, addresses, length, summary.
pub fn format_packet_line(packet: &Packet) -> String {
    let line = format!(
        "{:>4}  {:<6} {:>15} -> {:<15} {:>6} B  {}",
        packet.number,
        truncate_string(&packet.protocol, 6),
        packet.src_ip.as_deref().filter(|ip| !ip.is_empty()).unwrap_or("?"),
        packet.dst_ip.as_deref().filter(|ip| !ip.is_empty()).unwrap_or("?"),
        packet.length,
        truncate_string(&packet.summary, 60),
    );
    if packet.real_packet {
        format!("{} [REAL]", line)
    } else {
        line
    }
}

pub fn format_analysis_lines(analysis: &Analysis) -> Vec<String> {
    let mut lines = vec![format!("      {}: {}", analysis.protocol, analysis.summary)];
    for (name, layer) in &analysis.layers {
        match &layer.description {
            Some(description) => lines.push(format!("        {}: {}", name, description)),
            None => lines.push(format!("        {}", name)),
        }
        if let Some(note) = &layer.educational_note {
            lines.push(format!("          note: {}", note));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1048576), "1 MB");
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 8, 5, 9).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-03-01 08:05:09");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("hi", 2), "hi");
        assert_eq!(truncate_string("→→→→→", 4), "→...");
    }

    #[test]
    fn test_packet_line_marks_missing_addresses() {
        let line = format_packet_line(&Packet::new(7, "ICMP", 84).with_summary("Echo request"));
        assert!(line.contains("ICMP"));
        assert!(line.contains("? -> ?"));
        assert!(line.ends_with("Echo request"));
        assert_eq!(format_rate(2.5), "2.50 pkt/s");

        let live = format_packet_line(&Packet::new(8, "TCP", 60).captured_live());
        assert!(live.ends_with("[REAL]"));
    }

    #[test]
    fn test_analysis_block_lists_layers() {
        use crate::analysis::LayerInfo;
        use std::collections::BTreeMap;

        let analysis = Analysis {
            packet_number: 2,
            protocol: "UDP".to_string(),
            summary: "DNS query".to_string(),
            layers: BTreeMap::from([
                (
                    "network".to_string(),
                    LayerInfo {
                        description: Some("IPv4 10.0.0.2 -> 8.8.8.8".to_string()),
                        educational_note: Some("Routes packets between hosts".to_string()),
                    },
                ),
                ("transport".to_string(), LayerInfo::default()),
            ]),
        };

        let lines = format_analysis_lines(&analysis);
        assert_eq!(
            lines,
            vec![
                "      UDP: DNS query".to_string(),
                "        network: IPv4 10.0.0.2 -> 8.8.8.8".to_string(),
                "          note: Routes packets between hosts".to_string(),
                "        transport".to_string(),
            ]
        );
    }
}
