use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AnalyzerError;

/// Serialization the service uses for a stored capture. Opaque to this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageFormat {
    #[default]
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "pkl", alias = "binary")]
    Binary,
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageFormat::Json => write!(f, "json"),
            StorageFormat::Binary => write!(f, "binary"),
        }
    }
}

impl FromStr for StorageFormat {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(StorageFormat::Json),
            "binary" | "pkl" => Ok(StorageFormat::Binary),
            other => Err(AnalyzerError::validation(format!(
                "unknown storage format '{}' (expected json or binary)",
                other
            ))),
        }
    }
}

/// One entry of the stored-capture inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCaptureRecord {
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(deserialize_with = "deserialize_modified")]
    pub modified: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Epoch(f64),
}

/// Accepts RFC 3339, naive ISO-8601 (taken as UTC) or epoch seconds.
fn deserialize_modified<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Text(text) => parse_timestamp(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp '{}'", text))),
        RawTimestamp::Epoch(seconds) => {
            let whole = seconds.trunc() as i64;
            let nanos = (seconds.fract() * 1e9) as u32;
            Utc.timestamp_opt(whole, nanos)
                .single()
                .ok_or_else(|| serde::de::Error::custom(format!("timestamp {} out of range", seconds)))
        }
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}
