use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analysis::{Analysis, Issue, Statistics};
use crate::capture::Packet;
use crate::error::{AnalyzerError, Result};
use crate::storage::{StorageFormat, StoredCaptureRecord};

#[derive(Serialize)]
pub struct PacketsRequest<'a> {
    pub packets: &'a [Packet],
}

#[derive(Serialize)]
pub struct SaveRequest<'a> {
    pub packets: &'a [Packet],
    pub filename: &'a str,
    pub format: StorageFormat,
}

#[derive(Debug, Deserialize)]
pub struct CaptureResponse {
    pub packets: Vec<Packet>,
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeResponse {
    pub analyses: Vec<Analysis>,
}

#[derive(Debug, Deserialize)]
pub struct StatisticsResponse {
    pub statistics: Statistics,
}

#[derive(Debug, Deserialize)]
pub struct IssuesResponse {
    pub issues: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
pub struct LoadResponse {
    pub packets: Vec<Packet>,
}

#[derive(Debug, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub captures: Vec<StoredCaptureRecord>,
}

/// Body of an acknowledgement; only the envelope matters.
#[derive(Debug, Deserialize)]
pub struct Ack {}

/// Maps a status and raw body onto a typed payload or the error taxonomy.
///
/// Non-2xx with an `error`/`message` field is a backend error, without one a
/// transport error. A 2xx body with `"success": false` is a backend error too.
pub fn decode<T: DeserializeOwned>(status: StatusCode, body: &str) -> Result<T> {
    let value: Option<Value> = serde_json::from_str(body).ok();

    if !status.is_success() {
        return Err(match value.as_ref().and_then(error_message) {
            Some(message) => AnalyzerError::Backend(message),
            None => AnalyzerError::Transport(format!("backend returned HTTP {}", status)),
        });
    }

    let value = value.ok_or_else(|| {
        AnalyzerError::MalformedResponse("response body is not valid JSON".to_string())
    })?;

    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = error_message(&value).unwrap_or_else(|| "backend reported failure".to_string());
        return Err(AnalyzerError::Backend(message));
    }

    Ok(serde_json::from_value(value)?)
}

fn error_message(value: &Value) -> Option<String> {
    value
        .get("error")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
