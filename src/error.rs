use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyzerError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Backend(String),

    #[error("Invalid request: {0}")]
    Validation(String),
}

impl AnalyzerError {
    /// Transport-class failures: the call never produced a usable answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, AnalyzerError::Transport(_) | AnalyzerError::MalformedResponse(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AnalyzerError::Validation(_))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AnalyzerError::Validation(message.into())
    }
}

impl From<reqwest::Error> for AnalyzerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AnalyzerError::Transport(format!("request timed out: {err}"))
        } else if err.is_decode() {
            AnalyzerError::MalformedResponse(err.to_string())
        } else {
            AnalyzerError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AnalyzerError {
    fn from(err: serde_json::Error) -> Self {
        AnalyzerError::MalformedResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
