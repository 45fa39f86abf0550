use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("API quota exhausted after {attempts} attempts: {message}")]
    QuotaExceeded { attempts: u32, message: String },
    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// Whether this error signals rate limiting or an exhausted quota.
    pub fn is_quota(&self) -> bool {
        match self {
            Self::QuotaExceeded { .. } => true,
            Self::Api { status, message } => *status == 429 || is_quota_message(message),
            Self::Http(e) => {
                e.status().is_some_and(|s| s.as_u16() == 429) || is_quota_message(&e.to_string())
            }
            _ => false,
        }
    }
}

fn is_quota_message(message: &str) -> bool {
    message.contains("429")
        || message.contains("RESOURCE_EXHAUSTED")
        || message.to_ascii_lowercase().contains("quota")
}
