use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserlessError>;

#[derive(Debug, Error)]
pub enum BrowserlessError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Invalid endpoint: {0}")]
    Endpoint(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl BrowserlessError {
    /// True when Browserless gave up waiting for the page (selector wait or
    /// navigation timeout), or our own client timeout fired first.
    pub fn is_timeout(&self) -> bool {
        match self {
            BrowserlessError::Timeout(_) => true,
            BrowserlessError::Api { message, .. } => message.to_lowercase().contains("timeout"),
            _ => false,
        }
    }

    /// Upstream response body as JSON when it parses, otherwise as a plain string.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            BrowserlessError::Api { message, .. } if !message.is_empty() => Some(
                serde_json::from_str(message)
                    .unwrap_or_else(|_| serde_json::Value::String(message.clone())),
            ),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for BrowserlessError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BrowserlessError::Timeout(err.to_string())
        } else {
            BrowserlessError::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for BrowserlessError {
    fn from(err: url::ParseError) -> Self {
        BrowserlessError::Endpoint(err.to_string())
    }
}
