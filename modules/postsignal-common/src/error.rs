use browserless_client::BrowserlessError;
use thiserror::Error;

/// Failures a scrape run reports to its caller.
///
/// Transient navigation errors are normally retried before they surface, and
/// malformed post cards are dropped during extraction rather than raised.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Redirected to login page ({url}) - authentication failed")]
    Authentication { url: String },

    #[error("Navigation failed: {0}")]
    TransientNavigation(String),

    #[error("Selector timeout: {message}")]
    SelectorTimeout {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Upstream error (status {status}): {message}")]
    Upstream {
        status: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Not on a profile page. Current URL: {url}")]
    UnexpectedPage { url: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScrapeError {
    /// Only detached-frame style navigation failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ScrapeError::TransientNavigation(_))
    }

    /// Upstream payload attached to the error, if any.
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            ScrapeError::SelectorTimeout { details, .. } | ScrapeError::Upstream { details, .. } => {
                details.as_ref()
            }
            _ => None,
        }
    }
}

const SELECTOR_TIMEOUT_HINT: &str =
    "posts not found before the wait budget ran out. Check that the cookies are valid and the profile is visible.";

impl From<BrowserlessError> for ScrapeError {
    fn from(err: BrowserlessError) -> Self {
        let details = err.details();
        if err.is_timeout() {
            return ScrapeError::SelectorTimeout {
                message: SELECTOR_TIMEOUT_HINT.to_string(),
                details,
            };
        }
        match err {
            BrowserlessError::Api { status, message } => ScrapeError::Upstream {
                status,
                message,
                details,
            },
            BrowserlessError::Network(message) | BrowserlessError::Timeout(message) => {
                ScrapeError::Upstream {
                    status: 0,
                    message,
                    details,
                }
            }
            BrowserlessError::Endpoint(msg) => ScrapeError::Configuration(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browserless_timeout_becomes_selector_timeout() {
        let err: ScrapeError = BrowserlessError::Api {
            status: 408,
            message: r#"{"message":"Timeout 5000ms exceeded"}"#.into(),
        }
        .into();
        match err {
            ScrapeError::SelectorTimeout { details, .. } => {
                assert_eq!(details.unwrap()["message"], "Timeout 5000ms exceeded");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn browserless_api_error_becomes_upstream() {
        let err: ScrapeError = BrowserlessError::Api {
            status: 401,
            message: "bad token".into(),
        }
        .into();
        assert!(matches!(err, ScrapeError::Upstream { status: 401, .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn only_transient_navigation_is_retryable() {
        assert!(ScrapeError::TransientNavigation("detached Frame".into()).is_retryable());
        assert!(!ScrapeError::Authentication { url: "x".into() }.is_retryable());
    }
}
