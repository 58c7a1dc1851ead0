pub mod error;
pub mod types;

pub use error::{BrowserlessError, Result};
pub use types::{BrowserCookie, ContentRequest, GotoOptions, WaitForSelector, WaitUntil};

use std::time::Duration;

use types::ContentEnvelope;

/// Default HTTP timeout for a single render request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    /// Fetch fully-rendered HTML content via the Browserless /content endpoint.
    pub async fn content(&self, request: &ContentRequest) -> Result<String> {
        let endpoint = format!("{}/content", self.base_url);

        let mut builder = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(request);
        if let Some(ref token) = self.token {
            builder = builder.query(&[("token", token)]);
        }

        tracing::debug!(url = %request.url, cookies = request.cookies.len(), "browserless: /content");
        let resp = builder.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        Ok(unwrap_envelope(body))
    }

    /// CDP WebSocket endpoint for interactive sessions, e.g.
    /// `wss://production-sfo.browserless.io/?token=…&stealth`.
    pub fn websocket_endpoint(&self, stealth: bool) -> Result<String> {
        let mut url = url::Url::parse(&self.base_url)?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(BrowserlessError::Endpoint(format!(
                    "unsupported scheme: {other}"
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| BrowserlessError::Endpoint(format!("cannot use scheme {scheme}")))?;

        let mut query = Vec::new();
        if let Some(ref token) = self.token {
            query.push(format!("token={token}"));
        }
        if stealth {
            query.push("stealth".to_string());
        }
        if !query.is_empty() {
            url.set_query(Some(&query.join("&")));
        }

        Ok(url.to_string())
    }
}

/// Return the HTML inside a `{"data": …}` / `{"html": …}` envelope, or the body as-is.
fn unwrap_envelope(body: String) -> String {
    if !body.trim_start().starts_with('{') {
        return body;
    }
    match serde_json::from_str::<ContentEnvelope>(&body) {
        Ok(ContentEnvelope {
            data: Some(html), ..
        })
        | Ok(ContentEnvelope {
            html: Some(html), ..
        }) => html,
        _ => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_endpoint_swaps_scheme_and_adds_token() {
        let client =
            BrowserlessClient::new("https://production-sfo.browserless.io/", Some("tok")).unwrap();
        assert_eq!(
            client.websocket_endpoint(true).unwrap(),
            "wss://production-sfo.browserless.io/?token=tok&stealth"
        );
        assert_eq!(
            client.websocket_endpoint(false).unwrap(),
            "wss://production-sfo.browserless.io/?token=tok"
        );
    }

    #[test]
    fn websocket_endpoint_without_token() {
        let client = BrowserlessClient::new("http://localhost:3000", None).unwrap();
        assert_eq!(client.websocket_endpoint(false).unwrap(), "ws://localhost:3000/");
    }

    #[test]
    fn websocket_endpoint_rejects_odd_schemes() {
        let client = BrowserlessClient::new("ftp://localhost", None).unwrap();
        assert!(matches!(
            client.websocket_endpoint(false),
            Err(BrowserlessError::Endpoint(_))
        ));
    }

    #[test]
    fn envelope_is_unwrapped() {
        assert_eq!(unwrap_envelope(r#"{"data":"<html></html>"}"#.into()), "<html></html>");
        assert_eq!(unwrap_envelope(r#"{"html":"<p>x</p>"}"#.into()), "<p>x</p>");
        assert_eq!(unwrap_envelope("<html>raw</html>".into()), "<html>raw</html>");
        assert_eq!(unwrap_envelope(r#"{"other":1}"#.into()), r#"{"other":1}"#);
    }
}
