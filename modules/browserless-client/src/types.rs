use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Body for the Browserless `/content` endpoint.
#[derive(Debug, Clone, Serialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    #[builder(setter(into))]
    pub url: String,
    #[builder(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<BrowserCookie>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goto_options: Option<GotoOptions>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<WaitForSelector>,
    #[builder(default, setter(strip_option, into))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[builder(default, setter(strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub set_java_script_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GotoOptions {
    pub wait_until: WaitUntil,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Navigation lifecycle event Browserless waits for before snapshotting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitUntil {
    #[serde(rename = "load")]
    Load,
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    #[serde(rename = "networkidle0")]
    NetworkIdle0,
    #[serde(rename = "networkidle2")]
    NetworkIdle2,
}

#[derive(Debug, Clone, Serialize)]
pub struct WaitForSelector {
    pub selector: String,
    /// Milliseconds.
    pub timeout: u64,
}

/// Cookie as accepted by Browserless (puppeteer `CookieParam` shape).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
}

/// Some Browserless deployments wrap the HTML in a JSON envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ContentEnvelope {
    pub data: Option<String>,
    pub html: Option<String>,
}
