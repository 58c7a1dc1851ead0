use std::fmt;
use std::str::FromStr;

use browserless_client::BrowserCookie;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Cookies ---

/// A browser cookie, normalized from a cookie header string or a Netscape jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    /// Unix seconds. `None` for session cookies.
    #[serde(default, alias = "expiry", skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
}

fn default_path() -> String {
    "/".to_string()
}

impl Cookie {
    /// Domain without the leading dot, for contexts that need an exact host match.
    pub fn host_only_domain(&self) -> &str {
        self.domain.strip_prefix('.').unwrap_or(&self.domain)
    }
}

impl From<&Cookie> for BrowserCookie {
    fn from(c: &Cookie) -> Self {
        BrowserCookie {
            name: c.name.clone(),
            value: c.value.clone(),
            domain: c.domain.clone(),
            path: c.path.clone(),
            http_only: c.http_only,
            secure: c.secure,
            expires: c.expires,
        }
    }
}

// --- Raw blocks ---

/// Outer HTML of one post card, as pulled from a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock(pub String);

impl RawBlock {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RawBlock {
    fn from(html: String) -> Self {
        RawBlock(html)
    }
}

// --- Posts ---

/// One extracted feed post. Field names on the wire match the JSON files the
/// scraper has always written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "Post_ID")]
    pub id: String,
    #[serde(rename = "Post_URL")]
    pub url: String,
    #[serde(rename = "Post_Author_Name")]
    pub author_name: String,
    #[serde(rename = "Post_Author_Profile")]
    pub author_profile_url: String,
    #[serde(rename = "Post_Author_JobTitle")]
    pub author_job_title: String,
    /// Free text, e.g. "3d •". Not parsed.
    #[serde(rename = "Post_Time")]
    pub posted_at: String,
    #[serde(rename = "Post_Content")]
    pub content: String,
    #[serde(rename = "Post_Reactions")]
    pub reaction_count: u64,
    #[serde(rename = "Post_Comments")]
    pub comment_count: u64,
    #[serde(rename = "Post_Impressions")]
    pub impression_count: u64,
    #[serde(rename = "Date_Collected", with = "collected_at_format")]
    pub collected_at: DateTime<Utc>,
}

impl Post {
    /// First 70 characters of the content, for log lines only.
    pub fn content_preview(&self) -> String {
        const PREVIEW_CHARS: usize = 70;
        if self.content.is_empty() {
            return "[No content]".to_string();
        }
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

mod collected_at_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT)
            .map(|n| n.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

// --- Strategy ---

/// How the rendered feed is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStrategy {
    /// One Browserless `/content` render; only what is on the first screen.
    #[default]
    Snapshot,
    /// Live CDP session that scrolls and collects incrementally.
    Interactive,
}

impl fmt::Display for ScrapeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapeStrategy::Snapshot => write!(f, "snapshot"),
            ScrapeStrategy::Interactive => write!(f, "interactive"),
        }
    }
}

impl FromStr for ScrapeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snapshot" => Ok(ScrapeStrategy::Snapshot),
            "interactive" => Ok(ScrapeStrategy::Interactive),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}
