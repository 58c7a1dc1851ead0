use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Only secrets and deployment-specific values live here; scrape tuning is
/// in [`ScrapeSettings`].
#[derive(Debug, Clone)]
pub struct Config {
    // Browserless
    pub browserless_url: String,
    pub browserless_token: String,
    pub browserless_stealth: bool,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Files
    pub cookies_file: PathBuf,
    pub output_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let browserless_url = match std::env::var("BROWSERLESS_URL") {
            Ok(url) => url,
            Err(_) => {
                let region = std::env::var("BROWSERLESS_REGION")
                    .unwrap_or_else(|_| "production-sfo".to_string());
                format!("https://{region}.browserless.io")
            }
        };

        let config = Self {
            browserless_url,
            browserless_token: std::env::var("BROWSERLESS_API_TOKEN")
                .context("BROWSERLESS_API_TOKEN environment variable is required")?,
            browserless_stealth: std::env::var("BROWSERLESS_STEALTH")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            web_host: std::env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: std::env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("WEB_PORT must be a number")?,
            cookies_file: std::env::var("COOKIES_FILE")
                .unwrap_or_else(|_| "./cookies.txt".to_string())
                .into(),
            output_path: std::env::var("OUTPUT_PATH")
                .unwrap_or_else(|_| "posts.json".to_string())
                .into(),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  BROWSERLESS_URL: {}", self.browserless_url);
        tracing::info!("  BROWSERLESS_API_TOKEN: {}", preview(&self.browserless_token));
        tracing::info!("  BROWSERLESS_STEALTH: {}", self.browserless_stealth);
        tracing::info!("  COOKIES_FILE: {}", self.cookies_file.display());
        tracing::info!("  OUTPUT_PATH: {}", self.output_path.display());
    }
}

/// First five characters of a secret plus its length.
fn preview(val: &str) -> String {
    let head: String = val.chars().take(5).collect();
    format!("{head}...({} chars)", val.chars().count())
}

/// Timeouts, budgets and pauses for one scrape run.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    /// Whole `/content` request, including Browserless' own rendering.
    pub request_timeout: Duration,
    /// How long Browserless waits for the first post card to appear.
    pub selector_timeout: Duration,
    /// Upper bound on a single CDP navigation.
    pub navigation_timeout: Duration,
    pub navigation_attempts: u32,
    pub navigation_backoff: Duration,
    /// Pause after landing on the site home before setting cookies.
    pub settle_pause: Duration,
    /// Pause after cookies are set, before the target navigation.
    pub cookie_pause: Duration,
    /// Pause after a navigation before reading the current URL.
    pub post_navigation_pause: Duration,
    /// Bounded wait for logged-in markers; missing them is only a warning.
    pub login_check_timeout: Duration,
    pub initial_load_pause: Duration,
    pub load_pause: Duration,
    pub max_scroll_attempts: u32,
    pub max_no_new_posts_in_a_row: u32,
    pub viewport: (u32, u32),
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(120),
            selector_timeout: Duration::from_secs(5),
            navigation_timeout: Duration::from_secs(90),
            navigation_attempts: 3,
            navigation_backoff: Duration::from_secs(3),
            settle_pause: Duration::from_secs(3),
            cookie_pause: Duration::from_secs(2),
            post_navigation_pause: Duration::from_secs(2),
            login_check_timeout: Duration::from_secs(15),
            initial_load_pause: Duration::from_secs(5),
            load_pause: Duration::from_secs(4),
            max_scroll_attempts: 40,
            max_no_new_posts_in_a_row: 3,
            viewport: (1920, 1080),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}
