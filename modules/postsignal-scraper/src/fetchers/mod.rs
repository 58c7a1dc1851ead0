// Ways of getting a rendered activity page.
//
// SnapshotFetcher asks Browserless for one rendered snapshot over HTTP.
// InteractiveFetcher drives a remote browser over CDP and returns the page
// after cookies, navigation and the login check. Both are behind
// ContentFetcher so the scraper and its tests can swap them.

pub mod session;
pub mod snapshot;

use async_trait::async_trait;
use postsignal_common::{Cookie, ScrapeError};

pub use session::{BrowserSession, InteractiveFetcher};
pub use snapshot::SnapshotFetcher;

/// Per-request inputs for a fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Cookies for the target site. Other domains are filtered out by the
    /// fetcher.
    pub cookies: Vec<Cookie>,
}

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fully rendered HTML for `target`.
    async fn fetch_rendered_html(
        &self,
        target: &str,
        options: &FetchOptions,
    ) -> Result<String, ScrapeError>;
}
