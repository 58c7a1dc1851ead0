use async_trait::async_trait;
use chrono::Utc;
use postsignal_common::{
    Config, Cookie, Post, ScrapeError, ScrapeSettings, ScrapeStrategy, SiteProfile,
};
use postsignal_extract::{extract_snapshot, PostSelectors};
use tracing::info;

use crate::collector::{CollectLimits, Collector, StopReason};
use crate::fetchers::{ContentFetcher, FetchOptions, InteractiveFetcher, SnapshotFetcher};

/// One scrape request.
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    pub profile_url: String,
    pub max_posts: usize,
    pub cookies: Vec<Cookie>,
    pub strategy: ScrapeStrategy,
}

#[derive(Debug, Clone)]
pub struct ScrapeReport {
    pub profile_url: String,
    pub strategy: ScrapeStrategy,
    pub posts: Vec<Post>,
    /// Only set for interactive runs.
    pub stop_reason: Option<StopReason>,
}

#[async_trait]
pub trait PostScraper: Send + Sync {
    async fn scrape(&self, job: ScrapeJob) -> Result<ScrapeReport, ScrapeError>;
}

/// Scraper backed by Browserless, holding only immutable configuration. Each
/// call opens its own remote session.
pub struct Scraper {
    snapshot: SnapshotFetcher,
    interactive: InteractiveFetcher,
    selectors: PostSelectors,
    settings: ScrapeSettings,
}

impl Scraper {
    pub fn new(config: &Config, settings: ScrapeSettings) -> Result<Self, ScrapeError> {
        Self::for_site(config, SiteProfile::default(), settings)
    }

    pub fn for_site(
        config: &Config,
        site: SiteProfile,
        settings: ScrapeSettings,
    ) -> Result<Self, ScrapeError> {
        let selectors = PostSelectors::new(site.clone())
            .map_err(|e| ScrapeError::Configuration(e.to_string()))?;
        Ok(Self {
            snapshot: SnapshotFetcher::new(config, site.clone(), settings.clone())?,
            interactive: InteractiveFetcher::new(config, site, settings.clone())?,
            selectors,
            settings,
        })
    }

    async fn scrape_snapshot(&self, job: &ScrapeJob) -> Result<Vec<Post>, ScrapeError> {
        let options = FetchOptions {
            cookies: job.cookies.clone(),
        };
        let html = self
            .snapshot
            .fetch_rendered_html(&job.profile_url, &options)
            .await?;
        let mut posts = extract_snapshot(&html, &self.selectors, Utc::now());
        posts.truncate(job.max_posts);
        Ok(posts)
    }

    async fn scrape_interactive(
        &self,
        job: &ScrapeJob,
    ) -> Result<(Vec<Post>, StopReason), ScrapeError> {
        let mut session = self
            .interactive
            .open_session(&job.profile_url, &job.cookies)
            .await?;

        let collector = Collector::new(CollectLimits::from_settings(job.max_posts, &self.settings));
        let outcome = collector.run(&mut session, &self.selectors).await;
        session.close().await;

        let outcome = outcome?;
        Ok((outcome.posts, outcome.stop_reason))
    }
}

#[async_trait]
impl PostScraper for Scraper {
    async fn scrape(&self, job: ScrapeJob) -> Result<ScrapeReport, ScrapeError> {
        if job.profile_url.trim().is_empty() {
            return Err(ScrapeError::Configuration("profile URL is required".into()));
        }

        info!(
            url = %job.profile_url,
            strategy = %job.strategy,
            max_posts = job.max_posts,
            cookies = job.cookies.len(),
            "Starting scrape"
        );

        let (posts, stop_reason) = match job.strategy {
            ScrapeStrategy::Snapshot => (self.scrape_snapshot(&job).await?, None),
            ScrapeStrategy::Interactive => {
                let (posts, reason) = self.scrape_interactive(&job).await?;
                (posts, Some(reason))
            }
        };

        info!(url = %job.profile_url, posts = posts.len(), "Scrape complete");
        Ok(ScrapeReport {
            profile_url: job.profile_url,
            strategy: job.strategy,
            posts,
            stop_reason,
        })
    }
}
