pub mod collector;
pub mod fetchers;
pub mod output;
pub mod scraper;

pub use collector::{CollectLimits, CollectOutcome, Collector, FeedSession, StopReason};
pub use fetchers::{ContentFetcher, FetchOptions};
pub use output::write_posts;
pub use scraper::{PostScraper, ScrapeJob, ScrapeReport, Scraper};
