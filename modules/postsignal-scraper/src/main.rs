use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use postsignal_common::{Config, ScrapeSettings, ScrapeStrategy};
use postsignal_extract::load_cookie_file;
use postsignal_scraper::{write_posts, PostScraper, ScrapeJob, Scraper};

#[derive(Parser)]
#[command(name = "scrape", about = "Scrape recent posts from a profile's activity feed")]
struct Cli {
    /// Profile activity URL, e.g. https://www.linkedin.com/in/someone/recent-activity/all/
    #[arg(long)]
    profile_url: String,

    /// Number of posts to collect
    #[arg(long, default_value_t = 5)]
    num_posts: usize,

    /// Netscape-format cookie file (defaults to COOKIES_FILE or ./cookies.txt)
    #[arg(long)]
    cookies_file: Option<PathBuf>,

    /// Output JSON path (defaults to OUTPUT_PATH or posts.json)
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, default_value = "interactive")]
    strategy: ScrapeStrategy,

    #[arg(long)]
    max_scroll_attempts: Option<u32>,

    /// Consecutive scrolls without new posts before giving up
    #[arg(long)]
    max_no_new_posts: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("postsignal=info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let mut settings = ScrapeSettings::default();
    if let Some(n) = cli.max_scroll_attempts {
        settings.max_scroll_attempts = n;
    }
    if let Some(n) = cli.max_no_new_posts {
        settings.max_no_new_posts_in_a_row = n;
    }

    let cookies_file = cli.cookies_file.unwrap_or_else(|| config.cookies_file.clone());
    let cookies = load_cookie_file(&cookies_file)
        .with_context(|| format!("Failed to read cookies from {}", cookies_file.display()))?;
    if cookies.is_empty() {
        warn!(
            path = %cookies_file.display(),
            "Cookie file has no cookies, continuing unauthenticated"
        );
    }

    let scraper = Scraper::new(&config, settings)?;
    let report = scraper
        .scrape(ScrapeJob {
            profile_url: cli.profile_url,
            max_posts: cli.num_posts,
            cookies,
            strategy: cli.strategy,
        })
        .await?;

    let output = cli.output.unwrap_or_else(|| config.output_path.clone());
    write_posts(&output, &report.posts)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        profile = %report.profile_url,
        strategy = %report.strategy,
        posts = report.posts.len(),
        stop_reason = ?report.stop_reason,
        output = %output.display(),
        "Scraping complete"
    );
    for (i, post) in report.posts.iter().enumerate() {
        info!(
            n = i + 1,
            id = %post.id,
            reactions = post.reaction_count,
            comments = post.comment_count,
            "{}",
            post.content_preview()
        );
    }

    Ok(())
}
