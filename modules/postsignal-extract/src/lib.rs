pub mod blocks;
pub mod cookies;
pub mod counts;
pub mod error;
pub mod fallback;
pub mod fields;
pub mod selectors;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use postsignal_common::Post;
use scraper::Html;
use tracing::{debug, info, warn};

pub use blocks::{find_blocks, scan_blocks};
pub use cookies::{cookies_for_site, load_cookie_file, parse_cookie_string, parse_netscape};
pub use counts::normalize_count;
pub use error::{ExtractError, Result};
pub use fields::{parse_block, parse_raw_block};
pub use selectors::PostSelectors;

/// Every post card in a rendered page, in document order, first occurrence of
/// each id kept.
pub fn extract_posts(
    html: &str,
    selectors: &PostSelectors,
    collected_at: DateTime<Utc>,
) -> Vec<Post> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut posts = Vec::new();

    for block in find_blocks(&doc, selectors) {
        let Some(post) = parse_block(block, selectors, collected_at) else {
            continue;
        };
        if seen.insert(post.id.clone()) {
            posts.push(post);
        } else {
            debug!(id = %post.id, "extract: duplicate post card skipped");
        }
    }

    posts
}

/// Structural extraction, falling back to regex guessing when no card parses
/// but raw post blocks are present.
pub fn extract_snapshot(
    html: &str,
    selectors: &PostSelectors,
    collected_at: DateTime<Utc>,
) -> Vec<Post> {
    let posts = extract_posts(html, selectors, collected_at);
    if !posts.is_empty() {
        info!(count = posts.len(), "Extracted posts from snapshot");
        return posts;
    }

    let raw_blocks = scan_blocks(html, &selectors.site.post_class).count();
    if raw_blocks == 0 {
        info!("No post cards found in snapshot");
        return posts;
    }

    let guessed = fallback::heuristic_posts(html, selectors, collected_at);
    warn!(
        raw_blocks,
        count = guessed.len(),
        "Structural extraction found nothing, using regex fallback"
    );
    guessed
}
