// Regex extraction over raw markup.
//
// Best-effort only: used when the structural pass over a parsed document finds
// no usable post cards but the raw text scan still sees marker-class blocks
// (markup drift, truncated snapshots). Counts and timestamps are guessed from
// the visible text, so expect misses and false positives.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use postsignal_common::Post;
use regex::Regex;

use crate::blocks::scan_blocks;
use crate::counts::normalize_count;
use crate::selectors::PostSelectors;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+\s*(?:second|minute|hour|day|week|month|year)s?\s+ago|\d+(?:mo|[smhdwy]))\b")
        .expect("valid regex")
});
static REACTIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d.,]*[km]?)\s*(?:reaction|like)").expect("valid regex")
});
static COMMENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d[\d.,]*[km]?)\s*comment").expect("valid regex"));

/// Posts guessed from raw HTML. Blocks without an activity id are dropped and
/// duplicate ids keep their first occurrence.
pub fn heuristic_posts(
    html: &str,
    selectors: &PostSelectors,
    collected_at: DateTime<Utc>,
) -> Vec<Post> {
    let site = &selectors.site;
    let mut seen = std::collections::HashSet::new();

    scan_blocks(html, &site.post_class)
        .filter_map(|block| {
            let id = selectors.activity_id.captures(block)?[1].to_string();
            if !seen.insert(id.clone()) {
                return None;
            }
            let text = strip_tags(block);
            Some(Post {
                url: site.post_url(&id),
                id,
                author_name: String::new(),
                author_profile_url: String::new(),
                author_job_title: String::new(),
                posted_at: first_capture(&TIME_RE, &text).unwrap_or_default(),
                reaction_count: first_capture(&REACTIONS_RE, &text)
                    .map(|c| normalize_count(&c))
                    .unwrap_or(0),
                comment_count: first_capture(&COMMENTS_RE, &text)
                    .map(|c| normalize_count(&c))
                    .unwrap_or(0),
                impression_count: 0,
                content: text,
                collected_at,
            })
        })
        .collect()
}

/// Markup removed and whitespace collapsed. Entities are left as-is.
pub fn strip_tags(html: &str) -> String {
    TAG_RE
        .replace_all(html, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|c| c[1].to_string())
}
