// Scroll-and-collect loop over a live feed.
//
// The collector only sees raw post cards through FeedSession, so it runs the
// same against a remote browser and against a scripted feed in tests.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use postsignal_common::{Post, RawBlock, ScrapeError, ScrapeSettings};
use postsignal_extract::{parse_raw_block, PostSelectors};
use tracing::{debug, info};

/// What the collector needs from a page: the cards on screen and a way to
/// load more.
#[async_trait]
pub trait FeedSession: Send {
    async fn visible_blocks(&mut self) -> Result<Vec<RawBlock>, ScrapeError>;
    async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectLimits {
    pub max_posts: usize,
    pub max_scroll_attempts: u32,
    pub max_no_new_posts_in_a_row: u32,
    pub load_pause: Duration,
}

impl CollectLimits {
    pub fn from_settings(max_posts: usize, settings: &ScrapeSettings) -> Self {
        Self {
            max_posts,
            max_scroll_attempts: settings.max_scroll_attempts,
            max_no_new_posts_in_a_row: settings.max_no_new_posts_in_a_row,
            load_pause: settings.load_pause,
        }
    }
}

impl Default for CollectLimits {
    fn default() -> Self {
        Self::from_settings(5, &ScrapeSettings::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    ScrollBudgetExhausted,
    NoProgress,
}

#[derive(Debug, Clone)]
pub struct CollectOutcome {
    pub posts: Vec<Post>,
    pub scroll_attempts: u32,
    pub passes: u32,
    pub stop_reason: StopReason,
}

pub struct Collector {
    limits: CollectLimits,
}

impl Collector {
    pub fn new(limits: CollectLimits) -> Self {
        Self { limits }
    }

    /// Read, dedupe and scroll until the target count, the scroll budget or
    /// the no-progress budget is reached. Posts keep first-seen order.
    pub async fn run<S: FeedSession + ?Sized>(
        &self,
        session: &mut S,
        selectors: &PostSelectors,
    ) -> Result<CollectOutcome, ScrapeError> {
        let limits = self.limits;
        let mut posts: Vec<Post> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut scroll_attempts = 0u32;
        let mut no_new_in_a_row = 0u32;
        let mut passes = 0u32;

        info!(
            max_posts = limits.max_posts,
            max_scroll_attempts = limits.max_scroll_attempts,
            "Collecting posts"
        );

        while posts.len() < limits.max_posts
            && scroll_attempts < limits.max_scroll_attempts
            && no_new_in_a_row < limits.max_no_new_posts_in_a_row
        {
            passes += 1;
            let blocks = session.visible_blocks().await?;
            let collected_at = Utc::now();
            let before = posts.len();

            for block in &blocks {
                if posts.len() >= limits.max_posts {
                    break;
                }
                let Some(post) = parse_raw_block(block, selectors, collected_at) else {
                    continue;
                };
                if !seen.insert(post.id.clone()) {
                    continue;
                }
                info!(
                    n = posts.len() + 1,
                    id = %post.id,
                    preview = %post.content_preview(),
                    "New post"
                );
                posts.push(post);
            }

            let added = posts.len() - before;
            if added > 0 {
                no_new_in_a_row = 0;
            } else {
                no_new_in_a_row += 1;
                info!(
                    blocks = blocks.len(),
                    streak = no_new_in_a_row,
                    max = limits.max_no_new_posts_in_a_row,
                    "No new posts in this pass"
                );
            }
            debug!(pass = passes, added, total = posts.len(), "pass done");

            if posts.len() < limits.max_posts
                && no_new_in_a_row < limits.max_no_new_posts_in_a_row
            {
                debug!(
                    attempt = scroll_attempts + 1,
                    max = limits.max_scroll_attempts,
                    "Scrolling"
                );
                session.scroll_to_bottom().await?;
                tokio::time::sleep(limits.load_pause).await;
                scroll_attempts += 1;
            }
        }

        let stop_reason = if posts.len() >= limits.max_posts {
            StopReason::TargetReached
        } else if no_new_in_a_row >= limits.max_no_new_posts_in_a_row {
            StopReason::NoProgress
        } else {
            StopReason::ScrollBudgetExhausted
        };

        info!(
            posts = posts.len(),
            scroll_attempts,
            passes,
            reason = ?stop_reason,
            "Collection finished"
        );

        Ok(CollectOutcome {
            posts,
            scroll_attempts,
            passes,
            stop_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postsignal_common::SiteProfile;

    /// Scripted feed: each pass returns the next page of blocks, repeating the
    /// last page once the script runs out.
    struct MockSession {
        pages: Vec<Vec<RawBlock>>,
        cursor: usize,
        scrolls: u32,
    }

    impl MockSession {
        fn new(pages: Vec<Vec<RawBlock>>) -> Self {
            Self {
                pages,
                cursor: 0,
                scrolls: 0,
            }
        }
    }

    #[async_trait]
    impl FeedSession for MockSession {
        async fn visible_blocks(&mut self) -> Result<Vec<RawBlock>, ScrapeError> {
            let idx = self.cursor.min(self.pages.len().saturating_sub(1));
            Ok(self.pages.get(idx).cloned().unwrap_or_default())
        }

        async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError> {
            self.cursor += 1;
            self.scrolls += 1;
            Ok(())
        }
    }

    fn card(id: u64) -> RawBlock {
        RawBlock(format!(
            r#"<div class="feed-shared-update-v2" data-urn="urn:li:activity:{id}">
                 <div class="update-components-text"><span>post {id}</span></div>
               </div>"#
        ))
    }

    fn ad() -> RawBlock {
        RawBlock(r#"<div class="feed-shared-update-v2"><span>promoted</span></div>"#.into())
    }

    fn selectors() -> PostSelectors {
        PostSelectors::new(SiteProfile::default()).unwrap()
    }

    fn limits(max_posts: usize) -> CollectLimits {
        CollectLimits {
            max_posts,
            max_scroll_attempts: 40,
            max_no_new_posts_in_a_row: 3,
            load_pause: Duration::ZERO,
        }
    }

    fn ids(outcome: &CollectOutcome) -> Vec<&str> {
        outcome.posts.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn dedupes_across_passes() {
        let mut session = MockSession::new(vec![
            vec![card(1), card(2)],
            vec![card(1), card(2), card(3)],
            vec![card(2), card(3), card(4), card(5)],
        ]);
        let outcome = Collector::new(limits(5)).run(&mut session, &selectors()).await.unwrap();
        assert_eq!(ids(&outcome), vec!["1", "2", "3", "4", "5"]);
        assert_eq!(outcome.stop_reason, StopReason::TargetReached);
        assert_eq!(outcome.passes, 3);
    }

    #[tokio::test]
    async fn stops_after_no_progress_budget() {
        let mut session = MockSession::new(vec![vec![card(1), card(2)]]);
        let outcome = Collector::new(limits(5)).run(&mut session, &selectors()).await.unwrap();
        assert_eq!(ids(&outcome), vec!["1", "2"]);
        assert_eq!(outcome.stop_reason, StopReason::NoProgress);
        // One productive pass, then three empty ones.
        assert_eq!(outcome.passes, 4);
        // No scroll after the pass that spent the budget.
        assert_eq!(outcome.scroll_attempts, 3);
        assert_eq!(session.scrolls, 3);
    }

    #[tokio::test]
    async fn target_reached_mid_pass_without_scrolling() {
        let mut session = MockSession::new(vec![(1..=8).map(card).collect()]);
        let outcome = Collector::new(limits(5)).run(&mut session, &selectors()).await.unwrap();
        assert_eq!(ids(&outcome), vec!["1", "2", "3", "4", "5"]);
        assert_eq!(outcome.stop_reason, StopReason::TargetReached);
        assert_eq!(outcome.scroll_attempts, 0);
    }

    #[tokio::test]
    async fn blocks_without_id_count_as_no_progress() {
        let mut session = MockSession::new(vec![vec![ad(), ad()]]);
        let outcome = Collector::new(limits(5)).run(&mut session, &selectors()).await.unwrap();
        assert!(outcome.posts.is_empty());
        assert_eq!(outcome.stop_reason, StopReason::NoProgress);
        assert_eq!(outcome.passes, 3);
    }

    #[tokio::test]
    async fn scroll_budget_exhausted() {
        // A new post on every pass, but never enough of them.
        let pages = (1..=10).map(|i| vec![card(i)]).collect();
        let mut session = MockSession::new(pages);
        let tight = CollectLimits {
            max_scroll_attempts: 4,
            ..limits(50)
        };
        let outcome = Collector::new(tight).run(&mut session, &selectors()).await.unwrap();
        assert_eq!(outcome.stop_reason, StopReason::ScrollBudgetExhausted);
        assert_eq!(outcome.scroll_attempts, 4);
        assert_eq!(ids(&outcome), vec!["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn zero_target_does_nothing() {
        let mut session = MockSession::new(vec![vec![card(1)]]);
        let outcome = Collector::new(limits(0)).run(&mut session, &selectors()).await.unwrap();
        assert!(outcome.posts.is_empty());
        assert_eq!(outcome.passes, 0);
        assert_eq!(outcome.stop_reason, StopReason::TargetReached);
    }
}
