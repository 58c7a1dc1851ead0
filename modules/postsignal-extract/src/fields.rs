// Field parsing for one post card.

use chrono::{DateTime, Utc};
use postsignal_common::{Post, RawBlock};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::blocks::find_blocks;
use crate::counts::normalize_count;
use crate::selectors::PostSelectors;

/// Build a [`Post`] from a post-card element.
///
/// Returns `None` when no post id can be resolved. Every other field is
/// optional and comes back empty or zero when missing.
pub fn parse_block(
    block: ElementRef<'_>,
    selectors: &PostSelectors,
    collected_at: DateTime<Utc>,
) -> Option<Post> {
    let site = &selectors.site;

    let detail_href = first(block, &selectors.detail_link)
        .and_then(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty());

    let Some(id) = detail_href
        .and_then(|href| id_after_urn(href, &site.activity_urn))
        .or_else(|| {
            block
                .value()
                .attr("data-urn")
                .and_then(|urn| id_after_urn(urn, &site.activity_urn))
        })
    else {
        debug!("extract: dropping post card without an activity id");
        return None;
    };

    let url = match detail_href {
        Some(href) => site.absolutize(href, &site.post_path_prefix),
        None => site.post_url(&id),
    };

    let actor = first(block, &selectors.actor_container);
    let actor_text = |sel: &Selector| {
        actor
            .and_then(|a| first(a, sel))
            .map(inline_text)
            .unwrap_or_default()
    };
    let author_profile_url = actor
        .and_then(|a| first(a, &selectors.actor_link))
        .and_then(|a| a.value().attr("href"))
        .map(|href| site.absolutize(href.trim(), &site.profile_path_prefix))
        .unwrap_or_default();

    let content = first(block, &selectors.content)
        .map(block_text)
        .unwrap_or_default();

    let impression_count = first(block, &selectors.impressions)
        .map(|span| inline_text(span).to_lowercase())
        .filter(|text| text.contains(&site.impressions_marker))
        .map(|text| {
            let rest = text.replace(&site.impressions_marker, "");
            normalize_count(rest.split_whitespace().next().unwrap_or(""))
        })
        .unwrap_or(0);

    Some(Post {
        id,
        url,
        author_name: actor_text(&selectors.actor_name),
        author_profile_url,
        author_job_title: actor_text(&selectors.actor_description),
        posted_at: actor_text(&selectors.actor_sub_description),
        content,
        reaction_count: aria_count(block, &selectors.reactions_button),
        comment_count: aria_count(block, &selectors.comments_button),
        impression_count,
        collected_at,
    })
}

/// Parse a post card captured as outer HTML.
pub fn parse_raw_block(
    raw: &RawBlock,
    selectors: &PostSelectors,
    collected_at: DateTime<Utc>,
) -> Option<Post> {
    let fragment = Html::parse_fragment(raw.as_str());
    let block = find_blocks(&fragment, selectors).next()?;
    parse_block(block, selectors, collected_at)
}

fn first<'a>(el: ElementRef<'a>, sel: &Selector) -> Option<ElementRef<'a>> {
    el.select(sel).next()
}

/// Text after the last occurrence of `urn` with slashes removed and any query
/// string or fragment cut off.
fn id_after_urn(s: &str, urn: &str) -> Option<String> {
    let (_, tail) = s.rsplit_once(urn)?;
    let tail = tail.split(['?', '#', '&', '"']).next().unwrap_or("");
    let id: String = tail.chars().filter(|c| *c != '/').collect();
    let id = id.trim();
    (!id.is_empty()).then(|| id.to_string())
}

/// Leading token of a button's `aria-label` ("1.2K reactions" -> 1200).
fn aria_count(block: ElementRef<'_>, sel: &Selector) -> u64 {
    first(block, sel)
        .and_then(|button| button.value().attr("aria-label"))
        .and_then(|label| label.split_whitespace().next())
        .map(normalize_count)
        .unwrap_or(0)
}

/// Single-line text with whitespace runs collapsed.
fn inline_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Multi-line text: markup stripped, each line trimmed and collapsed, blank
/// lines dropped.
fn block_text(el: ElementRef<'_>) -> String {
    let raw: String = el.text().collect();
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
