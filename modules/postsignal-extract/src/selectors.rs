use postsignal_common::SiteProfile;
use regex::Regex;
use scraper::Selector;

use crate::error::{ExtractError, Result};

/// Compiled structural queries for one [`SiteProfile`].
#[derive(Debug, Clone)]
pub struct PostSelectors {
    pub site: SiteProfile,
    pub post: Selector,
    pub detail_link: Selector,
    pub actor_container: Selector,
    pub actor_name: Selector,
    pub actor_link: Selector,
    pub actor_description: Selector,
    pub actor_sub_description: Selector,
    pub content: Selector,
    pub reactions_button: Selector,
    pub comments_button: Selector,
    pub impressions: Selector,
    /// `<activity urn><digits>` anywhere in raw markup, for the regex fallback.
    pub activity_id: Regex,
}

impl PostSelectors {
    pub fn new(site: SiteProfile) -> Result<Self> {
        let counts = format!("div.{}", site.social_counts_class);
        Ok(Self {
            post: parse(&site.post_selector())?,
            detail_link: parse(&format!("a.{}", site.detail_link_class))?,
            actor_container: parse(&format!("div.{}", site.actor_container_class))?,
            actor_name: parse(&format!(r#"span.{} span[dir="ltr"]"#, site.actor_title_class))?,
            actor_link: parse(&format!("a.{}", site.actor_link_class))?,
            actor_description: parse(&format!("span.{}", site.actor_description_class))?,
            actor_sub_description: parse(&format!("span.{}", site.actor_sub_description_class))?,
            content: parse(&format!("div.{}", site.content_class))?,
            reactions_button: parse(&format!("{counts} li.{} button", site.reactions_item_class))?,
            comments_button: parse(&format!("{counts} li.{} button", site.comments_item_class))?,
            impressions: parse(&format!("span.{}", site.impressions_class))?,
            activity_id: Regex::new(&format!(r"{}(\d+)", regex::escape(&site.activity_urn)))
                .map_err(|e| ExtractError::InvalidPattern(e.to_string()))?,
            site,
        })
    }
}

fn parse(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_compiles() {
        assert!(PostSelectors::new(SiteProfile::default()).is_ok());
    }

    #[test]
    fn broken_class_is_reported() {
        let site = SiteProfile {
            post_class: "[oops".to_string(),
            ..SiteProfile::default()
        };
        assert!(matches!(
            PostSelectors::new(site),
            Err(ExtractError::InvalidSelector { .. })
        ));
    }
}
