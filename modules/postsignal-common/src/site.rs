/// Markup and URL conventions of the feed being scraped.
///
/// Everything site-specific lives here so the extraction code can be pointed
/// at any feed built from repeating post cards. `Default` is LinkedIn's
/// recent-activity feed.
#[derive(Debug, Clone)]
pub struct SiteProfile {
    /// Absolute origin used to resolve relative links, e.g. `https://www.linkedin.com`.
    pub base_url: String,
    /// Domain attached to cookies parsed from a header string.
    pub cookie_domain: String,
    /// Class present on every post card container.
    pub post_class: String,
    /// Link from a card to the post detail page.
    pub detail_link_class: String,
    /// Token preceding the post id in detail links and `data-urn`.
    pub activity_urn: String,
    /// Relative prefix of post detail pages.
    pub post_path_prefix: String,
    /// Relative prefix of member profile pages.
    pub profile_path_prefix: String,
    /// Substring identifying a profile page in the browser's current URL.
    pub profile_url_marker: String,
    /// Substrings of a URL that mean we were bounced to a login wall.
    pub auth_wall_markers: Vec<String>,
    /// Any of these appearing means the session is logged in.
    pub logged_in_selectors: Vec<String>,
    pub actor_container_class: String,
    pub actor_title_class: String,
    pub actor_link_class: String,
    pub actor_description_class: String,
    pub actor_sub_description_class: String,
    pub content_class: String,
    pub social_counts_class: String,
    pub reactions_item_class: String,
    pub comments_item_class: String,
    pub impressions_class: String,
    /// Text marker inside the impressions element.
    pub impressions_marker: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            base_url: "https://www.linkedin.com".to_string(),
            cookie_domain: ".linkedin.com".to_string(),
            post_class: "feed-shared-update-v2".to_string(),
            detail_link_class: "update-components-mini-update-v2__link-to-details-page"
                .to_string(),
            activity_urn: "urn:li:activity:".to_string(),
            post_path_prefix: "/feed/update/".to_string(),
            profile_path_prefix: "/in/".to_string(),
            profile_url_marker: "linkedin.com/in/".to_string(),
            auth_wall_markers: vec![
                "/login".to_string(),
                "/uas/login".to_string(),
                "authwall".to_string(),
            ],
            logged_in_selectors: vec![
                "#global-nav".to_string(),
                r#"nav[aria-label="Primary Navigation"]"#.to_string(),
                ".global-nav".to_string(),
                "div.feed-shared-update-v2".to_string(),
            ],
            actor_container_class: "update-components-actor__container".to_string(),
            actor_title_class: "update-components-actor__title".to_string(),
            actor_link_class: "update-components-actor__meta-link".to_string(),
            actor_description_class: "update-components-actor__description".to_string(),
            actor_sub_description_class: "update-components-actor__sub-description".to_string(),
            content_class: "update-components-text".to_string(),
            social_counts_class: "social-details-social-counts".to_string(),
            reactions_item_class: "social-details-social-counts__reactions".to_string(),
            comments_item_class: "social-details-social-counts__comments".to_string(),
            impressions_class: "analytics-entry-point".to_string(),
            impressions_marker: "impressions".to_string(),
        }
    }
}

impl SiteProfile {
    /// True when `url` is a login / authwall interstitial.
    pub fn is_auth_wall(&self, url: &str) -> bool {
        self.auth_wall_markers.iter().any(|m| url.contains(m.as_str()))
    }

    /// Registrable part of the cookie domain (`.linkedin.com` -> `linkedin.com`).
    pub fn cookie_host(&self) -> &str {
        self.cookie_domain
            .strip_prefix('.')
            .unwrap_or(&self.cookie_domain)
    }

    /// Resolve a link against `base_url` when it starts with `prefix`.
    pub fn absolutize(&self, href: &str, prefix: &str) -> String {
        if href.starts_with(prefix) {
            format!("{}{}", self.base_url.trim_end_matches('/'), href)
        } else {
            href.to_string()
        }
    }

    /// Canonical permalink for an activity id.
    pub fn post_url(&self, id: &str) -> String {
        format!(
            "{}{}{}{}/",
            self.base_url.trim_end_matches('/'),
            self.post_path_prefix,
            self.activity_urn,
            id
        )
    }

    /// CSS selector for the post card container.
    pub fn post_selector(&self) -> String {
        format!("div.{}", self.post_class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_wall_detection() {
        let site = SiteProfile::default();
        assert!(site.is_auth_wall("https://www.linkedin.com/authwall?trk=x"));
        assert!(site.is_auth_wall("https://www.linkedin.com/uas/login?session_redirect=1"));
        assert!(!site.is_auth_wall("https://www.linkedin.com/in/someone/recent-activity/all/"));
    }

    #[test]
    fn absolutize_only_known_prefix() {
        let site = SiteProfile::default();
        assert_eq!(
            site.absolutize("/in/jane-doe", &site.profile_path_prefix),
            "https://www.linkedin.com/in/jane-doe"
        );
        assert_eq!(
            site.absolutize("https://elsewhere.com/in/x", &site.profile_path_prefix),
            "https://elsewhere.com/in/x"
        );
    }

    #[test]
    fn cookie_host_has_no_dot() {
        assert_eq!(SiteProfile::default().cookie_host(), "linkedin.com");
    }
}
