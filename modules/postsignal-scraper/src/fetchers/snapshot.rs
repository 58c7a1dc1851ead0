use async_trait::async_trait;
use browserless_client::{
    BrowserCookie, BrowserlessClient, ContentRequest, GotoOptions, WaitForSelector, WaitUntil,
};
use postsignal_common::{Config, ScrapeError, ScrapeSettings, SiteProfile};
use postsignal_extract::cookies_for_site;
use tracing::info;

use super::{ContentFetcher, FetchOptions};

/// One-shot render through Browserless `/content`.
pub struct SnapshotFetcher {
    client: BrowserlessClient,
    site: SiteProfile,
    settings: ScrapeSettings,
}

impl SnapshotFetcher {
    pub fn new(
        config: &Config,
        site: SiteProfile,
        settings: ScrapeSettings,
    ) -> Result<Self, ScrapeError> {
        let client = BrowserlessClient::with_timeout(
            &config.browserless_url,
            Some(&config.browserless_token),
            settings.request_timeout,
        )?;
        Ok(Self::with_client(client, site, settings))
    }

    pub fn with_client(
        client: BrowserlessClient,
        site: SiteProfile,
        settings: ScrapeSettings,
    ) -> Self {
        Self {
            client,
            site,
            settings,
        }
    }

    /// Request body for `target`: wait for network idle and the first post card.
    pub fn build_request(&self, target: &str, options: &FetchOptions) -> ContentRequest {
        let cookies: Vec<BrowserCookie> = cookies_for_site(&options.cookies, &self.site)
            .into_iter()
            .map(BrowserCookie::from)
            .collect();

        ContentRequest::builder()
            .url(target)
            .cookies(cookies)
            .goto_options(GotoOptions {
                wait_until: WaitUntil::NetworkIdle2,
                timeout: Some(self.settings.request_timeout.as_millis() as u64),
            })
            .wait_for_selector(WaitForSelector {
                selector: format!(".{}", self.site.post_class),
                timeout: self.settings.selector_timeout.as_millis() as u64,
            })
            .user_agent(self.settings.user_agent.clone())
            .set_java_script_enabled(true)
            .build()
    }
}

#[async_trait]
impl ContentFetcher for SnapshotFetcher {
    async fn fetch_rendered_html(
        &self,
        target: &str,
        options: &FetchOptions,
    ) -> Result<String, ScrapeError> {
        let request = self.build_request(target, options);
        info!(
            url = target,
            cookies = request.cookies.len(),
            "Requesting snapshot from Browserless"
        );
        let html = self.client.content(&request).await?;
        info!(url = target, bytes = html.len(), "Snapshot received");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postsignal_common::Cookie;

    fn fetcher() -> SnapshotFetcher {
        let client =
            BrowserlessClient::new("https://production-sfo.browserless.io", Some("tok")).unwrap();
        SnapshotFetcher::with_client(client, SiteProfile::default(), ScrapeSettings::default())
    }

    fn cookie(name: &str, domain: &str) -> Cookie {
        Cookie {
            name: name.into(),
            value: "v".into(),
            domain: domain.into(),
            path: "/".into(),
            secure: true,
            http_only: false,
            expires: None,
        }
    }

    #[test]
    fn request_waits_for_post_cards_with_site_cookies_only() {
        let options = FetchOptions {
            cookies: vec![cookie("li_at", ".linkedin.com"), cookie("other", ".example.com")],
        };
        let target = "https://www.linkedin.com/in/jane/recent-activity/all/";
        let body = serde_json::to_value(fetcher().build_request(target, &options)).unwrap();

        assert_eq!(body["gotoOptions"]["waitUntil"], "networkidle2");
        assert_eq!(body["waitForSelector"]["selector"], ".feed-shared-update-v2");
        assert_eq!(body["waitForSelector"]["timeout"], 5000);
        assert_eq!(body["setJavaScriptEnabled"], true);
        assert_eq!(body["cookies"].as_array().unwrap().len(), 1);
        assert_eq!(body["cookies"][0]["name"], "li_at");
    }
}
