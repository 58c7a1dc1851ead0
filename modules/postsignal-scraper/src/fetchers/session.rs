use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use browserless_client::BrowserlessClient;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    CookieParam, Headers, SetExtraHttpHeadersParams, TimeSinceEpoch,
};
use chromiumoxide::{Browser, Handler, Page};
use futures::StreamExt;
use postsignal_common::{Config, Cookie, RawBlock, ScrapeError, ScrapeSettings, SiteProfile};
use postsignal_extract::cookies_for_site;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ContentFetcher, FetchOptions};
use crate::collector::FeedSession;

const LOGIN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A remote Chrome page driven over the Browserless CDP endpoint.
///
/// One session belongs to one scrape run. Call [`BrowserSession::close`] when
/// done; dropping the session only stops the CDP event loop.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    site: SiteProfile,
    settings: ScrapeSettings,
}

impl BrowserSession {
    /// Connect to `ws_url` and open a blank page with viewport, user agent and
    /// headers applied.
    pub async fn connect(
        ws_url: &str,
        site: SiteProfile,
        settings: ScrapeSettings,
    ) -> Result<Self, ScrapeError> {
        info!("Connecting to remote browser");
        let (mut browser, handler) =
            tokio::time::timeout(settings.navigation_timeout, Browser::connect(ws_url))
                .await
                .map_err(|_| ScrapeError::Browser("timed out connecting to browser".into()))?
                .map_err(|e| ScrapeError::Browser(format!("connect failed: {e}")))?;
        let handler = spawn_handler(handler);

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                if let Err(close_err) = browser.close().await {
                    debug!(error = %close_err, "browser close failed");
                }
                return Err(ScrapeError::Browser(format!("new page failed: {e}")));
            }
        };

        let session = Self {
            browser,
            page,
            handler,
            site,
            settings,
        };
        if let Err(e) = session.configure_page().await {
            session.close().await;
            return Err(e);
        }
        info!("Connected to remote browser");
        Ok(session)
    }

    async fn configure_page(&self) -> Result<(), ScrapeError> {
        let (width, height) = self.settings.viewport;
        self.page
            .execute(SetDeviceMetricsOverrideParams::new(
                width as i64,
                height as i64,
                1.0,
                false,
            ))
            .await
            .map_err(browser_err("set viewport"))?;

        self.page
            .set_user_agent(self.settings.user_agent.as_str())
            .await
            .map_err(browser_err("set user agent"))?;

        let headers = Headers::new(serde_json::json!({
            "Accept-Language": self.settings.accept_language,
            "Accept": "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        }));
        self.page
            .execute(SetExtraHttpHeadersParams::new(headers))
            .await
            .map_err(browser_err("set headers"))?;
        Ok(())
    }

    /// Authenticate with `cookies` and land on `target`, ready for scrolling.
    ///
    /// Fails with `Authentication` when the site bounces to its login wall and
    /// with `UnexpectedPage` when a profile target lands somewhere else. A
    /// missing logged-in marker is only logged.
    pub async fn open(&self, target: &str, cookies: &[Cookie]) -> Result<(), ScrapeError> {
        info!(url = %self.site.base_url, "Loading site home");
        self.goto(&self.site.base_url).await?;
        tokio::time::sleep(self.settings.settle_pause).await;

        let site_cookies = cookies_for_site(cookies, &self.site);
        info!(count = site_cookies.len(), "Setting site cookies");
        let (set, failed) = self.set_cookies(&site_cookies).await;
        info!(set, failed, "Cookies applied");
        tokio::time::sleep(self.settings.cookie_pause).await;

        let current = navigate_with_retry(
            self.settings.navigation_attempts,
            self.settings.navigation_backoff,
            |_| self.navigate_once(target),
        )
        .await?;

        let marker = &self.site.profile_url_marker;
        if target.contains(marker.as_str()) && !current.contains(marker.as_str()) {
            return Err(ScrapeError::UnexpectedPage { url: current });
        }

        if self
            .wait_for_any(&self.site.logged_in_selectors, self.settings.login_check_timeout)
            .await
        {
            info!("Logged in and on target page");
        } else {
            warn!("Could not find logged-in page markers, continuing anyway");
        }

        info!(pause = ?self.settings.initial_load_pause, "Waiting for posts to load");
        tokio::time::sleep(self.settings.initial_load_pause).await;
        Ok(())
    }

    /// Set each cookie on its own so one rejected cookie does not sink the
    /// rest. Returns `(set, failed)`.
    pub async fn set_cookies(&self, cookies: &[&Cookie]) -> (usize, usize) {
        let mut set = 0;
        let mut failed = 0;
        for cookie in cookies {
            let result = match cookie_param(cookie) {
                Ok(param) => self.page.set_cookie(param).await.map(|_| ()).map_err(|e| e.to_string()),
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => set += 1,
                Err(e) => {
                    failed += 1;
                    warn!(name = %cookie.name, error = %e, "Failed to set cookie");
                }
            }
        }
        (set, failed)
    }

    async fn goto(&self, url: &str) -> Result<(), ScrapeError> {
        match tokio::time::timeout(self.settings.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ScrapeError::TransientNavigation(e.to_string())),
            Err(_) => Err(ScrapeError::TransientNavigation(format!(
                "navigation to {url} timed out after {:?}",
                self.settings.navigation_timeout
            ))),
        }
    }

    async fn navigate_once(&self, url: &str) -> Result<String, ScrapeError> {
        self.goto(url).await?;
        tokio::time::sleep(self.settings.post_navigation_pause).await;

        let current = self.current_url().await?;
        if self.site.is_auth_wall(&current) {
            return Err(ScrapeError::Authentication { url: current });
        }
        Ok(current)
    }

    pub async fn current_url(&self) -> Result<String, ScrapeError> {
        Ok(self
            .page
            .url()
            .await
            .map_err(browser_err("read url"))?
            .unwrap_or_default())
    }

    /// Poll until any selector matches or `timeout` runs out.
    async fn wait_for_any(&self, selectors: &[String], timeout: Duration) -> bool {
        let Some(script) = any_selector_script(selectors) else {
            return false;
        };
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match self.page.evaluate(script.as_str()).await {
                Ok(result) => {
                    if result.into_value::<bool>().unwrap_or(false) {
                        return true;
                    }
                }
                Err(e) => debug!(error = %e, "login marker check failed"),
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(LOGIN_POLL_INTERVAL).await;
        }
    }

    /// Full page markup as currently rendered.
    pub async fn html(&self) -> Result<String, ScrapeError> {
        self.page.content().await.map_err(browser_err("read content"))
    }

    /// Close the remote browser and stop the event loop.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!(error = %e, "browser close failed");
        }
        self.handler.abort();
        info!("Browser session closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl FeedSession for BrowserSession {
    async fn visible_blocks(&mut self) -> Result<Vec<RawBlock>, ScrapeError> {
        let selector = serde_json::to_string(&self.site.post_selector())
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;
        // Outermost cards only, so a reshare is not read twice.
        let script = format!(
            "Array.from(document.querySelectorAll({selector}))\
             .filter(el => !el.parentElement || !el.parentElement.closest({selector}))\
             .map(el => el.outerHTML)"
        );
        let blocks: Vec<String> = self
            .page
            .evaluate(script)
            .await
            .map_err(browser_err("read post cards"))?
            .into_value()
            .map_err(|e| ScrapeError::Browser(format!("read post cards: {e}")))?;
        Ok(blocks.into_iter().map(RawBlock).collect())
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), ScrapeError> {
        self.page
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map_err(browser_err("scroll"))?;
        Ok(())
    }
}

/// Opens authenticated [`BrowserSession`]s against Browserless.
pub struct InteractiveFetcher {
    client: BrowserlessClient,
    stealth: bool,
    site: SiteProfile,
    settings: ScrapeSettings,
}

impl InteractiveFetcher {
    pub fn new(
        config: &Config,
        site: SiteProfile,
        settings: ScrapeSettings,
    ) -> Result<Self, ScrapeError> {
        let client = BrowserlessClient::new(
            &config.browserless_url,
            Some(&config.browserless_token),
        )?;
        Ok(Self {
            client,
            stealth: config.browserless_stealth,
            site,
            settings,
        })
    }

    /// Connected session already sitting on `target`. The session is closed
    /// before any error is returned.
    pub async fn open_session(
        &self,
        target: &str,
        cookies: &[Cookie],
    ) -> Result<BrowserSession, ScrapeError> {
        let ws_url = self.client.websocket_endpoint(self.stealth)?;
        let session =
            BrowserSession::connect(&ws_url, self.site.clone(), self.settings.clone()).await?;
        match session.open(target, cookies).await {
            Ok(()) => Ok(session),
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ContentFetcher for InteractiveFetcher {
    async fn fetch_rendered_html(
        &self,
        target: &str,
        options: &FetchOptions,
    ) -> Result<String, ScrapeError> {
        let session = self.open_session(target, &options.cookies).await?;
        let html = session.html().await;
        session.close().await;
        html
    }
}

/// Run `attempt` up to `attempts` times, sleeping `backoff` between tries.
/// Only retryable errors get another try; the last error is returned once the
/// budget is spent.
pub async fn navigate_with_retry<F, Fut>(
    attempts: u32,
    backoff: Duration,
    mut attempt: F,
) -> Result<String, ScrapeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<String, ScrapeError>>,
{
    let attempts = attempts.max(1);
    let mut n = 1;
    loop {
        info!(attempt = n, max = attempts, "Navigating to target");
        match attempt(n).await {
            Ok(url) => {
                info!(url = %url, "Navigation succeeded");
                return Ok(url);
            }
            Err(e) if e.is_retryable() && n < attempts => {
                warn!(attempt = n, error = %e, "Navigation failed, retrying");
                tokio::time::sleep(backoff).await;
                n += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// JS expression that is true once any of `selectors` matches the page.
fn any_selector_script(selectors: &[String]) -> Option<String> {
    if selectors.is_empty() {
        return None;
    }
    let list = serde_json::to_string(selectors).ok()?;
    Some(format!("{list}.some(s => document.querySelector(s) !== null)"))
}

fn cookie_param(cookie: &Cookie) -> Result<CookieParam, String> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone())
        .url(format!("https://{}{}", cookie.host_only_domain(), cookie.path))
        .domain(cookie.domain.clone())
        .path(cookie.path.clone())
        .secure(cookie.secure)
        .http_only(cookie.http_only);
    if let Some(expires) = cookie.expires {
        builder = builder.expires(TimeSinceEpoch::new(expires as f64));
    }
    builder.build()
}

fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!(error = %e, "cdp handler event error");
            }
        }
    })
}

fn browser_err<E: std::fmt::Display>(what: &'static str) -> impl Fn(E) -> ScrapeError {
    move |e| ScrapeError::Browser(format!("{what}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> ScrapeError {
        ScrapeError::TransientNavigation("Navigating frame was detached".into())
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let calls = AtomicU32::new(0);
        let url = navigate_with_retry(3, Duration::ZERO, |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(transient())
                } else {
                    Ok("https://www.linkedin.com/in/jane/".to_string())
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(url, "https://www.linkedin.com/in/jane/");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn auth_wall_is_not_retried() {
        let calls = AtomicU32::new(0);
        let err = navigate_with_retry(3, Duration::ZERO, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ScrapeError::Authentication {
                    url: "https://www.linkedin.com/authwall".into(),
                })
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ScrapeError::Authentication { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_budget_with_last_error() {
        let calls = AtomicU32::new(0);
        let err = navigate_with_retry(3, Duration::ZERO, |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(ScrapeError::TransientNavigation(format!("attempt {n}"))) }
        })
        .await
        .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.to_string(), "Navigation failed: attempt 3");
    }

    #[test]
    fn cookie_param_carries_expiry_and_scope() {
        let cookie = Cookie {
            name: "li_at".into(),
            value: "abc".into(),
            domain: ".linkedin.com".into(),
            path: "/".into(),
            secure: true,
            http_only: true,
            expires: Some(1767225600),
        };
        let param = cookie_param(&cookie).unwrap();
        assert_eq!(param.url.as_deref(), Some("https://linkedin.com/"));
        assert_eq!(param.domain.as_deref(), Some(".linkedin.com"));
        assert_eq!(param.http_only, Some(true));
        assert!(param.expires.is_some());
    }

    #[test]
    fn selector_script_quotes_each_selector() {
        let selectors = vec![
            "img.global-nav__me-photo".to_string(),
            "a[href*=\"/feed/\"]".to_string(),
        ];
        let script = any_selector_script(&selectors).unwrap();
        assert_eq!(
            script,
            r#"["img.global-nav__me-photo","a[href*=\"/feed/\"]"].some(s => document.querySelector(s) !== null)"#
        );
        assert!(any_selector_script(&[]).is_none());
    }
}
