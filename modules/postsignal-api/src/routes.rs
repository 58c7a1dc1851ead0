use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use postsignal_common::{Cookie, ScrapeError, ScrapeStrategy, SiteProfile};
use postsignal_extract::parse_cookie_string;
use postsignal_scraper::{PostScraper, ScrapeJob};

pub struct AppState {
    pub scraper: Arc<dyn PostScraper>,
    pub site: SiteProfile,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/scrape-posts", post(scrape_posts))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    #[serde(default)]
    profile_url: Option<String>,
    #[serde(default = "default_number_of_posts")]
    number_of_posts: usize,
    #[serde(default)]
    cookies: Option<CookieInput>,
    #[serde(default)]
    strategy: ScrapeStrategy,
}

fn default_number_of_posts() -> usize {
    5
}

/// Cookies arrive either as a `Cookie:` header string or as exported cookie
/// objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum CookieInput {
    Header(String),
    List(Vec<CookieObject>),
}

/// Exported cookie with everything but name and value optional.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CookieObject {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    secure: Option<bool>,
    http_only: Option<bool>,
    #[serde(alias = "expirationDate", alias = "expiry")]
    expires: Option<f64>,
}

impl CookieInput {
    fn into_cookies(self, site: &SiteProfile) -> Vec<Cookie> {
        match self {
            CookieInput::Header(raw) => parse_cookie_string(&raw, site),
            CookieInput::List(list) => list
                .into_iter()
                .map(|c| Cookie {
                    name: c.name,
                    value: c.value,
                    domain: c.domain.unwrap_or_else(|| site.cookie_domain.clone()),
                    path: c.path.unwrap_or_else(|| "/".to_string()),
                    secure: c.secure.unwrap_or(true),
                    http_only: c.http_only.unwrap_or(false),
                    expires: c.expires.filter(|e| *e > 0.0).map(|e| e as i64),
                })
                .collect(),
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok", "service": "postsignal"}))
}

async fn scrape_posts(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScrapeRequest>,
) -> Response {
    let Some(profile_url) = body
        .profile_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "profileUrl is required"})),
        )
            .into_response();
    };

    let cookies = body
        .cookies
        .map(|c| c.into_cookies(&state.site))
        .unwrap_or_default();

    info!(
        profile = %profile_url,
        posts = body.number_of_posts,
        strategy = %body.strategy,
        cookies = cookies.len(),
        "Received scrape request"
    );

    let job = ScrapeJob {
        profile_url,
        max_posts: body.number_of_posts,
        cookies,
        strategy: body.strategy,
    };

    match state.scraper.scrape(job).await {
        Ok(report) => Json(json!({
            "success": true,
            "profileUrl": report.profile_url,
            "postsScraped": report.posts.len(),
            "posts": report.posts,
        }))
        .into_response(),
        Err(err) => error_response(&err),
    }
}

fn error_status(err: &ScrapeError) -> StatusCode {
    match err {
        ScrapeError::Authentication { .. } => StatusCode::UNAUTHORIZED,
        ScrapeError::SelectorTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        ScrapeError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &ScrapeError) -> Response {
    let status = error_status(err);
    warn!(status = status.as_u16(), error = %err, "Scrape failed");

    let mut body = json!({"success": false, "error": err.to_string()});
    if let Some(details) = err.details() {
        body["details"] = details.clone();
    }
    (status, Json(body)).into_response()
}
