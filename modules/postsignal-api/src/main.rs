use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use postsignal_common::{Config, ScrapeSettings, SiteProfile};
use postsignal_scraper::Scraper;

mod routes;

use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("postsignal=info".parse()?))
        .init();

    let config = Config::from_env()?;
    let site = SiteProfile::default();
    let scraper = Scraper::for_site(&config, site.clone(), ScrapeSettings::default())?;

    let state = Arc::new(AppState {
        scraper: Arc::new(scraper),
        site,
    });

    let app = routes::router(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Method and path only; request bodies carry cookies.
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("postsignal API listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
