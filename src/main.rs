use anyhow::{Context, Result};
use std::sync::Arc;

use udo_session::auth::{
    AuthRedirects, ConsumedCodes, RouteGuard, SessionBootstrapper, TokenStore,
};
use udo_session::config::{Command, Config};
use udo_session::http_client::ApiClient;
use udo_session::page::{HeadlessPage, Navigator, PageOrigin};
use udo_session::resolver::BaseUrlResolver;
use udo_session::storage::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!(command = ?config.command, page_url = %config.page_url, "Starting");

    let storage = Arc::new(
        SqliteStore::open(&config.session_db).context("Failed to open session store")?,
    );
    let tokens = Arc::new(TokenStore::load(storage.clone()).context("Failed to read session store")?);

    let page = Arc::new(HeadlessPage::new(config.page_url.clone()));
    let origin = PageOrigin::of(&config.page_url);
    let base = BaseUrlResolver::new(config.internal_hosts.clone()).resolve(config.api_base.as_deref());
    tracing::info!(api_base = ?base, origin = %origin, "API base resolved");

    let redirects = AuthRedirects::new(&base, &origin, &config.client_id)?;

    match config.command {
        Command::Bootstrap => {
            let client = Arc::new(ApiClient::new(
                base,
                origin,
                tokens,
                config.http_connect_timeout,
                config.http_request_timeout,
            )?);
            let bootstrapper = SessionBootstrapper::new(
                client,
                page.clone(),
                Arc::new(ConsumedCodes::persisted(storage)),
                config.bootstrap_timeout,
            );
            let guard = RouteGuard::new(bootstrapper.session(), redirects, page.clone());

            let session = bootstrapper.run().await;
            let decision = guard.resolve().await;

            let report = serde_json::json!({
                "session": session,
                "render": decision,
                "page_url": page.current_url().as_str(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Login => {
            redirects.login(page.as_ref());
            print_navigation(&page);
        }
        Command::Logout => {
            redirects.logout(&tokens, page.as_ref());
            print_navigation(&page);
        }
    }

    Ok(())
}

/// Print where a headless navigation went
fn print_navigation(page: &HeadlessPage) {
    if let Some(url) = page.last_navigation() {
        println!("{}", url);
    }
}
