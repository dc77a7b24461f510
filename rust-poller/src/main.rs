//! Yamato Poller - one poll run per invocation.
//!
//! Usage: `yamato-poller <search-filter>`
//!
//! Reads the watermark, forwards any new delivery notice matching the filter
//! to the configured webhook and saves the new watermark. Exits non-zero on
//! any fatal error, leaving the watermark untouched.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use yamato::mailbox::load_access_token;
use yamato::{Config, FileWatermarkStore, GmailClient, Poller, WebhookNotifier};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("poller_starting");

    let (search_filter, poller) = match startup().await {
        Ok(ready) => ready,
        Err(e) => {
            error!(stage = "startup", error = %format!("{e:#}"), "poller_startup_failed");
            return Err(e);
        }
    };

    match poller.run(&search_filter).await {
        Ok(report) => {
            info!(
                notified = report.notified,
                saved = %report.saved,
                "poller_finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(stage = e.stage(), error = %e, "poll_run_failed");
            Err(e.into())
        }
    }
}

/// Read the arguments and configuration and build the poller.
///
/// Nothing is written before this succeeds.
async fn startup() -> Result<(String, Poller<FileWatermarkStore, GmailClient, WebhookNotifier>)> {
    let search_filter = search_filter(std::env::args())?;

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        search_filter = %search_filter,
        watermark_path = %config.watermark_path.display(),
        lookback_hours = config.lookback_hours,
        token_path = %config.token_path.display(),
        gmail_user_id = %config.gmail_user_id,
        notify_username = %config.notify_username,
        "config_loaded"
    );

    let access_token = load_access_token(&config.token_path).await?;

    // Shared HTTP client for the mailbox and the webhook
    let http = Client::builder()
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .build()
        .context("Failed to create HTTP client")?;

    let mailbox = GmailClient::new(
        http.clone(),
        config.gmail_api_base.clone(),
        config.gmail_user_id.clone(),
        access_token,
    );
    let notifier = WebhookNotifier::new(http, config.webhook_url.clone());
    let store = FileWatermarkStore::new(
        config.watermark_path.clone(),
        chrono::Duration::hours(i64::from(config.lookback_hours)),
    );

    let poller = Poller::new(store, mailbox, notifier, config.notify_username.clone());

    Ok((search_filter, poller))
}

/// The single positional argument.
fn search_filter(mut args: impl Iterator<Item = String>) -> Result<String> {
    args.nth(1).context("Usage: yamato-poller <search-filter>")
}
