// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! QRush headless host
//!
//! Runs the client core without a UI: restores the session, follows auth
//! state changes and logs the signed-in user's saved QR codes. Shared
//! images are written to the download directory.

use qrush::{
    config::Config,
    models::AuthState,
    routes::{initial_route, Route},
    services::{share::DirectoryDownloader, PlatformFacilities},
    time_utils::format_utc_rfc3339,
    QrushApp,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(
        platform = ?config.platform,
        offline = config.offline,
        "Starting QRush"
    );

    let facilities = PlatformFacilities {
        downloader: Some(Arc::new(DirectoryDownloader::new(&config.download_dir))),
        ..Default::default()
    };
    let app = QrushApp::new(config, facilities).await?;

    let mut state = app.reconciler.state();
    let _subscription = app.start().await;

    loop {
        let current = state.borrow_and_update().clone();
        show(&app, &current).await;

        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Log what the UI would show for `state`.
async fn show(app: &QrushApp, state: &AuthState) {
    match initial_route(state) {
        None => tracing::info!("Loading session"),
        Some(Route::Home) => match app.records.refresh().await {
            Ok(records) => {
                tracing::info!(count = records.len(), "Signed in, saved QR codes loaded");
                for record in &records {
                    tracing::info!(
                        id = %record.id,
                        title = %record.title,
                        url = %record.payload,
                        created_at = %format_utc_rfc3339(record.created_at),
                        date = %record.display_date(),
                        has_image = record.rendered_artifact.is_some(),
                        "QR code"
                    );
                }
            }
            Err(e) => {
                let notice = e.notice();
                tracing::warn!(
                    title = %notice.title,
                    message = %notice.message,
                    "Could not load QR codes"
                );
            }
        },
        Some(route) => tracing::info!(route = %route, "Not signed in"),
    }
}

/// Initialize logging. JSON output when `LOG_FORMAT=json`.
fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qrush=debug,info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}
