// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! QRush: generate, save, browse and share QR codes for URLs.
//!
//! This crate is the client core. It decides whether the user is signed in,
//! manages the lifecycle of saved QR codes against the hosted backend, and
//! shares them through whatever the host platform provides.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use backend::{AuthGateway, MemoryBackend, RecordStore, SupabaseClient};
use cache::{FileStore, KeyValueStore, SessionCache};
use config::Config;
use error::Result;
use services::{
    select_share_strategy, AccountService, PlatformFacilities, QrEncoder, ReconcilerHandle,
    RecordController, SessionReconciler, SvgQrEncoder,
};
use std::sync::Arc;

/// The wired-up application.
pub struct QrushApp {
    pub config: Config,
    pub reconciler: Arc<SessionReconciler>,
    pub records: RecordController,
    pub account: AccountService,
}

impl QrushApp {
    /// Build the application for `config` on a host offering `facilities`.
    pub async fn new(config: Config, facilities: PlatformFacilities) -> Result<Self> {
        let kv: Arc<dyn KeyValueStore> = match &config.cache_path {
            Some(path) => Arc::new(FileStore::open(path).await?),
            None => Arc::new(FileStore::open_default().await?),
        };

        let encoder = Arc::new(SvgQrEncoder);
        if config.offline {
            tracing::info!("Offline mode, using in-memory backend");
            let backend = Arc::new(MemoryBackend::new());
            Self::from_parts(config, backend.clone(), backend, kv, encoder, facilities)
        } else {
            let client = Arc::new(SupabaseClient::new(&config)?);
            Self::from_parts(config, client.clone(), client, kv, encoder, facilities)
        }
    }

    /// Assemble the application from explicit collaborators.
    pub fn from_parts(
        config: Config,
        auth: Arc<dyn AuthGateway>,
        store: Arc<dyn RecordStore>,
        kv: Arc<dyn KeyValueStore>,
        encoder: Arc<dyn QrEncoder>,
        facilities: PlatformFacilities,
    ) -> Result<Self> {
        let share = select_share_strategy(config.platform, &facilities)?;
        tracing::info!(
            platform = ?config.platform,
            strategy = share.name(),
            "Share strategy selected"
        );

        let reconciler = Arc::new(SessionReconciler::new(
            auth.clone(),
            SessionCache::new(kv),
        ));

        let mut records =
            RecordController::new(store, encoder, share, reconciler.state(), &config);
        if let Some(opener) = facilities.link_opener {
            records = records.with_link_opener(opener);
        }

        let account = AccountService::new(auth, config.password_reset_redirect.clone());

        Ok(Self {
            config,
            reconciler,
            records,
            account,
        })
    }

    /// Start following session changes and resolve the initial auth state.
    pub async fn start(&self) -> ReconcilerHandle {
        Arc::clone(&self.reconciler).start().await
    }
}
