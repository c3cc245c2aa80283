// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Record lifecycle: create, list, delete, share and open saved QR codes.
//!
//! The displayed list and the open detail record live in `watch` channels
//! so any number of views can follow them. Every completed fetch replaces
//! the list wholesale.

use super::encoder::{render_artifact, QrEncoder};
use super::retry::{persist_with_retry, RetryPolicy};
use super::share::{LinkOpener, SharePayload, ShareOutcome, ShareStrategy};
use super::validation::validate_record_input;
use crate::backend::RecordStore;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{AuthState, NewRecord, Record, Session};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Confirmation dialog shown before a record is deleted.
#[async_trait]
pub trait ConfirmDelete: Send + Sync {
    /// Ask the user. `true` means go ahead.
    async fn confirm(&self, record_id: &str) -> bool;
}

/// Proof that the user agreed to delete a record.
#[derive(Debug)]
pub struct DeleteConfirmation {
    record_id: String,
}

impl DeleteConfirmation {
    /// Ask `dialog`; `None` if the user declined.
    pub async fn request(dialog: &dyn ConfirmDelete, record_id: &str) -> Option<Self> {
        dialog.confirm(record_id).await.then(|| Self {
            record_id: record_id.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

pub struct RecordController {
    store: Arc<dyn RecordStore>,
    encoder: Arc<dyn QrEncoder>,
    share: Arc<dyn ShareStrategy>,
    link_opener: Option<Arc<dyn LinkOpener>>,
    auth_state: watch::Receiver<AuthState>,
    retry: RetryPolicy,
    export_timeout: Duration,
    records: watch::Sender<Vec<Record>>,
    selected: watch::Sender<Option<Record>>,
}

impl RecordController {
    pub fn new(
        store: Arc<dyn RecordStore>,
        encoder: Arc<dyn QrEncoder>,
        share: Arc<dyn ShareStrategy>,
        auth_state: watch::Receiver<AuthState>,
        config: &Config,
    ) -> Self {
        let (records, _) = watch::channel(Vec::new());
        let (selected, _) = watch::channel(None);
        Self {
            store,
            encoder,
            share,
            link_opener: None,
            auth_state,
            retry: RetryPolicy::new(config.persist_max_attempts, config.persist_backoff),
            export_timeout: config.export_timeout,
            records,
            selected,
        }
    }

    pub fn with_link_opener(mut self, opener: Arc<dyn LinkOpener>) -> Self {
        self.link_opener = Some(opener);
        self
    }

    /// The displayed record list.
    pub fn records(&self) -> watch::Receiver<Vec<Record>> {
        self.records.subscribe()
    }

    /// The record shown in the detail view, if any.
    pub fn selected(&self) -> watch::Receiver<Option<Record>> {
        self.selected.subscribe()
    }

    fn session(&self) -> Result<Session> {
        self.auth_state
            .borrow()
            .session()
            .cloned()
            .ok_or(AppError::NotAuthenticated)
    }

    /// Validate, render and save a new record for the signed-in user.
    pub async fn create_record(&self, raw_input: &str, title: &str) -> Result<Record> {
        let input = validate_record_input(raw_input, title)?;
        let session = self.session()?;

        let artifact =
            render_artifact(self.encoder.as_ref(), &input.payload, self.export_timeout).await?;
        if artifact.is_none() {
            tracing::info!(payload = %input.payload, "Saving record without QR image");
        }

        let new_record = NewRecord {
            user_id: session.user.id.clone(),
            title: input.title,
            url: input.payload,
            qr_data: artifact,
        };
        let store = &self.store;
        let new_record = &new_record;
        let record = persist_with_retry(self.retry, "insert_record", |_| store.insert(new_record))
            .await?;

        tracing::info!(
            record_id = %record.id,
            owner_id = %record.owner_id,
            "Saved QR code"
        );

        if let Err(e) = self.list_records(&session.user.id).await {
            tracing::warn!(error = %e, "Failed to refresh records after create");
        }
        Ok(record)
    }

    /// Fetch all records of `owner_id`, newest first, and display them.
    ///
    /// On failure the displayed list is left as it was.
    pub async fn list_records(&self, owner_id: &str) -> Result<Vec<Record>> {
        let rows = self.store.select_by_owner(owner_id).await.map_err(|e| {
            tracing::error!(owner_id = %owner_id, error = %e, "Failed to fetch records");
            e
        })?;

        tracing::debug!(owner_id = %owner_id, count = rows.len(), "Fetched records");
        self.records.send_replace(rows.clone());
        Ok(rows)
    }

    /// Re-fetch the signed-in user's records (pull to refresh).
    pub async fn refresh(&self) -> Result<Vec<Record>> {
        let session = self.session()?;
        self.list_records(&session.user.id).await
    }

    /// Delete a record after the user confirms it.
    pub async fn delete_record(
        &self,
        id: &str,
        owner_id: &str,
        dialog: &dyn ConfirmDelete,
    ) -> Result<DeleteOutcome> {
        let Some(confirmation) = DeleteConfirmation::request(dialog, id).await else {
            tracing::debug!(record_id = %id, "Delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        };
        self.delete_confirmed(confirmation, owner_id).await?;
        Ok(DeleteOutcome::Deleted)
    }

    /// Delete a record the user already agreed to delete.
    pub async fn delete_confirmed(
        &self,
        confirmation: DeleteConfirmation,
        owner_id: &str,
    ) -> Result<()> {
        let id = confirmation.record_id.as_str();
        let store = &self.store;
        persist_with_retry(self.retry, "delete_record", |attempt| async move {
            match store.delete_by_id_and_owner(id, owner_id).await {
                // An earlier attempt went through but its response was lost.
                Err(AppError::NotFound(_)) if attempt > 1 => Ok(()),
                result => result,
            }
        })
        .await?;

        tracing::info!(record_id = %id, owner_id = %owner_id, "Deleted QR code");

        self.selected.send_if_modified(|selected| {
            if selected.as_ref().is_some_and(|r| r.id == id) {
                *selected = None;
                true
            } else {
                false
            }
        });

        if let Err(e) = self.list_records(owner_id).await {
            tracing::warn!(error = %e, "Failed to refresh records after delete");
        }
        Ok(())
    }

    /// Share a record through the platform's share strategy.
    pub async fn share_record(&self, record: &Record) -> ShareOutcome {
        let rendered = match &record.rendered_artifact {
            Some(svg) => Ok(Some(svg.clone())),
            None => {
                render_artifact(self.encoder.as_ref(), &record.payload, self.export_timeout).await
            }
        };
        let svg = match rendered {
            Ok(Some(svg)) => svg,
            Ok(None) => return ShareOutcome::Failed("QR image could not be generated".to_string()),
            Err(e) => return ShareOutcome::Failed(e.to_string()),
        };

        let outcome = self
            .share
            .share(&SharePayload::for_record(record, &svg))
            .await;
        tracing::info!(
            record_id = %record.id,
            strategy = self.share.name(),
            outcome = ?outcome,
            "Share finished"
        );
        outcome
    }

    /// Open the record's URL with the platform link handler.
    pub async fn open_record(&self, record: &Record) -> Result<()> {
        let opener = self.link_opener.as_ref().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("No link handler on this platform"))
        })?;
        opener.open_url(&record.payload).await.map_err(|e| {
            tracing::warn!(url = %record.payload, error = %e, "Failed to open URL");
            e
        })
    }

    /// Show `record` in the detail view.
    pub fn select(&self, record: Record) {
        self.selected.send_replace(Some(record));
    }

    pub fn close_detail(&self) {
        self.selected.send_replace(None);
    }
}
