// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend layer: authentication and record storage.
//!
//! The rest of the crate talks to the backend only through the
//! [`AuthGateway`] and [`RecordStore`] traits so that the HTTP client and the
//! in-memory implementation are interchangeable.

pub mod memory;
pub mod supabase;

pub use memory::MemoryBackend;
pub use supabase::SupabaseClient;

use crate::error::Result;
use crate::models::{NewRecord, Record, Session, SessionEvent, SignUpOutcome};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Table names as constants.
pub mod tables {
    pub const QR_CODES: &str = "qr_codes";
}

/// Capacity of the session-change broadcast channel.
pub(crate) const SESSION_EVENT_CAPACITY: usize = 32;

/// Authentication operations of the backend.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome>;

    /// The live session, refreshed if its access token is about to expire.
    async fn current_session(&self) -> Result<Option<Session>>;

    /// Adopt a session obtained elsewhere (the local cache) without a
    /// round trip. Later calls refresh it if needed.
    async fn set_session(&self, session: &Session) -> Result<()>;

    /// Listen for session changes until the subscription is dropped.
    fn subscribe(&self) -> SessionSubscription;

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<()>;

    async fn sign_out(&self) -> Result<()>;
}

/// Row operations on the signed-in user's records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a record and return it with server-assigned ID and timestamp.
    async fn insert(&self, record: &NewRecord) -> Result<Record>;

    /// All records of `owner_id`, newest first.
    async fn select_by_owner(&self, owner_id: &str) -> Result<Vec<Record>>;

    /// Delete a record only if it belongs to `owner_id`.
    async fn delete_by_id_and_owner(&self, id: &str, owner_id: &str) -> Result<()>;
}

/// Handle on the session-change stream. Dropping it unsubscribes.
pub struct SessionSubscription {
    rx: broadcast::Receiver<SessionEvent>,
}

impl SessionSubscription {
    pub(crate) fn new(rx: broadcast::Receiver<SessionEvent>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the gateway is gone.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Session subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(self) {}
}
