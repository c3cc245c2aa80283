// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process backend for offline mode and tests.
//!
//! Behaves like the hosted backend for everything the client relies on:
//! owner filtering, newest-first ordering, server-assigned IDs and
//! timestamps, session-change events. Failure injection hooks let tests
//! exercise the retry and error paths.

use super::{AuthGateway, RecordStore, SessionSubscription, SESSION_EVENT_CAPACITY};
use crate::error::{AppError, Result};
use crate::models::{NewRecord, Record, Session, SessionEvent, SessionUser, SignUpOutcome};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::{broadcast, RwLock};

/// Lifetime of sessions issued by the in-memory backend.
const SESSION_TTL_SECS: i64 = 3600;

struct Account {
    user_id: String,
    password: String,
}

/// In-memory auth + record backend.
pub struct MemoryBackend {
    accounts: DashMap<String, Account>,
    records: DashMap<String, Record>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
    require_verification: AtomicBool,
    /// Last assigned creation time, keeps timestamps strictly increasing
    last_created_at: Mutex<Option<DateTime<Utc>>>,
    insert_calls: AtomicU32,
    select_calls: AtomicU32,
    delete_calls: AtomicU32,
    failing_inserts: AtomicU32,
    failing_deletes: AtomicU32,
    failing_selects: AtomicU32,
    lost_delete_responses: AtomicU32,
    last_delete_filter: Mutex<Option<(String, String)>>,
    password_resets: Mutex<Vec<(String, String)>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self {
            accounts: DashMap::new(),
            records: DashMap::new(),
            session: RwLock::new(None),
            events,
            require_verification: AtomicBool::new(false),
            last_created_at: Mutex::new(None),
            insert_calls: AtomicU32::new(0),
            select_calls: AtomicU32::new(0),
            delete_calls: AtomicU32::new(0),
            failing_inserts: AtomicU32::new(0),
            failing_deletes: AtomicU32::new(0),
            failing_selects: AtomicU32::new(0),
            lost_delete_responses: AtomicU32::new(0),
            last_delete_filter: Mutex::new(None),
            password_resets: Mutex::new(Vec::new()),
        }
    }

    /// Make sign-up wait for email verification instead of signing in.
    pub fn set_require_verification(&self, required: bool) {
        self.require_verification.store(required, Ordering::SeqCst);
    }

    /// Register an account directly, returning its user ID.
    pub fn add_account(&self, email: &str, password: &str) -> String {
        let user_id = uuid::Uuid::new_v4().to_string();
        self.accounts.insert(
            email.to_string(),
            Account {
                user_id: user_id.clone(),
                password: password.to_string(),
            },
        );
        user_id
    }

    /// Replace the live session without emitting an event.
    pub async fn set_live_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }

    /// Push an event to subscribers as if the backend had emitted it.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Fail the next `n` inserts with a transient error.
    pub fn fail_next_inserts(&self, n: u32) {
        self.failing_inserts.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` deletes with a transient error.
    pub fn fail_next_deletes(&self, n: u32) {
        self.failing_deletes.store(n, Ordering::SeqCst);
    }

    /// Apply the next `n` deletes but answer them with a transient error,
    /// as if the response was lost on the way back.
    pub fn lose_next_delete_responses(&self, n: u32) {
        self.lost_delete_responses.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` selects with a transient error.
    pub fn fail_next_selects(&self, n: u32) {
        self.failing_selects.store(n, Ordering::SeqCst);
    }

    pub fn insert_calls(&self) -> u32 {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn select_calls(&self) -> u32 {
        self.select_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// `(id, owner_id)` filter of the most recent delete call.
    pub fn last_delete_filter(&self) -> Option<(String, String)> {
        self.last_delete_filter
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(None)
    }

    /// `(email, redirect_to)` of every password reset request so far.
    pub fn password_resets(&self) -> Vec<(String, String)> {
        self.password_resets
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Every stored record regardless of owner.
    pub fn all_records(&self) -> Vec<Record> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }

    fn issue_session(&self, email: &str, user_id: &str) -> Session {
        Session {
            user: SessionUser {
                id: user_id.to_string(),
                email: email.to_string(),
            },
            access_token: format!("access-{}", uuid::Uuid::new_v4()),
            refresh_token: format!("refresh-{}", uuid::Uuid::new_v4()),
            expires_at: Some(Utc::now().timestamp() + SESSION_TTL_SECS),
        }
    }

    /// Next creation timestamp; never equal to or before the previous one.
    fn next_created_at(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.last_created_at.lock() {
            Ok(mut last) => {
                let next = match *last {
                    Some(prev) if prev >= now => prev + Duration::milliseconds(1),
                    _ => now,
                };
                *last = Some(next);
                next
            }
            Err(_) => now,
        }
    }

    /// Consume one injected failure from `counter`, if any.
    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl AuthGateway for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let user_id = match self.accounts.get(email) {
            Some(account) if account.password == password => account.user_id.clone(),
            _ => return Err(AppError::Auth("Invalid login credentials".to_string())),
        };

        let session = self.issue_session(email, &user_id);
        *self.session.write().await = Some(session.clone());
        self.emit(SessionEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        if self.accounts.contains_key(email) {
            return Err(AppError::Auth("User already registered".to_string()));
        }
        let user_id = self.add_account(email, password);

        if self.require_verification.load(Ordering::SeqCst) {
            return Ok(SignUpOutcome::PendingVerification);
        }

        let session = self.issue_session(email, &user_id);
        *self.session.write().await = Some(session.clone());
        self.emit(SessionEvent::SignedIn(session.clone()));
        Ok(SignUpOutcome::SignedIn(session))
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.session.read().await.clone())
    }

    async fn set_session(&self, session: &Session) -> Result<()> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.events.subscribe())
    }

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<()> {
        if let Ok(mut resets) = self.password_resets.lock() {
            resets.push((email.to_string(), redirect_to.to_string()));
        }
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        *self.session.write().await = None;
        self.emit(SessionEvent::SignedOut);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryBackend {
    async fn insert(&self, record: &NewRecord) -> Result<Record> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_inserts) {
            return Err(AppError::Unavailable("injected insert failure".to_string()));
        }

        let stored = Record {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: record.user_id.clone(),
            title: record.title.clone(),
            payload: record.url.clone(),
            rendered_artifact: record.qr_data.clone(),
            created_at: self.next_created_at(),
        };
        self.records.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn select_by_owner(&self, owner_id: &str) -> Result<Vec<Record>> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        if Self::take_failure(&self.failing_selects) {
            return Err(AppError::Unavailable("injected select failure".to_string()));
        }

        let mut rows: Vec<Record> = self
            .records
            .iter()
            .filter(|r| r.owner_id == owner_id)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn delete_by_id_and_owner(&self, id: &str, owner_id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut filter) = self.last_delete_filter.lock() {
            *filter = Some((id.to_string(), owner_id.to_string()));
        }
        if Self::take_failure(&self.failing_deletes) {
            return Err(AppError::Unavailable("injected delete failure".to_string()));
        }

        if self.records.remove_if(id, |_, r| r.owner_id == owner_id).is_none() {
            return Err(AppError::NotFound(format!(
                "Record {} not found for this user",
                id
            )));
        }
        if Self::take_failure(&self.lost_delete_responses) {
            return Err(AppError::Unavailable("injected lost response".to_string()));
        }
        Ok(())
    }
}
