// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Determines whether the user is signed in.
//!
//! The live session from the auth gateway wins; the local session cache is
//! the fallback. Once [`SessionReconciler::start`] has subscribed to session
//! changes, events from the gateway are authoritative and an initial
//! resolution that finishes after an event has been applied is discarded.

use crate::backend::{AuthGateway, SessionSubscription};
use crate::cache::{CachedSession, SessionCache};
use crate::error::Result;
use crate::models::{AuthState, Session, SessionEvent};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

pub struct SessionReconciler {
    auth: Arc<dyn AuthGateway>,
    cache: SessionCache,
    state: watch::Sender<AuthState>,
    /// Serializes resolution and event handling, including cache writes
    lock: Mutex<()>,
}

impl SessionReconciler {
    pub fn new(auth: Arc<dyn AuthGateway>, cache: SessionCache) -> Self {
        let (state, _) = watch::channel(AuthState::Loading);
        Self {
            auth,
            cache,
            state,
            lock: Mutex::new(()),
        }
    }

    /// Observe the auth state. Starts out as `Loading`.
    pub fn state(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Resolve the auth state from the gateway and the cache.
    ///
    /// Updates the cache as a side effect but does not publish the result.
    pub async fn resolve_auth_state(&self) -> Result<AuthState> {
        let _guard = self.lock.lock().await;
        self.resolve_locked().await
    }

    async fn resolve_locked(&self) -> Result<AuthState> {
        let live = match self.auth.current_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Live session lookup failed, checking cache");
                None
            }
        };

        if let Some(session) = live.filter(Session::is_valid) {
            tracing::debug!(user_id = %session.user.id, "Using live session");
            if let Err(e) = self.cache.write(&session).await {
                tracing::warn!(error = %e, "Failed to cache live session");
            }
            return Ok(AuthState::Authenticated(session));
        }

        match self.cache.read().await? {
            CachedSession::Valid(session) => {
                tracing::info!(user_id = %session.user.id, "Restoring cached session");
                if let Err(e) = self.auth.set_session(&session).await {
                    tracing::warn!(error = %e, "Gateway did not accept cached session");
                }
                Ok(AuthState::Authenticated(session))
            }
            CachedSession::Invalid => {
                tracing::info!("Discarding invalid cached session");
                self.cache.clear().await?;
                Ok(AuthState::Unauthenticated)
            }
            CachedSession::Missing => Ok(AuthState::Unauthenticated),
        }
    }

    /// Apply one session-change event.
    pub async fn handle_event(&self, event: SessionEvent) {
        let _guard = self.lock.lock().await;

        match event {
            SessionEvent::SignedIn(session) if session.is_valid() => {
                tracing::info!(user_id = %session.user.id, "Signed in");
                self.cache_session(&session).await;
                self.state.send_replace(AuthState::Authenticated(session));
            }
            SessionEvent::SignedOut => {
                tracing::info!("Signed out");
                if let Err(e) = self.cache.clear().await {
                    tracing::warn!(error = %e, "Failed to clear cached session");
                }
                self.state.send_replace(AuthState::Unauthenticated);
            }
            SessionEvent::TokenRefreshed(session) | SessionEvent::UserUpdated(session)
                if session.is_valid() =>
            {
                tracing::debug!(user_id = %session.user.id, "Session updated");
                self.cache_session(&session).await;
                self.state.send_if_modified(|state| match state {
                    AuthState::Authenticated(held) if held.user.id == session.user.id => {
                        *held = session;
                        true
                    }
                    _ => false,
                });
            }
            SessionEvent::PasswordRecovery => {
                tracing::debug!("Password recovery event, no state change");
            }
            other => {
                tracing::warn!(event = event_name(&other), "Ignoring event with unusable session");
            }
        }
    }

    async fn cache_session(&self, session: &Session) {
        if let Err(e) = self.cache.write(session).await {
            tracing::warn!(error = %e, "Failed to cache session");
        }
    }

    /// Subscribe to session changes, then publish the initial state unless
    /// an event got there first.
    pub async fn start(self: Arc<Self>) -> ReconcilerHandle {
        let subscription = self.auth.subscribe();
        let task = tokio::spawn(Arc::clone(&self).run(subscription));

        let _guard = self.lock.lock().await;
        let loading = matches!(*self.state.borrow(), AuthState::Loading);
        if loading {
            let state = self.resolve_locked().await.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Auth state resolution failed");
                AuthState::Unauthenticated
            });
            tracing::info!(state = ?state.kind(), "Initial auth state resolved");
            self.state.send_replace(state);
        } else {
            tracing::debug!("Session event arrived first, skipping initial resolution");
        }

        ReconcilerHandle { task }
    }

    async fn run(self: Arc<Self>, mut subscription: SessionSubscription) {
        while let Some(event) = subscription.recv().await {
            self.handle_event(event).await;
        }
        tracing::debug!("Session event stream closed");
    }
}

fn event_name(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::SignedIn(_) => "signed_in",
        SessionEvent::SignedOut => "signed_out",
        SessionEvent::TokenRefreshed(_) => "token_refreshed",
        SessionEvent::UserUpdated(_) => "user_updated",
        SessionEvent::PasswordRecovery => "password_recovery",
    }
}

/// Keeps the session subscription alive. Dropping it unsubscribes.
pub struct ReconcilerHandle {
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    pub fn shutdown(self) {}
}

impl Drop for ReconcilerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
