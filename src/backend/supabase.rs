// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the hosted backend (auth API + REST table API).
//!
//! Handles:
//! - Password sign-in, sign-up, password reset and sign-out
//! - Keeping the live session in memory and refreshing it before expiry
//! - Broadcasting session changes to subscribers
//! - Owner-scoped CRUD on the `qr_codes` table

use super::{tables, AuthGateway, RecordStore, SessionSubscription, SESSION_EVENT_CAPACITY};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{NewRecord, Record, Session, SessionEvent, SessionUser, SignUpOutcome};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::{broadcast, Mutex, RwLock};

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Backend API client.
///
/// One instance serves as both [`AuthGateway`] and [`RecordStore`]; record
/// requests are authorized with the access token of the live session.
pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    /// Live session (in memory only, the cache is the reconciler's job)
    session: RwLock<Option<Session>>,
    /// Serializes token refreshes
    refresh_lock: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl SupabaseClient {
    /// Create a client for the configured backend project.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.backend_anon_key)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid anon key: {}", e)))?,
        );
        headers.insert(
            "X-Client-Info",
            HeaderValue::from_static(config.platform.client_info()),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        Ok(Self {
            http,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            events,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.events.send(event);
    }

    /// Access token of the live session, refreshed if needed.
    async fn access_token(&self) -> Result<String> {
        self.current_session()
            .await?
            .map(|s| s.access_token)
            .ok_or(AppError::NotAuthenticated)
    }

    /// Exchange a refresh token for a new session.
    async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(network_error)?;

        let token: TokenResponse = check_response_json(response, Api::Auth).await?;
        Ok(token.into_session())
    }

    /// Refresh the held session if it is about to expire.
    ///
    /// Mirrors the double-checked pattern: check, lock, re-check, refresh.
    async fn refresh_if_expiring(&self) -> Result<Option<Session>> {
        let now = Utc::now().timestamp();

        let current = self.session.read().await.clone();
        match current {
            Some(s) if !s.expires_within(now, TOKEN_REFRESH_MARGIN_SECS) => return Ok(Some(s)),
            None => return Ok(None),
            Some(_) => {}
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we were waiting.
        let Some(stale) = self.session.read().await.clone() else {
            return Ok(None);
        };
        if !stale.expires_within(now, TOKEN_REFRESH_MARGIN_SECS) {
            return Ok(Some(stale));
        }

        tracing::info!(user_id = %stale.user.id, "Access token expiring, refreshing");

        match self.refresh(&stale.refresh_token).await {
            Ok(fresh) => {
                *self.session.write().await = Some(fresh.clone());
                self.emit(SessionEvent::TokenRefreshed(fresh.clone()));
                tracing::info!(user_id = %fresh.user.id, "Session refreshed");
                Ok(Some(fresh))
            }
            Err(AppError::Auth(msg)) => {
                // Refresh token revoked or already used: the session is over.
                tracing::warn!(error = %msg, "Session refresh rejected, signing out locally");
                *self.session.write().await = None;
                self.emit(SessionEvent::SignedOut);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl AuthGateway for SupabaseClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(network_error)?;

        let token: TokenResponse = check_response_json(response, Api::Auth).await?;
        let session = token.into_session();

        *self.session.write().await = Some(session.clone());
        self.emit(SessionEvent::SignedIn(session.clone()));

        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let response = self
            .http
            .post(self.auth_url("signup"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(network_error)?;

        let body: serde_json::Value = check_response_json(response, Api::Auth).await?;

        // With email confirmation enabled the backend returns only the user.
        if body.get("access_token").is_none() {
            tracing::info!("Sign-up accepted, awaiting email verification");
            return Ok(SignUpOutcome::PendingVerification);
        }

        let token: TokenResponse = serde_json::from_value(body)
            .map_err(|e| AppError::Backend(format!("JSON parse error: {}", e)))?;
        let session = token.into_session();

        *self.session.write().await = Some(session.clone());
        self.emit(SessionEvent::SignedIn(session.clone()));
        Ok(SignUpOutcome::SignedIn(session))
    }

    async fn current_session(&self) -> Result<Option<Session>> {
        self.refresh_if_expiring().await
    }

    async fn set_session(&self, session: &Session) -> Result<()> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    fn subscribe(&self) -> SessionSubscription {
        SessionSubscription::new(self.events.subscribe())
    }

    async fn request_password_reset(&self, email: &str, redirect_to: &str) -> Result<()> {
        let response = self
            .http
            .post(self.auth_url("recover"))
            .query(&[("redirect_to", redirect_to)])
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .map_err(network_error)?;

        check_response(response, Api::Auth).await?;
        tracing::info!("Password reset email requested");
        Ok(())
    }

    async fn sign_out(&self) -> Result<()> {
        let session = self.session.write().await.take();

        let server_result = match &session {
            Some(s) => {
                let response = self
                    .http
                    .post(self.auth_url("logout"))
                    .bearer_auth(&s.access_token)
                    .send()
                    .await
                    .map_err(network_error);

                match response {
                    Ok(r) => check_response(r, Api::Auth).await,
                    Err(e) => Err(e),
                }
            }
            None => Ok(()),
        };

        // The local session is gone either way.
        self.emit(SessionEvent::SignedOut);

        match server_result {
            // Token already invalid on the server: nothing left to revoke.
            Err(AppError::Auth(_)) | Ok(()) => {
                tracing::info!("Signed out");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Server sign-out failed, signed out locally");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn insert(&self, record: &NewRecord) -> Result<Record> {
        let access_token = self.access_token().await?;

        let response = self
            .http
            .post(self.table_url(tables::QR_CODES))
            .bearer_auth(access_token)
            .header("Prefer", "return=representation")
            .json(record)
            .send()
            .await
            .map_err(network_error)?;

        let rows: Vec<Record> = check_response_json(response, Api::Rest).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| AppError::Backend("Insert returned no row".to_string()))
    }

    async fn select_by_owner(&self, owner_id: &str) -> Result<Vec<Record>> {
        let access_token = self.access_token().await?;

        let response = self
            .select_request(&access_token, owner_id)
            .send()
            .await
            .map_err(network_error)?;

        check_response_json(response, Api::Rest).await
    }

    async fn delete_by_id_and_owner(&self, id: &str, owner_id: &str) -> Result<()> {
        let access_token = self.access_token().await?;

        let response = self
            .delete_request(&access_token, id, owner_id)
            .send()
            .await
            .map_err(network_error)?;

        let deleted: Vec<Record> = check_response_json(response, Api::Rest).await?;
        if deleted.is_empty() {
            return Err(AppError::NotFound(format!(
                "Record {} not found for this user",
                id
            )));
        }
        Ok(())
    }
}

impl SupabaseClient {
    /// `GET /rest/v1/qr_codes?select=*&user_id=eq.{owner}&order=created_at.desc`
    fn select_request(&self, access_token: &str, owner_id: &str) -> reqwest::RequestBuilder {
        self.http
            .get(self.table_url(tables::QR_CODES))
            .bearer_auth(access_token)
            .query(&[
                ("select", "*".to_string()),
                ("user_id", eq_filter(owner_id)),
                ("order", "created_at.desc".to_string()),
            ])
    }

    fn delete_request(
        &self,
        access_token: &str,
        id: &str,
        owner_id: &str,
    ) -> reqwest::RequestBuilder {
        self.http
            .delete(self.table_url(tables::QR_CODES))
            .bearer_auth(access_token)
            .header("Prefer", "return=representation")
            .query(&[("id", eq_filter(id)), ("user_id", eq_filter(owner_id))])
    }
}

/// PostgREST equality filter. The value goes out unquoted; the query
/// encoder percent-encodes it.
fn eq_filter(value: &str) -> String {
    format!("eq.{}", value)
}

/// Which API answered; auth rejections and table rejections map differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Api {
    Auth,
    Rest,
}

fn network_error(e: reqwest::Error) -> AppError {
    AppError::Unavailable(e.to_string())
}

/// Map a failed response to an application error.
fn error_for_status(api: Api, status: StatusCode, body: &str) -> AppError {
    let message = error_message(body).unwrap_or_else(|| format!("HTTP {}", status));

    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!("Backend rate limit hit (429)");
        return AppError::Unavailable(format!("rate limited: {}", message));
    }
    if status.is_server_error() {
        return AppError::Unavailable(format!("HTTP {}: {}", status, message));
    }
    if status == StatusCode::UNAUTHORIZED {
        return AppError::Auth(message);
    }

    match api {
        // Bad credentials, unconfirmed email, weak password...
        Api::Auth => AppError::Auth(message),
        Api::Rest => AppError::Backend(format!("HTTP {}: {}", status, message)),
    }
}

/// Pull a human-readable message out of the backend's error body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response, api: Api) -> Result<()> {
    if response.status().is_success() {
        return Ok(());
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(error_for_status(api, status, &body))
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
    api: Api,
) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(error_for_status(api, status, &body));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Backend(format!("JSON parse error: {}", e)))
}

/// Token response of the auth API (sign-in, refresh, sign-up without
/// confirmation).
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: TokenUser,
}

#[derive(Debug, Clone, Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| Utc::now().timestamp() + secs));

        Session {
            user: SessionUser {
                id: self.user.id,
                email: self.user.email.unwrap_or_default(),
            },
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}
