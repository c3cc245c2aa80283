//! Session and authentication state models.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Identity part of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Backend user ID (owner of records)
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
}

/// Authenticated session as issued by the auth backend.
///
/// Serialized form is the one kept in the session cache:
/// `{"user": {...}, "accessToken": "...", "refreshToken": "...", "expiresAt": 0}`.
/// Missing fields deserialize as empty so that a damaged cache entry still
/// parses and is then rejected by [`Session::is_valid`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub user: SessionUser,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Access token expiry (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl Session {
    /// A session is usable only with a user ID and both tokens.
    pub fn is_valid(&self) -> bool {
        !self.user.id.is_empty() && !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// Whether the access token expires within `margin_secs` of `now`.
    ///
    /// Sessions without a known expiry are never considered expiring.
    pub fn expires_within(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at
            .map(|expires_at| now + margin_secs >= expires_at)
            .unwrap_or(false)
    }
}

/// Effective authentication state driving the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Loading,
    Authenticated(Session),
    Unauthenticated,
}

impl AuthState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn kind(&self) -> AuthStateKind {
        match self {
            AuthState::Loading => AuthStateKind::Loading,
            AuthState::Authenticated(_) => AuthStateKind::Authenticated,
            AuthState::Unauthenticated => AuthStateKind::Unauthenticated,
        }
    }
}

/// Token-free view of [`AuthState`] for the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum AuthStateKind {
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Session-change notification pushed by the auth gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
    UserUpdated(Session),
    PasswordRecovery,
}

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Account created; the user must confirm their email first.
    PendingVerification,
    /// Email confirmation is disabled on the backend and a session was issued.
    SignedIn(Session),
}
