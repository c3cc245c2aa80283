// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent user-facing notices.

use serde::Serialize;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Application error type that converts to a user-facing notice.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The row to change does not exist (or is not the caller's).
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Artifact export timed out after {0:?}")]
    ExportTimeout(Duration),

    #[error("Artifact export failed: {0}")]
    Export(String),

    #[error("Share failed: {0}")]
    ShareFailure(String),

    #[error("Session cache error: {0}")]
    Cache(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether a retry of the same call may succeed (network, 429, 5xx).
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Unavailable(_))
    }

    /// Whether the UI should send the user back to the login screen.
    pub fn requires_login(&self) -> bool {
        matches!(self, AppError::NotAuthenticated)
    }

    /// Convert the error into the notice shown to the user.
    pub fn notice(&self) -> Notice {
        match self {
            AppError::InvalidInput(msg) => Notice::error("Error", msg.clone()),
            AppError::Auth(msg) => Notice::error("Authentication Error", msg.clone()),
            AppError::NotAuthenticated => {
                Notice::error("Session expired", "Please log in again")
            }
            AppError::Persistence(msg) | AppError::NotFound(msg) => {
                tracing::error!(error = %msg, "Persistence error");
                Notice::error("Error", "Could not save your changes. Please try again.")
            }
            AppError::Unavailable(msg) | AppError::Backend(msg) => {
                tracing::error!(error = %msg, "Backend error");
                Notice::error("Error", "The server could not be reached. Please try again.")
            }
            AppError::ExportTimeout(_) | AppError::Export(_) => {
                Notice::info("Notice", "QR image is not available yet")
            }
            AppError::ShareFailure(_) => Notice::error("Error", "Failed to share QR code"),
            AppError::Cache(msg) => {
                tracing::warn!(error = %msg, "Session cache error");
                Notice::error("Error", "An unexpected error occurred")
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                Notice::error("Error", "An unexpected error occurred")
            }
        }
    }
}

/// Severity of a notice, mirrors the toast types of the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A dismissible message for the user (toast / alert).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for application operations
pub type Result<T> = std::result::Result<T, AppError>;
