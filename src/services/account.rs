// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in, registration, password reset and sign-out flows.
//!
//! Forms are checked locally before anything reaches the auth gateway.
//! Successful sign-in and sign-out show up in the auth state through the
//! session reconciler, not through these return values.

use super::validation::{ResetPasswordForm, SignInForm, SignUpForm};
use crate::backend::AuthGateway;
use crate::error::{Notice, Result};
use crate::models::{Session, SignUpOutcome};
use std::sync::Arc;

pub struct AccountService {
    auth: Arc<dyn AuthGateway>,
    password_reset_redirect: String,
}

impl AccountService {
    pub fn new(auth: Arc<dyn AuthGateway>, password_reset_redirect: impl Into<String>) -> Self {
        Self {
            auth,
            password_reset_redirect: password_reset_redirect.into(),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let form = SignInForm::new(email, password);
        form.check()?;

        let session = self.auth.sign_in(&form.email, &form.password).await?;
        tracing::info!(user_id = %session.user.id, "Login successful");
        Ok(session)
    }

    /// Register a new account. Returns the notice to show on success.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Notice> {
        let form = SignUpForm::new(email, password, confirm_password);
        form.check()?;

        match self.auth.sign_up(&form.email, &form.password).await? {
            SignUpOutcome::PendingVerification => {
                tracing::info!("Account created, waiting for email verification");
            }
            SignUpOutcome::SignedIn(session) => {
                tracing::info!(user_id = %session.user.id, "Account created and signed in");
            }
        }

        Ok(Notice::success(
            "Registration Completed",
            "Your account has been created successfully! Please check your email for verification.",
        ))
    }

    /// Send a password reset email. The link in it always points at the
    /// configured reset page.
    pub async fn request_password_reset(&self, email: &str) -> Result<Notice> {
        let form = ResetPasswordForm::new(email);
        form.check()?;

        self.auth
            .request_password_reset(&form.email, &self.password_reset_redirect)
            .await?;
        tracing::info!("Password reset email requested");

        Ok(Notice::success(
            "Success",
            "Password reset email sent! Please check your inbox and follow the instructions.",
        ))
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.auth.sign_out().await?;
        tracing::info!("Sign out requested");
        Ok(())
    }
}
