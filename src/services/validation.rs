// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local validation of form input. Nothing here touches the network.

use crate::error::{AppError, Result};
use crate::models::DraftQr;
use validator::{Validate, ValidationErrors};

/// Validated input for a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInput {
    pub payload: String,
    pub title: String,
}

#[derive(Validate)]
struct TitleField {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Title must be 1 to 100 characters, not counting surrounding spaces"
    ))]
    title: String,
}

/// Check raw URL input and title, returning the normalized payload.
pub fn validate_record_input(raw_input: &str, title: &str) -> Result<RecordInput> {
    if raw_input.is_empty() {
        return Err(AppError::InvalidInput("Please enter a URL".to_string()));
    }
    if raw_input.chars().any(char::is_whitespace) {
        return Err(AppError::InvalidInput(
            "URL must not contain spaces".to_string(),
        ));
    }

    let payload = DraftQr::new(raw_input).normalized_payload.ok_or_else(|| {
        AppError::InvalidInput("Please enter a valid URL, e.g. example.com".to_string())
    })?;

    let field = TitleField {
        title: title.trim().to_string(),
    };
    field.validate().map_err(|e| invalid(&e, &["title"]))?;

    Ok(RecordInput {
        payload,
        title: field.title,
    })
}

/// Sign-in form.
#[derive(Debug, Validate)]
pub struct SignInForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.email.is_empty() || self.password.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Please fill in all fields".to_string(),
            ));
        }
        self.validate().map_err(|e| invalid(&e, &["email"]))
    }
}

/// Sign-up form.
#[derive(Debug, Validate)]
pub struct SignUpForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    pub fn new(email: &str, password: &str, confirm_password: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            password: password.to_string(),
            confirm_password: confirm_password.to_string(),
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.email.is_empty()
            || self.password.trim().is_empty()
            || self.confirm_password.trim().is_empty()
        {
            return Err(AppError::InvalidInput(
                "Please fill in all fields".to_string(),
            ));
        }
        if self.password != self.confirm_password {
            return Err(AppError::InvalidInput("Passwords do not match".to_string()));
        }
        self.validate().map_err(|e| invalid(&e, &["password", "email"]))
    }
}

/// Password-reset form.
#[derive(Debug, Validate)]
pub struct ResetPasswordForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
}

impl ResetPasswordForm {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.trim().to_string(),
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.email.is_empty() {
            return Err(AppError::InvalidInput(
                "Please enter your email address".to_string(),
            ));
        }
        self.validate().map_err(|e| invalid(&e, &["email"]))
    }
}

/// First message of the failing fields, in the given priority order.
fn invalid(errors: &ValidationErrors, order: &[&str]) -> AppError {
    let field_errors = errors.field_errors();
    let message = order
        .iter()
        .filter_map(|field| field_errors.get(*field))
        .flat_map(|errs| errs.iter())
        .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid input".to_string());
    AppError::InvalidInput(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<impl std::fmt::Debug>) -> String {
        match result {
            Err(AppError::InvalidInput(m)) => m,
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_record_input_normalizes() {
        let input = validate_record_input("example.com", " My Site ").unwrap();
        assert_eq!(input.payload, "https://example.com");
        assert_eq!(input.title, "My Site");
    }

    #[test]
    fn test_record_input_rejections() {
        assert_eq!(message(validate_record_input("", "t")), "Please enter a URL");
        assert_eq!(
            message(validate_record_input("exa mple.com", "t")),
            "URL must not contain spaces"
        );
        assert!(validate_record_input("localhost", "t").is_err());
        assert!(validate_record_input("example.com", "   ").is_err());
    }

    #[test]
    fn test_title_length_is_counted_in_characters() {
        let exactly = "é".repeat(crate::models::MAX_TITLE_CHARS as usize);
        assert!(validate_record_input("example.com", &exactly).is_ok());

        let too_long = "é".repeat(101);
        assert_eq!(
            message(validate_record_input("example.com", &too_long)),
            "Title must be 1 to 100 characters, not counting surrounding spaces"
        );
    }

    #[test]
    fn test_title_padding_is_not_counted() {
        let padded = format!(" {} ", "x".repeat(100));
        let input = validate_record_input("example.com", &padded).unwrap();
        assert_eq!(input.title, "x".repeat(100));
    }

    #[test]
    fn test_sign_in_form() {
        assert_eq!(
            message(SignInForm::new("  ", "pw").check()),
            "Please fill in all fields"
        );
        assert_eq!(
            message(SignInForm::new("nope", "pw").check()),
            "Please enter a valid email address"
        );
        assert!(SignInForm::new(" me@example.com ", "pw").check().is_ok());
        assert_eq!(SignInForm::new(" me@example.com ", "pw").email, "me@example.com");
    }

    #[test]
    fn test_sign_up_form() {
        assert_eq!(
            message(SignUpForm::new("me@example.com", "secret1", "").check()),
            "Please fill in all fields"
        );
        assert_eq!(
            message(SignUpForm::new("me@example.com", "secret1", "secret2").check()),
            "Passwords do not match"
        );
        assert_eq!(
            message(SignUpForm::new("me@example.com", "abc", "abc").check()),
            "Password must be at least 6 characters long"
        );
        assert!(SignUpForm::new("me@example.com", "secret1", "secret1")
            .check()
            .is_ok());
    }

    #[test]
    fn test_reset_form() {
        assert_eq!(
            message(ResetPasswordForm::new("").check()),
            "Please enter your email address"
        );
        assert!(ResetPasswordForm::new("me@example.com").check().is_ok());
    }
}
