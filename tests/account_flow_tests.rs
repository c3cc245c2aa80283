// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in, registration and navigation through the assembled app.

mod common;

use common::default_test_app;
use qrush::backend::AuthGateway;
use qrush::config::PASSWORD_RESET_REDIRECT;
use qrush::error::AppError;
use qrush::models::AuthState;
use qrush::routes::{initial_route, parse_deep_link, resolve_route, Route};
use std::time::Duration;

#[tokio::test]
async fn test_empty_sign_in_never_reaches_backend() {
    let test = default_test_app();
    test.backend.add_account("me@example.com", "secret1");

    let err = test.app.account.sign_in("   ", "").await.unwrap_err();
    assert!(matches!(&err, AppError::InvalidInput(m) if m == "Please fill in all fields"));
    assert!(test.backend.current_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_up_then_land_on_home() {
    let test = default_test_app();
    let _handle = test.app.start().await;
    assert_eq!(
        initial_route(&test.settled_state().await),
        Some(Route::Login)
    );

    let err = test
        .app
        .account
        .sign_up("new@example.com", "secret1", "secret2")
        .await
        .unwrap_err();
    assert!(matches!(&err, AppError::InvalidInput(m) if m == "Passwords do not match"));

    let notice = test
        .app
        .account
        .sign_up("new@example.com", "secret1", "secret1")
        .await
        .unwrap();
    assert!(notice.message.contains("check your email"));

    let mut rx = test.app.reconciler.state();
    let authenticated = rx.wait_for(AuthState::is_authenticated);
    let state = tokio::time::timeout(Duration::from_secs(5), authenticated)
        .await
        .unwrap()
        .unwrap()
        .clone();
    assert_eq!(initial_route(&state), Some(Route::Home));
    assert_eq!(state.session().unwrap().user.email, "new@example.com");
}

#[tokio::test]
async fn test_duplicate_registration_is_auth_error() {
    let test = default_test_app();
    test.backend.add_account("me@example.com", "secret1");

    let err = test
        .app
        .account
        .sign_up("me@example.com", "secret1", "secret1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
}

#[tokio::test]
async fn test_forgot_password() {
    let test = default_test_app();

    let err = test.app.account.request_password_reset("").await.unwrap_err();
    assert!(matches!(&err, AppError::InvalidInput(m) if m == "Please enter your email address"));

    let notice = test
        .app
        .account
        .request_password_reset("me@example.com")
        .await
        .unwrap();
    assert!(notice.message.starts_with("Password reset email sent!"));
    assert_eq!(
        test.backend.password_resets(),
        vec![("me@example.com".to_string(), PASSWORD_RESET_REDIRECT.to_string())]
    );
}

#[tokio::test]
async fn test_deep_link_is_gated_by_auth_state() {
    let test = default_test_app();
    let _handle = test.app.start().await;
    let prefixes = test.app.config.link_prefixes();

    let link = parse_deep_link("qrush://add-record?url=example.com", &prefixes).unwrap();
    assert_eq!(link.route, Route::AddRecord);
    assert_eq!(
        resolve_route(link.route, &test.settled_state().await),
        Route::Login
    );

    common::sign_in(&test, "me@example.com").await;
    let state = test.app.reconciler.current();
    assert_eq!(resolve_route(link.route, &state), Route::AddRecord);

    let record = test
        .app
        .records
        .create_record(link.param("url").unwrap(), "From link")
        .await
        .unwrap();
    assert_eq!(record.payload, "https://example.com");

    let web = parse_deep_link("https://qrush.app/login", &prefixes).unwrap();
    assert_eq!(resolve_route(web.route, &state), Route::Home);
}
