// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod record;
pub mod session;

pub use record::{DraftQr, NewRecord, Record, MAX_TITLE_CHARS};
pub use session::{AuthState, AuthStateKind, Session, SessionEvent, SessionUser, SignUpOutcome};
