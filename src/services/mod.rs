// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application services.

pub mod account;
pub mod card;
pub mod encoder;
pub mod reconciler;
pub mod records;
pub mod retry;
pub mod share;
pub mod validation;

pub use account::AccountService;
pub use encoder::{QrEncoder, SvgQrEncoder};
pub use reconciler::{ReconcilerHandle, SessionReconciler};
pub use records::{ConfirmDelete, DeleteConfirmation, DeleteOutcome, RecordController};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use share::{select_share_strategy, PlatformFacilities, ShareOutcome, ShareStrategy};
