// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Saved QR code model for storage and display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::time_utils::format_display_date;

/// Longest title accepted for a record, in characters.
pub const MAX_TITLE_CHARS: u64 = 100;

/// Payloads longer than this are shortened for display.
const DISPLAY_PAYLOAD_MAX: usize = 50;
const DISPLAY_PAYLOAD_EDGE: usize = 25;

/// A saved QR code row in the `qr_codes` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Record {
    /// Server-assigned ID
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Owner (backend user ID of the creator)
    #[serde(rename = "user_id")]
    pub owner_id: String,
    /// Display title
    pub title: String,
    /// Text encoded into the symbol
    #[serde(rename = "url")]
    pub payload: String,
    /// Exported SVG markup, absent if export failed or timed out
    #[serde(rename = "qr_data", default)]
    pub rendered_artifact: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// Creation date as shown on cards, e.g. `Oct 16, 2026`.
    pub fn display_date(&self) -> String {
        format_display_date(self.created_at)
    }

    /// Payload split into the lines shown on the share card.
    pub fn display_payload_lines(&self) -> Vec<String> {
        let chars: Vec<char> = self.payload.chars().collect();
        if chars.len() <= DISPLAY_PAYLOAD_MAX {
            return vec![self.payload.clone()];
        }
        let head: String = chars[..DISPLAY_PAYLOAD_EDGE].iter().collect();
        let tail: String = chars[chars.len() - DISPLAY_PAYLOAD_EDGE..].iter().collect();
        vec![format!("{}...", head), format!("...{}", tail)]
    }

    /// Summary text handed to share targets together with the image.
    pub fn share_text(&self) -> String {
        format!("Check out this QR code: {}", self.title)
    }

    /// Message used when only text can be shared.
    pub fn share_message(&self) -> String {
        format!("{}\n{}", self.title, self.payload)
    }

    /// File name for downloaded artifacts.
    pub fn artifact_file_name(&self) -> String {
        let stem = self.title.trim();
        if stem.is_empty() {
            "qrcode.svg".to_string()
        } else {
            format!("{}.svg", stem)
        }
    }
}

/// Insert payload for a new record. ID and creation time are server-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRecord {
    pub user_id: String,
    pub title: String,
    pub url: String,
    pub qr_data: Option<String>,
}

/// Transient state of the creation form before saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftQr {
    pub raw_input: String,
    /// `None` while the input cannot be encoded
    pub normalized_payload: Option<String>,
}

impl DraftQr {
    /// Derive the payload from raw input.
    ///
    /// Input with an `http://` or `https://` prefix is kept as is. Otherwise it
    /// must contain a `.` and gets `https://` prepended. Empty input or input
    /// with whitespace never yields a payload.
    pub fn new(raw_input: impl Into<String>) -> Self {
        let raw_input = raw_input.into();
        let normalized_payload = normalize_payload(&raw_input);
        Self {
            raw_input,
            normalized_payload,
        }
    }

    pub fn is_encodable(&self) -> bool {
        self.normalized_payload.is_some()
    }
}

fn normalize_payload(raw: &str) -> Option<String> {
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return None;
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }
    if raw.contains('.') {
        return Some(format!("https://{}", raw));
    }
    None
}

/// Accept both numeric and string IDs from the backend.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Int(i64),
        Str(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Int(n) => n.to_string(),
        RawId::Str(s) => s,
    })
}
