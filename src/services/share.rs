// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sharing saved QR codes through whatever the platform offers.
//!
//! The platform facilities (share sheet, browser share API, downloads,
//! clipboard, link opener) are traits implemented by the host. A
//! [`ShareStrategy`] is picked once at startup by [`select_share_strategy`]
//! so the record controller never branches on the platform itself.

use super::card::render_share_card;
use crate::config::Platform;
use crate::error::{AppError, Notice, Result};
use crate::models::Record;
use crate::time_utils::format_display_date;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::path::PathBuf;
use std::sync::Arc;

pub const SVG_MIME_TYPE: &str = "image/svg+xml";

/// Rendered image handed to a share target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareArtifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub svg: String,
}

impl ShareArtifact {
    pub fn svg(file_name: String, svg: String) -> Self {
        Self {
            file_name,
            mime_type: SVG_MIME_TYPE,
            svg,
        }
    }

    /// `data:` URL of the artifact, as used for browser downloads.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.svg))
    }
}

/// Everything a share target may want to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    /// Summary shown alongside the image
    pub text: String,
    /// The encoded URL
    pub url: String,
    /// Text-only fallback message
    pub message: String,
    pub artifact: ShareArtifact,
}

impl SharePayload {
    /// Share payload for `record`; the artifact is the share card built
    /// around the QR symbol `qr_svg`.
    pub fn for_record(record: &Record, qr_svg: &str) -> Self {
        let card = render_share_card(record, qr_svg, &format_display_date(chrono::Utc::now()));
        Self {
            title: record.title.clone(),
            text: record.share_text(),
            url: record.payload.clone(),
            message: record.share_message(),
            artifact: ShareArtifact::svg(record.artifact_file_name(), card),
        }
    }
}

/// OS share sheet of native platforms.
#[async_trait]
pub trait ShareSheet: Send + Sync {
    async fn share_file(&self, artifact: &ShareArtifact, dialog_title: &str) -> Result<()>;
    async fn share_message(&self, title: &str, message: &str, url: &str) -> Result<()>;
}

/// Browser share API (`navigator.share`).
#[async_trait]
pub trait BrowserShareApi: Send + Sync {
    /// Whether the browser accepts files for sharing.
    fn can_share_files(&self, artifact: &ShareArtifact) -> bool;
    async fn share_files(&self, title: &str, text: &str, artifact: &ShareArtifact) -> Result<()>;
    async fn share_link(&self, title: &str, text: &str, url: &str) -> Result<()>;
}

/// Saves a file for the user (browser download, or a directory on disk).
#[async_trait]
pub trait FileDownloader: Send + Sync {
    async fn download(&self, file_name: &str, data_url: &str) -> Result<()>;
}

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<()>;
}

/// Opens a URL in the browser or the app that handles it.
#[async_trait]
pub trait LinkOpener: Send + Sync {
    async fn open_url(&self, url: &str) -> Result<()>;
}

/// The facilities the host platform provides. Absent ones are `None`.
#[derive(Clone, Default)]
pub struct PlatformFacilities {
    pub share_sheet: Option<Arc<dyn ShareSheet>>,
    pub browser_share: Option<Arc<dyn BrowserShareApi>>,
    pub downloader: Option<Arc<dyn FileDownloader>>,
    pub clipboard: Option<Arc<dyn Clipboard>>,
    pub link_opener: Option<Arc<dyn LinkOpener>>,
}

/// How a share attempt ended. Sharing never fails hard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// Image handed to a share target
    Shared,
    /// Image handoff failed, text message shared instead
    SharedMessageOnly,
    /// Link shared through the browser share API
    SharedLink,
    DownloadedAndCopied,
    DownloadedOnly,
    /// Download failed, URL copied to the clipboard
    CopiedLink,
    Failed(String),
}

impl ShareOutcome {
    /// Notice to show, if any. Completed share sheets need none.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            ShareOutcome::Shared | ShareOutcome::SharedMessageOnly | ShareOutcome::SharedLink => {
                None
            }
            ShareOutcome::DownloadedAndCopied => Some(Notice::success(
                "Success",
                "QR code downloaded and URL copied to clipboard",
            )),
            ShareOutcome::DownloadedOnly => {
                Some(Notice::success("Downloaded", "QR code image downloaded"))
            }
            ShareOutcome::CopiedLink => Some(Notice::success("Copied", "URL copied to clipboard")),
            ShareOutcome::Failed(reason) => {
                Some(AppError::ShareFailure(reason.clone()).notice())
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ShareOutcome::Failed(_))
    }
}

#[async_trait]
pub trait ShareStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn share(&self, payload: &SharePayload) -> ShareOutcome;
}

/// Native share sheet with a message-only fallback.
pub struct NativeShare {
    sheet: Arc<dyn ShareSheet>,
}

impl NativeShare {
    pub fn new(sheet: Arc<dyn ShareSheet>) -> Self {
        Self { sheet }
    }
}

#[async_trait]
impl ShareStrategy for NativeShare {
    fn name(&self) -> &'static str {
        "native"
    }

    async fn share(&self, payload: &SharePayload) -> ShareOutcome {
        let err = match self.sheet.share_file(&payload.artifact, &payload.title).await {
            Ok(()) => return ShareOutcome::Shared,
            Err(e) => e,
        };
        tracing::warn!(error = %err, "Image share failed, sharing message instead");

        match self
            .sheet
            .share_message(&payload.title, &payload.message, &payload.url)
            .await
        {
            Ok(()) => ShareOutcome::SharedMessageOnly,
            Err(e) => {
                tracing::error!(error = %e, "Message share failed");
                ShareOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Download the image and copy the URL to the clipboard.
pub struct DownloadAndCopy {
    downloader: Arc<dyn FileDownloader>,
    clipboard: Option<Arc<dyn Clipboard>>,
}

impl DownloadAndCopy {
    pub fn new(downloader: Arc<dyn FileDownloader>, clipboard: Option<Arc<dyn Clipboard>>) -> Self {
        Self {
            downloader,
            clipboard,
        }
    }

    async fn copy_url(&self, url: &str) -> Result<bool> {
        match &self.clipboard {
            Some(clipboard) => clipboard.write_text(url).await.map(|()| true),
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ShareStrategy for DownloadAndCopy {
    fn name(&self) -> &'static str {
        "download-and-copy"
    }

    async fn share(&self, payload: &SharePayload) -> ShareOutcome {
        let artifact = &payload.artifact;
        if let Err(e) = self
            .downloader
            .download(&artifact.file_name, &artifact.data_url())
            .await
        {
            tracing::warn!(error = %e, "Download failed, copying URL only");
            return match self.copy_url(&payload.url).await {
                Ok(true) => ShareOutcome::CopiedLink,
                Ok(false) => ShareOutcome::Failed(e.to_string()),
                Err(copy_err) => ShareOutcome::Failed(copy_err.to_string()),
            };
        }

        match self.copy_url(&payload.url).await {
            Ok(true) => ShareOutcome::DownloadedAndCopied,
            Ok(false) => ShareOutcome::DownloadedOnly,
            Err(e) => {
                tracing::debug!(error = %e, "Clipboard write failed after download");
                ShareOutcome::DownloadedOnly
            }
        }
    }
}

/// Browser share API, falling back to [`DownloadAndCopy`].
pub struct BrowserShare {
    api: Arc<dyn BrowserShareApi>,
    fallback: DownloadAndCopy,
}

impl BrowserShare {
    pub fn new(api: Arc<dyn BrowserShareApi>, fallback: DownloadAndCopy) -> Self {
        Self { api, fallback }
    }
}

#[async_trait]
impl ShareStrategy for BrowserShare {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn share(&self, payload: &SharePayload) -> ShareOutcome {
        if !self.api.can_share_files(&payload.artifact) {
            return self.fallback.share(payload).await;
        }

        let err = match self
            .api
            .share_files(&payload.title, &payload.text, &payload.artifact)
            .await
        {
            Ok(()) => return ShareOutcome::Shared,
            Err(e) => e,
        };
        tracing::warn!(error = %err, "File share failed, sharing link instead");

        match self
            .api
            .share_link(&payload.title, &payload.text, &payload.url)
            .await
        {
            Ok(()) => ShareOutcome::SharedLink,
            Err(e) => {
                tracing::warn!(error = %e, "Link share failed, downloading instead");
                self.fallback.share(payload).await
            }
        }
    }
}

/// Pick the share strategy for `platform` from the available facilities.
pub fn select_share_strategy(
    platform: Platform,
    facilities: &PlatformFacilities,
) -> Result<Arc<dyn ShareStrategy>> {
    if !platform.is_web() {
        if let Some(sheet) = &facilities.share_sheet {
            return Ok(Arc::new(NativeShare::new(sheet.clone())));
        }
    }

    let downloader = facilities.downloader.clone().ok_or_else(|| {
        AppError::ShareFailure(format!("No way to share on {:?}", platform))
    })?;
    let download = DownloadAndCopy::new(downloader, facilities.clipboard.clone());

    let strategy: Arc<dyn ShareStrategy> = match &facilities.browser_share {
        Some(api) if platform.is_web() => Arc::new(BrowserShare::new(api.clone(), download)),
        _ => Arc::new(download),
    };
    Ok(strategy)
}

/// Downloader that writes files into a directory, for headless hosts.
pub struct DirectoryDownloader {
    dir: PathBuf,
}

impl DirectoryDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FileDownloader for DirectoryDownloader {
    async fn download(&self, file_name: &str, data_url: &str) -> Result<()> {
        let encoded = data_url
            .split_once(";base64,")
            .map(|(_, data)| data)
            .ok_or_else(|| AppError::ShareFailure("Unsupported data URL".to_string()))?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| AppError::ShareFailure(format!("Bad artifact encoding: {}", e)))?;

        // Keep the file inside `dir` whatever the title contains.
        let safe_name: String = file_name
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| {
                AppError::ShareFailure(format!("Failed to create {}: {}", self.dir.display(), e))
            })?;
        let path = self.dir.join(safe_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| {
                AppError::ShareFailure(format!("Failed to write {}: {}", path.display(), e))
            })?;

        tracing::info!(path = %path.display(), "Saved QR code image");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Recorder {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn record(&self, call: String) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                Err(AppError::ShareFailure("unavailable".to_string()))
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FileDownloader for Recorder {
        async fn download(&self, file_name: &str, _data_url: &str) -> Result<()> {
            self.record(format!("download {}", file_name))
        }
    }

    #[async_trait]
    impl Clipboard for Recorder {
        async fn write_text(&self, text: &str) -> Result<()> {
            self.record(format!("copy {}", text))
        }
    }

    fn payload() -> SharePayload {
        SharePayload {
            title: "Site".to_string(),
            text: "Check out this QR code: Site".to_string(),
            url: "https://example.com".to_string(),
            message: "Site\nhttps://example.com".to_string(),
            artifact: ShareArtifact::svg("Site.svg".to_string(), "<svg/>".to_string()),
        }
    }

    #[test]
    fn test_payload_for_record_carries_share_card() {
        let record = Record {
            id: "7".to_string(),
            owner_id: "u1".to_string(),
            title: "My Site".to_string(),
            payload: "https://example.com".to_string(),
            rendered_artifact: None,
            created_at: chrono::Utc::now(),
        };
        let payload = SharePayload::for_record(&record, "<svg>qr</svg>");

        assert_eq!(payload.artifact.file_name, "My Site.svg");
        assert_eq!(payload.text, "Check out this QR code: My Site");
        let card = &payload.artifact.svg;
        assert!(card.contains(">My Site</text>"));
        assert!(card.contains(">https://example.com</text>"));
        assert!(card.contains(&format!(
            "Generated with QRush • {}",
            format_display_date(chrono::Utc::now())
        )));
        assert!(card.contains(&STANDARD.encode("<svg>qr</svg>")));
    }

    #[test]
    fn test_data_url() {
        let artifact = ShareArtifact::svg("a.svg".to_string(), "<svg/>".to_string());
        assert_eq!(artifact.data_url(), "data:image/svg+xml;base64,PHN2Zy8+");
    }

    #[tokio::test]
    async fn test_download_and_copy() {
        let downloader = Arc::new(Recorder::default());
        let clipboard = Arc::new(Recorder::default());
        let strategy = DownloadAndCopy::new(downloader.clone(), Some(clipboard.clone()));

        assert_eq!(strategy.share(&payload()).await, ShareOutcome::DownloadedAndCopied);
        assert_eq!(downloader.calls(), vec!["download Site.svg"]);
        assert_eq!(clipboard.calls(), vec!["copy https://example.com"]);
    }

    #[tokio::test]
    async fn test_download_without_clipboard() {
        let strategy = DownloadAndCopy::new(Arc::new(Recorder::default()), None);
        let outcome = strategy.share(&payload()).await;

        assert_eq!(outcome, ShareOutcome::DownloadedOnly);
        assert_eq!(
            outcome.notice().unwrap().message,
            "QR code image downloaded"
        );
    }

    #[tokio::test]
    async fn test_failed_download_without_clipboard_is_failure() {
        let strategy = DownloadAndCopy::new(Arc::new(Recorder::failing()), None);
        let outcome = strategy.share(&payload()).await;
        assert!(outcome.is_failure());
        assert_eq!(outcome.notice().unwrap().message, "Failed to share QR code");
    }

    #[test]
    fn test_native_platform_without_anything_is_an_error() {
        let result = select_share_strategy(Platform::Android, &PlatformFacilities::default());
        assert!(matches!(result, Err(AppError::ShareFailure(_))));
    }

    #[tokio::test]
    async fn test_directory_downloader_writes_decoded_file() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = DirectoryDownloader::new(dir.path());
        let artifact = ShareArtifact::svg("a/b.svg".to_string(), "<svg/>".to_string());

        downloader
            .download(&artifact.file_name, &artifact.data_url())
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("a_b.svg")).unwrap();
        assert_eq!(written, "<svg/>");
    }
}
