// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use qrush::backend::MemoryBackend;
use qrush::cache::{KeyValueStore, MemoryStore, SESSION_CACHE_KEY};
use qrush::config::{Config, Platform};
use qrush::error::{AppError, Result};
use qrush::models::{AuthState, Session, SessionUser};
use qrush::services::encoder::{QrEncoder, QrSymbol};
use qrush::services::share::{
    BrowserShareApi, Clipboard, FileDownloader, LinkOpener, PlatformFacilities, ShareArtifact,
    ShareSheet,
};
use qrush::services::ConfirmDelete;
use qrush::QrushApp;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the stub encoder's export behaves.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub enum ExportBehavior {
    Succeeds,
    NeverReturns,
    Fails,
}

/// Encoder whose export step can be made to hang or fail.
pub struct StubEncoder {
    behavior: ExportBehavior,
    exports: AtomicU32,
}

#[allow(dead_code)]
impl StubEncoder {
    pub const SVG: &'static str = "<svg>stub</svg>";

    pub fn new(behavior: ExportBehavior) -> Self {
        Self {
            behavior,
            exports: AtomicU32::new(0),
        }
    }

    pub fn exports(&self) -> u32 {
        self.exports.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QrEncoder for StubEncoder {
    async fn export_svg(&self, _symbol: QrSymbol) -> Result<String> {
        self.exports.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            ExportBehavior::Succeeds => Ok(Self::SVG.to_string()),
            ExportBehavior::NeverReturns => std::future::pending().await,
            ExportBehavior::Fails => Err(AppError::Export("renderer crashed".to_string())),
        }
    }
}

/// Scriptable stand-in for every platform facility.
#[derive(Default)]
pub struct FakePlatform {
    pub calls: Mutex<Vec<String>>,
    pub share_file_fails: bool,
    pub share_message_fails: bool,
    pub browser_can_share_files: bool,
    pub browser_share_fails: bool,
    pub download_fails: bool,
    pub clipboard_fails: bool,
}

#[allow(dead_code)]
impl FakePlatform {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String, fail: bool) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if fail {
            Err(AppError::ShareFailure("not supported".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ShareSheet for FakePlatform {
    async fn share_file(&self, artifact: &ShareArtifact, dialog_title: &str) -> Result<()> {
        self.record(
            format!("share_file {} {}", artifact.file_name, dialog_title),
            self.share_file_fails,
        )
    }

    async fn share_message(&self, _title: &str, message: &str, _url: &str) -> Result<()> {
        self.record(format!("share_message {}", message), self.share_message_fails)
    }
}

#[async_trait]
impl BrowserShareApi for FakePlatform {
    fn can_share_files(&self, _artifact: &ShareArtifact) -> bool {
        self.browser_can_share_files
    }

    async fn share_files(&self, _title: &str, text: &str, artifact: &ShareArtifact) -> Result<()> {
        self.record(
            format!("browser_share_files {} {}", artifact.file_name, text),
            self.browser_share_fails,
        )
    }

    async fn share_link(&self, _title: &str, _text: &str, url: &str) -> Result<()> {
        self.record(format!("browser_share_link {}", url), self.browser_share_fails)
    }
}

#[async_trait]
impl FileDownloader for FakePlatform {
    async fn download(&self, file_name: &str, data_url: &str) -> Result<()> {
        assert!(data_url.starts_with("data:image/svg+xml;base64,"));
        self.record(format!("download {}", file_name), self.download_fails)
    }
}

#[async_trait]
impl Clipboard for FakePlatform {
    async fn write_text(&self, text: &str) -> Result<()> {
        self.record(format!("copy {}", text), self.clipboard_fails)
    }
}

#[async_trait]
impl LinkOpener for FakePlatform {
    async fn open_url(&self, url: &str) -> Result<()> {
        self.record(format!("open {}", url), false)
    }
}

/// Facilities of a native device: share sheet and link opener only.
#[allow(dead_code)]
pub fn native_facilities(platform: &Arc<FakePlatform>) -> PlatformFacilities {
    PlatformFacilities {
        share_sheet: Some(platform.clone()),
        link_opener: Some(platform.clone()),
        ..Default::default()
    }
}

/// Facilities of a browser. `clipboard` toggles clipboard access.
#[allow(dead_code)]
pub fn web_facilities(platform: &Arc<FakePlatform>, clipboard: bool) -> PlatformFacilities {
    PlatformFacilities {
        browser_share: Some(platform.clone()),
        downloader: Some(platform.clone()),
        clipboard: clipboard.then(|| platform.clone() as Arc<dyn Clipboard>),
        link_opener: Some(platform.clone()),
        ..Default::default()
    }
}

/// Confirmation dialog with a fixed answer.
pub struct Answer(pub bool);

#[async_trait]
impl ConfirmDelete for Answer {
    async fn confirm(&self, _record_id: &str) -> bool {
        self.0
    }
}

/// Everything a test needs to drive and inspect the app.
#[allow(dead_code)]
pub struct TestApp {
    pub app: QrushApp,
    pub backend: Arc<MemoryBackend>,
    pub kv: Arc<MemoryStore>,
    pub encoder: Arc<StubEncoder>,
    pub platform: Arc<FakePlatform>,
}

#[allow(dead_code)]
impl TestApp {
    /// Cached session entry, raw.
    pub async fn cached_session(&self) -> Option<String> {
        self.kv.get(SESSION_CACHE_KEY).await.unwrap()
    }

    /// Wait until the reconciler publishes something other than `Loading`.
    pub async fn settled_state(&self) -> AuthState {
        let mut rx = self.app.reconciler.state();
        let state = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| !matches!(s, AuthState::Loading)),
        )
        .await
        .expect("auth state never settled")
        .expect("reconciler dropped");
        state.clone()
    }
}

/// Build an offline test app.
#[allow(dead_code)]
pub fn create_test_app(
    config: Config,
    behavior: ExportBehavior,
    platform: FakePlatform,
) -> TestApp {
    let backend = Arc::new(MemoryBackend::new());
    let kv = Arc::new(MemoryStore::new());
    let encoder = Arc::new(StubEncoder::new(behavior));
    let platform = Arc::new(platform);

    let facilities = match config.platform {
        Platform::Web => web_facilities(&platform, true),
        Platform::Ios | Platform::Android => native_facilities(&platform),
    };

    let app = QrushApp::from_parts(
        config,
        backend.clone(),
        backend.clone(),
        kv.clone(),
        encoder.clone(),
        facilities,
    )
    .expect("Failed to build test app");

    TestApp {
        app,
        backend,
        kv,
        encoder,
        platform,
    }
}

/// Default offline app on a native platform with a working encoder.
#[allow(dead_code)]
pub fn default_test_app() -> TestApp {
    create_test_app(
        Config::test_default(),
        ExportBehavior::Succeeds,
        FakePlatform::default(),
    )
}

/// Sign `email` in through the app, creating the account first.
#[allow(dead_code)]
pub async fn sign_in(test: &TestApp, email: &str) -> Session {
    test.backend.add_account(email, "secret1");
    let session = test.app.account.sign_in(email, "secret1").await.unwrap();

    let mut rx = test.app.reconciler.state();
    tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| s.session().is_some_and(|held| held.user.id == session.user.id)),
    )
    .await
    .expect("sign-in never reached the reconciler")
    .expect("reconciler dropped");
    session
}

/// A structurally valid session that no backend issued.
#[allow(dead_code)]
pub fn session(user_id: &str, access_token: &str) -> Session {
    Session {
        user: SessionUser {
            id: user_id.to_string(),
            email: format!("{}@example.com", user_id),
        },
        access_token: access_token.to_string(),
        refresh_token: format!("refresh-{}", access_token),
        expires_at: None,
    }
}
