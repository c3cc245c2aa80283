// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! QR symbol encoding and SVG export.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use qrcode::render::svg;
use qrcode::QrCode;
use std::time::Duration;

const SVG_MIN_DIMENSION: u32 = 200;
const DARK_COLOR: &str = "#000000";
const LIGHT_COLOR: &str = "#ffffff";

/// An encoded symbol, ready to export.
pub struct QrSymbol {
    pub payload: String,
    code: QrCode,
}

impl QrSymbol {
    /// Modules per side.
    pub fn width(&self) -> usize {
        self.code.width()
    }

    fn render_svg(&self) -> String {
        self.code
            .render::<svg::Color>()
            .min_dimensions(SVG_MIN_DIMENSION, SVG_MIN_DIMENSION)
            .dark_color(svg::Color(DARK_COLOR))
            .light_color(svg::Color(LIGHT_COLOR))
            .build()
    }
}

/// Turns payloads into symbols and symbols into SVG artifacts.
#[async_trait]
pub trait QrEncoder: Send + Sync {
    /// Encode `payload`. Fails with `InvalidInput` if it does not fit in a
    /// QR symbol.
    fn encode(&self, payload: &str) -> Result<QrSymbol> {
        let code = QrCode::new(payload.as_bytes()).map_err(|e| {
            AppError::InvalidInput(format!("Cannot encode this URL as a QR code: {}", e))
        })?;
        Ok(QrSymbol {
            payload: payload.to_string(),
            code,
        })
    }

    /// Export an encoded symbol as SVG markup.
    async fn export_svg(&self, symbol: QrSymbol) -> Result<String>;
}

/// Default encoder. Rendering runs on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgQrEncoder;

#[async_trait]
impl QrEncoder for SvgQrEncoder {
    async fn export_svg(&self, symbol: QrSymbol) -> Result<String> {
        tokio::task::spawn_blocking(move || symbol.render_svg())
            .await
            .map_err(|e| AppError::Export(format!("SVG render task failed: {}", e)))
    }
}

/// Export `symbol`, giving up after `timeout`.
pub async fn export_with_timeout(
    encoder: &dyn QrEncoder,
    symbol: QrSymbol,
    timeout: Duration,
) -> Result<String> {
    tokio::time::timeout(timeout, encoder.export_svg(symbol))
        .await
        .map_err(|_| AppError::ExportTimeout(timeout))?
}

/// Encode and export `payload`.
///
/// Encoding errors are returned. Export errors and timeouts are logged and
/// yield `None`, since a record without an artifact is still usable.
pub async fn render_artifact(
    encoder: &dyn QrEncoder,
    payload: &str,
    timeout: Duration,
) -> Result<Option<String>> {
    let symbol = encoder.encode(payload)?;
    match export_with_timeout(encoder, symbol, timeout).await {
        Ok(svg) => Ok(Some(svg)),
        Err(e) => {
            tracing::warn!(error = %e, "QR export failed, continuing without artifact");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverExports;

    #[async_trait]
    impl QrEncoder for NeverExports {
        async fn export_svg(&self, _symbol: QrSymbol) -> Result<String> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_svg_export() {
        let encoder = SvgQrEncoder;
        let symbol = encoder.encode("https://example.com").unwrap();
        assert!(symbol.width() >= 21);

        let svg = export_with_timeout(&encoder, symbol, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains(DARK_COLOR));
    }

    #[tokio::test]
    async fn test_export_timeout() {
        let encoder = NeverExports;
        let symbol = encoder.encode("https://example.com").unwrap();

        let result = export_with_timeout(&encoder, symbol, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(AppError::ExportTimeout(_))));

        let artifact = render_artifact(&encoder, "https://example.com", Duration::from_millis(20))
            .await
            .unwrap();
        assert!(artifact.is_none());
    }

    #[test]
    fn test_oversized_payload_is_invalid_input() {
        let payload = format!("https://example.com/{}", "x".repeat(8000));
        assert!(matches!(
            SvgQrEncoder.encode(&payload),
            Err(AppError::InvalidInput(_))
        ));
    }
}
