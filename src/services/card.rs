// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Share card: the image handed to share targets and downloads.
//!
//! A 400x600 SVG with the QRush header, the QR symbol, the record title,
//! the URL (shortened to two lines when long) and a dated footer.

use crate::models::Record;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt::Write;

const CARD_WIDTH: u32 = 400;
const CARD_HEIGHT: u32 = 600;
const QR_SIZE: u32 = 200;
const QR_Y: u32 = 120;
const BRAND_COLOR: &str = "#7ed321";

/// Rough characters per title line at 18px bold in a 360px column.
const TITLE_LINE_CHARS: usize = 32;

/// Compose the share card for `record` around its QR symbol `qr_svg`.
///
/// `generated_on` is printed in the footer.
pub fn render_share_card(record: &Record, qr_svg: &str, generated_on: &str) -> String {
    let center = CARD_WIDTH / 2;
    let qr_x = (CARD_WIDTH - QR_SIZE) / 2;
    let mut svg = String::new();

    let _ = write!(
        svg,
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}""#,
            r#" viewBox="0 0 {w} {h}" font-family="Arial, sans-serif" text-anchor="middle">"#,
        ),
        w = CARD_WIDTH,
        h = CARD_HEIGHT,
    );
    let _ = write!(
        svg,
        concat!(
            r##"<rect width="{w}" height="{h}" fill="#ffffff"/>"##,
            r##"<rect x="10" y="10" width="{bw}" height="{bh}" fill="none""##,
            r##" stroke="#e0e0e0" stroke-width="2"/>"##,
        ),
        w = CARD_WIDTH,
        h = CARD_HEIGHT,
        bw = CARD_WIDTH - 20,
        bh = CARD_HEIGHT - 20,
    );
    let _ = write!(
        svg,
        concat!(
            r#"<rect x="20" y="20" width="{hw}" height="80" fill="{brand}"/>"#,
            r##"<text x="{c}" y="55" fill="#ffffff" font-size="24" font-weight="bold">"##,
            "QRush</text>",
            r##"<text x="{c}" y="80" fill="#ffffff" font-size="14">"##,
            "Quick &amp; Easy QR Codes</text>",
        ),
        hw = CARD_WIDTH - 40,
        brand = BRAND_COLOR,
        c = center,
    );
    let _ = write!(
        svg,
        concat!(
            r#"<image x="{x}" y="{y}" width="{s}" height="{s}""#,
            r#" href="data:image/svg+xml;base64,{data}"/>"#,
        ),
        x = qr_x,
        y = QR_Y,
        s = QR_SIZE,
        data = STANDARD.encode(qr_svg),
    );

    let mut y = QR_Y + QR_SIZE + 40;
    let title_lines = wrap_words(&record.title, TITLE_LINE_CHARS);
    for (i, line) in title_lines.iter().enumerate() {
        if i > 0 {
            y += 25;
        }
        let _ = write!(
            svg,
            concat!(
                r##"<text x="{c}" y="{y}" fill="#333333" font-size="18" font-weight="bold">"##,
                "{t}</text>",
            ),
            c = center,
            y = y,
            t = escape_xml(line),
        );
    }

    y += 40;
    let _ = write!(
        svg,
        r##"<text x="{c}" y="{y}" fill="#666666" font-size="12">Scan to visit:</text>"##,
        c = center,
    );
    y += 20;
    for line in record.display_payload_lines() {
        let _ = write!(
            svg,
            r#"<text x="{c}" y="{y}" fill="{brand}" font-size="14">{t}</text>"#,
            c = center,
            brand = BRAND_COLOR,
            t = escape_xml(&line),
        );
        y += 20;
    }

    let _ = write!(
        svg,
        concat!(
            r##"<text x="{c}" y="{fy}" fill="#999999" font-size="10">"##,
            "Generated with QRush • {d}</text></svg>",
        ),
        c = center,
        fy = CARD_HEIGHT - 30,
        d = escape_xml(generated_on),
    );
    svg
}

/// Greedy word wrap. A single word longer than `max_chars` gets its own line.
fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > max_chars {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    lines.push(line);
    lines
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
