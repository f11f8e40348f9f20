//! 证书 PDF 渲染
//!
//! 直接输出 PDF 1.4：单页 A4 横向，标准 Type1 字体（Helvetica / Helvetica-Bold），
//! 验证二维码以矢量方块绘制，不依赖图片解码。

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use qrcode::{Color, QrCode};

use crate::errors::{LmsError, Result};

/// A4 横向（pt）
pub const PAGE_WIDTH: f32 = 842.0;
pub const PAGE_HEIGHT: f32 = 595.0;

const QR_SIZE: f32 = 120.0;
const QR_QUIET_ZONE: usize = 4;
const MAX_TEXT_WIDTH: f32 = 700.0;
const MARGIN_X: f32 = 70.0;
/// 左下角文字区域，右侧留给二维码
const LEFT_COLUMN_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN_X - QR_SIZE - 20.0;

/// 证书上需要印出的内容
#[derive(Debug, Clone)]
pub struct CertificateDocument {
    pub certificate_id: String,
    pub student_name: String,
    pub course_title: String,
    pub instructor_name: String,
    pub issuer_name: String,
    pub issued_at: DateTime<Utc>,
    pub verification_url: String,
}

#[derive(Clone, Copy)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Helvetica 近似字宽（千分之一 em）
fn glyph_width(c: char, font: Font) -> f32 {
    let base = match c {
        ' ' | 'f' | 't' | 'I' | '!' | '/' | '[' | ']' => 278.0,
        'i' | 'j' | 'l' | '.' | ',' | '\'' | ':' | ';' | '|' => 222.0,
        'm' => 833.0,
        'w' | 'M' => 722.0,
        'W' => 944.0,
        'r' | '(' | ')' | '-' => 333.0,
        'A'..='Z' => 667.0,
        _ => 556.0,
    };
    match font {
        Font::Regular => base,
        Font::Bold => base * 1.06,
    }
}

fn text_width(text: &str, font: Font, size: f32) -> f32 {
    text.chars().map(|c| glyph_width(c, font)).sum::<f32>() * size / 1000.0
}

/// WinAnsiEncoding 中的字节；Latin-1 区间直接对应，0x80..0x9F 为 CP1252 扩展
fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    if (0xA0..=0xFF).contains(&code) {
        return Some(code as u8);
    }
    let byte = match c {
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// 字符串转义；WinAnsi 字符写成 `\ddd` 八进制，编码外的字符替换为 `?`
fn escape_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => match win_ansi_byte(c) {
                Some(byte) => {
                    let _ = write!(out, "\\{:03o}", byte);
                }
                None => out.push('?'),
            },
        }
    }
    out
}

/// 缩小字号直到放得下，仍放不下则截断
fn fit_text(text: &str, font: Font, size: f32, min_size: f32, max_width: f32) -> (String, f32) {
    let mut size = size;
    while size > min_size && text_width(text, font, size) > max_width {
        size -= 1.0;
    }
    if text_width(text, font, size) <= max_width {
        return (text.to_string(), size);
    }

    let mut truncated: String = text.to_string();
    while !truncated.is_empty() && text_width(&format!("{}...", truncated), font, size) > max_width
    {
        truncated.pop();
    }
    (format!("{}...", truncated.trim_end()), size)
}

struct ContentBuilder {
    ops: String,
}

impl ContentBuilder {
    fn new() -> Self {
        Self { ops: String::new() }
    }

    fn text_at(&mut self, text: &str, font: Font, size: f32, x: f32, y: f32) {
        let _ = writeln!(
            self.ops,
            "BT /{} {:.1} Tf {:.2} {:.2} Td ({}) Tj ET",
            font.resource(),
            size,
            x,
            y,
            escape_pdf_text(text)
        );
    }

    fn centered(&mut self, text: &str, font: Font, size: f32, y: f32) {
        let (text, size) = fit_text(text, font, size, 12.0, MAX_TEXT_WIDTH);
        let x = (PAGE_WIDTH - text_width(&text, font, size)) / 2.0;
        self.text_at(&text, font, size, x, y);
    }

    /// 左下角一行，不越过二维码
    fn left_column(&mut self, text: &str, font: Font, size: f32, y: f32) {
        let (text, size) = fit_text(text, font, size, 7.0, LEFT_COLUMN_WIDTH);
        self.text_at(&text, font, size, MARGIN_X, y);
    }

    fn fill_color(&mut self, r: f32, g: f32, b: f32) {
        let _ = writeln!(self.ops, "{:.3} {:.3} {:.3} rg", r, g, b);
    }

    fn frame(&mut self, inset: f32, line_width: f32) {
        let _ = writeln!(
            self.ops,
            "0.150 0.250 0.450 RG {:.1} w {:.2} {:.2} {:.2} {:.2} re S",
            line_width,
            inset,
            inset,
            PAGE_WIDTH - 2.0 * inset,
            PAGE_HEIGHT - 2.0 * inset
        );
    }

    /// 二维码：白底 + 每个深色模块一个矩形
    fn qr(&mut self, code: &QrCode, x: f32, y: f32, size: f32) {
        let width = code.width();
        let modules = width + 2 * QR_QUIET_ZONE;
        let m = size / modules as f32;

        let _ = writeln!(
            self.ops,
            "q 1 1 1 rg {:.2} {:.2} {:.2} {:.2} re f 0 0 0 rg",
            x, y, size, size
        );
        for (i, color) in code.to_colors().into_iter().enumerate() {
            if color != Color::Dark {
                continue;
            }
            let col = i % width + QR_QUIET_ZONE;
            let row = i / width + QR_QUIET_ZONE;
            let px = x + col as f32 * m;
            let py = y + (modules - 1 - row) as f32 * m;
            let _ = writeln!(self.ops, "{:.3} {:.3} {:.3} {:.3} re", px, py, m, m);
        }
        self.ops.push_str("f Q\n");
    }

    fn finish(self) -> String {
        self.ops
    }
}

fn build_content(doc: &CertificateDocument, qr: &QrCode) -> String {
    let mut c = ContentBuilder::new();

    c.frame(18.0, 4.0);
    c.frame(30.0, 1.0);

    c.fill_color(0.15, 0.25, 0.45);
    c.centered("CERTIFICATE OF COMPLETION", Font::Bold, 34.0, 480.0);

    c.fill_color(0.2, 0.2, 0.2);
    c.centered("This is to certify that", Font::Regular, 16.0, 430.0);

    c.fill_color(0.0, 0.0, 0.0);
    c.centered(&doc.student_name, Font::Bold, 30.0, 385.0);

    c.fill_color(0.2, 0.2, 0.2);
    c.centered(
        "has successfully completed the course",
        Font::Regular,
        16.0,
        345.0,
    );

    c.fill_color(0.15, 0.25, 0.45);
    c.centered(&doc.course_title, Font::Bold, 24.0, 300.0);

    c.fill_color(0.1, 0.1, 0.1);
    c.left_column(&doc.issuer_name, Font::Bold, 14.0, 200.0);
    c.left_column(
        &format!("Instructor: {}", doc.instructor_name),
        Font::Regular,
        12.0,
        175.0,
    );
    c.left_column(
        &format!("Issued on: {}", doc.issued_at.format("%Y-%m-%d")),
        Font::Regular,
        12.0,
        155.0,
    );
    c.left_column(
        &format!("Certificate ID: {}", doc.certificate_id),
        Font::Regular,
        12.0,
        135.0,
    );

    c.fill_color(0.35, 0.35, 0.35);
    c.left_column(
        &format!("Verify at: {}", doc.verification_url),
        Font::Regular,
        9.0,
        95.0,
    );

    c.qr(qr, PAGE_WIDTH - MARGIN_X - QR_SIZE, MARGIN_X, QR_SIZE);

    c.finish()
}

fn pdf_date(at: DateTime<Utc>) -> String {
    format!("D:{}Z", at.format("%Y%m%d%H%M%S"))
}

/// 渲染证书 PDF
pub fn render_certificate(doc: &CertificateDocument) -> Result<Vec<u8>> {
    let qr = QrCode::new(doc.verification_url.as_bytes())
        .map_err(|e| LmsError::certificate(format!("QR code generation failed: {}", e)))?;

    let content = build_content(doc, &qr);

    let objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Resources << /Font << /F1 4 0 R /F2 5 0 R >> >> /Contents 6 0 R >>",
            PAGE_WIDTH, PAGE_HEIGHT
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ),
        format!(
            "<< /Title (Certificate {}) /Producer (learnhub) /CreationDate ({}) >>",
            escape_pdf_text(&doc.certificate_id),
            pdf_date(doc.issued_at)
        ),
    ];

    let mut out: Vec<u8> = Vec::with_capacity(content.len() + 2048);
    out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in &offsets {
        let _ = write!(xref, "{:010} 00000 n \n", offset);
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R /Info 7 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    );
    out.extend_from_slice(xref.as_bytes());

    Ok(out)
}
