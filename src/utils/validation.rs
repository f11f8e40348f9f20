//! 输入校验
//!
//! All validators return `LmsError::Validation` so handlers can `?` them.

use url::Url;

use crate::errors::{LmsError, Result};

/// 危险协议列表
const DANGEROUS_PROTOCOLS: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
];

/// 校验邮箱格式，返回规范化（去空格、小写）后的邮箱
pub fn validate_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();

    if email.is_empty() || email.len() > 254 {
        return Err(LmsError::validation("Email is required"));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(LmsError::validation("Invalid email address"));
    };

    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..");

    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(LmsError::validation("Invalid email address"));
    }

    Ok(email)
}

pub fn validate_password(password: &str, min_len: usize) -> Result<()> {
    if password.chars().count() < min_len {
        return Err(LmsError::validation(format!(
            "Password must be at least {} characters",
            min_len
        )));
    }
    Ok(())
}

/// 校验必填文本字段（去空格后非空，且不超过最大长度）
pub fn validate_required(field: &str, value: &str, max_len: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LmsError::validation(format!("{} is required", field)));
    }
    if value.chars().count() > max_len {
        return Err(LmsError::validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(value.to_string())
}

/// 验证 URL 安全性
///
/// 只允许 http:// 和 https://，阻止 javascript:, data:, file: 等协议
pub fn validate_http_url(url: &str) -> Result<()> {
    let url = url.trim();

    if url.is_empty() {
        return Err(LmsError::validation("URL cannot be empty"));
    }

    let url_lower = url.to_lowercase();

    for proto in DANGEROUS_PROTOCOLS {
        if url_lower.starts_with(proto) {
            return Err(LmsError::validation(format!(
                "Dangerous protocol blocked: {}",
                proto
            )));
        }
    }

    if !url_lower.starts_with("http://") && !url_lower.starts_with("https://") {
        return Err(LmsError::validation(
            "URL must start with http:// or https://",
        ));
    }

    Url::parse(url).map_err(|e| LmsError::validation(format!("Invalid URL format: {}", e)))?;

    Ok(())
}

/// 由标题生成 URL slug：小写字母数字，其余字符折叠为单个 `-`
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "course".to_string()
    } else {
        slug
    }
}
