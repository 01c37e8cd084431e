use regex::Regex;
use std::sync::OnceLock;

use super::ApiError;

pub const MAX_TEXT_CHARS: usize = 1000;
pub const MAX_CATEGORY_NAME_CHARS: usize = 50;
pub const MAX_CATEGORY_DESCRIPTION_CHARS: usize = 200;
pub const MIN_PASSWORD_CHARS: usize = 6;
pub const MAX_PASSWORD_CHARS: usize = 50;
pub const MAX_PATH_FILTER_CHARS: usize = 500;

const LOG_METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "PATCH"];

/// Letters, digits, underscore and CJK ideographs, 2 to 20 characters.
#[must_use]
pub fn is_valid_username(username: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_\x{4e00}-\x{9fa5}]{2,20}$").expect("Invalid regex")
    });

    re.is_match(username)
}

#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"));

    re.is_match(email)
}

/// Absolute `http` or `https` URL.
#[must_use]
pub fn is_http_url(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

#[must_use]
pub fn is_bounded_text(value: &str, max_chars: usize) -> bool {
    !value.is_empty() && value.chars().count() <= max_chars
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&len) {
        return Err(ApiError::validation("密码长度必须在6-50位之间"));
    }
    Ok(())
}

/// Optional link fields: absent or blank means "no link".
pub fn validate_optional_url(
    value: Option<String>,
    message: &str,
) -> Result<Option<String>, ApiError> {
    match value.map(|v| v.trim().to_string()) {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) if is_http_url(&v) => Ok(Some(v)),
        Some(_) => Err(ApiError::validation(message)),
    }
}

pub fn validate_log_method(method: &str) -> Result<String, ApiError> {
    let upper = method.trim().to_ascii_uppercase();
    if !LOG_METHODS.contains(&upper.as_str()) {
        return Err(ApiError::validation("无效的请求方法"));
    }
    Ok(upper)
}

/// Strips `%`, `;` and quotes from a path filter and bounds its length.
pub fn sanitize_path_filter(path: &str) -> Result<Option<String>, ApiError> {
    let sanitized: String = path
        .trim()
        .chars()
        .filter(|c| !matches!(c, '%' | ';' | '\'' | '"'))
        .collect();

    if sanitized.chars().count() > MAX_PATH_FILTER_CHARS {
        return Err(ApiError::validation("路径长度不能超过500字符"));
    }

    Ok((!sanitized.is_empty()).then_some(sanitized))
}

pub fn validate_positive_id(id: i32, message: &str) -> Result<i32, ApiError> {
    if id < 1 {
        return Err(ApiError::validation(message));
    }
    Ok(id)
}
