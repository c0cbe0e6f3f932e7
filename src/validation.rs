use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use url::Url;

pub const NAME_MAX_LEN: usize = 255;
pub const URL_MAX_LEN: usize = 2048;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    static ref UNSAFE_CHARS_RE: Regex = Regex::new(r#"[<>"'/\\]"#).unwrap();
    static ref UNSAFE_URL_CHARS_RE: Regex = Regex::new(r#"[<>"'\\]"#).unwrap();
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Password rules, checked in declaration order; the first failure wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PasswordRule {
    #[error("Password must be at least 8 characters long")]
    TooShort,
    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,
    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,
    #[error("Password must contain at least one digit")]
    MissingDigit,
}

pub fn validate_password(password: &str) -> Result<(), PasswordRule> {
    if password.chars().count() < 8 {
        return Err(PasswordRule::TooShort);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordRule::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PasswordRule::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordRule::MissingDigit);
    }
    Ok(())
}

pub fn is_valid_url(raw: &str) -> bool {
    parse_web_url(raw).is_some()
}

fn parse_web_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    let web = matches!(url.scheme(), "http" | "https");
    let has_host = url.host_str().is_some_and(|h| !h.is_empty());
    (web && has_host).then_some(url)
}

/// Validates an audit target and returns the normalized form to store.
///
/// Slashes are kept: they are structural in a URL. The remaining markup
/// characters are percent-encoded by the parser, and any survivor is removed.
pub fn sanitize_url(raw: &str) -> Result<String, &'static str> {
    let url = parse_web_url(raw).ok_or("Invalid URL format")?;
    let cleaned = UNSAFE_URL_CHARS_RE.replace_all(url.as_str(), "").into_owned();
    if cleaned.len() > URL_MAX_LEN {
        return Err("URL is too long");
    }
    Ok(cleaned)
}

/// Strips `< > " ' / \`, truncates to `max_len` characters and trims.
pub fn sanitize_text(text: &str, max_len: usize) -> String {
    let stripped = UNSAFE_CHARS_RE.replace_all(text, "");
    stripped.chars().take(max_len).collect::<String>().trim().to_string()
}

/// Like [`sanitize_text`], for loosely-typed JSON input: anything that is not
/// a string becomes the empty string.
pub fn sanitize_input(value: Option<&Value>, max_len: usize) -> String {
    match value {
        Some(Value::String(s)) => sanitize_text(s, max_len),
        _ => String::new(),
    }
}

/// Clamps list pagination to `1..=100` items and a non-negative offset.
pub fn clamp_pagination(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}

/// Escapes LIKE wildcards; pair with `ESCAPE '\'` in the query.
pub fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
