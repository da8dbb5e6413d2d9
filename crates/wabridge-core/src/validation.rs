//! Sanitization rules for untrusted input.
//!
//! Everything here is a pure string-shape check. Nothing touches the
//! filesystem or the network; callers that need a file to exist check that
//! themselves right before reading it.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use crate::jid::{JidKind, PHONE_NUMBER};

/// WhatsApp's text message limit, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4096;
pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;
pub const MAX_CONTEXT_WINDOW: i64 = 50;
pub const MAX_SEARCH_QUERY_LENGTH: usize = 100;

pub const ALLOWED_MEDIA_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", // images
    "mp4", "mov", "avi", // video
    "mp3", "wav", "ogg", "m4a", // audio
    "pdf", "doc", "docx", "txt", // documents
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("JID cannot be empty")]
    EmptyJid,

    #[error("invalid JID format: {0}")]
    InvalidJid(String),

    #[error("phone number cannot be empty")]
    EmptyPhoneNumber,

    #[error("invalid phone number format: {0} (should be 10-15 digits)")]
    InvalidPhoneNumber(String),

    #[error("recipient cannot be empty")]
    EmptyRecipient,

    #[error("invalid recipient format: {0}")]
    InvalidRecipient(String),

    #[error("message content too long: {len} characters (max {max})")]
    ContentTooLong { len: usize, max: usize },

    #[error("file path cannot be empty")]
    EmptyPath,

    #[error("invalid file path contains null byte: {0:?}")]
    NullByte(String),

    #[error("path traversal detected in: {0}")]
    PathTraversal(String),

    #[error("invalid file path: {0}")]
    UnresolvablePath(String),

    #[error("filename cannot be empty")]
    EmptyFilename,

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("invalid date: {0} (expected ISO 8601)")]
    InvalidDate(String),

    #[error("limit must be between 1 and 100, got {0}")]
    InvalidLimit(i64),

    #[error("offset must be non-negative, got {0}")]
    InvalidOffset(i64),

    #[error("context window must be between 0 and 50, got {0}")]
    InvalidContextWindow(i64),
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Bare routable number: 10 to 15 digits.
pub fn validate_phone_number(phone: &str) -> Result<()> {
    if phone.is_empty() {
        return Err(ValidationError::EmptyPhoneNumber);
    }
    if !PHONE_NUMBER.is_match(phone) {
        return Err(ValidationError::InvalidPhoneNumber(phone.to_string()));
    }
    Ok(())
}

/// Structured identity only (user or group JID). Bare numbers are rejected.
pub fn validate_jid(jid: &str) -> Result<JidKind> {
    if jid.is_empty() {
        return Err(ValidationError::EmptyJid);
    }
    match JidKind::classify(jid) {
        JidKind::Invalid => Err(ValidationError::InvalidJid(jid.to_string())),
        kind => Ok(kind),
    }
}

/// A bare number or either structured JID form.
pub fn validate_recipient(recipient: &str) -> Result<()> {
    if recipient.is_empty() {
        return Err(ValidationError::EmptyRecipient);
    }
    if validate_phone_number(recipient).is_ok() || validate_jid(recipient).is_ok() {
        return Ok(());
    }
    Err(ValidationError::InvalidRecipient(recipient.to_string()))
}

/// Empty content is accepted here; the store decides what to do with a
/// message that has neither text nor media.
pub fn validate_message_content(content: &str) -> Result<()> {
    let len = content.chars().count();
    if len > MAX_MESSAGE_LENGTH {
        return Err(ValidationError::ContentTooLong {
            len,
            max: MAX_MESSAGE_LENGTH,
        });
    }
    Ok(())
}

/// Returns the lexically normalized absolute form of `path`.
pub fn validate_file_path(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        return Err(ValidationError::EmptyPath);
    }
    if path.contains('\0') {
        return Err(ValidationError::NullByte(path.to_string()));
    }

    let clean = lexical_clean(Path::new(path));
    if clean.components().any(|c| c == Component::ParentDir) {
        return Err(ValidationError::PathTraversal(path.to_string()));
    }

    let absolute = std::path::absolute(&clean)
        .map_err(|_| ValidationError::UnresolvablePath(path.to_string()))?;
    // `absolute` may prepend a working directory that itself holds `..`.
    let absolute = lexical_clean(&absolute);
    if absolute.components().any(|c| c == Component::ParentDir) {
        return Err(ValidationError::PathTraversal(path.to_string()));
    }
    Ok(absolute)
}

/// Returns the lowercase extension of an allowed media file. The extension is
/// whatever follows the last dot of the final path element, so a bare
/// `.jpg` counts as a jpg.
pub fn validate_media_type(filename: &str) -> Result<String> {
    if filename.is_empty() {
        return Err(ValidationError::EmptyFilename);
    }
    let ext = filename
        .rsplit(['/', '\\'])
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    if ALLOWED_MEDIA_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else if ext.is_empty() {
        Err(ValidationError::UnsupportedMediaType(filename.to_string()))
    } else {
        Err(ValidationError::UnsupportedMediaType(format!(".{}", ext)))
    }
}

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC)
/// and bare dates (midnight UTC).
pub fn validate_date(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::InvalidDate(value.to_string()));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(ValidationError::InvalidDate(value.to_string()))
}

pub fn validate_pagination(limit: i64, offset: i64) -> Result<(i64, i64)> {
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ValidationError::InvalidLimit(limit));
    }
    if offset < 0 {
        return Err(ValidationError::InvalidOffset(offset));
    }
    Ok((limit, offset))
}

pub fn validate_context(before: i64, after: i64) -> Result<(i64, i64)> {
    for n in [before, after] {
        if !(0..=MAX_CONTEXT_WINDOW).contains(&n) {
            return Err(ValidationError::InvalidContextWindow(n));
        }
    }
    Ok((before, after))
}

/// Trims and caps a free-text search term. Queries are always bound as
/// parameters, so no escaping happens here.
pub fn sanitize_search_query(query: &str) -> String {
    query.trim().chars().take(MAX_SEARCH_QUERY_LENGTH).collect()
}

/// Resolves `.` and `..` without touching the filesystem. A `..` that would
/// climb above a relative path's start is kept; one above the root is dropped.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}
