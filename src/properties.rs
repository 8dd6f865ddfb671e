// src/properties.rs
//!
//! Properties calculator
//!
//! Derives line/word/character counts and permission flags for a single
//! entry. The counts are defined only for textual content; everything
//! else carries the "unknown, not zero" sentinel (`None`).

use crate::entry::Entry;
use serde::{Deserialize, Serialize};
use std::path::Path;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Derived metadata for one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Properties {
    pub name: String,
    pub absolute_path: String,
    pub formatted_last_modified: Option<String>,
    pub formatted_size: String,
    /// `None` for non-textual entries: unknown, not zero.
    pub line_count: Option<u64>,
    pub word_count: Option<u64>,
    /// Raw byte length, not a decoded character count.
    pub char_count: Option<u64>,
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
}

impl Properties {
    /// Build properties from an entry snapshot plus (for textual files)
    /// its materialized content.
    pub(crate) fn compute(entry: &Entry, text: Option<&str>) -> Properties {
        let counts = text.map(|t| (line_count(t), word_count(t), entry.size));
        Properties {
            name: entry.name.clone(),
            absolute_path: entry.path.clone(),
            formatted_last_modified: entry.last_modified.and_then(format_timestamp),
            formatted_size: format_size(entry.size),
            line_count: counts.map(|c| c.0),
            word_count: counts.map(|c| c.1),
            char_count: counts.map(|c| c.2),
            readable: entry.permissions.readable,
            writable: entry.permissions.writable,
            executable: entry.permissions.executable,
        }
    }
}

/// Whether an entry's content is treated as text, by media type of its
/// file name. No-extension and unknown-extension files are not textual.
pub fn is_textual(path: &Path) -> bool {
    let guess = mime_guess::from_path(path).first_or_octet_stream();
    guess.type_() == mime_guess::mime::TEXT
        || matches!(
            guess.subtype().as_str(),
            "json" | "xml" | "javascript" | "x-sh" | "toml" | "yaml" | "x-yaml"
        )
}

/// Terminator-delimited segments; a trailing unterminated segment counts
/// as one line.
pub fn line_count(text: &str) -> u64 {
    segments(text).count() as u64
}

/// Per line, the count of substrings produced by splitting on a single
/// space character. Consecutive spaces therefore produce empty-string
/// "words" that are counted; an empty line contributes nothing. A
/// faithful, intentionally naive metric, not a whitespace-collapsing one.
pub fn word_count(text: &str) -> u64 {
    segments(text)
        .map(|line| {
            if line.is_empty() {
                0
            } else {
                line.split(' ').count() as u64
            }
        })
        .sum()
}

fn segments(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.find(['\n', '\r']) {
            Some(at) => {
                let line = &rest[..at];
                let skip = if rest[at..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[at + skip..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = "";
                Some(line)
            }
        }
    })
}

/// Human-readable byte size, one decimal above the byte range.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn format_timestamp(millis: u64) -> Option<String> {
    let timestamp = OffsetDateTime::from_unix_timestamp((millis / 1000) as i64).ok()?;
    timestamp.format(&DATE_FORMAT).ok()
}
