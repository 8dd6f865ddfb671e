// src/text/mod.rs
//!
//! Text codec
//!
//! Charset detection and decoding on load, line-ending normalization and
//! encoding on save. Consumed by the driver's `load`/`save` operations.

use crate::error::DriverError;
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::io;


// ============================================================================
// Parameters
// ============================================================================

/// Line terminator style applied on encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    Lf,
    Crlf,
    Cr,
}

impl Default for LineEnding {
    fn default() -> Self {
        LineEnding::Lf
    }
}

impl LineEnding {
    pub fn terminator(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }
}

/// Governs read decoding and write encoding/normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextParams {
    /// Charset label; used directly when `detect_charset` is false and as
    /// the fallback when detection is inconclusive.
    pub charset: String,
    pub detect_charset: bool,
    pub line_ending: LineEnding,
}

impl TextParams {
    pub fn utf8(line_ending: LineEnding) -> Self {
        TextParams {
            charset: "UTF-8".to_string(),
            detect_charset: false,
            line_ending,
        }
    }
}

// ============================================================================
// Decode / Encode
// ============================================================================

/// Decode raw bytes to text.
///
/// With `detect_charset`, a heuristic detector runs over the whole byte
/// stream first; an inconclusive guess falls back to `params.charset`.
/// Malformed sequences decode to replacement characters rather than
/// failing the load. An unrecognized charset label surfaces as `Io`.
pub fn decode(bytes: &[u8], params: &TextParams, path: &str) -> Result<String, DriverError> {
    let encoding = if params.detect_charset {
        detect(bytes).map_or_else(|| resolve(&params.charset, path), Ok)?
    } else {
        resolve(&params.charset, path)?
    };

    let (text, _, _) = encoding.decode(bytes);
    Ok(text.into_owned())
}

/// Encode text to bytes.
///
/// Every line terminator is rewritten to `params.line_ending` first;
/// re-applying the same terminator is a no-op.
pub fn encode(text: &str, params: &TextParams, path: &str) -> Result<Vec<u8>, DriverError> {
    let encoding = resolve(&params.charset, path)?;
    let normalized = normalize_line_endings(text, params.line_ending);
    let (bytes, _, _) = encoding.encode(&normalized);
    Ok(bytes.into_owned())
}

/// Rewrite every `\r\n`, `\r`, and `\n` to the requested terminator.
pub fn normalize_line_endings(text: &str, ending: LineEnding) -> String {
    let terminator = ending.terminator();
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                // \r\n counts as a single terminator
                chars.next_if_eq(&'\n');
                out.push_str(terminator);
            }
            '\n' => out.push_str(terminator),
            _ => out.push(c),
        }
    }

    out
}

fn resolve(label: &str, path: &str) -> Result<&'static Encoding, DriverError> {
    Encoding::for_label(label.as_bytes()).ok_or_else(|| {
        DriverError::io(
            path,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unrecognized charset label '{label}'"),
            ),
        )
    })
}

/// Run the heuristic detector; `None` means inconclusive.
fn detect(bytes: &[u8]) -> Option<&'static Encoding> {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let (encoding, conclusive) = detector.guess_assess(None, true);
    conclusive.then_some(encoding)
}
