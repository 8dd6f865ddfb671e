// src/config.rs
//!
//! Driver configuration
//!

use crate::text::LineEnding;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ceiling for fully materializing text content in memory. Loads beyond
/// this report `OutOfMemory` instead of attempting the allocation.
pub const DEFAULT_MAX_TEXT_BYTES: u64 = 64 * 1024 * 1024;

fn default_charset() -> String {
    "UTF-8".to_string()
}

fn default_max_text_bytes() -> u64 {
    DEFAULT_MAX_TEXT_BYTES
}

/// Configuration for a [`Driver`](crate::driver::Driver) instance.
///
/// The driver holds nothing else: one root path, the text defaults, and
/// the load ceiling. There is deliberately no cache configuration,
/// because correctness depends on always reading live device state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    /// Absolute path of the storage root ("default location").
    pub root: PathBuf,
    /// Charset used when detection is disabled or inconclusive.
    #[serde(default = "default_charset")]
    pub default_charset: String,
    /// Line terminator style applied on save when none is requested.
    #[serde(default)]
    pub default_line_ending: LineEnding,
    /// See [`DEFAULT_MAX_TEXT_BYTES`].
    #[serde(default = "default_max_text_bytes")]
    pub max_text_bytes: u64,
}

impl DriverConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DriverConfig {
            root: root.into(),
            default_charset: default_charset(),
            default_line_ending: LineEnding::default(),
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
        }
    }

    /// Parse a configuration out of a JSON value.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}
