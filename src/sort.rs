// src/sort.rs
//!
//! Sort boundary
//!
//! Comparator utility for ordering a flat file listing by name, size, or
//! date. Name comparisons are case-insensitive using locale-independent
//! lowercasing.

use crate::entry::Entry;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Name,
    Size,
    Date,
}

/// An unrecognized sort key is a caller programming error.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown sort key: {0}")]
pub struct InvalidSortKey(pub String);

impl FromStr for SortKey {
    type Err = InvalidSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "size" => Ok(SortKey::Size),
            "date" => Ok(SortKey::Date),
            _ => Err(InvalidSortKey(s.to_string())),
        }
    }
}

/// Comparator for the given key.
pub fn comparator(key: SortKey) -> fn(&Entry, &Entry) -> Ordering {
    match key {
        SortKey::Name => by_name,
        SortKey::Size => by_size,
        SortKey::Date => by_date,
    }
}

fn by_name(a: &Entry, b: &Entry) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

fn by_size(a: &Entry, b: &Entry) -> Ordering {
    a.size.cmp(&b.size)
}

fn by_date(a: &Entry, b: &Entry) -> Ordering {
    a.last_modified.cmp(&b.last_modified)
}
