// src/entry.rs
//!
//! Path/file model
//!
//! An `Entry` is a snapshot of one filesystem location, taken from live
//! device state at construction time. Entries are not live handles:
//! staleness is expected, and every driver operation re-validates
//! existence against the device before acting.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Classification of an entry, based solely on live device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// Permission flags read directly from the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
}

/// Snapshot description of one filesystem location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Absolute path with platform-neutral (`/`) separators.
    pub path: String,
    /// Entry name (not full path).
    pub name: String,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Last modified time (Unix timestamp in milliseconds).
    pub last_modified: Option<u64>,
    pub kind: EntryKind,
    /// True if the location itself is a symbolic link.
    pub is_symlink: bool,
    /// True if the name marks the entry as hidden.
    pub is_hidden: bool,
    pub permissions: Permissions,
}

/// A directory entry plus its immediate children snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub root: Entry,
    pub children: Vec<Entry>,
}

impl Entry {
    /// Snapshot the live device state at `path`.
    ///
    /// Construction never fails: metadata that cannot be read degrades to
    /// defaults. Absence is the caller's concern, checked before (or
    /// instead of) constructing.
    pub fn snapshot(path: &Path) -> Entry {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        let is_symlink = path
            .symlink_metadata()
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);

        // Follows symlinks, so kind/size reflect the target.
        let metadata = path.metadata().ok();

        let kind = match &metadata {
            Some(m) if m.is_dir() => EntryKind::Directory,
            _ => EntryKind::File,
        };

        let size = match (&metadata, kind) {
            (Some(m), EntryKind::File) => m.len(),
            _ => 0,
        };

        let last_modified = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64);

        let permissions = metadata
            .as_ref()
            .map(|m| read_permissions(m))
            .unwrap_or_default();

        Entry {
            path: neutral_path(path),
            is_hidden: name.starts_with('.'),
            name,
            size,
            last_modified,
            kind,
            is_symlink,
            permissions,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// The entry's location as an owned platform path.
    pub fn as_path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

/// Render a path with `/` separators regardless of platform.
pub fn neutral_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        raw.to_string()
    } else {
        raw.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

#[cfg(unix)]
fn read_permissions(metadata: &std::fs::Metadata) -> Permissions {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    Permissions {
        readable: mode & 0o400 != 0,
        writable: mode & 0o200 != 0,
        executable: mode & 0o100 != 0,
    }
}

#[cfg(not(unix))]
fn read_permissions(metadata: &std::fs::Metadata) -> Permissions {
    Permissions {
        readable: true,
        writable: !metadata.permissions().readonly(),
        executable: false,
    }
}
