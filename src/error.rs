// src/error.rs
//!
//! Driver error taxonomy
//!
//! Every driver operation resolves to exactly one success value or exactly
//! one of these errors. Unexpected device faults are wrapped as `Io` with
//! the original cause preserved for diagnostics.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    /// Operation target, or a parent it requires, does not exist.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// Operation target (or a rename/copy destination) already exists.
    /// Operations never silently overwrite.
    #[error("Already exists: {path}")]
    AlreadyExists { path: String },

    /// A directory-only operation was applied to a non-directory.
    #[error("Not a directory: {path}")]
    DirectoryExpected { path: String },

    /// The target's file-name suffix is not a recognized container format.
    #[error("Unsupported archive format: {path}")]
    UnsupportedArchiveFormat { path: String },

    /// The container is password-protected.
    #[error("Archive is encrypted: {path}")]
    EncryptedArchive { path: String },

    /// The container is part of a split/multi-volume archive.
    #[error("Archive is split across volumes: {path}")]
    SplitArchive { path: String },

    /// The container's internal structure is malformed.
    #[error("Invalid archive: {path}")]
    InvalidArchive { path: String },

    /// Content is too large to materialize fully in memory.
    #[error("Content too large to load into memory: {path}")]
    OutOfMemory { path: String },

    /// Underlying device error during a byte-level operation.
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl DriverError {
    /// Wrap an underlying device fault, keeping the offending path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        DriverError::Io {
            path: path.into(),
            source,
        }
    }

    /// The path the failure is about.
    pub fn path(&self) -> &str {
        match self {
            DriverError::NotFound { path }
            | DriverError::AlreadyExists { path }
            | DriverError::DirectoryExpected { path }
            | DriverError::UnsupportedArchiveFormat { path }
            | DriverError::EncryptedArchive { path }
            | DriverError::SplitArchive { path }
            | DriverError::InvalidArchive { path }
            | DriverError::OutOfMemory { path }
            | DriverError::Io { path, .. } => path,
        }
    }
}

impl serde::Serialize for DriverError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
