// src/driver/mod.rs
//!
//! Filesystem driver
//!
//! Orchestrates the path model, the codecs, and the properties
//! calculator into the public operation set: list, create, rename,
//! delete, copy, compress, decompress, load, save, properties-of.
//!
//! Every operation is a unit of blocking I/O offloaded to a worker
//! thread, so a caller's thread is never blocked at the call boundary.
//! The driver holds only its configuration: no cache, no lock manager —
//! correctness depends on the live device state observed at the moment
//! of each call. Known limitation, by design: concurrent calls targeting
//! overlapping paths are not serialized here; a rename racing a delete
//! on the same entry is the caller's hazard to arbitrate.

use crate::archive;
use crate::config::DriverConfig;
use crate::entry::{neutral_path, Entry, EntryKind, Tree};
use crate::error::DriverError;
use crate::properties::{self, Properties};
use crate::text::{self, TextParams};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::debug;

#[cfg(test)]
mod tests;

/// The lazy, cancellable stream of per-member results emitted during
/// compress. Single-consumer: the producer blocks until the previous
/// item is accepted (one in-flight item, no further buffering). Dropping
/// the stream cancels the producer at the next member boundary;
/// already-added members stay in the archive.
pub struct CompressProgress {
    rx: mpsc::Receiver<Result<Entry, DriverError>>,
}

impl CompressProgress {
    /// Next completed member, a terminal error, or `None` once the
    /// sequence is exhausted. Not restartable.
    pub async fn next(&mut self) -> Option<Result<Entry, DriverError>> {
        self.rx.recv().await
    }
}

/// Stateless service value over one storage root.
#[derive(Debug, Clone)]
pub struct Driver {
    config: DriverConfig,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Self {
        Driver { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    // ========================================================================
    // Tree listing
    // ========================================================================

    /// List the configured default root.
    pub async fn list_default(&self) -> Result<Tree, DriverError> {
        self.list_children(None).await
    }

    /// List a directory's immediate children. An absent `parent` resolves
    /// to the configured root; an empty directory yields an empty vector.
    pub async fn list_children(&self, parent: Option<&Entry>) -> Result<Tree, DriverError> {
        let dir = match parent {
            Some(entry) => entry.as_path(),
            None => self.config.root.clone(),
        };
        let shown = neutral_path(&dir);
        debug!(path = %shown, "list_children");

        offload(shown.clone(), move || {
            if !dir.exists() {
                return Err(DriverError::NotFound { path: shown });
            }
            if !dir.is_dir() {
                return Err(DriverError::DirectoryExpected { path: shown });
            }

            let mut children = Vec::new();
            for child in fs::read_dir(&dir).map_err(|e| DriverError::io(&shown, e))? {
                let child = child.map_err(|e| DriverError::io(&shown, e))?;
                children.push(Entry::snapshot(&child.path()));
            }

            // Directories first, then case-insensitively by name.
            children.sort_by(|a, b| match (a.is_directory(), b.is_directory()) {
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
                _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            });

            Ok(Tree {
                root: Entry::snapshot(&dir),
                children,
            })
        })
        .await
    }

    // ========================================================================
    // Tree mutation
    // ========================================================================

    /// Create the entry's location: the directory chain for directories,
    /// missing parents plus the file itself for files.
    pub async fn create(&self, entry: &Entry) -> Result<Entry, DriverError> {
        let path = entry.as_path();
        let shown = entry.path.clone();
        let kind = entry.kind;
        debug!(path = %shown, "create");

        offload(shown.clone(), move || {
            if path.exists() {
                return Err(DriverError::AlreadyExists { path: shown });
            }
            match kind {
                EntryKind::Directory => {
                    fs::create_dir_all(&path).map_err(|e| DriverError::io(&shown, e))?;
                }
                EntryKind::File => {
                    create_parents(&path)?;
                    OpenOptions::new()
                        .write(true)
                        .create_new(true)
                        .open(&path)
                        .map_err(|e| match e.kind() {
                            io::ErrorKind::AlreadyExists => {
                                DriverError::AlreadyExists { path: shown.clone() }
                            }
                            _ => DriverError::io(&shown, e),
                        })?;
                }
            }
            Ok(Entry::snapshot(&path))
        })
        .await
    }

    /// Rename within the same parent directory.
    pub async fn rename(&self, entry: &Entry, new_name: &str) -> Result<Entry, DriverError> {
        let path = entry.as_path();
        let shown = entry.path.clone();
        let new_name = new_name.to_string();
        debug!(path = %shown, new_name = %new_name, "rename");

        offload(shown.clone(), move || {
            if !path.exists() {
                return Err(DriverError::NotFound { path: shown });
            }
            let target = path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(&new_name);
            if target.exists() {
                return Err(DriverError::AlreadyExists {
                    path: neutral_path(&target),
                });
            }
            fs::rename(&path, &target).map_err(|e| DriverError::io(&shown, e))?;
            Ok(Entry::snapshot(&target))
        })
        .await
    }

    /// Delete the entry, recursively for directories. Returns the parent.
    pub async fn delete(&self, entry: &Entry) -> Result<Entry, DriverError> {
        let path = entry.as_path();
        let shown = entry.path.clone();
        debug!(path = %shown, "delete");

        offload(shown.clone(), move || {
            if !path.exists() {
                return Err(DriverError::NotFound { path: shown });
            }
            if path.is_dir() {
                fs::remove_dir_all(&path).map_err(|e| DriverError::io(&shown, e))?;
            } else {
                fs::remove_file(&path).map_err(|e| DriverError::io(&shown, e))?;
            }
            let parent = path.parent().unwrap_or(&path);
            Ok(Entry::snapshot(parent))
        })
        .await
    }

    /// Copy into `dest_dir` under the source's own name, recursively for
    /// directories. Never overwrites.
    pub async fn copy(&self, source: &Entry, dest_dir: &Entry) -> Result<Entry, DriverError> {
        let source_path = source.as_path();
        let shown = source.path.clone();
        let target = dest_dir.as_path().join(&source.name);
        debug!(path = %shown, target = %neutral_path(&target), "copy");

        offload(shown.clone(), move || {
            if !source_path.exists() {
                return Err(DriverError::NotFound { path: shown });
            }
            if target.exists() {
                return Err(DriverError::AlreadyExists {
                    path: neutral_path(&target),
                });
            }
            if source_path.is_dir() {
                let mut options = fs_extra::dir::CopyOptions::new();
                options.copy_inside = true;
                fs_extra::dir::copy(&source_path, &target, &options)
                    .map_err(|e| DriverError::io(&shown, io::Error::other(e)))?;
            } else {
                create_parents(&target)?;
                fs::copy(&source_path, &target).map_err(|e| DriverError::io(&shown, e))?;
            }
            Ok(Entry::snapshot(&target))
        })
        .await
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub async fn properties_of(&self, entry: &Entry) -> Result<Properties, DriverError> {
        let path = entry.as_path();
        let shown = entry.path.clone();
        let ceiling = self.config.max_text_bytes;
        debug!(path = %shown, "properties_of");

        offload(shown.clone(), move || {
            if !path.exists() {
                return Err(DriverError::NotFound { path: shown });
            }
            let snapshot = Entry::snapshot(&path);

            let text = if snapshot.is_file()
                && properties::is_textual(&path)
                && snapshot.size <= ceiling
            {
                let bytes = fs::read(&path).map_err(|e| DriverError::io(&shown, e))?;
                // Counting is terminator/space based; a lossy view is enough.
                Some(String::from_utf8_lossy(&bytes).into_owned())
            } else {
                None
            };

            Ok(Properties::compute(&snapshot, text.as_deref()))
        })
        .await
    }

    // ========================================================================
    // Archive operations
    // ========================================================================

    /// Create a new archive at `dest_dir/archive_name` and stream one
    /// result per completed source. Fails immediately with
    /// `AlreadyExists` if the archive path is taken; archives are never
    /// appended to or overwritten.
    pub async fn compress(
        &self,
        sources: Vec<Entry>,
        dest_dir: &Entry,
        archive_name: &str,
    ) -> Result<CompressProgress, DriverError> {
        let archive_path = dest_dir.as_path().join(archive_name);
        let shown = neutral_path(&archive_path);
        debug!(path = %shown, sources = sources.len(), "compress");

        let create_shown = shown.clone();
        let create_path = archive_path.clone();
        let archive_file = offload(shown.clone(), move || {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&create_path)
                .map_err(|e| match e.kind() {
                    io::ErrorKind::AlreadyExists => DriverError::AlreadyExists {
                        path: create_shown.clone(),
                    },
                    // Destination directory itself is missing.
                    io::ErrorKind::NotFound => DriverError::NotFound {
                        path: create_shown.clone(),
                    },
                    _ => DriverError::io(&create_shown, e),
                })
        })
        .await?;

        // Capacity 1: exactly one in-flight item between producer and
        // consumer.
        let (tx, rx) = mpsc::channel(1);
        tokio::task::spawn_blocking(move || {
            archive::run_compress(archive_file, shown, sources, tx);
        });

        Ok(CompressProgress { rx })
    }

    /// Validate and fully extract `source` into `dest_dir`. The five
    /// preconditions are checked in strict order (suffix, existence,
    /// encryption, split, structure) so the reported error is always the
    /// first violation. Success returns the source entry unchanged.
    pub async fn decompress(
        &self,
        source: &Entry,
        dest_dir: &Entry,
    ) -> Result<Entry, DriverError> {
        // Suffix is rejected before any device inspection, even existence.
        if !archive::is_archive_name(&source.name) {
            return Err(DriverError::UnsupportedArchiveFormat {
                path: source.path.clone(),
            });
        }

        let source_path = source.as_path();
        let shown = source.path.clone();
        let dest = dest_dir.as_path();
        let result = source.clone();
        debug!(path = %shown, dest = %neutral_path(&dest), "decompress");

        offload(shown.clone(), move || {
            if !source_path.exists() {
                return Err(DriverError::NotFound { path: shown });
            }
            archive::validate(&source_path)?;
            archive::extract(&source_path, &dest)?;
            Ok(result)
        })
        .await
    }

    // ========================================================================
    // Text I/O
    // ========================================================================

    /// Load and decode the entry's content.
    pub async fn load(&self, entry: &Entry, params: &TextParams) -> Result<String, DriverError> {
        let path = entry.as_path();
        let shown = entry.path.clone();
        let params = params.clone();
        let ceiling = self.config.max_text_bytes;
        debug!(path = %shown, "load");

        offload(shown.clone(), move || {
            if !path.exists() {
                return Err(DriverError::NotFound { path: shown });
            }
            let metadata = fs::metadata(&path).map_err(|e| DriverError::io(&shown, e))?;
            // Pre-checked ceiling: a failed allocation would abort, so
            // "content too large" is decided before materializing.
            if metadata.len() > ceiling {
                return Err(DriverError::OutOfMemory { path: shown });
            }
            let bytes = fs::read(&path).map_err(|e| DriverError::io(&shown, e))?;
            text::decode(&bytes, &params, &shown)
        })
        .await
    }

    /// Normalize, encode, and write the entry's content, creating the
    /// target and any missing parents. Never fails with `NotFound`.
    pub async fn save(
        &self,
        entry: &Entry,
        content: &str,
        params: &TextParams,
    ) -> Result<(), DriverError> {
        let path = entry.as_path();
        let shown = entry.path.clone();
        let params = params.clone();
        let content = content.to_string();
        debug!(path = %shown, "save");

        offload(shown.clone(), move || {
            create_parents(&path)?;
            let bytes = text::encode(&content, &params, &shown)?;
            fs::write(&path, bytes).map_err(|e| DriverError::io(&shown, e))
        })
        .await
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Run one blocking unit of device work on the worker pool.
async fn offload<T, F>(path: String, op: F) -> Result<T, DriverError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, DriverError> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| DriverError::io(path, io::Error::other(e)))?
}

fn create_parents(path: &Path) -> Result<(), DriverError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| DriverError::io(neutral_path(parent), e))?;
        }
    }
    Ok(())
}
