// src/lib.rs
//!
//! Filer core — local filesystem driver
//!
//! A uniform, fallible, asynchronous API over a hierarchical storage
//! device: tree listing and mutation with strict preconditions, ZIP
//! container compress/decompress with format validation, and text I/O
//! with charset detection and line-ending normalization. Boundary
//! modules host the job scheduler, the connection-profile store, and
//! the listing sort used by the surrounding tooling.

pub mod archive;
pub mod config;
pub mod driver;
pub mod entry;
pub mod error;
pub mod jobs;
pub mod profiles;
pub mod properties;
pub mod sort;
pub mod text;

pub use config::DriverConfig;
pub use driver::{CompressProgress, Driver};
pub use entry::{Entry, EntryKind, Permissions, Tree};
pub use error::DriverError;
pub use jobs::{JobHandle, JobHost, JobOutcome, JobProgress, LogNotifier, Notifier};
pub use profiles::{ConnectionProfile, ProfileStore, StoreError};
pub use properties::Properties;
pub use sort::{comparator, InvalidSortKey, SortKey};
pub use text::{LineEnding, TextParams};
