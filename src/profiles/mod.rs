// src/profiles/mod.rs
//!
//! Connection-profile store
//!
//! Remembers a short list of named remote-connection profiles in
//! SQLite. Plain CRUD: no validation beyond storage-layer uniqueness on
//! the id. The driver neither reads nor writes this store.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;


#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {reason}")]
    Database { reason: String },

    #[error("Store lock poisoned: {reason}")]
    MutexPoisoned { reason: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database {
            reason: e.to_string(),
        }
    }
}

/// A named remote-connection bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    pub id: String,
    /// Display name shown in the bookmark list.
    pub name: String,
    /// Connection URI (e.g. "smb://server/share").
    pub uri: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ConnectionProfile {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        ConnectionProfile {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            uri: uri.into(),
            username: None,
            password: None,
        }
    }
}

/// SQLite-backed profile list.
pub struct ProfileStore {
    conn: Mutex<Connection>,
}

impl ProfileStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS connection_profiles (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                uri TEXT NOT NULL,
                username TEXT,
                password TEXT
            )",
            [],
        )?;
        Ok(ProfileStore {
            conn: Mutex::new(conn),
        })
    }

    pub fn load_all(&self) -> Result<Vec<ConnectionProfile>, StoreError> {
        let conn = self.lock()?;
        let mut statement = conn.prepare(
            "SELECT id, name, uri, username, password
             FROM connection_profiles ORDER BY name",
        )?;
        let rows = statement.query_map([], |row| {
            Ok(ConnectionProfile {
                id: row.get(0)?,
                name: row.get(1)?,
                uri: row.get(2)?,
                username: row.get(3)?,
                password: row.get(4)?,
            })
        })?;
        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row?);
        }
        Ok(profiles)
    }

    /// Insert or update by id (UPSERT).
    pub fn upsert(&self, profile: &ConnectionProfile) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO connection_profiles (id, name, uri, username, password)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                uri = excluded.uri,
                username = excluded.username,
                password = excluded.password",
            rusqlite::params![
                profile.id,
                profile.name,
                profile.uri,
                profile.username,
                profile.password,
            ],
        )?;
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM connection_profiles WHERE id = ?1",
            rusqlite::params![id],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::MutexPoisoned {
            reason: "profile store connection".to_string(),
        })
    }
}
