//! SQLite persistence layer for the knowledge store and session history.
//!
//! Every record is stored as one JSON row. The schema is intentionally
//! simple:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS knowledge_entries (
//!     seq      INTEGER PRIMARY KEY,
//!     id       TEXT NOT NULL UNIQUE,
//!     data     TEXT NOT NULL,
//!     checksum TEXT
//! );
//! CREATE TABLE IF NOT EXISTS interactions (
//!     seq      INTEGER PRIMARY KEY,
//!     data     TEXT NOT NULL,
//!     checksum TEXT
//! );
//! ```
//!
//! - Tables are rewritten wholesale inside one transaction, so a reader of
//!   the file sees either the old or the new collection, never a mix.
//! - `seq` preserves insertion order, which the exact/fuzzy lookups rely on.
//! - An optional CRC-32 per row turns silent corruption into
//!   [`SageError::KnowledgeCorrupt`].
//! - Backups go through SQLite's online-backup API.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rusqlite::{params, Connection, OpenFlags};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PersistenceConfig;
use crate::error::{Result, SageError};
use crate::knowledge::KnowledgeEntry;
use crate::session::InteractionRecord;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS knowledge_entries (
        seq      INTEGER PRIMARY KEY,
        id       TEXT NOT NULL UNIQUE,
        data     TEXT NOT NULL,
        checksum TEXT
    );
    CREATE TABLE IF NOT EXISTS interactions (
        seq      INTEGER PRIMARY KEY,
        data     TEXT NOT NULL,
        checksum TEXT
    );";

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

/// CRC-32 of `data` as a lowercase hex string.
fn crc32_hex(data: &[u8]) -> String {
    let crc = crc32_compute(data);
    format!("{crc:08x}")
}

/// Basic CRC-32 (ISO 3309 / ITU-T V.42) computation.
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// PersistenceEngine
// ---------------------------------------------------------------------------

/// Handle to an open SQLite database holding knowledge entries and
/// interaction history.
///
/// # Usage
///
/// ```no_run
/// # use sage_core::persistence::PersistenceEngine;
/// # use sage_core::config::PersistenceConfig;
/// let mut engine = PersistenceEngine::open("sage_knowledge.db", &PersistenceConfig::default())?;
/// let entries = engine.load_entries()?;
/// engine.save_entries(&entries)?;
/// # Ok::<(), sage_core::error::SageError>(())
/// ```
pub struct PersistenceEngine {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for PersistenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceEngine")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PersistenceEngine {
    /// Open (or create) an SQLite database at `path`.
    ///
    /// The schema is created if it does not exist. WAL mode is enabled when
    /// `config.wal_mode` is `true`.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::Database`] on SQLite failures. A file that is not
    /// a database surfaces here too (SQLite reports it on the first pragma).
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = FULL;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "SAGE persistence engine opened"
        );

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`SageError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    // ------------------------------------------------------------------
    // Knowledge entries
    // ------------------------------------------------------------------

    /// Replace the stored knowledge entries with `entries`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::Serialization`] if JSON encoding fails, or
    /// [`SageError::Database`] on SQLite failures. On error nothing is
    /// committed.
    pub fn save_entries(&mut self, entries: &[KnowledgeEntry]) -> Result<()> {
        let start = Instant::now();
        let checksums = self.config.checksum_enabled;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM knowledge_entries", [])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO knowledge_entries (seq, id, data, checksum) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (seq, entry) in entries.iter().enumerate() {
                let (data, checksum) = encode_row(entry, checksums)?;
                stmt.execute(params![seq as i64, entry.id.to_string(), data, checksum])?;
            }
        }
        tx.commit()?;

        debug!(
            entries = entries.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved knowledge entries"
        );
        Ok(())
    }

    /// Load every stored knowledge entry, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::KnowledgeCorrupt`] if a row does not decode or
    /// fails its checksum, or [`SageError::Database`] on SQLite failures.
    pub fn load_entries(&self) -> Result<Vec<KnowledgeEntry>> {
        let start = Instant::now();
        let entries = self.load_rows("SELECT data, checksum FROM knowledge_entries ORDER BY seq")?;
        debug!(
            entries = entries.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Loaded knowledge entries"
        );
        Ok(entries)
    }

    /// Number of stored knowledge entries.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::Database`] on SQLite failures.
    pub fn entry_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM knowledge_entries", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Interaction history
    // ------------------------------------------------------------------

    /// Replace the stored interaction history with `records`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::Serialization`] or [`SageError::Database`].
    pub fn save_interactions(&mut self, records: &[InteractionRecord]) -> Result<()> {
        let checksums = self.config.checksum_enabled;

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM interactions", [])?;
        {
            let mut stmt = tx
                .prepare_cached("INSERT INTO interactions (seq, data, checksum) VALUES (?1, ?2, ?3)")?;
            for (seq, record) in records.iter().enumerate() {
                let (data, checksum) = encode_row(record, checksums)?;
                stmt.execute(params![seq as i64, data, checksum])?;
            }
        }
        tx.commit()?;

        debug!(records = records.len(), "Saved interaction history");
        Ok(())
    }

    /// Load the stored interaction history, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::KnowledgeCorrupt`] on undecodable rows, or
    /// [`SageError::Database`] on SQLite failures.
    pub fn load_interactions(&self) -> Result<Vec<InteractionRecord>> {
        self.load_rows("SELECT data, checksum FROM interactions ORDER BY seq")
    }

    fn load_rows<T: DeserializeOwned>(&self, sql: &str) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })?;

        let mut out = Vec::new();
        for (index, row) in rows.enumerate() {
            let (data, stored_checksum) = row?;

            if self.config.checksum_enabled {
                if let Some(expected) = stored_checksum {
                    let actual = crc32_hex(data.as_bytes());
                    if expected != actual {
                        return Err(SageError::KnowledgeCorrupt(format!(
                            "row {index}: checksum mismatch (expected {expected}, got {actual})"
                        )));
                    }
                }
            }

            let value = serde_json::from_str(&data)
                .map_err(|e| SageError::KnowledgeCorrupt(format!("row {index}: {e}")))?;
            out.push(value);
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Backup
    // ------------------------------------------------------------------

    /// Copy the database to `dest_path` using SQLite's online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;

        // Step through 256 pages at a time, sleeping 50ms between steps.
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;

        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Database backup completed"
        );
        Ok(())
    }

    /// Create a numbered backup alongside the database file, rotating old
    /// backups so that at most `config.backup_count` are kept.
    ///
    /// Returns the path of the fresh backup, or `None` when backups are
    /// disabled or the database lives in memory.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::Database`] or [`SageError::Io`] on failure.
    pub fn create_rotating_backup(&self) -> Result<Option<PathBuf>> {
        if self.db_path.as_os_str() == ":memory:" {
            return Ok(None);
        }

        let max = self.config.backup_count;
        if max == 0 {
            return Ok(None);
        }

        // Rotate existing backups (highest first so we don't overwrite).
        for i in (1..max).rev() {
            let src = self.backup_path(i);
            let dst = self.backup_path(i + 1);
            if src.exists() {
                std::fs::rename(&src, &dst)?;
            }
        }

        let oldest = self.backup_path(max + 1);
        if oldest.exists() {
            std::fs::remove_file(&oldest)?;
        }

        let dest = self.backup_path(1);
        self.backup(&dest)?;

        info!(max_backups = max, "Rotating backup created");
        Ok(Some(dest))
    }

    /// Path to a numbered backup file (e.g. `sage_knowledge.db.bak.1`).
    fn backup_path(&self, n: u32) -> PathBuf {
        let mut p = self.db_path.clone();
        let ext = format!(
            "{}.bak.{n}",
            p.extension()
                .map_or(String::new(), |e| e.to_string_lossy().into_owned())
        );
        p.set_extension(ext);
        p
    }

    // ------------------------------------------------------------------
    // Utility
    // ------------------------------------------------------------------

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Run an integrity check on the database.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::Database`] if the check query itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String =
            self.conn
                .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }
}

fn encode_row<T: Serialize>(value: &T, checksums: bool) -> Result<(String, Option<String>)> {
    let data = serde_json::to_string(value).map_err(|e| SageError::Serialization(e.to_string()))?;
    let checksum = checksums.then(|| crc32_hex(data.as_bytes()));
    Ok((data, checksum))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
