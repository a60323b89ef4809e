//! Thread-safe, persisted knowledge store.
//!
//! Readers clone an `Arc` of the last committed [`KnowledgeBase`] and scan
//! it without holding any lock. Writers serialize on the persistence engine
//! mutex, build the next base, rewrite the SQLite table and only then swap
//! the snapshot in. A write that fails to persist leaves the snapshot
//! untouched, so memory and disk never disagree about acknowledged writes.
//!
//! None of the write paths contain an `.await`; a caller that drops a
//! request future cannot interrupt a write halfway.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{seed, KnowledgeBase, KnowledgeEntry, KnowledgeStats};
use crate::config::{KnowledgeConfig, PersistenceConfig};
use crate::error::{Result, SageError};
use crate::intent::Intent;
use crate::persistence::PersistenceEngine;
use crate::session::InteractionRecord;
use crate::text::normalize_question;
use crate::types::EntryId;

/// Read-only dump written by [`KnowledgeStore::export`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeExport {
    /// When the dump was taken.
    pub exported_at: DateTime<Utc>,
    /// Store summary at dump time.
    pub stats: KnowledgeStats,
    /// Every entry, oldest first.
    pub entries: Vec<KnowledgeEntry>,
}

/// The single owner and writer of knowledge entries.
pub struct KnowledgeStore {
    snapshot: RwLock<Arc<KnowledgeBase>>,
    engine: Mutex<PersistenceEngine>,
    config: KnowledgeConfig,
}

impl std::fmt::Debug for KnowledgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeStore")
            .field("entries", &self.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl KnowledgeStore {
    /// Open the store at `config.db_path`.
    ///
    /// A file SQLite reports as not a database, or as malformed, is renamed
    /// to `<file>.corrupt` and a fresh database is created in its place.
    /// Undecodable rows are preserved in a `.corrupt` copy and the store
    /// starts empty. Either way the caller gets a writable store.
    ///
    /// # Errors
    ///
    /// Any failure that is not corruption is returned untouched: a database
    /// held locked by another process, permissions, a missing directory.
    /// The file is left where it is in that case.
    pub fn open(config: &KnowledgeConfig, persistence: &PersistenceConfig) -> Result<Self> {
        let path = Path::new(&config.db_path);
        let engine = match PersistenceEngine::open(path, persistence) {
            Ok(engine) => engine,
            Err(e) if e.is_corruption() && path.exists() => {
                let quarantine = quarantine_path(path);
                warn!(
                    path = %path.display(),
                    quarantine = %quarantine.display(),
                    error = %e,
                    "Knowledge store unreadable, moving it aside"
                );
                std::fs::rename(path, &quarantine)?;
                PersistenceEngine::open(path, persistence)?
            }
            Err(e) => return Err(e),
        };
        Self::from_engine(engine, config)
    }

    /// Store backed by an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::Database`] if SQLite cannot allocate it.
    pub fn open_in_memory(config: &KnowledgeConfig, persistence: &PersistenceConfig) -> Result<Self> {
        let engine = PersistenceEngine::open_in_memory(persistence)?;
        Self::from_engine(engine, config)
    }

    /// Build a store around an already-open engine, loading its entries.
    ///
    /// # Errors
    ///
    /// Returns the load error when it is not corruption (see
    /// [`SageError::is_corruption`]).
    pub fn from_engine(engine: PersistenceEngine, config: &KnowledgeConfig) -> Result<Self> {
        let base = load_or_quarantine(&engine)?;
        let store = Self {
            snapshot: RwLock::new(Arc::new(base)),
            engine: Mutex::new(engine),
            config: config.clone(),
        };

        if store.is_empty() && config.seed_on_empty {
            match store.commit(|kb| {
                for entry in seed::entries() {
                    kb.push(entry);
                }
            }) {
                Ok(()) => info!(entries = store.len(), "Seeded empty knowledge store"),
                Err(e) => warn!(error = %e, "Failed to persist seed entries"),
            }
        }

        info!(entries = store.len(), "Knowledge store ready");
        Ok(store)
    }

    // ------------------------------------------------------------------
    // Reads (lock-free against the last committed snapshot)
    // ------------------------------------------------------------------

    /// The last committed knowledge base.
    #[must_use]
    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        Arc::clone(&self.snapshot.read())
    }

    /// Normalized-string equality; most recent match wins.
    #[must_use]
    pub fn lookup_exact(&self, question: &str) -> Option<KnowledgeEntry> {
        self.snapshot().lookup_exact(question).cloned()
    }

    /// Token-overlap lookup over the configured recent window, using the
    /// configured minimum of shared tokens.
    #[must_use]
    pub fn lookup_fuzzy(&self, question: &str, min_confidence: f32) -> Option<KnowledgeEntry> {
        self.snapshot()
            .lookup_fuzzy(
                question,
                self.config.min_common_tokens,
                self.config.fuzzy_window,
                min_confidence,
            )
            .cloned()
    }

    /// Entry by id.
    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<KnowledgeEntry> {
        self.snapshot().get(id).cloned()
    }

    /// Copy of every entry, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<KnowledgeEntry> {
        self.snapshot().entries().to_vec()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry count, categories and last activity.
    #[must_use]
    pub fn stats(&self) -> KnowledgeStats {
        self.snapshot().stats()
    }

    // ------------------------------------------------------------------
    // Writes (single writer, durable before acknowledged)
    // ------------------------------------------------------------------

    /// Append a new entry and persist it.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::InvalidRequest`] for a blank question, or the
    /// persistence error if the write could not be made durable (the entry
    /// is then not visible either).
    pub fn insert(
        &self,
        category: &str,
        question: &str,
        answer: &str,
        intent: Intent,
        tags: BTreeSet<String>,
        confidence: f32,
    ) -> Result<EntryId> {
        if normalize_question(question).is_empty() {
            return Err(SageError::invalid("knowledge question is blank"));
        }
        let entry = KnowledgeEntry::new(category, question, answer, intent, tags, confidence);
        let id = self.commit(move |kb| kb.push(entry))?;
        info!(entry = %id, category, "Knowledge entry added");
        Ok(id)
    }

    /// Count one use of entry `id` and persist it.
    ///
    /// Returns the updated entry, or `None` for an unknown id (nothing is
    /// written in that case).
    ///
    /// # Errors
    ///
    /// Returns the persistence error if the update could not be made
    /// durable.
    pub fn record_usage(&self, id: EntryId) -> Result<Option<KnowledgeEntry>> {
        if self.snapshot().get(id).is_none() {
            return Ok(None);
        }
        let now = Utc::now();
        self.commit(|kb| kb.touch(id, now).cloned())
    }

    /// Rewrite the current snapshot to disk.
    ///
    /// # Errors
    ///
    /// Returns the persistence error.
    pub fn persist(&self) -> Result<()> {
        let mut engine = self.engine.lock();
        let snapshot = self.snapshot();
        engine.save_entries(snapshot.entries())
    }

    /// Replace the snapshot with what is on disk. Corrupt data yields an
    /// empty store, as on open.
    ///
    /// # Errors
    ///
    /// Any other load failure is returned and the snapshot is kept.
    pub fn reload(&self) -> Result<()> {
        let engine = self.engine.lock();
        let base = load_or_quarantine(&engine)?;
        *self.snapshot.write() = Arc::new(base);
        Ok(())
    }

    fn commit<T>(&self, mutate: impl FnOnce(&mut KnowledgeBase) -> T) -> Result<T> {
        let mut engine = self.engine.lock();
        let mut next = KnowledgeBase::clone(&self.snapshot());
        let out = mutate(&mut next);
        engine.save_entries(next.entries())?;
        *self.snapshot.write() = Arc::new(next);
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Export & backup
    // ------------------------------------------------------------------

    /// Dump every entry plus stats as pretty JSON to `path`. Does not touch
    /// the store.
    ///
    /// # Errors
    ///
    /// Returns [`SageError::Io`] or [`SageError::Serialization`].
    pub fn export(&self, path: &Path) -> Result<KnowledgeExport> {
        let snapshot = self.snapshot();
        let export = KnowledgeExport {
            exported_at: Utc::now(),
            stats: snapshot.stats(),
            entries: snapshot.entries().to_vec(),
        };

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &export)
            .map_err(|e| SageError::Serialization(e.to_string()))?;
        writer.flush()?;

        info!(
            path = %path.display(),
            entries = export.entries.len(),
            "Knowledge store exported"
        );
        Ok(export)
    }

    /// Rotating SQLite backup next to the database file.
    ///
    /// # Errors
    ///
    /// Returns the persistence error.
    pub fn backup(&self) -> Result<Option<PathBuf>> {
        self.engine.lock().create_rotating_backup()
    }

    // ------------------------------------------------------------------
    // Session history storage
    // ------------------------------------------------------------------

    /// Write the session history rows. The records remain owned by the
    /// caller's tracker.
    ///
    /// # Errors
    ///
    /// Returns the persistence error.
    pub fn save_history(&self, records: &[InteractionRecord]) -> Result<()> {
        self.engine.lock().save_interactions(records)
    }

    /// Read back the session history; unreadable history is dropped.
    #[must_use]
    pub fn load_history(&self) -> Vec<InteractionRecord> {
        match self.engine.lock().load_interactions() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Session history unreadable, starting fresh");
                Vec::new()
            }
        }
    }
}

/// Load entries, degrading to an empty base when the data is corrupt.
fn load_or_quarantine(engine: &PersistenceEngine) -> Result<KnowledgeBase> {
    let loaded = match engine.integrity_check() {
        Ok(true) => engine.load_entries(),
        Ok(false) => Err(SageError::KnowledgeCorrupt(
            "integrity check failed".to_string(),
        )),
        Err(e) => Err(e),
    };

    match loaded {
        Ok(entries) => Ok(KnowledgeBase::from_entries(entries)),
        Err(e) if e.is_corruption() => {
            warn!(
                path = %engine.db_path().display(),
                error = %e,
                "Knowledge store corrupt, continuing with an empty store"
            );
            if engine.db_path().as_os_str() != ":memory:" {
                let quarantine = quarantine_path(engine.db_path());
                if let Err(backup_err) = engine.backup(&quarantine) {
                    warn!(error = %backup_err, "Could not preserve corrupt store");
                }
            }
            Ok(KnowledgeBase::new())
        }
        Err(e) => Err(e),
    }
}

/// First free name of `<file>.corrupt`, `<file>.corrupt.1`, `<file>.corrupt.2`, ...
fn quarantine_path(path: &Path) -> PathBuf {
    let mut base = path.as_os_str().to_owned();
    base.push(".corrupt");
    let first = PathBuf::from(&base);
    if !first.exists() {
        return first;
    }
    (1u32..)
        .map(|n| {
            let mut name = base.clone();
            name.push(format!(".{n}"));
            PathBuf::from(name)
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}
