//! SQLite-backed deck store.
//!
//! Holds the relational state for notes, fields, reviewables, and the
//! review log. The connection handle is injected into every component
//! that needs it; there are no process-wide singletons. Mutation entry
//! points run inside a single transaction via [`DeckStore::with_transaction`],
//! so a failure partway leaves no partial state.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::debug;

use crate::config::{NoteConfig, SchedulerParams};
use crate::error::{DeckError, DeckResult};
use crate::types::{
    Grade, MemoryPhase, Note, NoteField, Review, Reviewable, ReviewableElement,
    ReviewableSnapshot, Side,
};

/// SQLite-backed store for deck state.
pub struct DeckStore {
    conn: Arc<Mutex<Connection>>,
}

impl DeckStore {
    /// Create a new store at the given database path.
    ///
    /// Creates the database file and schema if they don't exist.
    pub fn new<P: AsRef<Path>>(path: P) -> DeckResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> DeckResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> DeckResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> DeckResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS notes (
                id          TEXT PRIMARY KEY,
                reversible  INTEGER NOT NULL DEFAULT 0,
                separable   INTEGER NOT NULL DEFAULT 0,
                version     INTEGER NOT NULL DEFAULT 1,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS note_collections (
                note_id        TEXT NOT NULL REFERENCES notes(id),
                collection_id  TEXT NOT NULL,
                PRIMARY KEY (note_id, collection_id)
            );

            CREATE TABLE IF NOT EXISTS note_fields (
                id          TEXT PRIMARY KEY,
                note_id     TEXT NOT NULL REFERENCES notes(id),
                value       TEXT NOT NULL CHECK (length(value) > 0),
                hash        TEXT NOT NULL CHECK (length(hash) = 64),
                side        INTEGER NOT NULL CHECK (side IN (0, 1)),
                position    INTEGER NOT NULL CHECK (position >= 0),
                archived    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_note_fields_note ON note_fields(note_id);
            CREATE INDEX IF NOT EXISTS idx_note_fields_hash ON note_fields(note_id, hash);

            CREATE TABLE IF NOT EXISTS reviewables (
                id          TEXT PRIMARY KEY,
                note_id     TEXT NOT NULL REFERENCES notes(id),
                archived    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reviewables_note ON reviewables(note_id);

            CREATE TABLE IF NOT EXISTS reviewable_fields (
                reviewable_id  TEXT NOT NULL REFERENCES reviewables(id),
                field_id       TEXT NOT NULL REFERENCES note_fields(id),
                side           INTEGER NOT NULL CHECK (side IN (0, 1)),
                ordinal        INTEGER NOT NULL CHECK (ordinal >= 0),
                PRIMARY KEY (reviewable_id, ordinal)
            );

            CREATE TABLE IF NOT EXISTS reviews (
                id                TEXT PRIMARY KEY,
                reviewable_id     TEXT NOT NULL REFERENCES reviewables(id),
                rating            INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 4),
                duration_ms       INTEGER NOT NULL,
                weights           TEXT NOT NULL,
                retention         REAL NOT NULL,
                max_interval      INTEGER NOT NULL,
                learning_enabled  INTEGER NOT NULL,
                due_fuzzed        INTEGER NOT NULL,
                created_at        TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_reviews_reviewable ON reviews(reviewable_id);

            CREATE TABLE IF NOT EXISTS reviewable_snapshots (
                id             TEXT PRIMARY KEY,
                review_id      TEXT NOT NULL UNIQUE REFERENCES reviews(id),
                reviewable_id  TEXT NOT NULL REFERENCES reviewables(id),
                phase          TEXT NOT NULL CHECK (phase IN ('new', 'learning', 'review', 'relearning')),
                stability      REAL NOT NULL,
                difficulty     REAL NOT NULL,
                due            TEXT NOT NULL,
                created_at     TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_snapshots_reviewable
                ON reviewable_snapshots(reviewable_id, created_at DESC);
            ",
        )?;

        debug!("deck store schema initialized");
        Ok(())
    }

    fn lock(&self) -> DeckResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DeckError::database(e.to_string()))
    }

    /// Run a closure inside one transaction; commit on Ok, roll back on Err.
    pub(crate) fn with_transaction<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> DeckResult<T>,
    ) -> DeckResult<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Run a read-only closure against the connection.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Connection) -> DeckResult<T>) -> DeckResult<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Load a note by id.
    pub fn get_note(&self, note_id: &str) -> DeckResult<Option<Note>> {
        self.read(|conn| get_note(conn, note_id))
    }

    /// Load a note's fields, optionally including archived ones.
    pub fn get_fields(&self, note_id: &str, include_archived: bool) -> DeckResult<Vec<NoteField>> {
        self.read(|conn| load_fields(conn, note_id, include_archived))
    }

    /// Load a note's reviewables with their elements, in creation order.
    pub fn get_reviewables(&self, note_id: &str) -> DeckResult<Vec<Reviewable>> {
        self.read(|conn| load_reviewables(conn, note_id))
    }

    /// Load the most recent snapshot for a reviewable, if any.
    pub fn latest_snapshot(&self, reviewable_id: &str) -> DeckResult<Option<ReviewableSnapshot>> {
        self.read(|conn| latest_snapshot(conn, reviewable_id))
    }

    /// Load the full review log for a reviewable, oldest first.
    pub fn review_log(&self, reviewable_id: &str) -> DeckResult<Vec<Review>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, reviewable_id, rating, duration_ms, weights, retention,
                        max_interval, learning_enabled, due_fuzzed, created_at
                 FROM reviews WHERE reviewable_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map(params![reviewable_id], row_to_review)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

// =========================================================================
// Row-level operations, usable inside or outside a transaction.
// =========================================================================

fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_side(idx: usize, value: i64) -> rusqlite::Result<Side> {
    Side::from_i64(value).ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(idx, value)
    })
}

pub(crate) fn get_note(conn: &Connection, note_id: &str) -> DeckResult<Option<Note>> {
    let note = conn
        .query_row(
            "SELECT id, reversible, separable, version, created_at FROM notes WHERE id = ?1",
            params![note_id],
            |row| {
                let created_at: String = row.get(4)?;
                Ok(Note {
                    id: row.get(0)?,
                    reversible: row.get::<_, i64>(1)? != 0,
                    separable: row.get::<_, i64>(2)? != 0,
                    version: row.get(3)?,
                    created_at: parse_ts(4, &created_at)?,
                })
            },
        )
        .optional()?;
    Ok(note)
}

pub(crate) fn insert_note(
    conn: &Connection,
    note_id: &str,
    config: NoteConfig,
    created_at: DateTime<Utc>,
) -> DeckResult<()> {
    conn.execute(
        "INSERT INTO notes (id, reversible, separable, version, created_at)
         VALUES (?1, ?2, ?3, 1, ?4)",
        params![
            note_id,
            config.reversible as i64,
            config.separable as i64,
            created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Write the merged config and bump the version. Returns the new version.
pub(crate) fn update_note(
    conn: &Connection,
    note_id: &str,
    config: NoteConfig,
    expected_version: Option<i64>,
) -> DeckResult<i64> {
    let updated = match expected_version {
        Some(version) => conn.execute(
            "UPDATE notes SET reversible = ?1, separable = ?2, version = version + 1
             WHERE id = ?3 AND version = ?4",
            params![
                config.reversible as i64,
                config.separable as i64,
                note_id,
                version
            ],
        )?,
        None => conn.execute(
            "UPDATE notes SET reversible = ?1, separable = ?2, version = version + 1
             WHERE id = ?3",
            params![config.reversible as i64, config.separable as i64, note_id],
        )?,
    };

    if updated == 0 {
        return Err(DeckError::conflict(format!(
            "note '{}' was modified concurrently",
            note_id
        )));
    }

    let version: i64 = conn.query_row(
        "SELECT version FROM notes WHERE id = ?1",
        params![note_id],
        |row| row.get(0),
    )?;
    Ok(version)
}

pub(crate) fn replace_collections(
    conn: &Connection,
    note_id: &str,
    collection_ids: &[String],
) -> DeckResult<()> {
    conn.execute(
        "DELETE FROM note_collections WHERE note_id = ?1",
        params![note_id],
    )?;
    for collection_id in collection_ids {
        conn.execute(
            "INSERT INTO note_collections (note_id, collection_id) VALUES (?1, ?2)",
            params![note_id, collection_id],
        )?;
    }
    Ok(())
}

pub(crate) fn load_fields(
    conn: &Connection,
    note_id: &str,
    include_archived: bool,
) -> DeckResult<Vec<NoteField>> {
    let sql = if include_archived {
        "SELECT id, note_id, value, hash, side, position, archived, created_at
         FROM note_fields WHERE note_id = ?1
         ORDER BY side ASC, position ASC, created_at ASC, rowid ASC"
    } else {
        "SELECT id, note_id, value, hash, side, position, archived, created_at
         FROM note_fields WHERE note_id = ?1 AND archived = 0
         ORDER BY side ASC, position ASC, created_at ASC, rowid ASC"
    };

    let mut stmt = conn.prepare(sql)?;
    let fields = stmt
        .query_map(params![note_id], |row| {
            let side: i64 = row.get(4)?;
            let created_at: String = row.get(7)?;
            Ok(NoteField {
                id: row.get(0)?,
                note_id: row.get(1)?,
                value: row.get(2)?,
                hash: row.get(3)?,
                side: parse_side(4, side)?,
                position: row.get(5)?,
                archived: row.get::<_, i64>(6)? != 0,
                created_at: parse_ts(7, &created_at)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(fields)
}

pub(crate) fn insert_field(
    conn: &Connection,
    field_id: &str,
    note_id: &str,
    value: &str,
    hash: &str,
    side: Side,
    position: u32,
    created_at: DateTime<Utc>,
) -> DeckResult<()> {
    conn.execute(
        "INSERT INTO note_fields (id, note_id, value, hash, side, position, archived, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
        params![
            field_id,
            note_id,
            value,
            hash,
            side.as_i64(),
            position,
            created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Reposition a field and revive it if archived.
pub(crate) fn update_field(
    conn: &Connection,
    field_id: &str,
    side: Side,
    position: u32,
) -> DeckResult<()> {
    conn.execute(
        "UPDATE note_fields SET side = ?1, position = ?2, archived = 0 WHERE id = ?3",
        params![side.as_i64(), position, field_id],
    )?;
    Ok(())
}

pub(crate) fn archive_field(conn: &Connection, field_id: &str) -> DeckResult<()> {
    conn.execute(
        "UPDATE note_fields SET archived = 1 WHERE id = ?1",
        params![field_id],
    )?;
    Ok(())
}

pub(crate) fn load_reviewables(conn: &Connection, note_id: &str) -> DeckResult<Vec<Reviewable>> {
    let mut stmt = conn.prepare(
        "SELECT id, note_id, archived, created_at FROM reviewables
         WHERE note_id = ?1 ORDER BY created_at ASC, rowid ASC",
    )?;
    let mut reviewables = stmt
        .query_map(params![note_id], |row| {
            let created_at: String = row.get(3)?;
            Ok(Reviewable {
                id: row.get(0)?,
                note_id: row.get(1)?,
                archived: row.get::<_, i64>(2)? != 0,
                created_at: parse_ts(3, &created_at)?,
                elements: Vec::new(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut elem_stmt = conn.prepare(
        "SELECT field_id, side FROM reviewable_fields
         WHERE reviewable_id = ?1 ORDER BY ordinal ASC",
    )?;
    for reviewable in &mut reviewables {
        reviewable.elements = elem_stmt
            .query_map(params![reviewable.id], |row| {
                let side: i64 = row.get(1)?;
                Ok(ReviewableElement {
                    field_id: row.get(0)?,
                    side: parse_side(1, side)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
    }

    Ok(reviewables)
}

pub(crate) fn get_reviewable(
    conn: &Connection,
    reviewable_id: &str,
) -> DeckResult<Option<Reviewable>> {
    let reviewable = conn
        .query_row(
            "SELECT id, note_id, archived, created_at FROM reviewables WHERE id = ?1",
            params![reviewable_id],
            |row| {
                let created_at: String = row.get(3)?;
                Ok(Reviewable {
                    id: row.get(0)?,
                    note_id: row.get(1)?,
                    archived: row.get::<_, i64>(2)? != 0,
                    created_at: parse_ts(3, &created_at)?,
                    elements: Vec::new(),
                })
            },
        )
        .optional()?;
    Ok(reviewable)
}

pub(crate) fn insert_reviewable(
    conn: &Connection,
    reviewable_id: &str,
    note_id: &str,
    elements: &[ReviewableElement],
    created_at: DateTime<Utc>,
) -> DeckResult<()> {
    if !elements.iter().any(|e| e.side == Side::Prompt)
        || !elements.iter().any(|e| e.side == Side::Answer)
    {
        // Unreachable given a correct generator; abort the transaction
        // rather than persist a one-sided card.
        return Err(DeckError::Internal(format!(
            "reviewable '{}' lacks a prompt or answer element",
            reviewable_id
        )));
    }

    conn.execute(
        "INSERT INTO reviewables (id, note_id, archived, created_at) VALUES (?1, ?2, 0, ?3)",
        params![reviewable_id, note_id, created_at.to_rfc3339()],
    )?;
    for (ordinal, element) in elements.iter().enumerate() {
        conn.execute(
            "INSERT INTO reviewable_fields (reviewable_id, field_id, side, ordinal)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                reviewable_id,
                element.field_id,
                element.side.as_i64(),
                ordinal as i64
            ],
        )?;
    }
    Ok(())
}

pub(crate) fn set_reviewable_archived(
    conn: &Connection,
    reviewable_id: &str,
    archived: bool,
) -> DeckResult<()> {
    conn.execute(
        "UPDATE reviewables SET archived = ?1 WHERE id = ?2",
        params![archived as i64, reviewable_id],
    )?;
    Ok(())
}

fn row_to_review(row: &rusqlite::Row<'_>) -> rusqlite::Result<Review> {
    let rating: i64 = row.get(2)?;
    let weights_json: String = row.get(4)?;
    let created_at: String = row.get(9)?;

    let weights: Vec<f32> = serde_json::from_str(&weights_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let rating = Grade::from_rating(rating as u8)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(2, rating))?;

    Ok(Review {
        id: row.get(0)?,
        reviewable_id: row.get(1)?,
        rating,
        duration_ms: row.get::<_, i64>(3)? as u64,
        params: SchedulerParams {
            weights,
            retention: row.get(5)?,
            max_interval_days: row.get(6)?,
            learning_enabled: row.get::<_, i64>(7)? != 0,
            due_fuzzed: row.get::<_, i64>(8)? != 0,
        },
        created_at: parse_ts(9, &created_at)?,
    })
}

pub(crate) fn insert_review(conn: &Connection, review: &Review) -> DeckResult<()> {
    let weights_json = serde_json::to_string(&review.params.weights)?;
    conn.execute(
        "INSERT INTO reviews
         (id, reviewable_id, rating, duration_ms, weights, retention,
          max_interval, learning_enabled, due_fuzzed, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            review.id,
            review.reviewable_id,
            review.rating.to_rating(),
            review.duration_ms as i64,
            weights_json,
            review.params.retention,
            review.params.max_interval_days,
            review.params.learning_enabled as i64,
            review.params.due_fuzzed as i64,
            review.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_snapshot(conn: &Connection, snapshot: &ReviewableSnapshot) -> DeckResult<()> {
    conn.execute(
        "INSERT INTO reviewable_snapshots
         (id, review_id, reviewable_id, phase, stability, difficulty, due, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            snapshot.id,
            snapshot.review_id,
            snapshot.reviewable_id,
            snapshot.phase.as_str(),
            snapshot.stability,
            snapshot.difficulty,
            snapshot.due.to_rfc3339(),
            snapshot.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub(crate) fn latest_snapshot(
    conn: &Connection,
    reviewable_id: &str,
) -> DeckResult<Option<ReviewableSnapshot>> {
    let snapshot = conn
        .query_row(
            "SELECT id, review_id, reviewable_id, phase, stability, difficulty, due, created_at
             FROM reviewable_snapshots WHERE reviewable_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT 1",
            params![reviewable_id],
            |row| {
                let phase: String = row.get(3)?;
                let due: String = row.get(6)?;
                let created_at: String = row.get(7)?;
                let phase = MemoryPhase::parse(&phase).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        format!("unknown memory phase '{}'", phase).into(),
                    )
                })?;
                Ok(ReviewableSnapshot {
                    id: row.get(0)?,
                    review_id: row.get(1)?,
                    reviewable_id: row.get(2)?,
                    phase,
                    stability: row.get(4)?,
                    difficulty: row.get(5)?,
                    due: parse_ts(6, &due)?,
                    created_at: parse_ts(7, &created_at)?,
                })
            },
        )
        .optional()?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_initializes_in_memory() {
        let store = DeckStore::in_memory().unwrap();
        assert!(store.get_note("missing").unwrap().is_none());
    }

    #[test]
    fn test_schema_initializes_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = DeckStore::new(dir.path().join("deck.db")).unwrap();
        assert!(store.get_note("missing").unwrap().is_none());
    }

    #[test]
    fn test_empty_field_value_rejected_by_schema() {
        let store = DeckStore::in_memory().unwrap();
        let now = Utc::now();
        let result = store.with_transaction(|tx| {
            insert_note(tx, "n1", NoteConfig::default(), now)?;
            insert_field(tx, "f1", "n1", "", &"0".repeat(64), Side::Prompt, 0, now)
        });
        assert!(matches!(result, Err(DeckError::Database { .. })));
    }

    #[test]
    fn test_wrong_hash_length_rejected_by_schema() {
        let store = DeckStore::in_memory().unwrap();
        let now = Utc::now();
        let result = store.with_transaction(|tx| {
            insert_note(tx, "n1", NoteConfig::default(), now)?;
            insert_field(tx, "f1", "n1", "hello", "abc123", Side::Prompt, 0, now)
        });
        assert!(matches!(result, Err(DeckError::Database { .. })));
    }

    #[test]
    fn test_rollback_leaves_no_partial_state() {
        let store = DeckStore::in_memory().unwrap();
        let now = Utc::now();
        let result = store.with_transaction(|tx| {
            insert_note(tx, "n1", NoteConfig::default(), now)?;
            // Second insert violates the primary key and aborts everything
            insert_note(tx, "n1", NoteConfig::default(), now)
        });
        assert!(result.is_err());
        assert!(store.get_note("n1").unwrap().is_none());
    }

    #[test]
    fn test_version_conflict_detected() {
        let store = DeckStore::in_memory().unwrap();
        let now = Utc::now();
        store
            .with_transaction(|tx| insert_note(tx, "n1", NoteConfig::default(), now))
            .unwrap();

        let result = store.with_transaction(|tx| {
            update_note(tx, "n1", NoteConfig::default(), Some(99))
        });
        assert!(matches!(result, Err(DeckError::Conflict { .. })));

        let version = store
            .with_transaction(|tx| update_note(tx, "n1", NoteConfig::default(), Some(1)))
            .unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn test_one_sided_reviewable_rejected() {
        let store = DeckStore::in_memory().unwrap();
        let now = Utc::now();
        let result = store.with_transaction(|tx| {
            insert_note(tx, "n1", NoteConfig::default(), now)?;
            insert_field(tx, "f1", "n1", "a", &"0".repeat(64), Side::Prompt, 0, now)?;
            insert_reviewable(
                tx,
                "r1",
                "n1",
                &[ReviewableElement::new("f1", Side::Prompt)],
                now,
            )
        });
        assert!(matches!(result, Err(DeckError::Internal(_))));
        assert!(store.get_note("n1").unwrap().is_none(), "rolled back");
    }
}
