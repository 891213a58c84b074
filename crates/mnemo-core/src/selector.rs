//! Due selection.
//!
//! Read-only queries over committed snapshots. A reviewable's current
//! due value is the `due` of its most recent snapshot; a reviewable
//! with no snapshot is never-reviewed and always immediately eligible,
//! so it sorts before everything else. Ties on identical due values
//! break by reviewable id ascending, which keeps pagination stable.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::params_from_iter;
use serde::{Deserialize, Serialize};

use crate::error::DeckResult;
use crate::store::DeckStore;

/// Filter for due selection.
#[derive(Debug, Clone, Default)]
pub struct DueFilter {
    /// Restrict to reviewables whose note belongs to any of these
    /// collections. None means no collection restriction.
    pub collections: Option<Vec<String>>,
    /// Restrict to reviewables due now (due ≤ now, or never reviewed).
    pub due_only: bool,
}

/// Keyset cursor over the due ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueCursor {
    /// Due value of the last returned entry; None for never-reviewed.
    pub due: Option<DateTime<Utc>>,
    /// Reviewable id of the last returned entry.
    pub id: String,
}

/// One selected reviewable with its current due value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueEntry {
    pub reviewable_id: String,
    pub note_id: String,
    /// None = never reviewed, immediately eligible.
    pub due: Option<DateTime<Utc>>,
}

/// One page of due-ordered reviewables.
#[derive(Debug, Clone)]
pub struct DuePage {
    pub entries: Vec<DueEntry>,
    /// Cursor for the next page; None when the page was not full.
    pub cursor: Option<DueCursor>,
}

/// Selects the next reviewable(s) eligible for review.
pub struct DueSelector {
    store: Arc<DeckStore>,
}

impl DueSelector {
    pub fn new(store: Arc<DeckStore>) -> Self {
        Self { store }
    }

    /// Return the single earliest-due eligible reviewable, or None.
    pub fn next_due(&self, filter: &DueFilter, now: DateTime<Utc>) -> DeckResult<Option<DueEntry>> {
        let page = self.page(filter, None, 1, now)?;
        Ok(page.entries.into_iter().next())
    }

    /// Return up to `limit` reviewables ordered ascending by current
    /// due value, resuming after `cursor` if given.
    pub fn page(
        &self,
        filter: &DueFilter,
        cursor: Option<&DueCursor>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> DeckResult<DuePage> {
        let mut sql = String::from(
            "SELECT id, note_id, due FROM (
                 SELECT r.id AS id, r.note_id AS note_id,
                        (SELECT s.due FROM reviewable_snapshots s
                         WHERE s.reviewable_id = r.id
                         ORDER BY s.created_at DESC, s.rowid DESC LIMIT 1) AS due
                 FROM reviewables r
                 WHERE r.archived = 0",
        );
        let mut bindings: Vec<String> = Vec::new();

        if let Some(collections) = &filter.collections {
            let placeholders = vec!["?"; collections.len().max(1)].join(", ");
            sql.push_str(&format!(
                " AND r.note_id IN (SELECT note_id FROM note_collections
                                    WHERE collection_id IN ({}))",
                placeholders
            ));
            if collections.is_empty() {
                bindings.push(String::new());
            } else {
                bindings.extend(collections.iter().cloned());
            }
        }

        sql.push_str(") WHERE 1 = 1");

        if filter.due_only {
            sql.push_str(" AND (due IS NULL OR due <= ?)");
            bindings.push(now.to_rfc3339());
        }

        if let Some(cursor) = cursor {
            match &cursor.due {
                None => {
                    sql.push_str(" AND ((due IS NULL AND id > ?) OR due IS NOT NULL)");
                    bindings.push(cursor.id.clone());
                }
                Some(due) => {
                    sql.push_str(" AND due IS NOT NULL AND (due > ? OR (due = ? AND id > ?))");
                    let due = due.to_rfc3339();
                    bindings.push(due.clone());
                    bindings.push(due);
                    bindings.push(cursor.id.clone());
                }
            }
        }

        sql.push_str(&format!(
            " ORDER BY (due IS NOT NULL) ASC, due ASC, id ASC LIMIT {}",
            limit
        ));

        let entries = self.store.read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(bindings.iter()), |row| {
                    let due: Option<String> = row.get(2)?;
                    let due = match due {
                        Some(s) => Some(
                            DateTime::parse_from_rfc3339(&s)
                                .map(|dt| dt.with_timezone(&Utc))
                                .map_err(|e| {
                                    rusqlite::Error::FromSqlConversionFailure(
                                        2,
                                        rusqlite::types::Type::Text,
                                        Box::new(e),
                                    )
                                })?,
                        ),
                        None => None,
                    };
                    Ok(DueEntry {
                        reviewable_id: row.get(0)?,
                        note_id: row.get(1)?,
                        due,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let cursor = if entries.len() == limit {
            entries.last().map(|last| DueCursor {
                due: last.due,
                id: last.reviewable_id.clone(),
            })
        } else {
            None
        };

        Ok(DuePage { entries, cursor })
    }
}
