//! Note and field types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a field within a note or a reviewable.
///
/// Side 0 is the prompt role, side 1 the answer role. On a `NoteField`
/// this is the author-facing grouping; on a reviewable element it marks
/// which side of the card the field lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Prompt side.
    Prompt = 0,
    /// Answer side.
    Answer = 1,
}

impl Side {
    /// Integer form as stored in the database.
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Create from the stored integer form.
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Side::Prompt),
            1 => Some(Side::Answer),
            _ => None,
        }
    }
}

/// A unit of authored content owning fields and reviewables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Note ID.
    pub id: String,
    /// Whether answer-role fields may also serve as prompts.
    pub reversible: bool,
    /// Whether each answer field is scheduled independently.
    pub separable: bool,
    /// Optimistic-concurrency version, bumped on every synchronize.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// One piece of content within a note.
///
/// Never hard-deleted; reconciliation archives fields whose content
/// disappears so reviewable history stays referentially intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteField {
    /// Field ID.
    pub id: String,
    /// Owning note ID.
    pub note_id: String,
    /// Field content. Invariant: non-empty.
    pub value: String,
    /// Content hash of `value` (fixed-length hex digest).
    pub hash: String,
    /// Author-facing grouping side.
    pub side: Side,
    /// Order within its side. Invariant: non-negative.
    pub position: u32,
    /// Whether the field has been archived by reconciliation.
    pub archived: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
