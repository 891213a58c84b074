//! Reviewable types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Side;

/// A derived, independently schedulable prompt/answer pairing.
///
/// Reviewables are never hard-deleted. Reconciliation archives them
/// instead, because deletion would orphan their review history, and
/// restores them when their exact field composition reappears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reviewable {
    /// Reviewable ID.
    pub id: String,
    /// Owning note ID.
    pub note_id: String,
    /// Whether the reviewable is archived.
    pub archived: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Member fields in emission order. Invariant: at least one
    /// prompt-side and one answer-side element.
    pub elements: Vec<ReviewableElement>,
}

/// One member field of a reviewable, with its card side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewableElement {
    /// Member field ID.
    pub field_id: String,
    /// Which side of the card the field lands on.
    pub side: Side,
}

impl ReviewableElement {
    pub fn new(field_id: impl Into<String>, side: Side) -> Self {
        Self {
            field_id: field_id.into(),
            side,
        }
    }
}
