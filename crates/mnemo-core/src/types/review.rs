//! Review history and memory state types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SchedulerParams;

/// Grade for a review (maps to scheduler rating values 1-4).
///
/// - Again (1): complete failure to recall
/// - Hard (2): successful but difficult recall
/// - Good (3): normal successful recall
/// - Easy (4): effortless recall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Grade {
    /// Complete failure to recall.
    Again = 1,
    /// Successful but difficult recall.
    Hard = 2,
    /// Normal successful recall.
    Good = 3,
    /// Effortless recall.
    Easy = 4,
}

impl Grade {
    /// Convert to the scheduler rating value.
    pub fn to_rating(self) -> u8 {
        self as u8
    }

    /// Create from a scheduler rating value.
    ///
    /// Returns None for invalid rating values.
    pub fn from_rating(rating: u8) -> Option<Self> {
        match rating {
            1 => Some(Grade::Again),
            2 => Some(Grade::Hard),
            3 => Some(Grade::Good),
            4 => Some(Grade::Easy),
            _ => None,
        }
    }
}

impl From<Grade> for u8 {
    fn from(grade: Grade) -> Self {
        grade.to_rating()
    }
}

impl TryFrom<u8> for Grade {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Grade::from_rating(value).ok_or(())
    }
}

/// Memory phase of a reviewable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPhase {
    /// Never reviewed.
    New,
    /// In intra-day learning steps.
    Learning,
    /// Graduated to whole-day review intervals.
    Review,
    /// Lapsed out of review, relearning.
    Relearning,
}

impl MemoryPhase {
    /// String form as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryPhase::New => "new",
            MemoryPhase::Learning => "learning",
            MemoryPhase::Review => "review",
            MemoryPhase::Relearning => "relearning",
        }
    }

    /// Parse the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(MemoryPhase::New),
            "learning" => Some(MemoryPhase::Learning),
            "review" => Some(MemoryPhase::Review),
            "relearning" => Some(MemoryPhase::Relearning),
            _ => None,
        }
    }
}

/// Append-only review log row.
///
/// Carries a frozen copy of the scheduler parameters active at review
/// time, so past scheduling decisions stay reproducible after the
/// defaults change. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Review ID.
    pub id: String,
    /// Reviewed reviewable ID.
    pub reviewable_id: String,
    /// Grade given by the user.
    pub rating: Grade,
    /// Elapsed response time in milliseconds.
    pub duration_ms: u64,
    /// Scheduler parameters frozen at review time.
    pub params: SchedulerParams,
    /// Review timestamp.
    pub created_at: DateTime<Utc>,
}

/// Memory state resulting from one review event, 1:1 with a `Review`.
///
/// The most-recently-created snapshot for a reviewable defines its
/// current scheduling state; a reviewable with zero snapshots is
/// never-reviewed and always immediately eligible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewableSnapshot {
    /// Snapshot ID.
    pub id: String,
    /// Originating review ID.
    pub review_id: String,
    /// Reviewable this snapshot belongs to.
    pub reviewable_id: String,
    /// Memory phase after the review.
    pub phase: MemoryPhase,
    /// Stability: days for retrievability to drop to the retention target.
    pub stability: f32,
    /// Difficulty: 1.0-10.0 scale (higher = harder to remember).
    pub difficulty: f32,
    /// When the reviewable is next eligible for review.
    pub due: DateTime<Utc>,
    /// Snapshot timestamp (equals the review timestamp).
    pub created_at: DateTime<Utc>,
}
