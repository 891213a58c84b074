//! Scheduler adapter contract.
//!
//! The core does not own the memory-model mathematics. It defines the
//! input/output contract an algorithm must satisfy and persists
//! whatever state the adapter returns; the review-recording flow never
//! depends on the algorithm's internals, so adapters are swappable.

mod fsrs;

pub use self::fsrs::FsrsAdapter;

use chrono::{DateTime, Utc};

use crate::config::SchedulerParams;
use crate::error::DeckResult;
use crate::types::{Grade, MemoryPhase};

/// A reviewable's current memory state, taken from its latest snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentMemory {
    pub phase: MemoryPhase,
    pub stability: f32,
    pub difficulty: f32,
    /// Due timestamp of the latest snapshot.
    pub due: DateTime<Utc>,
    /// When the latest snapshot was taken (the previous review time).
    pub reviewed_at: DateTime<Utc>,
}

/// The memory state to persist as the next snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct NextMemory {
    pub phase: MemoryPhase,
    pub stability: f32,
    pub difficulty: f32,
    pub due: DateTime<Utc>,
}

/// Contract for a pluggable scheduling algorithm.
///
/// `current = None` means the reviewable has never been reviewed.
/// Implementations must be pure given their inputs apart from the
/// optional due-date fuzz.
pub trait SchedulerAdapter: Send + Sync {
    fn next_memory(
        &self,
        current: Option<&CurrentMemory>,
        grade: Grade,
        now: DateTime<Utc>,
        params: &SchedulerParams,
    ) -> DeckResult<NextMemory>;
}
