//! FSRS-backed scheduler adapter.
//!
//! Maps the adapter contract onto the fsrs crate: the grade selects
//! one of the four next states, the interval is clamped to the
//! configured maximum, and intra-day learning steps apply before a
//! card graduates to whole-day review intervals.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::config::SchedulerParams;
use crate::error::{DeckError, DeckResult};
use crate::types::{Grade, MemoryPhase};

use super::{CurrentMemory, NextMemory, SchedulerAdapter};

/// Intra-day learning steps by grade, in seconds.
const STEP_AGAIN_SECS: i64 = 60;
const STEP_HARD_SECS: i64 = 360;
const STEP_GOOD_SECS: i64 = 600;

/// Intervals shorter than this are never fuzzed.
const FUZZ_MIN_INTERVAL_DAYS: f32 = 2.5;

/// Scheduler adapter backed by the FSRS algorithm.
#[derive(Debug, Default)]
pub struct FsrsAdapter;

impl FsrsAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SchedulerAdapter for FsrsAdapter {
    fn next_memory(
        &self,
        current: Option<&CurrentMemory>,
        grade: Grade,
        now: DateTime<Utc>,
        params: &SchedulerParams,
    ) -> DeckResult<NextMemory> {
        let fsrs = fsrs::FSRS::new(Some(params.weights.as_slice()))
            .map_err(|e| DeckError::scheduler(format!("invalid weights: {}", e)))?;

        let memory = current.map(|c| fsrs::MemoryState {
            stability: c.stability,
            difficulty: c.difficulty,
        });
        let elapsed_days = current
            .map(|c| now.signed_duration_since(c.reviewed_at).num_days().max(0) as u32)
            .unwrap_or(0);

        let next = fsrs
            .next_states(memory, params.retention, elapsed_days)
            .map_err(|e| DeckError::scheduler(e.to_string()))?;
        let item = match grade {
            Grade::Again => next.again,
            Grade::Hard => next.hard,
            Grade::Good => next.good,
            Grade::Easy => next.easy,
        };

        let phase = next_phase(current.map(|c| c.phase), grade, params.learning_enabled);

        let due = match phase {
            MemoryPhase::Learning | MemoryPhase::Relearning => {
                let step_secs = match grade {
                    Grade::Again => STEP_AGAIN_SECS,
                    Grade::Hard => STEP_HARD_SECS,
                    _ => STEP_GOOD_SECS,
                };
                now + Duration::seconds(step_secs)
            }
            _ => {
                let mut interval_days = item
                    .interval
                    .max(1.0)
                    .min(params.max_interval_days as f32);
                if params.due_fuzzed && interval_days >= FUZZ_MIN_INTERVAL_DAYS {
                    let factor = rand::thread_rng().gen_range(0.95f32..=1.05f32);
                    interval_days =
                        (interval_days * factor).min(params.max_interval_days as f32);
                }
                now + Duration::seconds((interval_days * 86400.0) as i64)
            }
        };

        Ok(NextMemory {
            phase,
            stability: item.memory.stability,
            difficulty: item.memory.difficulty,
            due,
        })
    }
}

/// Phase transition table.
///
/// With learning disabled every review lands in the review phase and
/// gets a whole-day interval.
fn next_phase(current: Option<MemoryPhase>, grade: Grade, learning_enabled: bool) -> MemoryPhase {
    if !learning_enabled {
        return MemoryPhase::Review;
    }
    match (current.unwrap_or(MemoryPhase::New), grade) {
        (MemoryPhase::New, Grade::Easy) => MemoryPhase::Review,
        (MemoryPhase::New, _) => MemoryPhase::Learning,
        (MemoryPhase::Learning, Grade::Good | Grade::Easy) => MemoryPhase::Review,
        (MemoryPhase::Learning, _) => MemoryPhase::Learning,
        (MemoryPhase::Review, Grade::Again) => MemoryPhase::Relearning,
        (MemoryPhase::Review, _) => MemoryPhase::Review,
        (MemoryPhase::Relearning, Grade::Good | Grade::Easy) => MemoryPhase::Review,
        (MemoryPhase::Relearning, _) => MemoryPhase::Relearning,
    }
}
