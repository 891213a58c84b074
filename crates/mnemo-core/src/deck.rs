//! Deck facade.
//!
//! Ties the synchronizer, due selector, and scheduler adapter together
//! behind the interface the application layer consumes. All
//! collaborators are injected; the deck owns no global state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::config::SchedulerParams;
use crate::error::{DeckError, DeckResult};
use crate::scheduler::{CurrentMemory, SchedulerAdapter};
use crate::selector::{DueCursor, DueEntry, DueFilter, DuePage, DueSelector};
use crate::store::{self, DeckStore};
use crate::sync::{NoteSynchronizer, SyncReport, SyncRequest};
use crate::types::{Grade, Review, ReviewableSnapshot};

/// A deck of notes: the top-level entry point of the core.
pub struct Deck {
    store: Arc<DeckStore>,
    synchronizer: NoteSynchronizer,
    selector: DueSelector,
    scheduler: Box<dyn SchedulerAdapter>,
    params: SchedulerParams,
}

impl Deck {
    /// Create a deck over an injected store and scheduler adapter.
    pub fn new(
        store: Arc<DeckStore>,
        scheduler: Box<dyn SchedulerAdapter>,
        params: SchedulerParams,
    ) -> Self {
        Self {
            synchronizer: NoteSynchronizer::new(Arc::clone(&store)),
            selector: DueSelector::new(Arc::clone(&store)),
            store,
            scheduler,
            params,
        }
    }

    /// Create or update a note; returns the realized state.
    pub fn synchronize_note(&self, request: &SyncRequest) -> DeckResult<SyncReport> {
        self.synchronizer.synchronize(request)
    }

    /// Select the single next due reviewable, or None when nothing is
    /// eligible.
    pub fn select_next_due(
        &self,
        filter: &DueFilter,
        now: DateTime<Utc>,
    ) -> DeckResult<Option<DueEntry>> {
        self.selector.next_due(filter, now)
    }

    /// Select an ordered batch of due reviewables with cursor
    /// pagination.
    pub fn select_due_page(
        &self,
        filter: &DueFilter,
        cursor: Option<&DueCursor>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> DeckResult<DuePage> {
        self.selector.page(filter, cursor, limit, now)
    }

    /// Record one review: invoke the scheduler adapter, then append a
    /// review row (with the parameter set frozen into it) and its
    /// linked snapshot atomically.
    ///
    /// The adapter runs before anything is written; an adapter failure
    /// persists nothing.
    pub fn record_review(
        &self,
        reviewable_id: &str,
        grade: Grade,
        duration_ms: u64,
        now: DateTime<Utc>,
    ) -> DeckResult<(Review, ReviewableSnapshot)> {
        let reviewable = self
            .store
            .read(|conn| store::get_reviewable(conn, reviewable_id))?
            .ok_or_else(|| DeckError::reviewable_not_found(reviewable_id))?;
        if reviewable.archived {
            return Err(DeckError::validation(format!(
                "reviewable '{}' is archived",
                reviewable_id
            )));
        }

        let current = self
            .store
            .latest_snapshot(reviewable_id)?
            .map(|s| CurrentMemory {
                phase: s.phase,
                stability: s.stability,
                difficulty: s.difficulty,
                due: s.due,
                reviewed_at: s.created_at,
            });

        let next = self
            .scheduler
            .next_memory(current.as_ref(), grade, now, &self.params)?;

        let review = Review {
            id: Uuid::new_v4().to_string(),
            reviewable_id: reviewable_id.to_string(),
            rating: grade,
            duration_ms,
            params: self.params.clone(),
            created_at: now,
        };
        let snapshot = ReviewableSnapshot {
            id: Uuid::new_v4().to_string(),
            review_id: review.id.clone(),
            reviewable_id: reviewable_id.to_string(),
            phase: next.phase,
            stability: next.stability,
            difficulty: next.difficulty,
            due: next.due,
            created_at: now,
        };

        self.store.with_transaction(|tx| {
            store::insert_review(tx, &review)?;
            store::insert_snapshot(tx, &snapshot)
        })?;

        debug!(
            reviewable_id,
            rating = grade.to_rating(),
            phase = snapshot.phase.as_str(),
            due = %snapshot.due,
            "review recorded"
        );
        Ok((review, snapshot))
    }
}
