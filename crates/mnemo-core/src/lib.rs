//! mnemo-core - spaced-repetition flashcard core.
//!
//! Derives reviewable prompt/answer pairings from multi-field notes,
//! reconciles them against edits while preserving review history, and
//! schedules reviews through a pluggable memory-model adapter.
//!
//! # Example
//!
//! ```ignore
//! use mnemo_core::{Deck, DeckStore, FsrsAdapter, SchedulerParams, SyncRequest};
//!
//! let store = std::sync::Arc::new(DeckStore::new("deck.db")?);
//! let deck = Deck::new(store, Box::new(FsrsAdapter::new()), SchedulerParams::default());
//!
//! // Create a note; reviewables are derived automatically
//! let report = deck.synchronize_note(&request)?;
//!
//! // Pick the next card and grade it
//! if let Some(entry) = deck.select_next_due(&Default::default(), chrono::Utc::now())? {
//!     deck.record_review(&entry.reviewable_id, Grade::Good, 4200, chrono::Utc::now())?;
//! }
//! ```

pub mod config;
pub mod deck;
pub mod error;
pub mod generator;
pub mod hash;
pub mod scheduler;
pub mod selector;
pub mod store;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use config::{NoteConfig, NoteConfigPatch, SchedulerParams};
pub use deck::Deck;
pub use error::{DeckError, DeckResult, ErrorCode};
pub use scheduler::{CurrentMemory, FsrsAdapter, NextMemory, SchedulerAdapter};
pub use selector::{DueCursor, DueEntry, DueFilter, DuePage, DueSelector};
pub use store::DeckStore;
pub use sync::{FieldInput, NoteSynchronizer, SyncReport, SyncRequest};
pub use types::{
    Grade, MemoryPhase, Note, NoteField, Review, Reviewable, ReviewableElement,
    ReviewableSnapshot, Side,
};
