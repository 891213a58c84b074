//! Core types for mnemo.

mod note;
mod review;
mod reviewable;

pub use note::{Note, NoteField, Side};
pub use review::{Grade, MemoryPhase, Review, ReviewableSnapshot};
pub use reviewable::{Reviewable, ReviewableElement};
