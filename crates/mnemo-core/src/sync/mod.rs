//! Note synchronization.
//!
//! Turns a desired note state (field content and/or config flags) into
//! the minimal set of row mutations, reusing existing field and
//! reviewable identities wherever content reappears so review history
//! survives edits. Both reconciliation passes run inside one
//! transaction per call; reconciliation is stateless given the same
//! desired input, so a failed call can be retried wholesale.

mod fields;
mod reviewables;

pub use fields::{plan_fields, CurrentField, DesiredField, FieldPlan, FieldUpdate};
pub use reviewables::{plan_reviewables, CurrentReviewable, ReviewablePlan};

use std::sync::Arc;

use chrono::Utc;
use rusqlite::Transaction;
use tracing::debug;
use uuid::Uuid;

use crate::config::{NoteConfig, NoteConfigPatch};
use crate::error::{DeckError, DeckResult, ErrorCode};
use crate::generator;
use crate::hash::content_hash;
use crate::store::{self, DeckStore};
use crate::types::{Note, NoteField, Reviewable, Side};

/// One requested field occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInput {
    pub value: String,
    pub side: Side,
    pub position: u32,
}

impl FieldInput {
    pub fn new(value: impl Into<String>, side: Side, position: u32) -> Self {
        Self {
            value: value.into(),
            side,
            position,
        }
    }
}

/// A note create/update request.
///
/// `note_id = None` creates a note (fields and collections required);
/// otherwise the named note is updated with whatever parts are present.
#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    pub note_id: Option<String>,
    pub fields: Option<Vec<FieldInput>>,
    pub config: NoteConfigPatch,
    pub collections: Option<Vec<String>>,
    /// Optimistic-concurrency check: abort with a conflict if the
    /// note's current version differs.
    pub expected_version: Option<i64>,
}

/// Realized note state plus mutation counts.
///
/// The counts exist so callers (and tests) can observe that an
/// unchanged desired state produces zero mutations.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub note: Note,
    /// Non-archived fields in canonical (side, position) order.
    pub fields: Vec<NoteField>,
    /// Non-archived reviewables in creation order.
    pub reviewables: Vec<Reviewable>,
    pub created_fields: usize,
    pub updated_fields: usize,
    pub archived_fields: usize,
    pub created_reviewables: usize,
    pub restored_reviewables: usize,
    pub archived_reviewables: usize,
}

impl SyncReport {
    /// Total number of row mutations applied by the synchronization.
    pub fn mutation_count(&self) -> usize {
        self.created_fields
            + self.updated_fields
            + self.archived_fields
            + self.created_reviewables
            + self.restored_reviewables
            + self.archived_reviewables
    }
}

/// Orchestrates field and reviewable reconciliation for one note.
pub struct NoteSynchronizer {
    store: Arc<DeckStore>,
}

impl NoteSynchronizer {
    pub fn new(store: Arc<DeckStore>) -> Self {
        Self { store }
    }

    /// Create or update a note, reconciling fields and reviewables.
    pub fn synchronize(&self, request: &SyncRequest) -> DeckResult<SyncReport> {
        validate(request)?;

        let report = match &request.note_id {
            None => self
                .store
                .with_transaction(|tx| create_note(tx, request))?,
            Some(note_id) => self
                .store
                .with_transaction(|tx| update_note(tx, note_id, request))?,
        };

        debug!(
            note_id = %report.note.id,
            mutations = report.mutation_count(),
            reviewables = report.reviewables.len(),
            "note synchronized"
        );
        Ok(report)
    }
}

fn validate(request: &SyncRequest) -> DeckResult<()> {
    if let Some(fields) = &request.fields {
        if fields.len() < 2 {
            return Err(DeckError::validation_with_code(
                "a note needs at least 2 fields",
                ErrorCode::ValTooFewFields,
            ));
        }
        if fields.iter().any(|f| f.value.is_empty()) {
            return Err(DeckError::validation_with_code(
                "field values must be non-empty",
                ErrorCode::ValEmptyFieldValue,
            ));
        }
    }

    match &request.note_id {
        None => {
            if request.fields.is_none() {
                return Err(DeckError::validation_with_code(
                    "note creation requires fields",
                    ErrorCode::ValTooFewFields,
                ));
            }
            match &request.collections {
                Some(collections) if !collections.is_empty() => {}
                _ => {
                    return Err(DeckError::validation_with_code(
                        "note creation requires at least 1 collection",
                        ErrorCode::ValNoCollections,
                    ))
                }
            }
        }
        Some(_) => {
            if request.fields.is_none()
                && request.config.is_empty()
                && request.collections.is_none()
            {
                return Err(DeckError::validation_with_code(
                    "update carries neither fields nor config",
                    ErrorCode::ValEmptyUpdate,
                ));
            }
        }
    }

    Ok(())
}

fn desired_from_inputs(inputs: &[FieldInput]) -> Vec<DesiredField> {
    inputs
        .iter()
        .map(|f| DesiredField {
            value: f.value.clone(),
            hash: content_hash(&f.value),
            side: f.side,
            position: f.position,
        })
        .collect()
}

fn create_note(tx: &Transaction<'_>, request: &SyncRequest) -> DeckResult<SyncReport> {
    let now = Utc::now();
    let note_id = Uuid::new_v4().to_string();
    let config = request.config.apply(NoteConfig::default());

    store::insert_note(tx, &note_id, config, now)?;
    if let Some(collections) = &request.collections {
        store::replace_collections(tx, &note_id, collections)?;
    }

    let desired = desired_from_inputs(request.fields.as_deref().unwrap_or(&[]));
    let field_plan = plan_fields(&[], &desired);
    apply_field_plan(tx, &note_id, &field_plan)?;

    let reviewable_plan = reconcile_reviewables(tx, &note_id, config)?;

    finish(tx, &note_id, &field_plan, &reviewable_plan)
}

fn update_note(tx: &Transaction<'_>, note_id: &str, request: &SyncRequest) -> DeckResult<SyncReport> {
    let note = store::get_note(tx, note_id)?
        .ok_or_else(|| DeckError::note_not_found(note_id))?;

    if let Some(expected) = request.expected_version {
        if expected != note.version {
            return Err(DeckError::conflict(format!(
                "note '{}' is at version {}, expected {}",
                note_id, note.version, expected
            )));
        }
    }

    let current_config = NoteConfig {
        reversible: note.reversible,
        separable: note.separable,
    };
    let merged_config = request.config.apply(current_config);

    let field_plan = match &request.fields {
        Some(inputs) => {
            let current = store::load_fields(tx, note_id, true)?
                .into_iter()
                .map(|f| CurrentField {
                    id: f.id,
                    hash: f.hash,
                    side: f.side,
                    position: f.position,
                    archived: f.archived,
                })
                .collect::<Vec<_>>();
            let desired = desired_from_inputs(inputs);
            plan_fields(&current, &desired)
        }
        None => FieldPlan::default(),
    };
    apply_field_plan(tx, note_id, &field_plan)?;

    let reviewable_plan = reconcile_reviewables(tx, note_id, merged_config)?;

    if let Some(collections) = &request.collections {
        store::replace_collections(tx, note_id, collections)?;
    }

    // Bump the version only when something actually changed, so an
    // idempotent re-sync really does mutate nothing.
    if merged_config != current_config
        || !field_plan.is_empty()
        || !reviewable_plan.is_empty()
    {
        store::update_note(tx, note_id, merged_config, request.expected_version)?;
    }

    finish(tx, note_id, &field_plan, &reviewable_plan)
}

fn apply_field_plan(tx: &Transaction<'_>, note_id: &str, plan: &FieldPlan) -> DeckResult<()> {
    let now = Utc::now();
    for insert in &plan.inserts {
        let field_id = Uuid::new_v4().to_string();
        store::insert_field(
            tx,
            &field_id,
            note_id,
            &insert.value,
            &insert.hash,
            insert.side,
            insert.position,
            now,
        )?;
    }
    for update in &plan.updates {
        store::update_field(tx, &update.id, update.side, update.position)?;
    }
    for field_id in &plan.archives {
        store::archive_field(tx, field_id)?;
    }
    Ok(())
}

/// Recompute the desired reviewable set over the note's current
/// non-archived fields and reconcile the persisted pool against it.
fn reconcile_reviewables(
    tx: &Transaction<'_>,
    note_id: &str,
    config: NoteConfig,
) -> DeckResult<ReviewablePlan> {
    let active_fields = store::load_fields(tx, note_id, false)?;
    let field_ids: Vec<String> = active_fields.iter().map(|f| f.id.clone()).collect();

    let desired: Vec<_> = generator::generate(&field_ids, config)
        .iter()
        .map(|candidate| generator::candidate_elements(candidate))
        .collect();

    let current = store::load_reviewables(tx, note_id)?
        .into_iter()
        .map(|r| CurrentReviewable {
            id: r.id,
            archived: r.archived,
            elements: r.elements,
        })
        .collect::<Vec<_>>();

    let plan = plan_reviewables(&current, &desired);

    let now = Utc::now();
    for elements in &plan.inserts {
        let reviewable_id = Uuid::new_v4().to_string();
        store::insert_reviewable(tx, &reviewable_id, note_id, elements, now)?;
    }
    for reviewable_id in &plan.restores {
        store::set_reviewable_archived(tx, reviewable_id, false)?;
    }
    for reviewable_id in &plan.archives {
        store::set_reviewable_archived(tx, reviewable_id, true)?;
    }

    Ok(plan)
}

fn finish(
    tx: &Transaction<'_>,
    note_id: &str,
    field_plan: &FieldPlan,
    reviewable_plan: &ReviewablePlan,
) -> DeckResult<SyncReport> {
    let note = store::get_note(tx, note_id)?
        .ok_or_else(|| DeckError::note_not_found(note_id))?;
    let fields = store::load_fields(tx, note_id, false)?;
    let reviewables = store::load_reviewables(tx, note_id)?
        .into_iter()
        .filter(|r| !r.archived)
        .collect();

    Ok(SyncReport {
        note,
        fields,
        reviewables,
        created_fields: field_plan.inserts.len(),
        updated_fields: field_plan.updates.len(),
        archived_fields: field_plan.archives.len(),
        created_reviewables: reviewable_plan.inserts.len(),
        restored_reviewables: reviewable_plan.restores.len(),
        archived_reviewables: reviewable_plan.archives.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synchronizer() -> NoteSynchronizer {
        NoteSynchronizer::new(Arc::new(DeckStore::in_memory().unwrap()))
    }

    fn create_request(values: &[&str]) -> SyncRequest {
        SyncRequest {
            note_id: None,
            fields: Some(
                values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        let side = if i == 0 { Side::Prompt } else { Side::Answer };
                        FieldInput::new(*v, side, if i == 0 { 0 } else { (i - 1) as u32 })
                    })
                    .collect(),
            ),
            collections: Some(vec!["c1".to_string()]),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_requires_two_fields() {
        let sync = synchronizer();
        let err = sync.synchronize(&create_request(&["only one"])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValTooFewFields);
    }

    #[test]
    fn test_create_rejects_empty_value() {
        let sync = synchronizer();
        let err = sync.synchronize(&create_request(&["front", ""])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValEmptyFieldValue);
    }

    #[test]
    fn test_create_requires_collection() {
        let sync = synchronizer();
        let mut request = create_request(&["front", "back"]);
        request.collections = Some(Vec::new());
        let err = sync.synchronize(&request).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValNoCollections);
    }

    #[test]
    fn test_update_requires_some_change_set() {
        let sync = synchronizer();
        let report = sync.synchronize(&create_request(&["front", "back"])).unwrap();

        let err = sync
            .synchronize(&SyncRequest {
                note_id: Some(report.note.id),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValEmptyUpdate);
    }

    #[test]
    fn test_update_unknown_note_not_found() {
        let sync = synchronizer();
        let err = sync
            .synchronize(&SyncRequest {
                note_id: Some("missing".to_string()),
                config: NoteConfigPatch {
                    reversible: Some(true),
                    separable: None,
                },
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, DeckError::NotFound { .. }));
    }

    #[test]
    fn test_create_default_config_one_reviewable() {
        let sync = synchronizer();
        let report = sync.synchronize(&create_request(&["front", "back"])).unwrap();

        assert_eq!(report.fields.len(), 2);
        assert_eq!(report.reviewables.len(), 1);
        assert_eq!(report.created_fields, 2);
        assert_eq!(report.created_reviewables, 1);

        let elements = &report.reviewables[0].elements;
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].side, Side::Prompt);
        assert_eq!(elements[1].side, Side::Answer);
    }

    #[test]
    fn test_resync_is_idempotent() {
        let sync = synchronizer();
        let created = sync.synchronize(&create_request(&["front", "back"])).unwrap();

        let mut request = create_request(&["front", "back"]);
        request.note_id = Some(created.note.id.clone());
        request.collections = None;
        let resync = sync.synchronize(&request).unwrap();

        assert_eq!(resync.mutation_count(), 0);
        assert_eq!(resync.note.version, created.note.version);
        assert_eq!(
            resync.reviewables[0].id, created.reviewables[0].id,
            "reviewable identity preserved"
        );
    }

    #[test]
    fn test_version_bumps_on_real_change() {
        let sync = synchronizer();
        let created = sync.synchronize(&create_request(&["front", "back"])).unwrap();
        assert_eq!(created.note.version, 1);

        let updated = sync
            .synchronize(&SyncRequest {
                note_id: Some(created.note.id),
                config: NoteConfigPatch {
                    reversible: Some(true),
                    separable: None,
                },
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.note.version, 2);
        assert_eq!(updated.created_reviewables, 1, "rotated card added");
    }

    #[test]
    fn test_stale_expected_version_conflicts() {
        let sync = synchronizer();
        let created = sync.synchronize(&create_request(&["front", "back"])).unwrap();

        let err = sync
            .synchronize(&SyncRequest {
                note_id: Some(created.note.id),
                config: NoteConfigPatch {
                    reversible: Some(true),
                    separable: None,
                },
                expected_version: Some(7),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, DeckError::Conflict { .. }));
    }
}
