//! Field reconciliation planning.
//!
//! A stable multiset match keyed by content hash, not a positional
//! diff: a field whose text is unchanged keeps its row identity even
//! when it moves, and duplicate-valued fields degrade gracefully by
//! pairwise alignment within their hash group.

use std::collections::HashMap;

use crate::types::Side;

/// A persisted field occurrence, as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentField {
    pub id: String,
    pub hash: String,
    pub side: Side,
    pub position: u32,
    pub archived: bool,
}

/// A requested field occurrence, hash already computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredField {
    pub value: String,
    pub hash: String,
    pub side: Side,
    pub position: u32,
}

/// An update to an existing row: new side/position, un-archived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub id: String,
    pub side: Side,
    pub position: u32,
}

/// Minimal row mutations realizing a desired field state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPlan {
    pub inserts: Vec<DesiredField>,
    pub updates: Vec<FieldUpdate>,
    pub archives: Vec<String>,
}

impl FieldPlan {
    /// Whether the plan mutates nothing.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.archives.is_empty()
    }
}

/// Compute the minimal mutation plan from current to desired fields.
///
/// Occurrences are grouped by content hash; within a group the two
/// occurrence lists align positionally (index 0 with index 0, etc).
pub fn plan_fields(current: &[CurrentField], desired: &[DesiredField]) -> FieldPlan {
    let mut current_by_hash: HashMap<&str, Vec<&CurrentField>> = HashMap::new();
    for field in current {
        current_by_hash.entry(&field.hash).or_default().push(field);
    }

    let mut desired_by_hash: HashMap<&str, Vec<&DesiredField>> = HashMap::new();
    for field in desired {
        desired_by_hash.entry(&field.hash).or_default().push(field);
    }

    // Union of hashes in first-appearance order, current side first, so
    // the resulting plan is deterministic.
    let mut hashes: Vec<&str> = Vec::new();
    for field in current {
        if !hashes.contains(&field.hash.as_str()) {
            hashes.push(&field.hash);
        }
    }
    for field in desired {
        if !hashes.contains(&field.hash.as_str()) {
            hashes.push(&field.hash);
        }
    }

    let mut plan = FieldPlan::default();

    for hash in hashes {
        let cur = current_by_hash.get(hash).map(Vec::as_slice).unwrap_or(&[]);
        let des = desired_by_hash.get(hash).map(Vec::as_slice).unwrap_or(&[]);

        let covered = cur.len().min(des.len());
        for idx in 0..covered {
            let c = cur[idx];
            let d = des[idx];
            if c.archived || c.side != d.side || c.position != d.position {
                plan.updates.push(FieldUpdate {
                    id: c.id.clone(),
                    side: d.side,
                    position: d.position,
                });
            }
        }

        for d in &des[covered..] {
            plan.inserts.push((*d).clone());
        }

        for c in &cur[covered..] {
            if !c.archived {
                plan.archives.push(c.id.clone());
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cur(id: &str, hash: &str, side: Side, position: u32, archived: bool) -> CurrentField {
        CurrentField {
            id: id.to_string(),
            hash: hash.to_string(),
            side,
            position,
            archived,
        }
    }

    fn des(hash: &str, side: Side, position: u32) -> DesiredField {
        DesiredField {
            value: format!("value-of-{}", hash),
            hash: hash.to_string(),
            side,
            position,
        }
    }

    #[test]
    fn test_unchanged_state_plans_nothing() {
        let current = vec![
            cur("a", "h1", Side::Prompt, 0, false),
            cur("b", "h2", Side::Answer, 0, false),
        ];
        let desired = vec![des("h1", Side::Prompt, 0), des("h2", Side::Answer, 0)];

        let plan = plan_fields(&current, &desired);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_moved_field_is_updated_not_recreated() {
        let current = vec![
            cur("a", "h1", Side::Prompt, 0, false),
            cur("b", "h2", Side::Answer, 0, false),
        ];
        // Same content, h2 moved to the prompt side
        let desired = vec![des("h1", Side::Prompt, 0), des("h2", Side::Prompt, 1)];

        let plan = plan_fields(&current, &desired);
        assert!(plan.inserts.is_empty());
        assert!(plan.archives.is_empty());
        assert_eq!(
            plan.updates,
            vec![FieldUpdate {
                id: "b".to_string(),
                side: Side::Prompt,
                position: 1,
            }]
        );
    }

    #[test]
    fn test_new_content_is_inserted() {
        let current = vec![cur("a", "h1", Side::Prompt, 0, false)];
        let desired = vec![des("h1", Side::Prompt, 0), des("h3", Side::Answer, 0)];

        let plan = plan_fields(&current, &desired);
        assert_eq!(plan.inserts, vec![des("h3", Side::Answer, 0)]);
        assert!(plan.updates.is_empty());
        assert!(plan.archives.is_empty());
    }

    #[test]
    fn test_removed_content_is_archived() {
        let current = vec![
            cur("a", "h1", Side::Prompt, 0, false),
            cur("b", "h2", Side::Answer, 0, false),
        ];
        let desired = vec![des("h1", Side::Prompt, 0)];

        let plan = plan_fields(&current, &desired);
        assert_eq!(plan.archives, vec!["b".to_string()]);
        assert!(plan.inserts.is_empty());
        assert!(plan.updates.is_empty());
    }

    #[test]
    fn test_archived_match_is_restored() {
        let current = vec![
            cur("a", "h1", Side::Prompt, 0, false),
            cur("b", "h2", Side::Answer, 0, true),
        ];
        let desired = vec![des("h1", Side::Prompt, 0), des("h2", Side::Answer, 0)];

        let plan = plan_fields(&current, &desired);
        // The archived row matches by hash and is revived in place
        assert_eq!(
            plan.updates,
            vec![FieldUpdate {
                id: "b".to_string(),
                side: Side::Answer,
                position: 0,
            }]
        );
        assert!(plan.inserts.is_empty());
    }

    #[test]
    fn test_duplicate_hashes_align_pairwise() {
        let current = vec![
            cur("a", "dup", Side::Answer, 0, false),
            cur("b", "dup", Side::Answer, 1, false),
        ];
        // One duplicate dropped, the survivor moves to position 0
        let desired = vec![des("dup", Side::Answer, 0)];

        let plan = plan_fields(&current, &desired);
        assert!(plan.updates.is_empty(), "a already matches index 0");
        assert_eq!(plan.archives, vec!["b".to_string()]);
    }

    #[test]
    fn test_duplicate_hashes_extra_desired_inserts() {
        let current = vec![cur("a", "dup", Side::Answer, 0, false)];
        let desired = vec![des("dup", Side::Answer, 0), des("dup", Side::Answer, 1)];

        let plan = plan_fields(&current, &desired);
        assert_eq!(plan.inserts, vec![des("dup", Side::Answer, 1)]);
        assert!(plan.updates.is_empty());
        assert!(plan.archives.is_empty());
    }

    #[test]
    fn test_already_archived_row_is_not_rearchived() {
        let current = vec![
            cur("a", "h1", Side::Prompt, 0, false),
            cur("b", "h2", Side::Answer, 0, true),
        ];
        let desired = vec![des("h1", Side::Prompt, 0)];

        let plan = plan_fields(&current, &desired);
        assert!(plan.is_empty());
    }
}
