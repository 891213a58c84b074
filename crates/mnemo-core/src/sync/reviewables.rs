//! Reviewable reconciliation planning.
//!
//! Matches the desired reviewable set (from the generator) against the
//! persisted pool by exact, order-sensitive field/side composition.
//! A reviewable keeps its identity, and therefore its review history,
//! whenever its exact composition reappears in the desired set, even
//! at a different list position.

use crate::types::ReviewableElement;

/// A persisted reviewable, as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentReviewable {
    pub id: String,
    pub archived: bool,
    /// Member elements in emission order.
    pub elements: Vec<ReviewableElement>,
}

/// Row mutations realizing a desired reviewable set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewablePlan {
    /// New reviewables to insert, as element lists in emission order.
    pub inserts: Vec<Vec<ReviewableElement>>,
    /// Archived reviewables whose composition reappeared.
    pub restores: Vec<String>,
    /// Active reviewables with no counterpart in the desired set.
    pub archives: Vec<String>,
}

impl ReviewablePlan {
    /// Whether the plan mutates nothing.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.restores.is_empty() && self.archives.is_empty()
    }
}

/// Compute the mutation plan from the current pool to the desired set.
///
/// For each desired reviewable the pool is scanned in original order
/// for the first exact composition match, which is then consumed.
/// Unmatched desired entries become inserts; unconsumed active pool
/// entries become archives.
pub fn plan_reviewables(
    current: &[CurrentReviewable],
    desired: &[Vec<ReviewableElement>],
) -> ReviewablePlan {
    let mut plan = ReviewablePlan::default();
    let mut consumed = vec![false; current.len()];

    for want in desired {
        let matched = current
            .iter()
            .enumerate()
            .find(|(idx, have)| !consumed[*idx] && have.elements == *want);

        match matched {
            Some((idx, have)) => {
                consumed[idx] = true;
                if have.archived {
                    plan.restores.push(have.id.clone());
                }
            }
            None => plan.inserts.push(want.clone()),
        }
    }

    for (idx, have) in current.iter().enumerate() {
        if !consumed[idx] && !have.archived {
            plan.archives.push(have.id.clone());
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    fn elems(parts: &[(&str, Side)]) -> Vec<ReviewableElement> {
        parts.iter()
            .map(|(id, side)| ReviewableElement::new(*id, *side))
            .collect()
    }

    fn rv(id: &str, archived: bool, parts: &[(&str, Side)]) -> CurrentReviewable {
        CurrentReviewable {
            id: id.to_string(),
            archived,
            elements: elems(parts),
        }
    }

    #[test]
    fn test_identical_sets_plan_nothing() {
        let current = vec![
            rv("r1", false, &[("a", Side::Prompt), ("b", Side::Answer)]),
            rv("r2", false, &[("b", Side::Prompt), ("a", Side::Answer)]),
        ];
        let desired = vec![
            elems(&[("a", Side::Prompt), ("b", Side::Answer)]),
            elems(&[("b", Side::Prompt), ("a", Side::Answer)]),
        ];

        assert!(plan_reviewables(&current, &desired).is_empty());
    }

    #[test]
    fn test_reordered_desired_set_keeps_identities() {
        let current = vec![
            rv("r1", false, &[("a", Side::Prompt), ("b", Side::Answer)]),
            rv("r2", false, &[("b", Side::Prompt), ("a", Side::Answer)]),
        ];
        // Same compositions, opposite order
        let desired = vec![
            elems(&[("b", Side::Prompt), ("a", Side::Answer)]),
            elems(&[("a", Side::Prompt), ("b", Side::Answer)]),
        ];

        assert!(plan_reviewables(&current, &desired).is_empty());
    }

    #[test]
    fn test_composition_match_is_order_sensitive() {
        let current = vec![rv(
            "r1",
            false,
            &[("a", Side::Prompt), ("b", Side::Answer), ("c", Side::Answer)],
        )];
        // Answer order swapped: not the same reviewable
        let desired = vec![elems(&[
            ("a", Side::Prompt),
            ("c", Side::Answer),
            ("b", Side::Answer),
        ])];

        let plan = plan_reviewables(&current, &desired);
        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.archives, vec!["r1".to_string()]);
    }

    #[test]
    fn test_archived_match_is_restored() {
        let current = vec![rv("r1", true, &[("a", Side::Prompt), ("b", Side::Answer)])];
        let desired = vec![elems(&[("a", Side::Prompt), ("b", Side::Answer)])];

        let plan = plan_reviewables(&current, &desired);
        assert_eq!(plan.restores, vec!["r1".to_string()]);
        assert!(plan.inserts.is_empty());
        assert!(plan.archives.is_empty());
    }

    #[test]
    fn test_leftover_active_is_archived_leftover_archived_is_left() {
        let current = vec![
            rv("r1", false, &[("a", Side::Prompt), ("b", Side::Answer)]),
            rv("r2", true, &[("b", Side::Prompt), ("a", Side::Answer)]),
        ];
        let desired: Vec<Vec<ReviewableElement>> = Vec::new();

        let plan = plan_reviewables(&current, &desired);
        assert_eq!(plan.archives, vec!["r1".to_string()]);
        assert!(plan.restores.is_empty());
    }

    #[test]
    fn test_first_match_wins_among_duplicates() {
        let current = vec![
            rv("r1", false, &[("a", Side::Prompt), ("b", Side::Answer)]),
            rv("r2", false, &[("a", Side::Prompt), ("b", Side::Answer)]),
        ];
        let desired = vec![elems(&[("a", Side::Prompt), ("b", Side::Answer)])];

        let plan = plan_reviewables(&current, &desired);
        // r1 is consumed, r2 has no counterpart left
        assert_eq!(plan.archives, vec!["r2".to_string()]);
        assert!(plan.inserts.is_empty());
    }

    #[test]
    fn test_new_composition_is_inserted() {
        let current = vec![rv("r1", false, &[("a", Side::Prompt), ("b", Side::Answer)])];
        let desired = vec![
            elems(&[("a", Side::Prompt), ("b", Side::Answer)]),
            elems(&[("a", Side::Prompt), ("c", Side::Answer)]),
        ];

        let plan = plan_reviewables(&current, &desired);
        assert_eq!(
            plan.inserts,
            vec![elems(&[("a", Side::Prompt), ("c", Side::Answer)])]
        );
        assert!(plan.archives.is_empty());
    }
}
