//! Reviewable candidate generation.
//!
//! Pure combinatorial derivation of candidate reviewables from a
//! note's ordered field list. No I/O; reconciliation decides what the
//! candidates mean against persisted state.

use crate::config::NoteConfig;
use crate::types::{ReviewableElement, Side};

/// Generate candidate reviewables from an ordered field list.
///
/// Each candidate is an ordered field-id list whose first element is
/// the prompt and whose remaining elements are answers:
///
/// - separable=false: one combined card `[f0, f1, .., fN-1]`; when
///   reversible, additionally the list left-rotated by one. Reversible
///   toggles between exactly two orderings regardless of N, it does
///   not enumerate every rotation.
/// - separable=true, reversible=false: anchor pairs `[f0, fj]` for
///   j = 1..N-1, ascending.
/// - separable=true, reversible=true: all ordered pairs `[fi, fj]`,
///   i ascending, then j ascending over 0..N-1 excluding i.
///
/// Callers must pass at least two fields; fewer produce no candidates.
pub fn generate(fields: &[String], config: NoteConfig) -> Vec<Vec<String>> {
    let n = fields.len();
    if n < 2 {
        return Vec::new();
    }

    let mut candidates = Vec::new();

    if !config.separable {
        candidates.push(fields.to_vec());
        if config.reversible {
            let mut rotated = fields.to_vec();
            rotated.rotate_left(1);
            candidates.push(rotated);
        }
        return candidates;
    }

    if config.reversible {
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    candidates.push(vec![fields[i].clone(), fields[j].clone()]);
                }
            }
        }
    } else {
        for j in 1..n {
            candidates.push(vec![fields[0].clone(), fields[j].clone()]);
        }
    }

    candidates
}

/// Expand a candidate into reviewable elements in emission order: the
/// first field takes the prompt side, the rest the answer side.
pub fn candidate_elements(candidate: &[String]) -> Vec<ReviewableElement> {
    candidate
        .iter()
        .enumerate()
        .map(|(idx, field_id)| {
            let side = if idx == 0 { Side::Prompt } else { Side::Answer };
            ReviewableElement::new(field_id.clone(), side)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{}", i)).collect()
    }

    fn config(reversible: bool, separable: bool) -> NoteConfig {
        NoteConfig {
            reversible,
            separable,
        }
    }

    #[test]
    fn test_combined_single_candidate() {
        for n in 2..=5 {
            let f = fields(n);
            let out = generate(&f, config(false, false));
            assert_eq!(out.len(), 1, "N={}", n);
            assert_eq!(out[0], f);
        }
    }

    #[test]
    fn test_combined_reversible_is_identity_plus_rotation() {
        for n in 2..=5 {
            let f = fields(n);
            let out = generate(&f, config(true, false));
            assert_eq!(out.len(), 2, "N={}", n);
            assert_eq!(out[0], f);

            let mut rotated = f.clone();
            rotated.rotate_left(1);
            assert_eq!(out[1], rotated);
        }
    }

    #[test]
    fn test_separable_anchor_pairs() {
        for n in 2..=5 {
            let f = fields(n);
            let out = generate(&f, config(false, true));
            assert_eq!(out.len(), n - 1, "N={}", n);
            for (k, pair) in out.iter().enumerate() {
                assert_eq!(pair.as_slice(), &[f[0].clone(), f[k + 1].clone()]);
            }
        }
    }

    #[test]
    fn test_separable_reversible_all_ordered_pairs() {
        for n in 2..=5 {
            let f = fields(n);
            let out = generate(&f, config(true, true));
            assert_eq!(out.len(), n * (n - 1), "N={}", n);

            let mut expected = Vec::new();
            for i in 0..n {
                for j in 0..n {
                    if i != j {
                        expected.push(vec![f[i].clone(), f[j].clone()]);
                    }
                }
            }
            assert_eq!(out, expected);
        }
    }

    #[test]
    fn test_three_fields_reversible_separable_exact_order() {
        let f = fields(3);
        let out = generate(&f, config(true, true));
        let expected: Vec<Vec<String>> = vec![
            vec!["f0".into(), "f1".into()],
            vec!["f0".into(), "f2".into()],
            vec!["f1".into(), "f0".into()],
            vec!["f1".into(), "f2".into()],
            vec!["f2".into(), "f0".into()],
            vec!["f2".into(), "f1".into()],
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn test_fewer_than_two_fields_yields_nothing() {
        assert!(generate(&fields(0), config(true, true)).is_empty());
        assert!(generate(&fields(1), config(true, true)).is_empty());
    }

    #[test]
    fn test_candidate_elements_sides() {
        let elems = candidate_elements(&["a".to_string(), "b".to_string(), "c".to_string()]);
        assert_eq!(elems[0], ReviewableElement::new("a", Side::Prompt));
        assert_eq!(elems[1], ReviewableElement::new("b", Side::Answer));
        assert_eq!(elems[2], ReviewableElement::new("c", Side::Answer));
    }
}
