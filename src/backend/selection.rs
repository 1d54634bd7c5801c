//! Feature-weighted implementation choice
//!
//! Filter by required features, score by desired features, tie-break by
//! walking the desired list. A tie that survives every desired feature is
//! implementation-defined; callers must not depend on which candidate wins.

use super::errors::{SelectionError, SelectionResult};
use super::{Feature, FeatureSupport};

/// Selects the implementation that supports every required feature and
/// scores highest on the desired features.
///
/// Desired features are ordered most-desired first; the feature at position
/// `k` carries weight `desired.len() - k`.
pub fn select_implementation<'a, C>(
    candidates: &[&'a C],
    required: &[Feature],
    desired: &[Feature],
) -> SelectionResult<&'a C>
where
    C: FeatureSupport + ?Sized,
{
    if candidates.is_empty() {
        return Err(SelectionError::NoCandidates);
    }

    let qualified: Vec<&C> = candidates
        .iter()
        .copied()
        .filter(|c| required.iter().all(|f| c.supports(f)))
        .collect();

    if qualified.is_empty() {
        // distinguish a single unsupportable feature from a conjunction no
        // one candidate can satisfy
        for feature in required {
            if !candidates.iter().any(|c| c.supports(feature)) {
                return Err(SelectionError::FeatureUnsupported(feature.clone()));
            }
        }
        return Err(SelectionError::ConflictingRequirements(required.to_vec()));
    }

    let score = |c: &C| -> usize {
        desired
            .iter()
            .enumerate()
            .filter(|(_, f)| c.supports(f))
            .map(|(k, _)| desired.len() - k)
            .sum()
    };

    let best = qualified.iter().map(|c| score(c)).max().unwrap_or(0);
    let mut tied: Vec<&C> = qualified
        .into_iter()
        .filter(|c| score(c) == best)
        .collect();

    if tied.len() > 1 {
        // narrow by each desired feature in order, but never to emptiness
        for feature in desired {
            let narrowed: Vec<&C> = tied
                .iter()
                .copied()
                .filter(|c| c.supports(feature))
                .collect();
            if !narrowed.is_empty() {
                tied = narrowed;
            }
            if tied.len() == 1 {
                break;
            }
        }
    }

    // residual ties are implementation-defined
    Ok(tied[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ImplementationId;

    #[derive(Debug)]
    struct Candidate {
        id: ImplementationId,
        features: Vec<Feature>,
    }

    impl Candidate {
        fn new(id: &str, features: &[&str]) -> Self {
            Self {
                id: ImplementationId::new(id),
                features: features.iter().copied().map(Feature::new).collect(),
            }
        }
    }

    impl FeatureSupport for Candidate {
        fn implementation_id(&self) -> &ImplementationId {
            &self.id
        }

        fn supported_features(&self) -> &[Feature] {
            &self.features
        }
    }

    fn f(name: &str) -> Feature {
        Feature::new(name)
    }

    #[test]
    fn test_highest_score_wins() {
        // required={A}, desired=[B, C] with weights 2, 1
        let x = Candidate::new("x", &["A", "B"]); // score 2
        let y = Candidate::new("y", &["A", "C"]); // score 1
        let z = Candidate::new("z", &["A"]); // score 0
        let winner =
            select_implementation(&[&x, &y, &z], &[f("A")], &[f("B"), f("C")]).unwrap();
        assert_eq!(winner.implementation_id().as_str(), "x");
    }

    #[test]
    fn test_required_feature_unsupported_anywhere() {
        let x = Candidate::new("x", &["A"]);
        let y = Candidate::new("y", &["B"]);
        let err = select_implementation(&[&x, &y], &[f("A"), f("Z")], &[]).unwrap_err();
        assert_eq!(err, SelectionError::FeatureUnsupported(f("Z")));
    }

    #[test]
    fn test_conflicting_requirements() {
        // A and Z each supported somewhere, but never together
        let x = Candidate::new("x", &["A"]);
        let y = Candidate::new("y", &["Z"]);
        let err = select_implementation(&[&x, &y], &[f("A"), f("Z")], &[]).unwrap_err();
        assert!(matches!(err, SelectionError::ConflictingRequirements(_)));
    }

    #[test]
    fn test_no_candidates() {
        let empty: Vec<&Candidate> = Vec::new();
        let err = select_implementation(&empty, &[], &[]).unwrap_err();
        assert_eq!(err, SelectionError::NoCandidates);
    }

    #[test]
    fn test_tie_break_narrows_in_desired_order() {
        // desired=[A, B, C] weights 3, 2, 1: x={A} scores 3, y={B, C}
        // scores 3. The tie-break walks A first and keeps only x.
        let x = Candidate::new("x", &["A"]);
        let y = Candidate::new("y", &["B", "C"]);
        let winner =
            select_implementation(&[&y, &x], &[], &[f("A"), f("B"), f("C")]).unwrap();
        assert_eq!(winner.implementation_id().as_str(), "x");
    }

    #[test]
    fn test_tie_break_skips_emptying_feature() {
        // both support B only; narrowing by C would empty the set, so it is
        // skipped and the residual tie resolves without error
        let x = Candidate::new("x", &["B"]);
        let y = Candidate::new("y", &["B"]);
        let winner = select_implementation(&[&x, &y], &[], &[f("B"), f("C")]).unwrap();
        let id = winner.implementation_id().as_str();
        assert!(id == "x" || id == "y");
    }

    #[test]
    fn test_identical_candidates_do_not_throw() {
        let x = Candidate::new("x", &["A", "B"]);
        let y = Candidate::new("y", &["A", "B"]);
        let winner = select_implementation(&[&x, &y], &[f("A")], &[f("B")]).unwrap();
        let id = winner.implementation_id().as_str();
        assert!(id == "x" || id == "y");
    }

    #[test]
    fn test_empty_required_accepts_all() {
        let x = Candidate::new("x", &[]);
        let winner = select_implementation(&[&x], &[], &[f("B")]).unwrap();
        assert_eq!(winner.implementation_id().as_str(), "x");
    }
}
