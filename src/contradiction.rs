/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Contradiction density: how much belief mass sits on mutually exclusive
//! hypothesis pairs.
//!
//! ```text
//! ρ = 0.5 · pᵗ Ξ p
//! ```
//!
//! The 0.5 factor counts each unordered pair once. With a zero diagonal and
//! entries in [0, 1], ρ lies in [0, 0.5] for any normalized `p`; the result
//! is still clamped to [0, 1] so an unnormalized vector cannot push it out of
//! range.
//!
//! # Invariants
//!
//! - ρ is invariant under a consistent relabeling of hypotheses.
//! - ρ is zero with fewer than two hypotheses.

use crate::exclusivity::Exclusivity;
use crate::state::State;

/// ρ for a posterior vector over an aligned exclusivity matrix.
///
/// `p` must be index-aligned with `exclusivity`; the kernel's consistency
/// check guarantees this for [`State`].
pub fn density(p: &[f64], exclusivity: &Exclusivity) -> f64 {
    let n = p.len();
    if n < 2 || exclusivity.len() != n {
        return 0.0;
    }
    let mut quad = 0.0;
    for i in 0..n {
        if p[i] == 0.0 {
            continue;
        }
        for j in 0..n {
            quad += p[i] * exclusivity.at(i, j) * p[j];
        }
    }
    (0.5 * quad).clamp(0.0, 1.0)
}

/// ρ of a state's current posteriors.
pub fn contradiction_density(state: &State) -> f64 {
    density(state.posteriors(), state.exclusivity())
}

/// Pairs carrying contradictory mass, strongest first.
///
/// Strength of a pair is `Ξ[i,j] · p[i] · p[j]`. Only pairs with `Ξ > 0` and
/// strength `>= threshold` are listed. Diagnostic only: nothing in the
/// kernel branches on this list.
pub fn identify_contradictions(state: &State, threshold: f64) -> Vec<(String, String, f64)> {
    let p = state.posteriors();
    let x = state.exclusivity();
    let hyps = state.hypotheses();
    let mut out = Vec::new();
    for i in 0..hyps.len() {
        for j in (i + 1)..hyps.len() {
            let xi = x.at(i, j);
            if xi <= 0.0 {
                continue;
            }
            let strength = xi * p[i] * p[j];
            if strength >= threshold {
                out.push((hyps[i].id().to_string(), hyps[j].id().to_string(), strength));
            }
        }
    }
    out.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(core::cmp::Ordering::Equal));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypothesis::Hypothesis;

    fn state(ids: &[&str]) -> State {
        let hyps = ids
            .iter()
            .map(|id| Hypothesis::new(*id, *id, 0.5).unwrap())
            .collect();
        State::from_hypotheses(hyps, 16).unwrap()
    }

    #[test]
    fn test_density_two_hypothesis_example() {
        let x = Exclusivity::from_rules(["a", "b"], &[("a", "b", 0.9)], &[], 0.0).unwrap();
        // 0.5 * 2 * 0.9 * 0.7 * 0.6
        let rho = density(&[0.7, 0.6], &x);
        assert!((rho - 0.378).abs() < 1e-12, "rho={}", rho);
    }

    #[test]
    fn test_density_single_hypothesis_is_zero() {
        let x = Exclusivity::zeros(vec!["a".to_string()], 0.0).unwrap();
        assert_eq!(density(&[1.0], &x), 0.0);
    }

    #[test]
    fn test_density_bounded_for_normalized() {
        let x = Exclusivity::from_rules(["a", "b", "c"], &[], &[(vec!["a", "b", "c"], 1.0)], 0.0)
            .unwrap();
        let rho = density(&[1.0 / 3.0; 3], &x);
        assert!(rho > 0.0 && rho <= 0.5, "rho={}", rho);
    }

    #[test]
    fn test_density_relabeling_invariant() {
        let x = Exclusivity::from_rules(["a", "b", "c"], &[("a", "b", 0.9), ("b", "c", 0.3)], &[], 0.0)
            .unwrap();
        let y = x.reconcile(&["c".to_string(), "a".to_string(), "b".to_string()]).unwrap();
        let p = [0.5, 0.3, 0.2];
        let q = [0.2, 0.5, 0.3];
        assert!((density(&p, &x) - density(&q, &y)).abs() < 1e-12);
    }

    #[test]
    fn test_identify_contradictions_sorted_and_thresholded() {
        let mut s = state(&["a", "b", "c"]);
        let x = Exclusivity::from_rules(
            ["a", "b", "c"],
            &[("a", "b", 0.9), ("a", "c", 0.2)],
            &[],
            0.0,
        )
        .unwrap();
        s.set_exclusivity(x).unwrap();
        s.set_posteriors(vec![0.5, 0.3, 0.2]).unwrap();

        let all = identify_contradictions(&s, 0.0);
        assert_eq!(all.len(), 2);
        assert_eq!((all[0].0.as_str(), all[0].1.as_str()), ("a", "b"));
        assert!((all[0].2 - 0.135).abs() < 1e-12);

        let strong = identify_contradictions(&s, 0.05);
        assert_eq!(strong.len(), 1);
        assert!((contradiction_density(&s) - s.contradiction_density()).abs() < 1e-12);
    }
}
