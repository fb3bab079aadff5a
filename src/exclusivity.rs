/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Pairwise mutual-exclusivity matrix Ξ between hypotheses.
//!
//! `Ξ[i,j] ∈ [0.0, 1.0]`: 0 means the two hypotheses can co-occur, 1 means
//! they cannot both be true.
//!
//! Three ways to build one:
//!
//! - [`Exclusivity::from_rules`]: expert pair and group rules.
//! - [`Exclusivity::infer_from_expectations`]: fraction of shared
//!   expectation keys on which two hypotheses disagree.
//! - [`Exclusivity::from_pair_map`]: adapter from a `(a, b) → ξ` map.
//!
//! When the hypothesis set changes, [`Exclusivity::reconcile`] produces a new
//! matrix over the new id list that keeps every pair whose endpoints survive.
//!
//! # Invariants
//!
//! - Square, symmetric, zero diagonal, every entry in [0.0, 1.0]. Enforced by
//!   [`Exclusivity::new`]; every builder goes through it.
//! - `get(a, b) == get(b, a)`; `get(a, a) == 0`; unknown ids give `default`.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::error::{NepsisError, NepsisResult};
use crate::hypothesis::Hypothesis;

/// Absolute tolerance for the symmetry and zero-diagonal checks.
const SYMMETRY_TOL: f64 = 1e-9;

/// Typed exclusivity matrix with its hypothesis ordering.
#[derive(Clone, Debug, PartialEq)]
pub struct Exclusivity {
    /// Ordered hypothesis ids; row/column `i` belongs to `ids[i]`.
    ids: Vec<String>,
    /// Row-major `n × n` matrix.
    matrix: Vec<f64>,
    /// Value returned for lookups involving an unknown id.
    default: f64,
    /// id → row index.
    index: HashMap<String, usize>,
}

impl Exclusivity {
    /// Validate and wrap a row-major matrix.
    ///
    /// Fails with [`NepsisError::Exclusivity`] if the matrix is not
    /// `ids.len()²` long, is asymmetric, has a non-zero diagonal, holds an
    /// entry outside [0.0, 1.0], if `default` is outside [0.0, 1.0], or if
    /// an id repeats.
    pub fn new(ids: Vec<String>, matrix: Vec<f64>, default: f64) -> NepsisResult<Self> {
        let n = ids.len();
        if matrix.len() != n * n {
            return Err(NepsisError::Exclusivity(format!(
                "matrix has {} entries, expected {n}x{n}",
                matrix.len()
            )));
        }
        if !(0.0..=1.0).contains(&default) {
            return Err(NepsisError::Exclusivity(format!(
                "default must be in [0, 1], got {default}"
            )));
        }
        for i in 0..n {
            if matrix[i * n + i].abs() > SYMMETRY_TOL {
                return Err(NepsisError::Exclusivity(format!(
                    "diagonal entry ({i},{i}) is {}, must be zero",
                    matrix[i * n + i]
                )));
            }
            for j in 0..n {
                let v = matrix[i * n + j];
                if !(0.0..=1.0).contains(&v) {
                    return Err(NepsisError::Exclusivity(format!(
                        "entry ({i},{j}) = {v} outside [0, 1]"
                    )));
                }
                if (v - matrix[j * n + i]).abs() > SYMMETRY_TOL {
                    return Err(NepsisError::Exclusivity(format!(
                        "matrix not symmetric at ({i},{j}): {v} vs {}",
                        matrix[j * n + i]
                    )));
                }
            }
        }
        let mut index = HashMap::with_capacity(n);
        for (i, id) in ids.iter().enumerate() {
            if index.insert(id.clone(), i).is_some() {
                return Err(NepsisError::Exclusivity(format!("duplicate id '{id}'")));
            }
        }
        Ok(Self {
            ids,
            matrix,
            default,
            index,
        })
    }

    /// All-zero matrix over `ids`.
    pub fn zeros(ids: Vec<String>, default: f64) -> NepsisResult<Self> {
        let n = ids.len();
        Self::new(ids, vec![0.0; n * n], default)
    }

    /// Build from expert rules.
    ///
    /// Pair rules are applied first, then group rules: every pair inside a
    /// group receives the group value, keeping the larger value where a pair
    /// rule already set one. All values are clamped to [0.0, 1.0] and the
    /// diagonal is forced to zero. Rules naming ids not in `ids` are ignored.
    pub fn from_rules<S: Into<String>>(
        ids: impl IntoIterator<Item = S>,
        pairs: &[(&str, &str, f64)],
        groups: &[(Vec<&str>, f64)],
        default: f64,
    ) -> NepsisResult<Self> {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        let n = ids.len();
        let idx: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, h)| (h.as_str(), i)).collect();
        let mut m = vec![0.0; n * n];

        for &(a, b, xi) in pairs {
            if let (Some(&i), Some(&j)) = (idx.get(a), idx.get(b)) {
                let xi = clamp_unit(xi);
                m[i * n + j] = xi;
                m[j * n + i] = xi;
            }
        }

        for (group, xi) in groups {
            let xi = clamp_unit(*xi);
            for (k, a) in group.iter().enumerate() {
                for b in &group[k + 1..] {
                    if let (Some(&i), Some(&j)) = (idx.get(a), idx.get(b)) {
                        let v = m[i * n + j].max(xi);
                        m[i * n + j] = v;
                        m[j * n + i] = v;
                    }
                }
            }
        }

        for i in 0..n {
            m[i * n + i] = 0.0;
        }
        drop(idx);
        Self::new(ids, m, default)
    }

    /// Infer exclusivity from conflicting hypothesis expectations.
    ///
    /// For each pair, only expectation keys both hypotheses declare are
    /// considered. Exclusivity is the weighted fraction of those keys whose
    /// expected values differ; weights come from `signal_weights` (missing
    /// keys weigh 1.0). Pairs with no shared key get 0.
    pub fn infer_from_expectations(
        hypotheses: &[Hypothesis],
        signal_weights: Option<&HashMap<String, f64>>,
        default: f64,
    ) -> NepsisResult<Self> {
        let n = hypotheses.len();
        let ids: Vec<String> = hypotheses.iter().map(|h| h.id().to_string()).collect();
        let mut m = vec![0.0; n * n];

        for i in 0..n {
            for j in (i + 1)..n {
                let (hi, hj) = (&hypotheses[i], &hypotheses[j]);
                let mut conflict = 0.0;
                let mut weight_sum = 0.0;
                for (key, expected_i) in hi.expects() {
                    let Some(expected_j) = hj.expectation(key) else {
                        continue;
                    };
                    let w = signal_weights
                        .and_then(|sw| sw.get(key).copied())
                        .unwrap_or(1.0);
                    weight_sum += w;
                    if expected_i != expected_j {
                        conflict += w;
                    }
                }
                let xi = if weight_sum > 0.0 {
                    clamp_unit(conflict / weight_sum)
                } else {
                    0.0
                };
                m[i * n + j] = xi;
                m[j * n + i] = xi;
            }
        }
        Self::new(ids, m, default)
    }

    /// Adapter from a `(a, b) → ξ` map onto [`Exclusivity::from_rules`].
    pub fn from_pair_map<S: Into<String>>(
        ids: impl IntoIterator<Item = S>,
        pair_map: &BTreeMap<(String, String), f64>,
        default: f64,
    ) -> NepsisResult<Self> {
        let pairs: Vec<(&str, &str, f64)> = pair_map
            .iter()
            .map(|((a, b), &xi)| (a.as_str(), b.as_str(), xi))
            .collect();
        Self::from_rules(ids, &pairs, &[], default)
    }

    /// Rebuild over a new id list, copying every pair whose endpoints both
    /// exist in `self`. Pairs involving a new id start at `default`.
    pub fn reconcile(&self, ids: &[String]) -> NepsisResult<Self> {
        let n = ids.len();
        let mut m = vec![0.0; n * n];
        for i in 0..n {
            for j in (i + 1)..n {
                let v = match (self.index.get(&ids[i]), self.index.get(&ids[j])) {
                    (Some(&a), Some(&b)) => self.at(a, b),
                    _ => self.default,
                };
                m[i * n + j] = v;
                m[j * n + i] = v;
            }
        }
        Self::new(ids.to_vec(), m, self.default)
    }

    /// Symmetric O(1) lookup by id.
    ///
    /// Returns 0 on the diagonal and `default` when either id is unknown.
    pub fn get(&self, h1: &str, h2: &str) -> f64 {
        if h1 == h2 {
            return 0.0;
        }
        match (self.index.get(h1), self.index.get(h2)) {
            (Some(&i), Some(&j)) => self.at(i, j),
            _ => self.default,
        }
    }

    /// Lookup by row/column index. Callers guarantee both are in range.
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.matrix[i * self.ids.len() + j]
    }

    /// `true` if the id list equals `ids` element by element.
    pub fn is_aligned_with<S: AsRef<str>>(&self, ids: &[S]) -> bool {
        self.ids.len() == ids.len()
            && self.ids.iter().zip(ids.iter()).all(|(a, b)| a == b.as_ref())
    }

    /// Ordered hypothesis ids.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Row-major matrix.
    pub fn matrix(&self) -> &[f64] {
        &self.matrix
    }

    /// Number of hypotheses covered.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// `true` when no hypotheses are covered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Value returned for unknown ids.
    pub fn default_value(&self) -> f64 {
        self.default
    }

    /// Number of unordered pairs with non-zero exclusivity.
    pub fn nonzero_pairs(&self) -> usize {
        let n = self.ids.len();
        (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .filter(|&(i, j)| self.at(i, j) != 0.0)
            .count()
    }
}

impl core::fmt::Display for Exclusivity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Exclusivity(n={}, nonzero={})", self.len(), self.nonzero_pairs())
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypothesis::Expectation;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_rules_pairs() {
        let x = Exclusivity::from_rules(
            ["h1", "h2", "h3"],
            &[("h1", "h2", 0.9), ("h1", "h3", 0.5)],
            &[],
            0.0,
        )
        .unwrap();
        assert!((x.get("h1", "h2") - 0.9).abs() < 1e-12);
        assert!((x.get("h2", "h1") - 0.9).abs() < 1e-12);
        assert!((x.get("h1", "h3") - 0.5).abs() < 1e-12);
        assert_eq!(x.get("h2", "h3"), 0.0);
    }

    #[test]
    fn test_from_rules_groups_take_max() {
        let x = Exclusivity::from_rules(
            ["a", "b", "c"],
            &[("a", "b", 0.95), ("a", "c", 0.2)],
            &[(vec!["a", "b", "c"], 0.8)],
            0.0,
        )
        .unwrap();
        // pair rule higher than group: keeps pair value
        assert!((x.get("a", "b") - 0.95).abs() < 1e-12);
        // pair rule lower than group: group wins
        assert!((x.get("a", "c") - 0.8).abs() < 1e-12);
        assert!((x.get("b", "c") - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_from_rules_clamps_and_ignores_unknown() {
        let x = Exclusivity::from_rules(
            ["a", "b"],
            &[("a", "b", 3.0), ("a", "zzz", 0.5), ("a", "a", 0.7)],
            &[(vec!["b", "ghost"], 0.4)],
            0.0,
        )
        .unwrap();
        assert_eq!(x.get("a", "b"), 1.0);
        assert_eq!(x.at(0, 0), 0.0);
        assert_eq!(x.nonzero_pairs(), 1);
    }

    #[test]
    fn test_new_rejects_malformed() {
        assert!(matches!(
            Exclusivity::new(ids(&["a", "b"]), vec![0.0, 0.5, 0.4, 0.0], 0.0),
            Err(NepsisError::Exclusivity(_))
        ));
        assert!(matches!(
            Exclusivity::new(ids(&["a", "b"]), vec![0.1, 0.5, 0.5, 0.0], 0.0),
            Err(NepsisError::Exclusivity(_))
        ));
        assert!(matches!(
            Exclusivity::new(ids(&["a", "b"]), vec![0.0, 0.5, 0.5], 0.0),
            Err(NepsisError::Exclusivity(_))
        ));
        assert!(matches!(
            Exclusivity::new(ids(&["a", "b"]), vec![0.0, 1.5, 1.5, 0.0], 0.0),
            Err(NepsisError::Exclusivity(_))
        ));
        assert!(matches!(
            Exclusivity::new(ids(&["a", "a"]), vec![0.0; 4], 0.0),
            Err(NepsisError::Exclusivity(_))
        ));
    }

    #[test]
    fn test_get_unknown_returns_default_and_diagonal_zero() {
        let x = Exclusivity::from_rules(["a", "b"], &[("a", "b", 0.6)], &[], 0.25).unwrap();
        assert_eq!(x.get("unknown", "a"), 0.25);
        assert_eq!(x.get("a", "unknown"), 0.25);
        assert_eq!(x.get("a", "a"), 0.0);
    }

    #[test]
    fn test_infer_from_expectations_fraction() {
        let h1 = Hypothesis::new("h1", "A", 0.5)
            .unwrap()
            .with_expectation("fever", Expectation::Flag(true))
            .with_expectation("cough", Expectation::Flag(true));
        let h2 = Hypothesis::new("h2", "B", 0.5)
            .unwrap()
            .with_expectation("fever", Expectation::Flag(false))
            .with_expectation("cough", Expectation::Flag(true));
        let h3 = Hypothesis::new("h3", "C", 0.5)
            .unwrap()
            .with_expectation("rash", Expectation::Flag(true));

        let x = Exclusivity::infer_from_expectations(&[h1, h2, h3], None, 0.0).unwrap();
        assert!((x.get("h1", "h2") - 0.5).abs() < 1e-12);
        // no shared keys
        assert_eq!(x.get("h1", "h3"), 0.0);
        assert_eq!(x.get("h2", "h3"), 0.0);
    }

    #[test]
    fn test_infer_from_expectations_weighted() {
        let h1 = Hypothesis::new("h1", "A", 0.5)
            .unwrap()
            .with_expectation("fever", Expectation::Flag(true))
            .with_expectation("cough", Expectation::Flag(true));
        let h2 = Hypothesis::new("h2", "B", 0.5)
            .unwrap()
            .with_expectation("fever", Expectation::Flag(false))
            .with_expectation("cough", Expectation::Flag(true));
        let mut w = HashMap::new();
        w.insert("fever".to_string(), 3.0);

        let x = Exclusivity::infer_from_expectations(&[h1, h2], Some(&w), 0.0).unwrap();
        // 3 / (3 + 1)
        assert!((x.get("h1", "h2") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_reconcile_preserves_known_pairs() {
        let old = Exclusivity::from_rules(
            ["a", "b", "c"],
            &[("a", "b", 0.9), ("b", "c", 0.3)],
            &[],
            0.1,
        )
        .unwrap();
        let new = old.reconcile(&ids(&["c", "b", "d"])).unwrap();
        assert!(new.is_aligned_with(&["c", "b", "d"]));
        assert!((new.get("b", "c") - 0.3).abs() < 1e-12);
        // new pairs start at default
        assert!((new.get("b", "d") - 0.1).abs() < 1e-12);
        assert!((new.get("c", "d") - 0.1).abs() < 1e-12);
        // dropped endpoint: unknown → default
        assert!((new.get("a", "b") - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_from_pair_map() {
        let mut map = BTreeMap::new();
        map.insert(("stemi".to_string(), "gerd".to_string()), 0.9);
        let x = Exclusivity::from_pair_map(["stemi", "gerd"], &map, 0.0).unwrap();
        assert!((x.get("gerd", "stemi") - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_display() {
        let x = Exclusivity::from_rules(["a", "b", "c"], &[("a", "b", 0.5)], &[], 0.0).unwrap();
        assert_eq!(x.to_string(), "Exclusivity(n=3, nonzero=1)");
    }
}
