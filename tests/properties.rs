//! Property-based tests for the kernel's structural invariants.

use proptest::prelude::*;

use nepsis_core::channel::red::escalate_ruin;
use nepsis_core::contradiction::density;
use nepsis_core::{
    CollapseGovernor, CollapseMode, Exclusivity, Hypothesis, Kernel, KernelConfig, Signal,
    SignalKind, State,
};

// ============================================================================
// Generators
// ============================================================================

/// Hypothesis count used by most properties.
const MAX_HYPOTHESES: usize = 6;

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("h{i}")).collect()
}

/// Symmetric pair rules over `n` ids, values possibly outside [0, 1].
fn arb_rules(n: usize) -> impl Strategy<Value = Vec<(usize, usize, f64)>> {
    prop::collection::vec((0..n, 0..n, -0.5f64..1.5), 0..(n * n))
}

/// Normalized posterior vector of length `n`.
fn arb_posteriors(n: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..1.0, n).prop_map(|v| {
        let total: f64 = v.iter().sum();
        if total <= 1e-9 {
            vec![1.0 / v.len() as f64; v.len()]
        } else {
            v.iter().map(|x| x / total).collect()
        }
    })
}

fn build(n: usize, rules: &[(usize, usize, f64)]) -> Exclusivity {
    let names = ids(n);
    let pairs: Vec<(&str, &str, f64)> = rules
        .iter()
        .map(|&(a, b, xi)| (names[a].as_str(), names[b].as_str(), xi))
        .collect();
    Exclusivity::from_rules(names.clone(), &pairs, &[], 0.0).unwrap()
}

fn state_with(n: usize, rules: &[(usize, usize, f64)], p: Vec<f64>) -> State {
    let hyps = ids(n)
        .into_iter()
        .map(|id| Hypothesis::new(id, "H", 0.5).unwrap())
        .collect();
    let mut s = State::from_hypotheses(hyps, 4).unwrap();
    s.set_exclusivity(build(n, rules)).unwrap();
    s.set_posteriors(p).unwrap();
    s
}

// ============================================================================
// Exclusivity
// ============================================================================

proptest! {
    #[test]
    fn prop_exclusivity_symmetric_zero_diagonal(
        (n, rules) in (1..=MAX_HYPOTHESES).prop_flat_map(|n| (Just(n), arb_rules(n)))
    ) {
        let x = build(n, &rules);
        let names = ids(n);
        for a in &names {
            prop_assert_eq!(x.get(a, a), 0.0);
            for b in &names {
                let v = x.get(a, b);
                prop_assert_eq!(v, x.get(b, a));
                prop_assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}

// ============================================================================
// Contradiction density
// ============================================================================

proptest! {
    #[test]
    fn prop_rho_bounded_for_normalized_posteriors(
        (n, rules, p) in (2..=MAX_HYPOTHESES)
            .prop_flat_map(|n| (Just(n), arb_rules(n), arb_posteriors(n)))
    ) {
        let x = build(n, &rules);
        let rho = density(&p, &x);
        prop_assert!(rho >= 0.0);
        prop_assert!(rho <= 0.5 + 1e-12, "rho={}", rho);
    }

    #[test]
    fn prop_rho_invariant_under_relabeling(
        (n, rules, p, rot) in (2..=MAX_HYPOTHESES)
            .prop_flat_map(|n| (Just(n), arb_rules(n), arb_posteriors(n), 0..n))
    ) {
        let x = build(n, &rules);
        let names = ids(n);
        // rotate the id order by `rot` and permute p to match
        let order: Vec<usize> = (0..n).map(|i| (i + rot) % n).collect();
        let relabeled: Vec<String> = order.iter().map(|&i| names[i].clone()).collect();
        let y = x.reconcile(&relabeled).unwrap();
        let q: Vec<f64> = order.iter().map(|&i| p[i]).collect();
        prop_assert!((density(&p, &x) - density(&q, &y)).abs() < 1e-12);
    }
}

// ============================================================================
// Ruin
// ============================================================================

proptest! {
    #[test]
    fn prop_ruin_never_decreases(
        start in 0.0f64..1.0,
        steps in prop::collection::vec((0.0f64..1.0, any::<bool>()), 1..30)
    ) {
        let mut ruin = start;
        for (rho, red) in steps {
            let next = escalate_ruin(ruin, rho, red);
            prop_assert!(next >= ruin);
            prop_assert!(next <= 1.0);
            ruin = next;
        }
    }

    #[test]
    fn prop_kernel_ruin_monotone_and_posteriors_normalized(
        values in prop::collection::vec((0.0f64..2.0, any::<bool>()), 1..20)
    ) {
        let model = |s: &Signal, h: &Hypothesis| {
            if h.id() == "h0" { s.value / 2.0 } else { 1.0 - s.value / 2.0 }
        };
        let kernel = Kernel::new(KernelConfig::default(), model).unwrap();
        let hyps = ids(3).into_iter().map(|id| Hypothesis::new(id, "H", 0.3).unwrap()).collect();
        let mut state = kernel.new_state(hyps).unwrap();
        let mut last = 0.0;
        for (i, (v, red)) in values.into_iter().enumerate() {
            let kind = if red { SignalKind::Red } else { SignalKind::Lab };
            let m = kernel.step(&mut state, &Signal::new(kind, format!("s{i}"), v), None).unwrap();
            prop_assert!(m.ruin >= last);
            last = m.ruin;
            let total: f64 = state.posteriors().iter().sum();
            prop_assert!((total - 1.0).abs() < 1e-9, "total={}", total);
        }
    }
}

// ============================================================================
// Hickam clustering
// ============================================================================

proptest! {
    #[test]
    fn prop_cluster_pairwise_compatible_and_mass_consistent(
        (n, rules, p) in (2..=MAX_HYPOTHESES)
            .prop_flat_map(|n| (Just(n), arb_rules(n), arb_posteriors(n)))
    ) {
        let mut s = state_with(n, &rules, p);
        s.set_collapse_mode(CollapseMode::Hickam);
        let governor = CollapseGovernor::default();
        let limit = governor.policy().hickam_max_pair_exclusivity;
        let c = governor.hickam_cluster(&s);

        for (i, a) in c.members.iter().enumerate() {
            for b in &c.members[i + 1..] {
                prop_assert!(s.exclusivity().get(a, b) <= limit);
            }
        }
        let mass: f64 = c.members.iter().map(|id| s.posterior(id).unwrap()).sum();
        prop_assert!((mass - c.mass).abs() < 1e-12);
        if c.formed {
            prop_assert!(c.members.len() >= 2);
            prop_assert!(c.mass >= governor.policy().hickam_mass_threshold);
        }
    }
}
