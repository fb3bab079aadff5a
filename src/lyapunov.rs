//! Lyapunov-style stability tracking.
//!
//! ```text
//! V = w_c·ρ + w_e·H(p) + w_h·mean|coh − p| + w_v·‖Δp‖₂
//! ```
//!
//! Lower V means a calmer belief state. `Δp` is measured against the last
//! history snapshot, or the one before it when the last snapshot equals the
//! current posteriors (as it does right after a blue-channel step).
//!
//! Convergence is a separate, all-or-nothing check over the recent history
//! (see [`check_convergence`]).

use crate::math;
use crate::state::State;

pub use crate::config::{ConvergenceCriteria, LyapunovWeights};

/// Lyapunov value of the current state.
pub fn lyapunov_value(state: &State, weights: &LyapunovWeights) -> f64 {
    let p = state.posteriors();

    let coh = state.coherence();
    let mismatch = if coh.is_empty() || coh.len() != p.len() {
        0.0
    } else {
        coh.iter().zip(p.iter()).map(|(c, q)| (c - q).abs()).sum::<f64>() / coh.len() as f64
    };

    weights.contradiction * state.contradiction_density()
        + weights.entropy * math::entropy(p)
        + weights.coherence * mismatch
        + weights.velocity * velocity(state)
}

/// `‖p − p_prev‖₂` where `p_prev` is the last history snapshot, or the one
/// before it when the last snapshot equals `p`. Zero without a comparable
/// snapshot.
pub fn velocity(state: &State) -> f64 {
    let p = state.posteriors();
    let history = state.history();
    let prev = match history.split_last() {
        None => return 0.0,
        Some((last, rest)) if last.as_slice() == p => match rest.last() {
            Some(prev) => prev,
            None => return 0.0,
        },
        Some((last, _)) => last,
    };
    if prev.len() != p.len() {
        return 0.0;
    }
    math::l2_distance(p, prev)
}

/// `dV = current − prev`. Negative means the state is settling.
pub fn lyapunov_gradient(prev: f64, current: f64) -> f64 {
    current - prev
}

/// `true` only if all of these hold:
///
/// - at least `window` history snapshots, all the same length as `p`;
/// - ρ ≤ `max_contradiction`;
/// - the largest L2 change between consecutive snapshots in the last
///   `window` is ≤ `tolerance`;
/// - top posterior ≥ `min_top`.
pub fn check_convergence(state: &State, criteria: &ConvergenceCriteria) -> bool {
    let history = state.history();
    let window = criteria.window.max(1);
    if history.len() < window {
        return false;
    }
    if state.contradiction_density() > criteria.max_contradiction {
        return false;
    }
    let recent = &history[history.len() - window..];
    let n = state.len();
    if recent.iter().any(|h| h.len() != n) {
        return false;
    }
    let max_change = recent
        .windows(2)
        .map(|w| math::l2_distance(&w[1], &w[0]))
        .fold(0.0, f64::max);
    if max_change > criteria.tolerance {
        return false;
    }
    state.top_hypothesis().1 >= criteria.min_top
}
