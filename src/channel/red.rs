/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Red channel: safety pre-emption and monotone ruin accounting.
//!
//! Ruin is the running estimate that an irreversible bad outcome has already
//! become possible. It only ever grows within an episode.
//!
//! ```text
//! ruin' = min(1, ruin + 0.10·[red] + 0.05·max(0, ρ − 0.5))
//! ```
//!
//! For posteriors that sum to one ρ never exceeds 0.5, so the confusion term
//! only contributes when the posterior vector has been set unnormalized.

use crate::signal::{Signal, SignalKind};
use crate::state::State;

/// Ruin added by each red-channel signal.
pub const RED_RUIN_INCREMENT: f64 = 0.10;

/// ρ above which contradiction itself adds to ruin.
pub const CONFUSION_THRESHOLD: f64 = 0.5;

/// Ruin added per unit of ρ above [`CONFUSION_THRESHOLD`].
pub const CONFUSION_RATE: f64 = 0.05;

/// `true` if the signal must bypass belief updating.
pub fn check_red_preempt(signal: &Signal) -> bool {
    if let Some(threshold) = signal.red_threshold {
        if signal.value >= threshold {
            return true;
        }
    }
    signal.kind == SignalKind::Red
}

/// Pure ruin update: never returns less than `current` (clamped to [0, 1]).
pub fn escalate_ruin(current: f64, rho: f64, red: bool) -> f64 {
    let current = if current.is_nan() { 0.0 } else { current.clamp(0.0, 1.0) };
    let mut ruin = current;
    if red {
        ruin = (ruin + RED_RUIN_INCREMENT).min(1.0);
    }
    if rho > CONFUSION_THRESHOLD {
        ruin = (ruin + (rho - CONFUSION_THRESHOLD) * CONFUSION_RATE).min(1.0);
    }
    ruin.max(current)
}

/// Ruin after observing `signal` (if any) in `state`, starting from
/// `current`.
pub fn compute_ruin_probability(state: &State, current: f64, signal: Option<&Signal>) -> f64 {
    let red = signal.map_or(false, check_red_preempt);
    escalate_ruin(current, state.contradiction_density(), red)
}
