/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Collapse governor: when and how belief commits to a decision.
//!
//! Three disciplines:
//!
//! | Mode | Commits to | Requires |
//! |------|------------|----------|
//! | Occam | single top hypothesis | top ≥ min-top, ρ ≤ max-contradiction, ruin ≤ max-ruin |
//! | Hickam | cluster of compatible hypotheses | cluster of ≥ 2 with mass ≥ threshold, ruin ≤ max-ruin |
//! | ZeroBack | nothing: reset to the original hypotheses | ρ > zeroback threshold |
//!
//! # Hickam clustering
//!
//! Greedy over hypotheses sorted by posterior (descending, ties by index).
//! A candidate joins iff its exclusivity with every current member is within
//! the pairwise limit; an incompatible candidate is skipped, not fatal. The
//! scan succeeds as soon as the cluster has two or more members and enough
//! mass, and stops early at the first zero-posterior candidate.
//!
//! # Invariants
//!
//! - Every pair in a formed cluster has `Ξ ≤ hickam_max_pair_exclusivity`.
//! - Deciding never mutates the state; only [`CollapseGovernor::apply_collapse`]
//!   and [`CollapseGovernor::record_collapse`] do.

use crate::config::CollapsePolicy;
use crate::error::{NepsisError, NepsisResult};
use crate::hypothesis::MetaValue;
use crate::math;
use crate::state::{CollapseMode, State};

/// Metadata key: ids of the committed Hickam cluster.
pub const META_CLUSTER: &str = "collapse_cluster";
/// Metadata key: posterior mass of the committed Hickam cluster.
pub const META_MASS: &str = "collapse_mass";
/// Metadata key: id of the committed top hypothesis.
pub const META_TOP: &str = "collapse_top";
/// Metadata key: posterior of the committed top hypothesis.
pub const META_WEIGHT: &str = "collapse_weight";

/// What the governor decided.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CollapseDecision {
    /// Chosen discipline. Equal to the state's current mode when no collapse
    /// is warranted.
    pub mode: CollapseMode,
    /// Selected hypothesis ids. Empty for ZeroBack and for "no collapse".
    pub selected: Vec<String>,
}

impl CollapseDecision {
    /// `true` if the decision commits to something (a selection or a reset).
    pub fn is_collapse(&self) -> bool {
        self.mode == CollapseMode::ZeroBack || !self.selected.is_empty()
    }
}

/// Result of a Hickam clustering attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterOutcome {
    /// Whether the success criterion was met.
    pub formed: bool,
    /// Members in order of admission (partial on failure).
    pub members: Vec<String>,
    /// Posterior mass of the members.
    pub mass: f64,
}

/// Applies a [`CollapsePolicy`] to states.
#[derive(Clone, Copy, Debug, Default)]
pub struct CollapseGovernor {
    policy: CollapsePolicy,
}

impl CollapseGovernor {
    /// Governor with the given thresholds.
    pub fn new(policy: CollapsePolicy) -> Self {
        Self { policy }
    }

    /// Thresholds in use.
    pub fn policy(&self) -> &CollapsePolicy {
        &self.policy
    }

    /// Greedy Hickam clustering over the current posteriors.
    pub fn hickam_cluster(&self, state: &State) -> ClusterOutcome {
        let n = state.len();
        if n < 2 {
            return ClusterOutcome {
                formed: false,
                members: Vec::new(),
                mass: 0.0,
            };
        }
        let p = state.posteriors();
        let x = state.exclusivity();
        let limit = self.policy.hickam_max_pair_exclusivity;

        let mut cluster: Vec<usize> = Vec::new();
        let mut mass = 0.0;
        let mut formed = false;
        for i in math::argsort_desc(p) {
            if p[i] == 0.0 {
                break;
            }
            if cluster.iter().all(|&c| x.at(i, c) <= limit) {
                cluster.push(i);
                mass += p[i];
            }
            if cluster.len() >= 2 && mass >= self.policy.hickam_mass_threshold {
                formed = true;
                break;
            }
        }
        let hyps = state.hypotheses();
        ClusterOutcome {
            formed,
            members: cluster.iter().map(|&i| hyps[i].id().to_string()).collect(),
            mass,
        }
    }

    /// Choose a collapse discipline for the state as it stands.
    ///
    /// 1. ρ above the ZeroBack threshold → ZeroBack.
    /// 2. In Hickam mode, a formed cluster → Hickam.
    /// 3. Top posterior ≥ Occam min-top → Occam.
    /// 4. Otherwise no collapse: the current mode with an empty selection.
    pub fn decide(&self, state: &State) -> CollapseDecision {
        let rho = state.contradiction_density();
        if rho > self.policy.zeroback_contradiction {
            log::info!(
                "collapse: zeroback (rho {:.3} > {:.3})",
                rho,
                self.policy.zeroback_contradiction
            );
            return CollapseDecision {
                mode: CollapseMode::ZeroBack,
                selected: Vec::new(),
            };
        }
        if state.collapse_mode() == CollapseMode::Hickam {
            let cluster = self.hickam_cluster(state);
            if cluster.formed {
                log::info!(
                    "collapse: hickam cluster {:?} (mass {:.3})",
                    cluster.members,
                    cluster.mass
                );
                return CollapseDecision {
                    mode: CollapseMode::Hickam,
                    selected: cluster.members,
                };
            }
        }
        let (top, weight) = state.top_hypothesis();
        if weight >= self.policy.occam_min_top {
            log::info!("collapse: occam on '{}' ({:.3})", top.id(), weight);
            return CollapseDecision {
                mode: CollapseMode::Occam,
                selected: vec![top.id().to_string()],
            };
        }
        log::debug!("collapse: none (top {:.3}, rho {:.3})", weight, rho);
        CollapseDecision {
            mode: state.collapse_mode(),
            selected: Vec::new(),
        }
    }

    /// Whether the state, in its current mode, is safe to commit.
    pub fn should_collapse(&self, state: &State) -> bool {
        let ruin_ok = state.ruin_probability() <= self.policy.max_ruin;
        match state.collapse_mode() {
            CollapseMode::ZeroBack => false,
            CollapseMode::Occam => {
                state.top_hypothesis().1 >= self.policy.occam_min_top
                    && state.contradiction_density() <= self.policy.occam_max_contradiction
                    && ruin_ok
            }
            CollapseMode::Hickam => self.hickam_cluster(state).formed && ruin_ok,
        }
    }

    /// Apply a decision to the state.
    ///
    /// - Occam: one-hot on the selected hypothesis.
    /// - Hickam: keep the selected subset, renormalized (all zero if the
    ///   subset carries no mass).
    /// - ZeroBack: replace the state with a fresh one built from the
    ///   original hypotheses, keeping the step counter.
    ///
    /// After Occam or Hickam the priors equal the collapsed posteriors. A
    /// decision with an empty selection (other than ZeroBack) is a no-op.
    pub fn apply_collapse(&self, state: &mut State, decision: &CollapseDecision) -> NepsisResult<()> {
        match decision.mode {
            CollapseMode::ZeroBack => {
                let mut fresh = state.rebuilt_from_origin()?;
                fresh.set_collapse_mode(CollapseMode::ZeroBack);
                log::info!("collapse: zeroback reset at step {}", fresh.step());
                *state = fresh;
                Ok(())
            }
            _ if decision.selected.is_empty() => Ok(()),
            CollapseMode::Occam => {
                if decision.selected.len() != 1 {
                    return Err(NepsisError::Validation(format!(
                        "occam collapse selects exactly one hypothesis, got {}",
                        decision.selected.len()
                    )));
                }
                let i = state.index_of(&decision.selected[0])?;
                let mut p = vec![0.0; state.len()];
                p[i] = 1.0;
                state.commit_collapse(p, CollapseMode::Occam);
                Ok(())
            }
            CollapseMode::Hickam => {
                let mut p = vec![0.0; state.len()];
                for id in &decision.selected {
                    let i = state.index_of(id)?;
                    p[i] = state.posteriors()[i];
                }
                let total: f64 = p.iter().sum();
                if total > 0.0 {
                    p.iter_mut().for_each(|v| *v /= total);
                }
                state.commit_collapse(p, CollapseMode::Hickam);
                Ok(())
            }
        }
    }

    /// Write collapse bookkeeping into the state's metadata.
    ///
    /// A Hickam decision with a selection records the cluster ids and mass;
    /// anything else records the current top hypothesis and its weight.
    pub fn record_collapse(&self, state: &mut State, decision: &CollapseDecision) -> NepsisResult<()> {
        if decision.mode == CollapseMode::Hickam && !decision.selected.is_empty() {
            let mut mass = 0.0;
            for id in &decision.selected {
                mass += state.posterior(id)?;
            }
            let meta = state.metadata_mut();
            meta.insert(META_CLUSTER.to_string(), MetaValue::List(decision.selected.clone()));
            meta.insert(META_MASS.to_string(), MetaValue::Number(mass));
            return Ok(());
        }
        let (top, weight) = state.top_hypothesis();
        let id = top.id().to_string();
        let meta = state.metadata_mut();
        meta.insert(META_TOP.to_string(), MetaValue::Text(id));
        meta.insert(META_WEIGHT.to_string(), MetaValue::Number(weight));
        Ok(())
    }
}
