//! The complete belief snapshot the kernel drives step by step.
//!
//! A [`State`] owns everything the kernel knows about one reasoning episode:
//! the hypothesis list (and the original list it was created from), prior and
//! posterior vectors, the interpretant vector, per-hypothesis evidence caches,
//! the exclusivity matrix, the control scalars (ρ, V, ruin) and an
//! append-only posterior history.
//!
//! # Invariants
//!
//! - Ids are unique and the id → index map always matches the hypothesis list.
//! - The exclusivity matrix is aligned with the hypothesis list (same ids in
//!   the same order). Every edit of the hypothesis set re-runs
//!   [`State::sync_exclusivity`].
//! - `ruin_probability` never decreases; only a ZeroBack rebuild starts over.
//! - Every Bayesian update leaves the posteriors summing to 1.
//!
//! Fields are private. Drivers read through accessors; the kernel, channels
//! and collapse governor mutate through crate-internal setters so the
//! invariants above cannot be bypassed from outside.

use hashbrown::HashMap;

use crate::contradiction;
use crate::error::{NepsisError, NepsisResult};
use crate::exclusivity::Exclusivity;
use crate::hypothesis::{Hypothesis, Metadata};
use crate::math;

/// Default interpretant dimensionality.
pub const DEFAULT_INTERPRETANT_DIM: usize = 16;

/// Decision collapse discipline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CollapseMode {
    /// Single best explanation.
    #[default]
    Occam,
    /// Multi-cause cluster of mutually compatible explanations.
    Hickam,
    /// Epistemic reset: discard accumulated belief and start over.
    ZeroBack,
}

impl CollapseMode {
    /// Lower-case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollapseMode::Occam => "occam",
            CollapseMode::Hickam => "hickam",
            CollapseMode::ZeroBack => "zeroback",
        }
    }
}

/// Reasoning state at one point in time.
#[derive(Clone, Debug)]
pub struct State {
    hypotheses: Vec<Hypothesis>,
    /// The list the state was created from; ZeroBack rebuilds from it.
    origin: Vec<Hypothesis>,
    index: HashMap<String, usize>,

    priors: Vec<f64>,
    posteriors: Vec<f64>,

    interpretant: Vec<f64>,
    interpretant_dim: usize,

    likelihoods: Vec<f64>,
    coherence: Vec<f64>,

    exclusivity: Exclusivity,
    /// `false` while the matrix is the one inferred from expectations.
    exclusivity_assigned: bool,

    contradiction_density: f64,
    lyapunov_value: f64,
    lyapunov_stable: bool,
    ruin_probability: f64,

    step: u64,
    collapse_mode: CollapseMode,
    red_preempted: bool,

    history: Vec<Vec<f64>>,
    metadata: Metadata,
}

impl State {
    /// Initialise from a hypothesis list.
    ///
    /// Priors are normalized (uniform if they sum to zero), posteriors start
    /// equal to the priors, the interpretant is uniform over
    /// `interpretant_dim`, likelihood and coherence caches are 1.0 and the
    /// exclusivity matrix is inferred from the hypotheses' expectations.
    ///
    /// Fails on an empty list, duplicate ids or a zero dimension.
    pub fn from_hypotheses(hypotheses: Vec<Hypothesis>, interpretant_dim: usize) -> NepsisResult<Self> {
        if hypotheses.is_empty() {
            return Err(NepsisError::Validation(
                "state needs at least one hypothesis".to_string(),
            ));
        }
        if interpretant_dim == 0 {
            return Err(NepsisError::Validation(
                "interpretant dimension must be >= 1".to_string(),
            ));
        }
        let index = build_index(&hypotheses)?;
        let n = hypotheses.len();
        let raw: Vec<f64> = hypotheses.iter().map(Hypothesis::prior).collect();
        let priors = math::normalize(&raw);
        let exclusivity = Exclusivity::infer_from_expectations(&hypotheses, None, 0.0)?;

        let mut state = Self {
            origin: hypotheses.clone(),
            hypotheses,
            index,
            posteriors: priors.clone(),
            priors,
            interpretant: math::uniform(interpretant_dim),
            interpretant_dim,
            likelihoods: vec![1.0; n],
            coherence: vec![1.0; n],
            exclusivity,
            exclusivity_assigned: false,
            contradiction_density: 0.0,
            lyapunov_value: 0.0,
            lyapunov_stable: false,
            ruin_probability: 0.0,
            step: 0,
            collapse_mode: CollapseMode::default(),
            red_preempted: false,
            history: Vec::new(),
            metadata: Metadata::new(),
        };
        state.refresh_contradiction();
        Ok(state)
    }

    /// Fresh state from the original hypothesis list, carrying only the step
    /// counter and any explicitly assigned exclusivity rules forward.
    pub fn rebuilt_from_origin(&self) -> NepsisResult<Self> {
        let mut fresh = Self::from_hypotheses(self.origin.clone(), self.interpretant_dim)?;
        fresh.step = self.step;
        if self.exclusivity_assigned {
            let ids: Vec<String> = fresh.ids();
            fresh.exclusivity = self.exclusivity.reconcile(&ids)?;
            fresh.exclusivity_assigned = true;
            fresh.refresh_contradiction();
        }
        Ok(fresh)
    }

    // ── Read accessors ─────────────────────────────────────────────────────

    /// Current hypothesis list, index-aligned with every per-hypothesis vector.
    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    /// The list this state was created from.
    pub fn original_hypotheses(&self) -> &[Hypothesis] {
        &self.origin
    }

    /// Hypothesis ids in index order.
    pub fn ids(&self) -> Vec<String> {
        self.hypotheses.iter().map(|h| h.id().to_string()).collect()
    }

    /// Number of hypotheses.
    pub fn len(&self) -> usize {
        self.hypotheses.len()
    }

    /// Always `false`: a state holds at least one hypothesis.
    pub fn is_empty(&self) -> bool {
        self.hypotheses.is_empty()
    }

    /// Index of a hypothesis id.
    pub fn index_of(&self, id: &str) -> NepsisResult<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| NepsisError::UnknownHypothesis(id.to_string()))
    }

    /// Hypothesis by id.
    pub fn hypothesis(&self, id: &str) -> NepsisResult<&Hypothesis> {
        Ok(&self.hypotheses[self.index_of(id)?])
    }

    /// Posterior of one hypothesis. Unknown ids fail with
    /// [`NepsisError::UnknownHypothesis`].
    pub fn posterior(&self, id: &str) -> NepsisResult<f64> {
        Ok(self.posteriors[self.index_of(id)?])
    }

    /// Prior vector used by the next Bayesian update.
    pub fn priors(&self) -> &[f64] {
        &self.priors
    }

    /// Posterior vector.
    pub fn posteriors(&self) -> &[f64] {
        &self.posteriors
    }

    /// Interpretant vector.
    pub fn interpretant(&self) -> &[f64] {
        &self.interpretant
    }

    /// Interpretant dimensionality.
    pub fn interpretant_dim(&self) -> usize {
        self.interpretant_dim
    }

    /// Likelihoods from the most recent blue-channel step.
    pub fn likelihoods(&self) -> &[f64] {
        &self.likelihoods
    }

    /// Coherence scores from the most recent blue-channel step.
    pub fn coherence(&self) -> &[f64] {
        &self.coherence
    }

    /// Exclusivity matrix, aligned with [`State::hypotheses`].
    pub fn exclusivity(&self) -> &Exclusivity {
        &self.exclusivity
    }

    /// Contradiction density ρ.
    pub fn contradiction_density(&self) -> f64 {
        self.contradiction_density
    }

    /// Lyapunov value V from the most recent step.
    pub fn lyapunov_value(&self) -> f64 {
        self.lyapunov_value
    }

    /// Whether the most recent convergence check passed.
    pub fn is_stable(&self) -> bool {
        self.lyapunov_stable
    }

    /// Monotone ruin estimate.
    pub fn ruin_probability(&self) -> f64 {
        self.ruin_probability
    }

    /// Number of completed blue-channel updates.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Current collapse discipline.
    pub fn collapse_mode(&self) -> CollapseMode {
        self.collapse_mode
    }

    /// `true` once any signal has taken the red channel.
    pub fn red_preempted(&self) -> bool {
        self.red_preempted
    }

    /// One posterior snapshot per blue-channel step, oldest first.
    pub fn history(&self) -> &[Vec<f64>] {
        &self.history
    }

    /// Collapse bookkeeping and caller annotations.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Mutable metadata bag.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Highest-posterior hypothesis and its posterior. Ties go to the
    /// earliest hypothesis.
    pub fn top_hypothesis(&self) -> (&Hypothesis, f64) {
        let i = math::argmax(&self.posteriors).unwrap_or(0);
        (&self.hypotheses[i], self.posteriors[i])
    }

    /// Top `n` hypotheses by posterior, descending.
    pub fn top_hypotheses(&self, n: usize) -> Vec<(&Hypothesis, f64)> {
        math::argsort_desc(&self.posteriors)
            .into_iter()
            .take(n)
            .map(|i| (&self.hypotheses[i], self.posteriors[i]))
            .collect()
    }

    // ── Public mutators ────────────────────────────────────────────────────

    /// Overwrite the posterior vector and recompute ρ.
    ///
    /// The vector is taken as given (not renormalized) so callers can pose
    /// arbitrary belief configurations. Entries must be finite and
    /// non-negative and the length must match the hypothesis count.
    pub fn set_posteriors(&mut self, posteriors: Vec<f64>) -> NepsisResult<()> {
        if posteriors.len() != self.hypotheses.len() {
            return Err(NepsisError::Inconsistent(format!(
                "posterior length {} != hypothesis count {}",
                posteriors.len(),
                self.hypotheses.len()
            )));
        }
        if let Some(bad) = posteriors.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(NepsisError::Validation(format!(
                "posterior entries must be finite and >= 0, got {bad}"
            )));
        }
        self.posteriors = posteriors;
        self.refresh_contradiction();
        Ok(())
    }

    /// Assign an explicit exclusivity matrix.
    ///
    /// A matrix over a different id list or ordering is reconciled onto the
    /// current hypothesis list: known pairs are kept, new pairs take the
    /// matrix default.
    pub fn set_exclusivity(&mut self, exclusivity: Exclusivity) -> NepsisResult<()> {
        let ids = self.ids();
        self.exclusivity = if exclusivity.is_aligned_with(&ids) {
            exclusivity
        } else {
            exclusivity.reconcile(&ids)?
        };
        self.exclusivity_assigned = true;
        self.refresh_contradiction();
        Ok(())
    }

    /// Select the collapse discipline the governor starts from.
    pub fn set_collapse_mode(&mut self, mode: CollapseMode) {
        self.collapse_mode = mode;
    }

    /// Raise the ruin estimate to `candidate` if higher. Never lowers it.
    pub fn escalate_ruin(&mut self, candidate: f64) {
        if candidate.is_nan() {
            return;
        }
        self.ruin_probability = self.ruin_probability.max(candidate.clamp(0.0, 1.0));
    }

    /// Add a hypothesis to the live set.
    ///
    /// Its prior joins both the prior and posterior vectors, which are then
    /// renormalized. The original list used by ZeroBack is unchanged.
    pub fn add_hypothesis(&mut self, hypothesis: Hypothesis) -> NepsisResult<()> {
        if self.index.contains_key(hypothesis.id()) {
            return Err(NepsisError::Validation(format!(
                "duplicate hypothesis id '{}'",
                hypothesis.id()
            )));
        }
        let prior = hypothesis.prior();
        self.hypotheses.push(hypothesis);
        self.priors.push(prior);
        self.posteriors.push(prior);
        self.priors = math::normalize(&self.priors);
        self.posteriors = math::normalize(&self.posteriors);
        self.likelihoods.push(1.0);
        self.coherence.push(1.0);
        self.sync_exclusivity()?;
        self.refresh_contradiction();
        Ok(())
    }

    /// Remove a hypothesis from the live set and renormalize.
    ///
    /// Removing the last remaining hypothesis is rejected.
    pub fn remove_hypothesis(&mut self, id: &str) -> NepsisResult<Hypothesis> {
        let i = self.index_of(id)?;
        if self.hypotheses.len() == 1 {
            return Err(NepsisError::Validation(
                "cannot remove the last hypothesis".to_string(),
            ));
        }
        let removed = self.hypotheses.remove(i);
        self.priors.remove(i);
        self.posteriors.remove(i);
        self.likelihoods.remove(i);
        self.coherence.remove(i);
        self.priors = math::normalize(&self.priors);
        self.posteriors = math::normalize(&self.posteriors);
        self.sync_exclusivity()?;
        self.refresh_contradiction();
        Ok(removed)
    }

    /// Bring the id → index map and the exclusivity matrix in line with the
    /// current hypothesis list.
    ///
    /// - The index is rebuilt (duplicate ids fail).
    /// - If no exclusivity was ever assigned, it is re-inferred from
    ///   expectations.
    /// - If an assigned matrix no longer matches, it is reconciled: pairs
    ///   whose endpoints both survive are copied, new pairs take the default.
    pub fn sync_exclusivity(&mut self) -> NepsisResult<()> {
        self.index = build_index(&self.hypotheses)?;
        let ids = self.ids();
        if !self.exclusivity.is_aligned_with(&ids) {
            self.exclusivity = if self.exclusivity_assigned {
                self.exclusivity.reconcile(&ids)?
            } else {
                Exclusivity::infer_from_expectations(&self.hypotheses, None, 0.0)?
            };
        }
        Ok(())
    }

    /// Fail fast if any per-hypothesis vector, the index map or the
    /// exclusivity matrix disagrees with the hypothesis list.
    pub fn check_consistency(&self) -> NepsisResult<()> {
        let n = self.hypotheses.len();
        let lengths = [
            ("priors", self.priors.len()),
            ("posteriors", self.posteriors.len()),
            ("likelihoods", self.likelihoods.len()),
            ("coherence", self.coherence.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(NepsisError::Inconsistent(format!(
                    "{name} has {len} entries for {n} hypotheses"
                )));
            }
        }
        if self.interpretant.len() != self.interpretant_dim {
            return Err(NepsisError::Inconsistent(format!(
                "interpretant has {} entries, dimension is {}",
                self.interpretant.len(),
                self.interpretant_dim
            )));
        }
        if self.index.len() != n
            || self
                .hypotheses
                .iter()
                .enumerate()
                .any(|(i, h)| self.index.get(h.id()) != Some(&i))
        {
            return Err(NepsisError::Inconsistent(
                "hypothesis index is stale".to_string(),
            ));
        }
        if !self.exclusivity.is_aligned_with(&self.ids()) {
            return Err(NepsisError::Inconsistent(
                "exclusivity matrix is not aligned with hypotheses".to_string(),
            ));
        }
        Ok(())
    }

    // ── Crate-internal mutators ────────────────────────────────────────────

    /// Install the result of a blue-channel update: posteriors, evidence
    /// caches and interpretant; snapshot into history; posteriors become the
    /// next priors; advance the step counter.
    pub(crate) fn commit_update(
        &mut self,
        posteriors: Vec<f64>,
        likelihoods: Vec<f64>,
        coherence: Vec<f64>,
        interpretant: Vec<f64>,
    ) {
        self.posteriors = posteriors;
        self.likelihoods = likelihoods;
        self.coherence = coherence;
        self.interpretant = interpretant;
        self.refresh_contradiction();
        self.history.push(self.posteriors.clone());
        self.priors = self.posteriors.clone();
        self.step += 1;
    }

    /// Install collapsed posteriors and carry them forward as priors.
    pub(crate) fn commit_collapse(&mut self, posteriors: Vec<f64>, mode: CollapseMode) {
        self.posteriors = posteriors;
        self.priors = self.posteriors.clone();
        self.collapse_mode = mode;
        self.refresh_contradiction();
    }

    pub(crate) fn set_lyapunov(&mut self, value: f64, stable: bool) {
        self.lyapunov_value = value;
        self.lyapunov_stable = stable;
    }

    pub(crate) fn mark_red_preempted(&mut self) {
        self.red_preempted = true;
    }

    #[cfg(test)]
    pub(crate) fn force_contradiction_density(&mut self, rho: f64) {
        self.contradiction_density = rho;
    }

    fn refresh_contradiction(&mut self) {
        self.contradiction_density = contradiction::density(&self.posteriors, &self.exclusivity);
    }
}

fn build_index(hypotheses: &[Hypothesis]) -> NepsisResult<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(hypotheses.len());
    for (i, h) in hypotheses.iter().enumerate() {
        if index.insert(h.id().to_string(), i).is_some() {
            return Err(NepsisError::Validation(format!(
                "duplicate hypothesis id '{}'",
                h.id()
            )));
        }
    }
    Ok(index)
}
