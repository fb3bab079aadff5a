//! Streaming session: one [`State`] per stream, driven by a shared kernel.
//!
//! A [`ReasoningSession`] is the per-stream wrapper used when signals arrive
//! one at a time (for example, text chunks from a language-model monitor).
//! It owns its state, borrows the kernel, counts pushed chunks and exposes a
//! compact [`SessionMetrics`] view after every push.
//!
//! ```rust
//! use nepsis_core::{Hypothesis, Kernel, ReasoningSession, Signal, SignalKind};
//!
//! let kernel = Kernel::default();
//! let hyps = vec![
//!     Hypothesis::new("on_topic", "On topic", 0.7)?,
//!     Hypothesis::new("drift", "Drifting", 0.3)?,
//! ];
//! let mut session = ReasoningSession::new(&kernel, hyps)?;
//! session.push_chunk(0.4)?;
//! session.push(&Signal::new(SignalKind::History, "summary", 0.6))?;
//! assert_eq!(session.chunk_count(), 2);
//! assert!(session.metrics().fidelity <= 1.0);
//! # Ok::<(), nepsis_core::NepsisError>(())
//! ```

use std::collections::BTreeMap;

use crate::collapse::CollapseDecision;
use crate::error::NepsisResult;
use crate::hypothesis::Hypothesis;
use crate::kernel::{Kernel, StepMetrics};
use crate::likelihood::LikelihoodModel;
use crate::signal::{Signal, SignalKind};
use crate::state::{CollapseMode, State};

/// ρ above which the session suggests a ZeroBack reset.
pub const HINT_ZEROBACK_RHO: f64 = 0.75;
/// ρ above which the session suggests Hickam reasoning.
pub const HINT_HICKAM_RHO: f64 = 0.40;

/// Advisory collapse suggestion derived from ρ alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum CollapseHint {
    /// Nothing to suggest.
    None,
    /// Contradiction suggests several causes at once.
    Hickam,
    /// Contradiction suggests starting over.
    ZeroBack,
}

impl CollapseHint {
    /// Hint for a contradiction density.
    pub fn from_rho(rho: f64) -> Self {
        if rho > HINT_ZEROBACK_RHO {
            CollapseHint::ZeroBack
        } else if rho > HINT_HICKAM_RHO {
            CollapseHint::Hickam
        } else {
            CollapseHint::None
        }
    }
}

/// Compact view of a session after a push.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionMetrics {
    /// Signals pushed since creation or the last reset.
    pub chunk_count: u64,
    /// `1 − ρ`.
    pub fidelity: f64,
    /// Contradiction density.
    pub rho: f64,
    /// Mean coherence score (1.0 before any blue step).
    pub coherence: f64,
    /// Posterior per hypothesis id.
    pub posteriors: BTreeMap<String, f64>,
    /// Advisory collapse suggestion.
    pub hint: CollapseHint,
    /// Lyapunov value.
    pub lyapunov: f64,
    /// Ruin probability.
    pub ruin: f64,
}

/// Per-stream reasoning session.
#[derive(Debug)]
pub struct ReasoningSession<'k, L: LikelihoodModel> {
    kernel: &'k Kernel<L>,
    state: State,
    chunk_count: u64,
}

impl<'k, L: LikelihoodModel> ReasoningSession<'k, L> {
    /// Start a session over `hypotheses`.
    pub fn new(kernel: &'k Kernel<L>, hypotheses: Vec<Hypothesis>) -> NepsisResult<Self> {
        Ok(Self {
            state: kernel.new_state(hypotheses)?,
            kernel,
            chunk_count: 0,
        })
    }

    /// Run one kernel step.
    pub fn push(&mut self, signal: &Signal) -> NepsisResult<StepMetrics> {
        let metrics = self.kernel.step(&mut self.state, signal, None)?;
        self.chunk_count += 1;
        Ok(metrics)
    }

    /// Push a bare strength value as a `history` signal named
    /// `chunk_<n>`.
    pub fn push_chunk(&mut self, strength: f64) -> NepsisResult<StepMetrics> {
        let signal = Signal::new(
            SignalKind::History,
            format!("chunk_{}", self.chunk_count),
            strength,
        );
        self.push(&signal)
    }

    /// Collapse decision for the current state. Does not mutate anything.
    pub fn decide(&self) -> CollapseDecision {
        self.kernel.governor().decide(&self.state)
    }

    /// Decide and, if the decision is safe to commit, apply it.
    ///
    /// ZeroBack decisions are always applied. Occam and Hickam decisions are
    /// applied only when the governor's `should_collapse` gate passes in the
    /// decided mode; bookkeeping is recorded before the posteriors change.
    /// Returns the applied decision, or `None` if nothing was committed.
    pub fn commit(&mut self) -> NepsisResult<Option<CollapseDecision>> {
        let kernel = self.kernel;
        let governor = kernel.governor();
        let decision = governor.decide(&self.state);
        if decision.mode == CollapseMode::ZeroBack {
            governor.apply_collapse(&mut self.state, &decision)?;
            return Ok(Some(decision));
        }
        if !decision.is_collapse() {
            return Ok(None);
        }
        let previous = self.state.collapse_mode();
        self.state.set_collapse_mode(decision.mode);
        if !governor.should_collapse(&self.state) {
            self.state.set_collapse_mode(previous);
            log::debug!("session: {:?} decision not committed", decision.mode);
            return Ok(None);
        }
        governor.record_collapse(&mut self.state, &decision)?;
        governor.apply_collapse(&mut self.state, &decision)?;
        Ok(Some(decision))
    }

    /// Start over from the original hypotheses and clear the chunk counter.
    ///
    /// The state's step counter keeps counting; the collapse mode returns to
    /// the configured initial mode.
    pub fn reset(&mut self) -> NepsisResult<()> {
        let mut fresh = self.state.rebuilt_from_origin()?;
        fresh.set_collapse_mode(self.kernel.config().initial_mode);
        self.state = fresh;
        self.chunk_count = 0;
        log::info!("session reset at step {}", self.state.step());
        Ok(())
    }

    /// Signals pushed since creation or the last reset.
    pub fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    /// Current state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Mutable state, for hypothesis edits or explicit exclusivity.
    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// Compact metrics of the current state.
    pub fn metrics(&self) -> SessionMetrics {
        let s = &self.state;
        let rho = s.contradiction_density();
        let coh = s.coherence();
        let coherence = if coh.is_empty() {
            1.0
        } else {
            coh.iter().sum::<f64>() / coh.len() as f64
        };
        let posteriors = s
            .hypotheses()
            .iter()
            .zip(s.posteriors().iter())
            .map(|(h, &p)| (h.id().to_string(), p))
            .collect();
        SessionMetrics {
            chunk_count: self.chunk_count,
            fidelity: 1.0 - rho,
            rho,
            coherence,
            posteriors,
            hint: CollapseHint::from_rho(rho),
            lyapunov: s.lyapunov_value(),
            ruin: s.ruin_probability(),
        }
    }
}
