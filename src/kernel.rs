/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Kernel orchestrator: one signal in, one metrics snapshot out.
//!
//! ```text
//!   signal ──► consistency check
//!                 │
//!                 ▼
//!            red pre-empt? ──yes──► ruin += …, red flag, audit ──► StepMetrics
//!                 │ no
//!                 ▼
//!            blue update ──► V, convergence ──► ruin ──► audit ──► StepMetrics
//! ```
//!
//! [`Kernel`] holds only immutable configuration and the injected likelihood
//! model, so one kernel can drive any number of independent [`State`]s.

use crate::audit::{AuditRecord, AuditTrail};
use crate::channel::{blue, red};
use crate::collapse::{CollapseDecision, CollapseGovernor};
use crate::config::KernelConfig;
use crate::error::{NepsisError, NepsisResult};
use crate::hypothesis::Hypothesis;
use crate::interpretant::InterpretantLayer;
use crate::likelihood::{FlatLikelihood, LikelihoodModel};
use crate::lyapunov;
use crate::signal::Signal;
use crate::state::State;

// ─── StepMetrics ─────────────────────────────────────────────────────────────

/// What one [`Kernel::step`] produced.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepMetrics {
    /// State step counter after the step.
    pub step: u64,
    /// Contradiction density.
    pub rho: f64,
    /// Lyapunov value.
    pub lyapunov: f64,
    /// Convergence flag.
    pub converged: bool,
    /// Ruin probability after the step.
    pub ruin: f64,
    /// Id of the top hypothesis.
    pub top: String,
    /// Posterior of the top hypothesis.
    pub top_posterior: f64,
    /// Whether this signal took the red channel.
    pub red_preempted: bool,
}

impl StepMetrics {
    fn capture(state: &State, red_preempted: bool) -> Self {
        let (top, weight) = state.top_hypothesis();
        Self {
            step: state.step(),
            rho: state.contradiction_density(),
            lyapunov: state.lyapunov_value(),
            converged: state.is_stable(),
            ruin: state.ruin_probability(),
            top: top.id().to_string(),
            top_posterior: weight,
            red_preempted,
        }
    }
}

// ─── ReasoningResult ─────────────────────────────────────────────────────────

/// Outcome of [`Kernel::reason`].
#[derive(Clone, Debug)]
pub struct ReasoningResult {
    /// Final state.
    pub state: State,
    /// Highest-posterior hypothesis.
    pub top_hypothesis: Hypothesis,
    /// Its posterior.
    pub top_posterior: f64,
    /// Final contradiction density.
    pub contradiction_density: f64,
    /// Whether the last step met the convergence criteria.
    pub converged: bool,
    /// Whether any signal took the red channel.
    pub red_preempted: bool,
    /// Blue-channel steps completed.
    pub steps: u64,
    /// Final collapse decision (only when auto-collapse was requested).
    pub decision: Option<CollapseDecision>,
    /// One record per processed signal.
    pub audit: AuditTrail,
}

// ─── Kernel ──────────────────────────────────────────────────────────────────

/// Stateless reasoning driver.
#[derive(Clone, Debug)]
pub struct Kernel<L = FlatLikelihood> {
    config: KernelConfig,
    likelihood: L,
    interpretant: InterpretantLayer,
    governor: CollapseGovernor,
}

impl Default for Kernel<FlatLikelihood> {
    fn default() -> Self {
        let config = KernelConfig::default();
        Self {
            interpretant: InterpretantLayer::new(config.interpretant),
            governor: CollapseGovernor::new(config.collapse),
            likelihood: FlatLikelihood,
            config,
        }
    }
}

impl<L: LikelihoodModel> Kernel<L> {
    /// Build a kernel. The configuration is validated first.
    pub fn new(config: KernelConfig, likelihood: L) -> NepsisResult<Self> {
        config.validate()?;
        Ok(Self {
            interpretant: InterpretantLayer::new(config.interpretant),
            governor: CollapseGovernor::new(config.collapse),
            likelihood,
            config,
        })
    }

    /// Replace the interpretant gating matrix (row-major, `dim × n_hyp`).
    pub fn with_gating(mut self, matrix: Vec<f64>) -> Self {
        self.interpretant = self.interpretant.with_gating(matrix);
        self
    }

    /// Replace the interpretant compatibility matrix (row-major,
    /// `dim × n_hyp`).
    pub fn with_compatibility(mut self, matrix: Vec<f64>) -> Self {
        self.interpretant = self.interpretant.with_compatibility(matrix);
        self
    }

    /// Configuration in use.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Collapse governor built from the configuration.
    pub fn governor(&self) -> &CollapseGovernor {
        &self.governor
    }

    /// Interpretant layer.
    pub fn interpretant(&self) -> &InterpretantLayer {
        &self.interpretant
    }

    /// Injected likelihood model.
    pub fn likelihood(&self) -> &L {
        &self.likelihood
    }

    /// Fresh state with the configured interpretant dimension and initial
    /// collapse mode.
    pub fn new_state(&self, hypotheses: Vec<Hypothesis>) -> NepsisResult<State> {
        let mut state = State::from_hypotheses(hypotheses, self.config.interpretant.dim)?;
        state.set_collapse_mode(self.config.initial_mode);
        Ok(state)
    }

    /// Process one signal.
    ///
    /// A non-finite signal value is rejected with
    /// [`NepsisError::Validation`] before anything is touched.
    ///
    /// A red-channel signal leaves posteriors, history and the step counter
    /// untouched; it only raises ruin, sets the state's red flag and is
    /// audited. Every other signal runs the blue update, then the Lyapunov
    /// value and convergence flag are recomputed and ruin is updated.
    pub fn step(
        &self,
        state: &mut State,
        signal: &Signal,
        audit: Option<&mut AuditTrail>,
    ) -> NepsisResult<StepMetrics> {
        if !signal.value.is_finite() {
            return Err(NepsisError::Validation(format!(
                "signal value must be finite, got {}",
                signal.label()
            )));
        }
        state.check_consistency()?;

        if red::check_red_preempt(signal) {
            let ruin = red::compute_ruin_probability(state, state.ruin_probability(), Some(signal));
            state.escalate_ruin(ruin);
            state.mark_red_preempted();
            log::warn!(
                "red channel pre-empted {} (ruin {:.3})",
                signal.label(),
                state.ruin_probability()
            );
            if let Some(trail) = audit {
                trail.push(AuditRecord::capture(state, signal, true));
            }
            return Ok(StepMetrics::capture(state, true));
        }

        blue::process(
            state,
            signal,
            &self.interpretant,
            &self.likelihood,
            self.config.coherence_exponent,
        )?;

        let v = lyapunov::lyapunov_value(state, &self.config.lyapunov);
        let converged = lyapunov::check_convergence(state, &self.config.convergence);
        state.set_lyapunov(v, converged);

        let ruin = red::compute_ruin_probability(state, state.ruin_probability(), Some(signal));
        state.escalate_ruin(ruin);

        if let Some(trail) = audit {
            trail.push(AuditRecord::capture(state, signal, false));
        }
        let metrics = StepMetrics::capture(state, false);
        log::debug!(
            "step {}: {} rho={:.3} V={:.3} top={} ({:.3}) converged={}",
            metrics.step,
            signal.label(),
            metrics.rho,
            metrics.lyapunov,
            metrics.top,
            metrics.top_posterior,
            metrics.converged
        );
        Ok(metrics)
    }

    /// Run a whole episode.
    ///
    /// Signals are processed in order, at most `max_steps` of them. With
    /// `auto_collapse` the loop also stops at the first converged step, and
    /// the final collapse decision is computed, its mode set on the state and
    /// its bookkeeping recorded. The collapse itself is not applied.
    pub fn reason(
        &self,
        signals: &[Signal],
        hypotheses: Vec<Hypothesis>,
        max_steps: usize,
        auto_collapse: bool,
    ) -> NepsisResult<ReasoningResult> {
        let mut state = self.new_state(hypotheses)?;
        let mut audit = AuditTrail::new();

        for signal in signals.iter().take(max_steps) {
            let metrics = self.step(&mut state, signal, Some(&mut audit))?;
            if auto_collapse && metrics.converged {
                log::debug!("converged at step {}", metrics.step);
                break;
            }
        }

        let decision = if auto_collapse {
            let decision = self.governor.decide(&state);
            state.set_collapse_mode(decision.mode);
            self.governor.record_collapse(&mut state, &decision)?;
            Some(decision)
        } else {
            None
        };

        let (top, top_posterior) = state.top_hypothesis();
        let top_hypothesis = top.clone();
        Ok(ReasoningResult {
            top_hypothesis,
            top_posterior,
            contradiction_density: state.contradiction_density(),
            converged: state.is_stable(),
            red_preempted: state.red_preempted(),
            steps: state.step(),
            decision,
            audit,
            state,
        })
    }
}
