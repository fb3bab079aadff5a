//! # nepsis-core
//!
//! Non-ergodic decision reasoning: contradiction-aware belief tracking with
//! safety pre-emption and three collapse disciplines.
//!
//! ---
//!
//! ## Belief is path-dependent
//!
//! Most belief-update engines assume you can always average your way back to
//! the truth. Real decisions cannot: a missed red flag is not undone by ten
//! reassuring observations afterwards. This crate keeps three things apart
//! that a plain Bayesian filter would blend:
//!
//! **Contradiction.** Belief mass sitting on hypotheses that cannot both be
//! true is measured (ρ) rather than silently renormalized away.
//!
//! **Ruin.** Safety-critical signals bypass belief updating entirely and
//! raise a ruin estimate that never goes down within an episode.
//!
//! **Collapse.** Committing to a decision is an explicit, gated step:
//! a single best explanation (Occam), a cluster of compatible explanations
//! (Hickam), or an epistemic reset back to the starting hypotheses (ZeroBack).
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! Signal ─► red? ──yes──► ruin ↑ ────────────────────────────┐
//!            │ no                                             │
//!            ▼                                                ▼
//!     InterpretantLayer ─► LikelihoodModel ─► posterior ─► StepMetrics
//!            ↑                                    │          AuditRecord
//!        Exclusivity ──────────► ρ ◄──────────────┘
//!                                │
//!                         Lyapunov V, convergence
//!                                │
//!                        CollapseGovernor ─► Occam / Hickam / ZeroBack
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`hypothesis`] | [`Hypothesis`], [`Expectation`] | Candidate explanations with validated priors |
//! | [`signal`] | [`Signal`], [`SignalKind`] | Observations and their safety thresholds |
//! | [`exclusivity`] | [`Exclusivity`] | Pairwise mutual-exclusivity matrix Ξ |
//! | [`state`] | [`State`], [`CollapseMode`] | Full belief snapshot with synchronisation invariants |
//! | [`contradiction`] | | ρ = 0.5·pᵗΞp and pair diagnostics |
//! | [`interpretant`] | [`InterpretantLayer`] | Signal modulation and coherence scoring |
//! | [`likelihood`] | [`LikelihoodModel`] | Injectable `P(signal | hypothesis)` |
//! | [`channel`] | | Red (safety bypass) and blue (Bayesian update) paths |
//! | [`lyapunov`] | [`LyapunovWeights`], [`ConvergenceCriteria`] | Stability value and convergence check |
//! | [`collapse`] | [`CollapseGovernor`], [`CollapseDecision`] | When and how belief commits |
//! | [`kernel`] | [`Kernel`], [`StepMetrics`] | Per-signal orchestration and whole-episode runs |
//! | [`session`] | [`ReasoningSession`] | Per-stream wrapper with compact metrics |
//! | [`audit`] | [`AuditTrail`] | Per-step audit records |
//! | [`config`] | [`KernelConfig`] | Every threshold, with presets |
//!
//! ## Quick start
//!
//! ```rust
//! use nepsis_core::{Hypothesis, Kernel, Signal, SignalKind};
//!
//! let kernel = Kernel::default();
//! let hyps = vec![
//!     Hypothesis::new("stemi", "STEMI", 0.6)?,
//!     Hypothesis::new("pericarditis", "Pericarditis", 0.4)?,
//! ];
//! let mut state = kernel.new_state(hyps)?;
//!
//! let bradycardia = Signal::new(SignalKind::Vital, "heart_rate", 35.0).with_red_threshold(30.0);
//! let m = kernel.step(&mut state, &bradycardia, None)?;
//! assert!(m.red_preempted);
//! assert_eq!(state.step(), 0);
//! # Ok::<(), nepsis_core::NepsisError>(())
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger.
//!
//! ## Features
//!
//! - `serde`: serialisation for configuration, metrics and audit records,
//!   plus [`KernelConfig::from_json`] and [`AuditTrail::to_json`].
//!
//! ## License
//!
//! Business Source License 1.1.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod audit;
pub mod channel;
pub mod collapse;
pub mod config;
pub mod contradiction;
pub mod error;
pub mod exclusivity;
pub mod hypothesis;
pub mod interpretant;
pub mod kernel;
pub mod likelihood;
pub mod lyapunov;
pub mod math;
pub mod session;
pub mod signal;
pub mod state;

// ─── Re-exports ──────────────────────────────────────────────────────────────

pub use audit::{AuditRecord, AuditTrail};
pub use collapse::{ClusterOutcome, CollapseDecision, CollapseGovernor};
pub use config::{
    CollapsePolicy, ConvergenceCriteria, InterpretantConfig, KernelConfig, LyapunovWeights,
};
pub use error::{NepsisError, NepsisResult};
pub use exclusivity::Exclusivity;
pub use hypothesis::{Expectation, Hypothesis, MetaValue, Metadata};
pub use interpretant::{InterpretantLayer, InterpretantUpdate};
pub use kernel::{Kernel, ReasoningResult, StepMetrics};
pub use likelihood::{ExpectationLikelihood, FlatLikelihood, LikelihoodModel};
pub use session::{CollapseHint, ReasoningSession, SessionMetrics};
pub use signal::{Signal, SignalKind};
pub use state::{CollapseMode, State};
