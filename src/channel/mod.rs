//! Signal routing channels.
//!
//! Every signal takes exactly one of two paths:
//!
//! - [`red`]: safety bypass. A signal at or above its red threshold, or of
//!   kind [`SignalKind::Red`](crate::signal::SignalKind::Red), skips belief
//!   updating entirely and only escalates ruin.
//! - [`blue`]: the normal interpretant-mediated Bayesian update.

pub mod blue;
pub mod red;

pub use blue::process;
pub use red::{check_red_preempt, compute_ruin_probability, escalate_ruin};
