//! Likelihood models: `P(signal | hypothesis)`.
//!
//! The kernel never invents a likelihood. Callers inject a
//! [`LikelihoodModel`]; the blue channel clamps whatever it returns into
//! [0, 1] and replaces non-finite values with 0.
//!
//! Any closure `Fn(&Signal, &Hypothesis) -> f64` is a model:
//!
//! ```rust
//! use nepsis_core::likelihood::LikelihoodModel;
//! use nepsis_core::{Hypothesis, Signal, SignalKind};
//!
//! let model = |s: &Signal, h: &Hypothesis| if h.id() == "sepsis" { s.value / 10.0 } else { 0.1 };
//! let h = Hypothesis::new("sepsis", "Sepsis", 0.3)?;
//! let s = Signal::new(SignalKind::Lab, "lactate", 4.0);
//! assert!((model.likelihood(&s, &h) - 0.4).abs() < 1e-12);
//! # Ok::<(), nepsis_core::NepsisError>(())
//! ```

use crate::hypothesis::{Expectation, Hypothesis};
use crate::signal::Signal;

/// Evidence model evaluated once per hypothesis per blue-channel step.
pub trait LikelihoodModel {
    /// Likelihood of `signal` under `hypothesis`. Expected in [0, 1].
    fn likelihood(&self, signal: &Signal, hypothesis: &Hypothesis) -> f64;
}

impl<F> LikelihoodModel for F
where
    F: Fn(&Signal, &Hypothesis) -> f64,
{
    fn likelihood(&self, signal: &Signal, hypothesis: &Hypothesis) -> f64 {
        self(signal, hypothesis)
    }
}

/// Uninformative model: every signal has likelihood 1.0 under every
/// hypothesis, so only coherence moves the posteriors.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlatLikelihood;

impl LikelihoodModel for FlatLikelihood {
    fn likelihood(&self, _signal: &Signal, _hypothesis: &Hypothesis) -> f64 {
        1.0
    }
}

/// Scores a signal against the hypothesis' declared expectation for the
/// signal's name.
///
/// | Expectation | Likelihood |
/// |-------------|------------|
/// | `Level(x)` | `exp(−|value − x| / scale)` |
/// | `Flag(b)` | `1.0` if `(value >= 0.5) == b`, else `floor` |
/// | `Label(s)` | `1.0` if `s` names the signal kind, else `floor` |
/// | none | `0.5` |
///
/// Results are clamped to `[floor, 1]` so one signal can never zero out a
/// hypothesis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExpectationLikelihood {
    /// Distance scale for `Level` expectations. Default 1.0.
    pub scale: f64,
    /// Smallest likelihood returned. Default 0.05.
    pub floor: f64,
}

impl Default for ExpectationLikelihood {
    fn default() -> Self {
        Self {
            scale: 1.0,
            floor: 0.05,
        }
    }
}

impl ExpectationLikelihood {
    /// Neutral likelihood for hypotheses with no expectation on the signal.
    pub const NEUTRAL: f64 = 0.5;
}

impl LikelihoodModel for ExpectationLikelihood {
    fn likelihood(&self, signal: &Signal, hypothesis: &Hypothesis) -> f64 {
        let raw = match hypothesis.expectation(&signal.name) {
            Some(Expectation::Level(x)) => {
                let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
                (-(signal.value - x).abs() / scale).exp()
            }
            Some(Expectation::Flag(b)) => {
                if (signal.value >= 0.5) == *b {
                    1.0
                } else {
                    0.0
                }
            }
            Some(Expectation::Label(s)) => {
                if s.eq_ignore_ascii_case(signal.kind.as_str()) {
                    1.0
                } else {
                    0.0
                }
            }
            None => Self::NEUTRAL,
        };
        let floor = self.floor.clamp(0.0, 1.0);
        if raw.is_nan() {
            return floor;
        }
        raw.clamp(floor, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalKind;

    fn hyp() -> Hypothesis {
        Hypothesis::new("mi", "MI", 0.5)
            .unwrap()
            .with_expectation("hr", Expectation::Level(110.0))
            .with_expectation("troponin", Expectation::Flag(true))
            .with_expectation("ecg", Expectation::Label("imaging".into()))
    }

    #[test]
    fn test_flat() {
        let s = Signal::new(SignalKind::Vital, "hr", 80.0);
        assert_eq!(FlatLikelihood.likelihood(&s, &hyp()), 1.0);
    }

    #[test]
    fn test_level_decays_with_distance() {
        let m = ExpectationLikelihood {
            scale: 10.0,
            floor: 0.0,
        };
        let near = m.likelihood(&Signal::new(SignalKind::Vital, "hr", 110.0), &hyp());
        let far = m.likelihood(&Signal::new(SignalKind::Vital, "hr", 90.0), &hyp());
        assert_eq!(near, 1.0);
        assert!((far - (-2.0f64).exp()).abs() < 1e-12, "far={}", far);
    }

    #[test]
    fn test_flag_and_label() {
        let m = ExpectationLikelihood::default();
        let h = hyp();
        assert_eq!(m.likelihood(&Signal::new(SignalKind::Lab, "troponin", 1.0), &h), 1.0);
        assert_eq!(m.likelihood(&Signal::new(SignalKind::Lab, "troponin", 0.0), &h), 0.05);
        assert_eq!(m.likelihood(&Signal::new(SignalKind::Imaging, "ecg", 1.0), &h), 1.0);
        assert_eq!(m.likelihood(&Signal::new(SignalKind::Lab, "ecg", 1.0), &h), 0.05);
    }

    #[test]
    fn test_absent_expectation_is_neutral() {
        let m = ExpectationLikelihood::default();
        let s = Signal::new(SignalKind::Symptom, "cough", 1.0);
        assert_eq!(m.likelihood(&s, &hyp()), ExpectationLikelihood::NEUTRAL);
    }

    #[test]
    fn test_closure_model() {
        let model = |s: &Signal, _h: &Hypothesis| s.value * 2.0;
        let s = Signal::new(SignalKind::Lab, "x", 0.2);
        assert!((model.likelihood(&s, &hyp()) - 0.4).abs() < 1e-12);
    }
}
