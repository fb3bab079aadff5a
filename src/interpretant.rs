/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Interpretant layer: the mediating context between a raw signal and the
//! hypotheses it bears on.
//!
//! The interpretant is a probability vector of dimension `dim`. Each signal
//! nudges it by an exponential moving average, and its projection through a
//! `dim × n_hyp` compatibility matrix weights the evidence each hypothesis
//! receives.
//!
//! ```text
//!   signal ──► modulated = value · mean(I · Γ)
//!              I' = (1 − α)·I + α·normalize(I · value)
//!
//!   likelihoods ──► coherence = normalize((I · C) ⊙ softmax(L, T))
//! ```
//!
//! Γ (gating) and C (compatibility) default to uniform `1/dim` matrices,
//! under which coherence reduces to `softmax(L, T)`.
//!
//! # Invariants
//!
//! - A custom matrix whose shape does not match `dim × n_hyp` is an error at
//!   use, never silently reshaped.
//! - The updated interpretant stays a probability vector when the old one is.

use crate::config::InterpretantConfig;
use crate::error::{NepsisError, NepsisResult};
use crate::math;
use crate::signal::Signal;
use crate::state::State;

/// Output of [`InterpretantLayer::apply`].
#[derive(Clone, Debug, PartialEq)]
pub struct InterpretantUpdate {
    /// Signal value broadcast over hypotheses, scaled by the gated
    /// interpretant mean.
    pub modulated: Vec<f64>,
    /// Interpretant vector after the EMA update.
    pub interpretant: Vec<f64>,
}

/// Interpretant modulation and coherence scoring.
#[derive(Clone, Debug, Default)]
pub struct InterpretantLayer {
    config: InterpretantConfig,
    /// Row-major `dim × n_hyp` gating matrix Γ.
    gating: Option<Vec<f64>>,
    /// Row-major `dim × n_hyp` compatibility matrix C.
    compatibility: Option<Vec<f64>>,
}

impl InterpretantLayer {
    /// Layer with uniform gating and compatibility.
    pub fn new(config: InterpretantConfig) -> Self {
        Self {
            config,
            gating: None,
            compatibility: None,
        }
    }

    /// Use a custom gating matrix (row-major, `dim × n_hyp`).
    pub fn with_gating(mut self, matrix: Vec<f64>) -> Self {
        self.gating = Some(matrix);
        self
    }

    /// Use a custom compatibility matrix (row-major, `dim × n_hyp`).
    pub fn with_compatibility(mut self, matrix: Vec<f64>) -> Self {
        self.compatibility = Some(matrix);
        self
    }

    /// Settings in use.
    pub fn config(&self) -> &InterpretantConfig {
        &self.config
    }

    /// Modulate the signal by the current interpretant and compute the
    /// EMA-updated interpretant. Does not mutate `state`.
    pub fn apply(&self, state: &State, signal: &Signal) -> NepsisResult<InterpretantUpdate> {
        let n = state.len();
        let old = state.interpretant();
        let gated = match &self.gating {
            Some(m) => {
                check_shape("gating", m, old.len(), n)?;
                math::vec_mat(old, m, n)
            }
            None => uniform_projection(old, n),
        };
        let gate = gated.iter().sum::<f64>() / n as f64;
        let modulated = vec![signal.value * gate; n];

        let alpha = self.config.learning_rate;
        let scaled: Vec<f64> = old.iter().map(|v| v * signal.value).collect();
        let target = math::normalize(&scaled);
        let interpretant = old
            .iter()
            .zip(target.iter())
            .map(|(o, t)| (1.0 - alpha) * o + alpha * t)
            .collect();

        Ok(InterpretantUpdate {
            modulated,
            interpretant,
        })
    }

    /// Per-hypothesis coherence: the interpretant's support for each
    /// hypothesis weighted by the softmax of the likelihoods, normalized.
    pub fn coherence(&self, state: &State, likelihoods: &[f64]) -> NepsisResult<Vec<f64>> {
        let n = state.len();
        if likelihoods.len() != n {
            return Err(NepsisError::Inconsistent(format!(
                "{} likelihoods for {} hypotheses",
                likelihoods.len(),
                n
            )));
        }
        let interp = state.interpretant();
        let support = match &self.compatibility {
            Some(m) => {
                check_shape("compatibility", m, interp.len(), n)?;
                math::vec_mat(interp, m, n)
            }
            None => uniform_projection(interp, n),
        };
        let weights = math::softmax(likelihoods, self.config.softmax_temperature);
        let raw: Vec<f64> = support.iter().zip(weights.iter()).map(|(s, w)| s * w).collect();
        Ok(math::normalize(&raw))
    }
}

/// `I · (1/dim)·𝟙` without materialising the matrix.
fn uniform_projection(interpretant: &[f64], n: usize) -> Vec<f64> {
    let dim = interpretant.len().max(1);
    let v = interpretant.iter().sum::<f64>() / dim as f64;
    vec![v; n]
}

fn check_shape(name: &str, m: &[f64], rows: usize, cols: usize) -> NepsisResult<()> {
    if m.len() != rows * cols {
        return Err(NepsisError::Inconsistent(format!(
            "{name} matrix has {} entries, expected {rows} x {cols}",
            m.len()
        )));
    }
    Ok(())
}

/// Signal / interpretant / posterior alignment in [0, 1].
///
/// Mean of two terms: how close the signal value is to the interpretant's L2
/// norm, and how close the interpretant's entropy is to the posterior
/// entropy. Each term is `1 − |a − b| / max(a, b, 1e-6)`. Diagnostic only.
pub fn triadic_consistency(signal_value: f64, interpretant: &[f64], posteriors: &[f64]) -> f64 {
    let strength = math::l2_norm(interpretant);
    let s_i = 1.0 - (signal_value - strength).abs() / signal_value.max(strength).max(1e-6);

    let h_i = math::entropy(interpretant);
    let h_p = math::entropy(posteriors);
    let i_h = 1.0 - (h_i - h_p).abs() / h_i.max(h_p).max(1e-6);

    let c = (s_i + i_h) / 2.0;
    if c.is_nan() {
        return 0.0;
    }
    c.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypothesis::Hypothesis;
    use crate::signal::SignalKind;

    fn state(n: usize, dim: usize) -> State {
        let hyps = (0..n)
            .map(|i| Hypothesis::new(format!("h{i}"), format!("H{i}"), 0.5).unwrap())
            .collect();
        State::from_hypotheses(hyps, dim).unwrap()
    }

    #[test]
    fn test_apply_uniform_interpretant_is_fixed_point() {
        let s = state(3, 4);
        let layer = InterpretantLayer::new(InterpretantConfig {
            dim: 4,
            ..InterpretantConfig::default()
        });
        let sig = Signal::new(SignalKind::Vital, "hr", 2.0);
        let up = layer.apply(&s, &sig).unwrap();
        assert_eq!(up.interpretant.len(), 4);
        assert!(up.interpretant.iter().all(|&v| (v - 0.25).abs() < 1e-12));
        // gate = mean over hypotheses of sum(I)/dim = 1/4
        assert!(up.modulated.iter().all(|&m| (m - 0.5).abs() < 1e-12), "{:?}", up.modulated);
    }

    #[test]
    fn test_apply_zero_signal_falls_back_to_uniform_target() {
        let s = state(2, 4);
        let layer = InterpretantLayer::default();
        let up = layer.apply(&s, &Signal::new(SignalKind::Lab, "x", 0.0)).unwrap();
        assert!((up.interpretant.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(up.modulated.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn test_coherence_uniform_reduces_to_softmax() {
        let s = state(2, 16);
        let layer = InterpretantLayer::default();
        let coh = layer.coherence(&s, &[1.0, 0.0]).unwrap();
        let sm = math::softmax(&[1.0, 0.0], 0.5);
        assert!((coh[0] - sm[0]).abs() < 1e-12);
        assert!((coh.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_custom_compatibility_shape_checked() {
        let s = state(2, 2);
        let layer = InterpretantLayer::default().with_compatibility(vec![1.0, 0.0, 0.0]);
        assert!(matches!(
            layer.coherence(&s, &[0.5, 0.5]),
            Err(NepsisError::Inconsistent(_))
        ));

        // dim 2 × n 2: all interpretant mass supports h0
        let layer = InterpretantLayer::default().with_compatibility(vec![1.0, 0.0, 1.0, 0.0]);
        let coh = layer.coherence(&s, &[0.5, 0.5]).unwrap();
        assert!((coh[0] - 1.0).abs() < 1e-12, "coh={:?}", coh);
    }

    #[test]
    fn test_custom_gating_shape_checked() {
        let s = state(3, 2);
        let layer = InterpretantLayer::default().with_gating(vec![1.0; 4]);
        assert!(layer.apply(&s, &Signal::new(SignalKind::Lab, "x", 1.0)).is_err());
    }

    #[test]
    fn test_coherence_length_mismatch() {
        let s = state(2, 4);
        assert!(InterpretantLayer::default().coherence(&s, &[0.5]).is_err());
    }

    #[test]
    fn test_triadic_consistency_range() {
        let interp = math::uniform(4);
        let c = triadic_consistency(0.5, &interp, &[0.25; 4]);
        // |I| = 0.5 matches the signal; entropies match
        assert!((c - 1.0).abs() < 1e-9, "c={}", c);
        let c = triadic_consistency(100.0, &interp, &[1.0, 0.0, 0.0, 0.0]);
        assert!((0.0..=1.0).contains(&c));
        assert!(c < 0.5, "c={}", c);
    }
}
