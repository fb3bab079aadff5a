//! Kernel configuration.
//!
//! Every threshold the kernel, Lyapunov controller and collapse governor read
//! lives here and is threaded through [`Kernel::new`](crate::kernel::Kernel::new).
//! There are no process-wide constants to patch.
//!
//! [`KernelConfig::default`] is the general-purpose setting. Two presets tune
//! it for domains with different cost structures:
//!
//! | Preset | Initial mode | Weights (ρ / H / coh / vel) | Notes |
//! |--------|--------------|-----------------------------|-------|
//! | `default()` | Occam | 2.0 / 1.0 / 1.5 / 0.5 | |
//! | `emergency_medicine()` | Hickam | 2.5 / 1.0 / 2.0 / 0.3 | co-morbidity first |
//! | `research()` | Occam | 1.5 / 2.0 / 1.0 / 0.8 | default collapse thresholds |

use crate::error::{NepsisError, NepsisResult};
use crate::state::{CollapseMode, DEFAULT_INTERPRETANT_DIM};

// ─── CollapsePolicy ──────────────────────────────────────────────────────────

/// Thresholds gating the three collapse disciplines.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CollapsePolicy {
    /// Minimum top posterior for an Occam collapse. Default 0.80.
    pub occam_min_top: f64,
    /// Maximum ρ at which an Occam collapse is allowed. Default 0.25.
    pub occam_max_contradiction: f64,
    /// Mass a Hickam cluster must reach. Default 0.85.
    pub hickam_mass_threshold: f64,
    /// Maximum Ξ between any two members of a Hickam cluster. Default 0.40.
    pub hickam_max_pair_exclusivity: f64,
    /// ρ above which the governor forces ZeroBack. Default 0.70.
    pub zeroback_contradiction: f64,
    /// No collapse is allowed with ruin above this. Default 0.10.
    pub max_ruin: f64,
}

impl Default for CollapsePolicy {
    fn default() -> Self {
        Self {
            occam_min_top: 0.80,
            occam_max_contradiction: 0.25,
            hickam_mass_threshold: 0.85,
            hickam_max_pair_exclusivity: 0.40,
            zeroback_contradiction: 0.70,
            max_ruin: 0.10,
        }
    }
}

// ─── LyapunovWeights ─────────────────────────────────────────────────────────

/// Weights of the four terms of the Lyapunov value.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LyapunovWeights {
    /// Contradiction density term.
    pub contradiction: f64,
    /// Posterior entropy term.
    pub entropy: f64,
    /// Coherence/posterior mismatch term.
    pub coherence: f64,
    /// Posterior velocity term.
    pub velocity: f64,
}

impl LyapunovWeights {
    /// Construct from the four weights in (ρ, H, coherence, velocity) order.
    pub const fn new(contradiction: f64, entropy: f64, coherence: f64, velocity: f64) -> Self {
        Self {
            contradiction,
            entropy,
            coherence,
            velocity,
        }
    }
}

impl Default for LyapunovWeights {
    fn default() -> Self {
        Self::new(2.0, 1.0, 1.5, 0.5)
    }
}

// ─── ConvergenceCriteria ─────────────────────────────────────────────────────

/// Conditions that must all hold for a state to count as converged.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConvergenceCriteria {
    /// History entries inspected. Default 3.
    pub window: usize,
    /// Largest allowed L2 change between consecutive entries. Default 0.01.
    pub tolerance: f64,
    /// Largest allowed ρ. Default 0.3.
    pub max_contradiction: f64,
    /// Smallest allowed top posterior. Default 0.5.
    pub min_top: f64,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            window: 3,
            tolerance: 0.01,
            max_contradiction: 0.3,
            min_top: 0.5,
        }
    }
}

// ─── InterpretantConfig ──────────────────────────────────────────────────────

/// Interpretant layer settings.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InterpretantConfig {
    /// Dimensionality of the interpretant vector. Default 16.
    pub dim: usize,
    /// EMA learning rate α. Default 0.3.
    pub learning_rate: f64,
    /// Softmax temperature applied to likelihoods in coherence scoring.
    /// Default 0.5.
    pub softmax_temperature: f64,
}

impl Default for InterpretantConfig {
    fn default() -> Self {
        Self {
            dim: DEFAULT_INTERPRETANT_DIM,
            learning_rate: 0.3,
            softmax_temperature: 0.5,
        }
    }
}

// ─── KernelConfig ────────────────────────────────────────────────────────────

/// Complete, immutable kernel configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KernelConfig {
    /// Collapse thresholds.
    pub collapse: CollapsePolicy,
    /// Lyapunov term weights.
    pub lyapunov: LyapunovWeights,
    /// Convergence criteria.
    pub convergence: ConvergenceCriteria,
    /// Interpretant settings.
    pub interpretant: InterpretantConfig,
    /// Exponent λ on coherence in the posterior update. Default 1.0.
    pub coherence_exponent: f64,
    /// Collapse mode a fresh state starts in. Default Occam.
    pub initial_mode: CollapseMode,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            collapse: CollapsePolicy::default(),
            lyapunov: LyapunovWeights::default(),
            convergence: ConvergenceCriteria::default(),
            interpretant: InterpretantConfig::default(),
            coherence_exponent: 1.0,
            initial_mode: CollapseMode::Occam,
        }
    }
}

impl KernelConfig {
    /// Emergency medicine: start in Hickam mode and weight contradiction and
    /// coherence mismatch more heavily, velocity less.
    pub fn emergency_medicine() -> Self {
        Self {
            lyapunov: LyapunovWeights::new(2.5, 1.0, 2.0, 0.3),
            initial_mode: CollapseMode::Hickam,
            ..Self::default()
        }
    }

    /// Research: tolerate contradiction, penalise entropy and velocity.
    pub fn research() -> Self {
        Self {
            lyapunov: LyapunovWeights::new(1.5, 2.0, 1.0, 0.8),
            ..Self::default()
        }
    }

    /// Check every field's range.
    pub fn validate(&self) -> NepsisResult<()> {
        let c = &self.collapse;
        let unit = [
            ("collapse.occam_min_top", c.occam_min_top),
            ("collapse.occam_max_contradiction", c.occam_max_contradiction),
            ("collapse.hickam_mass_threshold", c.hickam_mass_threshold),
            ("collapse.hickam_max_pair_exclusivity", c.hickam_max_pair_exclusivity),
            ("collapse.zeroback_contradiction", c.zeroback_contradiction),
            ("collapse.max_ruin", c.max_ruin),
            ("convergence.max_contradiction", self.convergence.max_contradiction),
            ("convergence.min_top", self.convergence.min_top),
            ("interpretant.learning_rate", self.interpretant.learning_rate),
        ];
        for (name, v) in unit {
            if !(0.0..=1.0).contains(&v) {
                return Err(NepsisError::Validation(format!(
                    "{name} must be in [0, 1], got {v}"
                )));
            }
        }
        let w = &self.lyapunov;
        for (name, v) in [
            ("lyapunov.contradiction", w.contradiction),
            ("lyapunov.entropy", w.entropy),
            ("lyapunov.coherence", w.coherence),
            ("lyapunov.velocity", w.velocity),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(NepsisError::Validation(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        if self.convergence.window < 1 {
            return Err(NepsisError::Validation(
                "convergence.window must be >= 1".to_string(),
            ));
        }
        if !(self.convergence.tolerance.is_finite() && self.convergence.tolerance >= 0.0) {
            return Err(NepsisError::Validation(format!(
                "convergence.tolerance must be finite and >= 0, got {}",
                self.convergence.tolerance
            )));
        }
        if self.interpretant.dim < 1 {
            return Err(NepsisError::Validation(
                "interpretant.dim must be >= 1".to_string(),
            ));
        }
        if !(self.interpretant.softmax_temperature.is_finite()
            && self.interpretant.softmax_temperature > 0.0)
        {
            return Err(NepsisError::Validation(format!(
                "interpretant.softmax_temperature must be > 0, got {}",
                self.interpretant.softmax_temperature
            )));
        }
        if !(self.coherence_exponent.is_finite() && self.coherence_exponent >= 0.0) {
            return Err(NepsisError::Validation(format!(
                "coherence_exponent must be finite and >= 0, got {}",
                self.coherence_exponent
            )));
        }
        Ok(())
    }

    /// Load from a JSON string. Missing fields take their defaults; the result
    /// is validated.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> NepsisResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| NepsisError::Config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = KernelConfig::default();
        assert_eq!(c.collapse.occam_min_top, 0.80);
        assert_eq!(c.collapse.occam_max_contradiction, 0.25);
        assert_eq!(c.collapse.hickam_mass_threshold, 0.85);
        assert_eq!(c.collapse.hickam_max_pair_exclusivity, 0.40);
        assert_eq!(c.collapse.zeroback_contradiction, 0.70);
        assert_eq!(c.collapse.max_ruin, 0.10);
        assert_eq!(c.lyapunov, LyapunovWeights::new(2.0, 1.0, 1.5, 0.5));
        assert_eq!(c.convergence.window, 3);
        assert_eq!(c.interpretant.dim, 16);
        assert_eq!(c.interpretant.learning_rate, 0.3);
        assert_eq!(c.interpretant.softmax_temperature, 0.5);
        assert_eq!(c.coherence_exponent, 1.0);
        assert_eq!(c.initial_mode, CollapseMode::Occam);
        c.validate().unwrap();
    }

    #[test]
    fn test_presets_validate() {
        let em = KernelConfig::emergency_medicine();
        assert_eq!(em.initial_mode, CollapseMode::Hickam);
        assert_eq!(em.lyapunov.contradiction, 2.5);
        em.validate().unwrap();

        let r = KernelConfig::research();
        assert_eq!(r.lyapunov.entropy, 2.0);
        assert_eq!(r.collapse, CollapsePolicy::default());
        r.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut c = KernelConfig::default();
        c.collapse.max_ruin = 1.5;
        assert!(matches!(c.validate(), Err(NepsisError::Validation(_))));

        let mut c = KernelConfig::default();
        c.lyapunov.velocity = -1.0;
        assert!(c.validate().is_err());

        let mut c = KernelConfig::default();
        c.interpretant.dim = 0;
        assert!(c.validate().is_err());

        let mut c = KernelConfig::default();
        c.interpretant.softmax_temperature = 0.0;
        assert!(c.validate().is_err());

        let mut c = KernelConfig::default();
        c.convergence.window = 0;
        assert!(c.validate().is_err());
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn test_from_json_partial() {
        let c = KernelConfig::from_json(r#"{"initial_mode":"hickam","collapse":{"max_ruin":0.2}}"#)
            .unwrap();
        assert_eq!(c.initial_mode, CollapseMode::Hickam);
        assert_eq!(c.collapse.max_ruin, 0.2);
        assert_eq!(c.collapse.occam_min_top, 0.80);
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            KernelConfig::from_json("{not json"),
            Err(NepsisError::Config(_))
        ));
        assert!(matches!(
            KernelConfig::from_json(r#"{"coherence_exponent":-2.0}"#),
            Err(NepsisError::Validation(_))
        ));
    }
}
