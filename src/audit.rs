//! Per-step audit trail.
//!
//! One [`AuditRecord`] per kernel step, red or blue, in order. Records are
//! plain values; the kernel only appends.

use core::fmt;

use crate::hypothesis::Metadata;
use crate::signal::Signal;
use crate::state::State;

/// Snapshot of one kernel step.
///
/// Serialized as `{step, signal, ρ, V, top, red}`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AuditRecord {
    /// State step counter after the step (red steps do not advance it).
    pub step: u64,
    /// `type:name=value`.
    pub signal: String,
    /// Contradiction density.
    #[cfg_attr(feature = "serde", serde(rename = "ρ"))]
    pub rho: f64,
    /// Lyapunov value.
    #[cfg_attr(feature = "serde", serde(rename = "V"))]
    pub lyapunov: f64,
    /// `name (posterior)` of the top hypothesis.
    pub top: String,
    /// Whether the signal took the red channel.
    #[cfg_attr(feature = "serde", serde(rename = "red"))]
    pub red_preempted: bool,
}

impl AuditRecord {
    /// Record the state as it stands after `signal` was handled.
    pub fn capture(state: &State, signal: &Signal, red_preempted: bool) -> Self {
        let (top, weight) = state.top_hypothesis();
        Self {
            step: state.step(),
            signal: signal.label(),
            rho: state.contradiction_density(),
            lyapunov: state.lyapunov_value(),
            top: format!("{} ({:.3})", top.name(), weight),
            red_preempted,
        }
    }
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "step {}: {} | rho={:.3} V={:.3} | top {}",
            self.step, self.signal, self.rho, self.lyapunov, self.top
        )?;
        if self.red_preempted {
            f.write_str(" | RED")?;
        }
        Ok(())
    }
}

/// Ordered list of [`AuditRecord`]s plus free-form metadata.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AuditTrail {
    #[cfg_attr(feature = "serde", serde(rename = "steps"))]
    records: Vec<AuditRecord>,
    metadata: Metadata,
}

impl AuditTrail {
    /// Empty trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: AuditRecord) {
        self.records.push(record);
    }

    /// Records, oldest first.
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Caller annotations.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Mutable caller annotations.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Multi-line human-readable summary, one line per record.
    pub fn summary(&self) -> String {
        let mut out = String::from("reasoning audit trail\n");
        for r in &self.records {
            out.push_str(&r.to_string());
            out.push('\n');
        }
        out
    }

    /// `{"steps": [...], "metadata": {...}}`.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> crate::error::NepsisResult<String> {
        serde_json::to_string(self)
            .map_err(|e| crate::error::NepsisError::Config(format!("JSON encode error: {e}")))
    }
}
