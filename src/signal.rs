//! Signals: observations pushed into the kernel one at a time.
//!
//! The signal category is a closed enum with a single free-text escape hatch,
//! so an unrecognised category is always visible as [`SignalKind::Custom`]
//! rather than silently matching a known one.

use core::fmt;

use crate::hypothesis::{MetaValue, Metadata};

/// Category of a signal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignalKind {
    /// Vital sign or other continuous physiological reading.
    Vital,
    /// Laboratory result.
    Lab,
    /// Reported symptom.
    Symptom,
    /// Imaging finding.
    Imaging,
    /// History or context (the LLM monitor feeds text chunks as this kind).
    History,
    /// Reserved safety-critical category: always pre-empts the blue channel.
    Red,
    /// Any other category, carried verbatim.
    Custom(String),
}

impl SignalKind {
    /// Parse a category name. Known names match case-insensitively; anything
    /// else becomes [`SignalKind::Custom`].
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "vital" => Self::Vital,
            "lab" => Self::Lab,
            "symptom" => Self::Symptom,
            "imaging" => Self::Imaging,
            "history" => Self::History,
            "red" => Self::Red,
            _ => Self::Custom(name.to_string()),
        }
    }

    /// Lower-case label used in audit records.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Vital => "vital",
            Self::Lab => "lab",
            Self::Symptom => "symptom",
            Self::Imaging => "imaging",
            Self::History => "history",
            Self::Red => "red",
            Self::Custom(s) => s.as_str(),
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An observation with numeric strength and an optional safety threshold.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Signal {
    /// Category.
    pub kind: SignalKind,
    /// Name, matched against hypothesis expectation keys.
    pub name: String,
    /// Observed value.
    pub value: f64,
    /// If set, `value >= red_threshold` routes the signal to the red channel.
    pub red_threshold: Option<f64>,
    /// Caller-supplied timestamp; the kernel never reads it.
    pub timestamp: Option<f64>,
    /// Opaque metadata.
    pub metadata: Metadata,
}

impl Signal {
    /// Construct a signal with no threshold, timestamp or metadata.
    pub fn new(kind: SignalKind, name: impl Into<String>, value: f64) -> Self {
        Self {
            kind,
            name: name.into(),
            value,
            red_threshold: None,
            timestamp: None,
            metadata: Metadata::new(),
        }
    }

    /// Set the red-channel threshold.
    pub fn with_red_threshold(mut self, threshold: f64) -> Self {
        self.red_threshold = Some(threshold);
        self
    }

    /// Set the timestamp.
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: MetaValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// `type:name=value` label used in audit records.
    pub fn label(&self) -> String {
        format!("{}:{}={:?}", self.kind, self.name, self.value)
    }
}
