//! Hypotheses: the candidate explanations the kernel distributes belief over.
//!
//! A [`Hypothesis`] is immutable once built: the prior is validated at
//! construction and the builder methods consume `self`.
//!
//! ```rust
//! use nepsis_core::hypothesis::{Expectation, Hypothesis};
//!
//! let stemi = Hypothesis::new("stemi", "STEMI", 0.4)?
//!     .with_expectation("troponin", Expectation::Flag(true))
//!     .with_expectation("st_elevation", Expectation::Flag(true));
//! assert_eq!(stemi.prior(), 0.4);
//! # Ok::<(), nepsis_core::NepsisError>(())
//! ```

use std::collections::BTreeMap;

use crate::error::{NepsisError, NepsisResult};

/// Expected value of a named signal under a hypothesis.
///
/// Only equality matters for exclusivity inference; the
/// [`ExpectationLikelihood`](crate::likelihood::ExpectationLikelihood) model
/// also reads the payloads.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Expectation {
    /// Signal expected present (`true`) or absent (`false`).
    Flag(bool),
    /// Signal expected near this numeric level.
    Level(f64),
    /// Signal expected to carry this categorical label.
    Label(String),
}

/// Opaque metadata value carried by hypotheses, signals and state.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetaValue {
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(f64),
    /// Free text.
    Text(String),
    /// Ordered list of strings (used for collapse clusters).
    List(Vec<String>),
}

/// Metadata bag. Ordered so audit output is deterministic.
pub type Metadata = BTreeMap<String, MetaValue>;

/// A candidate explanation with a prior belief weight.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Hypothesis {
    id: String,
    name: String,
    prior: f64,
    expects: BTreeMap<String, Expectation>,
    metadata: Metadata,
}

impl Hypothesis {
    /// Build a hypothesis. Fails with [`NepsisError::Validation`] unless
    /// `prior` is a finite value in [0.0, 1.0].
    pub fn new(id: impl Into<String>, name: impl Into<String>, prior: f64) -> NepsisResult<Self> {
        if !(0.0..=1.0).contains(&prior) {
            return Err(NepsisError::Validation(format!(
                "prior must be in [0, 1], got {prior}"
            )));
        }
        Ok(Self {
            id: id.into(),
            name: name.into(),
            prior,
            expects: BTreeMap::new(),
            metadata: Metadata::new(),
        })
    }

    /// Add an expected value for the signal called `signal_name`.
    pub fn with_expectation(mut self, signal_name: impl Into<String>, value: Expectation) -> Self {
        self.expects.insert(signal_name.into(), value);
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: MetaValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Unique key.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prior in [0.0, 1.0] (not normalized across the set).
    pub fn prior(&self) -> f64 {
        self.prior
    }

    /// Expected signal values keyed by signal name.
    pub fn expects(&self) -> &BTreeMap<String, Expectation> {
        &self.expects
    }

    /// Expected value for one signal, if declared.
    pub fn expectation(&self, signal_name: &str) -> Option<&Expectation> {
        self.expects.get(signal_name)
    }

    /// Opaque metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}
