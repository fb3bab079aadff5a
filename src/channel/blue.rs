/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Blue channel: interpretant-mediated Bayesian update.
//!
//! ```text
//! 1. I' , modulated   ← interpretant.apply(state, signal)
//! 2. L[k]             ← model.likelihood(signal, h_k)      clamped to [0, 1]
//! 3. coh              ← interpretant.coherence(state, L)   (uses I, not I')
//! 4. p[k]             ∝ prior[k] · L[k] · coh[k]^λ          uniform if all zero
//! 5. commit: ρ, history snapshot, priors ← p, step += 1
//! ```

use crate::error::NepsisResult;
use crate::interpretant::InterpretantLayer;
use crate::likelihood::LikelihoodModel;
use crate::math;
use crate::signal::Signal;
use crate::state::State;

/// Run one blue-channel update of `state` for `signal`.
///
/// Non-finite likelihoods are replaced by 0 (with a warning); finite ones
/// are clamped to [0, 1].
pub fn process<L>(
    state: &mut State,
    signal: &Signal,
    layer: &InterpretantLayer,
    model: &L,
    coherence_exponent: f64,
) -> NepsisResult<()>
where
    L: LikelihoodModel + ?Sized,
{
    let update = layer.apply(state, signal)?;
    log::trace!(
        "blue: {} modulated gate {:.4}",
        signal.label(),
        update.modulated.first().copied().unwrap_or(0.0)
    );

    let likelihoods: Vec<f64> = state
        .hypotheses()
        .iter()
        .map(|h| sanitize(model.likelihood(signal, h), h.id()))
        .collect();

    let coherence = layer.coherence(state, &likelihoods)?;

    let raw: Vec<f64> = state
        .priors()
        .iter()
        .zip(likelihoods.iter())
        .zip(coherence.iter())
        .map(|((p, l), c)| p * l * c.powf(coherence_exponent))
        .collect();
    let posteriors = math::normalize(&raw);

    state.commit_update(posteriors, likelihoods, coherence, update.interpretant);
    Ok(())
}

fn sanitize(l: f64, id: &str) -> f64 {
    if !l.is_finite() {
        log::warn!("blue: non-finite likelihood {l} for '{id}', using 0");
        return 0.0;
    }
    l.clamp(0.0, 1.0)
}
