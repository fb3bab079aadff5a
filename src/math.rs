//! Small vector helpers shared by the interpretant, blue channel and
//! Lyapunov controller.
//!
//! All functions operate on `f64` slices and allocate at most one output
//! vector.

/// Total mass below which [`normalize`] falls back to a uniform vector.
pub const NORMALIZE_EPS: f64 = 1e-10;

/// Probability floor used by [`entropy`] and [`kl_divergence`].
pub const LOG_EPS: f64 = 1e-10;

/// Scale `x` so it sums to 1.
///
/// If the total mass is below [`NORMALIZE_EPS`] or not finite (including
/// negative, infinite or NaN totals) the uniform distribution is returned
/// instead. An empty input
/// yields an empty output.
pub fn normalize(x: &[f64]) -> Vec<f64> {
    if x.is_empty() {
        return Vec::new();
    }
    let total: f64 = x.iter().sum();
    // `!(total >= eps)` also catches NaN
    if !(total >= NORMALIZE_EPS) || !total.is_finite() {
        log::trace!("normalize: mass {total:e} unusable, using uniform fallback");
        return uniform(x.len());
    }
    x.iter().map(|v| v / total).collect()
}

/// Uniform distribution over `n` entries.
pub fn uniform(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Softmax with temperature. Shifted by the maximum for numerical stability.
pub fn softmax(x: &[f64], temperature: f64) -> Vec<f64> {
    if x.is_empty() {
        return Vec::new();
    }
    let t = if temperature > 0.0 { temperature } else { 1.0 };
    let max = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = x.iter().map(|v| ((v - max) / t).exp()).collect();
    let total: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / total).collect()
}

/// Shannon entropy (natural log) with each probability floored at [`LOG_EPS`].
pub fn entropy(p: &[f64]) -> f64 {
    -p.iter()
        .map(|&v| {
            let q = v.clamp(LOG_EPS, 1.0);
            q * q.ln()
        })
        .sum::<f64>()
}

/// Kullback-Leibler divergence D(p ‖ q), both floored at [`LOG_EPS`].
pub fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q.iter())
        .map(|(&a, &b)| {
            let a = a.clamp(LOG_EPS, 1.0);
            let b = b.clamp(LOG_EPS, 1.0);
            a * (a / b).ln()
        })
        .sum()
}

/// Euclidean norm.
pub fn l2_norm(x: &[f64]) -> f64 {
    x.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Euclidean distance between two equally sized vectors.
pub fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Row vector × row-major matrix: `v (1×rows) · m (rows×cols) → (1×cols)`.
///
/// Callers guarantee `m.len() == v.len() * cols`.
pub fn vec_mat(v: &[f64], m: &[f64], cols: usize) -> Vec<f64> {
    let mut out = vec![0.0; cols];
    for (r, &vr) in v.iter().enumerate() {
        let row = &m[r * cols..(r + 1) * cols];
        for (o, &mrc) in out.iter_mut().zip(row.iter()) {
            *o += vr * mrc;
        }
    }
    out
}

/// Index of the largest entry; ties resolve to the lowest index.
pub fn argmax(x: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in x.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Indices sorted by value descending. Stable: equal values keep index order.
pub fn argsort_desc(x: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..x.len()).collect();
    idx.sort_by(|&a, &b| x[b].partial_cmp(&x[a]).unwrap_or(core::cmp::Ordering::Equal));
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sums_to_one() {
        let p = normalize(&[1.0, 3.0]);
        assert!((p[0] - 0.25).abs() < 1e-12);
        assert!((p[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_zero_mass_falls_back_to_uniform() {
        let p = normalize(&[0.0, 0.0, 0.0, 0.0]);
        assert!(p.iter().all(|&v| (v - 0.25).abs() < 1e-12), "p={:?}", p);

        let p = normalize(&[-1.0, 0.5]);
        assert_eq!(p, vec![0.5, 0.5]);
    }

    #[test]
    fn test_normalize_infinite_mass_falls_back_to_uniform() {
        assert_eq!(normalize(&[f64::INFINITY, 1.0]), vec![0.5, 0.5]);
        let p = normalize(&[f64::INFINITY; 4]);
        assert!(p.iter().all(|&v| (v - 0.25).abs() < 1e-12), "p={:?}", p);
    }

    #[test]
    fn test_softmax_temperature() {
        let sharp = softmax(&[1.0, 0.0], 0.5);
        let soft = softmax(&[1.0, 0.0], 2.0);
        assert!(sharp[0] > soft[0]);
        assert!((sharp.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        // e^2 / (e^2 + 1)
        assert!((sharp[0] - 0.880_797_077_977_882_3).abs() < 1e-9, "got {}", sharp[0]);
    }

    #[test]
    fn test_entropy_bounds() {
        assert!(entropy(&[1.0, 0.0]).abs() < 1e-6);
        let h = entropy(&[0.5, 0.5]);
        assert!((h - core::f64::consts::LN_2).abs() < 1e-9, "h={}", h);
    }

    #[test]
    fn test_kl_divergence_zero_for_identical() {
        assert!(kl_divergence(&[0.3, 0.7], &[0.3, 0.7]).abs() < 1e-12);
        assert!(kl_divergence(&[0.9, 0.1], &[0.5, 0.5]) > 0.0);
    }

    #[test]
    fn test_vec_mat() {
        // [1, 2] · [[1, 0, 1], [0, 1, 1]] = [1, 2, 3]
        let out = vec_mat(&[1.0, 2.0], &[1.0, 0.0, 1.0, 0.0, 1.0, 1.0], 3);
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_argmax_and_argsort_ties() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argsort_desc(&[0.1, 0.5, 0.5, 0.3]), vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_l2() {
        assert!((l2_norm(&[3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert!((l2_distance(&[1.0, 1.0], &[1.0, 0.0]) - 1.0).abs() < 1e-12);
    }
}
