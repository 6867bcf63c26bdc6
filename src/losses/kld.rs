//! Categorical KL divergence between predictive distributions

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::{Error, Result};

/// Floor applied to probabilities before taking logs.
const EPS: f32 = 1e-10;

/// KL(p || q) for a single pair of categorical distributions.
///
/// Probabilities are clamped to `1e-10` before the log, so zero entries in
/// either distribution yield a finite result.
///
/// # Example
///
/// ```
/// use centinela::losses::kl_divergence;
/// use ndarray::array;
///
/// let p = array![0.5, 0.5];
/// let q = array![0.5, 0.5];
/// let kl = kl_divergence(p.view(), q.view()).unwrap();
/// assert!(kl.abs() < 1e-6);
/// ```
pub fn kl_divergence(p: ArrayView1<'_, f32>, q: ArrayView1<'_, f32>) -> Result<f32> {
    if p.len() != q.len() {
        return Err(Error::ShapeMismatch { expected: vec![p.len()], got: vec![q.len()] });
    }
    let kl = p
        .iter()
        .zip(q.iter())
        .map(|(&pi, &qi)| {
            let pi = pi.max(EPS);
            let qi = qi.max(EPS);
            pi * (pi / qi).ln()
        })
        .sum();
    Ok(kl)
}

/// Row-wise KL(p || q) for batches of distributions.
///
/// Both arguments must have shape `(n_instances, n_classes)`; the result has
/// one divergence per instance.
pub fn batch_kl_divergence(
    p: ArrayView2<'_, f32>,
    q: ArrayView2<'_, f32>,
) -> Result<Array1<f32>> {
    if p.shape() != q.shape() {
        return Err(Error::ShapeMismatch { expected: p.shape().to_vec(), got: q.shape().to_vec() });
    }
    let mut out = Array1::zeros(p.nrows());
    for (i, (p_row, q_row)) in p.axis_iter(Axis(0)).zip(q.axis_iter(Axis(0))).enumerate() {
        out[i] = kl_divergence(p_row, q_row)?;
    }
    Ok(out)
}

/// Mean of the row-wise divergences, used as a scalar batch loss term.
pub fn mean_kl_divergence(p: ArrayView2<'_, f32>, q: ArrayView2<'_, f32>) -> Result<f32> {
    let kl = batch_kl_divergence(p, q)?;
    if kl.is_empty() {
        return Ok(0.0);
    }
    Ok(kl.mean().unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use proptest::prelude::*;

    #[test]
    fn test_kl_identical_is_zero() {
        let p = array![0.2, 0.3, 0.5];
        let kl = kl_divergence(p.view(), p.view()).unwrap();
        assert_relative_eq!(kl, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_kl_known_value() {
        // KL([1, 0] || [0.5, 0.5]) = ln(2)
        let p = array![1.0, 0.0];
        let q = array![0.5, 0.5];
        let kl = kl_divergence(p.view(), q.view()).unwrap();
        assert_relative_eq!(kl, std::f32::consts::LN_2, epsilon = 1e-4);
    }

    #[test]
    fn test_kl_zero_entries_finite() {
        let p = array![0.0, 1.0];
        let q = array![1.0, 0.0];
        let kl = kl_divergence(p.view(), q.view()).unwrap();
        assert!(kl.is_finite());
        assert!(kl > 0.0);
    }

    #[test]
    fn test_kl_length_mismatch() {
        let p = array![0.5, 0.5];
        let q = array![0.3, 0.3, 0.4];
        assert!(kl_divergence(p.view(), q.view()).is_err());
    }

    #[test]
    fn test_batch_kl_row_wise() {
        let p = array![[1.0, 0.0], [0.5, 0.5]];
        let q = array![[0.5, 0.5], [0.5, 0.5]];
        let kl = batch_kl_divergence(p.view(), q.view()).unwrap();
        assert_eq!(kl.len(), 2);
        assert!(kl[0] > kl[1]);
        assert_relative_eq!(kl[1], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mean_kl_empty_batch() {
        let p = ndarray::Array2::<f32>::zeros((0, 3));
        let q = ndarray::Array2::<f32>::zeros((0, 3));
        assert_eq!(mean_kl_divergence(p.view(), q.view()).unwrap(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_kl_non_negative(raw_p in prop::collection::vec(0.01f32..1.0, 4),
                                raw_q in prop::collection::vec(0.01f32..1.0, 4)) {
            let sp: f32 = raw_p.iter().sum();
            let sq: f32 = raw_q.iter().sum();
            let p = ndarray::Array1::from_vec(raw_p.iter().map(|v| v / sp).collect());
            let q = ndarray::Array1::from_vec(raw_q.iter().map(|v| v / sq).collect());
            let kl = kl_divergence(p.view(), q.view()).unwrap();
            // Gibbs' inequality, up to clamping noise
            prop_assert!(kl > -1e-4);
        }
    }
}
