//! Evidence lower bound under a Gaussian reconstruction likelihood

use ndarray::{Array1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::model::Gaussian;
use crate::{Error, Result};

const LN_2PI: f32 = 1.837_877_1;

/// Covariance of the Gaussian reconstruction likelihood.
///
/// `Identity` scales the unit matrix by a single variance; `Diagonal` holds
/// one variance per feature. A full covariance matrix would require a
/// Cholesky factorization and is out of scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Covariance {
    Identity { scale: f32 },
    Diagonal(Vec<f32>),
}

impl Default for Covariance {
    fn default() -> Self {
        Covariance::Identity { scale: 1.0 }
    }
}

impl Covariance {
    /// Validate against the feature dimensionality of the data.
    pub fn validate(&self, n_features: usize) -> Result<()> {
        match self {
            Covariance::Identity { scale } => {
                if *scale <= 0.0 {
                    return Err(Error::InvalidParameter(format!(
                        "covariance scale must be positive, got {scale}"
                    )));
                }
            }
            Covariance::Diagonal(vars) => {
                if vars.len() != n_features {
                    return Err(Error::ShapeMismatch {
                        expected: vec![n_features],
                        got: vec![vars.len()],
                    });
                }
                if vars.iter().any(|&v| v <= 0.0) {
                    return Err(Error::InvalidParameter(
                        "diagonal covariance entries must be positive".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn variance(&self, feature: usize) -> f32 {
        match self {
            Covariance::Identity { scale } => *scale,
            Covariance::Diagonal(vars) => vars[feature],
        }
    }
}

/// Per-instance negative log-likelihood of `x` under N(recon, cov).
///
/// nll_i = 0.5 * sum_j [ (x_ij - r_ij)^2 / var_j + ln(2 pi var_j) ]
pub fn gaussian_nll(
    x: ArrayView2<'_, f32>,
    recon: ArrayView2<'_, f32>,
    cov: &Covariance,
) -> Result<Array1<f32>> {
    if x.shape() != recon.shape() {
        return Err(Error::ShapeMismatch { expected: x.shape().to_vec(), got: recon.shape().to_vec() });
    }
    cov.validate(x.ncols())?;

    let mut out = Array1::zeros(x.nrows());
    for (i, (x_row, r_row)) in x.axis_iter(Axis(0)).zip(recon.axis_iter(Axis(0))).enumerate() {
        let mut nll = 0.0;
        for (j, (&xv, &rv)) in x_row.iter().zip(r_row.iter()).enumerate() {
            let var = cov.variance(j);
            let diff = xv - rv;
            nll += diff * diff / var + (var.ln() + LN_2PI);
        }
        out[i] = 0.5 * nll;
    }
    Ok(out)
}

/// Per-instance KL(q(z|x) || N(0, I)) for a diagonal Gaussian posterior.
///
/// kl_i = 0.5 * sum_k [ exp(lv_ik) + mu_ik^2 - 1 - lv_ik ]
#[must_use]
pub fn latent_kl(posterior: &Gaussian) -> Array1<f32> {
    let mut out = Array1::zeros(posterior.num_instances());
    for (i, (mu_row, lv_row)) in posterior
        .mean
        .axis_iter(Axis(0))
        .zip(posterior.log_var.axis_iter(Axis(0)))
        .enumerate()
    {
        let kl: f32 = mu_row
            .iter()
            .zip(lv_row.iter())
            .map(|(&mu, &lv)| lv.exp() + mu * mu - 1.0 - lv)
            .sum();
        out[i] = 0.5 * kl;
    }
    out
}

/// Per-instance negative ELBO: Gaussian NLL plus `beta` times the latent KL.
pub fn negative_elbo(
    x: ArrayView2<'_, f32>,
    recon: ArrayView2<'_, f32>,
    posterior: &Gaussian,
    cov: &Covariance,
    beta: f32,
) -> Result<Array1<f32>> {
    if posterior.num_instances() != x.nrows() {
        return Err(Error::ShapeMismatch {
            expected: vec![x.nrows()],
            got: vec![posterior.num_instances()],
        });
    }
    let nll = gaussian_nll(x, recon, cov)?;
    if beta == 0.0 {
        return Ok(nll);
    }
    Ok(nll + latent_kl(posterior) * beta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_nll_perfect_reconstruction_unit_cov() {
        // diff = 0, so nll = 0.5 * d * ln(2 pi)
        let x = array![[0.3, -0.7]];
        let nll = gaussian_nll(x.view(), x.view(), &Covariance::default()).unwrap();
        assert_relative_eq!(nll[0], LN_2PI, epsilon = 1e-5);
    }

    #[test]
    fn test_nll_grows_with_error() {
        let x = array![[0.0, 0.0]];
        let near = array![[0.1, 0.0]];
        let far = array![[2.0, 0.0]];
        let cov = Covariance::default();
        let n = gaussian_nll(x.view(), near.view(), &cov).unwrap();
        let f = gaussian_nll(x.view(), far.view(), &cov).unwrap();
        assert!(f[0] > n[0]);
    }

    #[test]
    fn test_diagonal_covariance_downweights_feature() {
        let x = array![[0.0, 0.0]];
        let recon = array![[1.0, 0.0]];
        let tight = Covariance::Diagonal(vec![0.1, 1.0]);
        let loose = Covariance::Diagonal(vec![10.0, 1.0]);
        let t = gaussian_nll(x.view(), recon.view(), &tight).unwrap();
        let l = gaussian_nll(x.view(), recon.view(), &loose).unwrap();
        assert!(t[0] > l[0]);
    }

    #[test]
    fn test_covariance_validation() {
        assert!(Covariance::Identity { scale: 0.0 }.validate(2).is_err());
        assert!(Covariance::Diagonal(vec![1.0]).validate(2).is_err());
        assert!(Covariance::Diagonal(vec![1.0, -1.0]).validate(2).is_err());
        assert!(Covariance::Diagonal(vec![1.0, 2.0]).validate(2).is_ok());
    }

    #[test]
    fn test_latent_kl_standard_posterior_is_zero() {
        let posterior =
            Gaussian::new(Array2::zeros((2, 3)), Array2::zeros((2, 3))).unwrap();
        let kl = latent_kl(&posterior);
        assert_relative_eq!(kl[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(kl[1], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_latent_kl_shifted_mean() {
        // KL for mu=1, lv=0 per dim is 0.5
        let posterior =
            Gaussian::new(Array2::ones((1, 4)), Array2::zeros((1, 4))).unwrap();
        let kl = latent_kl(&posterior);
        assert_relative_eq!(kl[0], 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_negative_elbo_beta_adds_latent_term() {
        let x = array![[0.0, 0.0]];
        let posterior = Gaussian::new(array![[1.0, 1.0]], array![[0.0, 0.0]]).unwrap();
        let cov = Covariance::default();
        let base = negative_elbo(x.view(), x.view(), &posterior, &cov, 0.0).unwrap();
        let weighted = negative_elbo(x.view(), x.view(), &posterior, &cov, 1.0).unwrap();
        assert_relative_eq!(weighted[0] - base[0], 1.0, epsilon = 1e-5);
    }
}
