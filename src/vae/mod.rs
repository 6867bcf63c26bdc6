//! Sampling wrapper over a framework-owned VAE
//!
//! [`Vae`] adds what the seam trait leaves out: reparameterized draws from
//! the approximate posterior and reconstruction averaging over `n_samples`
//! draws. The encoder/decoder forward passes and all parameters stay with
//! the backing framework.

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{Gaussian, VaeModel};
use crate::{Error, Result};

/// Draw a standard normal via the Box-Muller transform.
fn standard_normal<R: Rng>(rng: &mut R) -> f32 {
    let u1: f64 = rng.random::<f64>().max(1e-10);
    let u2: f64 = rng.random::<f64>();
    ((-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()) as f32
}

/// Variational autoencoder with reparameterized sampling.
pub struct Vae<M> {
    backend: M,
    n_samples: usize,
    rng: StdRng,
}

impl<M: VaeModel> Vae<M> {
    /// Wrap a backend, drawing `n_samples` latent samples per reconstruction.
    pub fn new(backend: M, n_samples: usize) -> Result<Self> {
        if n_samples == 0 {
            return Err(Error::InvalidParameter("n_samples must be at least 1".to_string()));
        }
        Ok(Self { backend, n_samples, rng: StdRng::from_os_rng() })
    }

    /// Same as [`Vae::new`] with a fixed RNG seed for reproducibility.
    pub fn with_seed(backend: M, n_samples: usize, seed: u64) -> Result<Self> {
        let mut vae = Self::new(backend, n_samples)?;
        vae.rng = StdRng::seed_from_u64(seed);
        Ok(vae)
    }

    /// Number of latent draws per reconstruction.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Latent dimensionality of the backend.
    #[must_use]
    pub fn latent_dim(&self) -> usize {
        self.backend.latent_dim()
    }

    pub fn backend(&self) -> &M {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut M {
        &mut self.backend
    }

    /// Encode inputs to the approximate posterior, validating the latent shape.
    pub fn encode(&self, x: ArrayView2<'_, f32>) -> Result<Gaussian> {
        let posterior = self.backend.encode(x)?;
        if posterior.num_instances() != x.nrows()
            || posterior.latent_dim() != self.backend.latent_dim()
        {
            return Err(Error::ShapeMismatch {
                expected: vec![x.nrows(), self.backend.latent_dim()],
                got: vec![posterior.num_instances(), posterior.latent_dim()],
            });
        }
        Ok(posterior)
    }

    /// One reparameterized draw: z = mu + exp(lv / 2) * eps, eps ~ N(0, I).
    pub fn sample(&mut self, posterior: &Gaussian) -> Array2<f32> {
        let mut z = posterior.mean.clone();
        for (zv, &lv) in z.iter_mut().zip(posterior.log_var.iter()) {
            *zv += (lv * 0.5).exp() * standard_normal(&mut self.rng);
        }
        z
    }

    /// Decode one draw per call, `n_samples` times.
    pub fn sample_reconstructions(&mut self, x: ArrayView2<'_, f32>) -> Result<Vec<Array2<f32>>> {
        let posterior = self.encode(x)?;
        let mut recons = Vec::with_capacity(self.n_samples);
        for _ in 0..self.n_samples {
            let z = self.sample(&posterior);
            recons.push(self.backend.decode(z.view())?);
        }
        Ok(recons)
    }

    /// Mean reconstruction over `n_samples` draws from an encoded posterior.
    pub fn reconstruct_from(&mut self, posterior: &Gaussian) -> Result<Array2<f32>> {
        let mut acc: Option<Array2<f32>> = None;
        for _ in 0..self.n_samples {
            let z = self.sample(posterior);
            let decoded = self.backend.decode(z.view())?;
            acc = Some(match acc {
                Some(sum) => sum + decoded,
                None => decoded,
            });
        }
        let sum = acc.ok_or_else(|| {
            Error::InvalidParameter("n_samples must be at least 1".to_string())
        })?;
        Ok(sum / self.n_samples as f32)
    }

    /// Encode then average `n_samples` decoded draws.
    pub fn reconstruct(&mut self, x: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        let posterior = self.encode(x)?;
        self.reconstruct_from(&posterior)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    /// Identity backend: latent space is the input space.
    struct IdentityBackend {
        log_var: f32,
    }

    impl VaeModel for IdentityBackend {
        fn latent_dim(&self) -> usize {
            2
        }

        fn encode(&self, x: ArrayView2<'_, f32>) -> Result<Gaussian> {
            let mean = x.to_owned();
            let log_var = Array2::from_elem(mean.raw_dim(), self.log_var);
            Gaussian::new(mean, log_var)
        }

        fn decode(&self, z: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
            Ok(z.to_owned())
        }

        fn train_step(
            &mut self,
            _batch: ArrayView2<'_, f32>,
            _objective: &crate::losses::AdversarialObjective,
        ) -> Result<f32> {
            Ok(0.0)
        }
    }

    #[test]
    fn test_zero_samples_rejected() {
        assert!(Vae::new(IdentityBackend { log_var: 0.0 }, 0).is_err());
    }

    #[test]
    fn test_near_deterministic_posterior_reconstructs_input() {
        let mut vae = Vae::with_seed(IdentityBackend { log_var: -30.0 }, 5, 7).unwrap();
        let x = array![[0.5, -1.5], [2.0, 0.25]];
        let recon = vae.reconstruct(x.view()).unwrap();
        for (r, e) in recon.iter().zip(x.iter()) {
            assert_relative_eq!(r, e, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_sampling_is_seed_deterministic() {
        let x = array![[0.0, 0.0], [1.0, 1.0]];
        let mut a = Vae::with_seed(IdentityBackend { log_var: 0.0 }, 3, 42).unwrap();
        let mut b = Vae::with_seed(IdentityBackend { log_var: 0.0 }, 3, 42).unwrap();
        assert_eq!(a.reconstruct(x.view()).unwrap(), b.reconstruct(x.view()).unwrap());
    }

    #[test]
    fn test_sample_reconstructions_count() {
        let mut vae = Vae::with_seed(IdentityBackend { log_var: 0.0 }, 4, 1).unwrap();
        let x = array![[0.0, 1.0]];
        let recons = vae.sample_reconstructions(x.view()).unwrap();
        assert_eq!(recons.len(), 4);
    }

    #[test]
    fn test_unit_posterior_draws_spread() {
        let mut vae = Vae::with_seed(IdentityBackend { log_var: 0.0 }, 2, 3).unwrap();
        let posterior = vae.encode(array![[0.0, 0.0]].view()).unwrap();
        let a = vae.sample(&posterior);
        let b = vae.sample(&posterior);
        assert_ne!(a, b);
    }
}
