//! # Centinela: Adversarial-Example Detection
//!
//! Centinela detects adversarial examples by training a variational
//! autoencoder (VAE) alongside a frozen classifier: the VAE learns to
//! reconstruct inputs so that the classifier's predictive distribution on
//! the reconstruction matches its distribution on the original. Inputs a
//! small perturbation has pushed across the decision boundary reconstruct
//! back onto the data manifold, the two distributions diverge, and the
//! KL divergence between them becomes the adversarial score.
//!
//! ## Architecture
//!
//! - **model**: seam traits for the backing ML framework (classifier,
//!   encoder/decoder forward passes, gradient step)
//! - **vae**: reparameterized sampling and reconstruction averaging
//! - **losses**: KL divergence, negative ELBO, and the combined objective
//! - **train**: epoch/minibatch loop, callbacks, metrics
//! - **detector**: the `AdversarialVae` detector (fit / infer_threshold /
//!   predict) and its `meta` / `data` prediction envelope
//! - **io**: detector state persistence (JSON)
//!
//! Automatic differentiation, layers, and optimizers are deliberately out of
//! scope; they stay inside the framework that implements the seam traits.

pub mod detector;
pub mod io;
pub mod losses;
pub mod model;
pub mod train;
pub mod vae;

pub mod error;

// Re-export commonly used types
pub use detector::{AdversarialVae, DetectorOutput, FitOptions};
pub use error::{Error, Result};
pub use losses::{AdversarialObjective, Covariance};
pub use model::{Classifier, DataType, Gaussian, VaeModel};
pub use vae::Vae;
