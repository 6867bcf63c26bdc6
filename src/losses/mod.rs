//! Loss and score functions
//!
//! Forward-only array math shared by training objectives and detector
//! scoring:
//! - Categorical KL divergence between predictive distributions
//! - Negative evidence lower bound (ELBO) under a Gaussian likelihood
//! - The combined adversarial training objective
//!
//! Gradient computation lives behind the [`crate::model::VaeModel`] seam;
//! these functions only evaluate loss values.

mod elbo;
mod kld;
mod objective;

pub use elbo::{gaussian_nll, latent_kl, negative_elbo, Covariance};
pub use kld::{batch_kl_divergence, kl_divergence, mean_kl_divergence};
pub use objective::AdversarialObjective;
