//! Seam traits for the backing ML framework
//!
//! Centinela does not implement automatic differentiation, layers, or
//! optimizers. The framework that owns the encoder, decoder, and classifier
//! networks plugs in through the traits in this module:
//!
//! - [`Classifier`] - the frozen model whose predictive distribution is
//!   compared between original and reconstructed inputs
//! - [`VaeModel`] - encoder/decoder forward passes plus a single gradient
//!   step against a training objective
//!
//! Inputs and outputs cross the seam as `ndarray` matrices with one instance
//! per row.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::losses::AdversarialObjective;
use crate::{Error, Result};

/// Kind of data the detector operates on, carried in detector metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Tabular,
    Image,
    TimeSeries,
}

/// Diagonal Gaussian over the latent space, one row per instance.
///
/// `mean` and `log_var` must have identical shapes `(n_instances, latent_dim)`.
#[derive(Debug, Clone)]
pub struct Gaussian {
    pub mean: Array2<f32>,
    pub log_var: Array2<f32>,
}

impl Gaussian {
    /// Create a posterior, validating that mean and log-variance agree in shape.
    pub fn new(mean: Array2<f32>, log_var: Array2<f32>) -> Result<Self> {
        if mean.shape() != log_var.shape() {
            return Err(Error::ShapeMismatch {
                expected: mean.shape().to_vec(),
                got: log_var.shape().to_vec(),
            });
        }
        Ok(Self { mean, log_var })
    }

    /// Number of instances (rows).
    #[must_use]
    pub fn num_instances(&self) -> usize {
        self.mean.nrows()
    }

    /// Dimensionality of the latent space (columns).
    #[must_use]
    pub fn latent_dim(&self) -> usize {
        self.mean.ncols()
    }
}

/// Frozen classifier owned by the backing framework.
///
/// `predict_proba` returns one probability distribution per input row; rows
/// are expected to be non-negative and sum to one.
pub trait Classifier {
    fn predict_proba(&self, x: ArrayView2<'_, f32>) -> Result<Array2<f32>>;

    /// Number of classes in the output distribution.
    fn num_classes(&self) -> usize;
}

/// Variational autoencoder owned by the backing framework.
///
/// The forward passes (`encode`, `decode`) are used for scoring; `train_step`
/// is invoked by the training loop and must perform one parameter update
/// against the supplied objective, returning the batch loss. How gradients
/// are computed and which optimizer applies them is the framework's concern.
pub trait VaeModel {
    /// Dimensionality of the latent space.
    fn latent_dim(&self) -> usize;

    /// Map inputs to the approximate posterior q(z|x).
    fn encode(&self, x: ArrayView2<'_, f32>) -> Result<Gaussian>;

    /// Map latent codes back to input space.
    fn decode(&self, z: ArrayView2<'_, f32>) -> Result<Array2<f32>>;

    /// Run one gradient update on a batch and return the batch loss.
    fn train_step(
        &mut self,
        batch: ArrayView2<'_, f32>,
        objective: &AdversarialObjective,
    ) -> Result<f32>;
}
