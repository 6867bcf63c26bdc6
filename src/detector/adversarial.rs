//! VAE-based adversarial-example detector
//!
//! The detector trains a VAE so that a frozen classifier's predictive
//! distribution on a reconstruction stays close to its distribution on the
//! original input. At detection time the adversarial score of an instance is
//! the KL divergence between the two distributions, averaged over latent
//! draws; instances scoring above the threshold are flagged.

use ndarray::{Array1, ArrayView2, Axis};

use super::{percentile, DetectionData, DetectorMeta, DetectorOutput};
use crate::losses::{batch_kl_divergence, AdversarialObjective, Covariance};
use crate::model::{Classifier, DataType, VaeModel};
use crate::train::{ProgressCallback, TrainConfig, Trainer, TrainResult, TrainerCallback};
use crate::vae::Vae;
use crate::{Error, Result};

/// Options for [`AdversarialVae::fit`].
///
/// The optimizer and learning rate belong to the backing framework; only
/// loop-level knobs and loss weights appear here.
pub struct FitOptions {
    /// Weight on the classifier-divergence loss term
    pub w_model: f32,
    /// Weight on the reconstruction (negative ELBO) loss term
    pub w_recon: f32,
    /// Covariance of the reconstruction likelihood
    pub covariance: Covariance,
    /// Number of training epochs
    pub epochs: usize,
    /// Minibatch size
    pub batch_size: usize,
    /// Shuffle instance order each epoch
    pub shuffle: bool,
    /// Seed for the shuffle RNG
    pub seed: Option<u64>,
    /// Log training progress
    pub verbose: bool,
    /// Steps between progress log lines when verbose
    pub log_interval: usize,
    /// Additional callbacks attached to the training loop
    pub callbacks: Vec<Box<dyn TrainerCallback>>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            w_model: 1.0,
            w_recon: 0.0,
            covariance: Covariance::default(),
            epochs: 20,
            batch_size: 64,
            shuffle: true,
            seed: None,
            verbose: true,
            log_interval: 10,
            callbacks: Vec::new(),
        }
    }
}

impl FitOptions {
    /// Attach a callback, e.g. [`crate::train::EarlyStopping`].
    #[must_use]
    pub fn with_callback<T: TrainerCallback + 'static>(mut self, callback: T) -> Self {
        self.callbacks.push(Box::new(callback));
        self
    }
}

/// Adversarial-example detector built from a VAE and a frozen classifier.
///
/// # Example
///
/// ```no_run
/// # use centinela::detector::{AdversarialVae, FitOptions};
/// # use centinela::model::{Classifier, VaeModel};
/// # use ndarray::Array2;
/// # fn run<M: VaeModel, C: Classifier>(backend: M, classifier: C) -> centinela::Result<()> {
/// let mut detector = AdversarialVae::builder(backend, classifier)
///     .n_samples(10)
///     .beta(0.1)
///     .build()?;
///
/// let x_train = Array2::<f32>::zeros((256, 8));
/// detector.fit(x_train.view(), FitOptions::default())?;
/// detector.infer_threshold(x_train.view(), 95.0)?;
///
/// let preds = detector.predict(x_train.view(), true)?;
/// assert_eq!(preds.data.is_adversarial.len(), 256);
/// # Ok(())
/// # }
/// ```
pub struct AdversarialVae<M, C> {
    vae: Vae<M>,
    classifier: C,
    threshold: Option<f32>,
    beta: f32,
    score_batch_size: usize,
    meta: DetectorMeta,
    objective: AdversarialObjective,
}

/// Builder for [`AdversarialVae`].
pub struct AdversarialVaeBuilder<M, C> {
    backend: M,
    classifier: C,
    threshold: Option<f32>,
    n_samples: usize,
    beta: f32,
    data_type: Option<DataType>,
    score_batch_size: usize,
    seed: Option<u64>,
}

impl<M: VaeModel, C: Classifier> AdversarialVaeBuilder<M, C> {
    /// Flag instances whose score exceeds this threshold.
    #[must_use]
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Number of latent draws averaged per score.
    #[must_use]
    pub fn n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples;
        self
    }

    /// Weight on the latent KL term of the ELBO.
    #[must_use]
    pub fn beta(mut self, beta: f32) -> Self {
        self.beta = beta;
        self
    }

    /// Kind of data the detector operates on, recorded in metadata.
    #[must_use]
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Upper bound on instances scored per forward pass.
    #[must_use]
    pub fn score_batch_size(mut self, score_batch_size: usize) -> Self {
        self.score_batch_size = score_batch_size;
        self
    }

    /// Seed for the latent-sampling RNG.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<AdversarialVae<M, C>> {
        if self.score_batch_size == 0 {
            return Err(Error::InvalidParameter(
                "score_batch_size must be at least 1".to_string(),
            ));
        }
        let vae = match self.seed {
            Some(seed) => Vae::with_seed(self.backend, self.n_samples, seed)?,
            None => Vae::new(self.backend, self.n_samples)?,
        };
        let objective = AdversarialObjective { beta: self.beta, ..Default::default() };
        Ok(AdversarialVae {
            vae,
            classifier: self.classifier,
            threshold: self.threshold,
            beta: self.beta,
            score_batch_size: self.score_batch_size,
            meta: DetectorMeta::new("adversarial_vae", self.data_type),
            objective,
        })
    }
}

impl<M: VaeModel, C: Classifier> AdversarialVae<M, C> {
    /// Start building a detector around a VAE backend and a frozen classifier.
    pub fn builder(backend: M, classifier: C) -> AdversarialVaeBuilder<M, C> {
        AdversarialVaeBuilder {
            backend,
            classifier,
            threshold: None,
            n_samples: 10,
            beta: 0.0,
            data_type: None,
            score_batch_size: 1 << 20,
            seed: None,
        }
    }

    pub fn meta(&self) -> &DetectorMeta {
        &self.meta
    }

    #[must_use]
    pub fn threshold(&self) -> Option<f32> {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = Some(threshold);
    }

    #[must_use]
    pub fn beta(&self) -> f32 {
        self.beta
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.vae.n_samples()
    }

    pub fn vae(&self) -> &Vae<M> {
        &self.vae
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Train the VAE on (assumed normal) data.
    ///
    /// Takes the options by value; callbacks attached via
    /// [`FitOptions::with_callback`] are handed to the training loop.
    pub fn fit(&mut self, x_train: ArrayView2<'_, f32>, opts: FitOptions) -> Result<TrainResult> {
        opts.covariance.validate(x_train.ncols())?;
        let objective = AdversarialObjective {
            w_model: opts.w_model,
            w_recon: opts.w_recon,
            beta: self.beta,
            covariance: opts.covariance,
        };
        let config = TrainConfig {
            epochs: opts.epochs,
            batch_size: opts.batch_size,
            shuffle: opts.shuffle,
            seed: opts.seed,
            verbose: opts.verbose,
        };
        let mut trainer = Trainer::new(config);
        if opts.verbose {
            trainer.add_callback(ProgressCallback::new(opts.log_interval));
        }
        for callback in opts.callbacks {
            trainer.add_boxed_callback(callback);
        }
        let result = trainer.fit(self.vae.backend_mut(), x_train, &objective)?;
        self.objective = objective;
        Ok(result)
    }

    /// Detector-side state for persistence via [`crate::io`].
    #[must_use]
    pub fn state(&self) -> crate::io::DetectorState {
        crate::io::DetectorState {
            meta: self.meta.clone(),
            threshold: self.threshold,
            n_samples: self.vae.n_samples(),
            objective: self.objective.clone(),
        }
    }

    /// Restore threshold and objective from persisted state.
    ///
    /// The state must describe a detector with the same number of latent
    /// draws; backend weights are restored through the framework.
    pub fn restore(&mut self, state: &crate::io::DetectorState) -> Result<()> {
        if state.n_samples != self.vae.n_samples() {
            return Err(Error::InvalidParameter(format!(
                "state was saved with n_samples = {}, detector uses {}",
                state.n_samples,
                self.vae.n_samples()
            )));
        }
        self.threshold = state.threshold;
        self.objective = state.objective.clone();
        self.beta = state.objective.beta;
        self.meta = state.meta.clone();
        Ok(())
    }

    /// Adversarial score per instance.
    ///
    /// For each of `n_samples` latent draws, the input is reconstructed and
    /// KL(model(x) || model(recon)) computed row-wise; scores are the mean
    /// over draws.
    pub fn score(&mut self, x: ArrayView2<'_, f32>) -> Result<Array1<f32>> {
        let mut scores = Array1::zeros(x.nrows());
        let mut start = 0;
        while start < x.nrows() {
            let end = (start + self.score_batch_size).min(x.nrows());
            let chunk = x.slice_axis(Axis(0), (start..end).into());
            let chunk_scores = self.score_batch(chunk)?;
            scores.slice_axis_mut(Axis(0), (start..end).into()).assign(&chunk_scores);
            start = end;
        }
        Ok(scores)
    }

    fn score_batch(&mut self, x: ArrayView2<'_, f32>) -> Result<Array1<f32>> {
        let preds = self.classifier.predict_proba(x)?;
        if preds.nrows() != x.nrows() || preds.ncols() != self.classifier.num_classes() {
            return Err(Error::ShapeMismatch {
                expected: vec![x.nrows(), self.classifier.num_classes()],
                got: preds.shape().to_vec(),
            });
        }

        let recons = self.vae.sample_reconstructions(x)?;
        let n_draws = recons.len() as f32;
        let mut acc = Array1::zeros(x.nrows());
        for recon in recons {
            let preds_recon = self.classifier.predict_proba(recon.view())?;
            acc += &batch_kl_divergence(preds.view(), preds_recon.view())?;
        }
        Ok(acc / n_draws)
    }

    /// Set the threshold to the `threshold_perc` percentile of instance
    /// scores on (assumed normal) data. Returns the inferred threshold.
    pub fn infer_threshold(
        &mut self,
        x: ArrayView2<'_, f32>,
        threshold_perc: f32,
    ) -> Result<f32> {
        let scores = self.score(x)?.to_vec();
        let threshold = percentile(&scores, threshold_perc)?;
        self.threshold = Some(threshold);
        Ok(threshold)
    }

    /// Flag adversarial instances.
    ///
    /// Fails with [`Error::ThresholdNotSet`] unless a threshold was supplied
    /// at construction or inferred via [`AdversarialVae::infer_threshold`].
    pub fn predict(
        &mut self,
        x: ArrayView2<'_, f32>,
        return_instance_score: bool,
    ) -> Result<DetectorOutput> {
        let threshold = self.threshold.ok_or(Error::ThresholdNotSet)?;
        let scores = self.score(x)?;
        let is_adversarial = scores.iter().map(|&s| s > threshold).collect();
        let instance_score = return_instance_score.then(|| scores.to_vec());
        Ok(DetectorOutput {
            meta: self.meta.clone(),
            data: DetectionData { is_adversarial, instance_score },
        })
    }
}
