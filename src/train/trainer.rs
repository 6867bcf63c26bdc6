//! Epoch/minibatch loop over a framework-owned model

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

use super::batch::BatchIterator;
use super::callback::{CallbackAction, CallbackContext, CallbackManager, TrainerCallback};
use super::config::{MetricsTracker, TrainConfig};
use crate::losses::AdversarialObjective;
use crate::model::VaeModel;
use crate::Result;

/// Summary of a completed training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainResult {
    /// Number of completed epochs
    pub final_epoch: usize,
    /// Mean loss of the last completed epoch
    pub final_loss: f32,
    /// Best epoch loss achieved
    pub best_loss: f32,
    /// Whether a callback stopped the run early
    pub stopped_early: bool,
    /// Wall-clock duration in seconds
    pub elapsed_secs: f64,
}

/// Orchestrates the training loop.
///
/// Each step hands one minibatch to [`VaeModel::train_step`] together with
/// the objective; the trainer owns shuffling, loss aggregation, metrics, and
/// callbacks.
pub struct Trainer {
    config: TrainConfig,
    /// Metrics tracker
    pub metrics: MetricsTracker,
    callbacks: CallbackManager,
    best_loss: Option<f32>,
    start_time: Option<Instant>,
    rng: StdRng,
}

impl Trainer {
    /// Create a trainer; the shuffle RNG is seeded from the config.
    #[must_use]
    pub fn new(config: TrainConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            metrics: MetricsTracker::new(),
            callbacks: CallbackManager::new(),
            best_loss: None,
            start_time: None,
            rng,
        }
    }

    /// Add a callback to the trainer
    pub fn add_callback<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.add(callback);
    }

    /// Add an already-boxed callback to the trainer
    pub fn add_boxed_callback(&mut self, callback: Box<dyn TrainerCallback>) {
        self.callbacks.add_boxed(callback);
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Train `model` on `x_train` against `objective`.
    pub fn fit<M: VaeModel>(
        &mut self,
        model: &mut M,
        x_train: ArrayView2<'_, f32>,
        objective: &AdversarialObjective,
    ) -> Result<TrainResult> {
        self.start_time = Some(Instant::now());
        self.best_loss = None;
        let max_epochs = self.config.epochs;
        let mut stopped_early = false;
        let mut final_loss = 0.0;

        let ctx = self.build_context(0, 0, 0, 0.0);
        if self.callbacks.on_train_begin(&ctx) == CallbackAction::Stop {
            return Ok(self.finalize(0.0, true));
        }

        for epoch in 0..max_epochs {
            let action = {
                let ctx = self.build_context(epoch, 0, 0, final_loss);
                self.callbacks.on_epoch_begin(&ctx)
            };
            if action == CallbackAction::Stop {
                stopped_early = true;
                break;
            }
            if action == CallbackAction::SkipEpoch {
                continue;
            }

            let batches = BatchIterator::new(
                x_train,
                self.config.batch_size,
                self.config.shuffle,
                &mut self.rng,
            )?;
            let steps_per_epoch = batches.num_batches();

            let mut total_loss = 0.0;
            let mut num_batches = 0;
            let mut epoch_stopped = false;

            for (step, batch) in batches.enumerate() {
                let loss = model.train_step(batch.inputs.view(), objective)?;
                total_loss += loss;
                num_batches += 1;
                self.metrics.increment_step();

                let ctx = self.build_context(epoch, step, steps_per_epoch, loss);
                if self.callbacks.on_step_end(&ctx) == CallbackAction::Stop {
                    epoch_stopped = true;
                    break;
                }
            }
            if epoch_stopped {
                stopped_early = true;
                break;
            }

            let avg_loss =
                if num_batches > 0 { total_loss / num_batches as f32 } else { 0.0 };
            final_loss = avg_loss;
            if self.best_loss.is_none_or(|b| avg_loss < b) {
                self.best_loss = Some(avg_loss);
            }
            self.metrics.record_epoch(avg_loss);

            let ctx = self.build_context(epoch, steps_per_epoch, steps_per_epoch, avg_loss);
            if self.callbacks.on_epoch_end(&ctx) == CallbackAction::Stop {
                stopped_early = true;
                break;
            }
        }

        Ok(self.finalize(final_loss, stopped_early))
    }

    fn build_context(
        &self,
        epoch: usize,
        step: usize,
        steps_per_epoch: usize,
        loss: f32,
    ) -> CallbackContext {
        CallbackContext {
            epoch,
            max_epochs: self.config.epochs,
            step,
            steps_per_epoch,
            global_step: self.metrics.steps,
            loss,
            best_loss: self.best_loss,
            elapsed_secs: self.elapsed_secs(),
        }
    }

    fn elapsed_secs(&self) -> f64 {
        self.start_time.map_or(0.0, |t| t.elapsed().as_secs_f64())
    }

    fn finalize(&mut self, final_loss: f32, stopped_early: bool) -> TrainResult {
        let ctx = self.build_context(self.metrics.epoch, 0, 0, final_loss);
        self.callbacks.on_train_end(&ctx);

        TrainResult {
            final_epoch: self.metrics.epoch,
            final_loss,
            best_loss: self.best_loss.unwrap_or(final_loss),
            stopped_early,
            elapsed_secs: self.elapsed_secs(),
        }
    }
}
