//! Training configuration and metrics tracking

use serde::{Deserialize, Serialize};

/// Loop-level training knobs.
///
/// Optimizer settings live inside the backing framework and are not part of
/// this configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Minibatch size
    pub batch_size: usize,
    /// Shuffle instance order each epoch
    pub shuffle: bool,
    /// RNG seed for shuffling; `None` seeds from the OS
    pub seed: Option<u64>,
    /// Log training progress
    pub verbose: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self { epochs: 20, batch_size: 64, shuffle: true, seed: None, verbose: true }
    }
}

/// Tracks losses and step counts across a training run.
#[derive(Debug, Clone, Default)]
pub struct MetricsTracker {
    /// Mean loss per completed epoch
    pub epoch_losses: Vec<f32>,
    /// Global step count
    pub steps: usize,
    /// Completed epochs
    pub epoch: usize,
}

impl MetricsTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed epoch's mean loss.
    pub fn record_epoch(&mut self, loss: f32) {
        self.epoch_losses.push(loss);
        self.epoch += 1;
    }

    pub fn increment_step(&mut self) {
        self.steps += 1;
    }

    /// Mean loss of the most recent epoch.
    #[must_use]
    pub fn last_loss(&self) -> Option<f32> {
        self.epoch_losses.last().copied()
    }

    /// Lowest epoch loss seen so far.
    #[must_use]
    pub fn best_loss(&self) -> Option<f32> {
        self.epoch_losses.iter().copied().min_by(f32::total_cmp)
    }
}
