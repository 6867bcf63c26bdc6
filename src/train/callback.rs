//! Training callbacks
//!
//! - `CallbackContext` - state passed to callbacks
//! - `CallbackAction` - actions a callback can request
//! - `TrainerCallback` - the trait all callbacks implement
//! - `ProgressCallback` / `EarlyStopping` - built-in callbacks

/// Context passed to callbacks with current training state
#[derive(Clone, Debug, Default)]
pub struct CallbackContext {
    /// Current epoch (0-indexed)
    pub epoch: usize,
    /// Total epochs planned
    pub max_epochs: usize,
    /// Current step within epoch
    pub step: usize,
    /// Total steps in epoch
    pub steps_per_epoch: usize,
    /// Global step count
    pub global_step: usize,
    /// Current loss value
    pub loss: f32,
    /// Best epoch loss seen so far
    pub best_loss: Option<f32>,
    /// Training duration in seconds
    pub elapsed_secs: f64,
}

/// Action to take after a callback
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    /// Continue training normally
    Continue,
    /// Stop training (early stopping)
    Stop,
    /// Skip rest of current epoch
    SkipEpoch,
}

/// Trait for training callbacks
///
/// All methods have default no-op implementations, so a callback only needs
/// to implement the events it cares about.
pub trait TrainerCallback: Send {
    /// Called before training starts
    fn on_train_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after training ends
    fn on_train_end(&mut self, _ctx: &CallbackContext) {}

    /// Called before each epoch
    fn on_epoch_begin(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after each epoch
    fn on_epoch_end(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Called after each training step
    fn on_step_end(&mut self, _ctx: &CallbackContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Get callback name for logging
    fn name(&self) -> &'static str {
        "TrainerCallback"
    }
}

/// Dispatches events to registered callbacks.
///
/// `Stop` wins over `SkipEpoch`, which wins over `Continue`.
#[derive(Default)]
pub struct CallbackManager {
    callbacks: Vec<Box<dyn TrainerCallback>>,
}

impl CallbackManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<C: TrainerCallback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn add_boxed(&mut self, callback: Box<dyn TrainerCallback>) {
        self.callbacks.push(callback);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    fn merge(a: CallbackAction, b: CallbackAction) -> CallbackAction {
        use CallbackAction::{Continue, SkipEpoch, Stop};
        match (a, b) {
            (Stop, _) | (_, Stop) => Stop,
            (SkipEpoch, _) | (_, SkipEpoch) => SkipEpoch,
            (Continue, Continue) => Continue,
        }
    }

    pub fn on_train_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.callbacks
            .iter_mut()
            .map(|c| c.on_train_begin(ctx))
            .fold(CallbackAction::Continue, Self::merge)
    }

    pub fn on_train_end(&mut self, ctx: &CallbackContext) {
        for c in &mut self.callbacks {
            c.on_train_end(ctx);
        }
    }

    pub fn on_epoch_begin(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.callbacks
            .iter_mut()
            .map(|c| c.on_epoch_begin(ctx))
            .fold(CallbackAction::Continue, Self::merge)
    }

    pub fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.callbacks
            .iter_mut()
            .map(|c| c.on_epoch_end(ctx))
            .fold(CallbackAction::Continue, Self::merge)
    }

    pub fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        self.callbacks
            .iter_mut()
            .map(|c| c.on_step_end(ctx))
            .fold(CallbackAction::Continue, Self::merge)
    }
}

/// Progress callback for logging training progress
#[derive(Clone, Debug)]
pub struct ProgressCallback {
    /// Log every N steps
    log_interval: usize,
}

impl ProgressCallback {
    /// Create progress callback
    #[must_use]
    pub fn new(log_interval: usize) -> Self {
        Self { log_interval: log_interval.max(1) }
    }
}

impl Default for ProgressCallback {
    fn default() -> Self {
        Self { log_interval: 10 }
    }
}

impl TrainerCallback for ProgressCallback {
    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        println!(
            "Epoch {}/{}: loss: {:.4} ({:.1}s)",
            ctx.epoch + 1,
            ctx.max_epochs,
            ctx.loss,
            ctx.elapsed_secs
        );
        CallbackAction::Continue
    }

    fn on_step_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        if ctx.step > 0 && ctx.step.is_multiple_of(self.log_interval) {
            println!("  Step {}/{}: loss: {:.4}", ctx.step, ctx.steps_per_epoch, ctx.loss);
        }
        CallbackAction::Continue
    }

    fn name(&self) -> &'static str {
        "ProgressCallback"
    }
}

/// Stops training when the epoch loss stops improving.
#[derive(Clone, Debug)]
pub struct EarlyStopping {
    patience: usize,
    min_delta: f32,
    best: Option<f32>,
    stale_epochs: usize,
}

impl EarlyStopping {
    /// Stop after `patience` epochs without an improvement of at least `min_delta`.
    #[must_use]
    pub fn new(patience: usize, min_delta: f32) -> Self {
        Self { patience, min_delta, best: None, stale_epochs: 0 }
    }
}

impl TrainerCallback for EarlyStopping {
    fn on_epoch_end(&mut self, ctx: &CallbackContext) -> CallbackAction {
        let improved = self.best.is_none_or(|b| ctx.loss < b - self.min_delta);
        if improved {
            self.best = Some(ctx.loss);
            self.stale_epochs = 0;
            return CallbackAction::Continue;
        }
        self.stale_epochs += 1;
        if self.stale_epochs >= self.patience {
            CallbackAction::Stop
        } else {
            CallbackAction::Continue
        }
    }

    fn name(&self) -> &'static str {
        "EarlyStopping"
    }
}
