//! High-level training loop
//!
//! Drives epochs and minibatches over a framework-owned model:
//! - Batch iteration with optional shuffling
//! - Training configuration and metrics tracking
//! - Callbacks (progress logging, early stopping)
//! - Trainer abstraction returning a [`TrainResult`]
//!
//! The actual gradient step happens inside
//! [`crate::model::VaeModel::train_step`]; the loop here only orchestrates.

mod batch;
mod callback;
mod config;
mod trainer;

pub use batch::{Batch, BatchIterator};
pub use callback::{
    CallbackAction, CallbackContext, CallbackManager, EarlyStopping, ProgressCallback,
    TrainerCallback,
};
pub use config::{MetricsTracker, TrainConfig};
pub use trainer::{TrainResult, Trainer};
