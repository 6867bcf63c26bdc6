//! Saving and loading detector state
//!
//! Persists the detector-side configuration (metadata, threshold, sampling
//! and loss settings) as pretty JSON. The encoder, decoder, and classifier
//! weights belong to the backing framework and are saved through its own
//! mechanisms, next to this file.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use crate::detector::DetectorMeta;
use crate::losses::AdversarialObjective;
use crate::{Error, Result};

/// Serializable detector-side state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorState {
    /// Detector metadata
    pub meta: DetectorMeta,
    /// Decision threshold, if one was set or inferred
    pub threshold: Option<f32>,
    /// Latent draws averaged per score
    pub n_samples: usize,
    /// Objective the VAE was trained against
    pub objective: AdversarialObjective,
}

/// Save detector state to a JSON file.
///
/// # Example
///
/// ```no_run
/// use centinela::io::{save_state, DetectorState};
/// # fn run(state: &DetectorState) -> centinela::Result<()> {
/// save_state(state, "detector.json")?;
/// # Ok(())
/// # }
/// ```
pub fn save_state(state: &DetectorState, path: impl AsRef<Path>) -> Result<()> {
    let data = serde_json::to_string_pretty(state)
        .map_err(|e| Error::Serialization(format!("JSON serialization failed: {e}")))?;
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    Ok(())
}

/// Load detector state from a JSON file.
pub fn load_state(path: impl AsRef<Path>) -> Result<DetectorState> {
    let file = File::open(path)?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| Error::Serialization(format!("JSON deserialization failed: {e}")))
}
