//! Detector metadata and prediction envelope
//!
//! Predictions are returned as a `meta` / `data` pair: `meta` identifies the
//! detector, `data` carries the boolean adversarial flags and, optionally,
//! the per-instance scores.

mod adversarial;

pub use adversarial::{AdversarialVae, AdversarialVaeBuilder, FitOptions};

use serde::{Deserialize, Serialize};

use crate::model::DataType;
use crate::{Error, Result};

/// Identifies a detector instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorMeta {
    /// Detector name
    pub name: String,
    /// Detection mode; always "offline" for this detector
    pub detector_type: String,
    /// Kind of data the detector was configured for
    pub data_type: Option<DataType>,
    /// Library version that produced the detector
    pub version: String,
}

impl DetectorMeta {
    pub fn new(name: impl Into<String>, data_type: Option<DataType>) -> Self {
        Self {
            name: name.into(),
            detector_type: "offline".to_string(),
            data_type,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Per-instance detection results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionData {
    /// Adversarial flag per instance
    pub is_adversarial: Vec<bool>,
    /// Instance-level scores, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_score: Option<Vec<f32>>,
}

/// Prediction output: detector metadata plus detection data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorOutput {
    pub meta: DetectorMeta,
    pub data: DetectionData,
}

/// Percentile of `values` with linear interpolation between order statistics.
///
/// `q` is in percent, `0.0..=100.0`. Non-finite values are rejected.
pub(crate) fn percentile(values: &[f32], q: f32) -> Result<f32> {
    if values.is_empty() {
        return Err(Error::InvalidParameter(
            "cannot take a percentile of an empty score array".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&q) {
        return Err(Error::InvalidParameter(format!(
            "percentile must be in [0, 100], got {q}"
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::InvalidParameter(
            "scores contain non-finite values".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);

    let rank = (q as f64 / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Ok(sorted[lo]);
    }
    let frac = (rank - lo as f64) as f32;
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
