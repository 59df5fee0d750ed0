//! Regression machinery for power prediction.
//!
//! The feature order in [`FEATURE_NAMES`] is a contract shared between the
//! builder, the training data generator, and every trained model: a model
//! fitted against one order cannot score vectors built in another.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub mod dataset;
pub mod forest;
pub mod predictor;
pub mod store;

/// Fixed feature order consumed by the predictor.
pub const FEATURE_NAMES: [&str; 11] = [
    "latitude",
    "longitude",
    "surface_area_m2",
    "tilt_angle_deg",
    "azimuth_angle_deg",
    "panel_efficiency",
    "effective_irradiance",
    "temperature_c",
    "humidity_percent",
    "wind_speed_ms",
    "cloud_cover_percent",
];

pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
}

/// Model family recorded in metadata.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModelType {
    RandomForestEnsemble,
    LinearRegression,
}

/// Fixed-order numeric feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl FeatureVector {
    pub fn new(features: Vec<f64>, feature_names: Vec<String>) -> Result<Self, EngineError> {
        if features.len() != feature_names.len() {
            return Err(EngineError::Prediction(format!(
                "feature count mismatch: {} features, {} names",
                features.len(),
                feature_names.len()
            )));
        }
        Ok(Self {
            features,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Per-feature z-score standardization parameters, fitted on the training set
/// and persisted alongside the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl FeatureScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, EngineError> {
        let n_features = rows
            .first()
            .ok_or_else(|| EngineError::Training("cannot fit scaler on empty data".to_string()))?
            .len();
        let n = rows.len() as f64;

        let mut means = vec![0.0; n_features];
        for row in rows {
            for (i, v) in row.iter().enumerate() {
                means[i] += v / n;
            }
        }

        let mut stds = vec![0.0; n_features];
        for row in rows {
            for (i, v) in row.iter().enumerate() {
                stds[i] += (v - means[i]).powi(2) / n;
            }
        }
        for s in &mut stds {
            *s = s.sqrt();
        }

        Ok(Self { means, stds })
    }

    pub fn transform(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(f, (mean, std))| {
                if std.abs() < 1e-10 {
                    0.0
                } else {
                    (f - mean) / std
                }
            })
            .collect()
    }
}

/// Holdout evaluation metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub mape: f64,
    pub r2: f64,
}

impl ValidationMetrics {
    pub fn from_predictions(predictions: &[f64], targets: &[f64]) -> Result<Self, EngineError> {
        if predictions.len() != targets.len() {
            return Err(EngineError::Training(
                "prediction and target count mismatch".to_string(),
            ));
        }
        if predictions.is_empty() {
            return Err(EngineError::Training("no predictions to evaluate".to_string()));
        }

        let n = predictions.len() as f64;

        let mae: f64 = predictions
            .iter()
            .zip(targets.iter())
            .map(|(p, t)| (p - t).abs())
            .sum::<f64>()
            / n;

        let mse: f64 = predictions
            .iter()
            .zip(targets.iter())
            .map(|(p, t)| (p - t).powi(2))
            .sum::<f64>()
            / n;
        let rmse = mse.sqrt();

        let mape: f64 = predictions
            .iter()
            .zip(targets.iter())
            .filter(|(_, t)| t.abs() > 1e-10)
            .map(|(p, t)| ((p - t) / t).abs() * 100.0)
            .sum::<f64>()
            / n;

        let mean_target: f64 = targets.iter().sum::<f64>() / n;
        let ss_tot: f64 = targets.iter().map(|t| (t - mean_target).powi(2)).sum();
        let ss_res: f64 = predictions
            .iter()
            .zip(targets.iter())
            .map(|(p, t)| (t - p).powi(2))
            .sum();
        let r2 = if ss_tot.abs() < 1e-10 {
            0.0
        } else {
            1.0 - (ss_res / ss_tot)
        };

        Ok(Self { mae, rmse, mape, r2 })
    }
}

/// Metadata of a trained model, exposed via `PowerPredictor::info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    pub model_type: ModelType,
    pub version: String,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub training_samples: usize,
    pub validation_metrics: ValidationMetrics,
    pub feature_names: Vec<String>,
}

/// A single prediction with its reliability estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub value: f64,
    /// Normalized to [0, 1]; lower for out-of-distribution inputs.
    pub confidence: f64,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
}

impl Prediction {
    pub fn with_confidence(value: f64, confidence: f64) -> Self {
        Self {
            value,
            confidence,
            lower_bound: None,
            upper_bound: None,
        }
    }

    pub fn with_bounds(value: f64, confidence: f64, lower: f64, upper: f64) -> Self {
        Self {
            value,
            confidence,
            lower_bound: Some(lower),
            upper_bound: Some(upper),
        }
    }
}
