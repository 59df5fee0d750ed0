//! The power predictor: an immutably-versioned trained model behind a
//! copy-on-write reference, with guarded retraining.

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::dataset::{TrainingDataGenerator, TrainingDataset};
use super::forest::ForestEnsemble;
use super::store::ModelStore;
use super::{
    feature_names, FeatureScaler, FeatureVector, ModelMetadata, ModelType, Prediction,
    ValidationMetrics,
};
use crate::error::EngineError;

/// Minimum dataset size accepted by `retrain` without `force`.
pub const MIN_TRAINING_SAMPLES: usize = 100;

/// Weight of the out-of-distribution penalty: confidence is scaled down by
/// this factor times the fraction of features outside the observed training
/// range.
const OOD_PENALTY_WEIGHT: f64 = 0.5;

/// Tunables for fitting and the retraining guards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub min_training_samples: usize,
    pub ensemble_size: usize,
    /// Fraction of the dataset used for fitting; the rest is held out for
    /// evaluation.
    pub holdout_ratio: f64,
    /// A candidate model may exceed the active model's holdout MAE by at most
    /// this relative tolerance before being rejected.
    pub regression_tolerance: f64,
    pub training_seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            min_training_samples: MIN_TRAINING_SAMPLES,
            ensemble_size: 5,
            holdout_ratio: 0.8,
            regression_tolerance: 0.10,
            training_seed: 42,
        }
    }
}

/// A fully fitted model: ensemble, scaler, observed feature bounds, and
/// metadata. Never mutated after construction; retraining builds a new one.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainedModel {
    pub metadata: ModelMetadata,
    scaler: FeatureScaler,
    feature_mins: Vec<f64>,
    feature_maxs: Vec<f64>,
    ensemble: ForestEnsemble,
}

impl TrainedModel {
    /// Fit a model on the dataset: split, standardize on the training part,
    /// fit the ensemble, evaluate on the holdout.
    pub fn fit(dataset: &TrainingDataset, config: &ModelConfig) -> Result<Self, EngineError> {
        if dataset.len() < 2 {
            return Err(EngineError::Training(
                "dataset too small to split for holdout evaluation".to_string(),
            ));
        }

        let (train, holdout) = dataset.split(config.holdout_ratio)?;
        let train_rows: Vec<Vec<f64>> =
            train.features.iter().map(|f| f.features.clone()).collect();

        let scaler = FeatureScaler::fit(&train_rows)?;

        let n_features = train_rows[0].len();
        let mut feature_mins = vec![f64::INFINITY; n_features];
        let mut feature_maxs = vec![f64::NEG_INFINITY; n_features];
        for row in &train_rows {
            for (i, v) in row.iter().enumerate() {
                feature_mins[i] = feature_mins[i].min(*v);
                feature_maxs[i] = feature_maxs[i].max(*v);
            }
        }

        let scaled_rows: Vec<Vec<f64>> =
            train_rows.iter().map(|r| scaler.transform(r)).collect();
        let ensemble = ForestEnsemble::fit(
            &scaled_rows,
            &train.targets,
            config.ensemble_size,
            config.training_seed,
        )?;

        let holdout_predictions = holdout
            .features
            .iter()
            .map(|f| {
                ensemble
                    .predict_stats(&scaler.transform(&f.features))
                    .map(|(mean, _)| mean.max(0.0))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let validation_metrics =
            ValidationMetrics::from_predictions(&holdout_predictions, &holdout.targets)?;

        let metadata = ModelMetadata {
            model_id: format!("solar_rf_{}", Uuid::new_v4()),
            model_type: ModelType::RandomForestEnsemble,
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: Utc::now(),
            training_samples: dataset.len(),
            validation_metrics,
            feature_names: feature_names(),
        };

        Ok(Self {
            metadata,
            scaler,
            feature_mins,
            feature_maxs,
            ensemble,
        })
    }

    /// Predict output with a confidence score in [0, 1].
    ///
    /// Confidence is the ensemble agreement (1 − σ/μ over member predictions)
    /// scaled down when features fall outside the training data's observed
    /// range.
    pub fn predict(&self, vector: &FeatureVector) -> Result<Prediction, EngineError> {
        if vector.len() != self.metadata.feature_names.len() {
            return Err(EngineError::Prediction(format!(
                "feature count mismatch: model expects {}, got {}",
                self.metadata.feature_names.len(),
                vector.len()
            )));
        }

        let out_of_range = vector
            .features
            .iter()
            .zip(self.feature_mins.iter().zip(self.feature_maxs.iter()))
            .filter(|(v, (min, max))| *v < min || *v > max)
            .count();
        let ood_fraction = out_of_range as f64 / vector.len() as f64;

        let scaled = self.scaler.transform(&vector.features);
        let (mean, std) = self.ensemble.predict_stats(&scaled)?;

        let value = mean.max(0.0);
        let agreement = if mean.abs() < 1e-9 {
            0.0
        } else {
            (1.0 - std / mean.abs()).clamp(0.0, 1.0)
        };
        let confidence =
            (agreement * (1.0 - OOD_PENALTY_WEIGHT * ood_fraction)).clamp(0.0, 1.0);

        Ok(Prediction::with_bounds(
            value,
            confidence,
            (value - std).max(0.0),
            value + std,
        ))
    }
}

/// Thread-safe predictor holding the active model.
///
/// Readers take a cheap `Arc` snapshot; a successful retrain atomically swaps
/// the reference, so no reader ever observes a partially-updated model.
pub struct PowerPredictor {
    active: RwLock<Arc<TrainedModel>>,
    config: ModelConfig,
}

impl PowerPredictor {
    pub fn new(model: TrainedModel, config: ModelConfig) -> Self {
        Self {
            active: RwLock::new(Arc::new(model)),
            config,
        }
    }

    /// Train an initial model from the synthetic generator.
    pub fn bootstrap(
        config: ModelConfig,
        sample_count: usize,
        seed: u64,
    ) -> Result<Self, EngineError> {
        info!(sample_count, seed, "bootstrapping predictor from generated dataset");
        let dataset = TrainingDataGenerator::generate(sample_count, seed)?;
        let model = TrainedModel::fit(&dataset, &config)?;
        Ok(Self::new(model, config))
    }

    /// Load the persisted model, or bootstrap and persist a fresh one when
    /// the store is empty or the stored feature order no longer matches.
    pub fn load_or_bootstrap(
        store: &dyn ModelStore,
        config: ModelConfig,
        sample_count: usize,
        seed: u64,
    ) -> Result<Self, EngineError> {
        match store.load()? {
            Some(model) if model.metadata.feature_names == feature_names() => {
                info!(model_id = %model.metadata.model_id, "loaded persisted model");
                Ok(Self::new(model, config))
            }
            Some(model) => {
                warn!(
                    model_id = %model.metadata.model_id,
                    "persisted model feature order is incompatible, retraining"
                );
                let predictor = Self::bootstrap(config, sample_count, seed)?;
                store.save(&predictor.active_model())?;
                Ok(predictor)
            }
            None => {
                let predictor = Self::bootstrap(config, sample_count, seed)?;
                store.save(&predictor.active_model())?;
                Ok(predictor)
            }
        }
    }

    /// Snapshot of the active model for a batch of predictions.
    pub fn active_model(&self) -> Arc<TrainedModel> {
        self.active.read().clone()
    }

    pub fn predict(&self, vector: &FeatureVector) -> Result<Prediction, EngineError> {
        self.active_model().predict(vector)
    }

    /// Metadata of the active model.
    pub fn info(&self) -> ModelMetadata {
        self.active.read().metadata.clone()
    }

    /// Fit a candidate on `dataset` and swap it in if it holds up.
    ///
    /// Fails with `InsufficientData` below the minimum sample count (unless
    /// `force`), `Training` when the fit itself fails, and
    /// `AccuracyRegression` when the candidate's holdout MAE exceeds the
    /// active model's by more than the configured tolerance. On any failure
    /// the previously active model stays in place.
    pub fn retrain(
        &self,
        dataset: &TrainingDataset,
        force: bool,
    ) -> Result<ModelMetadata, EngineError> {
        if dataset.len() < self.config.min_training_samples && !force {
            return Err(EngineError::InsufficientData {
                actual: dataset.len(),
                required: self.config.min_training_samples,
            });
        }

        let candidate = TrainedModel::fit(dataset, &self.config)?;

        let active_mae = self.active.read().metadata.validation_metrics.mae;
        let candidate_mae = candidate.metadata.validation_metrics.mae;
        let limit = active_mae * (1.0 + self.config.regression_tolerance);
        if candidate_mae > limit {
            warn!(
                candidate_mae,
                active_mae, "rejecting retrained model: holdout error regressed"
            );
            return Err(EngineError::AccuracyRegression {
                candidate_mae,
                active_mae,
                tolerance_pct: self.config.regression_tolerance * 100.0,
            });
        }

        let metadata = candidate.metadata.clone();
        *self.active.write() = Arc::new(candidate);
        info!(
            model_id = %metadata.model_id,
            samples = metadata.training_samples,
            mae = metadata.validation_metrics.mae,
            "activated retrained model"
        );
        Ok(metadata)
    }
}
