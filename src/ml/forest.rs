//! Random-forest ensemble on top of smartcore.
//!
//! Several forests are fitted with distinct seeds; their spread at prediction
//! time feeds the confidence score. Conservative tree parameters keep the fit
//! fast and the serialized model small.

use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::EngineError;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ForestEnsemble {
    members: Vec<Forest>,
}

impl ForestEnsemble {
    /// Fit `member_count` forests on the same data with different seeds.
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[f64],
        member_count: usize,
        base_seed: u64,
    ) -> Result<Self, EngineError> {
        if rows.is_empty() || targets.is_empty() {
            return Err(EngineError::Training(
                "cannot train on an empty dataset".to_string(),
            ));
        }
        if rows.len() != targets.len() {
            return Err(EngineError::Training(format!(
                "feature and target count mismatch: {} rows, {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if member_count == 0 {
            return Err(EngineError::Training(
                "ensemble needs at least one member".to_string(),
            ));
        }

        let n_features = rows[0].len();
        let mut flat = Vec::with_capacity(rows.len() * n_features);
        for row in rows {
            if row.len() != n_features {
                return Err(EngineError::Training(
                    "all feature vectors must have the same length".to_string(),
                ));
            }
            flat.extend_from_slice(row);
        }

        let x = DenseMatrix::new(rows.len(), n_features, flat, false);
        let y = targets.to_vec();

        let members = (0..member_count)
            .map(|i| {
                // 40 trees capped at depth 12 keeps each member fast to fit
                // and small to persist; keep_samples off saves memory.
                let params = RandomForestRegressorParameters {
                    max_depth: Some(12),
                    min_samples_leaf: 2,
                    min_samples_split: 4,
                    n_trees: 40,
                    m: None,
                    keep_samples: false,
                    seed: base_seed.wrapping_add(i as u64),
                };
                RandomForestRegressor::fit(&x, &y, params)
                    .map_err(|e| EngineError::Training(format!("random forest fit failed: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { members })
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Mean and standard deviation of the member predictions for one row.
    pub fn predict_stats(&self, features: &[f64]) -> Result<(f64, f64), EngineError> {
        let x = DenseMatrix::new(1, features.len(), features.to_vec(), false);

        let mut values = Vec::with_capacity(self.members.len());
        for member in &self.members {
            let predictions = member
                .predict(&x)
                .map_err(|e| EngineError::Prediction(format!("forest prediction failed: {e}")))?;
            let value = predictions
                .first()
                .copied()
                .ok_or_else(|| EngineError::Prediction("forest returned no prediction".to_string()))?;
            values.push(value);
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Ok((mean, variance.sqrt()))
    }
}
