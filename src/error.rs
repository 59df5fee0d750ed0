use thiserror::Error;

/// Errors surfaced by the prediction and optimization engine.
///
/// Weather source failures are deliberately absent: the resolver absorbs them
/// via its fallback chain and they never reach callers (they are still logged).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed for `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("insufficient training data: {actual} samples, minimum {required}")]
    InsufficientData { actual: usize, required: usize },

    #[error("model training failed: {0}")]
    Training(String),

    #[error(
        "accuracy regression: candidate holdout MAE {candidate_mae:.3} exceeds \
         active model MAE {active_mae:.3} by more than {tolerance_pct:.0}%"
    )]
    AccuracyRegression {
        candidate_mae: f64,
        active_mae: f64,
        tolerance_pct: f64,
    },

    #[error("prediction failed: {0}")]
    Prediction(String),

    #[error("model persistence failed: {0}")]
    Persistence(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Collapse a `validator` error set into the engine taxonomy, naming the
    /// first offending field.
    pub fn from_validation(errors: validator::ValidationErrors) -> Self {
        for (field, field_errors) in errors.field_errors() {
            if let Some(e) = field_errors.first() {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed `{}` constraint", e.code));
                return Self::Validation {
                    field: field.to_string(),
                    message,
                };
            }
        }
        Self::Validation {
            field: "unknown".to_string(),
            message: "validation failed".to_string(),
        }
    }
}
