//! Model persistence.
//!
//! The engine only requires that load/save round-trip the full parameter set
//! and metadata losslessly; where models live is the collaborator's choice.

use std::fs;
use std::path::PathBuf;
use tracing::info;

use super::predictor::TrainedModel;
use crate::error::EngineError;

pub trait ModelStore: Send + Sync {
    /// `Ok(None)` when no model has been persisted yet.
    fn load(&self) -> Result<Option<TrainedModel>, EngineError>;
    fn save(&self, model: &TrainedModel) -> Result<(), EngineError>;
}

/// Bincode file store.
pub struct FileModelStore {
    path: PathBuf,
}

impl FileModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModelStore for FileModelStore {
    fn load(&self) -> Result<Option<TrainedModel>, EngineError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)
            .map_err(|e| EngineError::Persistence(format!("read {:?}: {e}", self.path)))?;
        let model: TrainedModel = bincode::deserialize(&bytes)
            .map_err(|e| EngineError::Prediction(format!("persisted model is corrupt: {e}")))?;
        Ok(Some(model))
    }

    fn save(&self, model: &TrainedModel) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| EngineError::Persistence(format!("create {parent:?}: {e}")))?;
        }
        let bytes = bincode::serialize(model)
            .map_err(|e| EngineError::Persistence(format!("serialize model: {e}")))?;
        fs::write(&self.path, bytes)
            .map_err(|e| EngineError::Persistence(format!("write {:?}: {e}", self.path)))?;
        info!(path = ?self.path, model_id = %model.metadata.model_id, "model persisted");
        Ok(())
    }
}
