use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::ml::predictor::ModelConfig;
use crate::optimizer::OptimizerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub weather: WeatherConfig,
    pub model: ModelSettings,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub openweather_base_url: String,
    #[serde(default)]
    pub openweather_api_key: String,
    pub nasa_power_base_url: String,
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    /// Where the active model is persisted.
    pub path: String,
    /// Generator size/seed used when no persisted model exists.
    pub bootstrap_samples: usize,
    pub bootstrap_seed: u64,
    pub min_training_samples: usize,
    pub ensemble_size: usize,
    pub holdout_ratio: f64,
    pub regression_tolerance: f64,
}

impl ModelSettings {
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            min_training_samples: self.min_training_samples,
            ensemble_size: self.ensemble_size,
            holdout_ratio: self.holdout_ratio,
            regression_tolerance: self.regression_tolerance,
            training_seed: self.bootstrap_seed,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("SOLARCAST__").split("__"));
        Ok(figment.extract()?)
    }
}
