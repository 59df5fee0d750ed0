//! Labeled datasets and the synthetic training data generator.

use chrono::NaiveDate;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::FeatureVector;
use crate::domain::{Location, PanelConfiguration, WeatherProvenance, WeatherSnapshot};
use crate::error::EngineError;
use crate::features::FeatureBuilder;

/// Labeled (features, output) pairs for fitting and evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingDataset {
    pub features: Vec<FeatureVector>,
    pub targets: Vec<f64>,
}

impl TrainingDataset {
    pub fn new(features: Vec<FeatureVector>, targets: Vec<f64>) -> Result<Self, EngineError> {
        if features.len() != targets.len() {
            return Err(EngineError::Training(format!(
                "feature and target count mismatch: {} features, {} targets",
                features.len(),
                targets.len()
            )));
        }
        Ok(Self { features, targets })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Split into training and holdout sets by ratio.
    pub fn split(&self, train_ratio: f64) -> Result<(TrainingDataset, TrainingDataset), EngineError> {
        if train_ratio <= 0.0 || train_ratio >= 1.0 {
            return Err(EngineError::Training(
                "train ratio must be between 0 and 1".to_string(),
            ));
        }

        let split_idx = (self.len() as f64 * train_ratio).floor() as usize;
        let train = TrainingDataset {
            features: self.features[..split_idx].to_vec(),
            targets: self.targets[..split_idx].to_vec(),
        };
        let holdout = TrainingDataset {
            features: self.features[split_idx..].to_vec(),
            targets: self.targets[split_idx..].to_vec(),
        };
        Ok((train, holdout))
    }
}

/// Relative noise injected into generated labels; bounded so the fit never
/// degenerates to zero error but stays close to the physical relationship.
const NOISE_SIGMA: f64 = 0.07;
const NOISE_BOUND: f64 = 0.10;

/// Reference temperature where panels perform best, °C.
const OPTIMAL_TEMPERATURE_C: f64 = 25.0;

/// Produces a synthetic labeled dataset encoding approximate solar-physics
/// relationships: output scales with effective irradiance, surface area, and
/// efficiency, attenuated by cloud cover and temperature away from optimum.
///
/// This is a stand-in for real production telemetry and must never be
/// presented to a consumer as ground truth.
pub struct TrainingDataGenerator;

impl TrainingDataGenerator {
    /// Deterministic for a given seed.
    pub fn generate(sample_count: usize, seed: u64) -> Result<TrainingDataset, EngineError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, NOISE_SIGMA)
            .map_err(|e| EngineError::Training(format!("invalid noise distribution: {e}")))?;

        let mut features = Vec::with_capacity(sample_count);
        let mut targets = Vec::with_capacity(sample_count);

        for _ in 0..sample_count {
            let location = Location::new(
                rng.gen_range(-60.0..60.0),
                rng.gen_range(-180.0..180.0),
            );
            let panel = PanelConfiguration::new(
                rng.gen_range(10.0..100.0),
                rng.gen_range(0.0..90.0),
                rng.gen_range(0.0..360.0),
                rng.gen_range(0.15..0.25),
            );
            let weather = WeatherSnapshot {
                solar_irradiance: rng.gen_range(2.0..8.0),
                temperature_c: rng.gen_range(-10.0..45.0),
                humidity_percent: rng.gen_range(20.0..90.0),
                wind_speed_ms: rng.gen_range(0.0..20.0),
                cloud_cover_percent: rng.gen_range(0.0..100.0),
                source: WeatherProvenance::Synthetic,
            };
            let day_of_year: u32 = rng.gen_range(1..=365);
            let date = NaiveDate::from_yo_opt(2024, day_of_year)
                .ok_or_else(|| EngineError::Training("invalid generated date".to_string()))?;

            let vector = FeatureBuilder::build(&location, &panel, &weather, date)?;
            let effective_irradiance = vector.features[6];

            let temperature_factor =
                1.0 - (weather.temperature_c - OPTIMAL_TEMPERATURE_C).abs() / 100.0;
            let cloud_factor = (100.0 - weather.cloud_cover_percent) / 100.0;

            // Daily energy: effective irradiance (kWh/m²/day) over the panel
            // area at the given efficiency, derated by temperature and cloud.
            let base_output = effective_irradiance
                * panel.surface_area_m2
                * panel.panel_efficiency
                * temperature_factor
                * cloud_factor;

            let relative_noise = noise.sample(&mut rng).clamp(-NOISE_BOUND, NOISE_BOUND);
            let output = (base_output * (1.0 + relative_noise)).max(0.0);

            features.push(vector);
            targets.push(output);
        }

        TrainingDataset::new(features, targets)
    }
}
