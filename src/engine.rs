//! Engine facade: weather resolution, feature building, prediction, and the
//! configuration search behind two entry points.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use validator::Validate;

use crate::config::Config;
use crate::domain::{
    OptimizationRequest, OptimizationResult, PredictionRequest, PredictionResult, Timeframe,
    TimeSeriesPoint,
};
use crate::error::EngineError;
use crate::features::FeatureBuilder;
use crate::ml::predictor::PowerPredictor;
use crate::ml::store::FileModelStore;
use crate::ml::ModelMetadata;
use crate::optimizer::{ConfigOptimizer, OptimizerConfig};
use crate::weather::nasa_power::NasaPowerClient;
use crate::weather::openweather::OpenWeatherClient;
use crate::weather::{WeatherResolver, WeatherSource};

pub struct SolarEngine {
    resolver: WeatherResolver,
    predictor: Arc<PowerPredictor>,
    optimizer: ConfigOptimizer,
}

impl SolarEngine {
    pub fn new(
        resolver: WeatherResolver,
        predictor: Arc<PowerPredictor>,
        optimizer_config: OptimizerConfig,
    ) -> Self {
        let optimizer = ConfigOptimizer::new(predictor.clone(), optimizer_config);
        Self {
            resolver,
            predictor,
            optimizer,
        }
    }

    /// Assemble the full engine from configuration: live weather sources,
    /// file-backed model store, and a predictor loaded from disk or
    /// bootstrapped from the synthetic generator.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.weather.http_timeout_seconds);
        let sources: Vec<Arc<dyn WeatherSource>> = vec![
            Arc::new(OpenWeatherClient::new(
                config.weather.openweather_base_url.clone(),
                config.weather.openweather_api_key.clone(),
                timeout,
            )?),
            Arc::new(NasaPowerClient::new(
                config.weather.nasa_power_base_url.clone(),
                timeout,
            )?),
        ];
        let resolver = WeatherResolver::new(sources, timeout);

        let store = FileModelStore::new(config.model.path.clone());
        let predictor = Arc::new(PowerPredictor::load_or_bootstrap(
            &store,
            config.model.model_config(),
            config.model.bootstrap_samples,
            config.model.bootstrap_seed,
        )?);

        Ok(Self::new(resolver, predictor, config.optimizer.clone()))
    }

    pub fn predictor(&self) -> &Arc<PowerPredictor> {
        &self.predictor
    }

    pub fn model_info(&self) -> ModelMetadata {
        self.predictor.info()
    }

    /// Predict output for one location/panel/timeframe.
    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, EngineError> {
        request
            .location
            .validate()
            .map_err(EngineError::from_validation)?;
        request
            .panel
            .validate()
            .map_err(EngineError::from_validation)?;

        let reference = noon_utc(request.date);
        let weather = self.resolver.resolve(&request.location, reference).await;
        debug!(source = %weather.source, "weather resolved for prediction");

        let vector =
            FeatureBuilder::build(&request.location, &request.panel, &weather, request.date)?;
        let prediction = self.predictor.predict(&vector)?;

        let total_kwh = prediction.value * request.timeframe.day_multiplier();
        let time_series = breakdown(request.date, request.timeframe, total_kwh);

        Ok(PredictionResult {
            predicted_output_kwh: total_kwh,
            confidence_score: prediction.confidence,
            timeframe: request.timeframe,
            weather,
            time_series,
            generated_at: Utc::now(),
        })
    }

    /// Search for the output-maximizing tilt/azimuth for the request's panel
    /// hardware.
    pub async fn optimize(
        &self,
        request: &OptimizationRequest,
        cancel: Option<CancellationToken>,
    ) -> Result<OptimizationResult, EngineError> {
        request
            .location
            .validate()
            .map_err(EngineError::from_validation)?;
        request
            .panel
            .validate()
            .map_err(EngineError::from_validation)?;
        if let Some(current) = &request.current {
            current.validate().map_err(EngineError::from_validation)?;
        }

        let reference = noon_utc(request.date);
        let weather = self.resolver.resolve(&request.location, reference).await;

        self.optimizer
            .optimize(
                &request.location,
                &request.panel,
                &weather,
                request.date,
                request.current.as_ref(),
                cancel,
            )
            .await
    }
}

fn noon_utc(date: NaiveDate) -> chrono::DateTime<Utc> {
    date.and_hms_opt(12, 0, 0)
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN))
        .and_utc()
}

/// Split a predicted total into ordered per-period entries that sum back to
/// the total.
///
/// Daily predictions break into 24 hourly entries following a bell curve over
/// daylight hours; weekly into 7 daily entries; monthly into 4 weekly entries.
/// The mild within-week variation is deterministic.
fn breakdown(date: NaiveDate, timeframe: Timeframe, total_kwh: f64) -> Vec<TimeSeriesPoint> {
    let (weights, timestamps): (Vec<f64>, Vec<chrono::DateTime<Utc>>) = match timeframe {
        Timeframe::Daily => (0..24)
            .map(|hour| {
                let weight = if (6..=18).contains(&hour) {
                    let offset = (hour as f64 - 12.0) / 6.0;
                    1.0 - offset * offset * 0.8
                } else {
                    0.0
                };
                let timestamp = date
                    .and_hms_opt(hour, 0, 0)
                    .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN))
                    .and_utc();
                (weight, timestamp)
            })
            .unzip(),
        Timeframe::Weekly => (0..7)
            .map(|day| {
                let weight = 1.0 + 0.05 * (2.0 * PI * day as f64 / 7.0).sin();
                let timestamp = (date + chrono::Duration::days(day)).and_time(chrono::NaiveTime::MIN).and_utc();
                (weight, timestamp)
            })
            .unzip(),
        Timeframe::Monthly => (0..4)
            .map(|week| {
                let weight = 1.0 + 0.05 * (2.0 * PI * week as f64 / 4.0).sin();
                let timestamp = (date + chrono::Duration::weeks(week)).and_time(chrono::NaiveTime::MIN).and_utc();
                (weight, timestamp)
            })
            .unzip(),
    };

    let weight_sum: f64 = weights.iter().sum();
    if weight_sum <= 0.0 {
        return Vec::new();
    }

    weights
        .into_iter()
        .zip(timestamps)
        .map(|(weight, timestamp)| TimeSeriesPoint {
            timestamp,
            output_kwh: total_kwh * weight / weight_sum,
        })
        .collect()
}
