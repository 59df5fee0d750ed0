//! End-to-end engine scenarios with live weather disabled.

use std::sync::{Arc, OnceLock};

use chrono::NaiveDate;
use solarcast::domain::{
    Location, OptimizationRequest, PanelConfiguration, PredictionRequest, Timeframe,
    WeatherProvenance, WeatherSnapshot,
};
use solarcast::engine::SolarEngine;
use solarcast::features::FeatureBuilder;
use solarcast::ml::predictor::{ModelConfig, PowerPredictor};
use solarcast::optimizer::OptimizerConfig;
use solarcast::weather::WeatherResolver;

fn shared_predictor() -> Arc<PowerPredictor> {
    static PREDICTOR: OnceLock<Arc<PowerPredictor>> = OnceLock::new();
    PREDICTOR
        .get_or_init(|| {
            let config = ModelConfig {
                ensemble_size: 3,
                ..ModelConfig::default()
            };
            Arc::new(PowerPredictor::bootstrap(config, 500, 42).unwrap())
        })
        .clone()
}

fn engine() -> SolarEngine {
    let optimizer = OptimizerConfig {
        tilt_step_deg: 10.0,
        azimuth_step_deg: 20.0,
        ..OptimizerConfig::default()
    };
    SolarEngine::new(WeatherResolver::synthetic_only(), shared_predictor(), optimizer)
}

fn san_francisco() -> Location {
    Location::named(37.7749, -122.4194, "San Francisco")
}

fn panel() -> PanelConfiguration {
    PanelConfiguration::new(50.0, 30.0, 180.0, 0.2)
}

fn aug_7() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()
}

#[tokio::test]
async fn daily_prediction_is_positive_with_bounded_confidence() {
    let request = PredictionRequest {
        location: san_francisco(),
        panel: panel(),
        timeframe: Timeframe::Daily,
        date: aug_7(),
    };
    let result = engine().predict(&request).await.unwrap();

    assert!(result.predicted_output_kwh > 0.0);
    assert!((0.0..=1.0).contains(&result.confidence_score));
    assert_eq!(result.weather.source, WeatherProvenance::Synthetic);

    // Hourly breakdown: ascending timestamps, sums back to the total.
    assert_eq!(result.time_series.len(), 24);
    for pair in result.time_series.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }
    let sum: f64 = result.time_series.iter().map(|p| p.output_kwh).sum();
    assert!((sum - result.predicted_output_kwh).abs() < 1e-9);
}

#[tokio::test]
async fn weekly_prediction_scales_the_daily_output() {
    let engine = engine();
    let daily = engine
        .predict(&PredictionRequest {
            location: san_francisco(),
            panel: panel(),
            timeframe: Timeframe::Daily,
            date: aug_7(),
        })
        .await
        .unwrap();
    let weekly = engine
        .predict(&PredictionRequest {
            location: san_francisco(),
            panel: panel(),
            timeframe: Timeframe::Weekly,
            date: aug_7(),
        })
        .await
        .unwrap();

    assert_eq!(weekly.time_series.len(), 7);
    assert!((weekly.predicted_output_kwh - daily.predicted_output_kwh * 7.0).abs() < 1e-9);
}

#[tokio::test]
async fn invalid_panel_is_rejected_with_field_name() {
    let request = PredictionRequest {
        location: san_francisco(),
        panel: PanelConfiguration::new(50.0, 30.0, 180.0, 0.0),
        timeframe: Timeframe::Daily,
        date: aug_7(),
    };
    let err = engine().predict(&request).await.unwrap_err();
    assert!(err.to_string().contains("panel_efficiency"), "got: {err}");
}

#[test]
fn forced_weather_prediction_tracks_the_physical_inputs() {
    // SF, 50 m² at 20% efficiency, tilt 30 / azimuth 180, irradiance
    // 5.5 kWh/m²/day with 10% cloud cover.
    let weather = WeatherSnapshot {
        solar_irradiance: 5.5,
        temperature_c: 20.0,
        humidity_percent: 50.0,
        wind_speed_ms: 3.0,
        cloud_cover_percent: 10.0,
        source: WeatherProvenance::Synthetic,
    };
    let vector = FeatureBuilder::build(&san_francisco(), &panel(), &weather, aug_7()).unwrap();
    let prediction = shared_predictor().predict(&vector).unwrap();

    assert!(prediction.value > 0.0);
    assert!((0.0..=1.0).contains(&prediction.confidence));

    // The output stays below the plate limit implied by irradiance × area ×
    // efficiency and the incidence correction already folded into the vector.
    let effective_irradiance = vector.features[6];
    assert!(effective_irradiance > 0.0 && effective_irradiance <= 5.5);
    let ceiling = effective_irradiance * 50.0 * 0.2 * 1.2;
    assert!(
        prediction.value <= ceiling,
        "prediction {} above plate ceiling {}",
        prediction.value,
        ceiling
    );
}

#[tokio::test]
async fn optimizer_beats_or_matches_the_installed_configuration() {
    let request = OptimizationRequest {
        location: san_francisco(),
        panel: panel(),
        date: aug_7(),
        current: Some(panel().with_angles(25.0, 170.0)),
    };
    let result = engine().optimize(&request, None).await.unwrap();

    let baseline = result.baseline_output_kwh.unwrap();
    assert!(result.optimal_output_kwh >= baseline);
    assert!(result.improvement_percent.unwrap() >= 0.0);
    assert!(result.candidates_evaluated > 0);
    assert!((0.0..=90.0).contains(&result.optimal_tilt_deg));
    assert!((0.0..360.0).contains(&result.optimal_azimuth_deg));
}

#[tokio::test]
async fn optimization_without_baseline_reports_no_improvement() {
    let request = OptimizationRequest {
        location: san_francisco(),
        panel: panel(),
        date: aug_7(),
        current: None,
    };
    let result = engine().optimize(&request, None).await.unwrap();

    assert!(result.baseline_output_kwh.is_none());
    assert!(result.improvement_percent.is_none());
}

#[tokio::test]
async fn retrained_model_serves_subsequent_predictions() {
    // Dedicated engine: retraining swaps shared state, so the shared fixture
    // stays out of this one.
    let config = ModelConfig {
        ensemble_size: 2,
        ..ModelConfig::default()
    };
    let predictor = Arc::new(PowerPredictor::bootstrap(config, 300, 7).unwrap());
    let engine = SolarEngine::new(
        WeatherResolver::synthetic_only(),
        predictor,
        OptimizerConfig::default(),
    );
    let before = engine.model_info();

    let dataset =
        solarcast::ml::dataset::TrainingDataGenerator::generate(800, 1234).unwrap();
    let metadata = engine.predictor().retrain(&dataset, false).unwrap();
    assert_ne!(metadata.model_id, before.model_id);
    assert_eq!(engine.model_info().model_id, metadata.model_id);

    let result = engine
        .predict(&PredictionRequest {
            location: san_francisco(),
            panel: panel(),
            timeframe: Timeframe::Daily,
            date: aug_7(),
        })
        .await
        .unwrap();
    assert!(result.predicted_output_kwh > 0.0);
}
