//! Grid search over the tilt/azimuth space.
//!
//! Candidates are generated in ascending (tilt, azimuth) order, evaluated by
//! a bounded pool of blocking workers against one model snapshot, and reduced
//! with a tie-break applied to the full candidate set, so the result is
//! deterministic regardless of completion order.

use chrono::NaiveDate;
use futures::future::join_all;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{Location, OptimizationResult, PanelConfiguration, WeatherSnapshot};
use crate::error::EngineError;
use crate::features::FeatureBuilder;
use crate::ml::predictor::PowerPredictor;

/// Search tunables. Coarser steps trade accuracy for speed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub tilt_step_deg: f64,
    pub azimuth_step_deg: f64,
    /// Bounded worker count for parallel candidate evaluation.
    pub worker_count: usize,
    /// Candidates within this margin of the maximum count as tied.
    pub tie_epsilon_kwh: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            tilt_step_deg: 5.0,
            azimuth_step_deg: 5.0,
            worker_count: 4,
            tie_epsilon_kwh: 1e-3,
        }
    }
}

/// One (tilt, azimuth) pair of the search grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub tilt_deg: f64,
    pub azimuth_deg: f64,
}

#[derive(Debug, Clone, Copy)]
struct ScoredCandidate {
    tilt_deg: f64,
    azimuth_deg: f64,
    output_kwh: f64,
}

/// Candidates over tilt ∈ [0, 90] and azimuth ∈ [0, 360) in ascending
/// (tilt, azimuth) order.
pub fn candidate_grid(config: &OptimizerConfig) -> Vec<Candidate> {
    let mut tilts = Vec::new();
    let mut tilt: f64 = 0.0;
    while tilt <= 90.0 + 1e-9 {
        tilts.push(tilt.min(90.0));
        tilt += config.tilt_step_deg;
    }

    let mut azimuths = Vec::new();
    let mut azimuth = 0.0;
    while azimuth < 360.0 - 1e-9 {
        azimuths.push(azimuth);
        azimuth += config.azimuth_step_deg;
    }

    tilts
        .iter()
        .cartesian_product(azimuths.iter())
        .map(|(&tilt_deg, &azimuth_deg)| Candidate {
            tilt_deg,
            azimuth_deg,
        })
        .collect()
}

/// Euclidean distance in angle space, with the azimuth leg wrapped around
/// the compass.
fn angular_distance(a: &Candidate, tilt_deg: f64, azimuth_deg: f64) -> f64 {
    let tilt_delta = a.tilt_deg - tilt_deg;
    let raw = (a.azimuth_deg - azimuth_deg).abs() % 360.0;
    let azimuth_delta = raw.min(360.0 - raw);
    (tilt_delta * tilt_delta + azimuth_delta * azimuth_delta).sqrt()
}

pub struct ConfigOptimizer {
    predictor: Arc<PowerPredictor>,
    config: OptimizerConfig,
}

impl ConfigOptimizer {
    pub fn new(predictor: Arc<PowerPredictor>, config: OptimizerConfig) -> Self {
        Self { predictor, config }
    }

    /// Find the output-maximizing configuration for the panel hardware under
    /// the given weather.
    ///
    /// When `current` is supplied the result never falls below it: if no grid
    /// candidate beats the current configuration, the current configuration is
    /// reported as optimal. The optional token cancels cooperatively between
    /// candidate evaluations.
    pub async fn optimize(
        &self,
        location: &Location,
        panel_base: &PanelConfiguration,
        weather: &WeatherSnapshot,
        date: NaiveDate,
        current: Option<&PanelConfiguration>,
        cancel: Option<CancellationToken>,
    ) -> Result<OptimizationResult, EngineError> {
        if self.config.tilt_step_deg <= 0.0 {
            return Err(EngineError::Validation {
                field: "tilt_step_deg".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.config.azimuth_step_deg <= 0.0 {
            return Err(EngineError::Validation {
                field: "azimuth_step_deg".to_string(),
                message: "must be positive".to_string(),
            });
        }

        let grid = candidate_grid(&self.config);
        let candidates_evaluated = grid.len();
        debug!(candidates = candidates_evaluated, "starting configuration search");

        // One immutable model snapshot for the whole scan: a concurrent
        // retrain must not change the model mid-search.
        let model = self.predictor.active_model();

        let workers = self.config.worker_count.max(1);
        let chunk_size = grid.len().div_ceil(workers).max(1);
        let handles: Vec<_> = grid
            .chunks(chunk_size)
            .map(|chunk| {
                let chunk = chunk.to_vec();
                let model = model.clone();
                let location = location.clone();
                let panel = panel_base.clone();
                let weather = weather.clone();
                let cancel = cancel.clone();
                tokio::task::spawn_blocking(move || {
                    let mut scores = Vec::with_capacity(chunk.len());
                    for candidate in chunk {
                        if cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                            return Err(EngineError::Cancelled);
                        }
                        let configured =
                            panel.with_angles(candidate.tilt_deg, candidate.azimuth_deg);
                        let vector =
                            FeatureBuilder::build(&location, &configured, &weather, date)?;
                        let prediction = model.predict(&vector)?;
                        scores.push(ScoredCandidate {
                            tilt_deg: candidate.tilt_deg,
                            azimuth_deg: candidate.azimuth_deg,
                            output_kwh: prediction.value,
                        });
                    }
                    Ok(scores)
                })
            })
            .collect();

        let mut scores = Vec::with_capacity(candidates_evaluated);
        for joined in join_all(handles).await {
            let chunk = joined
                .map_err(|e| EngineError::Prediction(format!("optimizer worker failed: {e}")))??;
            scores.extend(chunk);
        }

        let best_output = scores
            .iter()
            .map(|s| OrderedFloat(s.output_kwh))
            .max()
            .ok_or_else(|| EngineError::Prediction("empty candidate grid".to_string()))?
            .0;

        // Tie-break over the full candidate set: closest to the current
        // configuration when one is supplied, else first in ascending
        // (tilt, azimuth) order.
        let tied = scores
            .iter()
            .filter(|s| s.output_kwh >= best_output - self.config.tie_epsilon_kwh);
        let chosen = match current {
            Some(cur) => tied.min_by_key(|s| {
                let candidate = Candidate {
                    tilt_deg: s.tilt_deg,
                    azimuth_deg: s.azimuth_deg,
                };
                (
                    OrderedFloat(angular_distance(
                        &candidate,
                        cur.tilt_angle_deg,
                        cur.azimuth_angle_deg,
                    )),
                    OrderedFloat(s.tilt_deg),
                    OrderedFloat(s.azimuth_deg),
                )
            }),
            None => tied.min_by_key(|s| (OrderedFloat(s.tilt_deg), OrderedFloat(s.azimuth_deg))),
        }
        .copied()
        .ok_or_else(|| EngineError::Prediction("empty candidate grid".to_string()))?;

        let mut optimal = chosen;
        let mut baseline_output_kwh = None;
        if let Some(cur) = current {
            let configured = panel_base.with_angles(cur.tilt_angle_deg, cur.azimuth_angle_deg);
            let vector = FeatureBuilder::build(location, &configured, weather, date)?;
            let baseline = model.predict(&vector)?.value;
            baseline_output_kwh = Some(baseline);

            // The search must never recommend something worse than what is
            // already installed.
            if baseline > optimal.output_kwh {
                optimal = ScoredCandidate {
                    tilt_deg: cur.tilt_angle_deg,
                    azimuth_deg: cur.azimuth_angle_deg,
                    output_kwh: baseline,
                };
            }
        }

        let improvement_percent = baseline_output_kwh.and_then(|baseline| {
            if baseline > 0.0 {
                Some((optimal.output_kwh - baseline) / baseline * 100.0)
            } else {
                None
            }
        });

        info!(
            tilt = optimal.tilt_deg,
            azimuth = optimal.azimuth_deg,
            output_kwh = optimal.output_kwh,
            improvement = ?improvement_percent,
            "configuration search finished"
        );

        Ok(OptimizationResult {
            optimal_tilt_deg: optimal.tilt_deg,
            optimal_azimuth_deg: optimal.azimuth_deg,
            optimal_output_kwh: optimal.output_kwh,
            baseline_output_kwh,
            improvement_percent,
            candidates_evaluated,
            weather: weather.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WeatherProvenance;
    use crate::ml::predictor::ModelConfig;
    use std::sync::OnceLock;

    fn shared_predictor() -> Arc<PowerPredictor> {
        static PREDICTOR: OnceLock<Arc<PowerPredictor>> = OnceLock::new();
        PREDICTOR
            .get_or_init(|| {
                let config = ModelConfig {
                    ensemble_size: 3,
                    ..ModelConfig::default()
                };
                Arc::new(PowerPredictor::bootstrap(config, 400, 42).unwrap())
            })
            .clone()
    }

    fn coarse_config() -> OptimizerConfig {
        OptimizerConfig {
            tilt_step_deg: 15.0,
            azimuth_step_deg: 30.0,
            ..OptimizerConfig::default()
        }
    }

    fn scenario() -> (Location, PanelConfiguration, WeatherSnapshot, NaiveDate) {
        (
            Location::new(37.7749, -122.4194),
            PanelConfiguration::new(50.0, 30.0, 180.0, 0.2),
            WeatherSnapshot {
                solar_irradiance: 5.5,
                temperature_c: 20.0,
                humidity_percent: 50.0,
                wind_speed_ms: 3.0,
                cloud_cover_percent: 10.0,
                source: WeatherProvenance::Synthetic,
            },
            NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
        )
    }

    #[test]
    fn test_grid_shape_and_order() {
        let grid = candidate_grid(&OptimizerConfig::default());
        // 19 tilt steps × 72 azimuth steps at 5°.
        assert_eq!(grid.len(), 19 * 72);
        assert_eq!(grid[0], Candidate { tilt_deg: 0.0, azimuth_deg: 0.0 });
        assert_eq!(grid[1].azimuth_deg, 5.0);
        assert_eq!(grid.last().unwrap().tilt_deg, 90.0);
        assert!(grid.last().unwrap().azimuth_deg < 360.0);
    }

    #[test]
    fn test_angular_distance_wraps_azimuth() {
        let candidate = Candidate { tilt_deg: 10.0, azimuth_deg: 350.0 };
        // 350° to 10° is 20° around the compass, not 340°.
        assert!((angular_distance(&candidate, 10.0, 10.0) - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_optimal_never_below_baseline() {
        let (location, panel, weather, date) = scenario();
        let optimizer = ConfigOptimizer::new(shared_predictor(), coarse_config());
        let current = panel.with_angles(25.0, 170.0);

        let result = optimizer
            .optimize(&location, &panel, &weather, date, Some(&current), None)
            .await
            .unwrap();

        let baseline = result.baseline_output_kwh.unwrap();
        assert!(result.optimal_output_kwh >= baseline);
        assert!(result.improvement_percent.unwrap() >= 0.0);
        assert_eq!(result.candidates_evaluated, 7 * 12);
    }

    #[tokio::test]
    async fn test_search_is_deterministic_across_worker_counts() {
        let (location, panel, weather, date) = scenario();
        let sequential = ConfigOptimizer::new(
            shared_predictor(),
            OptimizerConfig { worker_count: 1, ..coarse_config() },
        );
        let parallel = ConfigOptimizer::new(
            shared_predictor(),
            OptimizerConfig { worker_count: 8, ..coarse_config() },
        );

        let a = sequential
            .optimize(&location, &panel, &weather, date, None, None)
            .await
            .unwrap();
        let b = parallel
            .optimize(&location, &panel, &weather, date, None, None)
            .await
            .unwrap();

        assert_eq!(a.optimal_tilt_deg, b.optimal_tilt_deg);
        assert_eq!(a.optimal_azimuth_deg, b.optimal_azimuth_deg);
        assert_eq!(a.optimal_output_kwh, b.optimal_output_kwh);
    }

    #[tokio::test]
    async fn test_tie_break_prefers_current_then_ascending() {
        let (location, panel, weather, date) = scenario();
        // An epsilon wider than any output makes every candidate tie.
        let all_tie = OptimizerConfig {
            tie_epsilon_kwh: f64::MAX,
            ..coarse_config()
        };
        let optimizer = ConfigOptimizer::new(shared_predictor(), all_tie);

        let current = panel.with_angles(45.0, 180.0);
        let with_current = optimizer
            .optimize(&location, &panel, &weather, date, Some(&current), None)
            .await
            .unwrap();
        assert_eq!(with_current.optimal_tilt_deg, 45.0);
        assert_eq!(with_current.optimal_azimuth_deg, 180.0);

        let without = optimizer
            .optimize(&location, &panel, &weather, date, None, None)
            .await
            .unwrap();
        assert_eq!(without.optimal_tilt_deg, 0.0);
        assert_eq!(without.optimal_azimuth_deg, 0.0);
    }

    #[tokio::test]
    async fn test_cancellation_between_candidates() {
        let (location, panel, weather, date) = scenario();
        let optimizer = ConfigOptimizer::new(shared_predictor(), coarse_config());

        let token = CancellationToken::new();
        token.cancel();
        let result = optimizer
            .optimize(&location, &panel, &weather, date, None, Some(token))
            .await;
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }
}
