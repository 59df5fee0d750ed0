use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumString};
use validator::Validate;

// ============================================================================
// Input Value Types
// ============================================================================

/// Geographic location of a panel installation.
///
/// Identity is the coordinate pair; the display name is cosmetic.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Location {
    #[validate(range(min = -90.0, max = 90.0, message = "must be between -90 and 90"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "must be between -180 and 180"))]
    pub longitude: f64,
    pub name: Option<String>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            name: None,
        }
    }

    pub fn named(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            name: Some(name.into()),
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({:.4}, {:.4})", name, self.latitude, self.longitude),
            None => write!(f, "({:.4}, {:.4})", self.latitude, self.longitude),
        }
    }
}

/// Physical panel setup, either a candidate or the currently installed one.
///
/// An azimuth of exactly 360 is accepted on input and wrapped to 0 during
/// feature building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PanelConfiguration {
    #[validate(range(exclusive_min = 0.0, message = "must be positive"))]
    pub surface_area_m2: f64,
    #[validate(range(min = 0.0, max = 90.0, message = "must be between 0 and 90"))]
    pub tilt_angle_deg: f64,
    #[validate(range(min = 0.0, max = 360.0, message = "must be between 0 and 360"))]
    pub azimuth_angle_deg: f64,
    #[validate(range(
        exclusive_min = 0.0,
        max = 1.0,
        message = "must be in (0, 1]"
    ))]
    pub panel_efficiency: f64,
}

impl PanelConfiguration {
    pub fn new(
        surface_area_m2: f64,
        tilt_angle_deg: f64,
        azimuth_angle_deg: f64,
        panel_efficiency: f64,
    ) -> Self {
        Self {
            surface_area_m2,
            tilt_angle_deg,
            azimuth_angle_deg,
            panel_efficiency,
        }
    }

    /// Same panel hardware pointed at different angles.
    pub fn with_angles(&self, tilt_angle_deg: f64, azimuth_angle_deg: f64) -> Self {
        Self {
            tilt_angle_deg,
            azimuth_angle_deg,
            ..self.clone()
        }
    }
}

impl fmt::Display for PanelConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} m² @ tilt {:.0}° / azimuth {:.0}°",
            self.surface_area_m2, self.tilt_angle_deg, self.azimuth_angle_deg
        )
    }
}

/// Aggregation window for a prediction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    /// Multiplier applied to a single-day prediction.
    pub fn day_multiplier(&self) -> f64 {
        match self {
            Timeframe::Daily => 1.0,
            Timeframe::Weekly => 7.0,
            Timeframe::Monthly => 30.0,
        }
    }
}

// ============================================================================
// Weather
// ============================================================================

/// Which link of the resolver chain produced a snapshot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WeatherProvenance {
    LivePrimary,
    LiveSecondary,
    Synthetic,
}

/// Weather metrics for one location and time, produced fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Daily solar irradiance in kWh/m²/day.
    pub solar_irradiance: f64,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub wind_speed_ms: f64,
    pub cloud_cover_percent: f64,
    pub source: WeatherProvenance,
}

// ============================================================================
// Requests
// ============================================================================

/// Validated input for a single power prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub location: Location,
    pub panel: PanelConfiguration,
    pub timeframe: Timeframe,
    /// Reference date; drives solar geometry and the time-series axis.
    pub date: NaiveDate,
}

/// Validated input for a configuration search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub location: Location,
    /// Panel hardware (area/efficiency); its angles are the search's starting
    /// point and are replaced by every candidate.
    pub panel: PanelConfiguration,
    pub date: NaiveDate,
    /// Currently installed angles to compare against, if any.
    pub current: Option<PanelConfiguration>,
}

// ============================================================================
// Results
// ============================================================================

/// One entry of a prediction's time-series breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub output_kwh: f64,
}

/// Outcome of a single prediction, immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_output_kwh: f64,
    /// Normalized reliability estimate in [0, 1].
    pub confidence_score: f64,
    pub timeframe: Timeframe,
    pub weather: WeatherSnapshot,
    /// Per-period breakdown, ordered by timestamp ascending. Empty only when
    /// the timeframe spans a single period.
    pub time_series: Vec<TimeSeriesPoint>,
    pub generated_at: DateTime<Utc>,
}

/// Outcome of a tilt/azimuth search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub optimal_tilt_deg: f64,
    pub optimal_azimuth_deg: f64,
    pub optimal_output_kwh: f64,
    /// Predicted output of the supplied current configuration, if one was given.
    pub baseline_output_kwh: Option<f64>,
    /// Relative gain over the baseline; `None` without a baseline or when the
    /// baseline output is zero.
    pub improvement_percent: Option<f64>,
    pub candidates_evaluated: usize,
    pub weather: WeatherSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use validator::Validate;

    #[test]
    fn test_location_identity_ignores_name() {
        let a = Location::named(37.7749, -122.4194, "San Francisco");
        let b = Location::new(37.7749, -122.4194);
        assert_eq!(a, b);
    }

    #[test]
    fn test_location_validation() {
        assert!(Location::new(37.7749, -122.4194).validate().is_ok());
        assert!(Location::new(91.0, 0.0).validate().is_err());
        assert!(Location::new(0.0, -181.0).validate().is_err());
    }

    #[test]
    fn test_panel_validation() {
        let ok = PanelConfiguration::new(50.0, 30.0, 180.0, 0.2);
        assert!(ok.validate().is_ok());

        let zero_area = PanelConfiguration::new(0.0, 30.0, 180.0, 0.2);
        assert!(zero_area.validate().is_err());

        let steep = PanelConfiguration::new(50.0, 91.0, 180.0, 0.2);
        assert!(steep.validate().is_err());

        let bad_efficiency = PanelConfiguration::new(50.0, 30.0, 180.0, 1.5);
        assert!(bad_efficiency.validate().is_err());
    }

    #[rstest]
    #[case(Timeframe::Daily, 1.0)]
    #[case(Timeframe::Weekly, 7.0)]
    #[case(Timeframe::Monthly, 30.0)]
    fn test_timeframe_multiplier(#[case] timeframe: Timeframe, #[case] expected: f64) {
        assert_eq!(timeframe.day_multiplier(), expected);
    }

    #[test]
    fn test_provenance_serialization() {
        let json = serde_json::to_string(&WeatherProvenance::LivePrimary).unwrap();
        assert_eq!(json, "\"live-primary\"");
        assert_eq!(WeatherProvenance::Synthetic.to_string(), "synthetic");
    }

    #[test]
    fn test_with_angles_keeps_hardware() {
        let base = PanelConfiguration::new(50.0, 30.0, 180.0, 0.2);
        let turned = base.with_angles(45.0, 90.0);
        assert_eq!(turned.surface_area_m2, 50.0);
        assert_eq!(turned.panel_efficiency, 0.2);
        assert_eq!(turned.tilt_angle_deg, 45.0);
        assert_eq!(turned.azimuth_angle_deg, 90.0);
    }
}
