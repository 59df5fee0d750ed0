//! Feature assembly for the power predictor.

use chrono::{Datelike, NaiveDate};
use validator::Validate;

use crate::domain::{Location, PanelConfiguration, WeatherSnapshot};
use crate::error::EngineError;
use crate::ml::{feature_names, FeatureVector};

pub mod solar;

/// Builds the fixed-order feature vector from validated inputs.
///
/// Pure: identical inputs always produce an identical vector. Ranges are
/// re-validated defensively even though callers are expected to have done so.
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn build(
        location: &Location,
        panel: &PanelConfiguration,
        weather: &WeatherSnapshot,
        date: NaiveDate,
    ) -> Result<FeatureVector, EngineError> {
        location.validate().map_err(EngineError::from_validation)?;
        panel.validate().map_err(EngineError::from_validation)?;

        // 360° is a valid input but the geometry works on [0, 360).
        let azimuth = panel.azimuth_angle_deg % 360.0;

        let orientation = solar::daily_orientation_factor(
            location.latitude,
            date.ordinal(),
            panel.tilt_angle_deg,
            azimuth,
        );
        let effective_irradiance = weather.solar_irradiance * orientation;

        FeatureVector::new(
            vec![
                location.latitude,
                location.longitude,
                panel.surface_area_m2,
                panel.tilt_angle_deg,
                azimuth,
                panel.panel_efficiency,
                effective_irradiance,
                weather.temperature_c,
                weather.humidity_percent,
                weather.wind_speed_ms,
                weather.cloud_cover_percent,
            ],
            feature_names(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::WeatherProvenance;
    use proptest::prelude::*;

    fn weather(irradiance: f64, cloud: f64) -> WeatherSnapshot {
        WeatherSnapshot {
            solar_irradiance: irradiance,
            temperature_c: 22.0,
            humidity_percent: 50.0,
            wind_speed_ms: 3.0,
            cloud_cover_percent: cloud,
            source: WeatherProvenance::Synthetic,
        }
    }

    fn march_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    #[test]
    fn test_build_width_and_order() {
        let location = Location::new(37.7749, -122.4194);
        let panel = PanelConfiguration::new(50.0, 30.0, 180.0, 0.2);
        let fv = FeatureBuilder::build(&location, &panel, &weather(5.5, 10.0), march_first())
            .unwrap();

        assert_eq!(fv.len(), 11);
        assert_eq!(fv.features[0], 37.7749);
        assert_eq!(fv.features[2], 50.0);
        // Effective irradiance is attenuated plate irradiance.
        assert!(fv.features[6] > 0.0 && fv.features[6] <= 5.5);
        assert_eq!(fv.features[10], 10.0);
    }

    #[test]
    fn test_validation_names_offending_field() {
        let location = Location::new(37.7749, -122.4194);
        let panel = PanelConfiguration::new(50.0, 120.0, 180.0, 0.2);
        let err = FeatureBuilder::build(&location, &panel, &weather(5.5, 10.0), march_first())
            .unwrap_err();

        match err {
            EngineError::Validation { field, .. } => assert_eq!(field, "tilt_angle_deg"),
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_azimuth_wraps_at_360() {
        let location = Location::new(37.7749, -122.4194);
        let at_zero = PanelConfiguration::new(50.0, 30.0, 0.0, 0.2);
        let at_360 = PanelConfiguration::new(50.0, 30.0, 360.0, 0.2);

        let a = FeatureBuilder::build(&location, &at_zero, &weather(5.5, 10.0), march_first())
            .unwrap();
        let b = FeatureBuilder::build(&location, &at_360, &weather(5.5, 10.0), march_first())
            .unwrap();
        assert_eq!(a.features, b.features);
    }

    #[test]
    fn test_south_facing_collects_more_in_north() {
        let location = Location::new(37.7749, -122.4194);
        let south = PanelConfiguration::new(50.0, 30.0, 180.0, 0.2);
        let north = PanelConfiguration::new(50.0, 30.0, 0.0, 0.2);
        let w = weather(5.5, 10.0);

        let fv_south = FeatureBuilder::build(&location, &south, &w, march_first()).unwrap();
        let fv_north = FeatureBuilder::build(&location, &north, &w, march_first()).unwrap();
        assert!(fv_south.features[6] > fv_north.features[6]);
    }

    proptest! {
        #[test]
        fn test_build_is_pure(
            lat in -90.0f64..90.0,
            lon in -180.0f64..180.0,
            area in 0.1f64..500.0,
            tilt in 0.0f64..=90.0,
            azimuth in 0.0f64..360.0,
            efficiency in 0.01f64..=1.0,
            irradiance in 0.0f64..10.0,
            day in 1u32..=365,
        ) {
            let location = Location::new(lat, lon);
            let panel = PanelConfiguration::new(area, tilt, azimuth, efficiency);
            let w = weather(irradiance, 25.0);
            let date = NaiveDate::from_yo_opt(2026, day).unwrap();

            let first = FeatureBuilder::build(&location, &panel, &w, date).unwrap();
            let second = FeatureBuilder::build(&location, &panel, &w, date).unwrap();
            prop_assert_eq!(first.features, second.features);
        }
    }
}
