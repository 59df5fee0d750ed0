//! Deterministic synthetic weather.
//!
//! The terminal link of the resolver chain. Values are derived from latitude
//! and day-of-year only, so repeated calls with the same inputs reproduce the
//! same snapshot exactly.

use chrono::{DateTime, Datelike, Utc};

use crate::domain::{Location, WeatherProvenance, WeatherSnapshot};
use crate::features::solar::seasonal_phase;

/// Annual-mean clear-sky irradiance floor/offset, kWh/m²/day.
const IRRADIANCE_BASE: f64 = 1.5;
const IRRADIANCE_LATITUDE_SCALE: f64 = 5.0;
/// Maximum seasonal swing at the poles, kWh/m²/day.
const IRRADIANCE_SEASONAL_SWING: f64 = 2.5;

const TEMPERATURE_EQUATOR_C: f64 = 25.0;
const TEMPERATURE_LATITUDE_SLOPE: f64 = 0.5;
const TEMPERATURE_SEASONAL_SWING_C: f64 = 12.0;

const DEFAULT_HUMIDITY_PERCENT: f64 = 55.0;
const DEFAULT_WIND_SPEED_MS: f64 = 4.0;
const DEFAULT_CLOUD_COVER_PERCENT: f64 = 30.0;

/// Estimate a plausible snapshot for a location and time without any external
/// source: latitude-shaped irradiance and temperature curves with a fixed
/// seasonal adjustment, plus constant humidity/wind/cloud defaults.
pub fn estimate(location: &Location, timestamp: DateTime<Utc>) -> WeatherSnapshot {
    let latitude = location.latitude;
    let abs_latitude = latitude.abs();

    // Seasonal term peaks at the local summer solstice of either hemisphere.
    let hemisphere = if latitude < 0.0 { -1.0 } else { 1.0 };
    let seasonal = seasonal_phase(timestamp.ordinal()).cos() * hemisphere;

    let irradiance_mean = IRRADIANCE_BASE + IRRADIANCE_LATITUDE_SCALE * latitude.to_radians().cos();
    let irradiance_swing = IRRADIANCE_SEASONAL_SWING * (abs_latitude / 90.0);
    let solar_irradiance = (irradiance_mean + irradiance_swing * seasonal).clamp(0.5, 8.0);

    let temperature_c = TEMPERATURE_EQUATOR_C - TEMPERATURE_LATITUDE_SLOPE * abs_latitude
        + TEMPERATURE_SEASONAL_SWING_C * (abs_latitude / 90.0) * seasonal;

    WeatherSnapshot {
        solar_irradiance,
        temperature_c,
        humidity_percent: DEFAULT_HUMIDITY_PERCENT,
        wind_speed_ms: DEFAULT_WIND_SPEED_MS,
        cloud_cover_percent: DEFAULT_CLOUD_COVER_PERCENT,
        source: WeatherProvenance::Synthetic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_deterministic_for_same_inputs() {
        let location = Location::new(37.7749, -122.4194);
        let ts = at(2026, 6, 21);
        assert_eq!(estimate(&location, ts), estimate(&location, ts));
    }

    #[test]
    fn test_equator_sunnier_than_poles() {
        let ts = at(2026, 3, 21);
        let equator = estimate(&Location::new(0.0, 0.0), ts);
        let arctic = estimate(&Location::new(75.0, 0.0), ts);
        assert!(equator.solar_irradiance > arctic.solar_irradiance);
        assert!(equator.temperature_c > arctic.temperature_c);
    }

    #[test]
    fn test_hemispheres_have_opposite_seasons() {
        let june = at(2026, 6, 21);
        let stockholm = estimate(&Location::new(59.33, 18.07), june);
        let wellington = estimate(&Location::new(-41.29, 174.78), june);

        let december = at(2026, 12, 21);
        let stockholm_winter = estimate(&Location::new(59.33, 18.07), december);
        let wellington_summer = estimate(&Location::new(-41.29, 174.78), december);

        assert!(stockholm.solar_irradiance > stockholm_winter.solar_irradiance);
        assert!(wellington_summer.solar_irradiance > wellington.solar_irradiance);
    }

    #[test]
    fn test_values_stay_in_plausible_ranges() {
        for lat in [-90.0, -45.0, 0.0, 45.0, 90.0] {
            for month in 1..=12 {
                let snap = estimate(&Location::new(lat, 0.0), at(2026, month, 15));
                assert!(snap.solar_irradiance >= 0.5 && snap.solar_irradiance <= 8.0);
                assert!(snap.cloud_cover_percent == DEFAULT_CLOUD_COVER_PERCENT);
                assert_eq!(snap.source, WeatherProvenance::Synthetic);
            }
        }
    }
}
