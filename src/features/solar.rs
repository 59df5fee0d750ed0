//! Solar geometry.
//!
//! Standard formulas: declination from day-of-year, hour angle from solar
//! time, elevation/azimuth from the spherical triangle, and the incidence
//! cosine on a tilted, rotated panel. Everything here is pure and operates on
//! degrees at the API boundary.

use std::f64::consts::PI;

/// Solar declination in degrees for a day of year (1..=366).
pub fn declination_deg(day_of_year: u32) -> f64 {
    23.45 * ((360.0 / 365.25) * (day_of_year as f64 + 284.0)).to_radians().sin()
}

/// Solar elevation and azimuth in degrees for a latitude, day of year, and
/// local solar hour (0.0..24.0, 12.0 = solar noon).
///
/// Azimuth follows the compass convention: 0 = North, 90 = East, 180 = South.
pub fn solar_position_deg(latitude_deg: f64, day_of_year: u32, solar_hour: f64) -> (f64, f64) {
    let declination_rad = declination_deg(day_of_year).to_radians();
    let hour_angle_rad = ((solar_hour - 12.0) * 15.0).to_radians();
    let lat_rad = latitude_deg.to_radians();

    let sin_elevation = lat_rad.sin() * declination_rad.sin()
        + lat_rad.cos() * declination_rad.cos() * hour_angle_rad.cos();
    let elevation_rad = sin_elevation.clamp(-1.0, 1.0).asin();

    let cos_elevation = elevation_rad.cos();
    let azimuth_deg = if cos_elevation.abs() < 1e-9 {
        // Sun at zenith: azimuth is undefined, any value works for incidence.
        180.0
    } else {
        let cos_azimuth = ((declination_rad.sin() - lat_rad.sin() * sin_elevation)
            / (lat_rad.cos() * cos_elevation))
            .clamp(-1.0, 1.0);
        let azimuth = cos_azimuth.acos().to_degrees();
        // Mirror into the afternoon half of the sky.
        if hour_angle_rad > 0.0 {
            360.0 - azimuth
        } else {
            azimuth
        }
    };

    (elevation_rad.to_degrees(), azimuth_deg)
}

/// Cosine of the incidence angle between the sun direction and the normal of
/// a panel tilted `tilt_deg` from horizontal and rotated to `panel_azimuth_deg`.
///
/// cos θᵢ = cos θz · cos β + sin θz · sin β · cos(γs − γp), floored at zero
/// (sunlight striking the back of the panel contributes nothing).
pub fn incidence_cosine(
    solar_elevation_deg: f64,
    solar_azimuth_deg: f64,
    tilt_deg: f64,
    panel_azimuth_deg: f64,
) -> f64 {
    let zenith_rad = (90.0 - solar_elevation_deg).to_radians();
    let tilt_rad = tilt_deg.to_radians();
    let azimuth_delta_rad = (solar_azimuth_deg - panel_azimuth_deg).to_radians();

    let cos_incidence = zenith_rad.cos() * tilt_rad.cos()
        + zenith_rad.sin() * tilt_rad.sin() * azimuth_delta_rad.cos();

    cos_incidence.max(0.0)
}

/// Daylight-weighted orientation factor in [0, 1] for a panel at the given
/// angles: the mean incidence cosine over the day, weighted by sin(elevation)
/// so hours near solar noon dominate the way they dominate insolation.
///
/// Multiplying daily plate irradiance by this factor yields the effective
/// irradiance a tilted panel collects, which is what separates candidate
/// configurations during optimization.
pub fn daily_orientation_factor(
    latitude_deg: f64,
    day_of_year: u32,
    tilt_deg: f64,
    panel_azimuth_deg: f64,
) -> f64 {
    let mut weighted_incidence = 0.0;
    let mut weight_sum = 0.0;

    for hour in 0..24 {
        let solar_hour = hour as f64 + 0.5;
        let (elevation, solar_azimuth) = solar_position_deg(latitude_deg, day_of_year, solar_hour);
        if elevation <= 0.0 {
            continue;
        }
        let weight = elevation.to_radians().sin();
        weighted_incidence +=
            weight * incidence_cosine(elevation, solar_azimuth, tilt_deg, panel_azimuth_deg);
        weight_sum += weight;
    }

    if weight_sum <= 0.0 {
        // Polar night: no daylight at all.
        0.0
    } else {
        weighted_incidence / weight_sum
    }
}

/// Day-of-year phase in radians, zero at the northern summer solstice.
pub fn seasonal_phase(day_of_year: u32) -> f64 {
    2.0 * PI * (day_of_year as f64 - 172.0) / 365.25
}
