//! OpenWeatherMap adapter (primary live source).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::WeatherSource;
use crate::domain::{Location, WeatherProvenance, WeatherSnapshot};

/// Average clear-sky daily irradiance used when deriving irradiance from
/// cloud cover, kWh/m²/day.
const CLEAR_SKY_IRRADIANCE: f64 = 6.0;

#[derive(Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("solarcast/0.2"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    fn name(&self) -> &'static str {
        "openweathermap"
    }

    fn provenance(&self) -> WeatherProvenance {
        WeatherProvenance::LivePrimary
    }

    async fn fetch(
        &self,
        location: &Location,
        _timestamp: DateTime<Utc>,
    ) -> Result<WeatherSnapshot> {
        if self.api_key.is_empty() {
            anyhow::bail!("OpenWeatherMap API key not configured");
        }

        let url = format!(
            "{}/data/2.5/weather",
            self.base_url.trim_end_matches('/')
        );
        debug!(%url, "fetching current weather from OpenWeatherMap");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("lat", location.latitude.to_string()),
                ("lon", location.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await
            .context("OpenWeatherMap GET failed")?;

        let status = resp.status();
        let body = resp.text().await.context("OpenWeatherMap read failed")?;
        if !status.is_success() {
            anyhow::bail!("OpenWeatherMap API error: HTTP {status}: {body}");
        }

        let raw: OwmResponse =
            serde_json::from_str(&body).context("OpenWeatherMap JSON parse failed")?;

        Ok(WeatherSnapshot {
            solar_irradiance: irradiance_from_cloud_cover(raw.clouds.all),
            temperature_c: raw.main.temp,
            humidity_percent: raw.main.humidity,
            wind_speed_ms: raw.wind.speed,
            cloud_cover_percent: raw.clouds.all,
            source: WeatherProvenance::LivePrimary,
        })
    }
}

/// OpenWeatherMap reports no irradiance; derive a daily estimate from cloud
/// cover, floored at 1.0 kWh/m²/day.
fn irradiance_from_cloud_cover(cloud_cover_percent: f64) -> f64 {
    (CLEAR_SKY_IRRADIANCE * (1.0 - cloud_cover_percent / 100.0 * 0.8)).max(1.0)
}

#[derive(Debug, Deserialize)]
struct OwmResponse {
    main: OwmMain,
    wind: OwmWind,
    clouds: OwmClouds,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmClouds {
    all: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_irradiance_from_cloud_cover() {
        assert_eq!(irradiance_from_cloud_cover(0.0), 6.0);
        assert!((irradiance_from_cloud_cover(50.0) - 3.6).abs() < 1e-9);
        // Heavy overcast still floors at 1.0.
        assert_eq!(irradiance_from_cloud_cover(100.0), 1.2);
        assert_eq!(irradiance_from_cloud_cover(110.0), 1.0);
    }

    #[test]
    fn test_parse_payload() {
        let body = r#"{
            "main": {"temp": 18.4, "humidity": 62},
            "wind": {"speed": 4.1},
            "clouds": {"all": 40}
        }"#;
        let raw: OwmResponse = serde_json::from_str(body).unwrap();
        assert_eq!(raw.main.temp, 18.4);
        assert_eq!(raw.clouds.all, 40.0);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails() {
        let client = OpenWeatherClient::new(
            "https://api.openweathermap.org".to_string(),
            String::new(),
            Duration::from_secs(5),
        )
        .unwrap();
        let result = client
            .fetch(&Location::new(37.7749, -122.4194), Utc::now())
            .await;
        assert!(result.is_err());
    }
}
