//! NASA POWER adapter (secondary live source).
//!
//! Queries the daily point endpoint for the last week of measurements and
//! reports the most recent day carrying real values. POWER fills missing
//! measurements with -999, which this adapter treats as absent.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::WeatherSource;
use crate::domain::{Location, WeatherProvenance, WeatherSnapshot};

const PARAMETERS: &str = "ALLSKY_SFC_SW_DWN,T2M,RH2M,WS10M,CLRSKY_SFC_SW_DWN";

#[derive(Clone)]
pub struct NasaPowerClient {
    client: reqwest::Client,
    base_url: String,
}

impl NasaPowerClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("solarcast/0.2"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl WeatherSource for NasaPowerClient {
    fn name(&self) -> &'static str {
        "nasa-power"
    }

    fn provenance(&self) -> WeatherProvenance {
        WeatherProvenance::LiveSecondary
    }

    async fn fetch(
        &self,
        location: &Location,
        timestamp: DateTime<Utc>,
    ) -> Result<WeatherSnapshot> {
        let end = timestamp.date_naive();
        let start = end - ChronoDuration::days(7);
        let url = format!(
            "{}/api/temporal/daily/point",
            self.base_url.trim_end_matches('/')
        );
        debug!(%url, "fetching solar data from NASA POWER");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("parameters", PARAMETERS.to_string()),
                ("community", "RE".to_string()),
                ("latitude", location.latitude.to_string()),
                ("longitude", location.longitude.to_string()),
                ("start", start.format("%Y%m%d").to_string()),
                ("end", end.format("%Y%m%d").to_string()),
                ("format", "JSON".to_string()),
            ])
            .send()
            .await
            .context("NASA POWER GET failed")?;

        let status = resp.status();
        let body = resp.text().await.context("NASA POWER read failed")?;
        if !status.is_success() {
            anyhow::bail!("NASA POWER API error: HTTP {status}: {body}");
        }

        let raw: PowerResponse =
            serde_json::from_str(&body).context("NASA POWER JSON parse failed")?;
        let params = raw.properties.parameter;

        let allsky = params
            .get("ALLSKY_SFC_SW_DWN")
            .context("NASA POWER payload missing ALLSKY_SFC_SW_DWN")?;

        // BTreeMap keys are YYYYMMDD strings, so the last valid entry is the
        // most recent day with a real measurement.
        let (date, irradiance) = allsky
            .iter()
            .rev()
            .find(|(_, v)| **v >= 0.0)
            .context("NASA POWER returned no usable irradiance values")?;

        let value_for = |name: &str| -> f64 {
            params
                .get(name)
                .and_then(|series| series.get(date))
                .copied()
                .filter(|v| *v > -900.0)
                .unwrap_or_default()
        };

        let clearsky = value_for("CLRSKY_SFC_SW_DWN");

        Ok(WeatherSnapshot {
            solar_irradiance: *irradiance,
            temperature_c: value_for("T2M"),
            humidity_percent: value_for("RH2M"),
            wind_speed_ms: value_for("WS10M"),
            cloud_cover_percent: cloud_cover_from_radiation(*irradiance, clearsky),
            source: WeatherProvenance::LiveSecondary,
        })
    }
}

/// POWER reports no cloud cover; estimate it from the ratio of all-sky to
/// clear-sky radiation, clamped to [0, 100].
fn cloud_cover_from_radiation(all_sky: f64, clear_sky: f64) -> f64 {
    if clear_sky <= 0.0 {
        return 50.0;
    }
    ((1.0 - all_sky / clear_sky) * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: BTreeMap<String, BTreeMap<String, f64>>,
}
