//! Weather data acquisition.
//!
//! Live sources implement [`WeatherSource`] and are tried in registration
//! order by the [`resolver::WeatherResolver`]; when every source fails the
//! resolver falls back to the deterministic synthetic estimator, so resolving
//! weather never fails.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Location, WeatherProvenance, WeatherSnapshot};

pub mod nasa_power;
pub mod openweather;
pub mod resolver;
pub mod synthetic;

pub use resolver::WeatherResolver;

/// A pluggable external weather source.
///
/// Failures are internal to the resolver chain: they are logged and absorbed,
/// never surfaced to engine callers.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn provenance(&self) -> WeatherProvenance;
    async fn fetch(&self, location: &Location, timestamp: DateTime<Utc>)
        -> Result<WeatherSnapshot>;
}
