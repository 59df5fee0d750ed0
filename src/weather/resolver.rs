//! Ordered fallback chain over registered weather sources.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{synthetic, WeatherSource};
use crate::domain::{Location, WeatherSnapshot};

/// Cache key: coordinates rounded to ~0.1° and the UTC hour bucket. Two
/// requests in the same bucket for nearby coordinates reuse the live result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    lat_decideg: i32,
    lon_decideg: i32,
    hour_bucket: i64,
}

impl CacheKey {
    fn new(location: &Location, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat_decideg: (location.latitude * 10.0).round() as i32,
            lon_decideg: (location.longitude * 10.0).round() as i32,
            hour_bucket: timestamp.timestamp() / 3600,
        }
    }
}

/// Resolves weather for a location/time by trying each registered source once
/// under a bounded timeout, in order, and degrading to the synthetic
/// estimator when all of them fail. Never returns an error.
pub struct WeatherResolver {
    sources: Vec<Arc<dyn WeatherSource>>,
    attempt_timeout: Duration,
    cache: RwLock<HashMap<CacheKey, WeatherSnapshot>>,
}

impl WeatherResolver {
    pub fn new(sources: Vec<Arc<dyn WeatherSource>>, attempt_timeout: Duration) -> Self {
        Self {
            sources,
            attempt_timeout,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolver with no live sources: every call produces a synthetic
    /// snapshot. Useful for offline operation and tests.
    pub fn synthetic_only() -> Self {
        Self::new(Vec::new(), Duration::from_secs(1))
    }

    pub async fn resolve(&self, location: &Location, timestamp: DateTime<Utc>) -> WeatherSnapshot {
        let key = CacheKey::new(location, timestamp);

        {
            let cache = self.cache.read().await;
            if let Some(snapshot) = cache.get(&key) {
                debug!(%location, "weather cache hit");
                return snapshot.clone();
            }
        }

        for source in &self.sources {
            match tokio::time::timeout(self.attempt_timeout, source.fetch(location, timestamp))
                .await
            {
                Ok(Ok(snapshot)) => {
                    info!(source = source.name(), %location, "weather resolved");
                    let mut cache = self.cache.write().await;
                    // Older hour buckets never get hit again; drop them.
                    cache.retain(|k, _| k.hour_bucket == key.hour_bucket);
                    cache.insert(key, snapshot.clone());
                    return snapshot;
                }
                Ok(Err(error)) => {
                    warn!(source = source.name(), %error, "weather source failed");
                }
                Err(_) => {
                    warn!(
                        source = source.name(),
                        timeout_ms = self.attempt_timeout.as_millis() as u64,
                        "weather source timed out"
                    );
                }
            }
        }

        debug!(%location, "all weather sources exhausted, using synthetic estimate");
        synthetic::estimate(location, timestamp)
    }
}
