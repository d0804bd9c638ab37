use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use futures::{StreamExt, TryStreamExt};
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ValidationError, WeatherUnavailableError},
    models::Checkpoint,
};

use super::{
    conditions::WeatherConditionFactory,
    report::{CheckpointWithWeather, WeatherReport},
};

pub const DEFAULT_WEATHER_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_WEATHER_CONCURRENCY: usize = 8;

const QUARTER_HOUR_SECS: i64 = 15 * 60;

/// Raw forecast values for one place and time. Absent fields were not
/// reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub freezing_level_height_m: Option<f64>,
    pub precipitation_mm: Option<f64>,
    pub snowfall_cm: Option<f64>,
    pub visibility_m: Option<f64>,
    pub wind_gusts_kmh: Option<f64>,
}

impl WeatherSample {
    pub fn is_empty(&self) -> bool {
        self.freezing_level_height_m.is_none()
            && self.precipitation_mm.is_none()
            && self.snowfall_cm.is_none()
            && self.visibility_m.is_none()
            && self.wind_gusts_kmh.is_none()
    }
}

#[async_trait]
pub trait WeatherDataProvider: Send + Sync {
    async fn weather_at(
        &self,
        lat: f64,
        lng: f64,
        at: DateTime<FixedOffset>,
    ) -> Result<WeatherSample, WeatherUnavailableError>;
}

/// Attaches a scored weather report to checkpoints.
pub struct WeatherInformationService {
    factory: WeatherConditionFactory,
    provider: Arc<dyn WeatherDataProvider>,
    timeout: Duration,
    concurrency: usize,
}

impl WeatherInformationService {
    pub fn new(factory: WeatherConditionFactory, provider: Arc<dyn WeatherDataProvider>) -> Self {
        Self {
            factory,
            provider,
            timeout: DEFAULT_WEATHER_TIMEOUT,
            concurrency: DEFAULT_WEATHER_CONCURRENCY,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn enrich_with_weather(
        &self,
        checkpoint: &Checkpoint,
    ) -> Result<CheckpointWithWeather, WeatherUnavailableError> {
        let (lat, lng) = (checkpoint.latitude(), checkpoint.longitude());
        let at = checkpoint.arrival_time();

        let sample = tokio::time::timeout(self.timeout, self.provider.weather_at(lat, lng, at))
            .await
            .map_err(|_| WeatherUnavailableError::Timeout {
                lat,
                lng,
                timeout: self.timeout,
            })??;

        if sample.is_empty() {
            return Err(WeatherUnavailableError::NoData { lat, lng, at });
        }

        let report = self
            .create_weather_report(&sample)
            .map_err(|source| WeatherUnavailableError::Invalid { lat, lng, source })?;

        Ok(CheckpointWithWeather::new(checkpoint.clone(), report))
    }

    /// Enriches every checkpoint with at most `concurrency` requests in
    /// flight. Results keep the input order; the first failure aborts.
    pub async fn enrich_all(
        &self,
        checkpoints: &[Checkpoint],
    ) -> Result<Vec<CheckpointWithWeather>, WeatherUnavailableError> {
        let pending: Vec<_> = checkpoints
            .iter()
            .map(|checkpoint| self.enrich_with_weather(checkpoint))
            .collect();
        futures::stream::iter(pending)
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    /// Conditions in a fixed order: freezing, snowfall, precipitation,
    /// visibility, wind gust.
    pub fn create_weather_report(&self, sample: &WeatherSample) -> Result<WeatherReport, ValidationError> {
        let mut conditions = Vec::with_capacity(5);
        if let Some(value) = sample.freezing_level_height_m {
            conditions.push(self.factory.create_freezing_risk(value)?);
        }
        if let Some(value) = sample.snowfall_cm {
            conditions.push(self.factory.create_snowfall(value)?);
        }
        if let Some(value) = sample.precipitation_mm {
            conditions.push(self.factory.create_precipitation(value)?);
        }
        if let Some(value) = sample.visibility_m {
            conditions.push(self.factory.create_visibility(value)?);
        }
        if let Some(value) = sample.wind_gusts_kmh {
            conditions.push(self.factory.create_wind_gust(value)?);
        }
        Ok(WeatherReport::new(conditions))
    }
}

/// Nearest quarter hour in UTC, ties rounding up.
pub fn nearest_quarter_hour(at: DateTime<FixedOffset>) -> DateTime<Utc> {
    let seconds = at.timestamp();
    let rounded = (seconds + QUARTER_HOUR_SECS / 2).div_euclid(QUARTER_HOUR_SECS) * QUARTER_HOUR_SECS;
    Utc.timestamp_opt(rounded, 0)
        .single()
        .unwrap_or_else(|| at.with_timezone(&Utc))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SampleKey {
    lat_milli: i64,
    lng_milli: i64,
    quarter_hour: i64,
}

impl SampleKey {
    fn new(lat: f64, lng: f64, at: DateTime<FixedOffset>) -> Self {
        Self {
            lat_milli: (lat * 1_000.0).round() as i64,
            lng_milli: (lng * 1_000.0).round() as i64,
            quarter_hour: nearest_quarter_hour(at).timestamp() / QUARTER_HOUR_SECS,
        }
    }
}

/// Memoizes samples per (~100 m cell, quarter hour) so overlapping main and
/// alternative routes query the provider once.
pub struct CachedWeatherProvider {
    inner: Arc<dyn WeatherDataProvider>,
    cache: Mutex<LruCache<SampleKey, WeatherSample>>,
}

impl CachedWeatherProvider {
    pub fn new(inner: Arc<dyn WeatherDataProvider>, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn cached(&self, key: &SampleKey) -> Option<WeatherSample> {
        self.cache.lock().ok()?.get(key).copied()
    }

    fn store(&self, key: SampleKey, sample: WeatherSample) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, sample);
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WeatherDataProvider for CachedWeatherProvider {
    async fn weather_at(
        &self,
        lat: f64,
        lng: f64,
        at: DateTime<FixedOffset>,
    ) -> Result<WeatherSample, WeatherUnavailableError> {
        let key = SampleKey::new(lat, lng, at);
        if let Some(sample) = self.cached(&key) {
            tracing::debug!("Weather cache hit for {:.3}, {:.3}", lat, lng);
            return Ok(sample);
        }

        let sample = self.inner.weather_at(lat, lng, at).await?;
        self.store(key, sample);
        Ok(sample)
    }
}
