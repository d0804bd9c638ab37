//! Open-Meteo 15-minute forecast adapter.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Url;
use serde::Deserialize;

use crate::error::WeatherUnavailableError;

use super::service::{nearest_quarter_hour, WeatherDataProvider, WeatherSample};

pub const DEFAULT_OPEN_METEO_BASE: &str = "https://api.open-meteo.com";

const MINUTELY_FIELDS: &str = "precipitation,snowfall,freezing_level_height,wind_gusts_10m,visibility";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn forecast_url(&self, lat: f64, lng: f64, slot: DateTime<Utc>) -> Result<Url, String> {
        let date = slot.format("%Y-%m-%d").to_string();
        Url::parse_with_params(
            &format!("{}/v1/forecast", self.base_url),
            [
                ("latitude", format!("{lat:.6}")),
                ("longitude", format!("{lng:.6}")),
                ("minutely_15", MINUTELY_FIELDS.to_string()),
                ("start_date", date.clone()),
                ("end_date", date),
                ("timezone", "GMT".to_string()),
            ],
        )
        .map_err(|err| err.to_string())
    }
}

#[async_trait]
impl WeatherDataProvider for OpenMeteoClient {
    async fn weather_at(
        &self,
        lat: f64,
        lng: f64,
        at: DateTime<FixedOffset>,
    ) -> Result<WeatherSample, WeatherUnavailableError> {
        let slot = nearest_quarter_hour(at);
        let url = self
            .forecast_url(lat, lng, slot)
            .map_err(|_| WeatherUnavailableError::NoData { lat, lng, at })?;

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Open-Meteo answered {} for {:.4}, {:.4}", status, lat, lng);
            return Err(WeatherUnavailableError::Status(status.as_u16()));
        }

        let forecast: ForecastResponse = response.json().await?;
        forecast
            .sample_at(slot)
            .ok_or(WeatherUnavailableError::NoData { lat, lng, at })
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    minutely_15: Option<Minutely15>,
}

impl ForecastResponse {
    fn sample_at(&self, slot: DateTime<Utc>) -> Option<WeatherSample> {
        self.minutely_15.as_ref()?.sample_at(slot)
    }
}

#[derive(Debug, Deserialize)]
struct Minutely15 {
    time: Vec<String>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    snowfall: Vec<Option<f64>>,
    #[serde(default)]
    freezing_level_height: Vec<Option<f64>>,
    #[serde(default)]
    wind_gusts_10m: Vec<Option<f64>>,
    #[serde(default)]
    visibility: Vec<Option<f64>>,
}

impl Minutely15 {
    fn sample_at(&self, slot: DateTime<Utc>) -> Option<WeatherSample> {
        let key = slot.format(TIME_FORMAT).to_string();
        let index = self.time.iter().position(|time| *time == key)?;
        Some(WeatherSample {
            freezing_level_height_m: value_at(&self.freezing_level_height, index),
            precipitation_mm: value_at(&self.precipitation, index),
            snowfall_cm: value_at(&self.snowfall, index),
            visibility_m: value_at(&self.visibility, index),
            wind_gusts_kmh: value_at(&self.wind_gusts_10m, index),
        })
    }
}

fn value_at(series: &[Option<f64>], index: usize) -> Option<f64> {
    series.get(index).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORECAST: &str = r#"{
        "latitude": 44.22,
        "longitude": 12.04,
        "minutely_15": {
            "time": ["2025-01-15T07:00", "2025-01-15T07:15", "2025-01-15T07:30"],
            "precipitation": [0.0, 1.2, 0.4],
            "snowfall": [0.0, 0.0, null],
            "freezing_level_height": [900.0, 850.0, 820.0],
            "wind_gusts_10m": [12.0, 18.5, 22.0],
            "visibility": [24000.0, 9000.0, 7000.0]
        }
    }"#;

    fn slot(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_sample_at_matching_slot() {
        let forecast: ForecastResponse = serde_json::from_str(FORECAST).unwrap();
        let sample = forecast.sample_at(slot("2025-01-15T07:15:00Z")).unwrap();
        assert_eq!(sample.precipitation_mm, Some(1.2));
        assert_eq!(sample.freezing_level_height_m, Some(850.0));
        assert_eq!(sample.wind_gusts_kmh, Some(18.5));
        assert_eq!(sample.visibility_m, Some(9000.0));
    }

    #[test]
    fn test_null_values_are_absent() {
        let forecast: ForecastResponse = serde_json::from_str(FORECAST).unwrap();
        let sample = forecast.sample_at(slot("2025-01-15T07:30:00Z")).unwrap();
        assert_eq!(sample.snowfall_cm, None);
        assert_eq!(sample.precipitation_mm, Some(0.4));
    }

    #[test]
    fn test_missing_slot_has_no_sample() {
        let forecast: ForecastResponse = serde_json::from_str(FORECAST).unwrap();
        assert!(forecast.sample_at(slot("2025-01-15T09:00:00Z")).is_none());
    }

    #[test]
    fn test_missing_block_has_no_sample() {
        let forecast: ForecastResponse = serde_json::from_str(r#"{"latitude": 1.0}"#).unwrap();
        assert!(forecast.sample_at(slot("2025-01-15T07:00:00Z")).is_none());
    }

    #[test]
    fn test_forecast_url() {
        let client = OpenMeteoClient::new(reqwest::Client::new(), "https://api.open-meteo.com/");
        let url = client
            .forecast_url(44.222008, 12.0408666, slot("2025-01-15T23:45:00Z"))
            .unwrap();

        assert_eq!(url.path(), "/v1/forecast");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("latitude".into(), "44.222008".into())));
        assert!(query.contains(&("start_date".into(), "2025-01-15".into())));
        assert!(query.contains(&("end_date".into(), "2025-01-15".into())));
        assert!(query.contains(&("timezone".into(), "GMT".into())));
        assert!(query.contains(&("minutely_15".into(), MINUTELY_FIELDS.into())));
    }
}
