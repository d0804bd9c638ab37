//! Google Maps Platform adapters: Directions, Place Details and Static Maps.

use async_trait::async_trait;
use chrono::FixedOffset;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{
    directions::DirectionsResponse,
    error::{DirectionsError, MapGenerationError},
    models::{offset_from_minutes, TravelRequest},
    planner::{DirectionsProvider, PlaceTimeZoneProvider},
    travel::{MapImage, MapRenderer},
    weather::{CheckpointWithWeather, WeatherScoreCategory},
};

pub const DEFAULT_GOOGLE_MAPS_BASE: &str = "https://maps.googleapis.com";

const LANGUAGE: &str = "it";
const MAP_SIZE: &str = "650x488";
const MAP_SCALE: &str = "2";

#[derive(Debug, Clone)]
pub struct GoogleMapsClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl GoogleMapsClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/maps/api/{}", self.base_url, path)
    }

    pub fn directions_url(&self, request: &TravelRequest) -> Result<Url, DirectionsError> {
        Url::parse_with_params(
            &self.endpoint("directions/json"),
            [
                ("origin", format!("place_id:{}", request.departure_place_id())),
                ("destination", format!("place_id:{}", request.arrival_place_id())),
                ("departure_time", request.departure_date_time().timestamp().to_string()),
                ("alternatives", "true".to_string()),
                ("language", LANGUAGE.to_string()),
                ("units", "metric".to_string()),
                ("key", self.api_key.clone()),
            ],
        )
        .map_err(|err| DirectionsError::Url(err.to_string()))
    }

    pub fn place_details_url(&self, place_id: &str) -> Result<Url, DirectionsError> {
        Url::parse_with_params(
            &self.endpoint("place/details/json"),
            [
                ("fields", "utc_offset"),
                ("place_id", place_id),
                ("key", self.api_key.as_str()),
            ],
        )
        .map_err(|err| DirectionsError::Url(err.to_string()))
    }

    /// Static map with the route path and one colored marker per checkpoint
    /// whose weather is not excellent.
    pub fn static_map_url(
        &self,
        checkpoints: &[CheckpointWithWeather],
        encoded_polyline: &str,
    ) -> Result<Url, MapGenerationError> {
        let mut params = vec![
            ("size", MAP_SIZE.to_string()),
            ("scale", MAP_SCALE.to_string()),
            ("language", LANGUAGE.to_string()),
            ("path", format!("enc:{encoded_polyline}")),
        ];
        for checkpoint in checkpoints {
            let category = WeatherScoreCategory::from_score(i32::from(checkpoint.weather_score()))?;
            if let Some(color) = category.marker_color() {
                let point = checkpoint.checkpoint();
                params.push((
                    "markers",
                    format!("color:{}|{:.6},{:.6}", color, point.latitude(), point.longitude()),
                ));
            }
        }
        params.push(("key", self.api_key.clone()));

        Url::parse_with_params(&self.endpoint("staticmap"), params)
            .map_err(|err| MapGenerationError::Url(err.to_string()))
    }
}

#[async_trait]
impl DirectionsProvider for GoogleMapsClient {
    async fn directions(&self, request: &TravelRequest) -> Result<DirectionsResponse, DirectionsError> {
        let url = self.directions_url(request)?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DirectionsError::Status {
                status: response.status().to_string(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let body = response.bytes().await?;
        DirectionsResponse::from_reader(body.as_ref())
    }
}

#[derive(Debug, Deserialize)]
struct PlaceDetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    result: Option<PlaceDetails>,
}

#[derive(Debug, Deserialize)]
struct PlaceDetails {
    utc_offset: Option<i32>,
}

impl PlaceDetailsResponse {
    fn utc_offset(self) -> Result<FixedOffset, DirectionsError> {
        if self.status != "OK" {
            return Err(DirectionsError::Status {
                status: self.status,
                message: self.error_message.unwrap_or_default(),
            });
        }
        let minutes = self
            .result
            .and_then(|details| details.utc_offset)
            .ok_or_else(|| DirectionsError::Status {
                status: "MISSING_UTC_OFFSET".to_string(),
                message: "place details carry no utc_offset".to_string(),
            })?;
        offset_from_minutes(minutes).map_err(|err| DirectionsError::Status {
            status: "INVALID_UTC_OFFSET".to_string(),
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl PlaceTimeZoneProvider for GoogleMapsClient {
    async fn utc_offset(&self, place_id: &str) -> Result<FixedOffset, DirectionsError> {
        let url = self.place_details_url(place_id)?;
        let details: PlaceDetailsResponse = self.http.get(url).send().await?.json().await?;
        details.utc_offset()
    }
}

#[async_trait]
impl MapRenderer for GoogleMapsClient {
    async fn render(
        &self,
        checkpoints: &[CheckpointWithWeather],
        encoded_polyline: &str,
    ) -> Result<MapImage, MapGenerationError> {
        let url = self.static_map_url(checkpoints, encoded_polyline)?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Static map request failed with status {}", status);
            return Err(MapGenerationError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let bytes = response.bytes().await?.to_vec();
        tracing::debug!("Rendered static map ({} bytes)", bytes.len());

        Ok(MapImage {
            bytes,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    use crate::{
        models::{Checkpoint, TravelRequestFields},
        weather::{WeatherConditionFactory, WeatherReport},
    };

    fn client() -> GoogleMapsClient {
        GoogleMapsClient::new(Client::new(), "https://maps.example.test/", "secret")
    }

    fn query(url: &Url) -> Vec<(String, String)> {
        url.query_pairs().into_owned().collect()
    }

    fn request() -> TravelRequest {
        TravelRequest::new(TravelRequestFields {
            departure_location: Some("Forlì".into()),
            departure_place_id: Some("ChIJforli".into()),
            arrival_location: Some("Bologna".into()),
            arrival_place_id: Some("ChIJbologna".into()),
            departure_date: NaiveDate::from_ymd_opt(2025, 1, 15),
            departure_time: NaiveTime::from_hms_opt(8, 0, 0),
            departure_time_zone: FixedOffset::east_opt(3600),
        })
        .unwrap()
    }

    fn scored(lat: f64, precipitation_mm: f64) -> CheckpointWithWeather {
        let departure = request().departure_date_time();
        let condition = WeatherConditionFactory::default()
            .create_precipitation(precipitation_mm)
            .unwrap();
        CheckpointWithWeather::new(
            Checkpoint::new(lat, 12.0, departure),
            WeatherReport::new(vec![condition]),
        )
    }

    #[test]
    fn test_directions_url() {
        let url = client().directions_url(&request()).unwrap();
        assert_eq!(url.path(), "/maps/api/directions/json");

        let pairs = query(&url);
        assert!(pairs.contains(&("origin".into(), "place_id:ChIJforli".into())));
        assert!(pairs.contains(&("destination".into(), "place_id:ChIJbologna".into())));
        assert!(pairs.contains(&("departure_time".into(), "1736924400".into())));
        assert!(pairs.contains(&("alternatives".into(), "true".into())));
        assert!(pairs.contains(&("language".into(), "it".into())));
        assert!(pairs.contains(&("key".into(), "secret".into())));
    }

    #[test]
    fn test_static_map_url_markers() {
        // 0 mm -> excellent (no marker), 10 mm -> scored below excellent
        let checkpoints = vec![scored(44.0, 0.0), scored(44.5, 10.0)];
        let url = client().static_map_url(&checkpoints, "_p~iF~ps|U").unwrap();

        let pairs = query(&url);
        assert!(pairs.contains(&("size".into(), "650x488".into())));
        assert!(pairs.contains(&("scale".into(), "2".into())));
        assert!(pairs.contains(&("path".into(), "enc:_p~iF~ps|U".into())));

        let markers: Vec<&String> = pairs
            .iter()
            .filter(|(key, _)| key == "markers")
            .map(|(_, value)| value)
            .collect();
        let expected_color = WeatherScoreCategory::from_score(i32::from(checkpoints[1].weather_score()))
            .unwrap()
            .marker_color();
        match expected_color {
            Some(color) => assert_eq!(markers, vec![&format!("color:{color}|44.500000,12.000000")]),
            None => assert!(markers.is_empty()),
        }
    }

    #[test]
    fn test_place_details_offset() {
        let payload = r#"{"status": "OK", "result": {"utc_offset": 120}}"#;
        let details: PlaceDetailsResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(details.utc_offset().unwrap(), FixedOffset::east_opt(7200).unwrap());
    }

    #[test]
    fn test_place_details_error_status() {
        let payload = r#"{"status": "INVALID_REQUEST", "error_message": "bad place"}"#;
        let details: PlaceDetailsResponse = serde_json::from_str(payload).unwrap();
        assert!(matches!(
            details.utc_offset(),
            Err(DirectionsError::Status { ref message, .. }) if message == "bad place"
        ));
    }
}
