#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use backend::{
    AppState,
    analysis::{RouteAnalyzer, SamplingPolicy},
    directions::DirectionsResponse,
    error::{DirectionsError, MapGenerationError, WeatherUnavailableError},
    models::{TravelRequest, TravelRequestFields},
    planner::{DirectionsProvider, PlaceTimeZoneProvider, TravelPlanner},
    travel::{MapImage, MapRenderer, TravelAnalyzer},
    weather::{
        CheckpointWithWeather, WeatherConditionFactory, WeatherDataProvider,
        WeatherInformationService, WeatherSample,
    },
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};

pub const SAMPLE_DIRECTIONS: &str = include_str!("../../data/sample_directions.json");

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

pub fn sample_response() -> DirectionsResponse {
    DirectionsResponse::from_reader(SAMPLE_DIRECTIONS.as_bytes()).expect("sample directions")
}

/// The sample response trimmed to its main route.
pub fn single_route_response() -> DirectionsResponse {
    let mut response = sample_response();
    response.routes.truncate(1);
    response
}

pub struct FixedDirections {
    pub response: DirectionsResponse,
    pub calls: AtomicUsize,
}

impl FixedDirections {
    pub fn new(response: DirectionsResponse) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DirectionsProvider for FixedDirections {
    async fn directions(&self, _request: &TravelRequest) -> Result<DirectionsResponse, DirectionsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

pub struct FixedTimeZone(pub FixedOffset);

#[async_trait]
impl PlaceTimeZoneProvider for FixedTimeZone {
    async fn utc_offset(&self, _place_id: &str) -> Result<FixedOffset, DirectionsError> {
        Ok(self.0)
    }
}

/// Weather that worsens with latitude: dry in the south, wet further north.
/// Checkpoints north of `fail_north_of` are unavailable; delays are random-ish
/// per latitude so completions arrive out of order.
pub struct ScriptedWeather {
    pub fail_north_of: Option<f64>,
    pub jitter: bool,
    pub calls: AtomicUsize,
}

impl ScriptedWeather {
    pub fn clear() -> Self {
        Self {
            fail_north_of: None,
            jitter: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn jittered() -> Self {
        Self {
            jitter: true,
            ..Self::clear()
        }
    }

    pub fn failing_north_of(lat: f64) -> Self {
        Self {
            fail_north_of: Some(lat),
            ..Self::clear()
        }
    }
}

#[async_trait]
impl WeatherDataProvider for ScriptedWeather {
    async fn weather_at(
        &self,
        lat: f64,
        lng: f64,
        at: DateTime<FixedOffset>,
    ) -> Result<WeatherSample, WeatherUnavailableError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.jitter {
            let delay_ms = ((lng * 10_000.0).abs() as u64 * 7) % 40;
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if self.fail_north_of.is_some_and(|limit| lat > limit) {
            return Err(WeatherUnavailableError::NoData { lat, lng, at });
        }
        let wetness = ((lat - 44.2) * 20.0).clamp(0.0, 10.0);
        Ok(WeatherSample {
            freezing_level_height_m: Some(1_800.0),
            precipitation_mm: Some(wetness),
            snowfall_cm: Some(0.0),
            visibility_m: Some(15_000.0),
            wind_gusts_kmh: Some(12.0),
        })
    }
}

pub struct PngRenderer {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl PngRenderer {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl MapRenderer for PngRenderer {
    async fn render(
        &self,
        _checkpoints: &[CheckpointWithWeather],
        _encoded_polyline: &str,
    ) -> Result<MapImage, MapGenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(MapGenerationError::Status(503));
        }
        Ok(MapImage {
            bytes: PNG_SIGNATURE.to_vec(),
            content_type: "image/png".to_string(),
        })
    }
}

pub fn analyzer(weather: Arc<dyn WeatherDataProvider>, policy: SamplingPolicy) -> Arc<TravelAnalyzer> {
    let service = WeatherInformationService::new(WeatherConditionFactory::default(), weather)
        .with_concurrency(4)
        .with_timeout(Duration::from_secs(2));
    Arc::new(TravelAnalyzer::new(
        RouteAnalyzer::with_policy(policy),
        Arc::new(service),
    ))
}

pub fn planner(response: DirectionsResponse, weather: Arc<dyn WeatherDataProvider>) -> TravelPlanner {
    TravelPlanner::new(
        Arc::new(FixedDirections::new(response)),
        analyzer(weather, SamplingPolicy::DistanceWindow),
    )
    .with_time_zones(Arc::new(FixedTimeZone(
        FixedOffset::east_opt(3600).expect("offset"),
    )))
}

pub fn app_state(response: DirectionsResponse, weather: Arc<dyn WeatherDataProvider>, map: Arc<PngRenderer>) -> AppState {
    AppState {
        planner: Arc::new(planner(response, weather)),
        map_renderer: map,
    }
}

pub fn forli_bologna_request() -> TravelRequest {
    TravelRequest::new(TravelRequestFields {
        departure_location: Some("Forlì".into()),
        departure_place_id: Some("ChIJforli".into()),
        arrival_location: Some("Bologna".into()),
        arrival_place_id: Some("ChIJbologna".into()),
        departure_date: NaiveDate::from_ymd_opt(2025, 1, 15),
        departure_time: NaiveTime::from_hms_opt(8, 0, 0),
        departure_time_zone: FixedOffset::east_opt(3600),
    })
    .expect("valid request")
}
