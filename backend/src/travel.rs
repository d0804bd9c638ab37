use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, SecondsFormat, TimeDelta};
use once_cell::sync::OnceCell;
use shared::{CheckpointSummary, ConditionSummary, TravelSummary};

use crate::{
    analysis::{CheckpointGenerator, RouteAnalyzer},
    directions::DirectionsRoute,
    error::{MapGenerationError, TravelError, ValidationError},
    weather::{CheckpointWithWeather, WeatherInformationService},
};

/// A rendered route map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait MapRenderer: Send + Sync {
    async fn render(
        &self,
        checkpoints: &[CheckpointWithWeather],
        encoded_polyline: &str,
    ) -> Result<MapImage, MapGenerationError>;
}

/// The analysis of one candidate route.
#[derive(Debug)]
pub struct TravelModeResult {
    checkpoints: Vec<CheckpointWithWeather>,
    summary: String,
    encoded_polyline: String,
    duration: TimeDelta,
    departure: DateTime<FixedOffset>,
    arrival: DateTime<FixedOffset>,
    meteo_score: OnceCell<u8>,
    map_image: tokio::sync::OnceCell<MapImage>,
}

impl TravelModeResult {
    /// Fails when the arrival time falls outside the calendar range.
    pub fn new(
        checkpoints: Vec<CheckpointWithWeather>,
        summary: impl Into<String>,
        encoded_polyline: impl Into<String>,
        duration: TimeDelta,
        departure: DateTime<FixedOffset>,
    ) -> Result<Self, ValidationError> {
        let arrival = departure
            .checked_add_signed(duration)
            .ok_or_else(|| ValidationError::InvalidField {
                field: "route duration",
                reason: format!("arrival {duration} after {departure} is out of range"),
            })?;
        Ok(Self {
            checkpoints,
            summary: summary.into(),
            encoded_polyline: encoded_polyline.into(),
            duration,
            departure,
            arrival,
            meteo_score: OnceCell::new(),
            map_image: tokio::sync::OnceCell::new(),
        })
    }

    pub fn checkpoints(&self) -> &[CheckpointWithWeather] {
        &self.checkpoints
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn encoded_polyline(&self) -> &str {
        &self.encoded_polyline
    }

    pub fn duration(&self) -> TimeDelta {
        self.duration
    }

    pub fn departure(&self) -> DateTime<FixedOffset> {
        self.departure
    }

    /// Mean of the checkpoint scores, rounded half-up.
    pub fn meteo_score(&self) -> Result<u8, TravelError> {
        if self.checkpoints.is_empty() {
            return Err(TravelError::NoCheckpoints);
        }
        Ok(*self.meteo_score.get_or_init(|| {
            let total: u32 = self
                .checkpoints
                .iter()
                .map(|checkpoint| u32::from(checkpoint.weather_score()))
                .sum();
            let mean = f64::from(total) / self.checkpoints.len() as f64;
            (mean + 0.5).floor() as u8
        }))
    }

    pub fn arrival_time(&self) -> DateTime<FixedOffset> {
        self.arrival
    }

    pub fn duration_string(&self) -> String {
        let minutes = self.duration.num_minutes();
        format!("{} ore {} minuti", minutes / 60, minutes % 60)
    }

    /// Rendered once per result. A failed render is returned and retried on
    /// the next call.
    pub async fn map_image(&self, renderer: &dyn MapRenderer) -> Result<&MapImage, MapGenerationError> {
        self.map_image
            .get_or_try_init(|| renderer.render(&self.checkpoints, &self.encoded_polyline))
            .await
    }

    pub fn to_summary(&self) -> Result<TravelSummary, TravelError> {
        Ok(TravelSummary {
            summary: self.summary.clone(),
            duration_seconds: self.duration.num_seconds(),
            duration_text: self.duration_string(),
            arrival_time: self.arrival_time().to_rfc3339_opts(SecondsFormat::Secs, false),
            encoded_polyline: self.encoded_polyline.clone(),
            meteo_score: self.meteo_score()?,
            checkpoints: self.checkpoints.iter().map(checkpoint_summary).collect(),
        })
    }
}

fn checkpoint_summary(checkpoint: &CheckpointWithWeather) -> CheckpointSummary {
    let point = checkpoint.checkpoint();
    CheckpointSummary {
        lat: point.latitude(),
        lng: point.longitude(),
        arrival_time: point
            .arrival_time()
            .to_rfc3339_opts(SecondsFormat::Secs, false),
        weather_score: checkpoint.weather_score(),
        conditions: checkpoint
            .report()
            .conditions()
            .iter()
            .map(|condition| ConditionSummary {
                name: condition.name().to_string(),
                intensity_score: condition.intensity_score(),
                weighted_score: condition.weighted_intensity_score(),
            })
            .collect(),
    }
}

/// Runs one route through sampling, timing and weather enrichment.
pub struct TravelAnalyzer {
    route_analyzer: RouteAnalyzer,
    checkpoint_generator: CheckpointGenerator,
    weather: Arc<WeatherInformationService>,
}

impl TravelAnalyzer {
    pub fn new(route_analyzer: RouteAnalyzer, weather: Arc<WeatherInformationService>) -> Self {
        Self {
            route_analyzer,
            checkpoint_generator: CheckpointGenerator,
            weather,
        }
    }

    pub async fn analyze_route(
        &self,
        route: &DirectionsRoute,
        departure: DateTime<FixedOffset>,
    ) -> Result<TravelModeResult, TravelError> {
        let points = self.route_analyzer.calculate_intermediate_points(route)?;
        let checkpoints = self
            .checkpoint_generator
            .generate_checkpoints(&points, departure)?;
        tracing::info!(
            "Route '{}': {} steps sampled into {} checkpoints",
            route.summary,
            route.step_count(),
            checkpoints.len()
        );

        let enriched = self
            .weather
            .enrich_all(&checkpoints)
            .await
            .inspect_err(|err| tracing::warn!("Weather enrichment failed for '{}': {}", route.summary, err))?;

        let duration = route.total_duration()?;
        Ok(TravelModeResult::new(
            enriched,
            route.summary.clone(),
            route.overview_polyline.points.clone(),
            duration,
            departure,
        )?)
    }
}
