use chrono::{DateTime, FixedOffset};
use thiserror::Error;

use crate::polyline::PolylineError;

/// Construction-time validation failures. No partially built value is ever
/// returned alongside one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{parameter} cannot be NaN")]
    NotANumber { parameter: &'static str },
    #[error("{parameter} cannot be infinite")]
    Infinite { parameter: &'static str },
    #[error("{parameter} cannot be less than {min:.1} (got {value})")]
    BelowMinimum {
        parameter: &'static str,
        value: f64,
        min: f64,
    },
    #[error("score must be between 0 and 100")]
    ScoreOutOfRange(i32),
    #[error("incomplete travel request: {0} is missing")]
    IncompleteRequest(&'static str),
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("invalid calibration for {condition}: {reason}")]
    InvalidCalibration {
        condition: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteUnavailableError {
    #[error("the routing service returned no routes")]
    NoRoutes,
    #[error("no alternative routes are available")]
    NoAlternatives,
    #[error("the route has no steps to analyze")]
    NoSteps,
}

/// The weather collaborator could not supply usable data for one checkpoint.
/// Aborts the analysis of the whole route.
#[derive(Debug, Error)]
pub enum WeatherUnavailableError {
    #[error("no weather data available for checkpoint {lat}, {lng} at {at}")]
    NoData {
        lat: f64,
        lng: f64,
        at: DateTime<FixedOffset>,
    },
    #[error("weather request for checkpoint {lat}, {lng} timed out after {timeout:?}")]
    Timeout {
        lat: f64,
        lng: f64,
        timeout: std::time::Duration,
    },
    #[error("unrealistic weather data for checkpoint {lat}, {lng}: {source}")]
    Invalid {
        lat: f64,
        lng: f64,
        source: ValidationError,
    },
    #[error("weather provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("weather provider returned status {0}")]
    Status(u16),
}

#[derive(Debug, Error)]
pub enum MapGenerationError {
    #[error("map request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("map service returned status {0}")]
    Status(u16),
    #[error("invalid map request url: {0}")]
    Url(String),
    #[error(transparent)]
    Category(#[from] ValidationError),
}

#[derive(Debug, Error)]
pub enum DirectionsError {
    #[error("directions request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("directions service answered {status}: {message}")]
    Status { status: String, message: String },
    #[error("invalid directions payload: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read directions file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid request url: {0}")]
    Url(String),
}

/// Everything that can stop the analysis of a travel request.
#[derive(Debug, Error)]
pub enum TravelError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    RouteUnavailable(#[from] RouteUnavailableError),
    #[error(transparent)]
    Weather(#[from] WeatherUnavailableError),
    #[error(transparent)]
    Directions(#[from] DirectionsError),
    #[error(transparent)]
    MapGeneration(#[from] MapGenerationError),
    #[error("invalid step geometry: {0}")]
    Geometry(#[from] PolylineError),
    #[error("cannot compute a meteo score without checkpoints")]
    NoCheckpoints,
}
