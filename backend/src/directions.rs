//! Route structures returned by the routing collaborator.
//!
//! Field names follow the Directions JSON payload so responses (live or saved
//! to disk) deserialize without a mapping layer.

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::{
    error::{DirectionsError, ValidationError},
    models::{Coordinate, TextValue, TravelRequest, delta_from_seconds},
    planner::DirectionsProvider,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
}

impl DirectionsResponse {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DirectionsError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, DirectionsError> {
        let response: Self = serde_json::from_reader(reader)?;
        response.ensure_ok()
    }

    /// Reject any status other than `OK`, carrying the service message along.
    pub fn ensure_ok(self) -> Result<Self, DirectionsError> {
        if self.status == "OK" {
            return Ok(self);
        }
        Err(DirectionsError::Status {
            status: self.status,
            message: self.error_message.unwrap_or_default(),
        })
    }

    pub fn has_alternatives(&self) -> bool {
        self.routes.len() > 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsRoute {
    pub bounds: Bounds,
    pub legs: Vec<DirectionsLeg>,
    pub overview_polyline: EncodedPolyline,
    #[serde(default)]
    pub summary: String,
}

impl DirectionsRoute {
    /// Sum of all leg durations, rounded down to whole seconds.
    pub fn total_duration(&self) -> Result<TimeDelta, ValidationError> {
        let seconds: f64 = self.legs.iter().map(|leg| leg.duration.value).sum();
        if seconds < 0.0 {
            return Err(ValidationError::BelowMinimum {
                parameter: "route duration",
                value: seconds,
                min: 0.0,
            });
        }
        delta_from_seconds(seconds.floor()).ok_or_else(|| ValidationError::InvalidField {
            field: "route duration",
            reason: format!("{seconds} s is out of range"),
        })
    }

    pub fn step_count(&self) -> usize {
        self.legs.iter().map(|leg| leg.steps.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub northeast: Coordinate,
    pub southwest: Coordinate,
}

impl Bounds {
    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.lat >= self.southwest.lat
            && coord.lat <= self.northeast.lat
            && coord.lng >= self.southwest.lng
            && coord.lng <= self.northeast.lng
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedPolyline {
    pub points: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsLeg {
    #[serde(default)]
    pub start_address: String,
    pub start_location: Coordinate,
    #[serde(default)]
    pub end_address: String,
    pub end_location: Coordinate,
    pub steps: Vec<DirectionsStep>,
    pub distance: TextValue,
    pub duration: TextValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_in_traffic: Option<TextValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionsStep {
    pub start_location: Coordinate,
    pub end_location: Coordinate,
    pub polyline: EncodedPolyline,
    pub duration: TextValue,
    pub distance: TextValue,
    #[serde(default)]
    pub travel_mode: String,
}

/// Replays a Directions response saved to disk, whatever the request.
#[derive(Debug, Clone)]
pub struct SavedDirections {
    path: PathBuf,
}

impl SavedDirections {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DirectionsProvider for SavedDirections {
    async fn directions(&self, _request: &TravelRequest) -> Result<DirectionsResponse, DirectionsError> {
        let path = self.path.clone();
        tracing::debug!("Loading directions from {}", path.display());
        tokio::task::spawn_blocking(move || DirectionsResponse::from_file(path))
            .await
            .map_err(|err| DirectionsError::Io(std::io::Error::other(err)))?
    }
}
