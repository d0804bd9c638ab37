use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Body of `POST /api/travel`.
///
/// Date and time are local to the departure place; `utc_offset_minutes` is the
/// offset of that place (as reported by the Place Details `utc_offset` field).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelRequestPayload {
    pub departure_location: Option<String>,
    pub departure_place_id: Option<String>,
    pub arrival_location: Option<String>,
    pub arrival_place_id: Option<String>,
    /// `YYYY-MM-DD`
    pub departure_date: Option<String>,
    /// `HH:MM`
    pub departure_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSummary {
    pub name: String,
    pub intensity_score: u8,
    pub weighted_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSummary {
    pub lat: f64,
    pub lng: f64,
    /// RFC 3339 timestamp carrying the departure offset.
    pub arrival_time: String,
    pub weather_score: u8,
    pub conditions: Vec<ConditionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelSummary {
    pub summary: String,
    pub duration_seconds: i64,
    pub duration_text: String,
    pub arrival_time: String,
    pub encoded_polyline: String,
    pub meteo_score: u8,
    pub checkpoints: Vec<CheckpointSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TravelPlanResponse {
    pub main: TravelSummary,
    #[serde(default)]
    pub alternatives: Vec<TravelSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapResponse {
    pub png_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
