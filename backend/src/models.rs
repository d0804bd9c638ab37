use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use shared::Coordinate;

/// A `{ text, value }` pair as emitted by the routing collaborator for
/// durations (seconds) and distances (meters).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextValue {
    pub text: String,
    pub value: f64,
}

impl TextValue {
    pub fn new(text: impl Into<String>, value: f64) -> Self {
        Self {
            text: text.into(),
            value,
        }
    }

    pub fn seconds(value: f64) -> Self {
        Self::new(format!("{value:.1} s"), value)
    }

    pub fn meters(value: f64) -> Self {
        Self::new(format!("{value:.1} m"), value)
    }
}

/// Fractional seconds as a [`TimeDelta`] at millisecond resolution. `None`
/// when the value is not finite or does not fit a `TimeDelta`.
pub fn delta_from_seconds(seconds: f64) -> Option<TimeDelta> {
    let millis = (seconds * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    TimeDelta::try_milliseconds(millis as i64)
}

/// A short route segment with interpolated duration and distance.
#[derive(Debug, Clone, PartialEq)]
pub struct FineStep {
    start: Coordinate,
    end: Coordinate,
    duration: TextValue,
    distance: TextValue,
}

impl FineStep {
    pub fn new(start: Coordinate, end: Coordinate, duration: TextValue, distance: TextValue) -> Self {
        Self {
            start,
            end,
            duration,
            distance,
        }
    }

    pub fn from_values(start: Coordinate, end: Coordinate, duration_s: f64, distance_m: f64) -> Self {
        Self::new(
            start,
            end,
            TextValue::seconds(duration_s),
            TextValue::meters(distance_m),
        )
    }

    pub fn start(&self) -> Coordinate {
        self.start
    }

    pub fn end(&self) -> Coordinate {
        self.end
    }

    pub fn duration(&self) -> &TextValue {
        &self.duration
    }

    pub fn distance(&self) -> &TextValue {
        &self.distance
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration.value
    }

    pub fn distance_meters(&self) -> f64 {
        self.distance.value
    }
}

/// A timestamped point along a route.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    latitude: f64,
    longitude: f64,
    arrival_time: DateTime<FixedOffset>,
}

impl Checkpoint {
    pub fn new(latitude: f64, longitude: f64, arrival_time: DateTime<FixedOffset>) -> Self {
        Self {
            latitude,
            longitude,
            arrival_time,
        }
    }

    pub fn at(position: Coordinate, arrival_time: DateTime<FixedOffset>) -> Self {
        Self::new(position.lat, position.lng, arrival_time)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn arrival_time(&self) -> DateTime<FixedOffset> {
        self.arrival_time
    }
}

/// Plain record of everything a travel request needs. Validated once by
/// [`TravelRequest::new`].
#[derive(Debug, Clone, Default)]
pub struct TravelRequestFields {
    pub departure_location: Option<String>,
    pub departure_place_id: Option<String>,
    pub arrival_location: Option<String>,
    pub arrival_place_id: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub departure_time: Option<NaiveTime>,
    pub departure_time_zone: Option<FixedOffset>,
}

impl TravelRequestFields {
    /// Parse the HTTP payload. Absent fields stay `None`; malformed ones fail.
    pub fn from_payload(payload: &shared::TravelRequestPayload) -> Result<Self, ValidationError> {
        let departure_date = payload
            .departure_date
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|err| {
                    ValidationError::InvalidField {
                        field: "departure date",
                        reason: err.to_string(),
                    }
                })
            })
            .transpose()?;

        let departure_time = payload
            .departure_time
            .as_deref()
            .map(|raw| {
                let raw = raw.trim();
                NaiveTime::parse_from_str(raw, "%H:%M")
                    .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
                    .map_err(|err| ValidationError::InvalidField {
                        field: "departure time",
                        reason: err.to_string(),
                    })
            })
            .transpose()?;

        let departure_time_zone = payload
            .utc_offset_minutes
            .map(offset_from_minutes)
            .transpose()?;

        Ok(Self {
            departure_location: payload.departure_location.clone(),
            departure_place_id: payload.departure_place_id.clone(),
            arrival_location: payload.arrival_location.clone(),
            arrival_place_id: payload.arrival_place_id.clone(),
            departure_date,
            departure_time,
            departure_time_zone,
        })
    }
}

pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, ValidationError> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| ValidationError::InvalidField {
            field: "utc offset",
            reason: format!("{minutes} minutes is out of range"),
        })
}

/// A complete, immutable request for a drive between two places.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelRequest {
    departure_location: String,
    departure_place_id: String,
    arrival_location: String,
    arrival_place_id: String,
    departure_date: NaiveDate,
    departure_time: NaiveTime,
    departure_time_zone: FixedOffset,
    departure_date_time: DateTime<FixedOffset>,
}

impl TravelRequest {
    pub fn new(fields: TravelRequestFields) -> Result<Self, ValidationError> {
        let departure_location = required_text(fields.departure_location, "departure location")?;
        let departure_place_id = required_text(fields.departure_place_id, "departure place id")?;
        let arrival_location = required_text(fields.arrival_location, "arrival location")?;
        let arrival_place_id = required_text(fields.arrival_place_id, "arrival place id")?;
        let departure_date = fields
            .departure_date
            .ok_or(ValidationError::IncompleteRequest("departure date"))?;
        let departure_time = fields
            .departure_time
            .ok_or(ValidationError::IncompleteRequest("departure time"))?;
        let departure_time_zone = fields
            .departure_time_zone
            .ok_or(ValidationError::IncompleteRequest("departure time zone"))?;

        let departure_date_time = departure_time_zone
            .from_local_datetime(&departure_date.and_time(departure_time))
            .single()
            .ok_or_else(|| ValidationError::InvalidField {
                field: "departure date time",
                reason: "ambiguous local time".to_string(),
            })?;

        Ok(Self {
            departure_location,
            departure_place_id,
            arrival_location,
            arrival_place_id,
            departure_date,
            departure_time,
            departure_time_zone,
            departure_date_time,
        })
    }

    pub fn departure_location(&self) -> &str {
        &self.departure_location
    }

    pub fn departure_place_id(&self) -> &str {
        &self.departure_place_id
    }

    pub fn arrival_location(&self) -> &str {
        &self.arrival_location
    }

    pub fn arrival_place_id(&self) -> &str {
        &self.arrival_place_id
    }

    pub fn departure_date(&self) -> NaiveDate {
        self.departure_date
    }

    pub fn departure_time(&self) -> NaiveTime {
        self.departure_time
    }

    pub fn departure_time_zone(&self) -> FixedOffset {
        self.departure_time_zone
    }

    pub fn departure_date_time(&self) -> DateTime<FixedOffset> {
        self.departure_date_time
    }
}

fn required_text(value: Option<String>, name: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ValidationError::IncompleteRequest(name)),
    }
}
