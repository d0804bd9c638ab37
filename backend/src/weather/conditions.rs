//! Weather measurements turned into bounded, weighted risk.
//!
//! Each condition keeps the validated raw value it was built from. Intensity
//! curves and weights come from a [`Calibration`], whose `Default` holds the
//! production tables.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MAX_INTENSITY: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    FreezingRisk,
    Precipitation,
    Snowfall,
    Visibility,
    WindGust,
}

impl ConditionKind {
    pub const ALL: [ConditionKind; 5] = [
        ConditionKind::FreezingRisk,
        ConditionKind::Precipitation,
        ConditionKind::Snowfall,
        ConditionKind::Visibility,
        ConditionKind::WindGust,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::FreezingRisk => "Freezing Risk",
            Self::Precipitation => "Precipitation",
            Self::Snowfall => "Snowfall",
            Self::Visibility => "Visibility",
            Self::WindGust => "Wind Gust",
        }
    }

    /// Name of the raw measurement, used in validation messages.
    pub fn parameter(self) -> &'static str {
        match self {
            Self::FreezingRisk => "freezing level height",
            Self::Precipitation => "precipitation amount",
            Self::Snowfall => "snowfall amount",
            Self::Visibility => "visibility",
            Self::WindGust => "wind gust speed",
        }
    }

    /// Smallest physically plausible raw value.
    pub fn minimum(self) -> f64 {
        match self {
            Self::FreezingRisk => -500.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    value: f64,
    intensity_score: u8,
    weight: f64,
}

/// One scored weather phenomenon at one checkpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeatherCondition {
    /// Freezing level height in meters.
    FreezingRisk(Measurement),
    /// Precipitation in millimeters.
    Precipitation(Measurement),
    /// Snowfall in centimeters.
    Snowfall(Measurement),
    /// Visibility in meters.
    Visibility(Measurement),
    /// Wind gusts in km/h.
    WindGust(Measurement),
}

impl WeatherCondition {
    pub fn kind(&self) -> ConditionKind {
        match self {
            Self::FreezingRisk(_) => ConditionKind::FreezingRisk,
            Self::Precipitation(_) => ConditionKind::Precipitation,
            Self::Snowfall(_) => ConditionKind::Snowfall,
            Self::Visibility(_) => ConditionKind::Visibility,
            Self::WindGust(_) => ConditionKind::WindGust,
        }
    }

    fn measurement(&self) -> &Measurement {
        match self {
            Self::FreezingRisk(m)
            | Self::Precipitation(m)
            | Self::Snowfall(m)
            | Self::Visibility(m)
            | Self::WindGust(m) => m,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().display_name()
    }

    pub fn raw_value(&self) -> f64 {
        self.measurement().value
    }

    pub fn intensity_score(&self) -> u8 {
        self.measurement().intensity_score
    }

    pub fn weight(&self) -> f64 {
        self.measurement().weight
    }

    pub fn weighted_intensity_score(&self) -> f64 {
        f64::from(self.intensity_score()) * self.weight()
    }

    pub fn worst_weighted_intensity_score(&self) -> f64 {
        f64::from(MAX_INTENSITY) * self.weight()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityLevel {
    pub min_value: f64,
    pub score: u8,
}

const fn level(min_value: f64, score: u8) -> IntensityLevel {
    IntensityLevel { min_value, score }
}

/// Step curve for one condition: the first level whose `min_value` the raw
/// value reaches wins, otherwise `fallback_score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionCalibration {
    pub weight: f64,
    pub levels: Vec<IntensityLevel>,
    pub fallback_score: u8,
}

impl ConditionCalibration {
    pub fn intensity_score(&self, value: f64) -> u8 {
        self.levels
            .iter()
            .find(|level| value >= level.min_value)
            .map_or(self.fallback_score, |level| level.score)
    }

    fn validate(&self, kind: ConditionKind) -> Result<(), ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidCalibration {
            condition: kind.display_name(),
            reason,
        };

        if !self.weight.is_finite() || self.weight <= 0.0 || self.weight > 1.0 {
            return Err(invalid(format!("weight {} must be in (0, 1]", self.weight)));
        }
        if self.levels.is_empty() {
            return Err(invalid("at least one level is required".to_string()));
        }
        if self.levels.iter().any(|level| !level.min_value.is_finite()) {
            return Err(invalid("level thresholds must be finite".to_string()));
        }
        if self.levels.windows(2).any(|w| w[0].min_value <= w[1].min_value) {
            return Err(invalid("level thresholds must be strictly decreasing".to_string()));
        }

        let scores: Vec<u8> = self
            .levels
            .iter()
            .map(|level| level.score)
            .chain(std::iter::once(self.fallback_score))
            .collect();
        if scores.iter().any(|score| *score > MAX_INTENSITY) {
            return Err(invalid(format!("scores cannot exceed {MAX_INTENSITY}")));
        }
        let rising = scores.windows(2).all(|w| w[0] <= w[1]);
        let falling = scores.windows(2).all(|w| w[0] >= w[1]);
        if !rising && !falling {
            return Err(invalid("scores must be monotonic".to_string()));
        }

        Ok(())
    }
}

/// Intensity curves and weights for every condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub freezing_risk: ConditionCalibration,
    pub precipitation: ConditionCalibration,
    pub snowfall: ConditionCalibration,
    pub visibility: ConditionCalibration,
    pub wind_gust: ConditionCalibration,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            // lower freezing level means higher risk
            freezing_risk: ConditionCalibration {
                weight: 1.0,
                levels: vec![
                    level(1_500.0, 0),
                    level(1_000.0, 20),
                    level(500.0, 40),
                    level(200.0, 70),
                    level(0.0, 100),
                ],
                fallback_score: 100,
            },
            precipitation: ConditionCalibration {
                weight: 0.72,
                levels: vec![
                    level(8.0, 100),
                    level(4.0, 70),
                    level(1.0, 40),
                    level(0.1, 20),
                    level(0.0, 0),
                ],
                fallback_score: 0,
            },
            snowfall: ConditionCalibration {
                weight: 0.83,
                levels: vec![
                    level(3.0, 100),
                    level(1.5, 70),
                    level(0.5, 40),
                    level(0.1, 20),
                    level(0.0, 0),
                ],
                fallback_score: 0,
            },
            visibility: ConditionCalibration {
                weight: 0.89,
                levels: vec![
                    level(10_000.0, 0),
                    level(7_000.0, 20),
                    level(4_000.0, 40),
                    level(1_000.0, 70),
                    level(0.0, 100),
                ],
                fallback_score: 100,
            },
            wind_gust: ConditionCalibration {
                weight: 0.89,
                levels: vec![
                    level(40.0, 100),
                    level(30.0, 70),
                    level(20.0, 40),
                    level(10.0, 20),
                    level(0.0, 0),
                ],
                fallback_score: 0,
            },
        }
    }
}

impl Calibration {
    pub fn for_kind(&self, kind: ConditionKind) -> &ConditionCalibration {
        match kind {
            ConditionKind::FreezingRisk => &self.freezing_risk,
            ConditionKind::Precipitation => &self.precipitation,
            ConditionKind::Snowfall => &self.snowfall,
            ConditionKind::Visibility => &self.visibility,
            ConditionKind::WindGust => &self.wind_gust,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        ConditionKind::ALL
            .iter()
            .try_for_each(|kind| self.for_kind(*kind).validate(*kind))
    }
}

/// Validating constructor for [`WeatherCondition`] values.
#[derive(Debug, Clone, Default)]
pub struct WeatherConditionFactory {
    calibration: Calibration,
}

impl WeatherConditionFactory {
    pub fn new(calibration: Calibration) -> Result<Self, ValidationError> {
        calibration.validate()?;
        Ok(Self { calibration })
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn create_freezing_risk(&self, freezing_level_height_m: f64) -> Result<WeatherCondition, ValidationError> {
        self.create(ConditionKind::FreezingRisk, freezing_level_height_m)
    }

    pub fn create_precipitation(&self, precipitation_mm: f64) -> Result<WeatherCondition, ValidationError> {
        self.create(ConditionKind::Precipitation, precipitation_mm)
    }

    pub fn create_snowfall(&self, snowfall_cm: f64) -> Result<WeatherCondition, ValidationError> {
        self.create(ConditionKind::Snowfall, snowfall_cm)
    }

    pub fn create_visibility(&self, visibility_m: f64) -> Result<WeatherCondition, ValidationError> {
        self.create(ConditionKind::Visibility, visibility_m)
    }

    pub fn create_wind_gust(&self, wind_gust_kmh: f64) -> Result<WeatherCondition, ValidationError> {
        self.create(ConditionKind::WindGust, wind_gust_kmh)
    }

    pub fn create(&self, kind: ConditionKind, value: f64) -> Result<WeatherCondition, ValidationError> {
        validate_measurement(kind, value)?;

        let calibration = self.calibration.for_kind(kind);
        let measurement = Measurement {
            value,
            intensity_score: calibration.intensity_score(value),
            weight: calibration.weight,
        };

        Ok(match kind {
            ConditionKind::FreezingRisk => WeatherCondition::FreezingRisk(measurement),
            ConditionKind::Precipitation => WeatherCondition::Precipitation(measurement),
            ConditionKind::Snowfall => WeatherCondition::Snowfall(measurement),
            ConditionKind::Visibility => WeatherCondition::Visibility(measurement),
            ConditionKind::WindGust => WeatherCondition::WindGust(measurement),
        })
    }
}

fn validate_measurement(kind: ConditionKind, value: f64) -> Result<(), ValidationError> {
    let parameter = kind.parameter();
    if value.is_nan() {
        return Err(ValidationError::NotANumber { parameter });
    }
    if value.is_infinite() {
        return Err(ValidationError::Infinite { parameter });
    }
    let min = kind.minimum();
    if value < min {
        return Err(ValidationError::BelowMinimum {
            parameter,
            value,
            min,
        });
    }
    Ok(())
}
