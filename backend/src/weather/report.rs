use once_cell::sync::OnceCell;

use crate::{error::ValidationError, models::Checkpoint};

use super::conditions::WeatherCondition;

/// The weather observed at one checkpoint, scored from 0 (dangerous) to 100
/// (clear).
#[derive(Debug, Clone, Default)]
pub struct WeatherReport {
    conditions: Vec<WeatherCondition>,
    score: OnceCell<u8>,
}

impl WeatherReport {
    pub fn new(conditions: Vec<WeatherCondition>) -> Self {
        Self {
            conditions,
            score: OnceCell::new(),
        }
    }

    pub fn conditions(&self) -> &[WeatherCondition] {
        &self.conditions
    }

    pub fn total_weighted_intensity(&self) -> f64 {
        self.conditions
            .iter()
            .map(WeatherCondition::weighted_intensity_score)
            .sum()
    }

    /// Computed on first access, then cached.
    pub fn weather_score(&self) -> u8 {
        *self.score.get_or_init(|| self.compute_score())
    }

    pub fn category(&self) -> WeatherScoreCategory {
        WeatherScoreCategory::bucket(self.weather_score())
    }

    fn compute_score(&self) -> u8 {
        if self.conditions.is_empty() {
            return 100;
        }
        // logarithmic fit of accumulated weighted intensity, rounded half-up
        let total = self.total_weighted_intensity();
        let normalized = (50.0 * (total + 93.91).ln() - 227.12 + 0.5).floor() as i64;
        (100 - normalized).clamp(0, 100) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherScoreCategory {
    Terrible,
    Bad,
    Good,
    Excellent,
}

impl WeatherScoreCategory {
    pub fn from_score(score: i32) -> Result<Self, ValidationError> {
        u8::try_from(score)
            .ok()
            .filter(|score| *score <= 100)
            .map(Self::bucket)
            .ok_or(ValidationError::ScoreOutOfRange(score))
    }

    fn bucket(score: u8) -> Self {
        match score {
            0..=25 => Self::Terrible,
            26..=50 => Self::Bad,
            51..=75 => Self::Good,
            _ => Self::Excellent,
        }
    }

    pub fn min_score(self) -> u8 {
        match self {
            Self::Terrible => 0,
            Self::Bad => 26,
            Self::Good => 51,
            Self::Excellent => 76,
        }
    }

    pub fn max_score(self) -> u8 {
        match self {
            Self::Terrible => 25,
            Self::Bad => 50,
            Self::Good => 75,
            Self::Excellent => 100,
        }
    }

    /// Static map marker color; excellent checkpoints get no marker.
    pub fn marker_color(self) -> Option<&'static str> {
        match self {
            Self::Terrible => Some("red"),
            Self::Bad => Some("orange"),
            Self::Good => Some("yellow"),
            Self::Excellent => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckpointWithWeather {
    checkpoint: Checkpoint,
    report: WeatherReport,
}

impl CheckpointWithWeather {
    pub fn new(checkpoint: Checkpoint, report: WeatherReport) -> Self {
        Self { checkpoint, report }
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn report(&self) -> &WeatherReport {
        &self.report
    }

    pub fn weather_score(&self) -> u8 {
        self.report.weather_score()
    }
}
