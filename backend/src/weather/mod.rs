pub mod conditions;
pub mod open_meteo;
pub mod report;
pub mod service;

pub use conditions::{Calibration, ConditionKind, WeatherCondition, WeatherConditionFactory};
pub use open_meteo::OpenMeteoClient;
pub use report::{CheckpointWithWeather, WeatherReport, WeatherScoreCategory};
pub use service::{
    CachedWeatherProvider, WeatherDataProvider, WeatherInformationService, WeatherSample,
};
