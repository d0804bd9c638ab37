use std::{fs::File, net::SocketAddr, num::NonZeroUsize, path::PathBuf, sync::Arc, time::Duration};

use crate::{
    analysis::{RouteAnalyzer, SamplingPolicy},
    error::ValidationError,
    google::DEFAULT_GOOGLE_MAPS_BASE,
    travel::TravelAnalyzer,
    weather::{
        open_meteo::DEFAULT_OPEN_METEO_BASE,
        service::{DEFAULT_WEATHER_CONCURRENCY, DEFAULT_WEATHER_TIMEOUT},
        CachedWeatherProvider, Calibration, WeatherConditionFactory, WeatherDataProvider,
        WeatherInformationService,
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_WEATHER_CACHE_SIZE: usize = 512;
const DEFAULT_GOOGLE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set to reach the Google Maps services")]
    MissingVariable(&'static str),
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
    #[error("failed to read calibration file {path}: {source}")]
    CalibrationIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse calibration file {path}: {source}")]
    CalibrationParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Calibration(#[from] ValidationError),
}

/// Runtime settings, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub google_api_key: Option<String>,
    pub google_api_base: String,
    pub google_timeout: Duration,
    pub open_meteo_api_base: String,
    pub bind_addr: SocketAddr,
    pub weather_concurrency: usize,
    pub weather_timeout: Duration,
    pub weather_cache_size: NonZeroUsize,
    pub sampling_policy: SamplingPolicy,
    pub calibration: Calibration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            google_api_base: DEFAULT_GOOGLE_MAPS_BASE.to_string(),
            google_timeout: DEFAULT_GOOGLE_TIMEOUT,
            open_meteo_api_base: DEFAULT_OPEN_METEO_BASE.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            weather_concurrency: DEFAULT_WEATHER_CONCURRENCY,
            weather_timeout: DEFAULT_WEATHER_TIMEOUT,
            weather_cache_size: NonZeroUsize::new(DEFAULT_WEATHER_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN),
            sampling_policy: SamplingPolicy::default(),
            calibration: Calibration::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`AppConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::InvalidValue {
                name: "BIND_ADDR",
                reason: err.to_string(),
            })?;

        let weather_concurrency =
            parse_number(var("WEATHER_CONCURRENCY"), "WEATHER_CONCURRENCY", DEFAULT_WEATHER_CONCURRENCY)?;
        let timeout_secs = parse_number(
            var("WEATHER_TIMEOUT_SECS"),
            "WEATHER_TIMEOUT_SECS",
            DEFAULT_WEATHER_TIMEOUT.as_secs(),
        )?;
        let google_timeout_secs = parse_number(
            var("GOOGLE_TIMEOUT_SECS"),
            "GOOGLE_TIMEOUT_SECS",
            DEFAULT_GOOGLE_TIMEOUT.as_secs(),
        )?;
        let cache_size = parse_number(var("WEATHER_CACHE_SIZE"), "WEATHER_CACHE_SIZE", DEFAULT_WEATHER_CACHE_SIZE)?;

        let sampling_policy = match var("SAMPLING_POLICY") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::InvalidValue {
                name: "SAMPLING_POLICY",
                reason,
            })?,
            None => SamplingPolicy::default(),
        };

        let calibration = match var("CALIBRATION_JSON") {
            Some(path) => load_calibration(path)?,
            None => Calibration::default(),
        };

        Ok(Self {
            google_api_key: var("GOOGLE_MAPS_API_KEY"),
            google_api_base: var("GOOGLE_MAPS_API_BASE").unwrap_or_else(|| DEFAULT_GOOGLE_MAPS_BASE.to_string()),
            google_timeout: Duration::from_secs(google_timeout_secs.max(1)),
            open_meteo_api_base: var("OPEN_METEO_API_BASE")
                .unwrap_or_else(|| DEFAULT_OPEN_METEO_BASE.to_string()),
            bind_addr,
            weather_concurrency: weather_concurrency.max(1),
            weather_timeout: Duration::from_secs(timeout_secs.max(1)),
            weather_cache_size: NonZeroUsize::new(cache_size).ok_or(ConfigError::InvalidValue {
                name: "WEATHER_CACHE_SIZE",
                reason: "must be greater than zero".to_string(),
            })?,
            sampling_policy,
            calibration,
        })
    }

    pub fn require_google_api_key(&self) -> Result<&str, ConfigError> {
        self.google_api_key
            .as_deref()
            .ok_or(ConfigError::MissingVariable("GOOGLE_MAPS_API_KEY"))
    }

    /// HTTP client for Directions, Place Details and Static Maps, bounded by
    /// `google_timeout`.
    pub fn google_http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder().timeout(self.google_timeout).build()
    }

    /// HTTP client for the weather provider. Each weather call is bounded by
    /// `weather_timeout` inside [`WeatherInformationService`], not here.
    pub fn weather_http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder().build()
    }

    /// Wires the weather stack (cache, factory, limits) and the sampling policy
    /// around `provider`.
    pub fn build_analyzer(&self, provider: Arc<dyn WeatherDataProvider>) -> Result<TravelAnalyzer, ConfigError> {
        let factory = WeatherConditionFactory::new(self.calibration.clone())?;
        let cached = CachedWeatherProvider::new(provider, self.weather_cache_size);
        let weather = WeatherInformationService::new(factory, Arc::new(cached))
            .with_timeout(self.weather_timeout)
            .with_concurrency(self.weather_concurrency);

        Ok(TravelAnalyzer::new(
            RouteAnalyzer::with_policy(self.sampling_policy),
            Arc::new(weather),
        ))
    }
}

fn parse_number<T>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().map_err(|err: T::Err| ConfigError::InvalidValue {
            name,
            reason: err.to_string(),
        }),
        None => Ok(default),
    }
}

pub fn load_calibration(path: impl Into<PathBuf>) -> Result<Calibration, ConfigError> {
    let path = path.into();
    let file = File::open(&path).map_err(|source| ConfigError::CalibrationIo {
        path: path.clone(),
        source,
    })?;
    let calibration: Calibration =
        serde_json::from_reader(file).map_err(|source| ConfigError::CalibrationParse { path, source })?;
    calibration.validate()?;
    Ok(calibration)
}
