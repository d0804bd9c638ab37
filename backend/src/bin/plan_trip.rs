use std::{path::PathBuf, sync::Arc};

use backend::{
    analysis::SamplingPolicy,
    config::{AppConfig, ConfigError, load_calibration},
    directions::SavedDirections,
    google::GoogleMapsClient,
    models::{TravelRequestFields, offset_from_minutes},
    planner::{DirectionsProvider, TravelPlanner},
    weather::OpenMeteoClient,
};
use chrono::{NaiveDate, NaiveTime};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Estimate the weather risk along a drive and print the result as JSON"
)]
struct Args {
    /// Departure place name
    #[arg(long)]
    from: String,

    /// Departure place id
    #[arg(long)]
    from_place: String,

    /// Arrival place name
    #[arg(long)]
    to: String,

    /// Arrival place id
    #[arg(long)]
    to_place: String,

    /// Local departure date (YYYY-MM-DD)
    #[arg(long)]
    date: NaiveDate,

    /// Local departure time (HH:MM:SS)
    #[arg(long)]
    time: NaiveTime,

    /// UTC offset of the departure place; looked up from the place id when omitted
    #[arg(long, allow_hyphen_values = true)]
    utc_offset_minutes: Option<i32>,

    /// Analyze a saved Directions JSON response instead of querying the routing service
    #[arg(long)]
    directions_file: Option<PathBuf>,

    /// `window` or `every-sub-step`
    #[arg(long)]
    sampling: Option<SamplingPolicy>,

    /// Maximum weather requests in flight
    #[arg(long)]
    concurrency: Option<usize>,

    /// Calibration JSON overriding the built-in intensity tables
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Write the JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env()?;
    if let Some(policy) = args.sampling {
        config.sampling_policy = policy;
    }
    if let Some(concurrency) = args.concurrency {
        config.weather_concurrency = concurrency.max(1);
    }
    if let Some(path) = &args.calibration {
        config.calibration = load_calibration(path)?;
    }

    let open_meteo = Arc::new(OpenMeteoClient::new(
        config.weather_http_client()?,
        config.open_meteo_api_base.clone(),
    ));
    let analyzer = Arc::new(config.build_analyzer(open_meteo)?);

    let google = match config.google_api_key.as_deref() {
        Some(key) => Some(Arc::new(GoogleMapsClient::new(
            config.google_http_client()?,
            config.google_api_base.clone(),
            key,
        ))),
        None => None,
    };

    let directions: Arc<dyn DirectionsProvider> = match (&args.directions_file, &google) {
        (Some(path), _) => {
            tracing::info!("Analyzing saved directions from {:?}", path);
            Arc::new(SavedDirections::new(path))
        }
        (None, Some(google)) => google.clone(),
        (None, None) => return Err(ConfigError::MissingVariable("GOOGLE_MAPS_API_KEY").into()),
    };

    let mut planner = TravelPlanner::new(directions, analyzer);
    if let Some(google) = google {
        planner = planner.with_time_zones(google);
    }

    let fields = TravelRequestFields {
        departure_location: Some(args.from),
        departure_place_id: Some(args.from_place),
        arrival_location: Some(args.to),
        arrival_place_id: Some(args.to_place),
        departure_date: Some(args.date),
        departure_time: Some(args.time),
        departure_time_zone: args.utc_offset_minutes.map(offset_from_minutes).transpose()?,
    };

    let request = planner.resolve_request(fields).await?;
    let directions = planner.plan(request).await?;
    let response = directions.plan_response().await?;
    tracing::info!(
        "Main route '{}' scored {} ({} alternatives)",
        response.main.summary,
        response.main.meteo_score,
        response.alternatives.len()
    );

    let json = serde_json::to_string_pretty(&response)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, json)?;
            tracing::info!("Wrote {:?}", path);
        }
        None => println!("{json}"),
    }

    Ok(())
}
