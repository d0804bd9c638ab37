use std::sync::Arc;

use backend::{
    AppState, create_router,
    config::AppConfig,
    google::GoogleMapsClient,
    planner::TravelPlanner,
    weather::OpenMeteoClient,
};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let google = Arc::new(GoogleMapsClient::new(
        config.google_http_client()?,
        config.google_api_base.clone(),
        config.require_google_api_key()?,
    ));
    let open_meteo = Arc::new(OpenMeteoClient::new(
        config.weather_http_client()?,
        config.open_meteo_api_base.clone(),
    ));
    let analyzer = Arc::new(config.build_analyzer(open_meteo)?);
    tracing::info!(
        "Sampling policy: {}, weather concurrency: {}, timeout: {:?}",
        config.sampling_policy,
        config.weather_concurrency,
        config.weather_timeout
    );

    let planner = TravelPlanner::new(google.clone(), analyzer).with_time_zones(google.clone());
    let state = AppState {
        planner: Arc::new(planner),
        map_renderer: google,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = create_router(state).layer(cors);

    let addr = config.bind_addr;
    tracing::info!("Starting backend on http://{addr}");
    tracing::info!("API endpoints:");
    tracing::info!("  POST /api/travel - Analyze the weather along the main and alternative routes");
    tracing::info!("  POST /api/travel/map - Render the main route with weather markers");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
