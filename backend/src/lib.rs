pub mod analysis;
pub mod config;
pub mod directions;
pub mod error;
pub mod google;
pub mod models;
pub mod planner;
pub mod polyline;
pub mod routing;
pub mod travel;
pub mod weather;

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use base64::Engine;
use shared::{ApiError, MapResponse, TravelPlanResponse, TravelRequestPayload};

use crate::error::{TravelError, ValidationError};
use crate::models::TravelRequestFields;
use crate::planner::{Directions, TravelPlanner};
use crate::travel::MapRenderer;

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<TravelPlanner>,
    pub map_renderer: Arc<dyn MapRenderer>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/travel", post(travel_handler))
        .route("/api/travel/map", post(travel_map_handler))
        .with_state(state)
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

async fn plan_directions(state: &AppState, payload: &TravelRequestPayload) -> Result<Directions, TravelError> {
    let fields = TravelRequestFields::from_payload(payload)?;
    let request = state.planner.resolve_request(fields).await?;
    state.planner.plan(request).await
}

async fn travel_handler(
    State(state): State<AppState>,
    Json(payload): Json<TravelRequestPayload>,
) -> ApiResult<impl IntoResponse> {
    let directions = plan_directions(&state, &payload).await.map_err(travel_error_to_api_error)?;
    let response: TravelPlanResponse = directions
        .plan_response()
        .await
        .map_err(travel_error_to_api_error)?;

    tracing::info!(
        "Travel analyzed: meteo score {} with {} alternatives",
        response.main.meteo_score,
        response.alternatives.len()
    );
    Ok(Json(response))
}

/// Plans and analyzes the main route again before rendering it. Nothing is
/// kept between requests, so the render cache of [`travel::TravelModeResult`]
/// only spans a single call.
async fn travel_map_handler(
    State(state): State<AppState>,
    Json(payload): Json<TravelRequestPayload>,
) -> ApiResult<impl IntoResponse> {
    let directions = plan_directions(&state, &payload).await.map_err(travel_error_to_api_error)?;
    let main = directions.main_result().await.map_err(travel_error_to_api_error)?;
    let image = main
        .map_image(state.map_renderer.as_ref())
        .await
        .map_err(|err| travel_error_to_api_error(err.into()))?;

    Ok(Json(MapResponse {
        png_base64: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
    }))
}

/// 400 for bad input, 404 when no route can be analyzed, 502 when a
/// collaborator fails.
pub fn travel_error_to_api_error(err: TravelError) -> (StatusCode, Json<ApiError>) {
    let status = match &err {
        TravelError::Validation(ValidationError::ScoreOutOfRange(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        TravelError::Validation(_) => StatusCode::BAD_REQUEST,
        TravelError::RouteUnavailable(_) | TravelError::NoCheckpoints => StatusCode::NOT_FOUND,
        TravelError::Weather(_)
        | TravelError::Directions(_)
        | TravelError::MapGeneration(_)
        | TravelError::Geometry(_) => StatusCode::BAD_GATEWAY,
    };

    if status.is_server_error() {
        tracing::error!("Travel analysis failed: {}", err);
    } else {
        tracing::debug!("Travel request rejected: {}", err);
    }

    (
        status,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}
