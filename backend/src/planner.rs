use std::sync::Arc;

use async_trait::async_trait;
use chrono::FixedOffset;
use futures::future::try_join_all;
use shared::TravelPlanResponse;

use crate::{
    directions::DirectionsResponse,
    error::{DirectionsError, RouteUnavailableError, TravelError},
    models::{TravelRequest, TravelRequestFields},
    travel::{TravelAnalyzer, TravelModeResult},
};

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn directions(&self, request: &TravelRequest) -> Result<DirectionsResponse, DirectionsError>;
}

/// Resolves the UTC offset of a place, used when a request carries none.
#[async_trait]
pub trait PlaceTimeZoneProvider: Send + Sync {
    async fn utc_offset(&self, place_id: &str) -> Result<FixedOffset, DirectionsError>;
}

/// Routes returned for one request. Route 0 is the main route, the rest are
/// alternatives; each is analyzed at most once.
pub struct Directions {
    request: TravelRequest,
    response: DirectionsResponse,
    analyzer: Arc<TravelAnalyzer>,
    main: tokio::sync::OnceCell<TravelModeResult>,
    alternatives: tokio::sync::OnceCell<Vec<TravelModeResult>>,
}

impl Directions {
    pub fn new(
        request: TravelRequest,
        response: DirectionsResponse,
        analyzer: Arc<TravelAnalyzer>,
    ) -> Result<Self, RouteUnavailableError> {
        if response.routes.is_empty() {
            return Err(RouteUnavailableError::NoRoutes);
        }
        Ok(Self {
            request,
            response,
            analyzer,
            main: tokio::sync::OnceCell::new(),
            alternatives: tokio::sync::OnceCell::new(),
        })
    }

    pub fn request(&self) -> &TravelRequest {
        &self.request
    }

    pub fn response(&self) -> &DirectionsResponse {
        &self.response
    }

    pub fn route_count(&self) -> usize {
        self.response.routes.len()
    }

    pub async fn main_result(&self) -> Result<&TravelModeResult, TravelError> {
        self.main
            .get_or_try_init(|| {
                self.analyzer
                    .analyze_route(&self.response.routes[0], self.request.departure_date_time())
            })
            .await
    }

    /// Analyzes routes 1..N concurrently; results keep the provider order.
    pub async fn alternative_results(&self) -> Result<&[TravelModeResult], TravelError> {
        if !self.response.has_alternatives() {
            return Err(RouteUnavailableError::NoAlternatives.into());
        }

        let departure = self.request.departure_date_time();
        let results = self
            .alternatives
            .get_or_try_init(|| {
                try_join_all(
                    self.response.routes[1..]
                        .iter()
                        .map(|route| self.analyzer.analyze_route(route, departure)),
                )
            })
            .await?;
        Ok(results.as_slice())
    }

    /// Main summary plus every alternative; a single route yields no
    /// alternatives rather than an error.
    pub async fn plan_response(&self) -> Result<TravelPlanResponse, TravelError> {
        let main = self.main_result().await?.to_summary()?;
        let alternatives = match self.alternative_results().await {
            Ok(results) => results
                .iter()
                .map(TravelModeResult::to_summary)
                .collect::<Result<Vec<_>, _>>()?,
            Err(TravelError::RouteUnavailable(RouteUnavailableError::NoAlternatives)) => Vec::new(),
            Err(err) => return Err(err),
        };
        Ok(TravelPlanResponse { main, alternatives })
    }
}

/// Builds requests, asks the routing collaborator and wraps the answer.
pub struct TravelPlanner {
    directions: Arc<dyn DirectionsProvider>,
    time_zones: Option<Arc<dyn PlaceTimeZoneProvider>>,
    analyzer: Arc<TravelAnalyzer>,
}

impl TravelPlanner {
    pub fn new(directions: Arc<dyn DirectionsProvider>, analyzer: Arc<TravelAnalyzer>) -> Self {
        Self {
            directions,
            time_zones: None,
            analyzer,
        }
    }

    pub fn with_time_zones(mut self, time_zones: Arc<dyn PlaceTimeZoneProvider>) -> Self {
        self.time_zones = Some(time_zones);
        self
    }

    pub fn analyzer(&self) -> &Arc<TravelAnalyzer> {
        &self.analyzer
    }

    /// Fills a missing departure zone from the departure place, then
    /// validates.
    pub async fn resolve_request(&self, mut fields: TravelRequestFields) -> Result<TravelRequest, TravelError> {
        if fields.departure_time_zone.is_none() {
            if let (Some(time_zones), Some(place_id)) = (&self.time_zones, &fields.departure_place_id) {
                let offset = time_zones.utc_offset(place_id).await?;
                tracing::debug!("Resolved UTC offset {} for place {}", offset, place_id);
                fields.departure_time_zone = Some(offset);
            }
        }
        Ok(TravelRequest::new(fields)?)
    }

    pub async fn plan(&self, request: TravelRequest) -> Result<Directions, TravelError> {
        tracing::info!(
            "Planning {} -> {} departing {}",
            request.departure_location(),
            request.arrival_location(),
            request.departure_date_time()
        );
        let response = self
            .directions
            .directions(&request)
            .await
            .inspect_err(|err| tracing::warn!("Directions request failed: {}", err))?
            .ensure_ok()?;
        tracing::info!("Routing service returned {} routes", response.routes.len());

        Ok(Directions::new(request, response, self.analyzer.clone())?)
    }
}
