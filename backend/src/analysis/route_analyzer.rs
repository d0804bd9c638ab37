use crate::{directions::DirectionsRoute, models::FineStep, polyline::PolylineError};

use super::{
    sampling::{DistanceWindow, EverySubStep, IntermediatePointFinder, SamplingPolicy},
    sub_steps::{ProportionalSubSteps, SubStepGenerator},
};

/// Turns a coarse multi-leg route into the ordered steps whose end points are
/// sampled for weather. Holds no per-route state, so one analyzer serves any
/// number of routes.
pub struct RouteAnalyzer {
    point_finder: Box<dyn IntermediatePointFinder>,
    sub_steps: Box<dyn SubStepGenerator>,
}

impl RouteAnalyzer {
    pub fn new(
        point_finder: impl IntermediatePointFinder + 'static,
        sub_steps: impl SubStepGenerator + 'static,
    ) -> Self {
        Self {
            point_finder: Box::new(point_finder),
            sub_steps: Box::new(sub_steps),
        }
    }

    pub fn with_policy(policy: SamplingPolicy) -> Self {
        match policy {
            SamplingPolicy::DistanceWindow => {
                Self::new(DistanceWindow::default(), ProportionalSubSteps::default())
            }
            SamplingPolicy::EverySubStep => {
                Self::new(EverySubStep, ProportionalSubSteps::default())
            }
        }
    }

    pub fn calculate_intermediate_points(
        &self,
        route: &DirectionsRoute,
    ) -> Result<Vec<FineStep>, PolylineError> {
        let mut points = Vec::new();
        for leg in &route.legs {
            let leg_points = self
                .point_finder
                .find_intermediate_points(leg, self.sub_steps.as_ref())?;
            tracing::debug!(
                "Leg {} -> {}: {} steps sampled into {} points",
                leg.start_address,
                leg.end_address,
                leg.steps.len(),
                leg_points.len()
            );
            points.extend(leg_points);
        }
        Ok(points)
    }
}

impl Default for RouteAnalyzer {
    fn default() -> Self {
        Self::with_policy(SamplingPolicy::default())
    }
}

impl std::fmt::Debug for RouteAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteAnalyzer").finish_non_exhaustive()
    }
}
