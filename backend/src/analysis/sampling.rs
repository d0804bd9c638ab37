use std::{fmt, str::FromStr};

use crate::{
    directions::DirectionsLeg,
    models::{Coordinate, FineStep},
    polyline::PolylineError,
};

use super::sub_steps::SubStepGenerator;

pub const DEFAULT_WINDOW_TARGET_M: f64 = 30_000.0;
pub const DEFAULT_WINDOW_TOLERANCE_M: f64 = 2_000.0;

/// Picks the sampling points of one leg. Returned steps are contiguous and in
/// travel order.
pub trait IntermediatePointFinder: Send + Sync {
    fn find_intermediate_points(
        &self,
        leg: &DirectionsLeg,
        sub_steps: &dyn SubStepGenerator,
    ) -> Result<Vec<FineStep>, PolylineError>;
}

/// Every sub-step of every step becomes a sampling point.
#[derive(Debug, Clone, Copy, Default)]
pub struct EverySubStep;

impl IntermediatePointFinder for EverySubStep {
    fn find_intermediate_points(
        &self,
        leg: &DirectionsLeg,
        sub_steps: &dyn SubStepGenerator,
    ) -> Result<Vec<FineStep>, PolylineError> {
        let mut points = Vec::new();
        for step in &leg.steps {
            points.extend(sub_steps.generate_sub_steps(step)?);
        }
        Ok(points)
    }
}

/// Emits one sampling point roughly every `target_m` meters of travel.
///
/// Steps are accumulated until the travelled distance falls strictly inside
/// `target_m ± tolerance_m`. A step that would overshoot the window is walked
/// through its sub-steps instead, and a point is emitted as soon as the lower
/// bound is passed. Whatever is left at the end of the leg becomes a final
/// point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceWindow {
    pub target_m: f64,
    pub tolerance_m: f64,
}

impl DistanceWindow {
    pub fn new(target_m: f64, tolerance_m: f64) -> Self {
        Self {
            target_m,
            tolerance_m,
        }
    }

    fn lower_bound(&self) -> f64 {
        self.target_m - self.tolerance_m
    }

    fn upper_bound(&self) -> f64 {
        self.target_m + self.tolerance_m
    }

    fn is_within(&self, distance: f64) -> bool {
        distance > self.lower_bound() && distance < self.upper_bound()
    }
}

impl Default for DistanceWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_TARGET_M, DEFAULT_WINDOW_TOLERANCE_M)
    }
}

struct OpenWindow {
    start: Coordinate,
    duration: f64,
    distance: f64,
}

impl OpenWindow {
    fn starting_at(start: Coordinate) -> Self {
        Self {
            start,
            duration: 0.0,
            distance: 0.0,
        }
    }

    fn add(&mut self, duration: f64, distance: f64) {
        self.duration += duration;
        self.distance += distance;
    }

    fn close(&mut self, end: Coordinate) -> FineStep {
        let step = FineStep::from_values(self.start, end, self.duration, self.distance);
        *self = Self::starting_at(end);
        step
    }
}

impl IntermediatePointFinder for DistanceWindow {
    fn find_intermediate_points(
        &self,
        leg: &DirectionsLeg,
        sub_steps: &dyn SubStepGenerator,
    ) -> Result<Vec<FineStep>, PolylineError> {
        let mut points = Vec::new();
        let mut window = OpenWindow::starting_at(leg.start_location);

        for step in &leg.steps {
            let reached = window.distance + step.distance.value;

            if self.is_within(reached) {
                window.add(step.duration.value, step.distance.value);
                points.push(window.close(step.end_location));
            } else if reached >= self.upper_bound() {
                for sub_step in sub_steps.generate_sub_steps(step)? {
                    window.add(sub_step.duration_seconds(), sub_step.distance_meters());
                    if window.distance > self.lower_bound() {
                        points.push(window.close(sub_step.end()));
                    }
                }
            } else {
                window.add(step.duration.value, step.distance.value);
            }
        }

        if window.distance > 0.0 || window.duration > 0.0 || points.is_empty() {
            points.push(window.close(leg.end_location));
        }

        Ok(points)
    }
}

/// Which [`IntermediatePointFinder`] a [`super::RouteAnalyzer`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SamplingPolicy {
    #[default]
    DistanceWindow,
    EverySubStep,
}

impl FromStr for SamplingPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "window" | "distance-window" => Ok(Self::DistanceWindow),
            "every-sub-step" | "every" => Ok(Self::EverySubStep),
            other => Err(format!(
                "unknown sampling policy '{other}' (expected 'window' or 'every-sub-step')"
            )),
        }
    }
}

impl fmt::Display for SamplingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DistanceWindow => f.write_str("window"),
            Self::EverySubStep => f.write_str("every-sub-step"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        analysis::sub_steps::{tests::step_through, ProportionalSubSteps},
        directions::DirectionsStep,
        models::TextValue,
    };

    /// A straight northbound step of `km` kilometers starting at `lat`.
    pub(crate) fn straight_step(lat: f64, km: f64, duration_s: f64) -> DirectionsStep {
        let degrees = km / 111.226;
        let count = km.ceil().max(1.0) as usize;
        let points: Vec<Coordinate> = (0..=count)
            .map(|i| Coordinate::new(lat + degrees * i as f64 / count as f64, 12.0))
            .collect();
        step_through(&points, duration_s, km * 1000.0)
    }

    pub(crate) fn leg_of(steps: Vec<DirectionsStep>) -> DirectionsLeg {
        let first = steps.first().map(|s| s.start_location).unwrap_or(Coordinate::new(44.0, 12.0));
        let last = steps.last().map(|s| s.end_location).unwrap_or(first);
        let distance: f64 = steps.iter().map(|s| s.distance.value).sum();
        let duration: f64 = steps.iter().map(|s| s.duration.value).sum();
        DirectionsLeg {
            start_address: "start".into(),
            start_location: first,
            end_address: "end".into(),
            end_location: last,
            steps,
            distance: TextValue::meters(distance),
            duration: TextValue::seconds(duration),
            duration_in_traffic: None,
        }
    }

    /// Consecutive steps chained from `lat`, lengths in kilometers.
    pub(crate) fn chained_steps(lengths_km: &[f64]) -> Vec<DirectionsStep> {
        let mut lat = 44.0;
        lengths_km
            .iter()
            .map(|km| {
                let step = straight_step(lat, *km, km * 40.0);
                lat = step.end_location.lat;
                step
            })
            .collect()
    }

    fn total_distance(points: &[FineStep]) -> f64 {
        points.iter().map(FineStep::distance_meters).sum()
    }

    #[test]
    fn test_every_sub_step_flattens_all_steps() {
        let leg = leg_of(chained_steps(&[3.0, 2.0]));
        let points = EverySubStep
            .find_intermediate_points(&leg, &ProportionalSubSteps::every_pair())
            .unwrap();

        assert_eq!(points.len(), 5);
        assert!((total_distance(&points) - 5_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_emits_when_step_lands_inside() {
        let leg = leg_of(chained_steps(&[20.0, 9.5, 10.0]));
        let points = DistanceWindow::default()
            .find_intermediate_points(&leg, &ProportionalSubSteps::default())
            .unwrap();

        assert_eq!(points.len(), 2);
        assert!((points[0].distance_meters() - 29_500.0).abs() < 1e-6);
        assert_eq!(points[0].end(), leg.steps[1].end_location);
        assert!((points[1].distance_meters() - 10_000.0).abs() < 1e-6);
        assert_eq!(points[1].end(), leg.end_location);
    }

    #[test]
    fn test_window_walks_sub_steps_of_overshooting_step() {
        let leg = leg_of(chained_steps(&[70.0]));
        let points = DistanceWindow::default()
            .find_intermediate_points(&leg, &ProportionalSubSteps::default())
            .unwrap();

        assert_eq!(points.len(), 3);
        assert!(points[0].distance_meters() > 28_000.0);
        assert!(points[0].distance_meters() < 30_500.0);
        assert!((total_distance(&points) - 70_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_short_leg_yields_single_point() {
        let leg = leg_of(chained_steps(&[1.0, 2.0, 3.0]));
        let points = DistanceWindow::default()
            .find_intermediate_points(&leg, &ProportionalSubSteps::default())
            .unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].start(), leg.start_location);
        assert_eq!(points[0].end(), leg.end_location);
        assert!((points[0].duration_seconds() - 240.0).abs() < 1e-6);
    }

    #[test]
    fn test_window_does_not_repeat_last_point() {
        let leg = leg_of(chained_steps(&[31.0]));
        let points = DistanceWindow::default()
            .find_intermediate_points(&leg, &ProportionalSubSteps::default())
            .unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].end(), leg.end_location);
    }

    #[test]
    fn test_window_points_are_contiguous() {
        let leg = leg_of(chained_steps(&[12.0, 25.0, 48.0, 3.0, 30.0]));
        let points = DistanceWindow::default()
            .find_intermediate_points(&leg, &ProportionalSubSteps::default())
            .unwrap();

        assert_eq!(points[0].start(), leg.start_location);
        for pair in points.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start());
        }
        assert!((total_distance(&points) - 118_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_sampling_policy_from_str() {
        assert_eq!("window".parse::<SamplingPolicy>(), Ok(SamplingPolicy::DistanceWindow));
        assert_eq!(
            "Every-Sub-Step".parse::<SamplingPolicy>(),
            Ok(SamplingPolicy::EverySubStep)
        );
        assert!("hourly".parse::<SamplingPolicy>().is_err());
        assert_eq!(SamplingPolicy::EverySubStep.to_string(), "every-sub-step");
    }
}
