use crate::{
    directions::DirectionsStep,
    models::{Coordinate, FineStep},
    polyline::{self, PolylineError},
    routing::compute_distance,
};

/// Length of the sub-steps produced for one coarse step, in meters.
pub const DEFAULT_MIN_SEGMENT_M: f64 = 1_000.0;

/// Splits one coarse route step into finer steps that together carry exactly
/// the step's duration and distance.
pub trait SubStepGenerator: Send + Sync {
    fn generate_sub_steps(&self, step: &DirectionsStep) -> Result<Vec<FineStep>, PolylineError>;
}

/// Groups consecutive polyline points into segments of at least
/// `min_segment_m` and spreads the step totals by each segment's share of the
/// geometric length. There is no intra-step timing data, so speed is assumed
/// uniform within a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProportionalSubSteps {
    pub min_segment_m: f64,
}

impl ProportionalSubSteps {
    pub fn new(min_segment_m: f64) -> Self {
        Self {
            min_segment_m: min_segment_m.max(0.0),
        }
    }

    /// Keep every consecutive pair of points as its own sub-step.
    pub fn every_pair() -> Self {
        Self::new(0.0)
    }

    fn segments(&self, points: &[Coordinate]) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut start = points[0];
        let mut length = 0.0;

        for pair in points.windows(2) {
            length += compute_distance(pair[0], pair[1]);
            if length > 0.0 && length >= self.min_segment_m {
                segments.push(Segment {
                    start,
                    end: pair[1],
                    length,
                });
                start = pair[1];
                length = 0.0;
            }
        }

        let last = points[points.len() - 1];
        if start != last {
            segments.push(Segment {
                start,
                end: last,
                length,
            });
        }

        segments
    }
}

impl Default for ProportionalSubSteps {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SEGMENT_M)
    }
}

struct Segment {
    start: Coordinate,
    end: Coordinate,
    length: f64,
}

impl SubStepGenerator for ProportionalSubSteps {
    fn generate_sub_steps(&self, step: &DirectionsStep) -> Result<Vec<FineStep>, PolylineError> {
        let points = polyline::decode(&step.polyline.points)?;
        if points.len() < 2 {
            return Ok(vec![whole_step(step)]);
        }

        let segments = self.segments(&points);
        let geometric_length: f64 = segments.iter().map(|segment| segment.length).sum();
        if segments.is_empty() || geometric_length <= 0.0 {
            return Ok(vec![whole_step(step)]);
        }

        let total_duration = step.duration.value;
        let total_distance = step.distance.value;
        let last_index = segments.len() - 1;
        let mut assigned_duration = 0.0;
        let mut assigned_distance = 0.0;
        let mut sub_steps = Vec::with_capacity(segments.len());

        for (index, segment) in segments.iter().enumerate() {
            let (duration, distance) = if index == last_index {
                // remainder keeps the sums exact
                (
                    (total_duration - assigned_duration).max(0.0),
                    (total_distance - assigned_distance).max(0.0),
                )
            } else {
                let share = segment.length / geometric_length;
                (total_duration * share, total_distance * share)
            };
            assigned_duration += duration;
            assigned_distance += distance;
            sub_steps.push(FineStep::from_values(segment.start, segment.end, duration, distance));
        }

        tracing::debug!(
            "Split step into {} sub-steps ({:.0} m, {:.0} s)",
            sub_steps.len(),
            total_distance,
            total_duration
        );

        Ok(sub_steps)
    }
}

fn whole_step(step: &DirectionsStep) -> FineStep {
    FineStep::new(
        step.start_location,
        step.end_location,
        step.duration.clone(),
        step.distance.clone(),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{directions::EncodedPolyline, models::TextValue};

    pub(crate) fn step_through(points: &[Coordinate], duration_s: f64, distance_m: f64) -> DirectionsStep {
        DirectionsStep {
            start_location: points[0],
            end_location: points[points.len() - 1],
            polyline: EncodedPolyline {
                points: polyline::encode(points),
            },
            duration: TextValue::seconds(duration_s),
            distance: TextValue::meters(distance_m),
            travel_mode: "DRIVING".to_string(),
        }
    }

    /// Points ~1.1 km apart heading north.
    fn northbound(count: usize) -> Vec<Coordinate> {
        (0..count)
            .map(|i| Coordinate::new(44.0 + i as f64 * 0.01, 12.0))
            .collect()
    }

    fn sums(sub_steps: &[FineStep]) -> (f64, f64) {
        sub_steps.iter().fold((0.0, 0.0), |(duration, distance), sub| {
            (duration + sub.duration_seconds(), distance + sub.distance_meters())
        })
    }

    #[test]
    fn test_sub_steps_preserve_totals() {
        let step = step_through(&northbound(6), 300.0, 5_600.0);
        let sub_steps = ProportionalSubSteps::default().generate_sub_steps(&step).unwrap();

        assert_eq!(sub_steps.len(), 5);
        let (duration, distance) = sums(&sub_steps);
        assert!((duration - 300.0).abs() < 1e-6);
        assert!((distance - 5_600.0).abs() < 1e-6);
    }

    #[test]
    fn test_sub_steps_are_contiguous() {
        let step = step_through(&northbound(5), 240.0, 4_400.0);
        let sub_steps = ProportionalSubSteps::every_pair().generate_sub_steps(&step).unwrap();

        assert_eq!(sub_steps.first().unwrap().start(), Coordinate::new(44.0, 12.0));
        for pair in sub_steps.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start());
        }
    }

    #[test]
    fn test_short_pairs_are_grouped() {
        // ~100 m between points, so ten pairs make one kilometer segment
        let points: Vec<Coordinate> = (0..21)
            .map(|i| Coordinate::new(44.0 + i as f64 * 0.0009, 12.0))
            .collect();
        let step = step_through(&points, 120.0, 2_200.0);

        let sub_steps = ProportionalSubSteps::default().generate_sub_steps(&step).unwrap();
        assert_eq!(sub_steps.len(), 2);
        assert!((sub_steps[1].end().lat - points[20].lat).abs() < 1e-9);
    }

    #[test]
    fn test_duration_follows_segment_length() {
        let points = vec![
            Coordinate::new(44.0, 12.0),
            Coordinate::new(44.01, 12.0),
            Coordinate::new(44.04, 12.0),
        ];
        let step = step_through(&points, 400.0, 4_400.0);
        let sub_steps = ProportionalSubSteps::every_pair().generate_sub_steps(&step).unwrap();

        assert_eq!(sub_steps.len(), 2);
        assert!((sub_steps[0].duration_seconds() - 100.0).abs() < 0.5);
        assert!((sub_steps[1].duration_seconds() - 300.0).abs() < 0.5);
    }

    #[test]
    fn test_single_point_polyline_yields_whole_step() {
        let mut step = step_through(&[Coordinate::new(44.0, 12.0)], 30.0, 250.0);
        step.end_location = Coordinate::new(44.002, 12.0);

        let sub_steps = ProportionalSubSteps::default().generate_sub_steps(&step).unwrap();
        assert_eq!(sub_steps.len(), 1);
        assert_eq!(sub_steps[0].end(), Coordinate::new(44.002, 12.0));
        assert_eq!(sub_steps[0].duration_seconds(), 30.0);
    }

    #[test]
    fn test_zero_length_polyline_yields_whole_step() {
        let point = Coordinate::new(44.0, 12.0);
        let step = step_through(&[point, point, point], 12.0, 0.0);

        let sub_steps = ProportionalSubSteps::default().generate_sub_steps(&step).unwrap();
        assert_eq!(sub_steps.len(), 1);
        assert_eq!(sub_steps[0].distance_meters(), 0.0);
    }

    #[test]
    fn test_corrupted_polyline_is_an_error() {
        let mut step = step_through(&northbound(3), 60.0, 2_200.0);
        step.polyline.points = "_p~iF".to_string();

        assert!(ProportionalSubSteps::default().generate_sub_steps(&step).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_totals_are_preserved(
                offsets in prop::collection::vec((0.0001f64..0.05, -0.05f64..0.05), 1..30),
                duration in 1.0f64..10_000.0,
                distance in 1.0f64..100_000.0,
                min_segment in 0.0f64..5_000.0,
            ) {
                let mut points = vec![Coordinate::new(44.0, 12.0)];
                for (dlat, dlng) in offsets {
                    let last = points[points.len() - 1];
                    points.push(Coordinate::new(last.lat + dlat, last.lng + dlng));
                }
                let step = step_through(&points, duration, distance);
                let sub_steps = ProportionalSubSteps::new(min_segment).generate_sub_steps(&step).unwrap();

                let (total_duration, total_distance) = sums(&sub_steps);
                prop_assert!((total_duration - duration).abs() < 1e-6 * duration.max(1.0));
                prop_assert!((total_distance - distance).abs() < 1e-6 * distance.max(1.0));
                prop_assert!(sub_steps.iter().all(|s| s.duration_seconds() >= 0.0));
            }
        }
    }
}
