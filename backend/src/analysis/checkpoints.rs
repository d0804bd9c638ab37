use std::{ops::Deref, sync::Arc};

use chrono::{DateTime, FixedOffset};

use crate::{
    error::{RouteUnavailableError, TravelError, ValidationError},
    models::{Checkpoint, FineStep, delta_from_seconds},
};

/// Read-only, cheaply cloneable checkpoint sequence.
///
/// Derefs to a shared slice, so the points can be read and iterated but never
/// pushed to or changed:
///
/// ```compile_fail
/// use backend::analysis::Checkpoints;
///
/// fn append(checkpoints: &mut Checkpoints, extra: backend::models::Checkpoint) {
///     checkpoints.push(extra);
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoints(Arc<[Checkpoint]>);

impl Checkpoints {
    pub fn as_slice(&self) -> &[Checkpoint] {
        &self.0
    }
}

impl Deref for Checkpoints {
    type Target = [Checkpoint];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Checkpoint>> for Checkpoints {
    fn from(checkpoints: Vec<Checkpoint>) -> Self {
        Self(checkpoints.into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckpointGenerator;

impl CheckpointGenerator {
    /// One checkpoint at the start of the first step, then one at the end of
    /// every step, timestamped with the departure plus the running duration.
    ///
    /// The running total stays in fractional seconds and is converted to a
    /// timestamp at millisecond resolution for each checkpoint.
    pub fn generate_checkpoints(
        &self,
        steps: &[FineStep],
        departure: DateTime<FixedOffset>,
    ) -> Result<Checkpoints, TravelError> {
        let first = steps.first().ok_or(RouteUnavailableError::NoSteps)?;

        let mut checkpoints = Vec::with_capacity(steps.len() + 1);
        checkpoints.push(Checkpoint::at(first.start(), departure));

        let mut elapsed_s = 0.0_f64;
        for step in steps {
            let duration = step.duration_seconds();
            if duration.is_nan() {
                return Err(ValidationError::NotANumber {
                    parameter: "step duration",
                }
                .into());
            }
            if duration.is_infinite() {
                return Err(ValidationError::Infinite {
                    parameter: "step duration",
                }
                .into());
            }
            if duration < 0.0 {
                return Err(ValidationError::BelowMinimum {
                    parameter: "step duration",
                    value: duration,
                    min: 0.0,
                }
                .into());
            }

            elapsed_s += duration;
            let arrival = delta_from_seconds(elapsed_s)
                .and_then(|offset| departure.checked_add_signed(offset))
                .ok_or_else(|| ValidationError::InvalidField {
                    field: "step duration",
                    reason: format!("{elapsed_s} s after {departure} is out of range"),
                })?;
            checkpoints.push(Checkpoint::at(step.end(), arrival));
        }

        tracing::debug!("Generated {} checkpoints", checkpoints.len());
        Ok(checkpoints.into())
    }
}
