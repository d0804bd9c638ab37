//! Route geometry → timed checkpoints.

pub mod checkpoints;
pub mod route_analyzer;
pub mod sampling;
pub mod sub_steps;

pub use checkpoints::{CheckpointGenerator, Checkpoints};
pub use route_analyzer::RouteAnalyzer;
pub use sampling::{DistanceWindow, EverySubStep, IntermediatePointFinder, SamplingPolicy};
pub use sub_steps::{ProportionalSubSteps, SubStepGenerator};
