//! Search engine: directions, samplers and the trial-keeping study.

pub mod direction;
pub mod sampler;
pub mod study;

pub use direction::{Direction, DirectionSpec, StudyDirections};
pub use sampler::{RandomSampler, Sampler};
pub use study::{FailurePolicy, SearchError, Study, Trial, TrialOutcome, TrialRecord, TrialState};
