mod clock;
mod interpolation;
mod prediction;

pub use clock::{ClockEstimate, ClockEstimator};
pub use interpolation::{EntityRecord, PoseBuffer, Sample, SampleMode};
pub use prediction::{ClientPredictor, Correction};
