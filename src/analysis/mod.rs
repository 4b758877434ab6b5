// src/analysis/mod.rs
pub mod calibrate;
pub mod differentiate;
pub mod events;
pub mod pipeline;
pub mod smoothing;

pub use calibrate::CalibrationModel;
pub use differentiate::velocity_from_displacement;
pub use events::{EventOptions, LowVariationWarning, TestSummary};
pub use pipeline::{CalibratedSeries, TestPipeline};
pub use smoothing::moving_average;
