// src/lib.rs
pub mod acquisition;
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod error;
pub mod export;
pub mod plot;

pub use acquisition::{AcquisitionDevice, BurstRequest, RawBuffer, SimulatedRig};
pub use analysis::{CalibratedSeries, CalibrationModel, TestPipeline, TestSummary};
pub use calibration::{CalibrationStore, SensorKind};
pub use config::TestConfig;
pub use error::RigError;

/// Standard gravity used to convert calibration masses (kg) to force (N).
pub const STANDARD_GRAVITY: f64 = 9.8;
