// src/calibration/mod.rs
pub mod procedure;
pub mod store;

pub use procedure::{calibrate_sensor, StepDecision};
pub use store::{CalibrationStore, CalibrationTable, SensorKind};
