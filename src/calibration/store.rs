use std::fmt;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::RigError;
use crate::STANDARD_GRAVITY;

/// The two analog sensors on the rig. Each carries its own calibration table
/// and physical unit; there is no integer discriminant anywhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorKind {
    LoadCell,
    Ultrasonic,
}

impl SensorKind {
    /// Unit of the calibrated output signal.
    pub fn unit(&self) -> &'static str {
        match self {
            SensorKind::LoadCell => "N",
            SensorKind::Ultrasonic => "m",
        }
    }

    /// Unit the operator works in during calibration.
    pub fn reference_unit(&self) -> &'static str {
        match self {
            SensorKind::LoadCell => "kg",
            SensorKind::Ultrasonic => "m",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SensorKind::LoadCell => "load cell",
            SensorKind::Ultrasonic => "ultrasonic",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sensor-agnostic view of a calibration record, in the units the fit runs in.
/// For the load cell the reference masses are already converted to newtons.
#[derive(Clone, Debug)]
pub struct CalibrationTable {
    pub reference_values: Vec<f64>,
    pub voltages: Vec<f64>,
    pub min_variation_warning: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoadCellCalibration {
    pub calibration_masses_kg: Vec<f64>,
    pub calibration_voltages: Vec<f64>,
    pub calibration_frequency_hz: f64,
    pub calibration_date: String,
    pub minimum_data_variation_warning: f64,
}

impl LoadCellCalibration {
    pub fn table(&self) -> CalibrationTable {
        CalibrationTable {
            reference_values: self
                .calibration_masses_kg
                .iter()
                .map(|m| m * STANDARD_GRAVITY)
                .collect(),
            voltages: self.calibration_voltages.clone(),
            min_variation_warning: self.minimum_data_variation_warning,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UltrasonicCalibration {
    pub calibration_distances_m: Vec<f64>,
    pub calibration_voltages: Vec<f64>,
    pub calibration_frequency_hz: f64,
    pub calibration_date: String,
    pub minimum_data_variation_warning: f64,
}

impl UltrasonicCalibration {
    pub fn table(&self) -> CalibrationTable {
        CalibrationTable {
            reference_values: self.calibration_distances_m.clone(),
            voltages: self.calibration_voltages.clone(),
            min_variation_warning: self.minimum_data_variation_warning,
        }
    }
}

/// Process-wide calibration state, persisted as `calibration.json`.
///
/// The analysis core reads a snapshot of this at run start and never mutates
/// it; only the calibration procedure writes back.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CalibrationStore {
    pub load_cell: LoadCellCalibration,
    pub ultrasonic: UltrasonicCalibration,
}

impl CalibrationStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let store: CalibrationStore =
            serde_json::from_str(&contents).map_err(|source| RigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        info!(
            "loaded calibration from {} (load cell: {} points, ultrasonic: {} points)",
            path.display(),
            store.load_cell.calibration_voltages.len(),
            store.ultrasonic.calibration_voltages.len()
        );
        Ok(store)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RigError> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self).map_err(|source| RigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(path, contents)?;
        info!("saved calibration to {}", path.display());
        Ok(())
    }

    pub fn table(&self, kind: SensorKind) -> CalibrationTable {
        match kind {
            SensorKind::LoadCell => self.load_cell.table(),
            SensorKind::Ultrasonic => self.ultrasonic.table(),
        }
    }

    pub fn last_calibrated(&self, kind: SensorKind) -> &str {
        match kind {
            SensorKind::LoadCell => &self.load_cell.calibration_date,
            SensorKind::Ultrasonic => &self.ultrasonic.calibration_date,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_store() -> CalibrationStore {
    CalibrationStore {
        load_cell: LoadCellCalibration {
            calibration_masses_kg: vec![0.0, 0.1, 0.2],
            calibration_voltages: vec![2.0, 2.1, 2.2],
            calibration_frequency_hz: 1000.0,
            calibration_date: "2025-02-06T00:00:00-07:00".into(),
            minimum_data_variation_warning: 0.01,
        },
        ultrasonic: UltrasonicCalibration {
            calibration_distances_m: vec![0.05, 0.10, 0.15],
            calibration_voltages: vec![1.0, 2.0, 3.0],
            calibration_frequency_hz: 1000.0,
            calibration_date: "2025-02-06T00:00:00-07:00".into(),
            minimum_data_variation_warning: 0.01,
        },
    }
}
