use log::info;
use ndarray::Array1;

use crate::acquisition::{AcquisitionDevice, BurstRequest};
use crate::analysis::calibrate::CalibrationModel;
use crate::analysis::differentiate::velocity_from_displacement;
use crate::analysis::events::{self, EventOptions, TestSummary};
use crate::analysis::smoothing::moving_average;
use crate::calibration::store::{CalibrationStore, SensorKind};
use crate::config::TestConfig;
use crate::error::RigError;

/// Calibrated, time-aligned result of one acquisition burst. All arrays have
/// the same length and index alignment; nothing mutates them after the stage
/// that wrote them.
#[derive(Clone, Debug)]
pub struct CalibratedSeries {
    pub time: Array1<f64>,
    /// Smoothed force, re-referenced to its initial value (N).
    pub force: Array1<f64>,
    /// Distance re-referenced to the start of the burst (m).
    pub displacement: Array1<f64>,
    /// Raw calibrated distance (m); kept so inverse predictions for the
    /// uncertainty estimate stay inside the calibration range.
    pub distance: Array1<f64>,
    /// Smoothed velocity (m/s).
    pub velocity: Array1<f64>,
}

impl CalibratedSeries {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Drives one complete test: blocking acquisition, calibration mapping,
/// signal conditioning, differentiation and event extraction.
///
/// Everything is allocated fresh per run; the calibration store snapshot and
/// config are only read. Models are re-fit from the latest tables each run
/// rather than cached — the fit is cheap and this way a re-calibration is
/// picked up immediately.
pub struct TestPipeline<'a> {
    config: &'a TestConfig,
    store: &'a CalibrationStore,
}

impl<'a> TestPipeline<'a> {
    pub fn new(config: &'a TestConfig, store: &'a CalibrationStore) -> Self {
        Self { config, store }
    }

    pub fn run(
        &self,
        device: &mut dyn AcquisitionDevice,
    ) -> Result<(CalibratedSeries, TestSummary), RigError> {
        let num_samples = self.config.num_samples();
        if num_samples == 0 {
            return Err(RigError::Config(
                "requested burst works out to zero samples".into(),
            ));
        }
        let request = BurstRequest {
            sampling_rate_hz: self.config.sampling_rate_hz,
            num_samples,
        };
        info!(
            "acquiring {} samples at {} Hz ({:.3} s)",
            num_samples,
            self.config.sampling_rate_hz,
            self.config.test_duration_s()
        );
        let buffer = device.acquire(&request)?;
        buffer.validate(num_samples)?;

        let load_cell_table = self.store.table(SensorKind::LoadCell);
        let load_cell = CalibrationModel::fit(
            SensorKind::LoadCell,
            &load_cell_table.reference_values,
            &load_cell_table.voltages,
        )?;
        let ultrasonic_table = self.store.table(SensorKind::Ultrasonic);
        let ultrasonic = CalibrationModel::fit(
            SensorKind::Ultrasonic,
            &ultrasonic_table.reference_values,
            &ultrasonic_table.voltages,
        )?;

        let force_raw = Array1::from_iter(
            buffer
                .load_cell_volts
                .iter()
                .map(|&v| load_cell.predict(v)),
        );
        let distance = Array1::from_iter(
            buffer
                .ultrasonic_volts
                .iter()
                .map(|&v| ultrasonic.predict(v)),
        );

        let window = self.config.smoothing_window;
        let force_smoothed = moving_average(&force_raw, window)?;
        let force = &force_smoothed - force_smoothed[0];
        let displacement = &distance - distance[0];

        let time = Array1::linspace(0.0, self.config.test_duration_s(), num_samples);
        let velocity_raw = velocity_from_displacement(&displacement, &time)?;
        let velocity = moving_average(&velocity_raw, window)?;

        let series = CalibratedSeries {
            time,
            force,
            displacement,
            distance,
            velocity,
        };
        let options = EventOptions {
            start_threshold_fraction: self.config.start_threshold_fraction,
            force_min_variation: load_cell_table.min_variation_warning,
            displacement_min_variation: ultrasonic_table.min_variation_warning,
        };
        let summary = events::extract(
            &series,
            &ultrasonic,
            &options,
            self.config.sampling_rate_hz,
            self.config.test_duration_s(),
        )?;
        info!(
            "test complete: max force {:.3} N at sample {}, displacement {:.4} m",
            summary.max_force_n, summary.break_index, summary.displacement_at_break_m
        );
        Ok((series, summary))
    }
}
