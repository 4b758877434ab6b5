use chrono::Local;
use log::info;

use crate::acquisition::{AcquisitionDevice, BurstRequest};
use crate::calibration::store::{CalibrationStore, SensorKind};
use crate::error::RigError;

/// Operator decision for one calibration step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepDecision {
    Proceed,
    Cancel,
}

/// Run the calibration procedure for one sensor.
///
/// For each reference value the `confirm` callback is asked whether the
/// physical setup is ready (the interactive prompt lives in the binary, not
/// here). On proceed, one second of data is acquired and the median voltage
/// becomes the calibration voltage for that step. The store is only written
/// back wholesale once every step has completed; a cancel leaves it untouched
/// and returns `Ok(false)`.
pub fn calibrate_sensor<F>(
    device: &mut dyn AcquisitionDevice,
    store: &mut CalibrationStore,
    kind: SensorKind,
    mut confirm: F,
) -> Result<bool, RigError>
where
    F: FnMut(usize, f64) -> StepDecision,
{
    let (references, frequency_hz) = match kind {
        SensorKind::LoadCell => (
            store.load_cell.calibration_masses_kg.clone(),
            store.load_cell.calibration_frequency_hz,
        ),
        SensorKind::Ultrasonic => (
            store.ultrasonic.calibration_distances_m.clone(),
            store.ultrasonic.calibration_frequency_hz,
        ),
    };
    if references.is_empty() {
        return Err(RigError::InsufficientData {
            what: "calibration reference values",
            needed: 1,
            got: 0,
        });
    }
    let samples = frequency_hz.round() as usize;
    let request = BurstRequest {
        sampling_rate_hz: frequency_hz.round() as u32,
        num_samples: samples,
    };

    let mut voltages = Vec::with_capacity(references.len());
    for (step, &reference) in references.iter().enumerate() {
        if confirm(step, reference) == StepDecision::Cancel {
            info!("{kind} calibration cancelled at step {}", step + 1);
            return Ok(false);
        }
        let buffer = device.acquire(&request)?;
        buffer.validate(samples)?;
        let channel = match kind {
            SensorKind::LoadCell => &buffer.load_cell_volts,
            SensorKind::Ultrasonic => &buffer.ultrasonic_volts,
        };
        let voltage = median(channel);
        info!(
            "{kind} calibration step {}/{}: {} {} -> {:.4} V",
            step + 1,
            references.len(),
            reference,
            kind.reference_unit(),
            voltage
        );
        voltages.push(voltage);
    }

    let date = Local::now().to_rfc3339();
    match kind {
        SensorKind::LoadCell => {
            store.load_cell.calibration_voltages = voltages;
            store.load_cell.calibration_date = date;
        }
        SensorKind::Ultrasonic => {
            store.ultrasonic.calibration_voltages = voltages;
            store.ultrasonic.calibration_date = date;
        }
    }
    info!("{kind} calibration complete");
    Ok(true)
}

/// Median of a burst. Even-length bursts average the two middle samples,
/// matching `numpy.median`.
fn median(data: &[f64]) -> f64 {
    debug_assert!(!data.is_empty());
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{ManualDevice, RawBuffer};
    use crate::calibration::store::test_store;

    fn burst(load: Vec<f64>, ultra: Vec<f64>) -> RawBuffer {
        RawBuffer {
            load_cell_volts: load,
            ultrasonic_volts: ultra,
        }
    }

    #[test]
    fn median_of_even_burst_averages_middles() {
        assert!((median(&[4.0, 1.0, 3.0, 2.0]) - 2.5).abs() < 1e-12);
        assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn stores_median_voltage_per_step_and_bumps_date() {
        let mut store = test_store();
        store.load_cell.calibration_masses_kg = vec![0.0, 0.1];
        store.load_cell.calibration_frequency_hz = 4.0;
        let old_date = store.load_cell.calibration_date.clone();
        // One 4-sample burst per step; medians 2.0 and 2.15.
        let mut device = ManualDevice::new(vec![
            burst(vec![1.9, 2.0, 2.0, 2.1], vec![0.0; 4]),
            burst(vec![2.1, 2.2, 2.1, 2.2], vec![0.0; 4]),
        ]);
        let completed =
            calibrate_sensor(&mut device, &mut store, SensorKind::LoadCell, |_, _| {
                StepDecision::Proceed
            })
            .unwrap();
        assert!(completed);
        assert!((store.load_cell.calibration_voltages[0] - 2.0).abs() < 1e-12);
        assert!((store.load_cell.calibration_voltages[1] - 2.15).abs() < 1e-12);
        assert_ne!(store.load_cell.calibration_date, old_date);
    }

    #[test]
    fn cancel_leaves_store_untouched() {
        let mut store = test_store();
        store.ultrasonic.calibration_frequency_hz = 2.0;
        let before = store.ultrasonic.clone();
        let mut device = ManualDevice::new(vec![burst(vec![0.0; 2], vec![1.0, 1.0])]);
        let completed =
            calibrate_sensor(&mut device, &mut store, SensorKind::Ultrasonic, |step, _| {
                if step == 0 {
                    StepDecision::Proceed
                } else {
                    StepDecision::Cancel
                }
            })
            .unwrap();
        assert!(!completed);
        assert_eq!(
            store.ultrasonic.calibration_voltages,
            before.calibration_voltages
        );
        assert_eq!(store.ultrasonic.calibration_date, before.calibration_date);
    }

    #[test]
    fn reads_the_channel_matching_the_sensor() {
        let mut store = test_store();
        store.ultrasonic.calibration_distances_m = vec![0.05];
        store.ultrasonic.calibration_frequency_hz = 3.0;
        let mut device = ManualDevice::new(vec![burst(vec![9.0; 3], vec![1.0, 1.1, 1.2])]);
        calibrate_sensor(&mut device, &mut store, SensorKind::Ultrasonic, |_, _| {
            StepDecision::Proceed
        })
        .unwrap();
        assert!((store.ultrasonic.calibration_voltages[0] - 1.1).abs() < 1e-12);
    }
}
