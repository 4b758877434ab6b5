use log::warn;
use ndarray::{s, Array1};

use crate::analysis::calibrate::CalibrationModel;
use crate::analysis::pipeline::CalibratedSeries;
use crate::calibration::store::SensorKind;
use crate::error::RigError;

/// Non-fatal data-quality flag: a channel barely moved over the whole burst,
/// which usually means a disconnected or saturated sensor.
#[derive(Clone, Copy, Debug)]
pub struct LowVariationWarning {
    pub sensor: SensorKind,
    pub variation: f64,
    pub threshold: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct EventOptions {
    /// Fraction of the baseline-to-peak rise that marks the test start.
    pub start_threshold_fraction: f64,
    pub force_min_variation: f64,
    pub displacement_min_variation: f64,
}

impl Default for EventOptions {
    fn default() -> Self {
        Self {
            start_threshold_fraction: 0.05,
            force_min_variation: 0.0,
            displacement_min_variation: 0.0,
        }
    }
}

/// Scalar results of one test run, plus the echoed test configuration.
/// Created once per run and never mutated; this is the unit of export.
#[derive(Clone, Debug)]
pub struct TestSummary {
    pub max_force_n: f64,
    pub displacement_at_break_m: f64,
    pub displacement_uncertainty_m: f64,
    pub velocity_at_break_m_s: f64,
    pub average_velocity_m_s: f64,
    pub start_index: usize,
    pub break_index: usize,
    pub sampling_rate_hz: u32,
    pub test_duration_s: f64,
    pub warnings: Vec<LowVariationWarning>,
}

/// Locate the test-start transient and the break event, and compute the
/// summary scalars.
///
/// The break is taken to be the sample of peak force. That is a modeling
/// choice specific to this rig (the specimen lets go at peak load), not a
/// general fracture detector.
pub fn extract(
    series: &CalibratedSeries,
    ultrasonic: &CalibrationModel,
    options: &EventOptions,
    sampling_rate_hz: u32,
    test_duration_s: f64,
) -> Result<TestSummary, RigError> {
    let force = &series.force;
    let n = force.len();
    if n == 0 {
        return Err(RigError::InsufficientData {
            what: "calibrated samples",
            needed: 1,
            got: 0,
        });
    }

    let (break_index, &max_force) = force
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .expect("non-empty force series");

    let baseline = force[0];
    let rise = max_force - baseline;
    let threshold = baseline + options.start_threshold_fraction * rise;
    let start_index = force
        .iter()
        .position(|&f| f > threshold)
        .ok_or_else(|| RigError::NoEventFound("force never rose above its baseline".into()))?;
    if start_index >= break_index {
        return Err(RigError::NoEventFound(format!(
            "test start (sample {start_index}) not before break (sample {break_index})"
        )));
    }

    let displacement_at_break = series.displacement[break_index];
    // Query the uncertainty at the raw calibrated distance so the inverse
    // prediction stays inside the calibration range.
    let displacement_uncertainty =
        ultrasonic.prediction_half_width(series.distance[break_index])?;
    let velocity_at_break = series.velocity[break_index];
    let average_velocity = series
        .velocity
        .slice(s![start_index..break_index])
        .mean()
        .expect("start before break");

    let mut warnings = Vec::new();
    check_variation(
        SensorKind::LoadCell,
        force,
        options.force_min_variation,
        &mut warnings,
    );
    check_variation(
        SensorKind::Ultrasonic,
        &series.displacement,
        options.displacement_min_variation,
        &mut warnings,
    );

    Ok(TestSummary {
        max_force_n: max_force,
        displacement_at_break_m: displacement_at_break,
        displacement_uncertainty_m: displacement_uncertainty,
        velocity_at_break_m_s: velocity_at_break,
        average_velocity_m_s: average_velocity,
        start_index,
        break_index,
        sampling_rate_hz,
        test_duration_s,
        warnings,
    })
}

/// Relative variation check. Flags the channel but never aborts: the operator
/// reviews the summary and plot before trusting a run.
fn check_variation(
    sensor: SensorKind,
    data: &Array1<f64>,
    threshold: f64,
    warnings: &mut Vec<LowVariationWarning>,
) {
    if threshold <= 0.0 {
        return;
    }
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let variation = if max.abs() < f64::EPSILON {
        0.0
    } else {
        (max - min) / max
    };
    if variation < threshold {
        warn!(
            "{sensor} data variation {variation:.4} below {threshold:.4}; check the sensor connection"
        );
        warnings.push(LowVariationWarning {
            sensor,
            variation,
            threshold,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn ultrasonic_model() -> CalibrationModel {
        CalibrationModel::fit(
            SensorKind::Ultrasonic,
            &[0.05, 0.10, 0.15],
            &[1.0, 2.0, 3.0],
        )
        .unwrap()
    }

    /// Force rises linearly 0..peak over `rise_len` samples, then relaxes.
    fn synthetic_series(n: usize, rise_len: usize, peak: f64) -> CalibratedSeries {
        let time = Array1::linspace(0.0, 1.0, n);
        let force = Array1::from_shape_fn(n, |i| {
            if i <= rise_len {
                peak * i as f64 / rise_len as f64
            } else {
                peak * 0.1
            }
        });
        let distance = time.mapv(|t| 0.05 + 0.05 * t);
        let displacement = &distance - distance[0];
        let velocity = Array1::from_elem(n, 0.05);
        CalibratedSeries {
            time,
            force,
            displacement,
            distance,
            velocity,
        }
    }

    #[test]
    fn break_is_at_peak_force() {
        let series = synthetic_series(150, 100, 100.0);
        let summary = extract(
            &series,
            &ultrasonic_model(),
            &EventOptions::default(),
            1000,
            1.0,
        )
        .unwrap();
        assert_eq!(summary.break_index, 100);
        assert!((summary.max_force_n - 100.0).abs() < 1e-12);
        assert!(summary.start_index < summary.break_index);
        assert!((summary.velocity_at_break_m_s - 0.05).abs() < 1e-12);
        assert!((summary.average_velocity_m_s - 0.05).abs() < 1e-12);
        assert!(summary.warnings.is_empty());
    }

    #[test]
    fn start_index_respects_threshold_fraction() {
        let series = synthetic_series(150, 100, 100.0);
        let options = EventOptions {
            start_threshold_fraction: 0.5,
            ..EventOptions::default()
        };
        let summary = extract(&series, &ultrasonic_model(), &options, 1000, 1.0).unwrap();
        // First sample strictly above 50.0 on a 1-per-sample ramp.
        assert_eq!(summary.start_index, 51);
    }

    #[test]
    fn constant_force_yields_no_event() {
        let mut series = synthetic_series(50, 30, 1.0);
        series.force = Array1::from_elem(50, 5.0);
        let err = extract(
            &series,
            &ultrasonic_model(),
            &EventOptions::default(),
            1000,
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, RigError::NoEventFound(_)));
    }

    #[test]
    fn low_variation_is_a_warning_not_an_error() {
        let mut series = synthetic_series(100, 60, 100.0);
        // Displacement barely moves: a stuck ultrasonic sensor.
        series.distance = Array1::from_elem(100, 0.1);
        series.displacement = Array1::from_shape_fn(100, |i| 1.0 + 1e-6 * i as f64);
        let options = EventOptions {
            start_threshold_fraction: 0.05,
            force_min_variation: 0.01,
            displacement_min_variation: 0.01,
        };
        let summary = extract(&series, &ultrasonic_model(), &options, 1000, 1.0).unwrap();
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(summary.warnings[0].sensor, SensorKind::Ultrasonic);
    }

    #[test]
    fn displacement_uncertainty_is_non_negative() {
        let series = synthetic_series(150, 100, 100.0);
        let summary = extract(
            &series,
            &ultrasonic_model(),
            &EventOptions::default(),
            1000,
            1.0,
        )
        .unwrap();
        assert!(summary.displacement_uncertainty_m >= 0.0);
    }
}
