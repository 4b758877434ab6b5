use crate::calibration::store::SensorKind;
use crate::error::RigError;

/// Affine voltage-to-physical-unit model for one sensor, fit by least squares
/// from paired calibration samples. Immutable once fit; a re-calibration
/// produces a fresh model.
#[derive(Clone, Debug)]
pub struct CalibrationModel {
    sensor: SensorKind,
    slope: f64,
    intercept: f64,
    reference_values: Vec<f64>,
    voltages: Vec<f64>,
}

impl CalibrationModel {
    /// Fit `value = slope * voltage + intercept` to the calibration points.
    /// Reference values must already be in the model's output unit (newtons
    /// for the load cell, metres for the ultrasonic sensor).
    pub fn fit(
        sensor: SensorKind,
        reference_values: &[f64],
        voltages: &[f64],
    ) -> Result<Self, RigError> {
        if reference_values.len() != voltages.len() {
            return Err(RigError::InsufficientData {
                what: "calibration points (reference/voltage length mismatch)",
                needed: reference_values.len(),
                got: voltages.len(),
            });
        }
        let n = voltages.len();
        if n < 2 {
            return Err(RigError::InsufficientData {
                what: "calibration points",
                needed: 2,
                got: n,
            });
        }
        let mean_v = voltages.iter().sum::<f64>() / n as f64;
        let mean_y = reference_values.iter().sum::<f64>() / n as f64;
        let mut sxy = 0.0;
        let mut sxx = 0.0;
        for (&v, &y) in voltages.iter().zip(reference_values) {
            sxy += (v - mean_v) * (y - mean_y);
            sxx += (v - mean_v) * (v - mean_v);
        }
        if sxx == 0.0 {
            return Err(RigError::DegenerateModel {
                sensor: sensor.name(),
                reason: "all calibration voltages are identical",
            });
        }
        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_v;
        Ok(Self {
            sensor,
            slope,
            intercept,
            reference_values: reference_values.to_vec(),
            voltages: voltages.to_vec(),
        })
    }

    pub fn sensor(&self) -> SensorKind {
        self.sensor
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Map a measured voltage to physical units.
    pub fn predict(&self, voltage: f64) -> f64 {
        self.slope * voltage + self.intercept
    }

    /// Recover the voltage that predicts `value`.
    pub fn invert(&self, value: f64) -> Result<f64, RigError> {
        if self.slope == 0.0 {
            return Err(RigError::DegenerateModel {
                sensor: self.sensor.name(),
                reason: "zero slope, inverse prediction undefined",
            });
        }
        Ok((value - self.intercept) / self.slope)
    }

    /// One-sided prediction-interval half-width for a predicted value, from
    /// the regression residual scatter. Widens as the query moves away from
    /// the centre of the calibration voltages; it does not bound extrapolation.
    pub fn prediction_half_width(&self, predicted_value: f64) -> Result<f64, RigError> {
        let n = self.voltages.len();
        if n <= 2 {
            return Err(RigError::DegenerateModel {
                sensor: self.sensor.name(),
                reason: "need more than two calibration points for an uncertainty estimate",
            });
        }
        let residual_sq_sum: f64 = self
            .voltages
            .iter()
            .zip(&self.reference_values)
            .map(|(&v, &y)| {
                let r = self.predict(v) - y;
                r * r
            })
            .sum();
        let standard_error = (residual_sq_sum / (n as f64 - 2.0)).sqrt();

        let voltage = self.invert(predicted_value)?;
        let mean_v = self.voltages.iter().sum::<f64>() / n as f64;
        // Bessel-corrected sample variance of the calibration voltages.
        let variance = self
            .voltages
            .iter()
            .map(|&v| (v - mean_v) * (v - mean_v))
            .sum::<f64>()
            / (n as f64 - 1.0);
        if variance == 0.0 {
            return Err(RigError::DegenerateModel {
                sensor: self.sensor.name(),
                reason: "all calibration voltages are identical",
            });
        }
        let leverage = (voltage - mean_v) * (voltage - mean_v) / ((n as f64 - 1.0) * variance);
        Ok(standard_error * (1.0 + 1.0 / n as f64 + leverage).sqrt())
    }
}
