use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::RigError;

/// One finite acquisition burst: both analog channels, sampled together.
#[derive(Clone, Copy, Debug)]
pub struct BurstRequest {
    pub sampling_rate_hz: u32,
    pub num_samples: usize,
}

/// Raw two-channel voltage buffer returned by one burst.
#[derive(Clone, Debug)]
pub struct RawBuffer {
    pub load_cell_volts: Vec<f64>,
    pub ultrasonic_volts: Vec<f64>,
}

impl RawBuffer {
    /// A short read on either channel is a hardware fault, not a partial result.
    pub fn validate(&self, expected: usize) -> Result<(), RigError> {
        if self.load_cell_volts.len() != expected {
            return Err(RigError::ShortRead {
                channel: "load cell",
                expected,
                got: self.load_cell_volts.len(),
            });
        }
        if self.ultrasonic_volts.len() != expected {
            return Err(RigError::ShortRead {
                channel: "ultrasonic",
                expected,
                got: self.ultrasonic_volts.len(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.load_cell_volts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.load_cell_volts.is_empty()
    }
}

/// Something that can perform one blocking, finite acquisition burst.
///
/// The hardware DAQ driver lives behind this trait; the core never talks to
/// a device directly, which is also the injection seam for tests.
pub trait AcquisitionDevice {
    fn acquire(&mut self, request: &BurstRequest) -> Result<RawBuffer, RigError>;
}

/// In-memory device that replays queued buffers. Useful for tests and
/// deterministic playback.
pub struct ManualDevice {
    queue: VecDeque<RawBuffer>,
}

impl ManualDevice {
    pub fn new(buffers: impl IntoIterator<Item = RawBuffer>) -> Self {
        Self {
            queue: buffers.into_iter().collect(),
        }
    }
}

impl AcquisitionDevice for ManualDevice {
    fn acquire(&mut self, request: &BurstRequest) -> Result<RawBuffer, RigError> {
        let buffer = self
            .queue
            .pop_front()
            .ok_or_else(|| RigError::Acquisition("manual device queue exhausted".into()))?;
        buffer.validate(request.num_samples)?;
        Ok(buffer)
    }
}

/// Simulated tensile rig: the load-cell voltage ramps up to a peak and breaks,
/// the ultrasonic voltage drifts as the specimen extends. Noise is drawn from
/// a seeded generator so runs are reproducible.
pub struct SimulatedRig {
    rng: StdRng,
    noise_volts: f64,
}

impl SimulatedRig {
    pub fn new(seed: u64, noise_volts: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            noise_volts,
        }
    }

    fn noise(&mut self) -> f64 {
        if self.noise_volts == 0.0 {
            return 0.0;
        }
        self.rng.gen_range(-self.noise_volts..self.noise_volts)
    }
}

impl Default for SimulatedRig {
    fn default() -> Self {
        Self::new(0x7e51, 0.002)
    }
}

impl AcquisitionDevice for SimulatedRig {
    fn acquire(&mut self, request: &BurstRequest) -> Result<RawBuffer, RigError> {
        let n = request.num_samples;
        if n == 0 {
            return Err(RigError::Acquisition("burst of zero samples".into()));
        }
        // Specimen loads linearly until fracture at 70% of the burst, then the
        // load cell relaxes back to its resting voltage.
        let break_at = (n as f64 * 0.7) as usize;
        let mut load_cell_volts = Vec::with_capacity(n);
        let mut ultrasonic_volts = Vec::with_capacity(n);
        for i in 0..n {
            let progress = i as f64 / n as f64;
            let load = if i <= break_at {
                2.0 + 0.5 * (i as f64 / break_at.max(1) as f64)
            } else {
                2.0
            };
            // Distance grows monotonically; the jaw keeps moving after fracture.
            let distance = 1.0 + 0.8 * progress;
            load_cell_volts.push(load + self.noise());
            ultrasonic_volts.push(distance + self.noise());
        }
        Ok(RawBuffer {
            load_cell_volts,
            ultrasonic_volts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_read_is_fatal() {
        let buffer = RawBuffer {
            load_cell_volts: vec![0.0; 99],
            ultrasonic_volts: vec![0.0; 100],
        };
        let err = buffer.validate(100).unwrap_err();
        assert!(matches!(
            err,
            RigError::ShortRead {
                channel: "load cell",
                expected: 100,
                got: 99,
            }
        ));
    }

    #[test]
    fn manual_device_replays_in_order() {
        let first = RawBuffer {
            load_cell_volts: vec![1.0; 4],
            ultrasonic_volts: vec![2.0; 4],
        };
        let mut device = ManualDevice::new(vec![first]);
        let request = BurstRequest {
            sampling_rate_hz: 100,
            num_samples: 4,
        };
        let buffer = device.acquire(&request).unwrap();
        assert_eq!(buffer.load_cell_volts, vec![1.0; 4]);
        assert!(device.acquire(&request).is_err());
    }

    #[test]
    fn simulated_rig_returns_exact_burst_and_peaks_before_end() {
        let mut rig = SimulatedRig::new(42, 0.0);
        let request = BurstRequest {
            sampling_rate_hz: 1000,
            num_samples: 200,
        };
        let buffer = rig.acquire(&request).unwrap();
        buffer.validate(200).unwrap();
        let peak = buffer
            .load_cell_volts
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!(peak > 0 && peak < 199);
    }

    #[test]
    fn simulated_rig_is_reproducible_for_equal_seeds() {
        let request = BurstRequest {
            sampling_rate_hz: 1000,
            num_samples: 64,
        };
        let a = SimulatedRig::new(7, 0.01).acquire(&request).unwrap();
        let b = SimulatedRig::new(7, 0.01).acquire(&request).unwrap();
        assert_eq!(a.load_cell_volts, b.load_cell_volts);
        assert_eq!(a.ultrasonic_volts, b.ultrasonic_volts);
    }
}
