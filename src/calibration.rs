//! Start-up zero-offset calibration, run while the craft sits still and disarmed.

use crate::attitude::accel_angles;
use crate::error::{FlightError, FlightResult};
use crate::state::{CalibrationBias, RawImuSample};

pub struct Calibrator {
    required: u16,
    accepted: u16,
    gyro_sum: [f32; 3],
    accel_sum: [f32; 3],
}

impl Calibrator {
    pub fn new(required: u16) -> Self {
        Self {
            required: required.max(1),
            accepted: 0,
            gyro_sum: [0.0; 3],
            accel_sum: [0.0; 3],
        }
    }

    /// Accumulate one good sample. Extra samples past the target are ignored.
    pub fn push(&mut self, sample: &RawImuSample) {
        if self.is_complete() {
            return;
        }
        for axis in 0..3 {
            self.gyro_sum[axis] += sample.gyro[axis] as f32;
            self.accel_sum[axis] += sample.accel[axis] as f32;
        }
        self.accepted += 1;
    }

    pub fn is_complete(&self) -> bool {
        self.accepted >= self.required
    }

    pub fn accepted(&self) -> u16 {
        self.accepted
    }

    pub fn finish(&self) -> FlightResult<CalibrationBias> {
        if !self.is_complete() {
            return Err(FlightError::CalibrationIncomplete {
                accepted: self.accepted,
                required: self.required,
            });
        }

        let n = self.accepted as f32;
        let gyro = self.gyro_sum.map(|s| s / n);
        let accel = self.accel_sum.map(|s| s / n);
        let (accel_pitch_deg, accel_roll_deg) = accel_angles(accel).unwrap_or((0.0, 0.0));

        info!(
            "calibration done: gyro bias [{}, {}, {}], level [{}, {}] deg",
            gyro[0],
            gyro[1],
            gyro[2],
            accel_pitch_deg,
            accel_roll_deg
        );

        Ok(CalibrationBias {
            gyro,
            accel_pitch_deg,
            accel_roll_deg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_gyro_offsets() {
        let mut cal = Calibrator::new(4);
        for g in [10, 12, 8, 10] {
            cal.push(&RawImuSample {
                accel: [0, 0, 2048],
                gyro: [g, -g, 2 * g],
            });
        }
        let bias = cal.finish().unwrap();
        assert_eq!(bias.gyro, [10.0, -10.0, 20.0]);
        assert!(bias.accel_pitch_deg.abs() < 1e-4);
    }

    #[test]
    fn derives_level_offsets_from_mean_vector() {
        let mut cal = Calibrator::new(2);
        cal.push(&RawImuSample {
            accel: [100, 0, 2040],
            gyro: [0; 3],
        });
        cal.push(&RawImuSample {
            accel: [100, 0, 2040],
            gyro: [0; 3],
        });
        let bias = cal.finish().unwrap();
        let (pitch, _) = accel_angles([100.0, 0.0, 2040.0]).unwrap();
        assert!((bias.accel_pitch_deg - pitch).abs() < 1e-4);
        assert!(bias.accel_pitch_deg > 0.0);
    }

    #[test]
    fn incomplete_run_is_rejected() {
        let mut cal = Calibrator::new(2000);
        cal.push(&RawImuSample::default());
        assert_eq!(
            cal.finish(),
            Err(FlightError::CalibrationIncomplete {
                accepted: 1,
                required: 2000
            })
        );
    }

    #[test]
    fn stops_accumulating_once_complete() {
        let mut cal = Calibrator::new(1);
        cal.push(&RawImuSample {
            accel: [0, 0, 2048],
            gyro: [4, 4, 4],
        });
        cal.push(&RawImuSample {
            accel: [0, 0, 2048],
            gyro: [100, 100, 100],
        });
        assert_eq!(cal.accepted(), 1);
        assert_eq!(cal.finish().unwrap().gyro, [4.0; 3]);
    }
}
