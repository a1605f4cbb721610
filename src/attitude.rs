//! Pitch/roll estimation from one IMU sample per cycle.
//!
//! Gyro rates are integrated into the angle, then pulled towards the
//! accelerometer tilt by a fixed-weight complementary filter. Yaw has no
//! absolute reference and is reported as a rate only.
//!
//! Angles follow the accelerometer: pitch is positive when +X points up, roll
//! positive when +Y points down. On a right-handed IMU both are negative
//! rotations about their sensor axis, so the X and Y gyro rates are negated
//! before they are integrated or handed to the rate loops.

#[allow(unused_imports)]
use micromath::F32Ext;

use crate::config::{FlightConfig, GYRO_WEIGHT};
use crate::error::{FlightError, FlightResult};
use crate::filter::{ComplementaryFilter, LowPassFilter};
use crate::state::{AttitudeEstimate, CalibrationBias, RawImuSample};

/// Tilt from a gravity vector, `(pitch, roll)` in degrees.
///
/// Returns `None` for a zero-length vector; such a sample carries no tilt information.
pub fn accel_angles(accel: [f32; 3]) -> Option<(f32, f32)> {
    let norm = (accel[0] * accel[0] + accel[1] * accel[1] + accel[2] * accel[2]).sqrt();
    if !(norm > 0.0) || !norm.is_finite() {
        return None;
    }

    let pitch = (accel[0] / norm).clamp(-1.0, 1.0).asin().to_degrees();
    let roll = -(accel[1] / norm).clamp(-1.0, 1.0).asin().to_degrees();
    Some((pitch, roll))
}

pub struct AttitudeEstimator {
    pitch: ComplementaryFilter,
    roll: ComplementaryFilter,
    // roll, pitch, yaw
    rates: [LowPassFilter; 3],
    gyro_lsb_per_dps: f32,
    last: AttitudeEstimate,
    consecutive_faults: u8,
}

impl AttitudeEstimator {
    pub fn new(config: &FlightConfig) -> Self {
        Self {
            pitch: ComplementaryFilter::new(GYRO_WEIGHT),
            roll: ComplementaryFilter::new(GYRO_WEIGHT),
            rates: [
                LowPassFilter::new(config.rate_smoothing),
                LowPassFilter::new(config.rate_smoothing),
                LowPassFilter::new(config.rate_smoothing),
            ],
            gyro_lsb_per_dps: config.gyro_lsb_per_dps,
            last: AttitudeEstimate::default(),
            consecutive_faults: 0,
        }
    }

    /// Fold one bus read into the estimate.
    ///
    /// A failed read (or one that would produce non-finite angles) leaves the last
    /// good estimate untouched, bumps the fault counter and reports `SensorFault`.
    pub fn update(
        &mut self,
        sample: FlightResult<RawImuSample>,
        bias: &CalibrationBias,
        dt: f32,
    ) -> FlightResult<AttitudeEstimate> {
        let sample = match sample {
            Ok(s) => s,
            Err(_) => return Err(self.fault()),
        };
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };

        let mut dps = [0.0f32; 3];
        for (axis, rate) in dps.iter_mut().enumerate() {
            *rate = (sample.gyro[axis] as f32 - bias.gyro[axis]) / self.gyro_lsb_per_dps;
        }
        if dps.iter().any(|r| !r.is_finite()) {
            return Err(self.fault());
        }
        let [gyro_x, gyro_y, yaw_dps] = dps;
        let (roll_dps, pitch_dps) = (-gyro_x, -gyro_y);

        let accel = [
            sample.accel[0] as f32,
            sample.accel[1] as f32,
            sample.accel[2] as f32,
        ];

        // Zero gravity vector: hold the filtered angles for this cycle.
        if let Some((pitch_acc, roll_acc)) = accel_angles(accel) {
            self.pitch.propagate(pitch_dps * dt);
            self.roll.propagate(roll_dps * dt);

            // A yaw step moves tilt from one axis to the other.
            let yaw_step = (yaw_dps * dt).to_radians().sin();
            let (pitch_now, roll_now) = (self.pitch.angle(), self.roll.angle());
            self.pitch.shift(roll_now * yaw_step);
            self.roll.shift(-pitch_now * yaw_step);

            self.pitch.correct(pitch_acc - bias.accel_pitch_deg);
            self.roll.correct(roll_acc - bias.accel_roll_deg);
        }

        let estimate = AttitudeEstimate {
            pitch: self.pitch.angle(),
            roll: self.roll.angle(),
            roll_rate: self.rates[0].filter(roll_dps),
            pitch_rate: self.rates[1].filter(pitch_dps),
            yaw_rate: self.rates[2].filter(yaw_dps),
        };

        let finite = [
            estimate.pitch,
            estimate.roll,
            estimate.roll_rate,
            estimate.pitch_rate,
            estimate.yaw_rate,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            self.restore();
            return Err(self.fault());
        }

        self.last = estimate;
        self.consecutive_faults = 0;
        Ok(estimate)
    }

    /// Last valid estimate.
    pub fn estimate(&self) -> AttitudeEstimate {
        self.last
    }

    pub fn consecutive_faults(&self) -> u8 {
        self.consecutive_faults
    }

    fn fault(&mut self) -> FlightError {
        self.consecutive_faults = self.consecutive_faults.saturating_add(1);
        FlightError::SensorFault
    }

    // Put the filters back onto the last good estimate after a poisoned update.
    fn restore(&mut self) {
        self.pitch.reset();
        self.roll.reset();
        self.pitch.correct(self.last.pitch);
        self.roll.correct(self.last.roll);
        for rate in self.rates.iter_mut() {
            rate.reset();
        }
        self.rates[0].filter(self.last.roll_rate);
        self.rates[1].filter(self.last.pitch_rate);
        self.rates[2].filter(self.last.yaw_rate);
    }
}
