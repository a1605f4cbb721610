//! Fixed-rate multi-channel ESC pulse generation.
//!
//! All four channels rise together on a common reference edge and fall
//! individually `esc_i` microseconds later. Two reference edges are never closer
//! than [`REFRESH_PERIOD_US`]. [`PulseTrain::emit`] busy-waits for the whole
//! phase: it is the one blocking step of a control cycle and cannot be cancelled
//! once started, so an ESC never sees a truncated pulse.

use crate::config::{ESC_MAX_US, MOTOR_COUNT, REFRESH_PERIOD_US};
use crate::mixer::{mix, MixOutput};
use crate::state::{AxisTriple, MotorCommand};

/// Board-specific access to the four motor outputs and a microsecond clock.
pub trait PulseChannelDriver {
    /// Drive every channel high at once.
    fn raise_all(&mut self);
    /// Drive one channel (`0..MOTOR_COUNT`) low.
    fn lower(&mut self, channel: usize);
    /// Monotonic microsecond clock.
    fn now_micros(&mut self) -> u64;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseReport {
    /// Timestamp of this cycle's common rising edge.
    pub reference_us: u64,
    /// Time since the previous rising edge, `None` on the first train.
    pub period_us: Option<u64>,
}

pub struct PulseTrain<D: PulseChannelDriver> {
    driver: D,
    reference_us: Option<u64>,
}

impl<D: PulseChannelDriver> PulseTrain<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            reference_us: None,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn now_micros(&mut self) -> u64 {
        self.driver.now_micros()
    }

    /// Emit one pulse per channel. Blocks until every channel is low again.
    pub fn emit(&mut self, command: &MotorCommand) -> PulseReport {
        let mut now = self.driver.now_micros();
        if let Some(previous) = self.reference_us {
            while now.saturating_sub(previous) < REFRESH_PERIOD_US {
                now = self.driver.now_micros();
            }
        }

        let period_us = self.reference_us.map(|previous| now - previous);
        let reference = now;
        self.reference_us = Some(reference);
        self.driver.raise_all();

        let mut fall = [0u64; MOTOR_COUNT];
        for (at, width) in fall.iter_mut().zip(command.esc) {
            *at = reference + width.min(ESC_MAX_US) as u64;
        }

        let mut high = [true; MOTOR_COUNT];
        let mut remaining = MOTOR_COUNT;
        while remaining > 0 {
            let now = self.driver.now_micros();
            for channel in 0..MOTOR_COUNT {
                if high[channel] && now >= fall[channel] {
                    self.driver.lower(channel);
                    high[channel] = false;
                    remaining -= 1;
                }
            }
        }

        PulseReport {
            reference_us: reference,
            period_us,
        }
    }

    /// Mix and emit in one step.
    pub fn mix_and_drive(
        &mut self,
        throttle: u16,
        roll_out: f32,
        pitch_out: f32,
        yaw_out: f32,
        armed: bool,
        battery_centivolts: u16,
    ) -> (MixOutput, PulseReport) {
        let corrections = AxisTriple {
            roll: roll_out,
            pitch: pitch_out,
            yaw: yaw_out,
        };
        let out = mix(throttle, &corrections, armed, battery_centivolts);
        let report = self.emit(&out.command);
        (out, report)
    }
}
