//! Data types exchanged between the stages of one control cycle.
//!
//! All types are `Copy`: every stage hands the next one a value, never a reference
//! into its own state.
use crate::config::{ESC_IDLE_US, MOTOR_COUNT, STICK_CENTER_US};

// ── Sensor input ──────────────────────────────────────────────────────────────

/// One raw IMU read, sensor counts.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawImuSample {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}

/// Zero offsets measured at start-up while disarmed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationBias {
    /// Mean gyro counts per axis at rest.
    pub gyro: [f32; 3],
    /// Accelerometer pitch angle read on the bench, degrees.
    pub accel_pitch_deg: f32,
    /// Accelerometer roll angle read on the bench, degrees.
    pub accel_roll_deg: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttitudeEstimate {
    pub pitch: f32,
    pub roll: f32,
    /// Smoothed body rates, °/s. Yaw has no absolute reference.
    pub pitch_rate: f32,
    pub roll_rate: f32,
    pub yaw_rate: f32,
}

// ── Radio input ───────────────────────────────────────────────────────────────

/// Stick and switch positions in µs, captured once per cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioChannelSnapshot {
    pub throttle: u16,
    pub roll: u16,
    pub pitch: u16,
    pub yaw: u16,
    /// Arming switch.
    pub switch_a: u16,
    /// Flight-mode switch, sampled only at the arm transition.
    pub switch_b: u16,
    /// Set when the link is lost; the snapshot then carries safe values only.
    pub failsafe: bool,
}

impl RadioChannelSnapshot {
    pub const fn failsafe() -> Self {
        Self {
            throttle: ESC_IDLE_US,
            roll: STICK_CENTER_US,
            pitch: STICK_CENTER_US,
            yaw: STICK_CENTER_US,
            switch_a: ESC_IDLE_US,
            switch_b: ESC_IDLE_US,
            failsafe: true,
        }
    }
}

impl Default for RadioChannelSnapshot {
    fn default() -> Self {
        Self::failsafe()
    }
}

// ── Arming ────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightMode {
    #[default]
    Disarmed,
    ArmedAutoLevel,
    ArmedAcro,
}

impl FlightMode {
    pub fn is_armed(self) -> bool {
        !matches!(self, Self::Disarmed)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ArmingState {
    pub primary_armed: bool,
    pub secondary_armed: bool,
    pub mode: FlightMode,
}

impl ArmingState {
    pub fn auto_level(&self) -> bool {
        self.mode == FlightMode::ArmedAutoLevel
    }

    pub fn acro_mode(&self) -> bool {
        self.mode == FlightMode::ArmedAcro
    }

    pub fn is_armed(&self) -> bool {
        self.mode.is_armed()
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

/// Pulse width per motor, µs. Index 0 is `esc_1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorCommand {
    pub esc: [u16; MOTOR_COUNT],
}

impl MotorCommand {
    pub const IDLE: Self = Self {
        esc: [ESC_IDLE_US; MOTOR_COUNT],
    };
}

impl Default for MotorCommand {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Per-axis values, used for setpoints and PID corrections.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisTriple {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// Snapshot published to the telemetry sink once per cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryRecord {
    pub cycle_timestamp_us: u64,
    pub attitude: AttitudeEstimate,
    pub arming: ArmingState,
    pub command: MotorCommand,
    /// At least one ESC output hit its clamp this cycle.
    pub saturated: bool,
}
