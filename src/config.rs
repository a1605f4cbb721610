//! Flight constants and runtime-tunable parameters.

// ── Radio / stick geometry (µs) ───────────────────────────────────────────────

/// Switch position above which a 3-way switch counts as "up".
pub const SWITCH_HIGH_US: u16 = 1500;
/// Lower edge of the stick-center deadband.
pub const DEADBAND_LOW_US: u16 = 1492;
/// Upper edge of the stick-center deadband.
pub const DEADBAND_HIGH_US: u16 = 1508;
/// Stick center reported in failsafe snapshots.
pub const STICK_CENTER_US: u16 = 1500;

// ── Setpoint shaping ──────────────────────────────────────────────────────────

/// Attitude (deg) to stick-µs gain of the auto-level trim term.
pub const LEVEL_TRIM_GAIN: f32 = 15.0;
/// Stick µs per °/s of commanded rate.
pub const SETPOINT_DIVISOR: f32 = 3.0;

// ── ESC output (µs) ───────────────────────────────────────────────────────────

pub const ESC_IDLE_US: u16 = 1000;
pub const ESC_MIN_ARMED_US: u16 = 1050;
pub const ESC_MAX_US: u16 = 2000;
/// Throttle ceiling before mixing, leaves authority for the corrections.
pub const THROTTLE_MAX_US: u16 = 1800;
/// Minimum period between two pulse trains (≤ 250 Hz).
pub const REFRESH_PERIOD_US: u64 = 4000;
pub const MOTOR_COUNT: usize = 4;

// ── Battery compensation (centivolts) ─────────────────────────────────────────

/// Compensation applies strictly inside `(BATTERY_COMP_MIN_CV, BATTERY_COMP_MAX_CV)`.
pub const BATTERY_COMP_MIN_CV: u16 = 1100;
pub const BATTERY_COMP_MAX_CV: u16 = 1260;
pub const BATTERY_COMP_REFERENCE_CV: f32 = 1240.0;
pub const BATTERY_COMP_DIVISOR: f32 = 3000.0;

// ── Complementary filter ──────────────────────────────────────────────────────

pub const GYRO_WEIGHT: f32 = 0.91;
pub const ACCEL_WEIGHT: f32 = 1.0 - GYRO_WEIGHT;

/// Gains and output/integral clamp of one PID axis.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub min_limit: f32,
    pub max_limit: f32,
}

impl PidGains {
    pub const fn new(kp: f32, ki: f32, kd: f32, limit: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            min_limit: -limit,
            max_limit: limit,
        }
    }
}

/// Runtime parameters of the stabilization core (filled from the board at start-up).
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlightConfig {
    pub roll: PidGains,
    pub pitch: PidGains,
    pub yaw: PidGains,
    /// Gyro sensitivity, LSB per °/s. ICM-42688 at ±2000 dps → 16.4.
    pub gyro_lsb_per_dps: f32,
    /// Weight of the newest gyro sample in the rate fed to the PIDs.
    pub rate_smoothing: f32,
    /// Samples averaged by the start-up calibration.
    pub calibration_samples: u16,
    /// Consecutive IMU faults absorbed before a forced disarm.
    pub max_sensor_faults: u8,
    /// Age after which the last radio frame is replaced by the failsafe snapshot.
    pub radio_timeout_us: u64,
    /// Consecutive cycles the onboard enable must hold before its edge counts.
    pub enable_debounce_cycles: u8,
    /// Yaw setpoint stays zero at or below this throttle.
    pub yaw_min_throttle_us: u16,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            roll: PidGains::new(1.3, 0.04, 18.0, 400.0),
            pitch: PidGains::new(1.3, 0.04, 18.0, 400.0),
            yaw: PidGains::new(4.0, 0.02, 0.0, 400.0),
            gyro_lsb_per_dps: 16.4,
            rate_smoothing: 0.3,
            calibration_samples: 2000,
            max_sensor_faults: 5,
            radio_timeout_us: 200_000,
            enable_debounce_cycles: 3,
            yaw_min_throttle_us: 1050,
        }
    }
}
