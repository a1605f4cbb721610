//! Per-cycle orchestration: estimator → arming → setpoints → PIDs → mixer.

use crate::arming::{ArmingStateMachine, ArmingTransition, DisarmReason};
use crate::attitude::AttitudeEstimator;
use crate::config::{
    FlightConfig, DEADBAND_HIGH_US, DEADBAND_LOW_US, LEVEL_TRIM_GAIN, SETPOINT_DIVISOR,
};
use crate::error::{FlightError, FlightResult};
use crate::mixer::mix;
use crate::pid::AxisPid;
use crate::state::{
    ArmingState, AttitudeEstimate, AxisTriple, CalibrationBias, MotorCommand,
    RadioChannelSnapshot, RawImuSample, TelemetryRecord,
};

/// Stick deflection outside the center deadband, µs. Zero inside `[1492, 1508]`.
pub fn stick_offset(stick_us: u16) -> f32 {
    if stick_us > DEADBAND_HIGH_US {
        (stick_us - DEADBAND_HIGH_US) as f32
    } else if stick_us < DEADBAND_LOW_US {
        -((DEADBAND_LOW_US - stick_us) as f32)
    } else {
        0.0
    }
}

/// Everything the core reads from the outside world for one cycle.
#[derive(Clone, Copy, Debug)]
pub struct CycleInput {
    pub imu: FlightResult<RawImuSample>,
    pub radio: RadioChannelSnapshot,
    pub onboard_enable: bool,
    pub battery_centivolts: u16,
}

/// State of the stabilization core, rewritten every cycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlightContext {
    pub calibration: Option<CalibrationBias>,
    pub attitude: AttitudeEstimate,
    pub radio: RadioChannelSnapshot,
    pub arming: ArmingState,
    pub throttle: u16,
    pub setpoints: AxisTriple,
    pub corrections: AxisTriple,
    pub command: MotorCommand,
    pub saturated: bool,
    pub fault: Option<FlightError>,
    pub transition: Option<ArmingTransition>,
}

impl FlightContext {
    pub fn record(&self, cycle_timestamp_us: u64) -> TelemetryRecord {
        TelemetryRecord {
            cycle_timestamp_us,
            attitude: self.attitude,
            arming: self.arming,
            command: self.command,
            saturated: self.saturated,
        }
    }
}

pub struct FlightController {
    config: FlightConfig,
    ctx: FlightContext,
    estimator: AttitudeEstimator,
    arming: ArmingStateMachine,
    roll: AxisPid,
    pitch: AxisPid,
    yaw: AxisPid,
}

impl FlightController {
    pub fn new(config: FlightConfig) -> Self {
        let arming = ArmingStateMachine::new(&config);
        Self {
            estimator: AttitudeEstimator::new(&config),
            ctx: FlightContext {
                arming: arming.state(),
                ..FlightContext::default()
            },
            arming,
            roll: AxisPid::new(config.roll),
            pitch: AxisPid::new(config.pitch),
            yaw: AxisPid::new(config.yaw),
            config,
        }
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    /// Install the start-up bias. The estimator restarts so its first sample
    /// seeds the angles directly.
    pub fn set_calibration(&mut self, bias: CalibrationBias) {
        self.ctx.calibration = Some(bias);
        self.estimator = AttitudeEstimator::new(&self.config);
    }

    pub fn context(&self) -> &FlightContext {
        &self.ctx
    }

    pub fn is_armed(&self) -> bool {
        self.arming.is_armed()
    }

    pub fn sensor_faults(&self) -> u8 {
        self.estimator.consecutive_faults()
    }

    /// Integrator state per axis, `(roll, pitch, yaw)`.
    pub fn integrals(&self) -> (f32, f32, f32) {
        (self.roll.integral(), self.pitch.integral(), self.yaw.integral())
    }

    pub fn tick(&mut self, input: &CycleInput, dt: f32) -> MotorCommand {
        let ctx = &mut self.ctx;
        ctx.radio = input.radio;
        ctx.fault = None;
        ctx.transition = None;

        // 1. Attitude
        let bias = ctx.calibration.unwrap_or_default();
        match self.estimator.update(input.imu, &bias, dt) {
            Ok(estimate) => ctx.attitude = estimate,
            Err(e) => {
                ctx.attitude = self.estimator.estimate();
                ctx.fault = Some(e);
            }
        }

        // 2. Arming
        let faults = self.estimator.consecutive_faults();
        if faults > self.config.max_sensor_faults {
            if let ArmingTransition::Disarmed(reason) =
                self.arming.force_disarm(DisarmReason::SensorFault)
            {
                error!("{} consecutive IMU faults", faults);
                ctx.transition = Some(ArmingTransition::Disarmed(reason));
            }
        }

        let transition =
            self.arming
                .evaluate(&input.radio, input.onboard_enable, ctx.calibration.is_some());
        match transition {
            ArmingTransition::None => {}
            ArmingTransition::Armed(_) => {
                self.roll.reset();
                self.pitch.reset();
                self.yaw.reset();
                ctx.transition = Some(transition);
            }
            ArmingTransition::Rejected => {
                ctx.fault = Some(FlightError::ConfigurationError);
                ctx.transition = Some(transition);
            }
            ArmingTransition::Disarmed(DisarmReason::RadioTimeout) => {
                ctx.fault = Some(FlightError::RadioTimeout);
                ctx.transition = Some(transition);
            }
            ArmingTransition::Disarmed(_) => ctx.transition = Some(transition),
        }
        if input.radio.failsafe && ctx.fault.is_none() {
            ctx.fault = Some(FlightError::RadioTimeout);
        }
        ctx.arming = self.arming.state();

        let armed = ctx.arming.is_armed();
        ctx.throttle = input.radio.throttle;

        // 3. Disarmed: no setpoints, no corrections, idle motors.
        if !armed {
            ctx.setpoints = AxisTriple::default();
            ctx.corrections = AxisTriple::default();
            ctx.command = MotorCommand::IDLE;
            ctx.saturated = false;
            return ctx.command;
        }

        // 4-6. Setpoints
        let mut roll_sp = stick_offset(input.radio.roll);
        let mut pitch_sp = stick_offset(input.radio.pitch);
        if ctx.arming.auto_level() {
            roll_sp -= ctx.attitude.roll * LEVEL_TRIM_GAIN;
            pitch_sp -= ctx.attitude.pitch * LEVEL_TRIM_GAIN;
        }
        let yaw_sp = if input.radio.throttle > self.config.yaw_min_throttle_us {
            stick_offset(input.radio.yaw) / SETPOINT_DIVISOR
        } else {
            0.0
        };
        ctx.setpoints = AxisTriple {
            roll: roll_sp / SETPOINT_DIVISOR,
            pitch: pitch_sp / SETPOINT_DIVISOR,
            yaw: yaw_sp,
        };

        // 7. Rate loops
        self.roll.set_setpoint(ctx.setpoints.roll);
        self.pitch.set_setpoint(ctx.setpoints.pitch);
        self.yaw.set_setpoint(ctx.setpoints.yaw);
        ctx.corrections = AxisTriple {
            roll: self.roll.update(ctx.attitude.roll_rate),
            pitch: self.pitch.update(ctx.attitude.pitch_rate),
            yaw: self.yaw.update(ctx.attitude.yaw_rate),
        };

        // 8. Mixer
        let out = mix(
            input.radio.throttle,
            &ctx.corrections,
            true,
            input.battery_centivolts,
        );
        ctx.command = out.command;
        ctx.saturated = out.saturated;
        ctx.command
    }
}
