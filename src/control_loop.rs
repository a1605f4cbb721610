//! The single-threaded real-time control loop.
//!
//! One cycle: read inputs → [`FlightController::tick`] → publish telemetry →
//! [`PulseTrain::emit`]. Only the pulse phase blocks; it also paces the loop to
//! one cycle per [`REFRESH_PERIOD_US`] at most.

use crate::arming::ArmingTransition;
use crate::calibration::Calibrator;
use crate::config::{FlightConfig, REFRESH_PERIOD_US};
use crate::error::{FlightError, FlightResult};
use crate::flight::{CycleInput, FlightController};
use crate::pulse::{PulseChannelDriver, PulseTrain};
use crate::state::{CalibrationBias, MotorCommand, RadioChannelSnapshot, RawImuSample, TelemetryRecord};

/// dt bounds fed to the estimator, seconds.
const DT_MIN: f32 = 0.0005;
const DT_MAX: f32 = 0.02;

/// Input capabilities of a board. Every call must return within a bounded time.
pub trait FlightPlatform {
    fn read_raw_imu(&mut self) -> FlightResult<RawImuSample>;
    /// Latest radio state; the failsafe snapshot when the link is down.
    fn get_channel_snapshot(&mut self) -> RadioChannelSnapshot;
    fn get_battery_centivolts(&mut self) -> u16;
    /// Level of the onboard enable control.
    fn onboard_enable(&mut self) -> bool;
}

/// Fire-and-forget record sink. Implementations drop records rather than wait.
pub trait TelemetrySink {
    fn try_publish(&mut self, record: &TelemetryRecord);
}

impl TelemetrySink for () {
    fn try_publish(&mut self, _record: &TelemetryRecord) {}
}

#[derive(Clone, Copy, Debug)]
pub struct CycleReport {
    pub record: TelemetryRecord,
    pub transition: Option<ArmingTransition>,
    pub fault: Option<FlightError>,
    /// Measured period of this cycle's pulse train.
    pub period_us: Option<u64>,
}

pub struct ControlLoop<P, D, T>
where
    P: FlightPlatform,
    D: PulseChannelDriver,
    T: TelemetrySink,
{
    platform: P,
    pulses: PulseTrain<D>,
    sink: T,
    controller: FlightController,
    last_period_us: u64,
}

impl<P, D, T> ControlLoop<P, D, T>
where
    P: FlightPlatform,
    D: PulseChannelDriver,
    T: TelemetrySink,
{
    pub fn new(config: FlightConfig, platform: P, driver: D, sink: T) -> Self {
        Self {
            platform,
            pulses: PulseTrain::new(driver),
            sink,
            controller: FlightController::new(config),
            last_period_us: REFRESH_PERIOD_US,
        }
    }

    pub fn controller(&self) -> &FlightController {
        &self.controller
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn pulses(&self) -> &PulseTrain<D> {
        &self.pulses
    }

    pub fn sink(&self) -> &T {
        &self.sink
    }

    /// Average `calibration_samples` IMU reads while holding the ESCs at idle.
    ///
    /// Failed reads are skipped; the run gives up after twice the sample count.
    pub fn calibrate(&mut self) -> FlightResult<CalibrationBias> {
        let mut calibrator = self.calibrator();
        let max_attempts = 2 * self.controller.config().calibration_samples as u32;
        let mut attempts: u32 = 0;

        while !calibrator.is_complete() && attempts < max_attempts {
            attempts += 1;
            self.calibration_cycle(&mut calibrator);
        }
        self.finish_calibration(&calibrator)
    }

    pub fn calibrator(&self) -> Calibrator {
        Calibrator::new(self.controller.config().calibration_samples)
    }

    /// One calibration step: a single IMU read and one idle pulse train, since
    /// the ESCs expect a steady signal while we sit here. Returns `true` once
    /// enough samples are in.
    pub fn calibration_cycle(&mut self, calibrator: &mut Calibrator) -> bool {
        if let Ok(sample) = self.platform.read_raw_imu() {
            calibrator.push(&sample);
        }
        self.pulses.emit(&MotorCommand::IDLE);
        calibrator.is_complete()
    }

    pub fn finish_calibration(&mut self, calibrator: &Calibrator) -> FlightResult<CalibrationBias> {
        let bias = calibrator.finish()?;
        self.controller.set_calibration(bias);
        Ok(bias)
    }

    /// Run one full control cycle, pulse emission included.
    pub fn run_cycle(&mut self) -> CycleReport {
        let dt = (self.last_period_us as f32 / 1_000_000.0).clamp(DT_MIN, DT_MAX);

        let input = CycleInput {
            imu: self.platform.read_raw_imu(),
            radio: self.platform.get_channel_snapshot(),
            onboard_enable: self.platform.onboard_enable(),
            battery_centivolts: self.platform.get_battery_centivolts(),
        };
        let command = self.controller.tick(&input, dt);

        let timestamp = self.pulses.now_micros();
        let ctx = self.controller.context();
        let record = ctx.record(timestamp);
        self.sink.try_publish(&record);

        let report = self.pulses.emit(&command);
        if let Some(period) = report.period_us {
            self.last_period_us = period;
        }

        CycleReport {
            record,
            transition: ctx.transition,
            fault: ctx.fault,
            period_us: report.period_us,
        }
    }
}
