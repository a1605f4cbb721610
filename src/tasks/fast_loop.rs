use embassy_executor::task;
use embassy_futures::yield_now;
use embassy_stm32::gpio::{AnyPin, Input, Output};
use embassy_stm32::peripherals::SPI1;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_sync::signal::Signal;
use embassy_time::Instant;

use flight_stabilizer::crsf::RcFrame;
use flight_stabilizer::radio::RadioWatchdog;
use flight_stabilizer::state::{RadioChannelSnapshot, RawImuSample, TelemetryRecord};
use flight_stabilizer::{ControlLoop, FlightError, FlightPlatform, FlightResult, TelemetrySink};

use crate::drivers::icm42688::Icm42688;
use crate::drivers::pwm::GpioPulseDriver;

pub type BoardLoop = ControlLoop<BoardIo, GpioPulseDriver, ChannelSink>;

/// Inputs of the JHEF405 as seen by the control loop.
pub struct BoardIo {
    imu: Icm42688<'static, SPI1>,
    rc: &'static Signal<CriticalSectionRawMutex, RcFrame>,
    watchdog: RadioWatchdog,
    /// Active-low, internal pull-up.
    enable: Input<'static, AnyPin>,
}

impl BoardIo {
    pub fn new(
        imu: Icm42688<'static, SPI1>,
        rc: &'static Signal<CriticalSectionRawMutex, RcFrame>,
        radio_timeout_us: u64,
        enable: Input<'static, AnyPin>,
    ) -> Self {
        Self {
            imu,
            rc,
            watchdog: RadioWatchdog::new(radio_timeout_us),
            enable,
        }
    }
}

impl FlightPlatform for BoardIo {
    fn read_raw_imu(&mut self) -> FlightResult<RawImuSample> {
        self.imu.read_sample().map_err(|_| FlightError::SensorFault)
    }

    fn get_channel_snapshot(&mut self) -> RadioChannelSnapshot {
        if let Some(frame) = self.rc.try_take() {
            self.watchdog.feed(frame.channels.to_snapshot(), frame.captured_us);
        }
        self.watchdog.snapshot(Instant::now().as_micros())
    }

    // No VBAT divider on this board: 0 keeps compensation off.
    fn get_battery_centivolts(&mut self) -> u16 {
        0
    }

    fn onboard_enable(&mut self) -> bool {
        self.enable.is_low()
    }
}

pub struct ChannelSink {
    tx: Sender<'static, CriticalSectionRawMutex, TelemetryRecord, 1>,
}

impl ChannelSink {
    pub fn new(tx: Sender<'static, CriticalSectionRawMutex, TelemetryRecord, 1>) -> Self {
        Self { tx }
    }
}

impl TelemetrySink for ChannelSink {
    fn try_publish(&mut self, record: &TelemetryRecord) {
        let _ = self.tx.try_send(*record);
    }
}

/// Calibrates, then runs the control loop forever.
///
/// The pulse phase busy-waits and paces the loop at 250 Hz; `yield_now`
/// between cycles lets the USB and CRSF tasks drain their buffers.
#[task]
pub async fn fast_loop_task(mut control: BoardLoop, mut led: Output<'static, AnyPin>) {
    let mut calibrator = control.calibrator();
    let max_attempts = 2 * control.controller().config().calibration_samples as u32;

    for attempt in 0..max_attempts {
        yield_now().await;
        if control.calibration_cycle(&mut calibrator) {
            break;
        }
        if attempt % 100 == 0 {
            led.toggle();
        }
    }

    match control.finish_calibration(&calibrator) {
        Ok(bias) => {
            defmt::info!(
                "calibrated: gyro bias {} accel level {} {}",
                bias.gyro,
                bias.accel_pitch_deg,
                bias.accel_roll_deg
            );
            led.set_high();
        }
        // Arming stays refused; the ESCs still get idle pulses.
        Err(e) => {
            defmt::error!("calibration failed: {}", e);
            led.set_low();
        }
    }

    loop {
        yield_now().await;
        let report = control.run_cycle();
        if let Some(t) = report.transition {
            defmt::info!("arming: {}", t);
        }
    }
}
