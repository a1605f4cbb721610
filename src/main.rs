#![no_std]
#![no_main]

mod board;
mod drivers;
mod tasks;
mod usb;

use embassy_executor::Spawner;
use embassy_stm32::dma::NoDma;
use embassy_stm32::gpio::{Input, Level, Output, Pin, Pull, Speed};
use embassy_stm32::spi::{Config as SpiConfig, Spi};
use embassy_stm32::time::Hertz;
use embassy_stm32::usart::{Config as UsartConfig, Uart};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

use flight_stabilizer::config::FlightConfig;
use flight_stabilizer::crsf::RcFrame;
use flight_stabilizer::state::TelemetryRecord;
use flight_stabilizer::ControlLoop;

use crate::drivers::icm42688::Icm42688;
use crate::drivers::pwm::GpioPulseDriver;
use crate::tasks::fast_loop::{fast_loop_task, BoardIo, ChannelSink};

// ── Inter-task links ──────────────────────────────────────────────────────────
//  RC: a signal, so the newest frame overwrites an unread one.
//  Telemetry: cap=1 channel, try_send drops records while the USB side is busy.
static RC_SIGNAL: Signal<CriticalSectionRawMutex, RcFrame> = Signal::new();
static TEL_CHAN: Channel<CriticalSectionRawMutex, TelemetryRecord, 1> = Channel::new();

bind_interrupts!(struct Irqs {
    UART4 => embassy_stm32::usart::InterruptHandler<peripherals::UART4>;
});

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = board::init();
    let config = FlightConfig::default();

    // USB CDC-ACM debug
    let (usb_dev, usb_serial) = usb::init(p.USB_OTG_FS, p.PA12, p.PA11);
    spawner.spawn(usb::usb_task(usb_dev)).unwrap();

    // SPI1 @ 10 MHz: ICM-42688 (SCK=PA5, MOSI=PA7, MISO=PA6, CS=PB12)
    let mut spi_config = SpiConfig::default();
    spi_config.frequency = Hertz(10_000_000);
    let spi = Spi::new(p.SPI1, p.PA5, p.PA7, p.PA6, NoDma, NoDma, spi_config);
    let cs_gyro = Output::new(p.PB12.degrade(), Level::High, Speed::VeryHigh);
    let mut imu = Icm42688::new(spi, cs_gyro);

    // CRSF/ELRS UART4 @ 420000. TX is unused: no telemetry downlink.
    let mut crsf_config = UsartConfig::default();
    crsf_config.baudrate = 420_000;
    let crsf_uart = Uart::new(
        p.UART4,
        p.PA1,
        p.PA0,
        Irqs,
        p.DMA1_CH4,
        p.DMA1_CH2,
        crsf_config,
    )
    .unwrap();
    let (_crsf_tx, crsf_rx) = crsf_uart.split();

    // ESC outputs, driven low until the first pulse train
    let escs = GpioPulseDriver::new([
        Output::new(p.PB0.degrade(), Level::Low, Speed::VeryHigh),
        Output::new(p.PB1.degrade(), Level::Low, Speed::VeryHigh),
        Output::new(p.PA3.degrade(), Level::Low, Speed::VeryHigh),
        Output::new(p.PA2.degrade(), Level::Low, Speed::VeryHigh),
    ]);

    let enable = Input::new(p.PC14.degrade(), Pull::Up);
    let led = Output::new(p.PC13.degrade(), Level::Low, Speed::Low);

    Timer::after(Duration::from_millis(100)).await;
    match imu.init().await {
        Ok(true) => defmt::info!("imu: icm42688 up"),
        Ok(false) => defmt::warn!("imu: unexpected WHO_AM_I"),
        Err(_) => defmt::error!("imu: spi error during init"),
    }

    let platform = BoardIo::new(imu, &RC_SIGNAL, config.radio_timeout_us, enable);
    let control = ControlLoop::new(config, platform, escs, ChannelSink::new(TEL_CHAN.sender()));

    spawner
        .spawn(tasks::crsf_task::crsf_task(crsf_rx, &RC_SIGNAL))
        .unwrap();
    spawner
        .spawn(tasks::telemetry_task::telemetry_task(usb_serial, TEL_CHAN.receiver()))
        .unwrap();
    spawner.spawn(fast_loop_task(control, led)).unwrap();
}
