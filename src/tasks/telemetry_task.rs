use core::fmt::Write;

use embassy_executor::task;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_time::{Duration, Ticker};

use flight_stabilizer::state::{FlightMode, TelemetryRecord};

use crate::usb::{write_chunked, UsbSerial};

/// Ticks between two USB debug dumps (20 Hz ticker → 2 Hz output).
const USB_DUMP_DIVIDER: u32 = 10;

/// Caches the newest record from the fast loop and dumps it over USB CDC when
/// a host holds DTR. Never blocks the producer: the channel is try_send only.
#[task]
pub async fn telemetry_task(
    mut usb_serial: UsbSerial<'static>,
    record_rx: Receiver<'static, CriticalSectionRawMutex, TelemetryRecord, 1>,
) {
    let mut tick: u32 = 0;
    let mut latest: Option<TelemetryRecord> = None;

    let mut ticker = Ticker::every(Duration::from_hz(20));

    loop {
        ticker.next().await;
        tick = tick.wrapping_add(1);

        if let Ok(r) = record_rx.try_receive() {
            latest = Some(r);
        }

        let Some(rec) = latest else { continue };
        if !usb_serial.dtr() || tick % USB_DUMP_DIVIDER != 0 {
            continue;
        }

        let mode = match rec.arming.mode {
            FlightMode::Disarmed => "DISARMED",
            FlightMode::ArmedAutoLevel => "LEVEL",
            FlightMode::ArmedAcro => "ACRO",
        };

        let mut m = heapless::String::<128>::new();
        let _ = write!(
            m,
            "[ATT] t={} p={:.1} r={:.1} pr={:.1} rr={:.1} yr={:.1}\r\n",
            rec.cycle_timestamp_us,
            rec.attitude.pitch,
            rec.attitude.roll,
            rec.attitude.pitch_rate,
            rec.attitude.roll_rate,
            rec.attitude.yaw_rate
        );
        let _ = write_chunked(&mut usb_serial, m.as_bytes()).await;

        let mut m = heapless::String::<128>::new();
        let _ = write!(
            m,
            "[ESC] {} a={}/{} {} {} {} {} sat={}\r\n",
            mode,
            rec.arming.primary_armed as u8,
            rec.arming.secondary_armed as u8,
            rec.command.esc[0],
            rec.command.esc[1],
            rec.command.esc[2],
            rec.command.esc[3],
            rec.saturated as u8
        );
        let _ = write_chunked(&mut usb_serial, m.as_bytes()).await;
    }
}
