use embassy_executor::task;
use embassy_stm32::peripherals::{DMA1_CH2, UART4};
use embassy_stm32::usart::UartRx;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Instant;

use flight_stabilizer::crsf::{CrsfParser, RcFrame};

/// Reads UART4 until idle and publishes every decoded RC frame, stamped at
/// capture. The signal keeps only the newest frame; an unread one is replaced.
#[task]
pub async fn crsf_task(
    mut crsf_rx: UartRx<'static, UART4, DMA1_CH2>,
    rc_signal: &'static Signal<CriticalSectionRawMutex, RcFrame>,
) {
    let mut parser = CrsfParser::new();
    let mut buf = [0u8; 64];

    loop {
        match crsf_rx.read_until_idle(&mut buf).await {
            Ok(n) => {
                if let Some(channels) = parser.push_bytes(&buf[..n]) {
                    rc_signal.signal(RcFrame {
                        channels,
                        captured_us: Instant::now().as_micros(),
                    });
                }
            }
            Err(_) => defmt::warn!("crsf: uart error"),
        }
    }
}
