use embassy_stm32::gpio::{AnyPin, Output};
use embassy_time::Instant;

use flight_stabilizer::config::MOTOR_COUNT;
use flight_stabilizer::PulseChannelDriver;

/// Four GPIO lines driving standard PWM ESCs, timed from the embassy 1 MHz tick.
pub struct GpioPulseDriver {
    pins: [Output<'static, AnyPin>; MOTOR_COUNT],
}

impl GpioPulseDriver {
    /// Pins in `esc_1..esc_4` order; all start low.
    pub fn new(mut pins: [Output<'static, AnyPin>; MOTOR_COUNT]) -> Self {
        for pin in pins.iter_mut() {
            pin.set_low();
        }
        Self { pins }
    }
}

impl PulseChannelDriver for GpioPulseDriver {
    fn raise_all(&mut self) {
        // Keep ISRs from splitting the common rising edge.
        critical_section::with(|_cs| {
            for pin in self.pins.iter_mut() {
                pin.set_high();
            }
        });
    }

    fn lower(&mut self, channel: usize) {
        if let Some(pin) = self.pins.get_mut(channel) {
            pin.set_low();
        }
    }

    fn now_micros(&mut self) -> u64 {
        Instant::now().as_micros()
    }
}
