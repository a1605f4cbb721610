//! JHEF405 (STM32F405RG) clock tree and pin map.
//!
//! | Function        | Pins                          |
//! |-----------------|-------------------------------|
//! | IMU SPI1        | SCK PA5, MOSI PA7, MISO PA6, CS PB12 |
//! | CRSF UART4      | RX PA1, TX PA0                |
//! | ESC 1..4        | PB0, PB1, PA3, PA2            |
//! | Onboard enable  | PC14 (active low)             |
//! | Status LED      | PC13                          |
//! | USB OTG FS      | DP PA12, DM PA11              |

use embassy_stm32::rcc::*;
use embassy_stm32::time::Hertz;
use embassy_stm32::{Config, Peripherals};

/// 8 MHz HSE → 168 MHz SYSCLK, 48 MHz for USB.
fn clock_config() -> Config {
    let mut config = Config::default();
    config.rcc.hse = Some(Hse {
        freq: Hertz(8_000_000),
        mode: HseMode::Oscillator,
    });
    config.rcc.pll_src = PllSource::HSE;
    config.rcc.pll = Some(Pll {
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL168,
        divp: Some(PllPDiv::DIV2),
        divq: Some(PllQDiv::DIV7),
        divr: None,
    });
    config.rcc.sys = Sysclk::PLL1_P;
    config.rcc.ahb_pre = AHBPrescaler::DIV1;
    config.rcc.apb1_pre = APBPrescaler::DIV4;
    config.rcc.apb2_pre = APBPrescaler::DIV2;
    config
}

pub fn init() -> Peripherals {
    embassy_stm32::init(clock_config())
}
