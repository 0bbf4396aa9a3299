// Licensed under the Apache-2.0 license

//! HTC Leo board wiring.

use crate::gpio::GpioPin;
use crate::i2c::{BusConfig, BusConfigBuilder, I2cSpeed};
use crate::interrupt::IrqNumber;
use crate::syscon::ClockId;

/// MSM I2C controller base on the QSD8250.
pub const MSM_I2C_BASE: usize = 0xA990_0000;
pub const MSM_I2C_CLOCK: ClockId = ClockId(17);
pub const MSM_I2C_IRQ: IrqNumber = IrqNumber(11);

/// Bus pads, used as plain GPIO during bus recovery.
pub const I2C_SCL_GPIO: GpioPin = GpioPin(95);
pub const I2C_SDA_GPIO: GpioPin = GpioPin(96);

/// DS2746 battery monitor.
pub const DS2746_ADDR: u8 = 0x26;
/// HTC MicroP (keypad backlight, LEDs, light sensor).
pub const MICROP_ADDR: u8 = 0x66;

/// Battery sense resistor in milliohms.
pub const BATTERY_RSNS_MOHM: u32 = 15;

/// Bus configuration for the single I2C master on the Leo.
#[must_use]
pub fn leo_bus_config() -> BusConfig {
    BusConfigBuilder::new(MSM_I2C_BASE, MSM_I2C_CLOCK, MSM_I2C_IRQ)
        .pins(I2C_SCL_GPIO, I2C_SDA_GPIO)
        .speed(I2cSpeed::Fast)
        .build()
}
