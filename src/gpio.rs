// Licensed under the Apache-2.0 license

//! TLMM GPIO capability.
//!
//! Only what the bus drivers need: read a pin, drive it, switch its
//! direction, and move the I2C pads between the I2C function and plain GPIO.

/// TLMM pin number.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GpioPin(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Plain GPIO access.
pub trait GpioControl {
    /// Current line level.
    fn get(&mut self, pin: GpioPin) -> bool;

    /// Drive the pin to `level`. The pin becomes an output.
    fn set(&mut self, pin: GpioPin, level: bool);

    /// Switch the pin direction. An input releases the line.
    fn configure(&mut self, pin: GpioPin, direction: Direction);
}

/// Pad multiplexer for the I2C pins.
pub trait PinMux {
    /// `true` hands SCL/SDA to the I2C controller, `false` to plain GPIO.
    fn set_mux_to_i2c(&mut self, i2c: bool);
}

impl<T: GpioControl + ?Sized> GpioControl for &mut T {
    fn get(&mut self, pin: GpioPin) -> bool {
        (**self).get(pin)
    }

    fn set(&mut self, pin: GpioPin, level: bool) {
        (**self).set(pin, level);
    }

    fn configure(&mut self, pin: GpioPin, direction: Direction) {
        (**self).configure(pin, direction);
    }
}

impl<T: PinMux + ?Sized> PinMux for &mut T {
    fn set_mux_to_i2c(&mut self, i2c: bool) {
        (**self).set_mux_to_i2c(i2c);
    }
}
