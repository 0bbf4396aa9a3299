// Licensed under the Apache-2.0 license

use crate::board::BATTERY_RSNS_MOHM;
use crate::devices::{DeviceError, Ds2746, MicroP};
use crate::i2c::I2cMaster;
use core::fmt::{Debug, Display};
use core::num::NonZeroU32;
use embedded_io::{Write, WriteFmtError};

/// Plausible single-cell Li-ion range.
const BATTERY_MV_RANGE: core::ops::RangeInclusive<u32> = 2500..=4500;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: u32,
    pub failed: u32,
}

impl Summary {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug)]
enum CheckError<E> {
    Device(DeviceError<E>),
    OutOfRange(u32),
}

impl<E> From<DeviceError<E>> for CheckError<E> {
    fn from(e: DeviceError<E>) -> Self {
        CheckError::Device(e)
    }
}

/// Exercise the I2C bus and the devices hanging off it.
///
/// # Errors
///
/// Returns an error only if writing to `out` fails; check failures are
/// reported in the output and the returned [`Summary`].
pub fn run_i2c_tests<W, B>(out: &mut W, bus: &mut B) -> Result<Summary, WriteFmtError<W::Error>>
where
    W: Write,
    B: I2cMaster,
{
    write!(out, "\r\n=== I2C Tests ===\r\n")?;
    let mut summary = Summary::default();

    let result = bus.recover_bus().map(|()| "idle");
    report(out, &mut summary, "Bus recovery", result)?;

    let result = MicroP::new(&mut *bus).probe().map(Hex);
    report(out, &mut summary, "MicroP version", result)?;

    let result = gauge_voltage(&mut *bus);
    report(out, &mut summary, "Gauge voltage (mV)", result)?;

    let rsns = NonZeroU32::new(BATTERY_RSNS_MOHM).unwrap_or(NonZeroU32::MIN);
    let result = Ds2746::new(&mut *bus).current_ma(rsns);
    report(out, &mut summary, "Gauge current (mA)", result)?;

    write!(
        out,
        "=== {} passed, {} failed ===\r\n",
        summary.passed, summary.failed
    )?;
    Ok(summary)
}

fn gauge_voltage<B: I2cMaster>(bus: &mut B) -> Result<u32, CheckError<B::Error>> {
    let mv = Ds2746::new(bus).voltage_mv()?;
    if BATTERY_MV_RANGE.contains(&mv) {
        Ok(mv)
    } else {
        Err(CheckError::OutOfRange(mv))
    }
}

struct Hex(u8);

impl Display for Hex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

fn report<W, T, E>(
    out: &mut W,
    summary: &mut Summary,
    name: &str,
    result: Result<T, E>,
) -> Result<(), WriteFmtError<W::Error>>
where
    W: Write,
    T: Display,
    E: Debug,
{
    match result {
        Ok(value) => {
            summary.passed += 1;
            write!(out, "{name}: PASSED ({value})\r\n")
        }
        Err(e) => {
            summary.failed += 1;
            write!(out, "{name}: FAILED {e:?}\r\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{DS2746_ADDR, MICROP_ADDR};
    use crate::common::test_log::VecSink;
    use crate::i2c::sim::{Device, Sim};
    use crate::i2c::MsmI2c;

    fn run(sim: &Sim) -> (Summary, String) {
        let (io, platform) = sim.split();
        let mut bus = MsmI2c::new(io, platform, Sim::config());
        bus.probe().unwrap();
        let mut out = VecSink::default();
        let summary = run_i2c_tests(&mut out, &mut bus).unwrap();
        (summary, out.text())
    }

    #[test]
    fn test_suite_passes_on_healthy_board() {
        let sim = Sim::new();
        sim.attach(MICROP_ADDR, Device::Registers(vec![(0x30, 0x0C)]));
        sim.attach(
            DS2746_ADDR,
            Device::Registers(vec![(0x0C, 0x6B), (0x0D, 0x80), (0x0E, 0x00), (0x0F, 0x28)]),
        );

        let (summary, text) = run(&sim);
        assert!(summary.all_passed(), "{text}");
        assert_eq!(summary.passed, 4);
        assert!(text.contains("MicroP version: PASSED (0x0c)"));
        assert!(text.contains("Gauge voltage (mV): PASSED (4196)"));
        assert!(text.contains("Gauge current (mA): PASSED (430)"));
    }

    #[test]
    fn test_suite_reports_missing_devices() {
        let sim = Sim::new();
        let (summary, text) = run(&sim);
        assert_eq!(summary, Summary { passed: 1, failed: 3 });
        assert!(text.contains("Bus recovery: PASSED (idle)"));
        assert!(text.contains("MicroP version: FAILED"));
        assert!(text.contains("=== 1 passed, 3 failed ==="));
    }

    #[test]
    fn test_implausible_voltage_fails() {
        let sim = Sim::new();
        sim.attach(DS2746_ADDR, Device::Registers(vec![(0x0C, 0x00), (0x0D, 0x10)]));
        let (_, text) = run(&sim);
        assert!(text.contains("Gauge voltage (mV): FAILED OutOfRange(2)"));
    }
}
