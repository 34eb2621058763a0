//! This is a platform-agnostic, non-blocking Rust driver for the AHT10 and AHT20 humidity and
//! temperature digital sensors using the [`embedded-hal`] or [`embedded-hal-async`] traits.
//!
//! [`embedded-hal`]: https://github.com/rust-embedded/embedded-hal/tree/master/embedded-hal
//! [`embedded-hal-async`]: https://github.com/rust-embedded/embedded-hal/tree/master/embedded-hal-async
//!
//! The sensor needs about 80 ms to convert a measurement.  Instead of sleeping through that time,
//! the driver is polled from the application's main loop: each call to `poll()` compares the
//! elapsed time against the deadline of the current state and only talks to the bus when
//! something is due.  Completed measurements are handed to an optional callback and returned
//! from `poll()`.
//!
//! This driver allows you to:
//! - Trigger measurements manually or periodically (auto-trigger).
//! - Recover from bus failures with a configurable retry delay.
//! - Read temperature and humidity in one blocking call when latency does not matter.
//! - Read the status byte, busy bit and calibration bit.
//! - Switch between normal and cycle mode, load factory calibration and soft reset the device.
//! - blocking API support.
//! - async API support.
//!
//! ## Features
//!
//! - `async`: Enables async API.
//! - `blocking`: Enables blocking API.
//! - `crc`: Checks the CRC appended by the AHT20.
//! - `defmt`: Enables logging using the `defmt` framework.
//! - `log`: Enables logging using the `log` framework.
//!
//! ## Supported devices: AHT10, AHT20
//!
//! Both are capacitive relative humidity and temperature sensors with a factory calibration
//! stored on chip.  They differ in the initialization command, and the AHT20 appends a CRC-8
//! byte to every measurement.
//!
//! ## Polling Example:
//!
//! ```ignore
//! use ahtx0::{Ahtx0, Config, I2cAddr, Measurement, Variant};
//!
//! // Platform-specific
//! let i2c = /* embedded_hal::i2c::I2c instance */;
//! let delay = /* embedded_hal::delay::DelayNs instance */;
//! let millis = || /* monotonic milliseconds */;
//!
//! fn report(m: Measurement) {
//!     println!("{:0.1} %RH, {:0.1} °C", m.humidity_percent, m.centigrade);
//! }
//!
//! let config = Config { address: I2cAddr::Gnd, variant: Variant::Aht10, ..Config::default() };
//! let mut aht = Ahtx0::new(i2c, delay, millis, config);
//! aht.init();
//! aht.set_callback(report);
//!
//! // measure now, then every 5 seconds
//! aht.trigger_measurement(Some(5000)).ok();
//! loop {
//!     aht.poll();
//!     // other periodic work
//! }
//! ```
//!
//! ## Blocking Example:
//!
//! ```ignore
//! use ahtx0::{Ahtx0, Config, ReadMode};
//!
//! let mut aht = Ahtx0::new(i2c, delay, millis, Config::default());
//! aht.init();
//! aht.soft_reset().unwrap();
//! let centigrade = aht.read_temperature(ReadMode::Force).unwrap();
//! let humidity = aht.read_humidity(ReadMode::Cached).unwrap();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(not(test), no_std)]

#[cfg(not(any(feature = "async", feature = "blocking")))]
compile_error!("At least one of \"async\" and \"blocking\" features must be enabled");

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("Features \"defmt\" and \"log\" are mutually exclusive and cannot be enabled together");

#[macro_use]
mod fmt;

#[cfg(feature = "blocking")]
mod device_impl;
#[cfg(feature = "async")]
mod device_impl_async;
mod hw_def;
mod lifecycle;
mod types;

pub use crate::{hw_def::*, lifecycle::State, types::*};

use crate::lifecycle::Lifecycle;

#[cfg(feature = "defmt")]
use defmt::Format;

/// Monotonic millisecond time source.
///
/// The counter may wrap; elapsed times are computed with wrapping arithmetic.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed point
    fn now_ms(&self) -> u32;
}
impl<F: Fn() -> u32> Clock for F {
    fn now_ms(&self) -> u32 {
        self()
    }
}

/// Construction-time settings
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// bus address selected by the ADDR strap
    pub address: I2cAddr,
    /// sensor family member
    pub variant: Variant,
    /// period of automatic measurements, 0 disables them
    pub trigger_delay_ms: u32,
    /// minimum spacing between recoveries from a failure, the first one is immediate
    pub retry_delay_ms: u32,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            address: I2cAddr::Gnd,
            variant: Variant::Aht10,
            trigger_delay_ms: DEFAULT_TRIGGER_DELAY_MS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

/// AHT10/AHT20 device driver
#[cfg(feature = "blocking")]
#[derive(Debug)]
pub struct Ahtx0<I2C, Delay, Clk> {
    pub(crate) i2c: I2C,
    pub(crate) delay: Delay,
    pub(crate) clock: Clk,
    pub(crate) address: I2cAddr,
    pub(crate) variant: Variant,
    pub(crate) raw: RawReading,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) callback: Option<Callback>,
}

/// AHT10/AHT20 device driver over async I2C
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct Ahtx0Async<I2C, Delay, Clk> {
    pub(crate) i2c: I2C,
    pub(crate) delay: Delay,
    pub(crate) clock: Clk,
    pub(crate) address: I2cAddr,
    pub(crate) variant: Variant,
    pub(crate) raw: RawReading,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) callback: Option<Callback>,
}

/// All possible errors in this crate
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, PartialEq)]
pub enum Error<E> {
    /// Command was not acknowledged
    Write(E),
    /// Read was not acknowledged or came up short
    Read(E),
    /// Calibration bit is not set in the status byte
    NotCalibrated,
    /// Buffered data is marked with the error code
    NoValidData,
    /// Failure of a checksum from the device was detected
    #[cfg(feature = "crc")]
    CrcMismatch,
}

#[cfg(feature = "crc")]
pub(crate) fn crc_matches(payload: &[u8]) -> bool {
    use crc::{CRC_8_NRSC_5, Crc};
    const CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

    match payload.split_last() {
        Some((expect, data)) if data.len() == PAYLOAD_LEN => CRC.checksum(data) == *expect,
        _ => true,
    }
}
