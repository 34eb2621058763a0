use crate::hw_def::*;

use core::fmt;

#[cfg(feature = "defmt")]
use defmt::Format;

/// Whether an accessor talks to the sensor or decodes what is already buffered
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ReadMode {
    /// Read fresh data from the sensor first
    #[default]
    Force,
    /// Decode the last buffered bytes without touching the bus
    Cached,
}

/// Convert a 20-bit raw temperature to degrees centigrade
pub fn raw_temp_to_centigrade(raw: u32) -> f32 {
    raw as f32 * 0.000191 - 50.0
}

/// Convert a 20-bit raw humidity to percent, clamped to the physical range
pub fn raw_humid_to_percent(raw: u32) -> f32 {
    (raw as f32 * 0.000095).clamp(0.0, 100.0)
}

/// Status byte reported by the sensor
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Status(u8);
impl From<u8> for Status {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}
impl Status {
    /// Get the raw status byte
    pub fn raw(&self) -> u8 {
        self.0
    }

    /// False when the byte is the error marker
    pub fn is_valid(&self) -> bool {
        self.0 != ERROR_CODE
    }

    fn bit(&self, lsbit: u8) -> Option<bool> {
        self.is_valid().then(|| (self.0 >> lsbit) & 0x01 != 0)
    }

    /// Calibration coefficients are loaded, `None` if the read failed
    pub fn calibrated(&self) -> Option<bool> {
        self.bit(STATUS_BIT_CALIBRATED)
    }

    /// A conversion is in progress, `None` if the read failed
    pub fn busy(&self) -> Option<bool> {
        self.bit(STATUS_BIT_BUSY)
    }
}
impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "Status {{ error }}");
        }
        write!(f, "Status {{ 0x{:02x}; ", self.0)?;
        if self.calibrated() == Some(true) {
            write!(f, "calibrated ")?;
        }
        if self.busy() == Some(true) {
            write!(f, "busy ")?;
        }
        write!(f, "}}")
    }
}

/// The six bytes of the most recent measurement.
///
/// Byte 0 is the status byte, bytes 1..=3 carry 20 bits of humidity and
/// bytes 3..=5 carry 20 bits of temperature, sharing byte 3 nibble-wise.
/// Byte 0 set to [`ERROR_CODE`] means there is no valid data.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RawReading(pub [u8; PAYLOAD_LEN]);
impl RawReading {
    /// False when byte 0 holds the error marker
    pub fn is_valid(&self) -> bool {
        self.0[0] != ERROR_CODE
    }

    pub(crate) fn invalidate(&mut self) {
        self.0[0] = ERROR_CODE;
    }

    /// Status byte at the head of the payload
    pub fn status(&self) -> Status {
        Status(self.0[0])
    }

    /// Unprocessed 20-bit humidity
    pub fn humidity_raw(&self) -> u32 {
        ((self.0[1] as u32) << 16 | (self.0[2] as u32) << 8 | self.0[3] as u32) >> 4
    }

    /// Unprocessed 20-bit temperature
    pub fn temperature_raw(&self) -> u32 {
        ((self.0[3] & 0x0F) as u32) << 16 | (self.0[4] as u32) << 8 | self.0[5] as u32
    }

    /// Get temperature in Centigrade
    pub fn centigrade(&self) -> Option<f32> {
        self.is_valid().then(|| raw_temp_to_centigrade(self.temperature_raw()))
    }

    /// Get relative humidity in percent
    pub fn humidity_percent(&self) -> Option<f32> {
        self.is_valid().then(|| raw_humid_to_percent(self.humidity_raw()))
    }

    /// Both values converted, `None` if the buffer holds no valid data
    pub fn measurement(&self) -> Option<Measurement> {
        self.is_valid().then(|| Measurement {
            centigrade: raw_temp_to_centigrade(self.temperature_raw()),
            humidity_percent: raw_humid_to_percent(self.humidity_raw()),
        })
    }
}

/// Temperature and relative humidity after conversion
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measurement {
    /// degrees centigrade
    pub centigrade: f32,
    /// relative humidity in percent
    pub humidity_percent: f32,
}
impl Measurement {
    /// Get temperature in Fahrenheit
    pub fn fahrenheit(&self) -> f32 {
        self.centigrade * 1.8 + 32.0
    }
}

/// Handler invoked with every measurement delivered by the polling loop
pub type Callback = fn(Measurement);
