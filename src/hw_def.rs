//! Hardware definitions: bus addresses, commands, mode bits and timing.

#[cfg(feature = "defmt")]
use defmt::Format;

/// Marker value written into byte 0 of the raw buffer when the last read failed
pub const ERROR_CODE: u8 = 0xFF;

/// Length of a full measurement payload: status, 2.5 bytes humidity, 2.5 bytes temperature
pub const PAYLOAD_LEN: usize = 6;

/// Time the sensor needs between a measure command and valid data
pub const DELAY_MEASURE_MS: u32 = 80;
/// Time after power-up before the sensor accepts commands
pub const DELAY_POWER_ON_MS: u32 = 40;
/// Settle time after a mode or init command
pub const DELAY_CMD_MS: u32 = 350;
/// Settle time after a soft reset
pub const DELAY_RESET_MS: u32 = 20;

/// Default period between automatically triggered measurements
pub const DEFAULT_TRIGGER_DELAY_MS: u32 = 1000;
/// Default minimum spacing between recoveries after a failure
pub const DEFAULT_RETRY_DELAY_MS: u32 = 2000;

/// Mode bits carried in the first parameter byte of the init command
pub const MODE_NORMAL: u8 = 0x00;
/// Sensor-internal repeating measurement mode
pub const MODE_CYCLE: u8 = 0x20;
/// Command mode
pub const MODE_COMMAND: u8 = 0x40;
/// Load factory calibration coefficients
pub const MODE_CAL_ENABLE: u8 = 0x08;

pub(crate) const MEASUREMENT_PARAM: u8 = 0x33;
pub(crate) const NOP: u8 = 0x00;

pub(crate) const STATUS_BIT_CALIBRATED: u8 = 3;
pub(crate) const STATUS_BIT_BUSY: u8 = 7;

/// I2C address, selected by strapping the ADDR pin
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum I2cAddr {
    /// ADDR pin tied to ground
    #[default]
    Gnd,
    /// ADDR pin tied to supply
    Vcc,
}
impl I2cAddr {
    /// 7-bit bus address
    pub const fn as_u8(self) -> u8 {
        match self {
            I2cAddr::Gnd => 0x38,
            I2cAddr::Vcc => 0x39,
        }
    }
}

/// Sensor family member
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Variant {
    /// AHT10
    #[default]
    Aht10,
    /// AHT20, which also appends a CRC byte to each measurement
    Aht20,
}
impl Variant {
    /// Command used to initialize the sensor and load calibration
    pub const fn init_command(self) -> Command {
        match self {
            Variant::Aht10 => Command::InitAht10,
            Variant::Aht20 => Command::InitAht20,
        }
    }

    /// Number of bytes fetched for a full measurement
    pub(crate) const fn read_len(self) -> usize {
        match self {
            #[cfg(feature = "crc")]
            Variant::Aht20 => PAYLOAD_LEN + 1,
            _ => PAYLOAD_LEN,
        }
    }
}

/// Command bytes understood by the sensor
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Command {
    /// Initialize an AHT10
    InitAht10 = 0xE1,
    /// Initialize an AHT20
    InitAht20 = 0xBE,
    /// Start a single measurement
    StartMeasure = 0xAC,
    /// Enter normal mode
    NormalMode = 0xA8,
    /// Soft reset
    SoftReset = 0xBA,
}
impl Command {
    /// Command byte followed by its two parameter bytes
    pub const fn frame(self, param0: u8, param1: u8) -> [u8; 3] {
        [self as u8, param0, param1]
    }
}

pub(crate) const fn measure_frame() -> [u8; 3] {
    Command::StartMeasure.frame(MEASUREMENT_PARAM, NOP)
}

pub(crate) const fn normal_mode_frame() -> [u8; 3] {
    Command::NormalMode.frame(NOP, NOP)
}

pub(crate) const fn cycle_mode_frame(variant: Variant) -> [u8; 3] {
    variant.init_command().frame(MODE_CYCLE | MODE_CAL_ENABLE, NOP)
}

pub(crate) const fn cal_enable_frame(variant: Variant) -> [u8; 3] {
    variant.init_command().frame(MODE_CAL_ENABLE, NOP)
}

/// Reset is the lone command byte, without a trailing parameter byte
pub(crate) const fn soft_reset_frame() -> [u8; 1] {
    [Command::SoftReset as u8]
}
