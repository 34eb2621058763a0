use crate::hw_def::*;
use crate::lifecycle::{Action, Lifecycle};
use crate::types::*;
use crate::{Ahtx0, Clock, Config, Error, State};

use embedded_hal::{delay::DelayNs, i2c::I2c};

impl<I2C, Delay, Clk, E> Ahtx0<I2C, Delay, Clk>
where
    I2C: I2c<Error = E>,
    Delay: DelayNs,
    Clk: Clock,
{
    /// Create a new AHT10/AHT20 driver instance
    pub fn new(i2c: I2C, delay: Delay, clock: Clk, config: Config) -> Self {
        Self {
            i2c,
            delay,
            clock,
            address: config.address,
            variant: config.variant,
            raw: RawReading::default(),
            lifecycle: Lifecycle::new(config.trigger_delay_ms, config.retry_delay_ms),
            callback: None,
        }
    }

    /// Give back the bus, delay and clock
    pub fn release(self) -> (I2C, Delay, Clk) {
        (self.i2c, self.delay, self.clock)
    }

    /// Wait out the power-on time.  The bus must already be configured by the HAL.
    pub fn init(&mut self) -> &mut Self {
        self.delay.delay_ms(DELAY_POWER_ON_MS);
        self
    }

    fn write(&mut self, frame: &[u8]) -> Result<(), Error<E>> {
        if let Err(i2c_err) = self.i2c.write(self.address.as_u8(), frame) {
            warn!("ahtx0: command 0x{:02x} not acknowledged", frame[0]);
            return Err(Error::Write(i2c_err));
        }
        Ok(())
    }

    /// Send the measure command without waiting for the result
    pub fn start_measurement(&mut self) -> Result<(), Error<E>> {
        self.write(&measure_frame())
    }

    /// Switch to normal mode
    pub fn set_normal_mode(&mut self) -> Result<(), Error<E>> {
        self.write(&normal_mode_frame())?;
        self.delay.delay_ms(DELAY_CMD_MS);
        Ok(())
    }

    /// Switch to the sensor's own repeating measurement mode, with calibration enabled
    pub fn set_cycle_mode(&mut self) -> Result<(), Error<E>> {
        self.write(&cycle_mode_frame(self.variant))
    }

    /// Load the factory calibration and confirm it through the status byte
    pub fn enable_factory_calibration(&mut self) -> Result<(), Error<E>> {
        self.write(&cal_enable_frame(self.variant))?;
        self.delay.delay_ms(DELAY_CMD_MS);
        if !self.calibration_enabled(ReadMode::Force)? {
            warn!("ahtx0: calibration bit not set after init");
            return Err(Error::NotCalibrated);
        }
        Ok(())
    }

    /// Software reset followed by normal mode and calibration load
    pub fn soft_reset(&mut self) -> Result<(), Error<E>> {
        self.write(&soft_reset_frame())?;
        self.delay.delay_ms(DELAY_RESET_MS);
        self.set_normal_mode()?;
        self.enable_factory_calibration()
    }

    /// Read the status byte
    pub fn read_status(&mut self) -> Result<Status, Error<E>> {
        let mut read_buf = [0u8; 1];
        self.i2c
            .read(self.address.as_u8(), &mut read_buf)
            .map_err(Error::Read)?;
        Ok(Status::from(read_buf[0]))
    }

    fn buffered_status(&mut self, mode: ReadMode) -> Result<Status, Error<E>> {
        if mode == ReadMode::Force {
            match self.read_status() {
                Ok(status) => self.raw.0[0] = status.raw(),
                Err(e) => {
                    self.raw.invalidate();
                    return Err(e);
                }
            }
        }
        Ok(self.raw.status())
    }

    /// Calibration bit of the status byte
    pub fn calibration_enabled(&mut self, mode: ReadMode) -> Result<bool, Error<E>> {
        self.buffered_status(mode)?.calibrated().ok_or(Error::NoValidData)
    }

    /// Busy bit of the status byte
    pub fn sensor_busy(&mut self, mode: ReadMode) -> Result<bool, Error<E>> {
        self.buffered_status(mode)?.busy().ok_or(Error::NoValidData)
    }

    fn fetch_payload(&mut self) -> Result<Measurement, Error<E>> {
        let mut read_buf = [0u8; PAYLOAD_LEN + 1];
        let read_buf = &mut read_buf[..self.variant.read_len()];
        if let Err(i2c_err) = self.i2c.read(self.address.as_u8(), read_buf) {
            self.raw.invalidate();
            return Err(Error::Read(i2c_err));
        }
        #[cfg(feature = "crc")]
        if !crate::crc_matches(read_buf) {
            warn!("ahtx0: crc mismatch");
            self.raw.invalidate();
            return Err(Error::CrcMismatch);
        }
        self.raw.0.copy_from_slice(&read_buf[..PAYLOAD_LEN]);
        self.raw.measurement().ok_or(Error::NoValidData)
    }

    /// Measure and read in one call, blocking for the conversion time if the sensor is busy
    pub fn read_raw_data(&mut self) -> Result<RawReading, Error<E>> {
        self.start_measurement()?;
        let status = self.read_status()?;
        if status.calibrated() != Some(true) {
            warn!("ahtx0: sensor not calibrated");
            return Err(Error::NotCalibrated);
        }
        if status.busy() == Some(true) {
            self.delay.delay_ms(DELAY_MEASURE_MS);
        }
        self.fetch_payload()?;
        Ok(self.raw)
    }

    fn buffered_reading(&mut self, mode: ReadMode) -> Result<RawReading, Error<E>> {
        match mode {
            ReadMode::Force => self.read_raw_data(),
            ReadMode::Cached => Ok(self.raw),
        }
    }

    /// Temperature in centigrade
    pub fn read_temperature(&mut self, mode: ReadMode) -> Result<f32, Error<E>> {
        self.buffered_reading(mode)?.centigrade().ok_or(Error::NoValidData)
    }

    /// Relative humidity in percent
    pub fn read_humidity(&mut self, mode: ReadMode) -> Result<f32, Error<E>> {
        self.buffered_reading(mode)?.humidity_percent().ok_or(Error::NoValidData)
    }

    /// Bytes of the last measurement
    pub fn raw_data(&self) -> &RawReading {
        &self.raw
    }

    /// Register the handler for completed measurements, replacing any previous one
    pub fn set_callback(&mut self, callback: Callback) -> &mut Self {
        self.callback = Some(callback);
        self
    }

    /// Start a measurement now.  `Some(ms)` also sets the auto-trigger period, `Some(0)`
    /// makes this a one-off and `None` leaves the period unchanged.
    pub fn trigger_measurement(&mut self, every_ms: Option<u32>) -> Result<(), Error<E>> {
        if let Some(ms) = every_ms {
            self.lifecycle.set_trigger_delay(ms);
        }
        let result = self.start_measurement();
        self.lifecycle.trigger_sent(self.clock.now_ms(), result.is_ok());
        result
    }

    /// Stop periodic measurements
    pub fn disable_auto_trigger(&mut self) -> &mut Self {
        self.lifecycle.disable_auto_trigger();
        self
    }

    /// Period of automatic measurements, 0 disables them
    pub fn set_trigger_delay(&mut self, ms: u32) -> &mut Self {
        self.lifecycle.set_trigger_delay(ms);
        self
    }

    /// Spacing between recovery attempts
    pub fn set_retry_delay(&mut self, ms: u32) -> &mut Self {
        self.lifecycle.set_retry_delay(ms);
        self
    }

    /// Current auto-trigger period
    pub fn trigger_delay_ms(&self) -> u32 {
        self.lifecycle.trigger_delay_ms()
    }

    /// Current retry delay
    pub fn retry_delay_ms(&self) -> u32 {
        self.lifecycle.retry_delay_ms()
    }

    /// True while a measurement is in flight or a failure is being recovered
    pub fn is_busy(&self) -> bool {
        self.lifecycle.is_busy()
    }

    /// Current lifecycle state
    pub fn state(&self) -> State {
        self.lifecycle.state()
    }

    /// Drive the measurement lifecycle.  Call this from the main loop more often than the
    /// shortest configured delay; it never blocks.
    pub fn poll(&mut self) -> Option<Measurement> {
        let now = self.clock.now_ms();
        match self.lifecycle.poll(now) {
            Action::None => None,
            Action::Trigger => {
                if self.trigger_measurement(None).is_err() {
                    warn!("ahtx0: auto-trigger failed");
                }
                None
            }
            Action::Read => match self.fetch_payload() {
                Ok(measurement) => {
                    self.lifecycle.read_done(now, true);
                    debug!(
                        "ahtx0: {} C, {} %RH",
                        measurement.centigrade, measurement.humidity_percent
                    );
                    if let Some(callback) = self.callback {
                        callback(measurement);
                    }
                    Some(measurement)
                }
                Err(_) => {
                    warn!("ahtx0: measurement read failed");
                    self.lifecycle.read_done(now, false);
                    None
                }
            },
        }
    }
}
