use crate::hw_def::*;
use crate::lifecycle::{Action, Lifecycle};
use crate::types::*;
use crate::{Ahtx0Async, Clock, Config, Error, State};

use embedded_hal_async::{delay::DelayNs, i2c::I2c};

impl<I2C, Delay, Clk, E> Ahtx0Async<I2C, Delay, Clk>
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

    /// Wait out the power-on time
    pub async fn init(&mut self) {
        self.delay.delay_ms(DELAY_POWER_ON_MS).await;
    }

    async fn write(&mut self, frame: &[u8]) -> Result<(), Error<E>> {
        if let Err(i2c_err) = self.i2c.write(self.address.as_u8(), frame).await {
            warn!("ahtx0: command 0x{:02x} not acknowledged", frame[0]);
            return Err(Error::Write(i2c_err));
        }
        Ok(())
    }

    /// Send the measure command without waiting for the result
    pub async fn start_measurement(&mut self) -> Result<(), Error<E>> {
        self.write(&measure_frame()).await
    }

    /// Switch to normal mode
    pub async fn set_normal_mode(&mut self) -> Result<(), Error<E>> {
        self.write(&normal_mode_frame()).await?;
        self.delay.delay_ms(DELAY_CMD_MS).await;
        Ok(())
    }

    /// Switch to cycle mode with calibration enabled
    pub async fn set_cycle_mode(&mut self) -> Result<(), Error<E>> {
        self.write(&cycle_mode_frame(self.variant)).await
    }

    /// Load the factory calibration and confirm it through the status byte
    pub async fn enable_factory_calibration(&mut self) -> Result<(), Error<E>> {
        self.write(&cal_enable_frame(self.variant)).await?;
        self.delay.delay_ms(DELAY_CMD_MS).await;
        if !self.calibration_enabled(ReadMode::Force).await? {
            warn!("ahtx0: calibration bit not set after init");
            return Err(Error::NotCalibrated);
        }
        Ok(())
    }

    /// Software reset followed by normal mode and calibration load
    pub async fn soft_reset(&mut self) -> Result<(), Error<E>> {
        self.write(&soft_reset_frame()).await?;
        self.delay.delay_ms(DELAY_RESET_MS).await;
        self.set_normal_mode().await?;
        self.enable_factory_calibration().await
    }

    /// Read the status byte
    pub async fn read_status(&mut self) -> Result<Status, Error<E>> {
        let mut read_buf = [0u8; 1];
        self.i2c
            .read(self.address.as_u8(), &mut read_buf)
            .await
            .map_err(Error::Read)?;
        Ok(Status::from(read_buf[0]))
    }

    async fn buffered_status(&mut self, mode: ReadMode) -> Result<Status, Error<E>> {
        if mode == ReadMode::Force {
            match self.read_status().await {
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
    pub async fn calibration_enabled(&mut self, mode: ReadMode) -> Result<bool, Error<E>> {
        self.buffered_status(mode).await?.calibrated().ok_or(Error::NoValidData)
    }

    /// Busy bit of the status byte
    pub async fn sensor_busy(&mut self, mode: ReadMode) -> Result<bool, Error<E>> {
        self.buffered_status(mode).await?.busy().ok_or(Error::NoValidData)
    }

    async fn fetch_payload(&mut self) -> Result<Measurement, Error<E>> {
        let mut read_buf = [0u8; PAYLOAD_LEN + 1];
        let read_buf = &mut read_buf[..self.variant.read_len()];
        if let Err(i2c_err) = self.i2c.read(self.address.as_u8(), read_buf).await {
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

    /// Measure and read in one call, waiting out the conversion time if the sensor is busy
    pub async fn read_raw_data(&mut self) -> Result<RawReading, Error<E>> {
        self.start_measurement().await?;
        let status = self.read_status().await?;
        if status.calibrated() != Some(true) {
            warn!("ahtx0: sensor not calibrated");
            return Err(Error::NotCalibrated);
        }
        if status.busy() == Some(true) {
            self.delay.delay_ms(DELAY_MEASURE_MS).await;
        }
        self.fetch_payload().await?;
        Ok(self.raw)
    }

    async fn buffered_reading(&mut self, mode: ReadMode) -> Result<RawReading, Error<E>> {
        match mode {
            ReadMode::Force => self.read_raw_data().await,
            ReadMode::Cached => Ok(self.raw),
        }
    }

    /// Temperature in centigrade
    pub async fn read_temperature(&mut self, mode: ReadMode) -> Result<f32, Error<E>> {
        self.buffered_reading(mode).await?.centigrade().ok_or(Error::NoValidData)
    }

    /// Relative humidity in percent
    pub async fn read_humidity(&mut self, mode: ReadMode) -> Result<f32, Error<E>> {
        self.buffered_reading(mode).await?.humidity_percent().ok_or(Error::NoValidData)
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

    /// Start a measurement now.  `Some(ms)` also sets the auto-trigger period, `None` leaves it unchanged
    pub async fn trigger_measurement(&mut self, every_ms: Option<u32>) -> Result<(), Error<E>> {
        if let Some(ms) = every_ms {
            self.lifecycle.set_trigger_delay(ms);
        }
        let result = self.start_measurement().await;
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

    /// Drive the measurement lifecycle.  Only awaits bus transfers, never the conversion time.
    pub async fn poll(&mut self) -> Option<Measurement> {
        let now = self.clock.now_ms();
        match self.lifecycle.poll(now) {
            Action::None => None,
            Action::Trigger => {
                if self.trigger_measurement(None).await.is_err() {
                    warn!("ahtx0: auto-trigger failed");
                }
                None
            }
            Action::Read => match self.fetch_payload().await {
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
