//! HC-SR505 PIR motion sensor.
//!
//! The module drives its output HIGH for a few seconds after each detected
//! movement.  Any [`embedded_hal::digital::InputPin`] works: an
//! `esp_idf_hal::gpio::PinDriver` on the device, a mock in tests.

use embedded_hal::digital::InputPin;

use crate::error::SensorError;

pub struct PirSensor<P> {
    pin: P,
    last: bool,
}

impl<P: InputPin> PirSensor<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, last: false }
    }

    /// `true` while the sensor reports motion.
    pub fn read(&mut self) -> Result<bool, SensorError> {
        let motion = self
            .pin
            .is_high()
            .map_err(|_| SensorError::GpioReadFailed)?;
        if motion && !self.last {
            log::debug!("pir: motion");
        }
        self.last = motion;
        Ok(motion)
    }

    /// Level of the last successful read.
    pub fn last(&self) -> bool {
        self.last
    }
}
