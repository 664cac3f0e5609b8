/// Physical sensor acquisition for the broadcasting node
use bme280::i2c::BME280;
use rppal::{hal::Delay, i2c::I2c};

pub type SensorError = Box<dyn std::error::Error + Send + Sync>;

/// One set of physical values, as handed to the codec
#[derive(Debug, Clone, Copy)]
pub struct PhysicalSample {
    pub temp_primary: f32,
    pub pressure: f32,
    pub temp_secondary: f32,
    pub humidity: f32,
}

/// Source of physical readings; acquisition may fail per cycle
pub trait SensorSource {
    fn read(&mut self) -> Result<PhysicalSample, SensorError>;
}

/// BME280 over I2C
///
/// The node hardware carries a pressure/temperature chip and a separate
/// humidity/temperature chip. A single BME280 covers all four channels, so
/// with one chip attached both temperature channels report the same value.
#[derive(Debug)]
pub struct Bme280Source {
    bme280: BME280<I2c>,
    delay: Delay,
}

impl Bme280Source {
    pub fn new() -> Result<Self, SensorError> {
        let i2c = I2c::new()?;
        let mut bme280 = BME280::new_primary(i2c);
        let mut delay = Delay;
        bme280
            .init(&mut delay)
            .map_err(|e| format!("Failed to initialize BME280: {:?}", e))?;

        Ok(Bme280Source { bme280, delay })
    }
}

impl SensorSource for Bme280Source {
    fn read(&mut self) -> Result<PhysicalSample, SensorError> {
        let measurements = self
            .bme280
            .measure(&mut self.delay)
            .map_err(|e| format!("BME280 measurement failed: {:?}", e))?;

        Ok(PhysicalSample {
            temp_primary: measurements.temperature,
            // The driver reports pascals; the wire format carries hPa.
            pressure: measurements.pressure / 100.0,
            temp_secondary: measurements.temperature,
            humidity: measurements.humidity,
        })
    }
}
