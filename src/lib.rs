//! This crate is a pure Rust implementation for the BME280 humidity, pressure and temperature sensor.
//! The library reads the three sensors via I²C and converts the raw ADC values with the
//! per-unit factory calibration into compensated readings.
//!
//! The library uses the embedded-hal crate to abstract reading and writing via I²C.
//! A [`DeviceSession`] walks the device through probing, calibration loading and
//! configuration, after which every [`DeviceSession::measure`] call triggers and
//! compensates one sample. [`SensorStream`] exposes the same session as a byte stream
//! through [`embedded_io::Read`].
//!
//! ```
//! use bme280_session::*;
//! use embedded_hal_mock::eh1::delay::NoopDelay;
//! use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
//!
//! # let mut calib = vec![0u8; 26];
//! # calib[0..2].copy_from_slice(&27504u16.to_le_bytes());
//! # calib[2..4].copy_from_slice(&26435i16.to_le_bytes());
//! # calib[4..6].copy_from_slice(&(-1000i16).to_le_bytes());
//! # calib[6..8].copy_from_slice(&36477u16.to_le_bytes());
//! # let i2c = I2cMock::new(&[
//! #     I2cTransaction::write_read(0x76, vec![0xd0], vec![0x60]),
//! #     I2cTransaction::write_read(0x76, vec![0x88], calib),
//! #     I2cTransaction::write_read(0x76, vec![0xe1], vec![0; 7]),
//! #     I2cTransaction::write(0x76, vec![0xf2, 0b010]),
//! #     I2cTransaction::write(0x76, vec![0xf4, 0b010_011_11]),
//! #     I2cTransaction::write(0x76, vec![0xf5, 0b101_100_00]),
//! #     I2cTransaction::write_read(0x76, vec![0xf7], vec![0x65, 0x5a, 0xc0, 0x7e, 0xed, 0x00, 0x80, 0x00]),
//! # ]);
//! let settings = SettingsBuilder::new()
//!     .with_temperature_oversampling(Oversampling::X2)
//!     .with_pressure_oversampling(Oversampling::X4)
//!     .with_humidity_oversampling(Oversampling::X2)
//!     .with_filter(IirFilter::X16)
//!     .with_standby_time(StandbyTime::Millis1000)
//!     .with_power_mode(PowerMode::NormalMode)
//!     .build();
//!
//! let bus = I2cBus::new(i2c, I2CAddress::Primary);
//! let mut dev = DeviceSession::new(bus, NoopDelay::new(), settings);
//! dev.attach()?;
//!
//! let reading = dev.measure()?;
//! println!("Temperature {}°C", reading.temperature_celsius());
//! println!("Humidity {}%", reading.humidity_percent());
//! if let Some(hpa) = reading.pressure_hpa() {
//!     println!("Pressure {}hPa", hpa);
//! }
//! # let (bus, _) = dev.release();
//! # bus.release().done();
//! # Ok::<(), Error<embedded_hal::i2c::ErrorKind>>(())
//! ```

#![no_std]
#![forbid(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

// must stay first so the logging macros are visible to the other modules
mod fmt;

mod bus;
mod calc;
mod calibration;
mod constants;
mod session;
mod settings;
mod stream;

pub use self::bus::{BusClient, I2cBus, RegisterBus, SharedBus};
pub use self::calc::{Calc, CompensatedReading, CompensatedReadingF64, RawSample};
pub use self::calibration::CalibrationData;
pub use self::session::{DeviceSession, State};
pub use self::settings::{
    IirFilter, Oversampling, PowerMode, Settings, SettingsBuilder, StandbyTime, Status,
};
pub use self::stream::{SensorStream, FRAME_LEN};

use core::fmt::Debug;
use core::result;

/// Transport level failures reported by a [`RegisterBus`]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<E> {
    ///
    /// The underlying bus reported an error, e.g. a missing acknowledge
    ///
    Transport(E),
    ///
    /// The bus cannot perform the requested kind of transaction
    ///
    Unsupported,
    ///
    /// The device did not finish in the allotted time
    ///
    Timeout,
}

/// Register sequence during which a bus error occurred
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sequence {
    ChipId,
    Calibration,
    Configuration,
    Trigger,
    Status,
    Measurement,
    Readback,
    Reset,
}

/// Reasons an attach attempt did not find a usable BME280
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProbeError {
    /// The bus lacks byte or byte-data transactions
    MissingCapabilities,
    /// The chip id register holds something other than [`CHIP_ID`]
    IdentityMismatch { expected: u8, found: u8 },
}

/// Failures decoding register contents
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    TruncatedInput { expected: usize, actual: usize },
}

/// All possible errors in this crate
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    Bus { sequence: Sequence, error: BusError<E> },
    Probe(ProbeError),
    Decode(DecodeError),
    ///
    /// The operation is not allowed in the current lifecycle state
    ///
    InvalidState(State),
}

/// Abbreviates `core::result::Result` type
pub type Result<T, E> = result::Result<T, Error<E>>;

impl<E> Error<E> {
    /// Returns a closure wrapping a [`BusError`] with the sequence it happened in.
    pub(crate) fn during(sequence: Sequence) -> impl FnOnce(BusError<E>) -> Error<E> {
        move |error| Error::Bus { sequence, error }
    }
}

impl<E> From<ProbeError> for Error<E> {
    fn from(e: ProbeError) -> Self {
        Error::Probe(e)
    }
}

impl<E> From<DecodeError> for Error<E> {
    fn from(e: DecodeError) -> Self {
        Error::Decode(e)
    }
}

impl<E: Debug> embedded_io::Error for Error<E> {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_io::ErrorKind;
        match self {
            Error::Bus { error: BusError::Timeout, .. } => ErrorKind::TimedOut,
            Error::Bus { error: BusError::Unsupported, .. } => ErrorKind::Unsupported,
            Error::Bus { .. } => ErrorKind::Other,
            Error::Probe(_) => ErrorKind::NotFound,
            Error::Decode(_) => ErrorKind::InvalidData,
            Error::InvalidState(_) => ErrorKind::NotConnected,
        }
    }
}

/// BME280 unique chip identifier
pub const CHIP_ID: u8 = constants::BME280_CHIP_ID;

///
/// I2C Slave Address
/// To determine the slave address of your device you can use `i2cdetect -y 1` on linux.
/// The 7-bit device address is 111011x. The 6 MSB bits are fixed.
/// The last bit is changeable by SDO value and can be changed during operation.
/// Connecting SDO to GND results in slave address 1110110 (0x76); connecting it to V DDIO results in slave
/// address 1110111 (0x77).
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2CAddress {
    /// Primary Slave Address 0x76
    Primary,
    /// Secondary Slave Address 0x77
    Secondary,
    /// Alternative address
    Other(u8),
}

impl I2CAddress {
    pub fn addr(&self) -> u8 {
        match &self {
            I2CAddress::Primary => 0x76u8,
            I2CAddress::Secondary => 0x77u8,
            I2CAddress::Other(addr) => *addr,
        }
    }
}

impl Default for I2CAddress {
    fn default() -> I2CAddress {
        I2CAddress::Primary
    }
}
