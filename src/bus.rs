//! Register level access to the sensor.
//!
//! [`RegisterBus`] is a single register transaction, [`BusClient`] hands out
//! exclusive access for a whole sequence of them. The driver only ever talks to
//! the device from inside [`BusClient::exclusive`], so a calibration read or a
//! configuration commit is never interleaved with another user of the bus.

use core::cell::RefCell;
use core::fmt::Debug;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::i2c::I2c;

use crate::{BusError, I2CAddress};

/// Single register transactions against one device address.
pub trait RegisterBus {
    type Error: Debug;

    /// Whether the bus can do byte and byte-data transactions.
    fn check_capabilities(&mut self) -> bool;

    fn read_byte(&mut self, register: u8) -> Result<u8, BusError<Self::Error>>;

    /// Fills `buf` with consecutive registers starting at `register`.
    fn read_block(&mut self, register: u8, buf: &mut [u8]) -> Result<(), BusError<Self::Error>>;

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), BusError<Self::Error>>;
}

/// Grants exclusive use of the bus for a sequence of register transactions.
pub trait BusClient {
    type Error: Debug;

    /// Runs `f` while no other user of the bus can issue a transaction. Access
    /// is given back when `f` returns, whatever the outcome.
    fn exclusive<R>(&mut self, f: impl FnOnce(&mut dyn RegisterBus<Error = Self::Error>) -> R)
        -> R;
}

impl<T: BusClient> BusClient for &mut T {
    type Error = T::Error;

    fn exclusive<R>(
        &mut self,
        f: impl FnOnce(&mut dyn RegisterBus<Error = Self::Error>) -> R,
    ) -> R {
        (**self).exclusive(f)
    }
}

/// [`RegisterBus`] on top of an embedded-hal I²C peripheral.
///
/// Exclusivity comes from the `&mut` borrow, so this is the client to use when
/// the sensor is the only device on the bus or the bus is already shared by
/// other means.
#[derive(Debug)]
pub struct I2cBus<I2C> {
    i2c: I2C,
    dev_id: I2CAddress,
}

impl<I2C> I2cBus<I2C> {
    pub fn new(i2c: I2C, dev_id: I2CAddress) -> Self {
        I2cBus { i2c, dev_id }
    }

    pub fn address(&self) -> I2CAddress {
        self.dev_id
    }

    /// Releases the I²C peripheral.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> RegisterBus for I2cBus<I2C> {
    type Error = I2C::Error;

    fn check_capabilities(&mut self) -> bool {
        // write and write_read are mandatory parts of the embedded-hal I2c trait
        true
    }

    fn read_byte(&mut self, register: u8) -> Result<u8, BusError<Self::Error>> {
        let mut buf = [0; 1];
        self.i2c
            .write_read(self.dev_id.addr(), &[register], &mut buf)
            .map_err(BusError::Transport)?;
        Ok(buf[0])
    }

    fn read_block(&mut self, register: u8, buf: &mut [u8]) -> Result<(), BusError<Self::Error>> {
        self.i2c
            .write_read(self.dev_id.addr(), &[register], buf)
            .map_err(BusError::Transport)
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), BusError<Self::Error>> {
        trace!("Setting register reg: {:#x} value: {:#x}", register, value);
        self.i2c
            .write(self.dev_id.addr(), &[register, value])
            .map_err(BusError::Transport)
    }
}

impl<I2C: I2c> BusClient for I2cBus<I2C> {
    type Error = I2C::Error;

    fn exclusive<R>(
        &mut self,
        f: impl FnOnce(&mut dyn RegisterBus<Error = Self::Error>) -> R,
    ) -> R {
        f(self)
    }
}

/// Handle to an I²C bus shared between several drivers.
///
/// The bus lives in an embassy blocking mutex; every sequence the driver runs
/// holds the lock from its first to its last transaction.
///
/// ```
/// use core::cell::RefCell;
/// use bme280_session::{I2CAddress, SharedBus};
/// use embassy_sync::blocking_mutex::{raw::NoopRawMutex, Mutex};
/// # use embedded_hal_mock::eh1::i2c::Mock as I2cMock;
/// # let i2c = I2cMock::new(&[]);
///
/// let bus = Mutex::<NoopRawMutex, _>::new(RefCell::new(i2c));
/// let primary = SharedBus::new(&bus, I2CAddress::Primary);
/// let secondary = SharedBus::new(&bus, I2CAddress::Secondary);
/// # drop((primary, secondary));
/// # bus.into_inner().into_inner().done();
/// ```
pub struct SharedBus<'a, M: RawMutex, I2C> {
    bus: &'a Mutex<M, RefCell<I2C>>,
    dev_id: I2CAddress,
}

impl<'a, M: RawMutex, I2C> SharedBus<'a, M, I2C> {
    pub fn new(bus: &'a Mutex<M, RefCell<I2C>>, dev_id: I2CAddress) -> Self {
        SharedBus { bus, dev_id }
    }
}

impl<'a, M: RawMutex, I2C: I2c> BusClient for SharedBus<'a, M, I2C> {
    type Error = I2C::Error;

    fn exclusive<R>(
        &mut self,
        f: impl FnOnce(&mut dyn RegisterBus<Error = Self::Error>) -> R,
    ) -> R {
        let dev_id = self.dev_id;
        self.bus.lock(|cell| {
            let mut i2c = cell.borrow_mut();
            let mut regs = I2cBus::new(&mut *i2c, dev_id);
            f(&mut regs)
        })
    }
}
