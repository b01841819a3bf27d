use core::cell::RefCell;

use bme280_session::*;
use embassy_sync::blocking_mutex::{raw::NoopRawMutex, Mutex};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::ErrorKind;
use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

const CALIB1: [u8; 26] = [
    0x70, 0x6b, 0x43, 0x67, 0x18, 0xfc, 0x7d, 0x8e, 0x43, 0xd6, 0xd0, 0x0b, 0x27, 0x0b, 0x8c, 0x00,
    0xf9, 0xff, 0x8c, 0x3c, 0xf8, 0xc6, 0x70, 0x17, 0x00, 0x4b,
];
const CALIB2: [u8; 7] = [0x6a, 0x01, 0x00, 0x13, 0x29, 0x03, 0x1e];
// adc_P 415148, adc_T 519888, adc_H 30000
const DATA: [u8; 8] = [0x65, 0x5a, 0xc0, 0x7e, 0xed, 0x00, 0x75, 0x30];

fn attach_script(addr: u8) -> Vec<I2cTransaction> {
    vec![
        I2cTransaction::write_read(addr, vec![0xd0], vec![0x60]),
        I2cTransaction::write_read(addr, vec![0x88], CALIB1.to_vec()),
        I2cTransaction::write_read(addr, vec![0xe1], CALIB2.to_vec()),
        I2cTransaction::write(addr, vec![0xf2, 0x01]),
        I2cTransaction::write(addr, vec![0xf4, 0x24]),
        I2cTransaction::write(addr, vec![0xf5, 0x00]),
    ]
}

fn forced_sample(addr: u8) -> Vec<I2cTransaction> {
    vec![
        I2cTransaction::write(addr, vec![0xf4, 0x25]),
        I2cTransaction::write_read(addr, vec![0xf3], vec![0x08]),
        I2cTransaction::write_read(addr, vec![0xf3], vec![0x00]),
        I2cTransaction::write_read(addr, vec![0xf7], DATA.to_vec()),
    ]
}

#[test]
fn forced_mode_lifecycle() {
    let mut script = attach_script(0x76);
    script.extend(forced_sample(0x76));
    script.extend(forced_sample(0x76));

    let bus = I2cBus::new(I2cMock::new(&script), I2CAddress::Primary);
    let mut dev = DeviceSession::new(bus, NoopDelay::new(), Settings::default());
    dev.attach().unwrap();
    assert_eq!(dev.state(), State::Ready);

    let reading = dev.measure().unwrap();
    assert_eq!(reading.temperature, 2508);
    assert_eq!(reading.pressure, Some(25767233));
    assert_eq!(reading.humidity, 56317);
    assert!((reading.temperature_celsius() - 25.08).abs() < 0.001);
    assert!((reading.pressure_pa().unwrap() - 100653.27).abs() < 0.5);

    let raw = dev.read_raw().unwrap();
    assert_eq!(raw.adc_t, 519888);
    assert_eq!(raw.adc_p, 415148);
    assert_eq!(raw.adc_h, 30000);

    dev.detach().unwrap();
    assert_eq!(dev.measure(), Err(Error::InvalidState(State::Detached)));

    let (bus, _) = dev.release();
    bus.release().done();
}

#[test]
fn identity_mismatch_is_not_retried() {
    let i2c = I2cMock::new(&[I2cTransaction::write_read(0x77, vec![0xd0], vec![0x58])]);
    let mut dev = DeviceSession::new(
        I2cBus::new(i2c, I2CAddress::Secondary),
        NoopDelay::new(),
        Settings::default(),
    );
    assert_eq!(
        dev.attach(),
        Err(Error::Probe(ProbeError::IdentityMismatch {
            expected: CHIP_ID,
            found: 0x58
        }))
    );
    assert_eq!(dev.state(), State::Uninitialized);
    assert!(dev.calibration().is_none());

    let (bus, _) = dev.release();
    bus.release().done();
}

#[test]
fn calibration_fault_leaves_no_calibration() {
    let i2c = I2cMock::new(&[
        I2cTransaction::write_read(0x76, vec![0xd0], vec![0x60]),
        I2cTransaction::write_read(0x76, vec![0x88], CALIB1.to_vec()),
        I2cTransaction::write_read(0x76, vec![0xe1], CALIB2.to_vec()).with_error(ErrorKind::Other),
    ]);
    let mut dev = DeviceSession::new(
        I2cBus::new(i2c, I2CAddress::Primary),
        NoopDelay::new(),
        Settings::default(),
    );
    assert_eq!(
        dev.attach(),
        Err(Error::Bus {
            sequence: Sequence::Calibration,
            error: BusError::Transport(ErrorKind::Other)
        })
    );
    assert_eq!(dev.state(), State::Uninitialized);
    assert!(dev.calibration().is_none());

    let (bus, _) = dev.release();
    bus.release().done();
}

#[test]
fn measurement_fault_keeps_calibration() {
    let mut script = attach_script(0x76);
    script.push(I2cTransaction::write(0x76, vec![0xf4, 0x25]).with_error(ErrorKind::Other));
    script.extend(forced_sample(0x76));

    let bus = I2cBus::new(I2cMock::new(&script), I2CAddress::Primary);
    let mut dev = DeviceSession::new(bus, NoopDelay::new(), Settings::default());
    dev.attach().unwrap();
    let calib = *dev.calibration().unwrap();

    assert_eq!(
        dev.measure(),
        Err(Error::Bus {
            sequence: Sequence::Trigger,
            error: BusError::Transport(ErrorKind::Other)
        })
    );
    assert_eq!(dev.state(), State::Ready);
    assert_eq!(dev.calibration(), Some(&calib));
    assert_eq!(dev.settings(), &Settings::default());
    assert_eq!(dev.measure().unwrap().temperature, 2508);

    let (bus, _) = dev.release();
    bus.release().done();
}

#[test]
fn two_sensors_share_one_bus() {
    let mut script = attach_script(0x76);
    script.extend(attach_script(0x77));
    script.extend(forced_sample(0x77));
    script.extend(forced_sample(0x76));

    let shared = Mutex::<NoopRawMutex, _>::new(RefCell::new(I2cMock::new(&script)));
    let mut primary = DeviceSession::new(
        SharedBus::new(&shared, I2CAddress::Primary),
        NoopDelay::new(),
        Settings::default(),
    );
    let mut secondary = DeviceSession::new(
        SharedBus::new(&shared, I2CAddress::Secondary),
        NoopDelay::new(),
        Settings::default(),
    );

    primary.attach().unwrap();
    secondary.attach().unwrap();
    assert_eq!(secondary.measure().unwrap().humidity, 56317);
    assert_eq!(primary.measure().unwrap().humidity, 56317);

    drop((primary, secondary));
    shared.into_inner().into_inner().done();
}

#[test]
fn session_over_borrowed_bus() {
    let mut script = attach_script(0x76);
    script.push(I2cTransaction::write_read(0x76, vec![0xf2], vec![0x01, 0x00, 0x24, 0x00]));

    let mut bus = I2cBus::new(I2cMock::new(&script), I2CAddress::Primary);
    {
        let mut dev = DeviceSession::new(&mut bus, NoopDelay::new(), Settings::default());
        dev.attach().unwrap();
        assert_eq!(dev.read_settings(), Ok(Settings::default()));
    }
    bus.release().done();
}

/// Records whether the shared bus was free while the driver waited.
struct LockCheckingDelay<'a> {
    bus: &'a Mutex<NoopRawMutex, RefCell<I2cMock>>,
    locked_ns: u64,
    free_ns: u64,
}

impl DelayNs for LockCheckingDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        if self.bus.lock(|cell| cell.try_borrow_mut().is_err()) {
            self.locked_ns += ns as u64;
        } else {
            self.free_ns += ns as u64;
        }
    }
}

#[test]
fn bus_is_free_while_waiting() {
    let mut script = attach_script(0x76);
    script.extend(forced_sample(0x76));
    script.extend([
        I2cTransaction::write(0x76, vec![0xe0, 0xb6]),
        I2cTransaction::write(0x76, vec![0xf2, 0x01]),
        I2cTransaction::write(0x76, vec![0xf4, 0x24]),
        I2cTransaction::write(0x76, vec![0xf5, 0x00]),
    ]);

    let shared = Mutex::<NoopRawMutex, _>::new(RefCell::new(I2cMock::new(&script)));
    let delay = LockCheckingDelay {
        bus: &shared,
        locked_ns: 0,
        free_ns: 0,
    };
    let mut dev = DeviceSession::new(
        SharedBus::new(&shared, I2CAddress::Primary),
        delay,
        Settings::default(),
    );
    dev.attach().unwrap();
    assert_eq!(dev.measure().unwrap().temperature, 2508);
    dev.soft_reset().unwrap();

    let (_, delay) = dev.release();
    assert_eq!(delay.locked_ns, 0);
    // measurement time, one poll period, reset start-up
    assert_eq!(delay.free_ns, 9_300_000 + 500_000 + 2_000_000);
    shared.into_inner().into_inner().done();
}
