use core::fmt::Debug;

use embedded_hal::delay::DelayNs;

use crate::bus::{BusClient, RegisterBus};
use crate::calc::{Calc, CompensatedReading, CompensatedReadingF64, RawSample};
use crate::calibration::CalibrationData;
use crate::constants::*;
use crate::settings::{PowerMode, Settings, Status};
use crate::{BusError, Error, ProbeError, Result, Sequence};

/// Lifecycle of a [`DeviceSession`]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Uninitialized,
    Probing,
    CalibrationLoading,
    Configuring,
    Ready,
    Measuring,
    /// Terminal, the session does no more bus traffic
    Detached,
}

/// Driver for one BME280.
///
/// A session starts out `Uninitialized`, [`attach`](DeviceSession::attach) probes
/// the device, loads its calibration and writes the settings. Once `Ready`,
/// [`measure`](DeviceSession::measure) can be called any number of times.
pub struct DeviceSession<B, D> {
    bus: B,
    delay: D,
    state: State,
    calib: Option<CalibrationData>,
    settings: Settings,
}

impl<B, D> DeviceSession<B, D>
where
    B: BusClient,
    D: DelayNs,
{
    pub fn new(bus: B, delay: D, settings: Settings) -> DeviceSession<B, D> {
        DeviceSession {
            bus,
            delay,
            state: State::Uninitialized,
            calib: None,
            settings,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Calibration of the attached device, `None` until `attach` succeeded and
    /// again after `detach`.
    pub fn calibration(&self) -> Option<&CalibrationData> {
        self.calib.as_ref()
    }

    /// Settings last written to the device, or to be written on attach.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Probes the device, loads the calibration and commits the settings.
    ///
    /// On failure the session is back in `Uninitialized` and `attach` may be
    /// called again.
    pub fn attach(&mut self) -> Result<(), B::Error> {
        if self.state != State::Uninitialized {
            return Err(Error::InvalidState(self.state));
        }

        match self.load() {
            Ok(calib) => {
                info!("BME280 attached");
                self.calib = Some(calib);
                self.state = State::Ready;
                Ok(())
            }
            Err(e) => {
                self.calib = None;
                self.state = State::Uninitialized;
                Err(e)
            }
        }
    }

    fn load(&mut self) -> Result<CalibrationData, B::Error> {
        self.state = State::Probing;
        debug!("Probing chip id");
        let chip_id = self.bus.exclusive(|regs| {
            if !regs.check_capabilities() {
                return Err(Error::Probe(ProbeError::MissingCapabilities));
            }
            regs.read_byte(BME280_CHIP_ID_ADDR)
                .map_err(Error::during(Sequence::ChipId))
        })?;
        if chip_id != BME280_CHIP_ID {
            error!("Unexpected chip id {:#x}", chip_id);
            return Err(ProbeError::IdentityMismatch {
                expected: BME280_CHIP_ID,
                found: chip_id,
            }
            .into());
        }

        self.state = State::CalibrationLoading;
        debug!("Reading calibration");
        let mut coeff_array = [0u8; BME280_COEFF_LEN];
        self.bus
            .exclusive(|regs| {
                let (first, second) = coeff_array.split_at_mut(BME280_COEFF_ADDR1_LEN);
                regs.read_block(BME280_COEFF_ADDR1, first)?;
                regs.read_block(BME280_COEFF_ADDR2, second)
            })
            .map_err(Error::during(Sequence::Calibration))?;
        let calib = CalibrationData::decode(&coeff_array)?;

        self.state = State::Configuring;
        debug!("Committing settings");
        let settings = self.settings;
        self.bus
            .exclusive(|regs| settings.commit(regs))
            .map_err(Error::during(Sequence::Configuration))?;

        Ok(calib)
    }

    /// Takes one sample and compensates it.
    ///
    /// In sleep and forced mode this triggers a forced measurement and waits for
    /// it, in normal mode the latest sample is read.
    pub fn measure(&mut self) -> Result<CompensatedReading, B::Error> {
        let calib = self.ready_calibration()?;
        let raw = self.sample()?;
        Ok(Calc::compensate(&calib, &raw))
    }

    /// Like [`measure`](DeviceSession::measure) with the floating point formulas.
    pub fn measure_f64(&mut self) -> Result<CompensatedReadingF64, B::Error> {
        let calib = self.ready_calibration()?;
        let raw = self.sample()?;
        Ok(Calc::compensate_f64(&calib, &raw))
    }

    /// Takes one sample without compensating it.
    pub fn read_raw(&mut self) -> Result<RawSample, B::Error> {
        self.ready_calibration()?;
        self.sample()
    }

    /// Writes new settings, they are kept only if all three writes succeed.
    pub fn reconfigure(&mut self, settings: Settings) -> Result<(), B::Error> {
        self.ready_calibration()?;
        self.state = State::Configuring;
        debug!("Committing settings");
        let result = self
            .bus
            .exclusive(|regs| settings.commit(regs))
            .map_err(Error::during(Sequence::Configuration));
        self.state = State::Ready;
        result?;
        self.settings = settings;
        Ok(())
    }

    /// Reads the configuration registers back from the device.
    pub fn read_settings(&mut self) -> Result<Settings, B::Error> {
        self.ready_calibration()?;
        // ctrl_hum, status, ctrl_meas, config
        let mut buff = [0u8; 4];
        self.bus
            .exclusive(|regs| regs.read_block(BME280_CTRL_HUM_ADDR, &mut buff))
            .map_err(Error::during(Sequence::Readback))?;
        Ok(Settings::from_registers(buff[0], buff[2], buff[3]))
    }

    /// Resets the device and writes the current settings again.
    ///
    /// If the reset went through but writing the settings failed, the device
    /// runs on its power-on register values while [`settings`](DeviceSession::settings)
    /// still returns the stored ones. The error then carries
    /// `Sequence::Configuration` and `reconfigure(*session.settings())` restores them.
    pub fn soft_reset(&mut self) -> Result<(), B::Error> {
        self.ready_calibration()?;
        self.state = State::Configuring;
        let result = self.reset_and_commit();
        self.state = State::Ready;
        result
    }

    fn reset_and_commit(&mut self) -> Result<(), B::Error> {
        debug!("Soft reset");
        self.bus
            .exclusive(|regs| regs.write_byte(BME280_SOFT_RESET_ADDR, BME280_SOFT_RESET_CMD))
            .map_err(Error::during(Sequence::Reset))?;
        self.delay.delay_ms(BME280_STARTUP_PERIOD_MS);
        let settings = self.settings;
        self.bus
            .exclusive(|regs| settings.commit(regs))
            .map_err(Error::during(Sequence::Configuration))
    }

    /// Ends the session, no further operations are accepted.
    pub fn detach(&mut self) -> Result<(), B::Error> {
        self.ready_calibration()?;
        info!("BME280 detached");
        self.calib = None;
        self.state = State::Detached;
        Ok(())
    }

    /// Gives back the bus client and the delay.
    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    fn ready_calibration(&self) -> Result<CalibrationData, B::Error> {
        match (self.state, self.calib) {
            (State::Ready, Some(calib)) => Ok(calib),
            (state, _) => Err(Error::InvalidState(state)),
        }
    }

    fn sample(&mut self) -> Result<RawSample, B::Error> {
        self.state = State::Measuring;
        let result = self.trigger_and_fetch();
        self.state = State::Ready;
        let buff = result?;
        debug!("Field data read {:?}", buff);
        Ok(RawSample::from_registers(&buff))
    }

    /// The bus is only held for the register transactions, never across a wait.
    fn trigger_and_fetch(&mut self) -> Result<[u8; BME280_DATA_LEN], B::Error> {
        let settings = self.settings;
        if settings.mode == PowerMode::NormalMode {
            return self.bus.exclusive(|regs| fetch(regs));
        }

        self.bus.exclusive(|regs| trigger_forced(regs, &settings))?;
        self.delay
            .delay_us(settings.max_measurement_time().as_micros() as u32);
        for _ in 0..BME280_POLL_TRIES {
            let fetched = self.bus.exclusive(|regs| {
                let status = regs
                    .read_byte(BME280_STATUS_ADDR)
                    .map_err(Error::during(Sequence::Status))?;
                if Status::from_bits_truncate(status).contains(Status::MEASURING) {
                    return Ok(None);
                }
                fetch(regs).map(Some)
            })?;
            if let Some(buff) = fetched {
                return Ok(buff);
            }
            self.delay.delay_us(BME280_POLL_PERIOD_US);
        }
        warn!("Measurement did not complete");
        Err(Error::during(Sequence::Status)(BusError::Timeout))
    }
}

fn trigger_forced<E: Debug>(regs: &mut dyn RegisterBus<Error = E>, settings: &Settings) -> Result<(), E> {
    let forced = Settings {
        mode: PowerMode::ForcedMode,
        ..*settings
    };
    let (reg_addr, reg_data) = forced.to_registers()[1];
    regs.write_byte(reg_addr, reg_data)
        .map_err(Error::during(Sequence::Trigger))
}

fn fetch<E: Debug>(regs: &mut dyn RegisterBus<Error = E>) -> Result<[u8; BME280_DATA_LEN], E> {
    let mut buff = [0u8; BME280_DATA_LEN];
    regs.read_block(BME280_DATA_ADDR, &mut buff)
        .map_err(Error::during(Sequence::Measurement))?;
    Ok(buff)
}
