use bitflags::bitflags;
use core::fmt::Debug;
use core::time::Duration;

use crate::bus::RegisterBus;
use crate::constants::*;
use crate::BusError;

/// Over-sampling settings
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Oversampling {
    /// Measurement skipped, the output register reads 0x80000 (0x8000 for humidity)
    Skipped = 0,
    X1 = 1,
    X2 = 2,
    X4 = 3,
    X8 = 4,
    X16 = 5,
}

impl Oversampling {
    /// Number of conversions averaged into one output value.
    pub fn factor(self) -> u32 {
        match self {
            Oversampling::Skipped => 0,
            Oversampling::X1 => 1,
            Oversampling::X2 => 2,
            Oversampling::X4 => 4,
            Oversampling::X8 => 8,
            Oversampling::X16 => 16,
        }
    }
}

impl From<u8> for Oversampling {
    /// Decodes a 3 bit osrs field, codes above 0b101 mean ×16 as well.
    fn from(os: u8) -> Oversampling {
        match os & 0x07 {
            0 => Oversampling::Skipped,
            1 => Oversampling::X1,
            2 => Oversampling::X2,
            3 => Oversampling::X4,
            4 => Oversampling::X8,
            _ => Oversampling::X16,
        }
    }
}

impl Default for Oversampling {
    fn default() -> Self {
        Oversampling::X1
    }
}

/// IIR filter settings
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum IirFilter {
    Off = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
}

impl From<u8> for IirFilter {
    fn from(filter: u8) -> IirFilter {
        match filter & 0x07 {
            0 => IirFilter::Off,
            1 => IirFilter::X2,
            2 => IirFilter::X4,
            3 => IirFilter::X8,
            _ => IirFilter::X16,
        }
    }
}

impl Default for IirFilter {
    fn default() -> Self {
        IirFilter::Off
    }
}

/// Inactive duration t_standby between two measurements in normal mode
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StandbyTime {
    Micros500 = 0,
    Micros62500 = 1,
    Millis125 = 2,
    Millis250 = 3,
    Millis500 = 4,
    Millis1000 = 5,
    Millis10 = 6,
    Millis20 = 7,
}

impl StandbyTime {
    pub fn duration(self) -> Duration {
        match self {
            StandbyTime::Micros500 => Duration::from_micros(500),
            StandbyTime::Micros62500 => Duration::from_micros(62_500),
            StandbyTime::Millis125 => Duration::from_millis(125),
            StandbyTime::Millis250 => Duration::from_millis(250),
            StandbyTime::Millis500 => Duration::from_millis(500),
            StandbyTime::Millis1000 => Duration::from_millis(1000),
            StandbyTime::Millis10 => Duration::from_millis(10),
            StandbyTime::Millis20 => Duration::from_millis(20),
        }
    }
}

impl From<u8> for StandbyTime {
    fn from(t_sb: u8) -> StandbyTime {
        match t_sb & 0x07 {
            0 => StandbyTime::Micros500,
            1 => StandbyTime::Micros62500,
            2 => StandbyTime::Millis125,
            3 => StandbyTime::Millis250,
            4 => StandbyTime::Millis500,
            5 => StandbyTime::Millis1000,
            6 => StandbyTime::Millis10,
            _ => StandbyTime::Millis20,
        }
    }
}

impl Default for StandbyTime {
    fn default() -> Self {
        StandbyTime::Micros500
    }
}

///
/// Power mode settings
///
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
    SleepMode,
    ForcedMode,
    NormalMode,
}

impl PowerMode {
    pub(crate) fn value(&self) -> u8 {
        match self {
            PowerMode::SleepMode => BME280_SLEEP_MODE,
            PowerMode::ForcedMode => BME280_FORCED_MODE,
            PowerMode::NormalMode => BME280_NORMAL_MODE,
        }
    }
}

impl From<u8> for PowerMode {
    /// Decodes the 2 bit mode field, both 0b01 and 0b10 select forced mode.
    fn from(power_mode: u8) -> Self {
        match power_mode & BME280_MODE_MSK {
            BME280_SLEEP_MODE => PowerMode::SleepMode,
            BME280_NORMAL_MODE => PowerMode::NormalMode,
            _ => PowerMode::ForcedMode,
        }
    }
}

impl Default for PowerMode {
    fn default() -> Self {
        PowerMode::SleepMode
    }
}

bitflags! {
    /// Contents of the status register
    #[derive(Default)]
    pub struct Status: u8 {
        /// Set while a conversion is running, cleared once the results are in the data registers
        const MEASURING = 0x08;
        /// Set while NVM data is copied to the image registers
        const IM_UPDATE = 0x01;
    }
}

/// Sampling, filter and mode configuration of the sensor
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    /// Humidity oversampling
    pub osrs_h: Oversampling,
    /// Temperature oversampling
    pub osrs_t: Oversampling,
    /// Pressure oversampling
    pub osrs_p: Oversampling,
    /// Filter coefficient
    pub filter: IirFilter,
    pub standby: StandbyTime,
    pub mode: PowerMode,
    /// Enables the 3-wire SPI interface
    pub spi3w_en: bool,
}

impl Settings {
    /// Register values in the order they have to be written.
    ///
    /// Changes to ctrl_hum only become effective after a write to ctrl_meas,
    /// so ctrl_hum always comes first.
    pub fn to_registers(&self) -> [(u8, u8); 3] {
        let ctrl_hum = BME280_SET_BITS(0, BME280_OSH_MSK, BME280_OSH_POS, self.osrs_h as u8);

        let mut ctrl_meas = BME280_SET_BITS(0, BME280_OST_MSK, BME280_OST_POS, self.osrs_t as u8);
        ctrl_meas = BME280_SET_BITS(ctrl_meas, BME280_OSP_MSK, BME280_OSP_POS, self.osrs_p as u8);
        ctrl_meas = BME280_SET_BITS(ctrl_meas, BME280_MODE_MSK, BME280_MODE_POS, self.mode.value());

        let mut config = BME280_SET_BITS(0, BME280_STANDBY_MSK, BME280_STANDBY_POS, self.standby as u8);
        config = BME280_SET_BITS(config, BME280_FILTER_MSK, BME280_FILTER_POS, self.filter as u8);
        config = BME280_SET_BITS(
            config,
            BME280_SPI3W_EN_MSK,
            BME280_SPI3W_EN_POS,
            self.spi3w_en as u8,
        );

        [
            (BME280_CTRL_HUM_ADDR, ctrl_hum),
            (BME280_CTRL_MEAS_ADDR, ctrl_meas),
            (BME280_CONFIG_ADDR, config),
        ]
    }

    /// Writes the settings to the device, stopping at the first failing write.
    pub fn commit<E: Debug>(&self, bus: &mut dyn RegisterBus<Error = E>) -> Result<(), BusError<E>> {
        for (reg_addr, reg_data) in self.to_registers() {
            debug!("Setting register reg: {:#x} data: {:#x}", reg_addr, reg_data);
            bus.write_byte(reg_addr, reg_data)?;
        }
        Ok(())
    }

    /// Decodes the contents of the ctrl_hum, ctrl_meas and config registers.
    pub fn from_registers(ctrl_hum: u8, ctrl_meas: u8, config: u8) -> Settings {
        Settings {
            osrs_h: BME280_GET_BITS(ctrl_hum, BME280_OSH_MSK, BME280_OSH_POS).into(),
            osrs_t: BME280_GET_BITS(ctrl_meas, BME280_OST_MSK, BME280_OST_POS).into(),
            osrs_p: BME280_GET_BITS(ctrl_meas, BME280_OSP_MSK, BME280_OSP_POS).into(),
            mode: BME280_GET_BITS(ctrl_meas, BME280_MODE_MSK, BME280_MODE_POS).into(),
            standby: BME280_GET_BITS(config, BME280_STANDBY_MSK, BME280_STANDBY_POS).into(),
            filter: BME280_GET_BITS(config, BME280_FILTER_MSK, BME280_FILTER_POS).into(),
            spi3w_en: BME280_GET_BITS(config, BME280_SPI3W_EN_MSK, BME280_SPI3W_EN_POS) != 0,
        }
    }

    /// Upper bound of the duration of one measurement cycle (datasheet appendix B).
    pub fn max_measurement_time(&self) -> Duration {
        // 1.25 ms + 2.3 ms per conversion, pressure and humidity add 0.575 ms when enabled
        let mut micros = 1250 + 2300 * self.osrs_t.factor();
        for os in [self.osrs_p, self.osrs_h] {
            if os != Oversampling::Skipped {
                micros += 2300 * os.factor() + 575;
            }
        }
        Duration::from_micros(micros as u64)
    }
}

///
/// Builder to construct the desired settings
///
/// # Example
/// ```
/// use bme280_session::{IirFilter, Oversampling, PowerMode, SettingsBuilder, StandbyTime};
/// let settings = SettingsBuilder::new()
///     .with_humidity_oversampling(Oversampling::X1)
///     .with_pressure_oversampling(Oversampling::X16)
///     .with_temperature_oversampling(Oversampling::X2)
///     .with_filter(IirFilter::X16)
///     .with_standby_time(StandbyTime::Micros500)
///     .with_power_mode(PowerMode::NormalMode)
///     .build();
/// assert_eq!(settings.osrs_p, Oversampling::X16);
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn new() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    pub fn with_filter(mut self, filter: IirFilter) -> SettingsBuilder {
        self.settings.filter = filter;
        self
    }

    pub fn with_temperature_oversampling(mut self, os_temp: Oversampling) -> SettingsBuilder {
        self.settings.osrs_t = os_temp;
        self
    }

    pub fn with_pressure_oversampling(mut self, os_pres: Oversampling) -> SettingsBuilder {
        self.settings.osrs_p = os_pres;
        self
    }

    pub fn with_humidity_oversampling(mut self, os_hum: Oversampling) -> SettingsBuilder {
        self.settings.osrs_h = os_hum;
        self
    }

    pub fn with_standby_time(mut self, standby: StandbyTime) -> SettingsBuilder {
        self.settings.standby = standby;
        self
    }

    pub fn with_power_mode(mut self, mode: PowerMode) -> SettingsBuilder {
        self.settings.mode = mode;
        self
    }

    pub fn with_spi3w(mut self, enable: bool) -> SettingsBuilder {
        self.settings.spi3w_en = enable;
        self
    }

    pub fn build(self) -> Settings {
        self.settings
    }
}
