#![allow(dead_code, non_snake_case)]

/// BME280 unique chip identifier
pub const BME280_CHIP_ID: u8 = 0x60;

/// Chip identifier register
pub const BME280_CHIP_ID_ADDR: u8 = 0xd0;

pub const BME280_SOFT_RESET_ADDR: u8 = 0xe0;
pub const BME280_SOFT_RESET_CMD: u8 = 0xb6;

/// Start-up time after a soft reset, NVM data is copied to the image registers
pub const BME280_STARTUP_PERIOD_MS: u32 = 2;

/// Calibration blocks
/// dig_T1..dig_P9, one reserved byte at 0xa0, dig_H1 at 0xa1
pub const BME280_COEFF_ADDR1: u8 = 0x88;
pub const BME280_COEFF_ADDR1_LEN: usize = 26;
/// dig_H2..dig_H6
pub const BME280_COEFF_ADDR2: u8 = 0xe1;
pub const BME280_COEFF_ADDR2_LEN: usize = 7;
pub const BME280_COEFF_LEN: usize = BME280_COEFF_ADDR1_LEN + BME280_COEFF_ADDR2_LEN;

/// Sensor configuration registers
pub const BME280_CTRL_HUM_ADDR: u8 = 0xf2;
pub const BME280_STATUS_ADDR: u8 = 0xf3;
pub const BME280_CTRL_MEAS_ADDR: u8 = 0xf4;
pub const BME280_CONFIG_ADDR: u8 = 0xf5;

/// Measurement block, press_msb..hum_lsb
pub const BME280_DATA_ADDR: u8 = 0xf7;
pub const BME280_DATA_LEN: usize = 8;

/// Status polling while a forced measurement is in progress
pub const BME280_POLL_PERIOD_US: u32 = 500;
pub const BME280_POLL_TRIES: u8 = 10;

/*
    Bit Masks and Bit Positions
*/
// ctrl_hum
pub const BME280_OSH_MSK: u8 = 0x07;
pub const BME280_OSH_POS: u8 = 0;
// ctrl_meas
pub const BME280_OST_MSK: u8 = 0xe0;
pub const BME280_OST_POS: u8 = 5;
pub const BME280_OSP_MSK: u8 = 0x1c;
pub const BME280_OSP_POS: u8 = 2;
pub const BME280_MODE_MSK: u8 = 0x03;
pub const BME280_MODE_POS: u8 = 0;
// config
pub const BME280_STANDBY_MSK: u8 = 0xe0;
pub const BME280_STANDBY_POS: u8 = 5;
pub const BME280_FILTER_MSK: u8 = 0x1c;
pub const BME280_FILTER_POS: u8 = 2;
pub const BME280_SPI3W_EN_MSK: u8 = 0x01;
pub const BME280_SPI3W_EN_POS: u8 = 0;

/// Power mode codes
pub const BME280_SLEEP_MODE: u8 = 0b00;
pub const BME280_FORCED_MODE: u8 = 0b01;
pub const BME280_NORMAL_MODE: u8 = 0b11;

/// Humidity output clamp, 100 %RH in Q22.10 shifted left by 12
pub const BME280_HUMIDITY_MAX: i64 = 419_430_400;

/**
    Apply Masks
*/

// concat 2 u8's into a u16
pub fn BME280_CONCAT_BYTES(most_sig: u8, least_sig: u8) -> u16 {
    ((most_sig as u16) << 8) | (least_sig as u16)
}

// 20 bit ADC value, msb/lsb/xlsb with the xlsb in bits 7:4
pub fn BME280_CONCAT_20BIT(msb: u8, lsb: u8, xlsb: u8) -> u32 {
    ((msb as u32) << 12) | ((lsb as u32) << 4) | ((xlsb as u32) >> 4)
}

pub fn BME280_SET_BITS(reg_data: u8, bitmask: u8, bitpos: u8, data: u8) -> u8 {
    (reg_data & !bitmask) | ((data << bitpos) & bitmask)
}

pub fn BME280_GET_BITS(reg_data: u8, bitmask: u8, bitpos: u8) -> u8 {
    (reg_data & bitmask) >> bitpos
}
