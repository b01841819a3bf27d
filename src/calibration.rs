use crate::constants::*;
use crate::DecodeError;

/// Factory calibration loaded from the two coefficient blocks of the sensor.
///
/// The values are unique per device and never change, the session reads them
/// once when attaching.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationData {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
    pub dig_h1: u8,
    pub dig_h2: i16,
    pub dig_h3: u8,
    /// signed 12 bit, 0xe4 holds bits 11:4 and 0xe5[3:0] bits 3:0
    pub dig_h4: i16,
    /// signed 12 bit, 0xe6 holds bits 11:4 and 0xe5[7:4] bits 3:0
    pub dig_h5: i16,
    pub dig_h6: i8,
}

impl CalibrationData {
    /// Decodes the coefficient registers.
    ///
    /// `raw` holds the 26 bytes read from 0x88 followed by the 7 bytes read
    /// from 0xe1. Extra trailing bytes are ignored.
    pub fn decode(raw: &[u8]) -> Result<CalibrationData, DecodeError> {
        if raw.len() < BME280_COEFF_LEN {
            return Err(DecodeError::TruncatedInput {
                expected: BME280_COEFF_LEN,
                actual: raw.len(),
            });
        }

        let u16_at = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]);
        // second block starts at 0xe1
        let hum = &raw[BME280_COEFF_ADDR1_LEN..BME280_COEFF_LEN];

        Ok(CalibrationData {
            dig_t1: u16_at(0),
            dig_t2: i16_at(2),
            dig_t3: i16_at(4),
            dig_p1: u16_at(6),
            dig_p2: i16_at(8),
            dig_p3: i16_at(10),
            dig_p4: i16_at(12),
            dig_p5: i16_at(14),
            dig_p6: i16_at(16),
            dig_p7: i16_at(18),
            dig_p8: i16_at(20),
            dig_p9: i16_at(22),
            // raw[24] is the reserved register 0xa0
            dig_h1: raw[25],
            dig_h2: i16::from_le_bytes([hum[0], hum[1]]),
            dig_h3: hum[2],
            dig_h4: (hum[3] as i8 as i16) * 16 | (hum[4] & 0x0f) as i16,
            dig_h5: (hum[5] as i8 as i16) * 16 | (hum[4] >> 4) as i16,
            dig_h6: hum[6] as i8,
        })
    }
}
