use crate::calibration::CalibrationData;
use crate::constants::*;

/// Uncompensated ADC values of one measurement
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// 20 bit temperature value
    pub adc_t: u32,
    /// 20 bit pressure value
    pub adc_p: u32,
    pub adc_h: u16,
}

impl RawSample {
    /// Decodes the data registers 0xf7..=0xfe
    /// (press msb, lsb, xlsb, temp msb, lsb, xlsb, hum msb, lsb).
    pub fn from_registers(buff: &[u8; BME280_DATA_LEN]) -> RawSample {
        RawSample {
            adc_p: BME280_CONCAT_20BIT(buff[0], buff[1], buff[2]),
            adc_t: BME280_CONCAT_20BIT(buff[3], buff[4], buff[5]),
            adc_h: BME280_CONCAT_BYTES(buff[6], buff[7]),
        }
    }
}

/// Compensated sensor values in fixed point
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompensatedReading {
    /// Temperature in hundredths of a degree celsius
    pub temperature: i32,
    /// Pressure in Pa as Q24.8, `None` if the calibration makes it incomputable
    pub pressure: Option<u32>,
    /// Relative humidity in % as Q22.10
    pub humidity: u32,
}

impl CompensatedReading {
    /// Temperature in degree celsius (°C)
    pub fn temperature_celsius(&self) -> f32 {
        self.temperature as f32 / 100f32
    }

    /// Pressure in pascal (Pa)
    pub fn pressure_pa(&self) -> Option<f32> {
        self.pressure.map(|p| p as f32 / 256f32)
    }

    /// Pressure in hectopascal (hPA)
    pub fn pressure_hpa(&self) -> Option<f32> {
        self.pressure.map(|p| p as f32 / 25600f32)
    }

    /// Humidity in % relative humidity
    pub fn humidity_percent(&self) -> f32 {
        self.humidity as f32 / 1024f32
    }

    /// Frame as delivered by [`SensorStream`](crate::SensorStream): little endian
    /// `i32` temperature, `u32` pressure (0 when unavailable) and `u32` humidity.
    pub fn to_le_bytes(&self) -> [u8; 12] {
        let mut frame = [0u8; 12];
        frame[0..4].copy_from_slice(&self.temperature.to_le_bytes());
        frame[4..8].copy_from_slice(&self.pressure.unwrap_or(0).to_le_bytes());
        frame[8..12].copy_from_slice(&self.humidity.to_le_bytes());
        frame
    }

    pub fn from_le_bytes(frame: [u8; 12]) -> CompensatedReading {
        let word = |i: usize| [frame[i], frame[i + 1], frame[i + 2], frame[i + 3]];
        let pressure = u32::from_le_bytes(word(4));
        CompensatedReading {
            temperature: i32::from_le_bytes(word(0)),
            pressure: if pressure == 0 { None } else { Some(pressure) },
            humidity: u32::from_le_bytes(word(8)),
        }
    }
}

/// Compensated sensor values in floating point
#[derive(Debug, Default, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompensatedReadingF64 {
    /// Temperature in °C
    pub temperature: f64,
    /// Pressure in Pa
    pub pressure: Option<f64>,
    /// Relative humidity in %
    pub humidity: f64,
}

/// Compensation formulas of the datasheet, section 4.2.3 and 8.1
pub struct Calc {}

impl Calc {
    /// Returns the temperature in 0.01 °C and `t_fine`, the intermediate the
    /// pressure and humidity formulas depend on.
    pub fn calc_temperature(calib: &CalibrationData, adc_t: u32) -> (i32, i32) {
        let adc_t = adc_t as i64;
        let t1 = calib.dig_t1 as i64;

        let var1 = (((adc_t >> 3) - (t1 << 1)) * calib.dig_t2 as i64) >> 11;
        let var2 = ((((adc_t >> 4) - t1) * ((adc_t >> 4) - t1)) >> 12)
            .wrapping_mul(calib.dig_t3 as i64)
            >> 14;
        let t_fine = var1 + var2;
        let calc_temp = (t_fine * 5 + 128) >> 8;
        (calc_temp as i32, t_fine as i32)
    }

    /// Returns the pressure in Pa as Q24.8, `None` if `dig_p1` zeroes the divisor.
    pub fn calc_pressure(calib: &CalibrationData, t_fine: i32, adc_p: u32) -> Option<u32> {
        let mut var1: i64 = t_fine as i64 - 128000;
        let mut var2: i64 = var1.wrapping_mul(var1).wrapping_mul(calib.dig_p6 as i64);
        var2 = var2.wrapping_add(var1.wrapping_mul(calib.dig_p5 as i64) << 17);
        var2 = var2.wrapping_add((calib.dig_p4 as i64) << 35);
        var1 = (var1.wrapping_mul(var1).wrapping_mul(calib.dig_p3 as i64) >> 8)
            .wrapping_add(var1.wrapping_mul(calib.dig_p2 as i64) << 12);
        var1 = ((1i64 << 47).wrapping_add(var1)).wrapping_mul(calib.dig_p1 as i64) >> 33;
        if var1 == 0 {
            return None;
        }

        let mut calc_pres: i64 = 1_048_576 - adc_p as i64;
        calc_pres = ((calc_pres << 31).wrapping_sub(var2))
            .wrapping_mul(3125)
            .wrapping_div(var1);
        var1 = (calib.dig_p9 as i64)
            .wrapping_mul(calc_pres >> 13)
            .wrapping_mul(calc_pres >> 13)
            >> 25;
        var2 = (calib.dig_p8 as i64).wrapping_mul(calc_pres) >> 19;
        calc_pres = (calc_pres.wrapping_add(var1).wrapping_add(var2) >> 8)
            .wrapping_add((calib.dig_p7 as i64) << 4);
        Some(calc_pres as u32)
    }

    /// Returns the relative humidity in % as Q22.10, limited to 0..=100 %.
    pub fn calc_humidity(calib: &CalibrationData, t_fine: i32, adc_h: u16) -> u32 {
        let adc_h = adc_h as i64;
        let h1 = calib.dig_h1 as i64;
        let h2 = calib.dig_h2 as i64;
        let h3 = calib.dig_h3 as i64;
        let h4 = calib.dig_h4 as i64;
        let h5 = calib.dig_h5 as i64;
        let h6 = calib.dig_h6 as i64;

        let mut v_x1: i64 = t_fine as i64 - 76800;
        let var1 = ((adc_h << 14) - (h4 << 20) - h5 * v_x1 + 16384) >> 15;
        let var2 = (((((v_x1 * h6) >> 10) * (((v_x1 * h3) >> 11) + 32768)) >> 10) + 2_097_152)
            * h2
            + 8192;
        v_x1 = var1.wrapping_mul(var2 >> 14);
        v_x1 -= ((((v_x1 >> 15).wrapping_mul(v_x1 >> 15)) >> 7).wrapping_mul(h1)) >> 4;
        let calc_hum = v_x1.clamp(0, BME280_HUMIDITY_MAX);
        (calc_hum >> 12) as u32
    }

    pub fn compensate(calib: &CalibrationData, raw: &RawSample) -> CompensatedReading {
        let (temperature, t_fine) = Calc::calc_temperature(calib, raw.adc_t);
        debug!(
            "adc_temp: {} adc_pres: {} adc_hum: {} t_fine: {}",
            raw.adc_t, raw.adc_p, raw.adc_h, t_fine
        );
        CompensatedReading {
            temperature,
            pressure: Calc::calc_pressure(calib, t_fine, raw.adc_p),
            humidity: Calc::calc_humidity(calib, t_fine, raw.adc_h),
        }
    }

    /// Returns the temperature in °C and `t_fine`.
    pub fn calc_temperature_f64(calib: &CalibrationData, adc_t: u32) -> (f64, i32) {
        let adc_t = adc_t as f64;
        let t1 = calib.dig_t1 as f64;

        let var1 = (adc_t / 16384.0 - t1 / 1024.0) * calib.dig_t2 as f64;
        let var2 = (adc_t / 131072.0 - t1 / 8192.0)
            * (adc_t / 131072.0 - t1 / 8192.0)
            * calib.dig_t3 as f64;
        ((var1 + var2) / 5120.0, (var1 + var2) as i32)
    }

    /// Returns the pressure in Pa, `None` if `dig_p1` zeroes the divisor.
    pub fn calc_pressure_f64(calib: &CalibrationData, t_fine: i32, adc_p: u32) -> Option<f64> {
        let mut var1 = t_fine as f64 / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * calib.dig_p6 as f64 / 32768.0;
        var2 += var1 * calib.dig_p5 as f64 * 2.0;
        var2 = var2 / 4.0 + calib.dig_p4 as f64 * 65536.0;
        var1 = (calib.dig_p3 as f64 * var1 * var1 / 524288.0 + calib.dig_p2 as f64 * var1)
            / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * calib.dig_p1 as f64;
        if var1 == 0.0 {
            return None;
        }

        let mut calc_pres = 1048576.0 - adc_p as f64;
        calc_pres = (calc_pres - var2 / 4096.0) * 6250.0 / var1;
        var1 = calib.dig_p9 as f64 * calc_pres * calc_pres / 2147483648.0;
        var2 = calc_pres * calib.dig_p8 as f64 / 32768.0;
        Some(calc_pres + (var1 + var2 + calib.dig_p7 as f64) / 16.0)
    }

    /// Returns the relative humidity in %, limited to 0..=100 %.
    pub fn calc_humidity_f64(calib: &CalibrationData, t_fine: i32, adc_h: u16) -> f64 {
        let mut var_h = t_fine as f64 - 76800.0;
        var_h = (adc_h as f64
            - (calib.dig_h4 as f64 * 64.0 + calib.dig_h5 as f64 / 16384.0 * var_h))
            * (calib.dig_h2 as f64 / 65536.0
                * (1.0
                    + calib.dig_h6 as f64 / 67108864.0
                        * var_h
                        * (1.0 + calib.dig_h3 as f64 / 67108864.0 * var_h)));
        var_h *= 1.0 - calib.dig_h1 as f64 * var_h / 524288.0;
        var_h.clamp(0.0, 100.0)
    }

    pub fn compensate_f64(calib: &CalibrationData, raw: &RawSample) -> CompensatedReadingF64 {
        let (temperature, t_fine) = Calc::calc_temperature_f64(calib, raw.adc_t);
        CompensatedReadingF64 {
            temperature,
            pressure: Calc::calc_pressure_f64(calib, t_fine, raw.adc_p),
            humidity: Calc::calc_humidity_f64(calib, t_fine, raw.adc_h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calib() -> CalibrationData {
        CalibrationData {
            dig_t1: 27504,
            dig_t2: 26435,
            dig_t3: -1000,
            dig_p1: 36477,
            dig_p2: -10685,
            dig_p3: 3024,
            dig_p4: 2855,
            dig_p5: 140,
            dig_p6: -7,
            dig_p7: 15500,
            dig_p8: -14600,
            dig_p9: 6000,
            dig_h1: 75,
            dig_h2: 362,
            dig_h3: 0,
            dig_h4: 313,
            dig_h5: 50,
            dig_h6: 30,
        }
    }

    const ADC_T: u32 = 519888;
    const ADC_P: u32 = 415148;
    const T_FINE: i32 = 128422;

    #[test]
    fn datasheet_example() {
        let calib = calib();
        let (temp, t_fine) = Calc::calc_temperature(&calib, ADC_T);
        assert_eq!(temp, 2508);
        assert_eq!(t_fine, T_FINE);

        let pres = Calc::calc_pressure(&calib, t_fine, ADC_P).unwrap();
        assert_eq!(pres, 25767233);
        assert!((pres as f64 / 256.0 - 100653.27).abs() < 0.5);

        let (temp, t_fine) = Calc::calc_temperature_f64(&calib, ADC_T);
        assert!((temp - 25.08).abs() < 0.01);
        assert_eq!(t_fine, T_FINE);
        let pres = Calc::calc_pressure_f64(&calib, t_fine, ADC_P).unwrap();
        assert!((pres - 100653.27).abs() < 0.5);
    }

    #[test]
    fn humidity_reference_values() {
        let calib = calib();
        assert_eq!(Calc::calc_humidity(&calib, T_FINE, 30000), 56317);
        assert_eq!(Calc::calc_humidity(&calib, T_FINE, 0x6a40), 40335);
        assert!((Calc::calc_humidity_f64(&calib, T_FINE, 30000) - 55.0).abs() < 0.05);
        assert!((Calc::calc_humidity_f64(&calib, T_FINE, 0x6a40) - 39.39).abs() < 0.05);
    }

    #[test]
    fn humidity_is_clamped() {
        let calib = calib();
        assert_eq!(Calc::calc_humidity(&calib, T_FINE, 0), 0);
        assert_eq!(Calc::calc_humidity(&calib, T_FINE, 0xffff), 102400);
        assert_eq!(Calc::calc_humidity_f64(&calib, T_FINE, 0), 0.0);
        assert_eq!(Calc::calc_humidity_f64(&calib, T_FINE, 0xffff), 100.0);

        for adc_h in (0..=0xffffu32).step_by(97) {
            for t_fine in [-200_000, 0, T_FINE, 400_000] {
                assert!(Calc::calc_humidity(&calib, t_fine, adc_h as u16) <= 102400);
                let hum = Calc::calc_humidity_f64(&calib, t_fine, adc_h as u16);
                assert!((0.0..=100.0).contains(&hum));
            }
        }
    }

    #[test]
    fn pressure_unavailable_without_p1() {
        let calib = CalibrationData {
            dig_p1: 0,
            ..calib()
        };
        assert_eq!(Calc::calc_pressure(&calib, T_FINE, ADC_P), None);
        assert_eq!(Calc::calc_pressure_f64(&calib, T_FINE, ADC_P), None);

        let raw = RawSample {
            adc_t: ADC_T,
            adc_p: ADC_P,
            adc_h: 30000,
        };
        let reading = Calc::compensate(&calib, &raw);
        assert_eq!(reading.pressure, None);
        assert_eq!(reading.pressure_hpa(), None);
        assert_eq!(reading.temperature, 2508);
        assert_eq!(Calc::compensate_f64(&calib, &raw).pressure, None);
    }

    #[test]
    fn compensation_is_deterministic() {
        let calib = calib();
        for adc in [0u32, 1, ADC_P, ADC_T, 0x80000, 0xfffff] {
            let raw = RawSample {
                adc_t: adc,
                adc_p: adc,
                adc_h: adc as u16,
            };
            assert_eq!(
                Calc::compensate(&calib, &raw),
                Calc::compensate(&calib, &raw)
            );
            assert_eq!(
                Calc::compensate_f64(&calib, &raw),
                Calc::compensate_f64(&calib, &raw)
            );
        }
    }

    #[test]
    fn decode_data_registers() {
        let raw = RawSample::from_registers(&[0x65, 0x5a, 0xc0, 0x7e, 0xed, 0x00, 0x6a, 0x40]);
        assert_eq!(
            raw,
            RawSample {
                adc_t: ADC_T,
                adc_p: ADC_P,
                adc_h: 0x6a40,
            }
        );

        let reading = Calc::compensate(&calib(), &raw);
        assert_eq!(
            reading,
            CompensatedReading {
                temperature: 2508,
                pressure: Some(25767233),
                humidity: 40335,
            }
        );
        assert!((reading.temperature_celsius() - 25.08).abs() < 0.001);
        assert!((reading.humidity_percent() - 39.39).abs() < 0.01);
        assert!((reading.pressure_hpa().unwrap() - 1006.53).abs() < 0.01);
    }

    #[test]
    fn frame_layout() {
        let reading = CompensatedReading {
            temperature: -1234,
            pressure: Some(25767233),
            humidity: 56317,
        };
        let frame = reading.to_le_bytes();
        assert_eq!(&frame[0..4], &(-1234i32).to_le_bytes());
        assert_eq!(&frame[4..8], &[0x41, 0x2d, 0x89, 0x01]);
        assert_eq!(&frame[8..12], &56317u32.to_le_bytes());
        assert_eq!(CompensatedReading::from_le_bytes(frame), reading);

        let unavailable = CompensatedReading {
            pressure: None,
            ..reading
        };
        assert_eq!(&unavailable.to_le_bytes()[4..8], &[0, 0, 0, 0]);
    }
}
