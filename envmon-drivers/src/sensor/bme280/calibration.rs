//! BME280 calibration coefficients and fixed-point compensation
//!
//! The formulas are the integer versions from the Bosch datasheet
//! (section 4.2.3 and 8.2). Arithmetic wraps like the reference C code so
//! results stay bit-exact for any coefficient set.

use envmon_core::reading::Measurement;

/// Upper clamp of the humidity accumulator (100 %RH in Q22.10 << 12)
const HUMIDITY_MAX: i32 = 419_430_400;

/// Factory trimming coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
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
    pub dig_h4: i16,
    pub dig_h5: i16,
    pub dig_h6: i8,
}

/// Fine-resolution temperature shared by pressure and humidity compensation
///
/// Only produced by [`Calibration::compensate_temperature`], so pressure and
/// humidity cannot be compensated before temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FineTemperature(i32);

impl FineTemperature {
    pub fn value(self) -> i32 {
        self.0
    }
}

/// Uncompensated ADC values from one burst read at 0xF7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSample {
    /// 20-bit pressure
    pub pressure: u32,
    /// 20-bit temperature
    pub temperature: u32,
    /// 16-bit humidity
    pub humidity: u32,
}

impl RawSample {
    /// Unpack press_msb..hum_lsb (registers 0xF7..0xFE)
    pub fn from_bytes(regs: &[u8; 8]) -> Self {
        let twenty_bit =
            |msb: u8, lsb: u8, xlsb: u8| (msb as u32) << 12 | (lsb as u32) << 4 | (xlsb as u32) >> 4;

        Self {
            pressure: twenty_bit(regs[0], regs[1], regs[2]),
            temperature: twenty_bit(regs[3], regs[4], regs[5]),
            humidity: (regs[6] as u32) << 8 | regs[7] as u32,
        }
    }
}

/// Reassemble dig_H4/dig_H5 from the raw bytes at 0xE4 and 0xE5..0xE6
///
/// The two coefficients share the nibbles of register 0xE5.
pub fn unpack_h4_h5(h4_raw: u8, h5_raw: u16) -> (i16, i16) {
    let h4 = ((h4_raw as u16) << 4 | (h5_raw & 0x000F)) as i16;
    let h5 = (h5_raw >> 4) as i16;
    (h4, h5)
}

impl Calibration {
    /// Temperature in °C × 100, plus the fine temperature
    pub fn compensate_temperature(&self, adc_t: u32) -> (i32, FineTemperature) {
        let adc = adc_t as i32;
        let t1 = self.dig_t1 as i32;

        let var1 = ((adc / 8).wrapping_sub(t1 * 2)).wrapping_mul(self.dig_t2 as i32) >> 11;
        let d = (adc / 16).wrapping_sub(t1);
        let var2 = ((d.wrapping_mul(d) >> 12).wrapping_mul(self.dig_t3 as i32)) >> 14;

        let t_fine = var1.wrapping_add(var2);
        let temperature = t_fine.wrapping_mul(5).wrapping_add(128) / 256;
        (temperature, FineTemperature(t_fine))
    }

    /// Pressure in Pa × 256 (Q24.8); 0 if the coefficients are degenerate
    pub fn compensate_pressure(&self, adc_p: u32, fine: FineTemperature) -> u32 {
        let mut var1 = fine.0 as i64 - 128_000;
        let mut var2 = var1.wrapping_mul(var1).wrapping_mul(self.dig_p6 as i64);
        var2 = var2.wrapping_add(var1.wrapping_mul(self.dig_p5 as i64) << 17);
        var2 = var2.wrapping_add((self.dig_p4 as i64) << 35);
        var1 = (var1.wrapping_mul(var1).wrapping_mul(self.dig_p3 as i64) >> 8)
            .wrapping_add(var1.wrapping_mul(self.dig_p2 as i64) << 12);
        var1 = ((1i64 << 47).wrapping_add(var1)).wrapping_mul(self.dig_p1 as i64) >> 33;

        if var1 == 0 {
            return 0;
        }

        let mut p = 1_048_576 - adc_p as i64;
        p = ((p << 31).wrapping_sub(var2))
            .wrapping_mul(3125)
            .wrapping_div(var1);
        var1 = (self.dig_p9 as i64).wrapping_mul(p >> 13).wrapping_mul(p >> 13) >> 25;
        var2 = (self.dig_p8 as i64).wrapping_mul(p) >> 19;

        ((p.wrapping_add(var1).wrapping_add(var2) >> 8) + ((self.dig_p7 as i64) << 4)) as u32
    }

    /// Relative humidity in %RH × 1024 (Q22.10), within 0..=102400
    pub fn compensate_humidity(&self, adc_h: u32, fine: FineTemperature) -> u32 {
        let adc = adc_h as i32;
        let v = fine.0.wrapping_sub(76_800);

        let offset = ((adc << 14)
            .wrapping_sub((self.dig_h4 as i32) << 20)
            .wrapping_sub((self.dig_h5 as i32).wrapping_mul(v))
            .wrapping_add(16_384))
            >> 15;

        let h6_term = v.wrapping_mul(self.dig_h6 as i32) >> 10;
        let h3_term = (v.wrapping_mul(self.dig_h3 as i32) >> 11).wrapping_add(32_768);
        let scale = (((h6_term.wrapping_mul(h3_term) >> 10).wrapping_add(2_097_152))
            .wrapping_mul(self.dig_h2 as i32)
            .wrapping_add(8_192))
            >> 14;

        let mut h = offset.wrapping_mul(scale);
        h = h.wrapping_sub(
            ((((h >> 15).wrapping_mul(h >> 15)) >> 7).wrapping_mul(self.dig_h1 as i32)) >> 4,
        );
        (h.clamp(0, HUMIDITY_MAX) >> 12) as u32
    }

    /// Compensate a full sample, temperature first
    pub fn compensate(&self, raw: &RawSample) -> Measurement {
        let (temperature, fine) = self.compensate_temperature(raw.temperature);
        Measurement {
            humidity: self.compensate_humidity(raw.humidity, fine),
            pressure: self.compensate_pressure(raw.pressure, fine),
            temperature,
        }
    }
}
