//! Tube calibration data types
//!
//! One duty range per tube, measured per physical display and persisted to
//! flash so it survives power cycles.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::duty::CalibrationPoint;
use crate::N_TUBES;

use super::types::ConfigError;

/// Magic number to identify valid calibration data
pub const CALIBRATION_MAGIC: u32 = 0x5455_4243; // "TUBC"

/// Current calibration data version
pub const CALIBRATION_VERSION: u8 = 1;

/// Upper bound on the postcard encoding of [`CalibrationData`]
pub const MAX_CALIBRATION_SIZE: usize = 192;

/// Complete calibration table stored in flash
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationData {
    /// Magic number for validation
    pub magic: u32,
    /// Data format version
    pub version: u8,
    /// Duty range per logical tube
    pub tubes: [CalibrationPoint; N_TUBES],
    /// CRC32 over magic, version and tubes
    pub crc: u32,
}

impl Default for CalibrationData {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationData {
    /// Full-range calibration for every tube, CRC already set
    pub fn new() -> Self {
        let mut data = Self {
            magic: CALIBRATION_MAGIC,
            version: CALIBRATION_VERSION,
            tubes: [CalibrationPoint::FULL_RANGE; N_TUBES],
            crc: 0,
        };
        data.update_crc();
        data
    }

    /// Check magic and version
    pub fn is_valid(&self) -> bool {
        self.magic == CALIBRATION_MAGIC && self.version == CALIBRATION_VERSION
    }

    /// Check that every point has `low <= high`
    pub fn validate_points(&self) -> Result<(), ConfigError> {
        if self.tubes.iter().all(CalibrationPoint::is_valid) {
            Ok(())
        } else {
            Err(ConfigError::InvalidCalibration)
        }
    }

    /// Replace one tube's calibration
    pub fn set(&mut self, tube: usize, point: CalibrationPoint) -> Result<(), ConfigError> {
        if !point.is_valid() {
            return Err(ConfigError::InvalidCalibration);
        }
        let slot = self
            .tubes
            .get_mut(tube)
            .ok_or(ConfigError::InvalidTube)?;
        *slot = point;
        Ok(())
    }

    /// Calculate CRC32 for the data (excluding the crc field itself)
    pub fn calculate_crc(&self) -> u32 {
        let mut crc: u32 = 0xFFFF_FFFF;
        crc = crc32_update(crc, &self.magic.to_le_bytes());
        crc = crc32_update(crc, &[self.version]);
        for point in &self.tubes {
            crc = crc32_update(crc, &point.low.to_le_bytes());
            crc = crc32_update(crc, &point.high.to_le_bytes());
        }
        !crc
    }

    /// Update the CRC field
    pub fn update_crc(&mut self) {
        self.crc = self.calculate_crc();
    }

    /// Verify the CRC is correct
    pub fn verify_crc(&self) -> bool {
        self.crc == self.calculate_crc()
    }
}

/// CRC32 update (IEEE 802.3, reflected polynomial)
fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    data.iter().fold(crc, |crc, &byte| {
        (0..8).fold(crc ^ byte as u32, |crc, _| {
            if crc & 1 != 0 {
                (crc >> 1) ^ POLY
            } else {
                crc >> 1
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_check_value() {
        // Standard check value for "123456789"
        assert_eq!(!crc32_update(0xFFFF_FFFF, b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_default_is_valid() {
        let data = CalibrationData::default();
        assert!(data.is_valid());
        assert!(data.verify_crc());
        assert_eq!(data.validate_points(), Ok(()));
    }

    #[test]
    fn test_crc_detects_modification() {
        let mut data = CalibrationData::new();
        data.set(3, CalibrationPoint::new(1000, 50_000).unwrap())
            .unwrap();
        assert!(!data.verify_crc());

        data.update_crc();
        assert!(data.verify_crc());

        data.tubes[3].high = 50_001;
        assert!(!data.verify_crc());
    }

    #[test]
    fn test_set_rejects_bad_points() {
        let mut data = CalibrationData::new();
        let inverted = CalibrationPoint { low: 9, high: 1 };
        assert_eq!(data.set(0, inverted), Err(ConfigError::InvalidCalibration));
        assert_eq!(
            data.set(N_TUBES, CalibrationPoint::FULL_RANGE),
            Err(ConfigError::InvalidTube)
        );

        data.tubes[5] = inverted;
        assert_eq!(data.validate_points(), Err(ConfigError::InvalidCalibration));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_postcard_roundtrip_fits_buffer() {
        let mut data = CalibrationData::new();
        for tube in 0..N_TUBES {
            data.set(tube, CalibrationPoint::new(60_000, 65_535).unwrap())
                .unwrap();
        }
        data.update_crc();

        let mut buffer = [0u8; MAX_CALIBRATION_SIZE];
        let bytes = postcard::to_slice(&data, &mut buffer).unwrap();
        let decoded: CalibrationData = postcard::from_bytes(bytes).unwrap();
        assert_eq!(decoded, data);
        assert!(decoded.verify_crc());
    }
}
