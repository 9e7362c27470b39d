//! Calibrated duty-cycle mapping
//!
//! Every tube has its own usable duty range: `low` is the level where the
//! tube just goes dark and `high` where it reaches full brightness. Raw
//! brightness interpolates linearly between them in 16-bit space and is
//! then reduced to the configured PWM bit depth.

use crate::config::ConfigError;
use crate::fixed::{safe_mul, UFixed32};

/// PWM resolution in bits
///
/// Valid depths are 2..=15: the link carries duty values in 15 bits, and
/// the counter wraps at `2^bits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmBits(u8);

impl PwmBits {
    /// Smallest accepted depth
    pub const MIN: u8 = 2;
    /// Largest accepted depth
    pub const MAX: u8 = 15;
    /// Default depth (about 61 kHz at 125 MHz)
    pub const DEFAULT: Self = Self(11);

    /// Validate a bit depth
    pub fn new(bits: u8) -> Result<Self, ConfigError> {
        if (Self::MIN..=Self::MAX).contains(&bits) {
            Ok(Self(bits))
        } else {
            Err(ConfigError::InvalidBitDepth)
        }
    }

    /// Depth in bits
    pub const fn get(self) -> u8 {
        self.0
    }

    /// PWM counter wrap value for this depth
    pub const fn wrap(self) -> u16 {
        1 << self.0
    }
}

impl Default for PwmBits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Per-tube calibration in 16-bit duty space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationPoint {
    /// Duty at raw brightness 0
    pub low: u16,
    /// Duty at raw brightness 1.0
    pub high: u16,
}

impl CalibrationPoint {
    /// Uncalibrated tube: full 16-bit range
    pub const FULL_RANGE: Self = Self {
        low: 0,
        high: u16::MAX,
    };

    /// Validate a calibration point (`low <= high`)
    pub fn new(low: u16, high: u16) -> Result<Self, ConfigError> {
        if low > high {
            return Err(ConfigError::InvalidCalibration);
        }
        Ok(Self { low, high })
    }

    /// Whether the stored values satisfy `low <= high`
    pub const fn is_valid(&self) -> bool {
        self.low <= self.high
    }
}

impl Default for CalibrationPoint {
    fn default() -> Self {
        Self::FULL_RANGE
    }
}

/// Map raw brightness to a duty value at `bits` depth
///
/// Raw values above 1.0 are treated as 1.0. The result is always below
/// `2^bits`.
pub fn duty_for(raw: UFixed32, calibration: CalibrationPoint, bits: PwmBits) -> u16 {
    let raw = raw.min(UFixed32::ONE).raw();
    let low = calibration.low as u32;
    let span = (calibration.high as u32).saturating_sub(low);

    let interpolated = (low + safe_mul(span, raw)).min(u16::MAX as u32);
    (interpolated >> (16 - bits.get() as u32)) as u16
}
