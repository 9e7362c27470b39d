//! Configuration type definitions

use tubesync_hal::LinkConfig;

use crate::duty::PwmBits;
use crate::hands::N_HANDS;
use crate::render::HandParams;
use crate::time::ZoneConfig;
use crate::{N_TUBES, N_TUBES_HALF};

/// Highest GPIO number on the RP2040
pub const MAX_GPIO: u8 = 29;

/// Default slot-to-pin mapping
///
/// GPIO 23-25 are taken by the board (SMPS mode, VBUS sense, LED), so the
/// last slot jumps to GPIO 26.
pub const DEFAULT_PIN_MAP: [u8; N_TUBES] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 26,
];

/// Default slot-to-tube mapping (identity)
pub const DEFAULT_TUBE_MAP: [u8; N_TUBES] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23,
];

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// PWM bit depth outside 2..=15
    InvalidBitDepth,
    /// Hand mask above 0b111
    InvalidHandMask,
    /// Calibration point with low > high
    InvalidCalibration,
    /// Tube map is not a permutation of 0..24
    InvalidTubeMap,
    /// Tube index outside 0..24
    InvalidTube,
    /// Pin map repeats a pin, uses the link pin or exceeds the GPIO range
    InvalidPinMap,
}

/// Controller role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Keeps time, renders all tubes, transmits the far half
    #[default]
    Primary,
    /// Receives and displays the far half
    Secondary,
}

impl Role {
    /// Slots driven by this controller's own PWM bank
    pub const fn local_slots(self) -> core::ops::Range<usize> {
        match self {
            Role::Primary => 0..N_TUBES_HALF,
            Role::Secondary => N_TUBES_HALF..N_TUBES,
        }
    }
}

/// Check that a tube map is a permutation of `0..N_TUBES`
pub fn validate_tube_map(map: &[u8; N_TUBES]) -> Result<(), ConfigError> {
    let mut seen = [false; N_TUBES];
    for &tube in map {
        let slot = seen
            .get_mut(tube as usize)
            .ok_or(ConfigError::InvalidTubeMap)?;
        if *slot {
            return Err(ConfigError::InvalidTubeMap);
        }
        *slot = true;
    }
    Ok(())
}

/// Check that a pin map uses distinct GPIOs and leaves the link pin free
pub fn validate_pin_map(map: &[u8; N_TUBES], link_pin: u8) -> Result<(), ConfigError> {
    let mut seen = [false; MAX_GPIO as usize + 1];
    for &pin in map {
        if pin == link_pin {
            return Err(ConfigError::InvalidPinMap);
        }
        let slot = seen
            .get_mut(pin as usize)
            .ok_or(ConfigError::InvalidPinMap)?;
        if *slot {
            return Err(ConfigError::InvalidPinMap);
        }
        *slot = true;
    }
    Ok(())
}

/// Boot-time display configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayConfig {
    /// Primary or secondary
    pub role: Role,
    /// PWM resolution (must match on both controllers)
    pub pwm_bits: PwmBits,
    /// Inter-controller link
    pub link: LinkConfig,
    /// Time zone rule
    pub zone: ZoneConfig,
    /// Bell shape per hand (second, minute, hour)
    pub hands: [HandParams; N_HANDS],
    /// Slot to logical tube
    pub tube_map: [u8; N_TUBES],
    /// Slot to GPIO
    pub pin_map: [u8; N_TUBES],
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            role: Role::Primary,
            pwm_bits: PwmBits::DEFAULT,
            link: LinkConfig::default(),
            zone: ZoneConfig::default(),
            hands: HandParams::DEFAULTS,
            tube_map: DEFAULT_TUBE_MAP,
            pin_map: DEFAULT_PIN_MAP,
        }
    }
}

impl DisplayConfig {
    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_tube_map(&self.tube_map)?;
        validate_pin_map(&self.pin_map, self.link.pin)
    }
}
