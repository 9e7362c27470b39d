//! Gaussian hand rendering
//!
//! Each hand is drawn as a bell `A·e^(-(k·d)²)` over the ring, where `d`
//! is the shorter-arc distance from the hand to a tube measured in tube
//! spacings. Overlapping hands are composited by taking the brighter
//! contribution per tube, so two hands at the same place do not sum past
//! either one's amplitude.

use crate::config::ConfigError;
use crate::fixed::{gaussian, safe_mul, UFixed32, GAUSS_LIMIT};
use crate::hands::{Hand, HandPositions, N_HANDS};
use crate::N_TUBES;

/// Shape of one hand's bell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandParams {
    /// Width factor per tube spacing; larger is narrower
    pub k: UFixed32,
    /// Peak brightness before clamping to 1.0
    pub amplitude: UFixed32,
}

impl HandParams {
    /// Create hand parameters
    pub const fn new(k: UFixed32, amplitude: UFixed32) -> Self {
        Self { k, amplitude }
    }

    /// Defaults for second, minute and hour hands
    ///
    /// The second hand is narrow and dim, the hour hand wide and bright.
    pub const DEFAULTS: [HandParams; N_HANDS] = [
        HandParams::new(UFixed32::from_scaled_1000(1500), UFixed32::from_scaled_1000(600)),
        HandParams::new(UFixed32::from_scaled_1000(1000), UFixed32::from_scaled_1000(800)),
        HandParams::new(UFixed32::from_scaled_1000(600), UFixed32::ONE),
    ];
}

/// Selection of hands to draw (bit 0 second, bit 1 minute, bit 2 hour)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandMask(u8);

impl HandMask {
    /// Draw every hand
    pub const ALL: Self = Self(0b111);

    /// Draw nothing
    pub const NONE: Self = Self(0);

    /// Build a mask from its bit pattern; values above 7 are rejected
    pub fn from_bits(bits: u8) -> Result<Self, ConfigError> {
        if bits > Self::ALL.0 {
            return Err(ConfigError::InvalidHandMask);
        }
        Ok(Self(bits))
    }

    /// Raw bit pattern
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether a hand is selected
    pub const fn contains(self, hand: Hand) -> bool {
        self.0 & hand.mask_bit() != 0
    }
}

impl Default for HandMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Composite one hand into `raw`
pub fn draw_hand(raw: &mut [UFixed32; N_TUBES], position: u16, params: HandParams) {
    let ring = (N_TUBES as u32) << 16;
    // Hand position in tube units, Q16.16
    let hand_x = position as u32 * N_TUBES as u32;

    for (tube, level) in raw.iter_mut().enumerate() {
        let tube_x = (tube as u32) << 16;
        let delta = tube_x.abs_diff(hand_x);
        let arc = delta.min(ring - delta);

        let x = safe_mul(arc, params.k.raw());
        if x >= GAUSS_LIMIT {
            continue;
        }

        let contribution =
            UFixed32(safe_mul(gaussian(x), params.amplitude.raw())).min(UFixed32::ONE);
        if contribution > *level {
            *level = contribution;
        }
    }
}

/// Render the selected hands into `raw`, clearing it first
pub fn render_hands(
    raw: &mut [UFixed32; N_TUBES],
    positions: &HandPositions,
    params: &[HandParams; N_HANDS],
    mask: HandMask,
) {
    raw.fill(UFixed32::ZERO);
    for hand in Hand::ALL {
        if mask.contains(hand) {
            draw_hand(raw, positions.get(hand), params[hand.index()]);
        }
    }
}

/// Render exactly one synthetic hand into `raw`, clearing it first
pub fn render_single(raw: &mut [UFixed32; N_TUBES], position: u16, params: HandParams) {
    raw.fill(UFixed32::ZERO);
    draw_hand(raw, position, params);
}
