//! Fixed-point arithmetic for the rendering engine
//!
//! Uses unsigned Q16.16 throughout. The RP2040 has no FPU, so every
//! per-tube computation stays in integer math; floats are only accepted
//! at the host boundary and converted once.

use core::ops::{Add, Sub};

/// Unsigned Q16.16 fixed-point number
///
/// Range: 0.0 to approximately 65535.99998
/// Resolution: approximately 0.000015
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UFixed32(pub u32);

impl UFixed32 {
    /// Zero value
    pub const ZERO: Self = Self(0);

    /// One (1.0)
    pub const ONE: Self = Self(1 << 16);

    /// Largest representable value
    pub const MAX: Self = Self(u32::MAX);

    /// Fractional bits (16)
    pub const FRAC_BITS: u32 = 16;

    /// Create from a whole integer
    #[inline]
    pub const fn from_int(n: u16) -> Self {
        Self((n as u32) << Self::FRAC_BITS)
    }

    /// Create from a scaled integer (value × 1000)
    ///
    /// Config values such as "0.6" are parsed into 600 first.
    #[inline]
    pub const fn from_scaled_1000(n: u32) -> Self {
        Self((((n as u64) << Self::FRAC_BITS) / 1000) as u32)
    }

    /// Convert to scaled integer (value × 1000), truncating
    #[inline]
    pub const fn to_scaled_1000(self) -> u32 {
        ((self.0 as u64 * 1000) >> Self::FRAC_BITS) as u32
    }

    /// Convert to whole integer (truncates fractional part)
    #[inline]
    pub const fn to_int(self) -> u16 {
        (self.0 >> Self::FRAC_BITS) as u16
    }

    /// Get the raw u32 representation
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Create from raw u32 representation
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Multiply two values without overflowing 32 bits
    ///
    /// See [`safe_mul`].
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn mul(self, other: Self) -> Self {
        Self(safe_mul(self.0, other.0))
    }

    /// Smaller of two values
    #[inline]
    pub fn min(self, other: Self) -> Self {
        if other.0 < self.0 {
            other
        } else {
            self
        }
    }

    /// Saturating subtraction (clamps at zero)
    #[inline]
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for UFixed32 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Sub for UFixed32 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        self.saturating_sub(other)
    }
}

/// Multiply two Q16.16 values using only 32-bit products
///
/// Operands of 1.0 or more are pre-shifted right, and the final shift is
/// reduced by the same amount. Operands below 1.0 keep full precision.
/// A product that still does not fit saturates to `u32::MAX`.
pub fn safe_mul(a: u32, b: u32) -> u32 {
    let one = UFixed32::ONE.0;
    let mut a = a;
    let mut b = b;
    let mut shift = UFixed32::FRAC_BITS;

    while a >= one && shift > 0 {
        a >>= 1;
        shift -= 1;
    }
    while b >= one && shift > 0 {
        b >>= 1;
        shift -= 1;
    }

    match a.checked_mul(b) {
        Some(product) => product >> shift,
        None => u32::MAX,
    }
}

/// Gaussian cutoff: `gaussian(x)` is zero from here on (4.0)
pub const GAUSS_LIMIT: u32 = 4 << 16;

/// Range-reduction threshold for `exp_neg` (0.25)
const EXP_REDUCED_LIMIT: u32 = 1 << 14;

/// Compute e^(-x) for Q16.16 `x`
///
/// The input is halved until it lies in [0, 0.25), approximated with the
/// second-order Taylor series `1 - x + x²/2`, then squared back up once per
/// halving.
pub fn exp_neg(x: u32) -> u32 {
    let mut x = x;
    let mut scale = 0u32;
    while x >= EXP_REDUCED_LIMIT {
        x >>= 1;
        scale += 1;
    }

    // x < 2^14, so x*x < 2^28; the /2 folds into the shift
    let mut result = UFixed32::ONE.0 - x + ((x * x) >> 17);

    for _ in 0..scale {
        result = safe_mul(result, result);
    }
    result
}

/// Compute e^(-x²) for Q16.16 `x`
///
/// Returns exactly 1.0 at zero and 0 at or beyond [`GAUSS_LIMIT`].
pub fn gaussian(x: u32) -> u32 {
    if x >= GAUSS_LIMIT {
        return 0;
    }
    exp_neg(safe_mul(x, x))
}

/// Host-boundary input for the fixed-point primitives
///
/// Integers are taken as raw Q16.16. Floats are scaled by 65536 and
/// truncated on the way in, and divided by 65536 on the way out.
pub trait FixedInput: Copy {
    /// Convert to raw Q16.16
    fn to_raw(self) -> u32;

    /// Convert a raw Q16.16 result back into this representation
    fn from_raw(raw: u32) -> Self;
}

impl FixedInput for u32 {
    #[inline]
    fn to_raw(self) -> u32 {
        self
    }

    #[inline]
    fn from_raw(raw: u32) -> Self {
        raw
    }
}

impl FixedInput for f32 {
    #[inline]
    fn to_raw(self) -> u32 {
        // `as` saturates: negatives become 0
        (self * 65536.0) as u32
    }

    #[inline]
    fn from_raw(raw: u32) -> Self {
        raw as f32 / 65536.0
    }
}

impl FixedInput for UFixed32 {
    #[inline]
    fn to_raw(self) -> u32 {
        self.0
    }

    #[inline]
    fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

/// `exp_neg` accepting raw or floating input
pub fn fixed_exp_neg<T: FixedInput>(x: T) -> T {
    T::from_raw(exp_neg(x.to_raw()))
}

/// `gaussian` accepting raw or floating input
pub fn fixed_gaussian<T: FixedInput>(x: T) -> T {
    T::from_raw(gaussian(x.to_raw()))
}
