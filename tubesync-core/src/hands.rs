//! Hand positions from local time
//!
//! Each hand is a 16-bit fraction of a full turn. The second hand moves
//! per millisecond, the minute hand per decisecond and the hour hand per
//! second, so all three sweep smoothly.

use crate::time::{LocalAdjustment, Timestamp};

/// Number of hands
pub const N_HANDS: usize = 3;

const MS_PER_S: i64 = 1000;
const MS_PER_DS: i64 = 100;
const DS_PER_S: i64 = 10;
const DS_PER_MIN: i64 = 600;
const S_PER_HR: i64 = 3600;
const HOURS_PER_FACE: i64 = 12;

/// Full-turn denominators for each hand
const MS_PER_MIN: u32 = 60_000;
const DS_PER_HR: u32 = 36_000;
const S_PER_FACE: u32 = 43_200;

/// Clock hand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Hand {
    Second = 0,
    Minute = 1,
    Hour = 2,
}

impl Hand {
    /// All hands in index order
    pub const ALL: [Hand; N_HANDS] = [Hand::Second, Hand::Minute, Hand::Hour];

    /// Index into per-hand arrays
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Bit selecting this hand in a render mask
    pub const fn mask_bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Angular position of each hand as a fraction of a turn (0..65536 = 0..1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandPositions(pub [u16; N_HANDS]);

impl HandPositions {
    /// Position of one hand
    pub fn get(&self, hand: Hand) -> u16 {
        self.0[hand.index()]
    }

    /// Set the position of one hand
    pub fn set(&mut self, hand: Hand, position: u16) {
        self.0[hand.index()] = position;
    }
}

/// Scale `value / denom` to a 16-bit fraction of a turn
///
/// `value` is first wrapped into `[0, denom)`, so negative values and
/// whole extra turns are handled.
pub fn get_frac(value: i64, denom: u32) -> u16 {
    if denom == 0 {
        return 0;
    }
    let wrapped = value.rem_euclid(denom as i64) as u64;
    ((wrapped << 16) / denom as u64) as u16
}

/// Compute all three hand positions
///
/// Adjustment components are added unit by unit; anything that overflows
/// or underflows a unit carries into the next with floor division.
pub fn hand_positions(time: &Timestamp, adj: &LocalAdjustment) -> HandPositions {
    let total_ms = (time.second as i64 + adj.seconds as i64) * MS_PER_S
        + time.millis() as i64
        + adj.millis as i64;
    let second = get_frac(total_ms, MS_PER_MIN);

    let total_ds =
        (time.minute as i64 + adj.minutes as i64) * DS_PER_MIN + total_ms.div_euclid(MS_PER_DS);
    let minute = get_frac(total_ds, DS_PER_HR);

    // 24 h to 12 h; 12 itself stays and wraps to the top via get_frac
    let hour = time.hour as i64;
    let hour = if hour > HOURS_PER_FACE {
        hour - HOURS_PER_FACE
    } else {
        hour
    };
    let total_s = (hour + adj.hours as i64) * S_PER_HR + total_ds.div_euclid(DS_PER_S);
    let hour = get_frac(total_s, S_PER_FACE);

    HandPositions([second, minute, hour])
}
