//! Buffers shared by the pipeline stages

use tubesync_protocol::FRAME_WORDS;

use crate::config::{
    validate_pin_map, validate_tube_map, CalibrationData, ConfigError, DisplayConfig,
};
use crate::duty::{CalibrationPoint, PwmBits};
use crate::fixed::UFixed32;
use crate::hands::{Hand, HandPositions, N_HANDS};
use crate::render::HandParams;
use crate::time::{LocalAdjustment, Timestamp};
use crate::N_TUBES;

use super::stage::Stage;

/// All per-frame buffers of one controller
///
/// Per-tube buffers (`raw`, `calibration`, `duty`) are indexed by logical
/// tube. `tube_map` and `pin_map` translate physical slots into tubes and
/// GPIOs. Setters validate their input and leave the state unchanged on
/// error.
#[derive(Debug, Clone)]
pub struct RenderState {
    pub(crate) timestamp: Timestamp,
    pub(crate) adjustment: LocalAdjustment,
    pub(crate) hand_params: [HandParams; N_HANDS],
    pub(crate) hand_positions: HandPositions,
    pub(crate) raw: [UFixed32; N_TUBES],
    pub(crate) calibration: [CalibrationPoint; N_TUBES],
    pub(crate) duty: [u16; N_TUBES],
    pub(crate) pwm_bits: PwmBits,
    pub(crate) tube_map: [u8; N_TUBES],
    pub(crate) pin_map: [u8; N_TUBES],
    pub(crate) link_pin: u8,
    pub(crate) frame: [u16; FRAME_WORDS],
    pub(crate) hand_stage: Stage<HandPositions>,
    pub(crate) raw_stage: Stage<[UFixed32; N_TUBES]>,
    pub(crate) duty_stage: Stage<[u16; N_TUBES]>,
}

impl RenderState {
    /// Create state from a validated configuration
    pub fn new(config: &DisplayConfig) -> Self {
        Self {
            timestamp: Timestamp::default(),
            adjustment: LocalAdjustment::from_minutes(config.zone.utc_offset_minutes),
            hand_params: config.hands,
            hand_positions: HandPositions::default(),
            raw: [UFixed32::ZERO; N_TUBES],
            calibration: [CalibrationPoint::FULL_RANGE; N_TUBES],
            duty: [0; N_TUBES],
            pwm_bits: config.pwm_bits,
            tube_map: config.tube_map,
            pin_map: config.pin_map,
            link_pin: config.link.pin,
            frame: [0; FRAME_WORDS],
            hand_stage: Stage::Computed,
            raw_stage: Stage::Computed,
            duty_stage: Stage::Computed,
        }
    }

    /// Last time snapshot
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Local-time offset used for the last frame
    pub fn adjustment(&self) -> LocalAdjustment {
        self.adjustment
    }

    /// Bell shape of one hand
    pub fn hand_params(&self, hand: Hand) -> HandParams {
        self.hand_params[hand.index()]
    }

    /// Replace the bell shape of one hand
    pub fn set_hand_params(&mut self, hand: Hand, params: HandParams) {
        self.hand_params[hand.index()] = params;
    }

    /// Hand positions of the last frame
    pub fn hand_positions(&self) -> HandPositions {
        self.hand_positions
    }

    /// Raw brightness per tube
    pub fn raw(&self) -> &[UFixed32; N_TUBES] {
        &self.raw
    }

    /// Duty value per tube
    pub fn duty(&self) -> &[u16; N_TUBES] {
        &self.duty
    }

    /// Calibration of one tube
    pub fn calibration(&self, tube: usize) -> Option<CalibrationPoint> {
        self.calibration.get(tube).copied()
    }

    /// Replace the calibration of one tube
    pub fn set_calibration(
        &mut self,
        tube: usize,
        point: CalibrationPoint,
    ) -> Result<(), ConfigError> {
        if !point.is_valid() {
            return Err(ConfigError::InvalidCalibration);
        }
        let slot = self
            .calibration
            .get_mut(tube)
            .ok_or(ConfigError::InvalidTube)?;
        *slot = point;
        Ok(())
    }

    /// Adopt a whole calibration table
    pub fn load_calibration(&mut self, data: &CalibrationData) -> Result<(), ConfigError> {
        data.validate_points()?;
        self.calibration = data.tubes;
        Ok(())
    }

    /// PWM bit depth
    pub fn pwm_bits(&self) -> PwmBits {
        self.pwm_bits
    }

    /// Change the PWM bit depth
    ///
    /// The PWM bank is reconfigured on the next paint.
    pub fn set_pwm_bits(&mut self, bits: u8) -> Result<(), ConfigError> {
        self.pwm_bits = PwmBits::new(bits)?;
        Ok(())
    }

    /// Slot-to-tube map
    pub fn tube_map(&self) -> &[u8; N_TUBES] {
        &self.tube_map
    }

    /// Replace the slot-to-tube map; must be a permutation
    pub fn set_tube_map(&mut self, map: [u8; N_TUBES]) -> Result<(), ConfigError> {
        validate_tube_map(&map)?;
        self.tube_map = map;
        Ok(())
    }

    /// Slot-to-GPIO map
    pub fn pin_map(&self) -> &[u8; N_TUBES] {
        &self.pin_map
    }

    /// Replace the slot-to-GPIO map
    pub fn set_pin_map(&mut self, map: [u8; N_TUBES]) -> Result<(), ConfigError> {
        validate_pin_map(&map, self.link_pin)?;
        self.pin_map = map;
        Ok(())
    }

    /// Words of the last encoded or received frame
    pub fn frame(&self) -> &[u16; FRAME_WORDS] {
        &self.frame
    }

    /// Pin hand positions instead of deriving them from time
    pub fn override_hand_positions(&mut self, positions: Option<HandPositions>) {
        self.hand_stage = positions.into();
    }

    /// Pin raw brightness instead of rendering hands
    pub fn override_raw(&mut self, raw: Option<[UFixed32; N_TUBES]>) {
        self.raw_stage = raw.into();
    }

    /// Pin duty values instead of mapping raw brightness
    pub fn override_duty(&mut self, duty: Option<[u16; N_TUBES]>) {
        self.duty_stage = duty.into();
    }

    /// Hand position stage
    pub fn hand_stage(&self) -> &Stage<HandPositions> {
        &self.hand_stage
    }

    /// Raw brightness stage
    pub fn raw_stage(&self) -> &Stage<[UFixed32; N_TUBES]> {
        &self.raw_stage
    }

    /// Duty stage
    pub fn duty_stage(&self) -> &Stage<[u16; N_TUBES]> {
        &self.duty_stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_leave_state_unchanged_on_error() {
        let mut state = RenderState::new(&DisplayConfig::default());

        assert_eq!(state.set_pwm_bits(1), Err(ConfigError::InvalidBitDepth));
        assert_eq!(state.pwm_bits(), PwmBits::DEFAULT);

        let bad = CalibrationPoint { low: 10, high: 5 };
        assert_eq!(
            state.set_calibration(0, bad),
            Err(ConfigError::InvalidCalibration)
        );
        assert_eq!(state.calibration(0), Some(CalibrationPoint::FULL_RANGE));
        assert_eq!(
            state.set_calibration(N_TUBES, CalibrationPoint::FULL_RANGE),
            Err(ConfigError::InvalidTube)
        );

        let mut map = *state.tube_map();
        map[0] = 1;
        assert_eq!(state.set_tube_map(map), Err(ConfigError::InvalidTubeMap));
        assert_eq!(state.tube_map()[0], 0);
    }

    #[test]
    fn test_load_calibration() {
        let mut state = RenderState::new(&DisplayConfig::default());
        let mut data = CalibrationData::new();
        data.set(7, CalibrationPoint::new(100, 200).unwrap()).unwrap();

        state.load_calibration(&data).unwrap();
        assert_eq!(state.calibration(7), CalibrationPoint::new(100, 200).ok());

        data.tubes[2] = CalibrationPoint { low: 2, high: 1 };
        assert_eq!(
            state.load_calibration(&data),
            Err(ConfigError::InvalidCalibration)
        );
        assert_eq!(state.calibration(2), Some(CalibrationPoint::FULL_RANGE));
    }

    #[test]
    fn test_overrides() {
        let mut state = RenderState::new(&DisplayConfig::default());
        assert!(!state.raw_stage().is_overridden());

        state.override_raw(Some([UFixed32::ONE; N_TUBES]));
        assert_eq!(
            state.raw_stage().overridden(),
            Some(&[UFixed32::ONE; N_TUBES])
        );

        state.override_raw(None);
        assert_eq!(*state.raw_stage(), Stage::Computed);
    }
}
