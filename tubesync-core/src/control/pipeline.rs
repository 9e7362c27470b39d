//! Per-frame pipeline stages
//!
//! Each stage is a public method so the host can drive them one at a time;
//! [`ControlLoop`](super::ControlLoop) calls them in order once per frame.

use tubesync_hal::{ClockDriver, PwmBank, WordRx, WordTx};
use tubesync_protocol::{Frame, FrameDecoder, FrameError, DATA_WORDS};

use crate::config::{DisplayConfig, Role};
use crate::duty::{duty_for, PwmBits};
use crate::hands::{hand_positions, HandPositions};
use crate::render::{render_hands, render_single, HandMask, HandParams};
use crate::state::{RenderState, Stage};
use crate::time::{TimeSource, Timestamp};
use crate::N_TUBES_HALF;

use super::flags::CancelFlag;
use super::stats::LinkStats;

/// Rendering and synchronization pipeline of one controller
pub struct Pipeline<C, L, P> {
    role: Role,
    clock: C,
    link: L,
    pwm: P,
    time: TimeSource,
    state: RenderState,
    decoder: FrameDecoder,
    /// Bit depth the PWM bank is currently configured for
    applied_bits: Option<PwmBits>,
}

impl<C, L, P> Pipeline<C, L, P>
where
    C: ClockDriver,
    P: PwmBank,
{
    /// Build a pipeline from a validated configuration
    pub fn new(config: &DisplayConfig, clock: C, link: L, pwm: P) -> Self {
        Self {
            role: config.role,
            clock,
            link,
            pwm,
            time: TimeSource::new(config.zone),
            state: RenderState::new(config),
            decoder: FrameDecoder::new(),
            applied_bits: None,
        }
    }

    /// Controller role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Render buffers
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    /// Render buffers, for overrides and configuration
    pub fn state_mut(&mut self) -> &mut RenderState {
        &mut self.state
    }

    /// Time source
    pub fn time(&self) -> &TimeSource {
        &self.time
    }

    /// Re-align the µs counter to the RTC second edge
    pub fn resync_time(&mut self) {
        self.time.resync(&mut self.clock);
    }

    /// Clock driver
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Link driver
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// PWM driver
    pub fn pwm_mut(&mut self) -> &mut P {
        &mut self.pwm
    }

    /// Current RTC second, read directly from the clock
    pub fn calendar_second(&mut self) -> u8 {
        self.clock.read_calendar().second
    }

    /// Take a time snapshot and refresh the local-time offset
    pub fn update_time(&mut self) -> Timestamp {
        self.state.timestamp = self.time.update(&mut self.clock);
        self.state.adjustment = self.time.apply_local_adjustment();
        self.state.timestamp
    }

    /// Derive hand positions from the snapshot, unless overridden
    pub fn update_hand_positions(&mut self) -> HandPositions {
        self.state.hand_positions = match self.state.hand_stage {
            Stage::Overridden(positions) => positions,
            Stage::Computed => hand_positions(&self.state.timestamp, &self.state.adjustment),
        };
        self.state.hand_positions
    }

    /// Render the selected hands into raw brightness, unless overridden
    pub fn render(&mut self, mask: HandMask) {
        match self.state.raw_stage {
            Stage::Overridden(raw) => self.state.raw = raw,
            Stage::Computed => render_hands(
                &mut self.state.raw,
                &self.state.hand_positions,
                &self.state.hand_params,
                mask,
            ),
        }
    }

    /// Render one synthetic hand into raw brightness
    pub fn render_single(&mut self, position: u16, params: HandParams) {
        render_single(&mut self.state.raw, position, params);
    }

    /// Map raw brightness to duty values, unless overridden
    pub fn update_duty(&mut self) {
        match self.state.duty_stage {
            Stage::Overridden(duty) => self.state.duty = duty,
            Stage::Computed => {
                let bits = self.state.pwm_bits;
                for ((duty, &raw), &calibration) in self
                    .state
                    .duty
                    .iter_mut()
                    .zip(self.state.raw.iter())
                    .zip(self.state.calibration.iter())
                {
                    *duty = duty_for(raw, calibration, bits);
                }
            }
        }
    }

    /// Build the frame for the secondary's half from the duty buffer
    pub fn encode_frame(&mut self) -> Result<(), FrameError> {
        let mut data = [0u16; DATA_WORDS];
        for (i, word) in data.iter_mut().enumerate() {
            let tube = self.state.tube_map[i + N_TUBES_HALF] as usize;
            *word = self.state.duty[tube];
        }
        let frame = Frame::new(self.state.pwm_bits.get() as u16, data)?;
        self.state.frame = frame.encode();
        Ok(())
    }

    /// Drive this controller's half of the tubes
    ///
    /// Reconfigures the PWM bank first if the bit depth changed.
    pub fn paint(&mut self) {
        let bits = self.state.pwm_bits;
        if self.applied_bits != Some(bits) {
            self.pwm.set_wrap_bits(bits.get());
            self.applied_bits = Some(bits);
        }

        for slot in self.role.local_slots() {
            let pin = self.state.pin_map[slot];
            let tube = self.state.tube_map[slot] as usize;
            self.pwm.set_level(pin, self.state.duty[tube]);
        }
    }

    /// Store a received frame's duty values and bit depth
    fn apply_frame(&mut self, frame: &Frame) {
        for (i, &word) in frame.data.iter().enumerate() {
            let tube = self.state.tube_map[i + N_TUBES_HALF] as usize;
            self.state.duty[tube] = word;
        }
        // Out-of-range depth is ignored; the duty values still apply
        if let Some(bits) = u8::try_from(frame.metadata)
            .ok()
            .and_then(|bits| PwmBits::new(bits).ok())
        {
            self.state.pwm_bits = bits;
        }
        self.state.frame = frame.encode();
    }
}

impl<C, L, P> Pipeline<C, L, P>
where
    C: ClockDriver,
    L: WordTx,
    P: PwmBank,
{
    /// Transmit the last encoded frame
    pub fn send_frame(&mut self) -> Result<(), L::Error> {
        self.link.write_words(&self.state.frame)
    }
}

impl<C, L, P> Pipeline<C, L, P>
where
    C: ClockDriver,
    L: WordRx,
    P: PwmBank,
{
    /// Block until a valid frame is received and applied
    ///
    /// Rejected words and link errors are counted in `stats` and decoding
    /// continues. Returns `false` if `cancel` was raised first; the flag is
    /// polled before every word.
    pub fn receive_frame<F: CancelFlag + ?Sized>(&mut self, cancel: &F, stats: &LinkStats) -> bool {
        while !cancel.is_cancelled() {
            let word = match self.link.try_read_word() {
                Ok(Some(word)) => word,
                Ok(None) => continue,
                Err(_) => {
                    stats.count_rx_error();
                    continue;
                }
            };

            match self.decoder.feed(word) {
                Ok(Some(frame)) => {
                    self.apply_frame(&frame);
                    return true;
                }
                Ok(None) => {}
                Err(_) => stats.count_rx_error(),
            }
        }
        // A cancelled partial frame must not be completed by the next call
        self.decoder.reset();
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PIN_MAP;
    use crate::control::LoopControl;
    use crate::fixed::UFixed32;
    use crate::hands::Hand;
    use crate::testing::{MockClock, MockLink, MockPwm};
    use crate::N_TUBES;
    use tubesync_hal::Calendar;
    use tubesync_protocol::{FRAME_WORDS, MARKER_BIT};

    type TestPipeline<'a> = Pipeline<MockClock, MockLink<'a>, MockPwm>;

    fn pipeline<'a>(role: Role) -> TestPipeline<'a> {
        let config = DisplayConfig {
            role,
            ..DisplayConfig::default()
        };
        // 2024-01-15 08:15:30 UTC = 03:15:30 EST
        let clock = MockClock::new(Calendar::new(2024, 1, 15, 8, 15, 29), 500_000, 0);
        Pipeline::new(&config, clock, MockLink::new(), MockPwm::new())
    }

    #[test]
    fn test_primary_stages_in_order() {
        let mut p = pipeline(Role::Primary);
        let ts = p.update_time();
        assert_eq!((ts.hour, ts.minute, ts.second), (8, 15, 30));
        assert_eq!(p.state().adjustment().hours, -5);

        let positions = p.update_hand_positions();
        // Local 03:15:30: hour hand just past a quarter turn
        assert!((17_700..17_900).contains(&positions.get(Hand::Hour)));

        p.render(HandMask::ALL);
        assert!(p.state().raw().iter().any(|&level| level > UFixed32::ZERO));

        p.update_duty();
        assert!(p.state().duty().iter().all(|&duty| duty < 2048));

        p.encode_frame().unwrap();
        let frame = *p.state().frame();
        assert_eq!(frame[0], MARKER_BIT | 11);
        assert_eq!(&frame[1..13], &p.state().duty()[12..24]);

        p.send_frame().unwrap();
        assert_eq!(p.link_mut().last_sent_frame(), Some(frame));
    }

    #[test]
    fn test_paint_drives_local_half_only() {
        let mut p = pipeline(Role::Primary);
        let mut duty = [0u16; N_TUBES];
        for (tube, value) in duty.iter_mut().enumerate() {
            *value = 100 + tube as u16;
        }
        p.state_mut().override_duty(Some(duty));
        p.update_duty();
        p.paint();

        let pwm = p.pwm_mut();
        assert_eq!(pwm.wrap_bits, Some(11));
        for slot in 0..12 {
            assert_eq!(pwm.levels[DEFAULT_PIN_MAP[slot] as usize], 100 + slot as u16);
        }
        // GPIO 26 belongs to slot 23, which the secondary drives
        assert_eq!(pwm.levels[26], 0);
    }

    #[test]
    fn test_tube_map_reorders_frame() {
        let mut p = pipeline(Role::Primary);
        let mut map = *p.state().tube_map();
        map.swap(12, 23);
        p.state_mut().set_tube_map(map).unwrap();

        let mut duty = [0u16; N_TUBES];
        duty[23] = 777;
        p.state_mut().override_duty(Some(duty));
        p.update_duty();
        p.encode_frame().unwrap();
        assert_eq!(p.state().frame()[1], 777);
    }

    #[test]
    fn test_overridden_stages_skip_computation() {
        let mut p = pipeline(Role::Primary);
        p.update_time();

        let pinned = HandPositions([1, 2, 3]);
        p.state_mut().override_hand_positions(Some(pinned));
        assert_eq!(p.update_hand_positions(), pinned);

        let raw = [UFixed32::ONE; N_TUBES];
        p.state_mut().override_raw(Some(raw));
        p.render(HandMask::NONE);
        assert_eq!(p.state().raw(), &raw);

        p.state_mut().override_raw(None);
        p.render(HandMask::NONE);
        assert!(p.state().raw().iter().all(|&level| level == UFixed32::ZERO));
    }

    #[test]
    fn test_overridden_duty_with_marker_bit_is_rejected() {
        let mut p = pipeline(Role::Primary);
        p.state_mut().override_duty(Some([0x8000; N_TUBES]));
        p.update_duty();
        assert_eq!(p.encode_frame(), Err(FrameError::DataOverflow));
    }

    #[test]
    fn test_secondary_applies_received_frame() {
        let mut p = pipeline(Role::Secondary);
        let stats = LinkStats::new();
        let mut data = [0u16; DATA_WORDS];
        data[0] = 1234;
        data[11] = 4321;
        let frame = Frame::new(12, data).unwrap();

        p.link_mut().queue_rx(&[0x0042]);
        p.link_mut().queue_rx(&frame.encode());
        assert!(p.receive_frame(&LoopControl::new(), &stats));

        assert_eq!(stats.rx_errors(), 1);
        assert_eq!(p.state().duty()[12], 1234);
        assert_eq!(p.state().duty()[23], 4321);
        assert_eq!(p.state().pwm_bits().get(), 12);
        assert_eq!(p.state().frame().len(), FRAME_WORDS);

        p.paint();
        let pwm = p.pwm_mut();
        assert_eq!(pwm.wrap_bits, Some(12));
        assert_eq!(pwm.levels[12], 1234);
        assert_eq!(pwm.levels[26], 4321);
    }

    #[test]
    fn test_invalid_bit_depth_metadata_ignored() {
        let mut p = pipeline(Role::Secondary);
        let stats = LinkStats::new();
        let frame = Frame::new(40, [9; DATA_WORDS]).unwrap();

        p.link_mut().queue_rx(&frame.encode());
        assert!(p.receive_frame(&LoopControl::new(), &stats));
        assert_eq!(p.state().pwm_bits(), PwmBits::DEFAULT);
        assert_eq!(p.state().duty()[12], 9);
    }

    #[test]
    fn test_receive_returns_on_cancel() {
        let control = LoopControl::new();
        let mut p: TestPipeline<'_> = pipeline(Role::Secondary);
        let stats = LinkStats::new();

        // Half a frame, then the link goes quiet and the host cancels
        let frame = Frame::new(11, [5; DATA_WORDS]).unwrap();
        p.link_mut().queue_rx(&frame.encode()[..7]);
        p.link_mut().cancel_when_drained(&control);

        assert!(!p.receive_frame(&control, &stats));
        assert_eq!(stats.rx_errors(), 0);
        assert_eq!(p.state().duty()[12], 0);
    }

    #[test]
    fn test_cancelled_partial_frame_is_discarded() {
        let control = LoopControl::new();
        let mut p: TestPipeline<'_> = pipeline(Role::Secondary);
        let stats = LinkStats::new();
        let words = Frame::new(11, [5; DATA_WORDS]).unwrap().encode();

        p.link_mut().queue_rx(&words[..7]);
        p.link_mut().cancel_when_drained(&control);
        assert!(!p.receive_frame(&control, &stats));

        // The rest of the frame arrives after the cancel is cleared; without
        // its marker every word is spurious
        control.finish();
        p.link_mut().queue_rx(&words[7..]);
        assert!(!p.receive_frame(&control, &stats));
        assert_eq!(stats.rx_errors(), (FRAME_WORDS - 7) as u32);
        assert_eq!(p.state().duty()[12], 0);
    }
}
