//! Primary and secondary pipelines exchanging frames over a mock link

use tubesync_core::config::{DisplayConfig, Role, DEFAULT_PIN_MAP};
use tubesync_core::control::{LinkStats, NeverCancel, Pipeline};
use tubesync_core::render::HandMask;
use tubesync_core::testing::{MockClock, MockLink, MockPwm};
use tubesync_core::N_TUBES;
use tubesync_hal::Calendar;
use tubesync_protocol::FRAME_WORDS;

type TestPipeline = Pipeline<MockClock, MockLink<'static>, MockPwm>;

fn pipeline(role: Role) -> TestPipeline {
    let config = DisplayConfig {
        role,
        ..DisplayConfig::default()
    };
    let clock = MockClock::new(Calendar::new(2024, 10, 5, 18, 42, 7), 250_000, 99);
    Pipeline::new(&config, clock, MockLink::new(), MockPwm::new())
}

fn draw_primary_frame(primary: &mut TestPipeline) -> [u16; FRAME_WORDS] {
    primary.update_time();
    primary.update_hand_positions();
    primary.render(HandMask::ALL);
    primary.update_duty();
    primary.encode_frame().unwrap();
    primary.send_frame().unwrap();
    primary.paint();
    primary.link_mut().last_sent_frame().unwrap()
}

#[test]
fn both_halves_show_primary_duty() {
    let mut primary = pipeline(Role::Primary);
    let mut secondary = pipeline(Role::Secondary);
    let stats = LinkStats::new();

    let words = draw_primary_frame(&mut primary);
    secondary.link_mut().queue_rx(&words);
    assert!(secondary.receive_frame(&NeverCancel, &stats));
    secondary.paint();
    assert_eq!(stats.rx_errors(), 0);

    let duty = *primary.state().duty();
    assert!(duty.iter().any(|&d| d > 0));
    for slot in 0..N_TUBES {
        let pin = DEFAULT_PIN_MAP[slot] as usize;
        let shown = if slot < N_TUBES / 2 {
            primary.pwm_mut().levels[pin]
        } else {
            secondary.pwm_mut().levels[pin]
        };
        assert_eq!(shown, duty[slot], "slot {}", slot);
    }
}

#[test]
fn corrupted_frame_dropped_next_one_applied() {
    let mut primary = pipeline(Role::Primary);
    let mut secondary = pipeline(Role::Secondary);
    let stats = LinkStats::new();

    let mut first = draw_primary_frame(&mut primary);
    first[5] ^= 0x0100;
    primary.clock_mut().advance_us(300_000);
    let second = draw_primary_frame(&mut primary);

    secondary.link_mut().queue_rx(&first);
    secondary.link_mut().queue_rx(&second);
    assert!(secondary.receive_frame(&NeverCancel, &stats));

    assert_eq!(stats.rx_errors(), 1);
    assert_eq!(secondary.state().frame(), &second);
    assert_eq!(&secondary.state().duty()[12..], &primary.state().duty()[12..]);
}

#[test]
fn bit_depth_follows_primary() {
    let mut primary = pipeline(Role::Primary);
    let mut secondary = pipeline(Role::Secondary);
    let stats = LinkStats::new();

    primary.state_mut().set_pwm_bits(13).unwrap();
    let words = draw_primary_frame(&mut primary);
    secondary.link_mut().queue_rx(&words);
    assert!(secondary.receive_frame(&NeverCancel, &stats));
    secondary.paint();

    assert_eq!(secondary.state().pwm_bits().get(), 13);
    assert_eq!(secondary.pwm_mut().wrap_bits, Some(13));
    assert!(secondary.state().duty().iter().all(|&d| d < 1 << 13));
}
