//! Tubesync - Dual-Controller Tube Clock Firmware
//!
//! Main firmware binary for the two RP2040 boards behind a ring of 24
//! tubes. The same image runs on both; `clock.toml` picks the role.
//!
//! Core 0 boots the board and runs the Embassy executor for reporting.
//! Core 1 runs the frame loop without an executor so nothing preempts it.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::AnyPin;
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::{Common, InterruptHandler as PioInterruptHandler, Pio};
use embassy_rp::Peri;
use heapless::Vec;
use static_cell::{ConstStaticCell, StaticCell};
use {defmt_rtt as _, panic_probe as _};

use tubesync_core::config::{DisplayConfig, Role};
use tubesync_core::control::{ControlLoop, LinkStats, LoopControl, Pipeline};
use tubesync_core::N_TUBES;
use tubesync_hal_rp2040::clock::Rp2040Clock;
use tubesync_hal_rp2040::flash::Rp2040FlashStorage;
use tubesync_hal_rp2040::link::PioLink;
use tubesync_hal_rp2040::pins::{PinBank, BOARD_LINK_PIN};
use tubesync_hal_rp2040::pwm::{Rp2040PwmBank, BANK_PINS};
use tubesync_hal_rp2040::system::Rp2040System;

use crate::config::{load_calibration, load_config};
use crate::tasks::{LoopExit, LOOP_EXIT};

mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});

/// Core 1 stack size in bytes
const CORE1_STACK_SIZE: usize = 8192;

type Link = PioLink<'static, PIO0, 0>;
type ClockLoop = ControlLoop<
    'static,
    Rp2040Clock<'static>,
    Link,
    Rp2040PwmBank<'static>,
    Rp2040System,
>;

static CORE1_STACK: ConstStaticCell<Stack<CORE1_STACK_SIZE>> = ConstStaticCell::new(Stack::new());

// PIO programs stay loaded for the life of the link
static PIO_COMMON: StaticCell<Common<'static, PIO0>> = StaticCell::new();

// Shared between the loop on core 1 and the stats task on core 0
static LOOP_CONTROL: LoopControl = LoopControl::new();
static LINK_STATS: LinkStats = LinkStats::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Tubesync firmware starting...");

    let p = embassy_rp::init(Default::default());
    let (mut pins, remaining) = PinBank::from_peripherals(p);
    info!("Peripherals initialized");

    let config = load_config();
    if config.link.pin != BOARD_LINK_PIN {
        warn!(
            "link_pin {} ignored, the board wires the link to GPIO {}",
            config.link.pin, BOARD_LINK_PIN
        );
    }

    let mut storage = Rp2040FlashStorage::new(remaining.flash, remaining.dma_ch0);
    let calibration = load_calibration(&mut storage).await;

    let clock = Rp2040Clock::new(remaining.rtc);
    if !clock.is_running() {
        warn!("RTC is not running, the calendar reads as unset");
    }

    // Link on PIO0 SM0
    let Pio { common, sm0, .. } = Pio::new(remaining.pio0, Irqs);
    let common = PIO_COMMON.init(common);
    let link: Link = match config.role {
        Role::Primary => PioLink::transmitter(common, sm0, remaining.link_pin, config.link),
        Role::Secondary => PioLink::receiver(common, sm0, remaining.link_pin, config.link),
    };
    info!("Link {:?} at {} Bd", link.direction(), config.link.baudrate);

    let pwm = init_pwm(&mut pins, &config);
    info!("PWM initialized, {} bits", config.pwm_bits.get());

    let mut pipeline = Pipeline::new(&config, clock, link, pwm);
    if let Err(e) = pipeline.state_mut().load_calibration(&calibration) {
        warn!("Calibration rejected: {:?}, using full range", e);
    }

    let system = Rp2040System::new(remaining.watchdog);
    let mut control_loop: ClockLoop =
        ControlLoop::new(pipeline, system, &LOOP_CONTROL, &LINK_STATS);

    match control_loop.start() {
        Ok(()) => {
            info!("Starting {:?} loop on core 1", config.role);
            spawn_core1(remaining.core1, CORE1_STACK.take(), move || {
                run_core1(control_loop)
            });
        }
        Err(e) => error!("Control loop not started: {:?}", e),
    }

    spawner
        .spawn(tasks::stats_task(&LOOP_CONTROL, &LINK_STATS))
        .unwrap();

    info!("Firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Core 1 entry: run frames until cancelled, then park
fn run_core1(control_loop: ClockLoop) -> ! {
    let exit = match control_loop.run() {
        Ok(_) => LoopExit::Stopped,
        Err(e) => LoopExit::Failed(e),
    };
    LOOP_EXIT.signal(exit);
    loop {
        cortex_m::asm::wfe();
    }
}

/// Route this controller's half of the pin map to PWM and park the rest
fn init_pwm(pins: &mut PinBank, config: &DisplayConfig) -> Rp2040PwmBank<'static> {
    let local = config.role.local_slots();
    let mut active: Vec<Peri<'static, AnyPin>, BANK_PINS> = Vec::new();
    let mut parked: Vec<Peri<'static, AnyPin>, BANK_PINS> = Vec::new();

    for slot in 0..N_TUBES {
        let gpio = config.pin_map[slot];
        let pin = match pins.take(gpio) {
            Ok(pin) => pin,
            Err(e) => {
                warn!("Slot {} GPIO {} unavailable: {:?}", slot, gpio, e);
                continue;
            }
        };
        let half = if local.contains(&slot) {
            &mut active
        } else {
            &mut parked
        };
        // Each half holds exactly BANK_PINS slots
        let _ = half.push(pin);
    }

    Rp2040PwmBank::new(active, parked)
}
