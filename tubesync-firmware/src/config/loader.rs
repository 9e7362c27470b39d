//! Embedded configuration
//!
//! `clock.toml` is compiled into the image and checked by the build
//! script, so a parse failure here means the two validators disagree.

use defmt::*;

use tubesync_core::config::{parse_config, DisplayConfig};
use tubesync_core::hands::Hand;

/// Embedded configuration (compiled into firmware)
/// Edit clock.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../../clock.toml");

/// Parse the embedded configuration, falling back to defaults
pub fn load_config() -> DisplayConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration");
            log_config_summary(&config);
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {:?}", e);
            warn!("Using default configuration");
            DisplayConfig::default()
        }
    }
}

/// Log the settings that differ between boards
fn log_config_summary(config: &DisplayConfig) {
    info!(
        "Role {:?}, {} PWM bits, link {} Bd on GPIO {}",
        config.role,
        config.pwm_bits.get(),
        config.link.baudrate,
        config.link.pin
    );
    info!(
        "UTC offset {} min, DST {}",
        config.zone.utc_offset_minutes, config.zone.dst
    );
    for hand in Hand::ALL {
        let params = config.hands[hand.index()];
        debug!(
            "  {:?} hand: k={}/1000, amplitude={}/1000",
            hand,
            params.k.to_scaled_1000(),
            params.amplitude.to_scaled_1000()
        );
    }
    debug!("Pin map: {}", config.pin_map);
    debug!("Tube map: {}", config.tube_map);
}
