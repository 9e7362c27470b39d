//! Minimal TOML parser for the display configuration
//!
//! Handles only the subset used by `clock.toml`:
//! - `[section]` and `[section.name]` headers
//! - `key = value` pairs (string, integer, decimal, boolean, integer array)
//! - `#` comments, whole-line or trailing
//!
//! The full file is checked with the real `toml` crate at build time; this
//! parser only has to read what that check accepted.

use crate::duty::PwmBits;
use crate::fixed::UFixed32;
use crate::hands::Hand;
use crate::N_TUBES;

use super::types::{ConfigError, DisplayConfig, Role};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Value has the wrong type or is out of range
    InvalidValue,
    /// Array has the wrong number of elements
    InvalidLength,
    /// Parsed values violate a configuration constraint
    Config(ConfigError),
}

impl From<ConfigError> for ParseError {
    fn from(e: ConfigError) -> Self {
        ParseError::Config(e)
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Display,
    Time,
    Hand(Hand),
}

/// Parse a configuration file, starting from defaults
///
/// Keys that are absent keep their default. Unknown keys are ignored;
/// unknown sections are an error.
pub fn parse_config(input: &str) -> Result<DisplayConfig, ParseError> {
    let mut config = DisplayConfig::default();
    let mut section = Section::Root;
    // Hour and minute parts are kept apart so either may be given alone
    let mut offset_hours = config.zone.utc_offset_minutes / 60;
    let mut offset_minutes = config.zone.utc_offset_minutes % 60;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            section = parse_section_header(&line[1..line.len() - 1])?;
            continue;
        }

        let Some((key, value)) = parse_key_value(line) else {
            continue;
        };

        match section {
            Section::Root => {}
            Section::Display => match key {
                "role" => config.role = parse_role(parse_string(value))?,
                "pwm_bits" => config.pwm_bits = PwmBits::new(parse_int(value)?)?,
                "link_baud" => config.link.baudrate = parse_int(value)?,
                "link_pin" => config.link.pin = parse_int(value)?,
                "tube_map" => config.tube_map = parse_map(value)?,
                "pin_map" => config.pin_map = parse_map(value)?,
                _ => {} // Ignore unknown keys
            },
            Section::Time => match key {
                "utc_offset_hours" => offset_hours = parse_int(value)?,
                "utc_offset_minutes" => offset_minutes = parse_int(value)?,
                "dst" => config.zone.dst = parse_bool(value)?,
                _ => {}
            },
            Section::Hand(hand) => {
                let params = &mut config.hands[hand.index()];
                match key {
                    "k" => params.k = parse_decimal(value)?,
                    "amplitude" => params.amplitude = parse_decimal(value)?,
                    _ => {}
                }
            }
        }
    }

    if offset_hours.abs() > 14 || offset_minutes.abs() >= 60 {
        return Err(ParseError::InvalidValue);
    }
    config.zone.utc_offset_minutes = offset_hours * 60 + offset_minutes;

    config.validate()?;
    Ok(config)
}

/// Parse a section header like "display" or "hand.second"
fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    match header.trim() {
        "display" => Ok(Section::Display),
        "time" => Ok(Section::Time),
        "hand.second" => Ok(Section::Hand(Hand::Second)),
        "hand.minute" => Ok(Section::Hand(Hand::Minute)),
        "hand.hour" => Ok(Section::Hand(Hand::Hour)),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    // Strip a trailing comment unless the '#' sits inside a string
    let value = match value.find('#') {
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn parse_string(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_role(value: &str) -> Result<Role, ParseError> {
    match value {
        "primary" => Ok(Role::Primary),
        "secondary" => Ok(Role::Secondary),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse a non-negative decimal like "1.5" into Q16.16
///
/// Digits past the third decimal place are truncated.
fn parse_decimal(value: &str) -> Result<UFixed32, ParseError> {
    let (whole, frac) = value.split_once('.').unwrap_or((value, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(ParseError::InvalidValue);
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidValue);
    }

    let whole: u32 = if whole.is_empty() {
        0
    } else {
        parse_int(whole)?
    };

    let mut thousandths = 0u32;
    let mut scale = 100;
    for digit in frac.bytes().take(3) {
        thousandths += (digit - b'0') as u32 * scale;
        scale /= 10;
    }

    let scaled = whole
        .checked_mul(1000)
        .and_then(|w| w.checked_add(thousandths))
        .filter(|&s| s < 65_536_000)
        .ok_or(ParseError::InvalidValue)?;
    Ok(UFixed32::from_scaled_1000(scaled))
}

/// Parse an inline array of exactly `N_TUBES` small integers
fn parse_map(value: &str) -> Result<[u8; N_TUBES], ParseError> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or(ParseError::InvalidValue)?;

    let mut map = [0u8; N_TUBES];
    let mut count = 0;
    for item in inner.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue; // trailing comma
        }
        let slot = map.get_mut(count).ok_or(ParseError::InvalidLength)?;
        *slot = parse_int(item)?;
        count += 1;
    }

    if count != N_TUBES {
        return Err(ParseError::InvalidLength);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PIN_MAP;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("1"), Ok(UFixed32::ONE));
        assert_eq!(parse_decimal("1.0"), Ok(UFixed32::ONE));
        assert_eq!(parse_decimal("1.5"), Ok(UFixed32::from_scaled_1000(1500)));
        assert_eq!(parse_decimal(".25"), Ok(UFixed32::from_scaled_1000(250)));
        assert_eq!(parse_decimal("0.6125"), Ok(UFixed32::from_scaled_1000(612)));
        assert_eq!(parse_decimal("-1.0"), Err(ParseError::InvalidValue));
        assert_eq!(parse_decimal("1.x"), Err(ParseError::InvalidValue));
        assert_eq!(parse_decimal("."), Err(ParseError::InvalidValue));
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("pwm_bits = 11"), Some(("pwm_bits", "11")));
        assert_eq!(
            parse_key_value("role = \"primary\" # this board"),
            Some(("role", "\"primary\""))
        );
        assert_eq!(parse_key_value("dangling ="), None);
        assert_eq!(parse_key_value("no equals"), None);
    }

    #[test]
    fn test_parse_section_header() {
        assert_eq!(parse_section_header("display"), Ok(Section::Display));
        assert_eq!(
            parse_section_header(" hand.minute "),
            Ok(Section::Hand(Hand::Minute))
        );
        assert_eq!(
            parse_section_header("hand.century"),
            Err(ParseError::InvalidSection)
        );
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
# Secondary board
[display]
role = "secondary"
pwm_bits = 12
link_baud = 230400
link_pin = 28

[time]
utc_offset_hours = -8
dst = false

[hand.second]
k = 2.0
amplitude = 0.5

[hand.hour]
amplitude = 1.25
"#;

        let config = parse_config(config_str).unwrap();
        assert_eq!(config.role, Role::Secondary);
        assert_eq!(config.pwm_bits.get(), 12);
        assert_eq!(config.link.baudrate, 230_400);
        assert_eq!(config.link.pin, 28);
        assert_eq!(config.zone.utc_offset_minutes, -480);
        assert!(!config.zone.dst);
        assert_eq!(config.hands[0].k, UFixed32::from_int(2));
        assert_eq!(config.hands[0].amplitude, UFixed32::from_scaled_1000(500));
        // Untouched hand keeps its default
        assert_eq!(config.hands[1], DisplayConfig::default().hands[1]);
        assert_eq!(config.hands[2].amplitude, UFixed32::from_scaled_1000(1250));
        assert_eq!(config.pin_map, DEFAULT_PIN_MAP);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_config(""), Ok(DisplayConfig::default()));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert_eq!(
            parse_config("[display]\npwm_bits = 16\n"),
            Err(ParseError::Config(ConfigError::InvalidBitDepth))
        );
        assert_eq!(
            parse_config("[display]\nrole = \"tertiary\"\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(parse_config("[clock]\n"), Err(ParseError::InvalidSection));
        assert_eq!(
            parse_config("[time]\nutc_offset_hours = 20\n"),
            Err(ParseError::InvalidValue)
        );
    }

    #[test]
    fn test_parse_maps() {
        let config_str = "[display]\n\
            tube_map = [23, 22, 21, 20, 19, 18, 17, 16, 15, 14, 13, 12, \
                        11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0]\n";
        let config = parse_config(config_str).unwrap();
        assert_eq!(config.tube_map[0], 23);
        assert_eq!(config.tube_map[23], 0);

        assert_eq!(
            parse_config("[display]\ntube_map = [0, 1, 2]\n"),
            Err(ParseError::InvalidLength)
        );

        // Link pin collides with the last tube
        assert_eq!(
            parse_config("[display]\nlink_pin = 26\n"),
            Err(ParseError::Config(ConfigError::InvalidPinMap))
        );
    }
}
