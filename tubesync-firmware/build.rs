//! Build script for tubesync-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates clock.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// GPIOs on the RP2040
const N_GPIO: i64 = 30;

/// Tubes on the ring
const N_TUBES: usize = 24;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate clock.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=clock.toml");

    let config_path = Path::new("clock.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: clock.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds a clock.toml configuration file.            ║\n\
            ║  Please create one in the tubesync-firmware directory.           ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read clock.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in clock.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    validate_required_sections(&config);
    validate_display(&config);
    validate_time(&config);
    validate_hands(&config);

    println!("cargo:warning=clock.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Abort the build with a list of problems in one section
fn report(title: &str, errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        errors
            .iter()
            .map(|e| format!("║  • {:<62} ║", e))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

fn validate_required_sections(config: &toml::Value) {
    let mut errors = Vec::new();

    if config.get("display").is_none() {
        errors.push("Missing [display] section".to_string());
    }
    if config.get("time").is_none() {
        errors.push("Missing [time] section".to_string());
    }

    report("Missing required sections in clock.toml", &errors);
}

/// Integer entries of a map, or an error message
fn int_map(display: &toml::value::Table, key: &str) -> Result<Option<Vec<i64>>, String> {
    let Some(value) = display.get(key) else {
        return Ok(None);
    };
    let Some(items) = value.as_array() else {
        return Err(format!("[display] {} must be an array", key));
    };
    if items.len() != N_TUBES {
        return Err(format!("[display] {} must have {} entries", key, N_TUBES));
    }
    items
        .iter()
        .map(|item| {
            item.as_integer()
                .ok_or_else(|| format!("[display] {} entries must be integers", key))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Whether `values` holds no repeats
fn all_distinct(values: &[i64]) -> bool {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).all(|pair| pair[0] != pair[1])
}

fn validate_display(config: &toml::Value) {
    let display = match config.get("display") {
        Some(toml::Value::Table(t)) => t,
        _ => return,
    };

    let mut errors = Vec::new();

    match display.get("role") {
        Some(toml::Value::String(role)) => {
            if !["primary", "secondary"].contains(&role.as_str()) {
                errors.push("[display] role must be 'primary' or 'secondary'".to_string());
            }
        }
        Some(_) => errors.push("[display] role must be a string".to_string()),
        None => errors.push("[display] missing 'role'".to_string()),
    }

    if let Some(value) = display.get("pwm_bits") {
        match value.as_integer() {
            Some(bits) if (2..=15).contains(&bits) => {}
            _ => errors.push("[display] pwm_bits must be 2-15".to_string()),
        }
    }

    if let Some(value) = display.get("link_baud") {
        match value.as_integer() {
            Some(baud) if baud > 0 && baud <= 10_000_000 => {}
            _ => errors.push("[display] link_baud must be 1-10000000".to_string()),
        }
    }

    let link_pin = match display.get("link_pin") {
        Some(value) => match value.as_integer() {
            Some(pin) if (0..N_GPIO).contains(&pin) => Some(pin),
            _ => {
                errors.push(format!("[display] link_pin must be 0-{}", N_GPIO - 1));
                None
            }
        },
        None => Some(27),
    };

    match int_map(display, "tube_map") {
        Ok(Some(map)) => {
            if map.iter().any(|&t| t < 0 || t >= N_TUBES as i64) || !all_distinct(&map) {
                errors.push(format!(
                    "[display] tube_map must be a permutation of 0-{}",
                    N_TUBES - 1
                ));
            }
        }
        Ok(None) => {}
        Err(e) => errors.push(e),
    }

    match int_map(display, "pin_map") {
        Ok(Some(map)) => {
            if map.iter().any(|&p| p < 0 || p >= N_GPIO) || !all_distinct(&map) {
                errors.push("[display] pin_map must hold distinct GPIOs 0-29".to_string());
            }
            if let Some(link) = link_pin {
                if map.contains(&link) {
                    errors.push("[display] pin_map must not use the link pin".to_string());
                }
            }
        }
        Ok(None) => {}
        Err(e) => errors.push(e),
    }

    report("Invalid [display] configuration", &errors);
}

fn validate_time(config: &toml::Value) {
    let time = match config.get("time") {
        Some(toml::Value::Table(t)) => t,
        _ => return,
    };

    let mut errors = Vec::new();

    if let Some(value) = time.get("utc_offset_hours") {
        match value.as_integer() {
            Some(hours) if (-14..=14).contains(&hours) => {}
            _ => errors.push("[time] utc_offset_hours must be -14 to 14".to_string()),
        }
    }
    if let Some(value) = time.get("utc_offset_minutes") {
        match value.as_integer() {
            Some(minutes) if (-59..=59).contains(&minutes) => {}
            _ => errors.push("[time] utc_offset_minutes must be -59 to 59".to_string()),
        }
    }
    if let Some(value) = time.get("dst") {
        if !value.is_bool() {
            errors.push("[time] dst must be true or false".to_string());
        }
    }

    report("Invalid [time] configuration", &errors);
}

fn validate_hands(config: &toml::Value) {
    let hands = match config.get("hand") {
        Some(toml::Value::Table(t)) => t,
        _ => return,
    };

    let mut errors = Vec::new();

    for (name, hand) in hands {
        if !["second", "minute", "hour"].contains(&name.as_str()) {
            errors.push(format!("[hand.{}] is not a hand", name));
            continue;
        }
        let hand = match hand {
            toml::Value::Table(t) => t,
            _ => {
                errors.push(format!("[hand.{}] must be a table", name));
                continue;
            }
        };
        for key in ["k", "amplitude"] {
            if let Some(value) = hand.get(key) {
                let number = value
                    .as_float()
                    .or_else(|| value.as_integer().map(|i| i as f64));
                match number {
                    Some(n) if (0.0..32768.0).contains(&n) => {}
                    _ => errors.push(format!("[hand.{}] {} must be a non-negative number", name, key)),
                }
            }
        }
    }

    report("Invalid [hand.*] configuration", &errors);
}
