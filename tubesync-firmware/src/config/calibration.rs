//! Calibration data persistence
//!
//! Loads the per-tube duty table from flash storage. Tables are written by
//! calibration tooling, never by the clock itself.

use defmt::*;

use tubesync_core::config::{CalibrationData, MAX_CALIBRATION_SIZE};
use tubesync_core::duty::CalibrationPoint;
use tubesync_hal_rp2040::flash::{FlashError, Rp2040FlashStorage, StorageKey};
use tubesync_hal_rp2040::FlashStorageTrait;

/// Calibration persistence errors
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Flash operation failed
    Flash(FlashError),
    /// Deserialization failed
    Deserialize,
    /// CRC check failed
    CrcMismatch,
    /// Invalid magic or version
    InvalidFormat,
}

impl From<FlashError> for CalibrationError {
    fn from(e: FlashError) -> Self {
        CalibrationError::Flash(e)
    }
}

/// Load calibration data from flash
///
/// Returns the stored table, or full-range calibration for every tube if
/// nothing is stored or the data is invalid.
pub async fn load_calibration(storage: &mut Rp2040FlashStorage<'_>) -> CalibrationData {
    match load_calibration_inner(storage).await {
        Ok(data) => {
            info!("Loaded tube calibration from flash");
            log_calibration_summary(&data);
            data
        }
        Err(CalibrationError::Flash(FlashError::NotFound)) => {
            debug!("No calibration data in flash, using full range");
            CalibrationData::new()
        }
        Err(e) => {
            warn!("Failed to load calibration: {:?}, using full range", e);
            CalibrationData::new()
        }
    }
}

async fn load_calibration_inner(
    storage: &mut Rp2040FlashStorage<'_>,
) -> Result<CalibrationData, CalibrationError> {
    let mut buffer = [0u8; MAX_CALIBRATION_SIZE];
    let len = storage
        .read(StorageKey::TubeCalibration, &mut buffer)
        .await?;

    debug!("Read {} bytes of calibration from flash", len);

    let data: CalibrationData =
        postcard::from_bytes(&buffer[..len]).map_err(|_| CalibrationError::Deserialize)?;

    if !data.is_valid() {
        return Err(CalibrationError::InvalidFormat);
    }

    if !data.verify_crc() {
        warn!("Calibration CRC mismatch");
        return Err(CalibrationError::CrcMismatch);
    }

    Ok(data)
}

/// Log a summary of calibration data
fn log_calibration_summary(data: &CalibrationData) {
    let calibrated = data
        .tubes
        .iter()
        .filter(|&&point| point != CalibrationPoint::FULL_RANGE)
        .count();
    debug!("Calibration: {} tube(s) narrowed from full range", calibrated);

    for (tube, point) in data.tubes.iter().enumerate() {
        if *point != CalibrationPoint::FULL_RANGE {
            trace!("  Tube {}: {}..={}", tube, point.low, point.high);
        }
    }
}
