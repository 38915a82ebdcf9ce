//! Horodatage des pas de temps à partir des noms de rasters
//!
//! Le nom (sans extension) se termine par le décalage en heures depuis
//! l'heure de référence: `_<nnn>`, `_<nnn>_00` ou `_<nnn>_00_00`.

use std::path::Path;
use std::sync::OnceLock;

use chrono::{Duration, NaiveDateTime};
use regex::Regex;

use crate::error::ImpactError;

fn offset_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"_(\d+)(?:_00){0,2}$").ok())
        .as_ref()
}

/// Décalage en heures encodé dans le nom du raster
pub fn offset_hours(path: &Path) -> Result<f64, ImpactError> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ImpactError::Timestep(path.display().to_string()))?;

    offset_pattern()
        .and_then(|re| re.captures(stem))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .ok_or_else(|| ImpactError::Timestep(stem.to_string()))
}

/// Horodatage d'un pas de temps
///
/// `reference_time + start_offset_hours + décalage du nom de fichier`
pub fn timestamp(
    path: &Path,
    reference_time: NaiveDateTime,
    start_offset_hours: f64,
) -> Result<NaiveDateTime, ImpactError> {
    let hours = start_offset_hours + offset_hours(path)?;
    let millis = (hours * 3_600_000.0).round();
    // Hors de la plage de chrono: erreur, jamais de panique
    Some(millis)
        .filter(|m| m.is_finite())
        .and_then(|m| Duration::try_milliseconds(m as i64))
        .and_then(|delta| reference_time.checked_add_signed(delta))
        .ok_or_else(|| ImpactError::Timestep(path.display().to_string()))
}
