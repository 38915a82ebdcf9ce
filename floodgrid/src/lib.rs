//! # floodgrid
//!
//! Primitives raster géoréférencées pour l'analyse d'impact d'inondation.
//!
//! ## Features
//!
//! - Lecture/écriture GeoTIFF mono-bande (crate `tiff`, sans GDAL)
//! - Statistiques zonales (max, somme) sous des emprises tamponnées
//! - Rasterisation par centre de cellule avec écrasement
//! - Découpage de géométries sur l'emprise d'une grille
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust,ignore
//! use floodgrid::{zonal, Buffer, CapStyle};
//! use std::path::Path;
//!
//! let raster = floodgrid::open(Path::new("waterlevel_012.tif"))?;
//! let stats = zonal::sample(&raster, &geometries, Buffer::round(2.0));
//! for s in &stats {
//!     println!("max={:?} volume={:?}", s.max, s.sum);
//! }
//! ```

pub mod burn;
pub mod clip;
pub mod error;
pub mod footprint;
pub mod geotiff;
pub mod types;
pub mod zonal;

pub use error::GridError;
pub use footprint::{Buffer, CapStyle, Footprint};
pub use types::{GeoTransform, Raster};
pub use zonal::ZonalStats;

use std::path::Path;

/// Ouvre un GeoTIFF mono-bande.
///
/// # Errors
///
/// Retourne `GridError` si le fichier est absent, illisible ou sans géoréférencement.
pub fn open(path: &Path) -> Result<Raster, GridError> {
    geotiff::read(path)
}

/// Écrit une grille en GeoTIFF float32.
pub fn save(raster: &Raster, path: &Path) -> Result<(), GridError> {
    geotiff::write(raster, path)
}
