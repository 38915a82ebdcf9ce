//! Raster d'impact: rasterisation des couches classées
//!
//! Les catégories sont brûlées dans l'ordre reçu. Une catégorie plus tardive
//! écrase sans condition les cellules déjà écrites, quelle que soit la classe
//! (dernier écrivain gagnant, pas de maximum).

use std::path::Path;

use floodgrid::burn::burn;
use floodgrid::{Buffer, Footprint, Raster};
use tracing::{debug, info};

use crate::error::ImpactError;
use crate::evaluate::ClassifiedAssetLayer;

/// Valeur nodata si le raster modèle n'en déclare pas
pub const DEFAULT_NODATA: f32 = -9999.0;

/// Compose les couches classées sur une grille vide
///
/// `layers` est dans l'ordre de composition; chaque couche est re-tamponnée
/// avec son propre tampon de composition. Les couches vides sont ignorées.
pub fn composite(layers: &[(&ClassifiedAssetLayer, Buffer)], template: &Raster) -> Raster {
    let nodata = template.nodata().unwrap_or(DEFAULT_NODATA);
    let mut output = Raster::filled_like(template, nodata).with_nodata(Some(nodata));

    for (layer, buffer) in layers {
        if layer.is_empty() {
            debug!(category = %layer.category, "Empty layer skipped");
            continue;
        }

        let mut cells = 0;
        for feature in &layer.features {
            let footprint = Footprint::new(&feature.geometry, *buffer);
            cells += burn(
                &mut output,
                &footprint,
                f32::from(feature.vulnerability_class.value()),
            );
        }
        debug!(
            category = %layer.category,
            features = layer.len(),
            cells,
            distance = buffer.distance,
            "Category burned"
        );
    }

    output
}

/// Écrit le raster d'impact en GeoTIFF
pub fn write_impact_raster(raster: &Raster, path: &Path) -> Result<(), ImpactError> {
    floodgrid::save(raster, path).map_err(|source| ImpactError::RasterWrite {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), epsg = ?raster.epsg(), "Impact raster written");
    Ok(())
}
