//! Rasterisation d'emprises dans une grille

use crate::footprint::Footprint;
use crate::types::Raster;

/// Écrit `value` dans chaque cellule couverte par l'emprise
///
/// Seules les cellules dont le centre est couvert sont écrites (pas de mode
/// "all touched"). Les valeurs existantes sont écrasées sans comparaison.
/// Retourne le nombre de cellules écrites.
pub fn burn(raster: &mut Raster, footprint: &Footprint, value: f32) -> usize {
    let cells = footprint.cells(raster);
    for &(row, col) in &cells {
        raster.set(row, col, value);
    }
    cells.len()
}
