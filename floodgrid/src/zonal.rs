//! Statistiques zonales sous emprises tamponnées

use geo::Geometry;
use tracing::trace;

use crate::footprint::{Buffer, Footprint};
use crate::types::Raster;

/// Maximum et somme des cellules valides couvertes par une géométrie
///
/// Les deux valeurs sont `None` lorsqu'aucune cellule valide n'est couverte,
/// ce qui est distinct d'une somme nulle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZonalStats {
    pub max: Option<f64>,
    pub sum: Option<f64>,
    pub count: usize,
}

impl ZonalStats {
    fn push(&mut self, value: f64) {
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        self.sum = Some(self.sum.unwrap_or(0.0) + value);
        self.count += 1;
    }
}

/// Calcule les statistiques d'une seule emprise
pub fn footprint_stats(raster: &Raster, footprint: &Footprint) -> ZonalStats {
    let mut stats = ZonalStats::default();
    for (row, col) in footprint.cells(raster) {
        if let Some(value) = raster.valid_value(row, col) {
            stats.push(f64::from(value));
        }
    }
    stats
}

/// Échantillonne la grille sous chaque géométrie tamponnée
///
/// Le résultat est aligné sur `geometries`. La grille n'est pas modifiée.
pub fn sample(raster: &Raster, geometries: &[Geometry], buffer: Buffer) -> Vec<ZonalStats> {
    let stats: Vec<ZonalStats> = geometries
        .iter()
        .map(|g| footprint_stats(raster, &Footprint::new(g, buffer)))
        .collect();

    trace!(
        geometries = geometries.len(),
        uncovered = stats.iter().filter(|s| s.max.is_none()).count(),
        distance = buffer.distance,
        "Zonal sampling done"
    );
    stats
}
