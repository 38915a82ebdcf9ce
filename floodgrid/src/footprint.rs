//! Emprise tamponnée d'une géométrie sur une grille
//!
//! Le tampon n'est jamais construit comme polygone: une cellule est couverte
//! quand son centre tombe dans la zone tamponnée.
//!
//! - Tampon nul: un point couvre la cellule qui le contient, une ligne les
//!   cellules qu'elle traverse, une surface les cellules dont le centre est
//!   à l'intérieur.
//! - `CapStyle::Round`: distance euclidienne du centre à la géométrie ≤ d.
//! - `CapStyle::Square`: le carré de demi-côté d centré sur la cellule
//!   recoupe la géométrie (somme de Minkowski en norme L∞).

use geo::{
    coord, BoundingRect, EuclideanDistance, Geometry, Intersects, Point, Polygon, Rect,
};

use crate::types::Raster;

/// Forme des extrémités et des angles d'un tampon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapStyle {
    #[default]
    Round,
    Square,
}

/// Distance de tampon et style d'extrémité
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Buffer {
    pub distance: f64,
    pub cap: CapStyle,
}

impl Buffer {
    /// Aucun tampon: la géométrie telle quelle
    pub const NONE: Buffer = Buffer {
        distance: 0.0,
        cap: CapStyle::Round,
    };

    pub fn new(distance: f64, cap: CapStyle) -> Self {
        Self { distance, cap }
    }

    pub fn round(distance: f64) -> Self {
        Self::new(distance, CapStyle::Round)
    }

    pub fn square(distance: f64) -> Self {
        Self::new(distance, CapStyle::Square)
    }

    pub fn is_none(&self) -> bool {
        self.distance.is_nan() || self.distance <= 0.0
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::NONE
    }
}

/// Géométrie tamponnée, évaluée cellule par cellule
#[derive(Debug, Clone)]
pub struct Footprint<'a> {
    geometry: &'a Geometry,
    buffer: Buffer,
    bounds: Option<Rect>,
}

impl<'a> Footprint<'a> {
    pub fn new(geometry: &'a Geometry, buffer: Buffer) -> Self {
        let d = if buffer.is_none() { 0.0 } else { buffer.distance };
        let bounds = geometry.bounding_rect().map(|r| {
            Rect::new(
                coord! { x: r.min().x - d, y: r.min().y - d },
                coord! { x: r.max().x + d, y: r.max().y + d },
            )
        });
        Self {
            geometry,
            buffer,
            bounds,
        }
    }

    /// Emprise de la géométrie tamponnée (`None` pour une géométrie vide)
    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    /// La cellule (row, col) est-elle couverte par l'emprise ?
    pub fn covers(&self, raster: &Raster, row: usize, col: usize) -> bool {
        let center = Point::from(raster.transform().cell_center(row, col));

        if self.buffer.is_none() {
            return covers_unbuffered(self.geometry, raster, row, col, &center);
        }

        let d = self.buffer.distance;
        match self.buffer.cap {
            CapStyle::Round => distance_to(&center, self.geometry) <= d,
            CapStyle::Square => {
                let square = Rect::new(
                    coord! { x: center.x() - d, y: center.y() - d },
                    coord! { x: center.x() + d, y: center.y() + d },
                )
                .to_polygon();
                self.geometry.intersects(&square)
            }
        }
    }

    /// Cellules couvertes, en ordre ligne par ligne
    pub fn cells(&self, raster: &Raster) -> Vec<(usize, usize)> {
        let Some((rows, cols)) = self.bounds.and_then(|b| raster.cell_window(&b)) else {
            return Vec::new();
        };

        let mut cells = Vec::new();
        for row in rows {
            for col in cols.clone() {
                if self.covers(raster, row, col) {
                    cells.push((row, col));
                }
            }
        }
        cells
    }
}

fn covers_unbuffered(
    geometry: &Geometry,
    raster: &Raster,
    row: usize,
    col: usize,
    center: &Point,
) -> bool {
    match geometry {
        Geometry::Point(p) => raster.cell_at(p.x(), p.y()) == Some((row, col)),
        Geometry::MultiPoint(mp) => mp
            .iter()
            .any(|p| raster.cell_at(p.x(), p.y()) == Some((row, col))),
        Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
            let cell: Polygon = raster.transform().cell_rect(row, col).to_polygon();
            geometry.intersects(&cell)
        }
        Geometry::GeometryCollection(gc) => gc
            .iter()
            .any(|g| covers_unbuffered(g, raster, row, col, center)),
        _ => geometry.intersects(center),
    }
}

/// Distance euclidienne d'un point à une géométrie (0 à l'intérieur d'une surface)
fn distance_to(point: &Point, geometry: &Geometry) -> f64 {
    match geometry {
        Geometry::Point(g) => point.euclidean_distance(g),
        Geometry::Line(g) => point.euclidean_distance(g),
        Geometry::LineString(g) => point.euclidean_distance(g),
        Geometry::Polygon(g) => point.euclidean_distance(g),
        Geometry::MultiPoint(g) => point.euclidean_distance(g),
        Geometry::MultiLineString(g) => point.euclidean_distance(g),
        Geometry::MultiPolygon(g) => point.euclidean_distance(g),
        Geometry::Rect(g) => point.euclidean_distance(&g.to_polygon()),
        Geometry::Triangle(g) => point.euclidean_distance(&g.to_polygon()),
        Geometry::GeometryCollection(gc) => gc
            .iter()
            .map(|g| distance_to(point, g))
            .fold(f64::INFINITY, f64::min),
    }
}
