//! Types de données pour le crate floodgrid

use std::ops::Range;

use geo::{coord, Coord, Rect};
use ndarray::Array2;

use crate::GridError;

/// Transformation affine d'une grille orientée nord (sans rotation)
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// `pixel_height` est négatif pour une image orientée nord.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// X du coin supérieur gauche
    pub origin_x: f64,
    /// Y du coin supérieur gauche
    pub origin_y: f64,
    /// Largeur d'une cellule
    pub pixel_width: f64,
    /// Hauteur d'une cellule (négative en orientation nord)
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Centre géographique d'une cellule
    pub fn cell_center(&self, row: usize, col: usize) -> Coord {
        coord! {
            x: self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            y: self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        }
    }

    /// Emprise géographique d'une cellule
    pub fn cell_rect(&self, row: usize, col: usize) -> Rect {
        let x0 = self.origin_x + col as f64 * self.pixel_width;
        let y0 = self.origin_y + row as f64 * self.pixel_height;
        Rect::new(
            coord! { x: x0, y: y0 },
            coord! { x: x0 + self.pixel_width, y: y0 + self.pixel_height },
        )
    }

    /// Coordonnées pixel fractionnaires (col, row) d'un point géographique
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

/// Grille raster mono-bande géoréférencée
///
/// Les valeurs sont stockées en `f32` (ligne, colonne). Une cellule est valide
/// si elle n'est ni NaN ni égale à la valeur nodata déclarée.
#[derive(Debug, Clone)]
pub struct Raster {
    data: Array2<f32>,
    transform: GeoTransform,
    nodata: Option<f32>,
    epsg: Option<u16>,
}

impl Raster {
    /// Crée une grille à partir d'un tableau et d'une transformation
    pub fn new(data: Array2<f32>, transform: GeoTransform) -> Self {
        Self {
            data,
            transform,
            nodata: None,
            epsg: None,
        }
    }

    /// Crée une grille à partir de valeurs en ordre ligne par ligne
    pub fn from_vec(
        data: Vec<f32>,
        rows: usize,
        cols: usize,
        transform: GeoTransform,
    ) -> Result<Self, GridError> {
        let len = data.len();
        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|_| GridError::InvalidDimensions { rows, cols, len })?;
        Ok(Self::new(array, transform))
    }

    /// Grille de même forme, transformation, nodata et CRS, remplie d'une valeur
    pub fn filled_like(template: &Raster, value: f32) -> Self {
        Self {
            data: Array2::from_elem(template.data.dim(), value),
            transform: template.transform,
            nodata: template.nodata,
            epsg: template.epsg,
        }
    }

    pub fn with_nodata(mut self, nodata: Option<f32>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn with_epsg(mut self, epsg: Option<u16>) -> Self {
        self.epsg = epsg;
        self
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions (lignes, colonnes)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    pub fn epsg(&self) -> Option<u16> {
        self.epsg
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        self.data.get((row, col)).copied()
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        if let Some(cell) = self.data.get_mut((row, col)) {
            *cell = value;
        }
    }

    /// Une valeur est valide si elle n'est ni NaN ni nodata
    pub fn is_valid(&self, value: f32) -> bool {
        if value.is_nan() {
            return false;
        }
        match self.nodata {
            Some(nodata) if nodata.is_nan() => true,
            Some(nodata) => value != nodata,
            None => true,
        }
    }

    /// Valeur valide d'une cellule
    pub fn valid_value(&self, row: usize, col: usize) -> Option<f32> {
        self.get(row, col).filter(|&v| self.is_valid(v))
    }

    /// Emprise géographique complète de la grille
    pub fn bounds(&self) -> Rect {
        let (rows, cols) = self.shape();
        let t = &self.transform;
        Rect::new(
            coord! { x: t.origin_x, y: t.origin_y },
            coord! {
                x: t.origin_x + cols as f64 * t.pixel_width,
                y: t.origin_y + rows as f64 * t.pixel_height,
            },
        )
    }

    /// Cellule (ligne, colonne) contenant un point, si le point est dans la grille
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let (col, row) = self.transform.geo_to_pixel(x, y);
        if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row.floor() as usize, col.floor() as usize);
        let (rows, cols) = self.shape();
        (row < rows && col < cols).then_some((row, col))
    }

    /// Plages de lignes et colonnes dont les cellules recoupent un rectangle
    ///
    /// Retourne `None` si le rectangle est entièrement hors de la grille.
    pub fn cell_window(&self, rect: &Rect) -> Option<(Range<usize>, Range<usize>)> {
        let (rows, cols) = self.shape();
        if rows == 0 || cols == 0 {
            return None;
        }

        let (c0, r0) = self.transform.geo_to_pixel(rect.min().x, rect.min().y);
        let (c1, r1) = self.transform.geo_to_pixel(rect.max().x, rect.max().y);

        let col_range = index_range(c0.min(c1), c0.max(c1), cols)?;
        let row_range = index_range(r0.min(r1), r0.max(r1), rows)?;
        Some((row_range, col_range))
    }
}

/// Convertit un intervalle pixel fractionnaire en plage d'indices bornée
fn index_range(lo: f64, hi: f64, len: usize) -> Option<Range<usize>> {
    if !lo.is_finite() || !hi.is_finite() || hi < 0.0 || lo >= len as f64 {
        return None;
    }
    let start = lo.floor().max(0.0) as usize;
    let end = (hi.floor() as usize).saturating_add(1).min(len);
    (start < end).then_some(start..end)
}
