//! Couches d'actifs lues depuis des fichiers GeoJSON

use std::path::Path;

use geo::Geometry;
use geojson::{FeatureCollection, GeoJson};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ImpactError;

/// Attributs d'une feature, dans l'ordre du fichier source
pub type Properties = Map<String, Value>;

/// Un actif: géométrie et attributs transmis tels quels
#[derive(Debug, Clone, PartialEq)]
pub struct AssetFeature {
    pub geometry: Geometry,
    pub properties: Properties,
}

impl AssetFeature {
    pub fn new(geometry: Geometry, properties: Properties) -> Self {
        Self {
            geometry,
            properties,
        }
    }

    /// Convertit une feature GeoJSON. `Ok(None)` pour une feature sans géométrie.
    pub fn from_geojson(
        feature: geojson::Feature,
        source_name: &str,
    ) -> Result<Option<Self>, ImpactError> {
        let Some(geometry) = feature.geometry else {
            return Ok(None);
        };
        let geometry =
            Geometry::<f64>::try_from(geometry).map_err(|e| ImpactError::geojson(source_name, e))?;
        Ok(Some(Self::new(geometry, feature.properties.unwrap_or_default())))
    }
}

/// Couche d'actifs d'une catégorie
#[derive(Debug, Clone, PartialEq)]
pub struct AssetLayer {
    pub name: String,
    pub features: Vec<AssetFeature>,
}

impl AssetLayer {
    pub fn new(name: impl Into<String>, features: Vec<AssetFeature>) -> Self {
        Self {
            name: name.into(),
            features,
        }
    }

    /// Lit une FeatureCollection GeoJSON
    ///
    /// Le fichier est entièrement lu puis refermé avant le décodage.
    pub fn read(path: &Path, name: &str) -> Result<Self, ImpactError> {
        let text = std::fs::read_to_string(path).map_err(|source| ImpactError::AssetFile {
            path: path.to_path_buf(),
            source,
        })?;
        let layer = Self::from_geojson_str(name, &text, &path.display().to_string())?;
        debug!(
            path = %path.display(),
            layer = name,
            features = layer.len(),
            "Asset layer loaded"
        );
        Ok(layer)
    }

    /// Décode une FeatureCollection (ou une Feature isolée)
    pub fn from_geojson_str(name: &str, text: &str, source_name: &str) -> Result<Self, ImpactError> {
        let geojson: GeoJson = text
            .parse()
            .map_err(|e| ImpactError::geojson(source_name, e))?;
        let collection = match geojson {
            GeoJson::Feature(f) => FeatureCollection {
                bbox: None,
                features: vec![f],
                foreign_members: None,
            },
            other => FeatureCollection::try_from(other)
                .map_err(|e| ImpactError::geojson(source_name, e))?,
        };
        Self::from_collection(name, collection, source_name)
    }

    pub fn from_collection(
        name: &str,
        collection: FeatureCollection,
        source_name: &str,
    ) -> Result<Self, ImpactError> {
        let total = collection.features.len();
        let mut features = Vec::with_capacity(total);
        for feature in collection.features {
            if let Some(asset) = AssetFeature::from_geojson(feature, source_name)? {
                features.push(asset);
            }
        }
        if features.len() < total {
            warn!(
                layer = name,
                skipped = total - features.len(),
                "Features without geometry skipped"
            );
        }
        Ok(Self::new(name, features))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// La colonne existe-t-elle dans le schéma (au moins une feature la porte) ?
    pub fn has_column(&self, column: &str) -> bool {
        self.features
            .iter()
            .any(|f| f.properties.contains_key(column))
    }

    /// Niveaux de référence de chaque feature
    ///
    /// # Errors
    ///
    /// `MissingColumn` si la colonne est absente du schéma,
    /// `InvalidReference` si une feature porte une valeur nulle ou non numérique.
    pub fn reference_levels(&self, column: &str) -> Result<Vec<f64>, ImpactError> {
        if !self.has_column(column) {
            return Err(ImpactError::MissingColumn {
                layer: self.name.clone(),
                column: column.to_string(),
            });
        }

        self.features
            .iter()
            .enumerate()
            .map(|(index, f)| {
                let value = f.properties.get(column).unwrap_or(&Value::Null);
                numeric_value(value).ok_or_else(|| ImpactError::InvalidReference {
                    layer: self.name.clone(),
                    column: column.to_string(),
                    index,
                    value: value.to_string(),
                })
            })
            .collect()
    }

    pub fn geometries(&self) -> Vec<Geometry> {
        self.features.iter().map(|f| f.geometry.clone()).collect()
    }
}

/// Nombre JSON ou chaîne numérique (attributs issus de shapefiles)
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}
