//! Évaluation de la vulnérabilité d'une catégorie d'actifs
//!
//! Échantillonnage sous tampon → hauteur d'eau → classe → découpage sur
//! l'emprise du raster. Chaque étape produit de nouveaux enregistrements,
//! la couche d'entrée n'est jamais modifiée.

use floodgrid::{clip, zonal, Raster};
use geo::Geometry;
use serde_json::Value;
use tracing::{debug, warn};

use crate::assets::{numeric_value, AssetFeature, AssetLayer, Properties};
use crate::category::AssetCategory;
use crate::classify::{classify, resolve_depth, VulnerabilityClass};
use crate::config::CategoryConfig;
use crate::error::ImpactError;

/// Colonnes ajoutées aux attributs de chaque actif
pub const MAX_WATER_LEVEL: &str = "max_water_level";
pub const VOLUME: &str = "volume";
pub const MAX_DEPTH: &str = "max_depth";
pub const VULNERABILITY_CLASS: &str = "vulnerability_class";

/// Actif classé
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedFeature {
    pub geometry: Geometry,
    /// Attributs d'origine, sans les colonnes de classement
    pub properties: Properties,
    pub max_water_level: Option<f64>,
    pub volume: Option<f64>,
    pub max_depth: f64,
    pub vulnerability_class: VulnerabilityClass,
}

impl ClassifiedFeature {
    /// Attributs d'origine suivis des quatre colonnes de classement
    pub fn to_properties(&self) -> Properties {
        let mut properties = self.properties.clone();
        properties.insert(MAX_WATER_LEVEL.to_string(), number(self.max_water_level));
        properties.insert(VOLUME.to_string(), number(self.volume));
        properties.insert(MAX_DEPTH.to_string(), number(Some(self.max_depth)));
        properties.insert(
            VULNERABILITY_CLASS.to_string(),
            Value::from(self.vulnerability_class.value()),
        );
        properties
    }

    /// Reconstruit un actif classé depuis une feature relue
    pub fn from_feature(feature: AssetFeature, layer: &str, index: usize) -> Result<Self, ImpactError> {
        let AssetFeature {
            geometry,
            mut properties,
        } = feature;

        let invalid = |column: &str, value: &Value| ImpactError::InvalidReference {
            layer: layer.to_string(),
            column: column.to_string(),
            index,
            value: value.to_string(),
        };

        let max_water_level = properties.remove(MAX_WATER_LEVEL).and_then(|v| numeric_value(&v));
        let volume = properties.remove(VOLUME).and_then(|v| numeric_value(&v));

        let depth_value = properties.remove(MAX_DEPTH).unwrap_or(Value::Null);
        let max_depth = numeric_value(&depth_value).ok_or_else(|| invalid(MAX_DEPTH, &depth_value))?;

        let class_value = properties.remove(VULNERABILITY_CLASS).unwrap_or(Value::Null);
        let vulnerability_class = class_value
            .as_u64()
            .or_else(|| class_value.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as u64))
            .and_then(|v| u8::try_from(v).ok())
            .and_then(|v| VulnerabilityClass::try_from(v).ok())
            .ok_or_else(|| invalid(VULNERABILITY_CLASS, &class_value))?;

        Ok(Self {
            geometry,
            properties,
            max_water_level,
            volume,
            max_depth,
            vulnerability_class,
        })
    }
}

fn number(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

/// Couche classée d'une catégorie
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedAssetLayer {
    pub category: AssetCategory,
    pub features: Vec<ClassifiedFeature>,
    /// Actifs hors de l'emprise du raster, écartés
    pub dropped: usize,
}

impl ClassifiedAssetLayer {
    pub fn empty(category: AssetCategory) -> Self {
        Self {
            category,
            features: Vec::new(),
            dropped: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.category.layer_name()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Nombre d'actifs par classe, indexé par `VulnerabilityClass::index`
    pub fn class_counts(&self) -> [usize; 4] {
        let mut counts = [0; 4];
        for f in &self.features {
            counts[f.vulnerability_class.index()] += 1;
        }
        counts
    }

    /// Relit une couche depuis des features du conteneur vectoriel
    pub fn from_layer(category: AssetCategory, layer: AssetLayer) -> Result<Self, ImpactError> {
        let features = layer
            .features
            .into_iter()
            .enumerate()
            .map(|(index, f)| ClassifiedFeature::from_feature(f, &layer.name, index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            category,
            features,
            dropped: 0,
        })
    }
}

/// Évaluateur d'une catégorie, entièrement paramétré par sa configuration
#[derive(Debug, Clone, Copy)]
pub struct AssetEvaluator<'a> {
    config: &'a CategoryConfig,
}

impl<'a> AssetEvaluator<'a> {
    pub fn new(config: &'a CategoryConfig) -> Self {
        Self { config }
    }

    pub fn category(&self) -> AssetCategory {
        self.config.category
    }

    /// Classe chaque actif de la couche d'après le raster de niveau d'eau
    ///
    /// Une couche vide donne une couche classée vide. Une colonne de
    /// référence absente est fatale.
    pub fn evaluate(
        &self,
        layer: &AssetLayer,
        raster: &Raster,
    ) -> Result<ClassifiedAssetLayer, ImpactError> {
        let category = self.config.category;
        if layer.is_empty() {
            debug!(category = %category, "Empty asset layer, nothing to evaluate");
            return Ok(ClassifiedAssetLayer::empty(category));
        }

        let levels = layer.reference_levels(&self.config.reference_column)?;
        let geometries = layer.geometries();
        let stats = zonal::sample(raster, &geometries, self.config.sampling());
        let bounds = raster.bounds();

        let mut features = Vec::with_capacity(layer.len());
        let mut dropped = 0;
        for ((feature, level), s) in layer.features.iter().zip(levels).zip(stats) {
            let max_depth = resolve_depth(s.max, level, self.config.fill);
            let vulnerability_class = classify(max_depth, &self.config.thresholds);

            let Some(geometry) = clip::clip_to_rect(&feature.geometry, &bounds) else {
                dropped += 1;
                continue;
            };

            features.push(ClassifiedFeature {
                geometry,
                properties: feature.properties.clone(),
                max_water_level: s.max,
                volume: s.sum,
                max_depth,
                vulnerability_class,
            });
        }

        if dropped > 0 {
            warn!(
                category = %category,
                dropped,
                "Assets outside the raster extent dropped"
            );
        }

        let classified = ClassifiedAssetLayer {
            category,
            features,
            dropped,
        };
        debug!(
            category = %category,
            features = classified.len(),
            counts = ?classified.class_counts(),
            "Category evaluated"
        );
        Ok(classified)
    }
}
