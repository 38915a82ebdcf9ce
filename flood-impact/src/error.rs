//! Types d'erreurs pour le moteur de classification

use std::path::PathBuf;

use floodgrid::GridError;
use thiserror::Error;

/// Erreurs du moteur de classification et de composition
#[derive(Debug, Error)]
pub enum ImpactError {
    /// Raster de niveau d'eau illisible (fatal pour le pas de temps)
    #[error("Cannot open water-level raster {path}: {source}")]
    RasterOpen {
        path: PathBuf,
        #[source]
        source: GridError,
    },

    /// Écriture du raster d'impact impossible
    #[error("Cannot write impact raster {path}: {source}")]
    RasterWrite {
        path: PathBuf,
        #[source]
        source: GridError,
    },

    /// Fichier d'actifs illisible
    #[error("Cannot read asset file {path}: {source}")]
    AssetFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// GeoJSON invalide
    #[error("Invalid GeoJSON in {source_name}: {reason}")]
    GeoJson { source_name: String, reason: String },

    /// Colonne de référence absente du schéma de la couche
    #[error("Layer '{layer}' has no reference column '{column}'")]
    MissingColumn { layer: String, column: String },

    /// Valeur de référence absente ou non numérique sur une feature
    #[error("Feature #{index} of layer '{layer}' has an invalid '{column}' value: {value}")]
    InvalidReference {
        layer: String,
        column: String,
        index: usize,
        value: String,
    },

    /// Nom de fichier sans décalage horaire exploitable
    #[error("Cannot derive a timestep offset from file name '{0}'")]
    Timestep(String),

    /// Conteneur vectoriel mal formé
    #[error("Invalid vector container {path}: {reason}")]
    Container { path: String, reason: String },

    /// Erreur d'encodage de géométrie
    #[error("Geometry encoding error: {0}")]
    Geometry(#[from] geozero::error::GeozeroError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ImpactError {
    /// Crée une erreur GeoJSON avec contexte
    pub fn geojson(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::GeoJson {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// Crée une erreur de conteneur avec contexte
    pub fn container(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Container {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
