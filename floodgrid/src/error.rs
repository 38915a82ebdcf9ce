//! Types d'erreurs pour le crate floodgrid

use thiserror::Error;

/// Erreurs pouvant survenir lors de la lecture ou de l'écriture d'une grille
#[derive(Debug, Error)]
pub enum GridError {
    /// Erreur d'I/O lors de l'accès au fichier raster
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Fichier TIFF illisible ou corrompu
    #[error("TIFF error in {file}: {reason}")]
    Tiff { file: String, reason: String },

    /// Type de pixel ou disposition de bandes non supporté
    #[error("Unsupported raster layout: {0}")]
    Unsupported(String),

    /// Dimensions incohérentes entre les données et la grille
    #[error("Invalid raster dimensions: {rows}x{cols} for {len} values")]
    InvalidDimensions { rows: usize, cols: usize, len: usize },

    /// Géoréférencement absent ou dégénéré
    #[error("Missing georeferencing in {0}")]
    MissingGeoreference(String),
}

impl GridError {
    /// Crée une erreur TIFF avec contexte
    pub fn tiff(file: impl Into<String>, reason: impl ToString) -> Self {
        Self::Tiff {
            file: file.into(),
            reason: reason.to_string(),
        }
    }
}
