//! Traitement de la série de rasters, un pas de temps après l'autre
//!
//! Chaque pas de temps est indépendant: raster ouvert, catégories évaluées
//! dans l'ordre configuré, conteneur vectoriel écrit, raster d'impact
//! composé en mode `raster`. Le premier échec interrompt tout le lot.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use floodgrid::{Buffer, Raster};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::assets::AssetLayer;
use crate::category::AssetCategory;
use crate::config::{ImpactConfig, OutputMode};
use crate::error::ImpactError;
use crate::evaluate::{AssetEvaluator, ClassifiedAssetLayer};
use crate::export::{container, output_paths, raster};
use crate::timestep;

/// Résultat d'une catégorie pour un pas de temps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerOutcome {
    pub category: AssetCategory,
    pub features: usize,
    pub dropped: usize,
    /// Comptage par classe: None, Minor, Moderate, Severe
    pub counts: [usize; 4],
}

impl From<&ClassifiedAssetLayer> for LayerOutcome {
    fn from(layer: &ClassifiedAssetLayer) -> Self {
        Self {
            category: layer.category,
            features: layer.len(),
            dropped: layer.dropped,
            counts: layer.class_counts(),
        }
    }
}

/// Fichiers produits pour un pas de temps
#[derive(Debug, Clone, Serialize)]
pub struct TimestepOutput {
    /// Raster de niveau d'eau en entrée
    pub source: PathBuf,
    pub timestamp: NaiveDateTime,
    pub vector_path: PathBuf,
    pub raster_path: Option<PathBuf>,
    pub layers: Vec<LayerOutcome>,
}

/// Résultat du lot, dans l'ordre des rasters configurés
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutput {
    pub mode: OutputMode,
    pub timesteps: Vec<TimestepOutput>,
}

impl BatchOutput {
    /// Liste `(fichier, horodatage)` à publier
    ///
    /// Rasters d'impact en mode `raster`, conteneurs vectoriels sinon.
    pub fn uploads(&self) -> Vec<(PathBuf, NaiveDateTime)> {
        self.timesteps
            .iter()
            .map(|t| {
                let path = match (self.mode, &t.raster_path) {
                    (OutputMode::Raster, Some(raster)) => raster.clone(),
                    _ => t.vector_path.clone(),
                };
                (path, t.timestamp)
            })
            .collect()
    }
}

pub struct TimestepOrchestrator<'a> {
    config: &'a ImpactConfig,
}

impl<'a> TimestepOrchestrator<'a> {
    pub fn new(config: &'a ImpactConfig) -> Self {
        Self { config }
    }

    /// Traite tous les rasters configurés
    pub fn run(&self) -> Result<BatchOutput> {
        let rasters = &self.config.rasters;
        info!(
            timesteps = rasters.len(),
            mode = ?self.config.output_mode,
            parallel = self.config.parallel,
            "Starting impact batch"
        );

        let timesteps = if self.config.parallel {
            rasters
                .par_iter()
                .map(|path| self.process(path))
                .collect::<Result<Vec<_>>>()?
        } else {
            rasters
                .iter()
                .map(|path| self.process(path))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(BatchOutput {
            mode: self.config.output_mode,
            timesteps,
        })
    }

    /// Traite un pas de temps
    pub fn process(&self, raster_path: &Path) -> Result<TimestepOutput> {
        let timestamp = timestep::timestamp(
            raster_path,
            self.config.reference_time,
            self.config.start_offset_hours,
        )?;

        let water_level =
            floodgrid::open(raster_path).map_err(|source| ImpactError::RasterOpen {
                path: raster_path.to_path_buf(),
                source,
            })?;

        let layers = self
            .evaluate_all(&water_level)
            .with_context(|| format!("Failed to evaluate assets for {}", raster_path.display()))?;

        let (vector_path, impact_path) =
            output_paths(raster_path, self.config.output_folder.as_deref());
        if let Some(folder) = vector_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(folder)
                .with_context(|| format!("Cannot create output folder {}", folder.display()))?;
        }

        let epsg = self.config.epsg.or(water_level.epsg());
        container::merge(&layers, epsg, &vector_path)?;

        let raster_path_out = match self.config.output_mode {
            OutputMode::Raster => {
                let impact = self.composite(&layers, &water_level).with_epsg(epsg);
                raster::write_impact_raster(&impact, &impact_path)?;
                Some(impact_path)
            }
            OutputMode::Vector => None,
        };

        info!(
            source = %raster_path.display(),
            timestamp = %timestamp,
            vector = %vector_path.display(),
            "Timestep processed"
        );

        Ok(TimestepOutput {
            source: raster_path.to_path_buf(),
            timestamp,
            vector_path,
            raster_path: raster_path_out,
            layers: layers.iter().map(LayerOutcome::from).collect(),
        })
    }

    /// Évalue chaque catégorie active, dans l'ordre de composition
    pub fn evaluate_all(
        &self,
        water_level: &Raster,
    ) -> Result<Vec<ClassifiedAssetLayer>, ImpactError> {
        let mut layers = Vec::new();
        for config in self.config.active_categories() {
            let Some(asset_file) = &config.asset_file else {
                continue;
            };
            // Relu à chaque pas de temps: aucun état partagé entre pas de temps
            let assets = AssetLayer::read(asset_file, config.category.layer_name())?;
            let classified = AssetEvaluator::new(config).evaluate(&assets, water_level)?;
            layers.push(classified);
        }
        Ok(layers)
    }

    /// Raster d'impact, tampons de composition de chaque catégorie
    pub fn composite(&self, layers: &[ClassifiedAssetLayer], template: &Raster) -> Raster {
        let inputs: Vec<(&ClassifiedAssetLayer, Buffer)> = layers
            .iter()
            .filter_map(|layer| {
                let buffer = self.config.category(layer.category)?.composite_buffer;
                Some((layer, buffer))
            })
            .collect();
        debug!(layers = inputs.len(), "Compositing impact raster");
        raster::composite(&inputs, template)
    }
}
