//! Configuration du système
//!
//! Le fichier JSON est désérialisé en `ConfigFile`, complété par les presets
//! embarqués de chaque catégorie, puis validé en `ImpactConfig`.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use floodgrid::{Buffer, CapStyle};
use serde::{Deserialize, Serialize};

use crate::category::AssetCategory;
use crate::classify::{FillPolicy, Thresholds};
use crate::export::output_paths;

/// Format de `reference_time`
pub const REFERENCE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Produits écrits à chaque pas de temps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Conteneur vectoriel et raster d'impact; les rasters sont publiés
    #[default]
    Raster,
    /// Conteneur vectoriel seul; les conteneurs sont publiés
    #[serde(alias = "geoserver")]
    Vector,
}

/// Style d'extrémité tel qu'écrit dans le fichier de configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapSetting {
    Round,
    Square,
}

impl From<CapSetting> for CapStyle {
    fn from(cap: CapSetting) -> Self {
        match cap {
            CapSetting::Round => CapStyle::Round,
            CapSetting::Square => CapStyle::Square,
        }
    }
}

/// Fichier de configuration tel qu'écrit sur disque
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Heure de référence de la simulation (`YYYY-MM-DDTHH:MM`)
    pub reference_time: String,

    /// Décalage du début de simulation, en heures
    #[serde(default)]
    pub start_offset_hours: f64,

    /// Rasters de niveau d'eau, dans l'ordre de traitement
    #[serde(default)]
    pub rasters: Vec<PathBuf>,

    /// Dossier des rasters listés par `raster_names`
    #[serde(default)]
    pub raster_folder: Option<PathBuf>,

    /// Noms de rasters sans l'extension `.tif`
    #[serde(default)]
    pub raster_names: Vec<String>,

    /// Motif glob, correspondances triées
    #[serde(default)]
    pub raster_glob: Option<String>,

    #[serde(default)]
    pub output_folder: Option<PathBuf>,

    #[serde(default)]
    pub output_mode: OutputMode,

    /// Code EPSG imposé au raster d'impact
    #[serde(default)]
    pub epsg: Option<u16>,

    /// Ordre de composition; la dernière catégorie écrase les précédentes
    #[serde(default)]
    pub category_order: Option<Vec<AssetCategory>>,

    #[serde(default)]
    pub categories: BTreeMap<AssetCategory, CategoryFile>,

    #[serde(default)]
    pub parallel: bool,
}

/// Réglages d'une catégorie; tout champ omis prend la valeur du preset
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryFile {
    pub asset_file: Option<PathBuf>,
    pub reference_column: Option<String>,
    pub sample_buffer: Option<f64>,
    pub thresholds: Option<Thresholds>,
    pub fill_depth: Option<f64>,
    pub composite_buffer: Option<f64>,
    pub composite_cap: Option<CapSetting>,
    pub name_column: Option<String>,
}

/// Réglages résolus d'une catégorie
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryConfig {
    pub category: AssetCategory,
    /// Absent: la catégorie n'est pas évaluée
    pub asset_file: Option<PathBuf>,
    pub reference_column: String,
    pub sample_buffer: f64,
    pub thresholds: Thresholds,
    pub fill: FillPolicy,
    pub composite_buffer: Buffer,
    pub name_column: Option<String>,
}

impl CategoryConfig {
    /// Réglages embarqués d'une catégorie (sans fichier d'actifs)
    pub fn preset(category: AssetCategory) -> Result<Self> {
        let presets: BTreeMap<AssetCategory, CategoryFile> =
            serde_json::from_str(include_str!("presets/categories.json"))
                .context("Failed to parse embedded category presets")?;
        let preset = presets
            .get(&category)
            .with_context(|| format!("No embedded preset for {}", category.key()))?;
        Self::merge(category, preset, &CategoryFile::default())
    }

    fn merge(category: AssetCategory, preset: &CategoryFile, file: &CategoryFile) -> Result<Self> {
        let missing = |field: &str| format!("Missing '{}' for {}", field, category.key());

        let cap = file
            .composite_cap
            .or(preset.composite_cap)
            .with_context(|| missing("composite_cap"))?;
        let composite_distance = file
            .composite_buffer
            .or(preset.composite_buffer)
            .with_context(|| missing("composite_buffer"))?;

        Ok(Self {
            category,
            asset_file: file.asset_file.clone(),
            reference_column: file
                .reference_column
                .clone()
                .or_else(|| preset.reference_column.clone())
                .with_context(|| missing("reference_column"))?,
            sample_buffer: file
                .sample_buffer
                .or(preset.sample_buffer)
                .with_context(|| missing("sample_buffer"))?,
            thresholds: file
                .thresholds
                .or(preset.thresholds)
                .with_context(|| missing("thresholds"))?,
            fill: FillPolicy(
                file.fill_depth
                    .or(preset.fill_depth)
                    .with_context(|| missing("fill_depth"))?,
            ),
            composite_buffer: Buffer::new(composite_distance, cap.into()),
            name_column: file.name_column.clone().or_else(|| preset.name_column.clone()),
        })
    }

    /// Tampon d'échantillonnage (extrémités rondes)
    pub fn sampling(&self) -> Buffer {
        Buffer::round(self.sample_buffer)
    }

    fn as_file(&self) -> CategoryFile {
        CategoryFile {
            asset_file: self.asset_file.clone(),
            reference_column: Some(self.reference_column.clone()),
            sample_buffer: Some(self.sample_buffer),
            thresholds: Some(self.thresholds),
            fill_depth: Some(self.fill.depth()),
            composite_buffer: Some(self.composite_buffer.distance),
            composite_cap: Some(match self.composite_buffer.cap {
                CapStyle::Round => CapSetting::Round,
                CapStyle::Square => CapSetting::Square,
            }),
            name_column: self.name_column.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        let key = self.category.key();
        if !self.thresholds.is_ordered() {
            bail!(
                "Thresholds for {} must satisfy t0 <= t1 <= t2, got {:?}",
                key,
                <[f64; 3]>::from(self.thresholds)
            );
        }
        if !self.sample_buffer.is_finite() || self.sample_buffer < 0.0 {
            bail!("sample_buffer for {} must be >= 0, got {}", key, self.sample_buffer);
        }
        let composite = self.composite_buffer.distance;
        if !composite.is_finite() || composite < 0.0 {
            bail!("composite_buffer for {} must be >= 0, got {}", key, composite);
        }
        if self.reference_column.trim().is_empty() {
            bail!("reference_column for {} must not be empty", key);
        }
        if !self.fill.depth().is_finite() {
            bail!("fill_depth for {} must be finite", key);
        }
        Ok(())
    }
}

/// Configuration validée du moteur
#[derive(Debug, Clone)]
pub struct ImpactConfig {
    pub reference_time: NaiveDateTime,
    pub start_offset_hours: f64,
    pub rasters: Vec<PathBuf>,
    pub output_folder: Option<PathBuf>,
    pub output_mode: OutputMode,
    pub epsg: Option<u16>,
    pub category_order: Vec<AssetCategory>,
    pub categories: BTreeMap<AssetCategory, CategoryConfig>,
    pub parallel: bool,
}

impl ImpactConfig {
    /// Charge une configuration depuis un fichier
    ///
    /// Les chemins relatifs sont résolus depuis le dossier du fichier.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_json(&content, base_dir)
    }

    pub fn from_json(json: &str, base_dir: &Path) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json).context("Failed to parse config JSON")?;
        Self::from_file(file, base_dir)
    }

    pub fn from_file(file: ConfigFile, base_dir: &Path) -> Result<Self> {
        let reference_time = parse_reference_time(&file.reference_time)?;
        let rasters = collect_rasters(&file, base_dir)?;

        let mut categories = BTreeMap::new();
        for category in AssetCategory::ALL {
            let preset = CategoryConfig::preset(category)?;
            let mut config = match file.categories.get(&category) {
                Some(overrides) => CategoryConfig::merge(category, &preset.as_file(), overrides)?,
                None => preset,
            };
            config.asset_file = config.asset_file.map(|p| resolve(base_dir, &p));
            categories.insert(category, config);
        }

        let config = Self {
            reference_time,
            start_offset_hours: file.start_offset_hours,
            rasters,
            output_folder: file.output_folder.map(|p| resolve(base_dir, &p)),
            output_mode: file.output_mode,
            epsg: file.epsg,
            category_order: file
                .category_order
                .unwrap_or_else(|| AssetCategory::ALL.to_vec()),
            categories,
            parallel: file.parallel,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.rasters.is_empty() {
            bail!("No water-level raster configured (rasters, raster_names or raster_glob)");
        }
        if !self.start_offset_hours.is_finite() {
            bail!("start_offset_hours must be finite");
        }

        // Deux rasters de même nom écriraient les mêmes sorties
        let mut outputs = HashSet::new();
        for raster in &self.rasters {
            let (vector, _) = output_paths(raster, self.output_folder.as_deref());
            if !outputs.insert(vector.clone()) {
                bail!(
                    "Raster {} would overwrite the outputs of another raster ({})",
                    raster.display(),
                    vector.display()
                );
            }
        }

        let mut seen = HashSet::new();
        for category in &self.category_order {
            if !seen.insert(*category) {
                bail!("Category '{}' appears twice in category_order", category.key());
            }
        }

        for config in self.categories.values() {
            config.validate()?;
            if config.asset_file.is_some() && !seen.contains(&config.category) {
                bail!(
                    "Category '{}' has an asset_file but is missing from category_order",
                    config.category.key()
                );
            }
        }
        Ok(())
    }

    pub fn category(&self, category: AssetCategory) -> Option<&CategoryConfig> {
        self.categories.get(&category)
    }

    /// Catégories évaluées (avec fichier d'actifs), dans l'ordre de composition
    pub fn active_categories(&self) -> Vec<&CategoryConfig> {
        self.category_order
            .iter()
            .filter_map(|c| self.categories.get(c))
            .filter(|c| c.asset_file.is_some())
            .collect()
    }
}

/// Parse l'heure de référence (`YYYY-MM-DDTHH:MM`, secondes tolérées)
pub fn parse_reference_time(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), REFERENCE_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M:%S"))
        .with_context(|| {
            format!(
                "Invalid reference_time '{}'. Expected YYYY-MM-DDTHH:MM (e.g., 2024-03-01T06:00)",
                value
            )
        })
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Liste ordonnée des rasters: liste explicite, puis noms, puis motif glob
fn collect_rasters(file: &ConfigFile, base_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut rasters: Vec<PathBuf> = file.rasters.iter().map(|p| resolve(base_dir, p)).collect();

    if !file.raster_names.is_empty() {
        let folder = file
            .raster_folder
            .as_ref()
            .map(|f| resolve(base_dir, f))
            .context("raster_names requires raster_folder")?;
        rasters.extend(
            file.raster_names
                .iter()
                .map(|name| folder.join(format!("{}.tif", name))),
        );
    }

    if let Some(pattern) = &file.raster_glob {
        let full = resolve(base_dir, Path::new(pattern));
        let full = full.to_string_lossy();
        let mut matches = glob::glob(&full)
            .with_context(|| format!("Invalid raster_glob pattern: {}", pattern))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("Cannot read matches of {}", pattern))?;
        matches.sort();
        rasters.extend(matches);
    }

    Ok(rasters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> &'static str {
        r#"{
            "reference_time": "2024-03-01T06:00",
            "rasters": ["out/depth_001.tif", "/abs/depth_002.tif"],
            "categories": {
                "buildings": {"asset_file": "assets/buildings.geojson"},
                "council_assets": {"asset_file": "assets/council.geojson", "thresholds": [-0.5, 0, 0.5]}
            }
        }"#
    }

    #[test]
    fn test_presets() {
        let buildings = CategoryConfig::preset(AssetCategory::Buildings).unwrap();
        assert_eq!(buildings.sample_buffer, 2.0);
        assert_eq!(buildings.thresholds, Thresholds::BUILDINGS);
        assert_eq!(buildings.fill, FillPolicy::ZERO);
        assert_eq!(buildings.composite_buffer, Buffer::square(10.0));

        let roads = CategoryConfig::preset(AssetCategory::RoadClosurePoints).unwrap();
        assert_eq!(roads.sample_buffer, 15.0);
        assert_eq!(roads.reference_column, "road_level");
        assert_eq!(roads.fill, FillPolicy::SENTINEL);
        assert_eq!(roads.composite_buffer, Buffer::round(7.0));

        let evac = CategoryConfig::preset(AssetCategory::EvacuationCentres).unwrap();
        assert_eq!(evac.sample_buffer, 100.0);
        assert_eq!(evac.composite_buffer, Buffer::round(30.0));

        let council = CategoryConfig::preset(AssetCategory::CouncilAssets).unwrap();
        assert_eq!(council.thresholds, Thresholds::INFRASTRUCTURE);
        assert_eq!(council.composite_buffer, Buffer::square(20.0));
    }

    #[test]
    fn test_load_minimal() {
        let config = ImpactConfig::from_json(minimal(), Path::new("/data/run")).unwrap();
        assert_eq!(config.rasters[0], PathBuf::from("/data/run/out/depth_001.tif"));
        assert_eq!(config.rasters[1], PathBuf::from("/abs/depth_002.tif"));
        assert_eq!(config.output_mode, OutputMode::Raster);
        assert_eq!(config.category_order, AssetCategory::ALL.to_vec());

        let active: Vec<_> = config.active_categories().iter().map(|c| c.category).collect();
        assert_eq!(
            active,
            vec![AssetCategory::Buildings, AssetCategory::CouncilAssets]
        );

        let council = config.category(AssetCategory::CouncilAssets).unwrap();
        assert_eq!(council.thresholds, Thresholds::new(-0.5, 0.0, 0.5));
        // Le reste vient du preset
        assert_eq!(council.reference_column, "asset_level");
        assert_eq!(
            council.asset_file.as_deref(),
            Some(Path::new("/data/run/assets/council.geojson"))
        );
    }

    #[test]
    fn test_output_mode_geoserver_alias() {
        let mode: OutputMode = serde_json::from_str("\"geoserver\"").unwrap();
        assert_eq!(mode, OutputMode::Vector);
    }

    #[test]
    fn test_raster_names() {
        let json = r#"{
            "reference_time": "2024-03-01T06:00",
            "raster_folder": "results",
            "raster_names": ["flood_h_003_00", "flood_h_006_00"]
        }"#;
        let config = ImpactConfig::from_json(json, Path::new("")).unwrap();
        assert_eq!(
            config.rasters,
            vec![
                PathBuf::from("results/flood_h_003_00.tif"),
                PathBuf::from("results/flood_h_006_00.tif"),
            ]
        );
    }

    #[test]
    fn test_unordered_thresholds_rejected() {
        let json = r#"{
            "reference_time": "2024-03-01T06:00",
            "rasters": ["a_001.tif"],
            "categories": {"buildings": {"thresholds": [1, 0.25, 0]}}
        }"#;
        assert!(ImpactConfig::from_json(json, Path::new("")).is_err());
    }

    #[test]
    fn test_duplicate_order_rejected() {
        let json = r#"{
            "reference_time": "2024-03-01T06:00",
            "rasters": ["a_001.tif"],
            "category_order": ["buildings", "buildings"]
        }"#;
        assert!(ImpactConfig::from_json(json, Path::new("")).is_err());
    }

    #[test]
    fn test_incomplete_order_rejected() {
        let json = r#"{
            "reference_time": "2024-03-01T06:00",
            "rasters": ["a_001.tif"],
            "category_order": ["buildings"],
            "categories": {"council_assets": {"asset_file": "c.geojson"}}
        }"#;
        let err = ImpactConfig::from_json(json, Path::new("")).unwrap_err();
        assert!(err.to_string().contains("council_assets"));
    }

    #[test]
    fn test_duplicate_raster_stem_rejected() {
        let json = r#"{
            "reference_time": "2024-03-01T06:00",
            "rasters": ["run_a/depth_003.tif", "run_b/depth_003.tif"],
            "output_folder": "out"
        }"#;
        let err = ImpactConfig::from_json(json, Path::new("")).unwrap_err();
        assert!(err.to_string().contains("depth_003_vulnerability.json"));

        // Sans dossier de sortie commun, chaque raster écrit à côté de lui
        let json = r#"{
            "reference_time": "2024-03-01T06:00",
            "rasters": ["run_a/depth_003.tif", "run_b/depth_003.tif"]
        }"#;
        assert!(ImpactConfig::from_json(json, Path::new("")).is_ok());
    }

    #[test]
    fn test_no_raster_rejected() {
        let json = r#"{"reference_time": "2024-03-01T06:00"}"#;
        assert!(ImpactConfig::from_json(json, Path::new("")).is_err());
    }

    #[test]
    fn test_negative_buffer_rejected() {
        let json = r#"{
            "reference_time": "2024-03-01T06:00",
            "rasters": ["a_001.tif"],
            "categories": {"road_closure_points": {"sample_buffer": -1}}
        }"#;
        assert!(ImpactConfig::from_json(json, Path::new("")).is_err());
    }

    #[test]
    fn test_parse_reference_time() {
        let t = parse_reference_time("2024-03-01T06:30").unwrap();
        assert_eq!(t.format("%Y-%m-%d %H:%M").to_string(), "2024-03-01 06:30");
        assert!(parse_reference_time("2024-03-01T06:30:15").is_ok());
        assert!(parse_reference_time("01/03/2024").is_err());
    }
}
