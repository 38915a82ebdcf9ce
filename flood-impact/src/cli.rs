//! Définition et implémentation des commandes CLI
//!
//! - `run`: traite tous les pas de temps d'une configuration
//! - `summarize`: détail par actif (et par zone) d'un conteneur écrit
//! - `guide`: bornes de hauteur d'eau de chaque classe

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::{info, warn};

use flood_impact::category::AssetCategory;
use flood_impact::classify::VulnerabilityClass;
use flood_impact::config::{CategoryConfig, ImpactConfig, REFERENCE_TIME_FORMAT};
use flood_impact::export::container;
use flood_impact::orchestrator::TimestepOrchestrator;
use flood_impact::report::ImpactReport;
use flood_impact::summary;

#[derive(Subcommand)]
pub enum Commands {
    /// Classify assets and write impact products for every timestep
    Run {
        /// Path to the JSON configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Write the batch report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print the per-asset breakdown of a written vector container
    Summarize {
        /// Path to a `*_vulnerability.json` container
        #[arg(long)]
        vector: PathBuf,

        /// Category key or layer name (default: all categories)
        #[arg(long)]
        category: Option<AssetCategory>,

        /// GeoJSON zones (polygons with `Name` and `Type`) for the zone breakdown
        #[arg(long)]
        zones: Option<PathBuf>,

        /// Only count zones of this `Type` (default: all zones)
        #[arg(long, requires = "zones")]
        zone_type: Option<String>,

        /// Configuration providing the name column of each category
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the impact guide (depth bands of each class)
    Guide {
        /// Path to the JSON configuration (default: built-in presets)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn cmd_run(config_path: &Path, report_path: Option<&Path>) -> Result<()> {
    let start = Instant::now();
    let config = ImpactConfig::load(config_path)?;
    let reference = config.reference_time.format(REFERENCE_TIME_FORMAT).to_string();

    println!("=== Impact run {} ===", reference);
    println!("Config: {}", config_path.display());
    println!("Timesteps: {}", config.rasters.len());
    println!("Output mode: {:?}", config.output_mode);
    println!(
        "Categories: {}",
        config
            .active_categories()
            .iter()
            .map(|c| c.category.layer_name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let result = TimestepOrchestrator::new(&config).run();

    let mut report = match &result {
        Ok(batch) => ImpactReport::from_batch(&reference, batch),
        Err(e) => {
            let mut report = ImpactReport::new(&reference);
            report.record_failure(&format!("{:#}", e));
            report
        }
    };
    report.set_duration(start.elapsed());
    report.finalize();
    report.display();

    if let Some(path) = report_path {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
    }

    let batch = result?;
    println!("\nUploads:");
    for (path, timestamp) in batch.uploads() {
        println!("  {}\t{}", timestamp.format("%Y-%m-%dT%H:%M:%S"), path.display());
    }

    info!(summary = %report.summary(), "Run complete");
    Ok(())
}

pub fn cmd_summarize(
    vector: &Path,
    category: Option<AssetCategory>,
    zones_path: Option<&Path>,
    zone_type: Option<&str>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = config_path.map(ImpactConfig::load).transpose()?;
    let zones = zones_path.map(summary::read_zones).transpose()?.unwrap_or_default();

    let layers = match category {
        Some(category) => vec![container::read_classified(vector, category)
            .with_context(|| format!("Failed to read {} from {}", category, vector.display()))?],
        None => container::read_all_classified(vector)
            .with_context(|| format!("Failed to read {}", vector.display()))?,
    };

    for layer in &layers {
        let category = layer.category;
        let name_column = match &config {
            Some(config) => config.category(category).and_then(|c| c.name_column.clone()),
            None => CategoryConfig::preset(category)?.name_column,
        };

        println!("\n=== {} ({} assets) ===", category, layer.len());
        if layer.is_empty() {
            warn!(category = %category, "No classified assets");
            continue;
        }
        let tally: Vec<String> = VulnerabilityClass::ALL
            .iter()
            .zip(layer.class_counts())
            .map(|(class, count)| format!("{} {}", class.label(), count))
            .collect();
        println!("  {}", tally.join(", "));

        for row in summary::asset_breakdown(layer, name_column.as_deref(), &zones) {
            println!(
                "  {:<40} {:>10} {:<10} {}",
                row.name,
                row.max_depth,
                row.impact,
                row.suburb_zone.as_deref().unwrap_or("-")
            );
        }
    }

    if zones_path.is_some() {
        let rows = summary::zone_breakdown(&zones, &layers, zone_type);
        println!("\n=== Zones ({}) ===", zone_type.unwrap_or("all types"));
        for row in rows {
            println!(
                "  {:<30} {:<20} {:>5} | none {} minor {} moderate {} severe {}",
                row.zone,
                row.category.layer_name(),
                row.count,
                row.none,
                row.minor,
                row.moderate,
                row.severe
            );
        }
    }
    Ok(())
}

pub fn cmd_guide(config_path: Option<&Path>) -> Result<()> {
    let configs: Vec<CategoryConfig> = match config_path {
        Some(path) => {
            let config = ImpactConfig::load(path)?;
            config
                .category_order
                .iter()
                .filter_map(|c| config.category(*c).cloned())
                .collect()
        }
        None => AssetCategory::ALL
            .into_iter()
            .map(CategoryConfig::preset)
            .collect::<Result<_>>()?,
    };

    for table in summary::impact_guide(&configs) {
        println!("\n=== {} ===", table.category);
        println!("  {:<20} Impact", table.header);
        for (band, class) in &table.rows {
            println!("  {:<20} {}", band, class.label());
        }
    }
    Ok(())
}
