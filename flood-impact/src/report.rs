//! Rapport de traitement d'un lot de pas de temps
//!
//! Comptages par pas de temps et par catégorie, fichiers écrits, statut
//! global. Affichage console ou sauvegarde JSON.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use crate::orchestrator::{BatchOutput, LayerOutcome, TimestepOutput};

/// Statut global du lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImpactStatus {
    /// Tous les pas de temps traités
    Success,
    /// Traités, mais aucun actif évalué
    NoAssets,
    /// Lot interrompu
    Failed,
}

/// Comptages d'une catégorie
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub features: usize,
    /// Hors emprise du raster
    pub dropped: usize,
    pub none: usize,
    pub minor: usize,
    pub moderate: usize,
    pub severe: usize,
}

impl CategoryStats {
    fn add(&mut self, outcome: &LayerOutcome) {
        self.features += outcome.features;
        self.dropped += outcome.dropped;
        self.none += outcome.counts[0];
        self.minor += outcome.counts[1];
        self.moderate += outcome.counts[2];
        self.severe += outcome.counts[3];
    }
}

impl From<&LayerOutcome> for CategoryStats {
    fn from(outcome: &LayerOutcome) -> Self {
        let mut stats = Self::default();
        stats.add(outcome);
        stats
    }
}

/// Détail d'un pas de temps
#[derive(Debug, Clone, Serialize)]
pub struct TimestepReport {
    pub source: PathBuf,
    pub timestamp: String,
    pub files: Vec<PathBuf>,
    pub categories: BTreeMap<String, CategoryStats>,
}

/// Rapport complet du lot
#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    /// Heure de référence du lot
    pub reference_time: String,
    pub duration_secs: f64,
    pub status: ImpactStatus,

    pub timesteps_processed: usize,
    pub files_written: usize,
    pub features_classified: usize,
    pub features_dropped: usize,

    /// Cumul sur tous les pas de temps
    pub by_category: BTreeMap<String, CategoryStats>,
    pub timesteps: Vec<TimestepReport>,

    /// Cause de l'interruption
    pub error: Option<String>,
}

impl Default for ImpactReport {
    fn default() -> Self {
        Self {
            reference_time: String::new(),
            duration_secs: 0.0,
            status: ImpactStatus::Success,
            timesteps_processed: 0,
            files_written: 0,
            features_classified: 0,
            features_dropped: 0,
            by_category: BTreeMap::new(),
            timesteps: Vec::new(),
            error: None,
        }
    }
}

impl ImpactReport {
    pub fn new(reference_time: &str) -> Self {
        Self {
            reference_time: reference_time.to_string(),
            ..Default::default()
        }
    }

    /// Rapport d'un lot terminé
    pub fn from_batch(reference_time: &str, batch: &BatchOutput) -> Self {
        let mut report = Self::new(reference_time);
        for timestep in &batch.timesteps {
            report.record_timestep(timestep);
        }
        report
    }

    /// Enregistre un pas de temps traité
    pub fn record_timestep(&mut self, output: &TimestepOutput) {
        let mut files = vec![output.vector_path.clone()];
        files.extend(output.raster_path.iter().cloned());

        let mut categories = BTreeMap::new();
        for outcome in &output.layers {
            let name = outcome.category.layer_name().to_string();
            self.features_classified += outcome.features;
            self.features_dropped += outcome.dropped;
            self.by_category.entry(name.clone()).or_default().add(outcome);
            categories.insert(name, CategoryStats::from(outcome));
        }

        self.timesteps_processed += 1;
        self.files_written += files.len();
        self.timesteps.push(TimestepReport {
            source: output.source.clone(),
            timestamp: output.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            files,
            categories,
        });
    }

    /// Enregistre l'erreur ayant interrompu le lot
    pub fn record_failure(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.status = if self.error.is_some() {
            ImpactStatus::Failed
        } else if self.features_classified == 0 {
            ImpactStatus::NoAssets
        } else {
            ImpactStatus::Success
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("IMPACT REPORT - Reference time {}", self.reference_time);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Timesteps: {} processed, {} files written",
            self.timesteps_processed, self.files_written
        );
        println!(
            "Features: {} classified, {} outside raster extent",
            self.features_classified, self.features_dropped
        );

        if !self.by_category.is_empty() {
            println!("\n--- BY CATEGORY ---");
            for (name, stats) in &self.by_category {
                println!(
                    "  {}: {} features, {} none, {} minor, {} moderate, {} severe, {} dropped",
                    name,
                    stats.features,
                    stats.none,
                    stats.minor,
                    stats.moderate,
                    stats.severe,
                    stats.dropped
                );
            }
        }

        if !self.timesteps.is_empty() {
            println!("\n--- TIMESTEPS ({}) ---", self.timesteps.len());
            for t in self.timesteps.iter().take(20) {
                println!("  [{}] {}", t.timestamp, t.source.display());
            }
            if self.timesteps.len() > 20 {
                println!("  ... and {} more", self.timesteps.len() - 20);
            }
        }

        if let Some(ref error) = self.error {
            println!("\n--- ERROR ---");
            println!("  {}", error);
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} timesteps, {} features classified, {} dropped, {} files",
            self.reference_time,
            self.timesteps_processed,
            self.features_classified,
            self.features_dropped,
            self.files_written
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::AssetCategory;
    use crate::config::OutputMode;
    use chrono::NaiveDate;

    fn timestep(hour: u32, raster: bool) -> TimestepOutput {
        TimestepOutput {
            source: PathBuf::from(format!("depth_{:03}.tif", hour)),
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .and_then(|d| d.and_hms_opt(hour, 0, 0))
                .unwrap(),
            vector_path: PathBuf::from(format!("depth_{:03}_vulnerability.json", hour)),
            raster_path: raster.then(|| PathBuf::from(format!("depth_{:03}_vulnerability.tif", hour))),
            layers: vec![
                LayerOutcome {
                    category: AssetCategory::Buildings,
                    features: 3,
                    dropped: 1,
                    counts: [1, 1, 0, 1],
                },
                LayerOutcome {
                    category: AssetCategory::CouncilAssets,
                    features: 2,
                    dropped: 0,
                    counts: [0, 0, 2, 0],
                },
            ],
        }
    }

    #[test]
    fn test_impact_report_default() {
        let report = ImpactReport::default();
        assert_eq!(report.status, ImpactStatus::Success);
        assert_eq!(report.timesteps_processed, 0);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_from_batch_accumulates() {
        let batch = BatchOutput {
            mode: OutputMode::Raster,
            timesteps: vec![timestep(1, true), timestep(2, true)],
        };
        let mut report = ImpactReport::from_batch("2024-03-01T00:00", &batch);
        report.finalize();

        assert_eq!(report.status, ImpactStatus::Success);
        assert_eq!(report.timesteps_processed, 2);
        assert_eq!(report.files_written, 4);
        assert_eq!(report.features_classified, 10);
        assert_eq!(report.features_dropped, 2);

        let buildings = report.by_category.get("Buildings").unwrap();
        assert_eq!(buildings.features, 6);
        assert_eq!(buildings.severe, 2);
        assert_eq!(report.by_category.get("Council Assets").unwrap().moderate, 4);

        assert_eq!(report.timesteps[0].timestamp, "2024-03-01T01:00:00");
    }

    #[test]
    fn test_vector_mode_files() {
        let mut report = ImpactReport::new("2024-03-01T00:00");
        report.record_timestep(&timestep(3, false));
        assert_eq!(report.files_written, 1);
        assert_eq!(report.timesteps[0].files.len(), 1);
    }

    #[test]
    fn test_finalize_no_assets() {
        let mut report = ImpactReport::new("2024-03-01T00:00");
        let mut empty = timestep(1, true);
        empty.layers.clear();
        report.record_timestep(&empty);
        report.finalize();
        assert_eq!(report.status, ImpactStatus::NoAssets);
    }

    #[test]
    fn test_finalize_failed() {
        let mut report = ImpactReport::new("2024-03-01T00:00");
        report.record_timestep(&timestep(1, true));
        report.record_failure("Failed to open raster");
        report.finalize();
        assert_eq!(report.status, ImpactStatus::Failed);
    }

    #[test]
    fn test_summary() {
        let mut report = ImpactReport::new("2024-03-01T00:00");
        report.record_timestep(&timestep(1, true));
        assert_eq!(
            report.summary(),
            "2024-03-01T00:00: 1 timesteps, 5 features classified, 1 dropped, 2 files"
        );
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut report = ImpactReport::new("2024-03-01T00:00");
        report.record_timestep(&timestep(1, true));
        report.save_to_file(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["timesteps_processed"], 1);
        assert_eq!(value["by_category"]["Buildings"]["minor"], 1);
    }
}
