//! # flood-impact
//!
//! Classement de la vulnérabilité des actifs exposés à une inondation et
//! composition des cartes d'impact, pas de temps par pas de temps.
//!
//! ## Features
//!
//! - Quatre catégories d'actifs: bâtiments, points de fermeture de route,
//!   centres d'évacuation, équipements communaux
//! - Échantillonnage du raster de niveau d'eau sous tampon, hauteur d'eau
//!   au-dessus du niveau de référence, classe 1 à 4
//! - Conteneur vectoriel multi-couches et raster d'impact par pas de temps
//! - Tableaux de synthèse (par actif, par zone) et guide d'impact
//!
//! ## Usage CLI
//!
//! ```bash
//! # Traiter tous les pas de temps d'une configuration
//! flood-impact run --config ./impact.json --report ./report.json
//!
//! # Détail par actif d'un conteneur écrit
//! flood-impact summarize --vector ./depth_003_vulnerability.json --category buildings
//! ```

pub mod assets;
pub mod category;
pub mod classify;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod export;
pub mod orchestrator;
pub mod report;
pub mod summary;
pub mod timestep;

pub use category::AssetCategory;
pub use classify::{classify, resolve_depth, FillPolicy, Thresholds, VulnerabilityClass};
pub use config::{ImpactConfig, OutputMode};
pub use error::ImpactError;
pub use evaluate::{AssetEvaluator, ClassifiedAssetLayer};
pub use orchestrator::{BatchOutput, TimestepOrchestrator};
pub use report::{ImpactReport, ImpactStatus};
