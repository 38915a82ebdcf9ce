//! Hauteur d'eau et classe de vulnérabilité
//!
//! Règle de classement, pour des seuils (t0, t1, t2):
//!
//! ```text
//! depth <= t0        → None      (1)
//! t0 < depth < t1    → Minor     (2)
//! t1 <= depth < t2   → Moderate  (3)
//! depth >= t2        → Severe    (4)
//! ```
//!
//! La borne t0 appartient à la classe basse, t1 et t2 à la classe haute.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classe ordinale de vulnérabilité
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
#[repr(u8)]
pub enum VulnerabilityClass {
    None = 1,
    Minor = 2,
    Moderate = 3,
    Severe = 4,
}

impl VulnerabilityClass {
    /// Du moins au plus sévère
    pub const ALL: [VulnerabilityClass; 4] = [
        VulnerabilityClass::None,
        VulnerabilityClass::Minor,
        VulnerabilityClass::Moderate,
        VulnerabilityClass::Severe,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    /// Libellé d'impact
    pub fn label(self) -> &'static str {
        match self {
            VulnerabilityClass::None => "None",
            VulnerabilityClass::Minor => "Minor",
            VulnerabilityClass::Moderate => "Moderate",
            VulnerabilityClass::Severe => "Severe",
        }
    }

    /// Indice 0..4, pour les tableaux de comptage
    pub fn index(self) -> usize {
        self as usize - 1
    }
}

impl From<VulnerabilityClass> for u8 {
    fn from(class: VulnerabilityClass) -> Self {
        class.value()
    }
}

impl TryFrom<u8> for VulnerabilityClass {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VulnerabilityClass::None),
            2 => Ok(VulnerabilityClass::Minor),
            3 => Ok(VulnerabilityClass::Moderate),
            4 => Ok(VulnerabilityClass::Severe),
            other => Err(format!("Invalid vulnerability class: {}", other)),
        }
    }
}

impl fmt::Display for VulnerabilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Seuils (t0, t1, t2) d'une catégorie, sérialisés en tableau `[t0, t1, t2]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Thresholds {
    pub t0: f64,
    pub t1: f64,
    pub t2: f64,
}

impl Thresholds {
    /// Hauteur au-dessus du plancher
    pub const BUILDINGS: Thresholds = Thresholds::new(0.0, 0.25, 1.0);
    /// Hauteur au-dessus du niveau de route, de plancher ou de base
    pub const INFRASTRUCTURE: Thresholds = Thresholds::new(-0.3, 0.0, 0.15);

    pub const fn new(t0: f64, t1: f64, t2: f64) -> Self {
        Self { t0, t1, t2 }
    }

    /// t0 <= t1 <= t2, toutes finies
    pub fn is_ordered(&self) -> bool {
        [self.t0, self.t1, self.t2].iter().all(|t| t.is_finite())
            && self.t0 <= self.t1
            && self.t1 <= self.t2
    }
}

impl From<[f64; 3]> for Thresholds {
    fn from([t0, t1, t2]: [f64; 3]) -> Self {
        Self::new(t0, t1, t2)
    }
}

impl From<Thresholds> for [f64; 3] {
    fn from(t: Thresholds) -> Self {
        [t.t0, t.t1, t.t2]
    }
}

/// Classe une hauteur d'eau
///
/// Aucune gestion des valeurs manquantes ici: la hauteur doit avoir été
/// résolue par [`resolve_depth`] avant l'appel.
pub fn classify(depth: f64, thresholds: &Thresholds) -> VulnerabilityClass {
    if depth <= thresholds.t0 {
        VulnerabilityClass::None
    } else if depth < thresholds.t1 {
        VulnerabilityClass::Minor
    } else if depth < thresholds.t2 {
        VulnerabilityClass::Moderate
    } else {
        VulnerabilityClass::Severe
    }
}

/// Hauteur attribuée à un actif qu'aucune cellule valide ne couvre
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FillPolicy(pub f64);

impl FillPolicy {
    /// Bâtiments: hauteur nulle
    pub const ZERO: FillPolicy = FillPolicy(0.0);
    /// Infrastructures: sentinelle très négative, classée `None`
    pub const SENTINEL: FillPolicy = FillPolicy(-9999.0);

    pub fn depth(self) -> f64 {
        self.0
    }
}

/// Hauteur d'eau au-dessus du niveau de référence
pub fn resolve_depth(max_value: Option<f64>, reference_level: f64, fill: FillPolicy) -> f64 {
    match max_value {
        Some(max) => max - reference_level,
        None => fill.depth(),
    }
}
