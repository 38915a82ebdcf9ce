//! Catégories d'actifs évaluées

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Catégorie d'actifs exposés
///
/// L'ordre de déclaration est l'ordre de composition par défaut.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Buildings,
    RoadClosurePoints,
    EvacuationCentres,
    CouncilAssets,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 4] = [
        AssetCategory::Buildings,
        AssetCategory::RoadClosurePoints,
        AssetCategory::EvacuationCentres,
        AssetCategory::CouncilAssets,
    ];

    /// Nom de la couche dans le conteneur vectoriel
    pub fn layer_name(&self) -> &'static str {
        match self {
            AssetCategory::Buildings => "Buildings",
            AssetCategory::RoadClosurePoints => "Road Closure Points",
            AssetCategory::EvacuationCentres => "Evacuation Centre",
            AssetCategory::CouncilAssets => "Council Assets",
        }
    }

    /// Clé de configuration (snake_case)
    pub fn key(&self) -> &'static str {
        match self {
            AssetCategory::Buildings => "buildings",
            AssetCategory::RoadClosurePoints => "road_closure_points",
            AssetCategory::EvacuationCentres => "evacuation_centres",
            AssetCategory::CouncilAssets => "council_assets",
        }
    }

    /// Niveau de référence auquel la hauteur d'eau est mesurée
    pub fn reference_label(&self) -> &'static str {
        match self {
            AssetCategory::Buildings | AssetCategory::EvacuationCentres => "floor level",
            AssetCategory::RoadClosurePoints => "road level",
            AssetCategory::CouncilAssets => "base level",
        }
    }

    pub fn from_layer_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.layer_name() == name)
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.layer_name())
    }
}

impl FromStr for AssetCategory {
    type Err = String;

    /// Accepte la clé de configuration ou le nom de couche
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.key() == trimmed || c.layer_name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                format!(
                    "Unknown asset category: '{}'. Use: buildings, road_closure_points, evacuation_centres, council_assets",
                    s
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_names_roundtrip() {
        for category in AssetCategory::ALL {
            assert_eq!(
                AssetCategory::from_layer_name(category.layer_name()),
                Some(category)
            );
        }
        assert_eq!(AssetCategory::from_layer_name("Parks"), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "road_closure_points".parse::<AssetCategory>(),
            Ok(AssetCategory::RoadClosurePoints)
        );
        assert_eq!(
            "evacuation centre".parse::<AssetCategory>(),
            Ok(AssetCategory::EvacuationCentres)
        );
        assert!("bridges".parse::<AssetCategory>().is_err());
    }

    #[test]
    fn test_serde_key_matches() {
        for category in AssetCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.key()));
        }
    }
}
