//! Tableaux de synthèse des couches classées
//!
//! - détail par actif (nom, hauteur d'eau, impact, quartier)
//! - détail par zone (nombre d'actifs touchés par classe)
//! - guide d'impact (bornes de hauteur d'eau de chaque classe)

use std::collections::BTreeMap;
use std::path::Path;

use geo::{Centroid, Geometry, Intersects};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::assets::{AssetLayer, Properties};
use crate::category::AssetCategory;
use crate::classify::{FillPolicy, VulnerabilityClass};
use crate::config::CategoryConfig;
use crate::error::ImpactError;
use crate::evaluate::ClassifiedAssetLayer;

/// Colonne de nom par défaut
pub const NAME_COLUMN: &str = "Name";

/// Colonne du type de zone
pub const TYPE_COLUMN: &str = "Type";

/// Type des zones utilisées pour rattacher un actif à son quartier
pub const SUBURB: &str = "Suburb";

/// Zone de synthèse (quartier, bassin, secteur...)
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub name: String,
    /// Valeur de la colonne `Type`
    pub kind: Option<String>,
    pub geometry: Geometry,
}

impl Zone {
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }
}

/// Lit les zones d'un fichier GeoJSON
///
/// Les features sans `Name` sont ignorées.
pub fn read_zones(path: &Path) -> Result<Vec<Zone>, ImpactError> {
    let layer = AssetLayer::read(path, "zones")?;
    let mut zones = Vec::with_capacity(layer.len());
    for (index, feature) in layer.features.into_iter().enumerate() {
        match feature.properties.get(NAME_COLUMN).and_then(display_value) {
            Some(name) => zones.push(Zone {
                name,
                kind: feature.properties.get(TYPE_COLUMN).and_then(display_value),
                geometry: feature.geometry,
            }),
            None => warn!(path = %path.display(), index, "Zone without name skipped"),
        }
    }
    Ok(zones)
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Ligne du détail par actif
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetRow {
    pub name: String,
    /// "N/A" hors couverture du raster, sinon arrondi à 2 décimales
    pub max_depth: String,
    pub impact: &'static str,
    /// Quartier contenant le centroïde de l'actif
    pub suburb_zone: Option<String>,
    pub attributes: Properties,
}

/// Détail par actif d'une couche classée
///
/// Nom lu dans `name_column`, puis `Name`, sinon `Name_<indice>`.
/// Le quartier est la première zone de type `Suburb` qui intersecte le
/// centroïde de l'actif.
/// La géométrie et la classe brute ne figurent pas dans le tableau.
pub fn asset_breakdown(
    layer: &ClassifiedAssetLayer,
    name_column: Option<&str>,
    zones: &[Zone],
) -> Vec<AssetRow> {
    layer
        .features
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let mut attributes = feature.properties.clone();
            let name = name_column
                .into_iter()
                .chain(std::iter::once(NAME_COLUMN))
                .find_map(|column| {
                    let name = attributes.get(column).and_then(display_value)?;
                    attributes.remove(column);
                    Some(name)
                })
                .unwrap_or_else(|| format!("Name_{}", index));

            AssetRow {
                name,
                max_depth: format_depth(feature.max_depth),
                impact: feature.vulnerability_class.label(),
                suburb_zone: suburb_of(&feature.geometry, zones),
                attributes,
            }
        })
        .collect()
}

fn suburb_of(geometry: &Geometry, zones: &[Zone]) -> Option<String> {
    let centroid = geometry.centroid()?;
    zones
        .iter()
        .filter(|zone| zone.is_kind(SUBURB))
        .find(|zone| zone.geometry.intersects(&centroid))
        .map(|zone| zone.name.clone())
}

fn format_depth(depth: f64) -> String {
    if depth == FillPolicy::SENTINEL.depth() {
        "N/A".to_string()
    } else {
        format!("{:.2}", depth)
    }
}

/// Ligne du détail par zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneRow {
    pub zone: String,
    pub category: AssetCategory,
    pub count: usize,
    pub none: usize,
    pub minor: usize,
    pub moderate: usize,
    pub severe: usize,
}

/// Nombre d'actifs de chaque catégorie intersectant chaque zone
///
/// Seules les zones du type `kind` sont retenues (toutes si `None`).
/// Les zones de même nom sont cumulées; lignes triées par nom de zone puis
/// par nom de couche.
pub fn zone_breakdown(
    zones: &[Zone],
    layers: &[ClassifiedAssetLayer],
    kind: Option<&str>,
) -> Vec<ZoneRow> {
    let mut grouped: BTreeMap<(&str, &str), (AssetCategory, [usize; 4])> = BTreeMap::new();
    for zone in zones.iter().filter(|z| kind.map_or(true, |k| z.is_kind(k))) {
        for layer in layers {
            let (_, counts) = grouped
                .entry((zone.name.as_str(), layer.category.layer_name()))
                .or_insert((layer.category, [0; 4]));
            for feature in &layer.features {
                if zone.geometry.intersects(&feature.geometry) {
                    counts[feature.vulnerability_class.index()] += 1;
                }
            }
        }
    }

    grouped
        .into_iter()
        .map(|((zone, _), (category, counts))| ZoneRow {
            zone: zone.to_string(),
            category,
            count: counts.iter().sum(),
            none: counts[0],
            minor: counts[1],
            moderate: counts[2],
            severe: counts[3],
        })
        .collect()
}

/// Tableau du guide d'impact d'une catégorie
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuideTable {
    pub category: AssetCategory,
    pub header: String,
    /// Du plus sévère au moins sévère
    pub rows: Vec<(String, VulnerabilityClass)>,
}

/// Guide d'impact, une table par catégorie
pub fn impact_guide<'a>(configs: impl IntoIterator<Item = &'a CategoryConfig>) -> Vec<GuideTable> {
    configs
        .into_iter()
        .map(|config| {
            let t = &config.thresholds;
            GuideTable {
                category: config.category,
                header: format!(
                    "Waterdepth over {} [m]",
                    config.category.reference_label()
                ),
                rows: vec![
                    (format!("> {}", t.t2), VulnerabilityClass::Severe),
                    (format!("{} - {}", t.t1, t.t2), VulnerabilityClass::Moderate),
                    (format!("{} - {}", t.t0, t.t1), VulnerabilityClass::Minor),
                    (format!("< {}", t.t0), VulnerabilityClass::None),
                ],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::ClassifiedFeature;
    use geo::{line_string, polygon, Point};
    use serde_json::json;

    fn feature(x: f64, y: f64, properties: Value, depth: f64, class: VulnerabilityClass) -> ClassifiedFeature {
        ClassifiedFeature {
            geometry: Geometry::Point(Point::new(x, y)),
            properties: properties.as_object().cloned().unwrap(),
            max_water_level: None,
            volume: None,
            max_depth: depth,
            vulnerability_class: class,
        }
    }

    fn roads() -> ClassifiedAssetLayer {
        ClassifiedAssetLayer {
            category: AssetCategory::RoadClosurePoints,
            features: vec![
                feature(1.0, 1.0, json!({"LOCATION": "Bridge St", "road_level": 3.0}), 0.456, VulnerabilityClass::Severe),
                feature(8.0, 8.0, json!({"Name": "Ford"}), -9999.0, VulnerabilityClass::None),
                feature(2.0, 2.0, json!({"road_level": 1.0}), -0.1, VulnerabilityClass::Minor),
            ],
            dropped: 0,
        }
    }

    fn square(name: &str, kind: &str, min: f64, max: f64) -> Zone {
        Zone {
            name: name.to_string(),
            kind: Some(kind.to_string()),
            geometry: Geometry::Polygon(polygon![
                (x: min, y: min),
                (x: max, y: min),
                (x: max, y: max),
                (x: min, y: max),
            ]),
        }
    }

    #[test]
    fn test_asset_breakdown_names_and_depths() {
        let rows = asset_breakdown(&roads(), Some("LOCATION"), &[]);
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].name, "Bridge St");
        assert_eq!(rows[0].max_depth, "0.46");
        assert_eq!(rows[0].impact, "Severe");
        assert!(!rows[0].attributes.contains_key("LOCATION"));
        assert_eq!(rows[0].attributes.get("road_level"), Some(&json!(3.0)));

        assert_eq!(rows[1].name, "Ford");
        assert_eq!(rows[1].max_depth, "N/A");

        assert_eq!(rows[2].name, "Name_2");
        assert_eq!(rows[2].max_depth, "-0.10");
        assert_eq!(rows[2].impact, "Minor");
        assert!(rows.iter().all(|r| r.suburb_zone.is_none()));
    }

    #[test]
    fn test_asset_breakdown_suburb_from_centroid() {
        let zones = vec![
            // Même emprise mais pas un quartier: ignorée
            square("Catchment", "Catchment", 0.0, 10.0),
            square("Riverside", SUBURB, 0.0, 5.0),
            square("Hilltop", SUBURB, 5.0, 10.0),
        ];
        let mut layer = roads();
        // Centroïde (1.5, 1.5) dans Riverside, même si la ligne touche Hilltop
        layer.features[2].geometry = Geometry::LineString(geo::line_string![
            (x: -2.0, y: -2.0),
            (x: 5.0, y: 5.0),
        ]);

        let rows = asset_breakdown(&layer, Some("LOCATION"), &zones);
        assert_eq!(rows[0].suburb_zone.as_deref(), Some("Riverside"));
        assert_eq!(rows[1].suburb_zone.as_deref(), Some("Hilltop"));
        assert_eq!(rows[2].suburb_zone.as_deref(), Some("Riverside"));

        let outside = asset_breakdown(&layer, None, &[square("Far", SUBURB, 50.0, 60.0)]);
        assert!(outside.iter().all(|r| r.suburb_zone.is_none()));
    }

    #[test]
    fn test_zone_breakdown() {
        let zones = vec![
            square("North", SUBURB, 0.0, 5.0),
            square("Empty", SUBURB, 20.0, 21.0),
        ];
        let rows = zone_breakdown(&zones, &[roads()], None);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].zone, "Empty");
        assert_eq!(rows[0].count, 0);

        assert_eq!(rows[1].zone, "North");
        assert_eq!(rows[1].count, 2);
        assert_eq!(rows[1].severe, 1);
        assert_eq!(rows[1].minor, 1);
        assert_eq!(rows[1].none, 0);
    }

    #[test]
    fn test_zone_breakdown_filters_type_and_groups_by_name() {
        let zones = vec![
            // Quartier en deux morceaux de même nom: cumulés
            square("North", SUBURB, 0.0, 1.5),
            square("North", SUBURB, 1.5, 5.0),
            square("Basin", "Catchment", 0.0, 10.0),
        ];
        let buildings = ClassifiedAssetLayer::empty(AssetCategory::Buildings);
        let rows = zone_breakdown(&zones, &[roads(), buildings], Some(SUBURB));

        let keys: Vec<_> = rows.iter().map(|r| (r.zone.as_str(), r.category)).collect();
        assert_eq!(
            keys,
            vec![
                ("North", AssetCategory::Buildings),
                ("North", AssetCategory::RoadClosurePoints),
            ]
        );
        assert_eq!(rows[0].count, 0);
        // (1, 1) dans le premier morceau, (2, 2) dans le second
        assert_eq!(rows[1].count, 2);

        let catchments = zone_breakdown(&zones, &[roads()], Some("Catchment"));
        assert_eq!(catchments.len(), 1);
        assert_eq!(catchments[0].zone, "Basin");
        assert_eq!(catchments[0].count, 3);
    }

    #[test]
    fn test_impact_guide_bands() {
        let buildings = CategoryConfig::preset(AssetCategory::Buildings).unwrap();
        let council = CategoryConfig::preset(AssetCategory::CouncilAssets).unwrap();
        let guide = impact_guide([&buildings, &council]);

        assert_eq!(guide[0].header, "Waterdepth over floor level [m]");
        assert_eq!(guide[0].rows[0], ("> 1".to_string(), VulnerabilityClass::Severe));
        assert_eq!(guide[0].rows[1].0, "0.25 - 1");
        assert_eq!(guide[0].rows[2].0, "0 - 0.25");
        assert_eq!(guide[0].rows[3], ("< 0".to_string(), VulnerabilityClass::None));

        assert_eq!(guide[1].header, "Waterdepth over base level [m]");
        assert_eq!(guide[1].rows[0].0, "> 0.15");
        assert_eq!(guide[1].rows[3].0, "< -0.3");
    }

    #[test]
    fn test_read_zones_skips_unnamed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zones.geojson");
        std::fs::write(
            &path,
            json!({
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "properties": {"Name": "A", "Type": "Suburb"},
                     "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
                    {"type": "Feature", "properties": {},
                     "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,0]]]}}
                ]
            })
            .to_string(),
        )
        .unwrap();

        let zones = read_zones(&path).unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].name, "A");
        assert!(zones[0].is_kind(SUBURB));
    }
}
