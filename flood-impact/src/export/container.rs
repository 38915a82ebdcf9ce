//! Conteneur vectoriel multi-couches (écriture geozero, relecture geojson)
//!
//! Format: un objet JSON `LayerCollection` dont chaque couche est une
//! FeatureCollection GeoJSON portant son nom dans le membre `name`.
//!
//! ```json
//! {"type":"LayerCollection","crs":{...},"layers":[
//!   {"type":"FeatureCollection","name":"Buildings","features":[...]},
//!   {"type":"FeatureCollection","name":"Road Closure Points","features":[...]}
//! ]}
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use geojson::{FeatureCollection, GeoJson};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use serde_json::Value;
use tracing::{info, warn};

use crate::assets::AssetLayer;
use crate::category::AssetCategory;
use crate::error::ImpactError;
use crate::evaluate::{ClassifiedAssetLayer, ClassifiedFeature};

pub const CONTAINER_TYPE: &str = "LayerCollection";

/// Écrit toutes les couches classées dans un seul conteneur
///
/// Aucune fusion entre catégories: une couche par catégorie, dans l'ordre reçu.
pub fn merge(
    layers: &[ClassifiedAssetLayer],
    epsg: Option<u16>,
    output_path: &Path,
) -> Result<(), ImpactError> {
    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    write_container(&mut writer, layers, epsg)?;
    writer.flush()?;

    info!(
        path = %output_path.display(),
        layers = layers.len(),
        features = layers.iter().map(|l| l.len()).sum::<usize>(),
        "Vector container written"
    );
    Ok(())
}

/// Écrit le conteneur dans un flux
pub fn write_container<W: Write>(
    writer: &mut W,
    layers: &[ClassifiedAssetLayer],
    epsg: Option<u16>,
) -> Result<(), ImpactError> {
    write!(writer, r#"{{"type":"{}","crs":"#, CONTAINER_TYPE)?;
    match epsg {
        Some(code) => write!(
            writer,
            r#"{{"type":"name","properties":{{"name":"urn:ogc:def:crs:EPSG::{}"}}}}"#,
            code
        )?,
        None => write!(writer, "null")?,
    }
    write!(writer, r#","layers":["#)?;

    for (i, layer) in layers.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_layer(writer, layer)?;
    }

    write!(writer, "]}}")?;
    Ok(())
}

fn write_layer<W: Write>(writer: &mut W, layer: &ClassifiedAssetLayer) -> Result<(), ImpactError> {
    write!(writer, r#"{{"type":"FeatureCollection","name":"#)?;
    serde_json::to_writer(&mut *writer, layer.name())?;
    write!(writer, r#","features":["#)?;

    for (i, feature) in layer.features.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(writer, feature)?;
    }

    write!(writer, "]}}")?;
    Ok(())
}

fn write_feature<W: Write>(writer: &mut W, feature: &ClassifiedFeature) -> Result<(), ImpactError> {
    write!(writer, r#"{{"type":"Feature","geometry":"#)?;

    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    feature.geometry.process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    write!(writer, r#","properties":"#)?;
    serde_json::to_writer(&mut *writer, &feature.to_properties())?;
    write!(writer, "}}")?;
    Ok(())
}

/// Relit toutes les couches d'un conteneur, dans l'ordre du fichier
pub fn read_container(path: &Path) -> Result<Vec<AssetLayer>, ImpactError> {
    let text = std::fs::read_to_string(path)?;
    parse_container(&text, &path.display().to_string())
}

pub fn parse_container(text: &str, source_name: &str) -> Result<Vec<AssetLayer>, ImpactError> {
    let root: Value = serde_json::from_str(text)?;

    if root.get("type").and_then(Value::as_str) != Some(CONTAINER_TYPE) {
        return Err(ImpactError::container(
            source_name,
            format!("expected type '{}'", CONTAINER_TYPE),
        ));
    }
    let Some(Value::Array(layers)) = root.get("layers") else {
        return Err(ImpactError::container(source_name, "missing 'layers' array"));
    };

    layers
        .iter()
        .enumerate()
        .map(|(i, layer)| {
            let collection = GeoJson::from_json_value(layer.clone())
                .and_then(FeatureCollection::try_from)
                .map_err(|e| ImpactError::container(source_name, format!("layer #{}: {}", i, e)))?;
            let name = collection
                .foreign_members
                .as_ref()
                .and_then(|m| m.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ImpactError::container(source_name, format!("layer #{} has no name", i)))?;
            AssetLayer::from_collection(&name, collection, source_name)
        })
        .collect()
}

/// Relit la couche classée d'une catégorie
///
/// Une catégorie absente du conteneur donne une couche vide.
pub fn read_classified(
    path: &Path,
    category: AssetCategory,
) -> Result<ClassifiedAssetLayer, ImpactError> {
    let layers = read_container(path)?;
    match layers
        .into_iter()
        .find(|l| l.name == category.layer_name())
    {
        Some(layer) => ClassifiedAssetLayer::from_layer(category, layer),
        None => Ok(ClassifiedAssetLayer::empty(category)),
    }
}

/// Relit toutes les couches classées, dans l'ordre du fichier
///
/// Les couches dont le nom ne correspond à aucune catégorie sont ignorées.
pub fn read_all_classified(path: &Path) -> Result<Vec<ClassifiedAssetLayer>, ImpactError> {
    let mut classified = Vec::new();
    for layer in read_container(path)? {
        match AssetCategory::from_layer_name(&layer.name) {
            Some(category) => classified.push(ClassifiedAssetLayer::from_layer(category, layer)?),
            None => warn!(path = %path.display(), layer = %layer.name, "Unknown layer skipped"),
        }
    }
    Ok(classified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::VulnerabilityClass;
    use geo::{polygon, Geometry, Point};
    use serde_json::json;

    fn layers() -> Vec<ClassifiedAssetLayer> {
        let buildings = ClassifiedAssetLayer {
            category: AssetCategory::Buildings,
            features: vec![ClassifiedFeature {
                geometry: Geometry::Polygon(polygon![
                    (x: 0.0, y: 0.0),
                    (x: 4.0, y: 0.0),
                    (x: 4.0, y: 3.0),
                    (x: 0.0, y: 0.0),
                ]),
                properties: json!({"Name": "Town \"Hall\"", "floor_level": 2.5})
                    .as_object()
                    .cloned()
                    .unwrap(),
                max_water_level: Some(3.0),
                volume: Some(27.0),
                max_depth: 0.5,
                vulnerability_class: VulnerabilityClass::Moderate,
            }],
            dropped: 0,
        };
        let roads = ClassifiedAssetLayer {
            category: AssetCategory::RoadClosurePoints,
            features: vec![ClassifiedFeature {
                geometry: Geometry::Point(Point::new(1.5, 2.5)),
                properties: json!({"LOCATION": "Bridge St"}).as_object().cloned().unwrap(),
                max_water_level: None,
                volume: None,
                max_depth: -9999.0,
                vulnerability_class: VulnerabilityClass::None,
            }],
            dropped: 0,
        };
        vec![
            buildings,
            roads,
            ClassifiedAssetLayer::empty(AssetCategory::CouncilAssets),
        ]
    }

    #[test]
    fn test_write_then_parse() {
        let mut buf = Vec::new();
        write_container(&mut buf, &layers(), Some(28356)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("EPSG::28356"));

        let parsed = parse_container(&text, "memory").unwrap();
        let names: Vec<_> = parsed.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Buildings", "Road Closure Points", "Council Assets"]);
        assert_eq!(parsed[0].len(), 1);
        assert!(parsed[2].is_empty());
    }

    #[test]
    fn test_classified_roundtrip_preserves_columns() {
        let original = layers();
        let mut buf = Vec::new();
        write_container(&mut buf, &original, None).unwrap();
        let parsed = parse_container(std::str::from_utf8(&buf).unwrap(), "memory").unwrap();

        for (layer, expected) in parsed.into_iter().zip(&original) {
            let back = ClassifiedAssetLayer::from_layer(expected.category, layer).unwrap();
            assert_eq!(back.len(), expected.len());
            assert_eq!(back.features, expected.features);
        }
    }

    #[test]
    fn test_merge_to_file_and_read_category() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depth_003_vulnerability.json");
        merge(&layers(), Some(28356), &path).unwrap();

        let roads = read_classified(&path, AssetCategory::RoadClosurePoints).unwrap();
        assert_eq!(roads.len(), 1);
        assert_eq!(roads.features[0].max_depth, -9999.0);

        let evac = read_classified(&path, AssetCategory::EvacuationCentres).unwrap();
        assert!(evac.is_empty());
    }

    #[test]
    fn test_read_all_classified_skips_unknown_layers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.json");
        std::fs::write(
            &path,
            json!({
                "type": CONTAINER_TYPE,
                "crs": null,
                "layers": [
                    {"type": "FeatureCollection", "name": "Parks", "features": []},
                    {"type": "FeatureCollection", "name": "Council Assets", "features": []}
                ]
            })
            .to_string(),
        )
        .unwrap();

        let layers = read_all_classified(&path).unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].category, AssetCategory::CouncilAssets);
    }

    #[test]
    fn test_not_a_container() {
        let err = parse_container(r#"{"type":"FeatureCollection","features":[]}"#, "x").unwrap_err();
        assert!(matches!(err, ImpactError::Container { .. }));
    }
}
