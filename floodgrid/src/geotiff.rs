//! Lecture et écriture GeoTIFF mono-bande (sans GDAL)
//!
//! Tags pris en charge:
//! - ModelPixelScaleTag (33550) et ModelTiepointTag (33922) pour la transformation
//! - GeoKeyDirectoryTag (34735) pour le code EPSG
//! - GDAL_NODATA (42113) pour la valeur nodata

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tiff::ColorType;
use tracing::debug;

use crate::types::{GeoTransform, Raster};
use crate::GridError;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

/// Lit un GeoTIFF mono-bande
///
/// Le fichier est ouvert, lu puis refermé avant le retour.
///
/// # Errors
///
/// Retourne `GridError` si le fichier est illisible, multi-bande ou sans
/// géoréférencement.
pub fn read(path: &Path) -> Result<Raster, GridError> {
    let file = File::open(path)?;
    let raster = decode(BufReader::new(file), &path.display().to_string())?;
    debug!(
        path = %path.display(),
        rows = raster.rows(),
        cols = raster.cols(),
        nodata = ?raster.nodata(),
        epsg = ?raster.epsg(),
        "Raster loaded"
    );
    Ok(raster)
}

/// Écrit une grille en GeoTIFF float32
pub fn write(raster: &Raster, path: &Path) -> Result<(), GridError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode(raster, &mut writer, &path.display().to_string())?;
    writer.flush()?;
    Ok(())
}

/// Décode un GeoTIFF depuis n'importe quelle source `Read + Seek`
pub fn decode<R: Read + Seek>(reader: R, name: &str) -> Result<Raster, GridError> {
    let mut decoder = Decoder::new(reader).map_err(|e| GridError::tiff(name, e))?;

    let color = decoder.colortype().map_err(|e| GridError::tiff(name, e))?;
    if !matches!(color, ColorType::Gray(_)) {
        return Err(GridError::Unsupported(format!(
            "{}: expected a single band, found {:?}",
            name, color
        )));
    }

    let (width, height) = decoder.dimensions().map_err(|e| GridError::tiff(name, e))?;
    let (rows, cols) = (height as usize, width as usize);

    let data: Vec<f32> = match decoder.read_image().map_err(|e| GridError::tiff(name, e))? {
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        _ => {
            return Err(GridError::Unsupported(format!(
                "{}: unsupported pixel type",
                name
            )))
        }
    };

    let transform = read_transform(&mut decoder)
        .ok_or_else(|| GridError::MissingGeoreference(name.to_string()))?;
    let nodata = read_nodata(&mut decoder);
    let epsg = read_epsg(&mut decoder);

    Ok(Raster::from_vec(data, rows, cols, transform)?
        .with_nodata(nodata)
        .with_epsg(epsg))
}

/// Encode une grille en GeoTIFF float32 dans n'importe quelle sortie `Write + Seek`
pub fn encode<W: Write + Seek>(raster: &Raster, writer: W, name: &str) -> Result<(), GridError> {
    let mut encoder = TiffEncoder::new(writer).map_err(|e| GridError::tiff(name, e))?;
    let (rows, cols) = raster.shape();

    // Ordre ligne par ligne, indépendant de la disposition mémoire
    let data: Vec<f32> = raster.data().iter().copied().collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| GridError::tiff(name, e))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE), &scale[..])
        .map_err(|e| GridError::tiff(name, e))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(MODEL_TIEPOINT), &tiepoint[..])
        .map_err(|e| GridError::tiff(name, e))?;

    let geokeys = geo_key_directory(raster.epsg());
    image
        .encoder()
        .write_tag(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY), &geokeys[..])
        .map_err(|e| GridError::tiff(name, e))?;

    if let Some(nodata) = raster.nodata() {
        let text = nodata.to_string();
        image
            .encoder()
            .write_tag(Tag::from_u16_exhaustive(GDAL_NODATA), text.as_str())
            .map_err(|e| GridError::tiff(name, e))?;
    }

    image
        .write_data(&data)
        .map_err(|e| GridError::tiff(name, e))?;

    Ok(())
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE))
        .ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT)).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 || scale[0] == 0.0 || scale[1] == 0.0 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    let text = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA)).ok()?;
    text.trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .parse::<f32>()
        .ok()
}

fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<u16> {
    let keys = decoder
        .get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY))
        .ok()?;
    parse_epsg(&keys)
}

/// Extrait le code EPSG d'un GeoKeyDirectory
fn parse_epsg(keys: &[u16]) -> Option<u16> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    let entries = keys[4..].chunks_exact(4).take(count);

    let mut geographic = None;
    for entry in entries {
        // [KeyID, TIFFTagLocation, Count, Value]; location 0 = valeur directe
        if entry[1] != 0 {
            continue;
        }
        match entry[0] {
            PROJECTED_CS_TYPE_KEY => return Some(entry[3]),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(entry[3]),
            _ => {}
        }
    }
    geographic
}

/// Construit un GeoKeyDirectory minimal, avec le code EPSG s'il est connu
fn geo_key_directory(epsg: Option<u16>) -> Vec<u16> {
    let geographic = epsg.is_some_and(|code| (4000..5000).contains(&code));
    let model_type = if geographic { 2 } else { 1 };

    let mut entries: Vec<[u16; 4]> = vec![
        [GT_MODEL_TYPE_KEY, 0, 1, model_type],
        // RasterPixelIsArea
        [GT_RASTER_TYPE_KEY, 0, 1, 1],
    ];
    if let Some(code) = epsg {
        let key = if geographic {
            GEOGRAPHIC_TYPE_KEY
        } else {
            PROJECTED_CS_TYPE_KEY
        };
        entries.push([key, 0, 1, code]);
    }

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    keys.extend(entries.into_iter().flatten());
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Raster {
        Raster::from_vec(
            vec![1.0, 2.0, 3.0, -9999.0, 5.5, 6.25],
            2,
            3,
            GeoTransform::new(500000.0, 6960000.0, 2.0, -2.0),
        )
        .unwrap()
        .with_nodata(Some(-9999.0))
        .with_epsg(Some(28356))
    }

    #[test]
    fn test_encode_decode() {
        let raster = sample();
        let mut buf = Cursor::new(Vec::new());
        encode(&raster, &mut buf, "memory").unwrap();

        buf.set_position(0);
        let decoded = decode(buf, "memory").unwrap();

        assert_eq!(decoded.shape(), (2, 3));
        assert_eq!(decoded.transform(), raster.transform());
        assert_eq!(decoded.nodata(), Some(-9999.0));
        assert_eq!(decoded.epsg(), Some(28356));
        assert_eq!(decoded.get(1, 2), Some(6.25));
        assert_eq!(decoded.valid_value(1, 0), None);
    }

    #[test]
    fn test_parse_epsg_projected() {
        let keys = geo_key_directory(Some(28356));
        assert_eq!(keys[3], 3);
        assert_eq!(parse_epsg(&keys), Some(28356));
    }

    #[test]
    fn test_parse_epsg_geographic() {
        let keys = geo_key_directory(Some(4326));
        assert_eq!(parse_epsg(&keys), Some(4326));
        // GTModelTypeGeoKey = ModelTypeGeographic
        assert_eq!(&keys[4..8], &[GT_MODEL_TYPE_KEY, 0, 1, 2]);
    }

    #[test]
    fn test_parse_epsg_absent() {
        assert_eq!(parse_epsg(&geo_key_directory(None)), None);
        assert_eq!(parse_epsg(&[1, 1]), None);
    }

    #[test]
    fn test_read_missing_file() {
        let result = read(Path::new("nonexistent_waterlevel.tif"));
        assert!(matches!(result, Err(GridError::Io(_))));
    }
}
