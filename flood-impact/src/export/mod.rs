//! Modules d'export (conteneur vectoriel, raster d'impact)

pub mod container;
pub mod raster;

use std::path::{Path, PathBuf};

/// Chemins de sortie d'un pas de temps: (conteneur vectoriel, raster d'impact)
///
/// `<stem>_vulnerability.json` et `<stem>_vulnerability.tif`, dans
/// `output_folder` ou à défaut à côté du raster de niveau d'eau.
pub fn output_paths(raster: &Path, output_folder: Option<&Path>) -> (PathBuf, PathBuf) {
    let stem = raster
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    let folder = output_folder
        .map(Path::to_path_buf)
        .or_else(|| raster.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    (
        folder.join(format!("{}_vulnerability.json", stem)),
        folder.join(format!("{}_vulnerability.tif", stem)),
    )
}
