use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use crate::format::{is_mbtiles_path, LayerType};
use crate::map::backends::BackendKind;
use crate::mbtiles::MbtilesFile;

#[derive(Debug, Clone)]
pub struct OfflineLayer {
    pub id: String,
    pub file: Arc<MbtilesFile>,
}

impl OfflineLayer {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn layer_type(&self) -> LayerType {
        self.file.layer_type()
    }
}

/// Layer name for a package: its file name without the extension.
pub fn layer_id(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.to_string())
}

/// `.mbtiles` files directly inside `dir`, sorted by path. A missing
/// directory holds no layers.
pub fn scan_offline_layers(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read layers dir: {}", dir.display()))?
    {
        let path = entry
            .with_context(|| format!("failed to read layers dir: {}", dir.display()))?
            .path();
        if path.is_file() && is_mbtiles_path(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Opens every package in `dir`. Packages that fail to open are skipped.
pub fn load_offline_layers(dir: &Path) -> Result<Vec<OfflineLayer>> {
    let mut layers = Vec::new();
    for path in scan_offline_layers(dir)? {
        let Some(id) = layer_id(&path) else {
            continue;
        };
        match MbtilesFile::open(&path) {
            Ok(file) => layers.push(OfflineLayer {
                id,
                file: Arc::new(file),
            }),
            Err(err) => warn!(path = %path.display(), error = %err, "skipping offline layer"),
        }
    }
    Ok(layers)
}

pub fn supported_layers(kind: BackendKind, layers: &[OfflineLayer]) -> Vec<&OfflineLayer> {
    layers
        .iter()
        .filter(|layer| kind.supports_layer(layer.layer_type()))
        .collect()
}
