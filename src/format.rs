use std::fmt;
use std::path::Path;

use serde::Serialize;

pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    Raster,
    Vector,
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerType::Raster => f.write_str("raster"),
            LayerType::Vector => f.write_str("vector"),
        }
    }
}

/// Tile encodings an MBTiles package may declare in its `format` metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TileFormat {
    Png,
    Jpeg,
    Pbf,
}

impl TileFormat {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "png" => Some(TileFormat::Png),
            "jpg" | "jpeg" => Some(TileFormat::Jpeg),
            "pbf" | "mvt" => Some(TileFormat::Pbf),
            _ => None,
        }
    }

    pub fn layer_type(self) -> LayerType {
        match self {
            TileFormat::Png | TileFormat::Jpeg => LayerType::Raster,
            TileFormat::Pbf => LayerType::Vector,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            TileFormat::Png => "image/png",
            TileFormat::Jpeg => "image/jpeg",
            TileFormat::Pbf => "application/protobuf",
        }
    }

    /// Encoding vector packages conventionally store their tiles with.
    pub fn declared_encoding(self) -> Option<&'static str> {
        match self {
            TileFormat::Pbf => Some("gzip"),
            TileFormat::Png | TileFormat::Jpeg => None,
        }
    }
}

pub fn is_mbtiles_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mbtiles"))
}

pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}
