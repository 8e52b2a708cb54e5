use std::collections::HashSet;
use std::io::Read;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use mvt_reader::Reader;
use serde::Serialize;

use crate::format::{is_gzip, LayerType};
use crate::mbtiles::reader::MbtilesFile;
use crate::mbtiles::types::TileCoord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub feature_count: usize,
    pub property_key_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileSummary {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
    pub total_features: usize,
    pub layers: Vec<LayerSummary>,
}

pub fn decode_tile_payload(data: &[u8]) -> Result<Vec<u8>> {
    if is_gzip(data) {
        let mut decoder = GzDecoder::new(data);
        let mut decoded = Vec::new();
        decoder
            .read_to_end(&mut decoded)
            .context("decode gzip tile data")?;
        Ok(decoded)
    } else {
        Ok(data.to_vec())
    }
}

/// Layer and feature counts of one vector tile. Returns `None` when the
/// package has no tile at `coord`.
pub fn summarize_tile(
    file: &MbtilesFile,
    coord: TileCoord,
    layer_filter: Option<&str>,
) -> Result<Option<TileSummary>> {
    if file.layer_type() != LayerType::Vector {
        anyhow::bail!(
            "tile summaries need a vector package, {} is {}",
            file.path().display(),
            file.layer_type()
        );
    }
    let Some(data) = file.tile_data(coord).context("failed to read tile data")? else {
        return Ok(None);
    };
    let payload = decode_tile_payload(&data)?;
    let reader =
        Reader::new(payload).map_err(|err| anyhow::anyhow!("decode vector tile: {err}"))?;
    let layers = reader
        .get_layer_metadata()
        .map_err(|err| anyhow::anyhow!("read layer metadata: {err}"))?;
    let mut total_features = 0usize;
    let mut summaries = Vec::new();
    for layer in layers {
        if let Some(filter) = layer_filter {
            if layer.name != filter {
                continue;
            }
        }
        let features = reader
            .get_features(layer.layer_index)
            .map_err(|err| anyhow::anyhow!("read layer features: {err}"))?;
        let mut keys = HashSet::new();
        for feature in features {
            if let Some(props) = feature.properties {
                for key in props.keys() {
                    keys.insert(key.clone());
                }
            }
        }
        total_features += layer.feature_count;
        summaries.push(LayerSummary {
            name: layer.name,
            feature_count: layer.feature_count,
            property_key_count: keys.len(),
        });
    }
    Ok(Some(TileSummary {
        zoom: coord.zoom,
        x: coord.x,
        y: coord.y,
        total_features,
        layers: summaries,
    }))
}
