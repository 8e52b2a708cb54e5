use anyhow::Result;
use serde_json::json;

use crate::map::backends::BackendEntry;
use crate::mbtiles::{TileCoord, TileSummary, TilesetInfo};
use crate::offline::{supported_layers, OfflineLayer};
use crate::server::Tile;

pub fn format_tileset_info_lines(info: &TilesetInfo) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!("name: {}", info.name));
    lines.push(format!(
        "format: {:?} layer_type: {} content_type: {} content_encoding: {}",
        info.format,
        info.layer_type,
        info.content_type,
        info.content_encoding.unwrap_or("-")
    ));
    let zoom = |value: Option<u8>| value.map_or_else(|| "-".to_string(), |z| z.to_string());
    lines.push(format!(
        "minzoom: {} maxzoom: {}",
        zoom(info.min_zoom),
        zoom(info.max_zoom)
    ));
    if let Some(center) = info.center {
        lines.push(format!(
            "center: lat={:.6} lon={:.6} zoom={}",
            center.lat, center.lon, center.zoom
        ));
    }
    if let Some(bounds) = info.bounds {
        lines.push(format!(
            "bounds: west={:.6} south={:.6} east={:.6} north={:.6}",
            bounds.west, bounds.south, bounds.east, bounds.north
        ));
    }
    if !info.vector_layers.is_empty() {
        lines.push("vector_layers:".to_string());
        for layer in info.vector_layers.iter() {
            if layer.description.is_empty() {
                lines.push(format!("  {}", layer.id));
            } else {
                lines.push(format!("  {}: {}", layer.id, layer.description));
            }
        }
    }
    lines
}

pub fn format_tile_line(coord: TileCoord, tile: Option<&Tile>) -> String {
    match tile {
        Some(tile) => format!(
            "tile: {} bytes={} content_type={} content_encoding={}",
            coord,
            tile.data.len(),
            tile.content_type,
            tile.content_encoding.unwrap_or("-")
        ),
        None => format!("tile: {coord} missing"),
    }
}

pub fn format_tile_summary_text(summary: &TileSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "tile_summary: z={} x={} y={} total_features={}",
        summary.zoom, summary.x, summary.y, summary.total_features
    )];
    for layer in summary.layers.iter() {
        lines.push(format!(
            "layer: {} features={} property_keys={}",
            layer.name, layer.feature_count, layer.property_key_count
        ));
    }
    lines
}

pub fn format_backend_lines(entries: &[BackendEntry], layers: &[OfflineLayer]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let names = supported_layers(entry.kind, layers)
                .iter()
                .map(|layer| layer.id.as_str())
                .collect::<Vec<_>>();
            format!(
                "{} ({}) kind={} layers={}",
                entry.id,
                entry.name,
                entry.kind,
                if names.is_empty() {
                    "-".to_string()
                } else {
                    names.join(",")
                }
            )
        })
        .collect()
}

pub fn backends_json(entries: &[BackendEntry], layers: &[OfflineLayer]) -> Result<String> {
    let items = entries
        .iter()
        .map(|entry| {
            json!({
                "id": entry.id,
                "name": entry.name,
                "kind": entry.kind,
                "style": entry.resolve_style(None),
                "options": entry.options.iter().map(|option| option.id.as_str()).collect::<Vec<_>>(),
                "layers": supported_layers(entry.kind, layers)
                    .iter()
                    .map(|layer| layer.id.as_str())
                    .collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();
    Ok(serde_json::to_string_pretty(&items)?)
}
