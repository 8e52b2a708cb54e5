use std::fmt;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::format::{LayerType, TileFormat};

/// XYZ tile address with the row counted from the north edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TileCoord {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }

    fn tiles_per_side(&self) -> Option<u64> {
        1u64.checked_shl(u32::from(self.zoom))
    }

    pub fn is_valid(&self) -> bool {
        match self.tiles_per_side() {
            Some(side) => self.zoom <= 31 && u64::from(self.x) < side && u64::from(self.y) < side,
            None => false,
        }
    }

    /// The row as stored in the `tiles` table, which counts from the south.
    pub fn tms_row(&self) -> Option<u32> {
        if !self.is_valid() {
            return None;
        }
        let side = self.tiles_per_side()?;
        u32::try_from(side - 1 - u64::from(self.y)).ok()
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

pub fn parse_tile_spec(value: &str) -> Result<TileCoord> {
    let trimmed = value.trim();
    let mut parts = trimmed.split('/');
    let zoom_str = parts.next().context("tile must be in z/x/y format")?;
    let x_str = parts.next().context("tile must be in z/x/y format")?;
    let y_str = parts.next().context("tile must be in z/x/y format")?;
    if parts.next().is_some() {
        anyhow::bail!("tile must be in z/x/y format");
    }
    let zoom: u8 = zoom_str.parse().context("invalid tile zoom")?;
    let x: u32 = x_str.parse().context("invalid tile x")?;
    let y: u32 = y_str.parse().context("invalid tile y")?;
    Ok(TileCoord { zoom, x, y })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorLayer {
    pub id: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileCenter {
    pub lat: f64,
    pub lon: f64,
    pub zoom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

/// Everything a package declares about itself in its metadata table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TilesetInfo {
    pub name: String,
    pub format: TileFormat,
    pub layer_type: LayerType,
    pub content_type: &'static str,
    pub content_encoding: Option<&'static str>,
    pub min_zoom: Option<u8>,
    pub max_zoom: Option<u8>,
    pub center: Option<TileCenter>,
    pub bounds: Option<TileBounds>,
    pub vector_layers: Vec<VectorLayer>,
}
