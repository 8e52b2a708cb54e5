use std::ops::RangeInclusive;
use std::sync::Arc;

use anyhow::Result;

use crate::geometry::Viewport;
use crate::map::backends::BackendKind;
use crate::map::engines::{initial_camera, REFERENCE_LAYER_OPACITY};
use crate::map::native::{BackendUnavailable, NativeEngine, Overlay, OverlayTiles, Scene};
use crate::mbtiles::MbtilesFile;

/// A raster tile map over an XYZ tile URL. Only integer zoom levels exist.
#[derive(Debug)]
pub struct OsmEngine {
    scene: Scene,
}

impl OsmEngine {
    pub fn new(tile_url: &str) -> Self {
        Self {
            scene: Scene::new(initial_camera(), tile_url),
        }
    }

    pub fn tile_url(&self) -> &str {
        self.scene.base_style()
    }
}

impl NativeEngine for OsmEngine {
    fn kind(&self) -> BackendKind {
        BackendKind::Osm
    }

    fn attach(&mut self, _viewport: Viewport) -> Result<(), BackendUnavailable> {
        Ok(())
    }

    fn zoom_range(&self) -> RangeInclusive<f64> {
        0.0..=22.0
    }

    fn snap_zoom(&self, zoom: f64) -> f64 {
        zoom.round().clamp(0.0, 22.0)
    }

    fn snap_fit_zoom(&self, zoom: f64) -> f64 {
        zoom.floor().clamp(0.0, 22.0)
    }

    fn add_reference_layer(&mut self, id: &str, file: MbtilesFile) -> Result<()> {
        self.scene.add_overlay(Overlay {
            id: id.to_string(),
            layer_type: file.layer_type(),
            tiles: OverlayTiles::Package(Arc::new(file)),
            style_layers: Vec::new(),
            opacity: REFERENCE_LAYER_OPACITY,
        });
        Ok(())
    }

    fn scene(&self) -> &Scene {
        &self.scene
    }

    fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }
}
