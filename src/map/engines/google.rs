use std::ops::RangeInclusive;
use std::sync::Arc;

use anyhow::Result;

use crate::geometry::Viewport;
use crate::map::backends::BackendKind;
use crate::map::engines::{initial_camera, REFERENCE_LAYER_OPACITY};
use crate::map::native::{
    BackendUnavailable, LineStyle, NativeEngine, Overlay, OverlayTiles, Scene,
};
use crate::mbtiles::MbtilesFile;

/// Google Maps. Needs Play Services on the device; reads offline raster
/// tiles straight from the package.
#[derive(Debug)]
pub struct GoogleEngine {
    scene: Scene,
    play_services: bool,
}

impl GoogleEngine {
    pub fn new(play_services: bool, map_type: &str) -> Self {
        Self {
            scene: Scene::new(initial_camera(), map_type),
            play_services,
        }
    }
}

impl NativeEngine for GoogleEngine {
    fn kind(&self) -> BackendKind {
        BackendKind::Google
    }

    fn attach(&mut self, _viewport: Viewport) -> Result<(), BackendUnavailable> {
        if !self.play_services {
            return Err(BackendUnavailable {
                backend: BackendKind::Google,
                reason: "Google Play Services are not available".to_string(),
            });
        }
        Ok(())
    }

    fn zoom_range(&self) -> RangeInclusive<f64> {
        2.0..=21.0
    }

    fn line_style(&self, closed: bool) -> LineStyle {
        if closed {
            LineStyle::Polygon
        } else {
            LineStyle::Polyline
        }
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
