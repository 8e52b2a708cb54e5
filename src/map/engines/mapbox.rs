use std::ops::RangeInclusive;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use crate::format::LayerType;
use crate::geometry::Viewport;
use crate::map::backends::BackendKind;
use crate::map::engines::{initial_camera, OSM_TILE_URL, REFERENCE_LAYER_OPACITY};
use crate::map::native::{BackendUnavailable, NativeEngine, Overlay, OverlayTiles, Scene};
use crate::mbtiles::MbtilesFile;
use crate::server::TileHttpServer;

/// Mapbox GL. Loads offline packages through the local tile server and
/// styles vector layers itself.
pub struct MapboxEngine {
    scene: Scene,
    access_token: Option<String>,
    style_url: String,
    tile_server: Arc<TileHttpServer>,
}

impl MapboxEngine {
    pub fn new(
        access_token: Option<String>,
        style_url: &str,
        tile_server: Arc<TileHttpServer>,
    ) -> Self {
        Self {
            scene: Scene::new(initial_camera(), style_url),
            access_token: access_token.filter(|token| !token.trim().is_empty()),
            style_url: style_url.to_string(),
            tile_server,
        }
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }
}

impl NativeEngine for MapboxEngine {
    fn kind(&self) -> BackendKind {
        BackendKind::Mapbox
    }

    fn attach(&mut self, _viewport: Viewport) -> Result<(), BackendUnavailable> {
        if self.access_token.is_some() {
            self.scene.set_base_style(self.style_url.as_str());
        } else {
            warn!("no Mapbox access token, falling back to OpenStreetMap tiles");
            self.scene.set_base_style(OSM_TILE_URL);
        }
        if let Err(err) = self.tile_server.start() {
            warn!(error = %err, "could not start the tile server");
        }
        Ok(())
    }

    fn zoom_range(&self) -> RangeInclusive<f64> {
        0.0..=25.5
    }

    fn add_reference_layer(&mut self, id: &str, file: MbtilesFile) -> Result<()> {
        self.tile_server
            .start()
            .context("reference layers need the tile server")?;
        let file = Arc::new(file);
        self.tile_server.add_source(id, file.clone());
        let template = self.tile_server.url_template(id);
        let style_layers = match file.layer_type() {
            LayerType::Vector => file
                .vector_layers()
                .iter()
                .flat_map(|layer| {
                    [
                        format!("{id}/{}.fill", layer.id),
                        format!("{id}/{}.line", layer.id),
                    ]
                })
                .collect(),
            LayerType::Raster => vec![format!("{id}.raster")],
        };
        self.scene.add_overlay(Overlay {
            id: id.to_string(),
            layer_type: file.layer_type(),
            tiles: OverlayTiles::Url {
                tilejson: file.tilejson(&template),
                template,
            },
            style_layers,
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
