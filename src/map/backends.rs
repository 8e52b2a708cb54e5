use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{default_backends, MapConfig};
use crate::format::LayerType;
use crate::map::adapter::EngineMap;
use crate::map::engines::{GoogleEngine, MapboxEngine, OsmEngine, OSM_TILE_URL};
use crate::map::location::LocationClient;
use crate::map::native::NativeEngine;
use crate::map::MapFragment;
use crate::server::TileHttpServer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Google,
    Mapbox,
    Osm,
}

impl BackendKind {
    pub fn supports_layer(self, layer_type: LayerType) -> bool {
        match self {
            BackendKind::Mapbox => true,
            BackendKind::Google | BackendKind::Osm => layer_type == LayerType::Raster,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Google => f.write_str("google"),
            BackendKind::Mapbox => f.write_str("mapbox"),
            BackendKind::Osm => f.write_str("osm"),
        }
    }
}

/// A base layer the user can pick: which engine draws it and with what base
/// style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendEntry {
    pub id: String,
    pub name: String,
    pub kind: BackendKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<StyleOption>,
}

/// One selectable style of a base layer, such as a topo or imagery variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleOption {
    pub id: String,
    pub name: String,
    pub style: String,
}

impl BackendEntry {
    /// The style for `option`, else the first option, else the fixed style.
    pub fn resolve_style(&self, option: Option<&str>) -> Option<&str> {
        let chosen = option.and_then(|option| self.options.iter().find(|o| o.id == option));
        if let (Some(option), None) = (option, chosen) {
            warn!(backend = %self.id, option, "unknown base layer style");
        }
        chosen
            .or_else(|| self.options.first())
            .map(|option| option.style.as_str())
            .or(self.style.as_deref())
    }
}

pub struct MapContext {
    pub config: MapConfig,
    pub tile_server: Arc<TileHttpServer>,
}

impl MapContext {
    pub fn new(config: MapConfig) -> Self {
        let tile_server = Arc::new(
            TileHttpServer::new(config.tile_server_port)
                .with_request_timeout(config.request_timeout()),
        );
        Self {
            config,
            tile_server,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendRegistry {
    entries: Vec<BackendEntry>,
    default_id: Option<String>,
}

impl BackendRegistry {
    pub fn new(entries: Vec<BackendEntry>) -> Self {
        let entries = if entries.is_empty() {
            default_backends()
        } else {
            entries
        };
        Self {
            entries,
            default_id: None,
        }
    }

    pub fn from_config(config: &MapConfig) -> Self {
        Self::new(config.backends.clone()).with_default(&config.default_backend)
    }

    pub fn with_default(mut self, id: &str) -> Self {
        if self.contains(id) {
            self.default_id = Some(id.to_string());
        } else {
            warn!(backend = id, "default base layer is not configured");
            self.default_id = None;
        }
        self
    }

    pub fn default_entry(&self) -> &BackendEntry {
        self.default_id
            .as_deref()
            .and_then(|id| self.find(id))
            .unwrap_or(&self.entries[0])
    }

    fn find(&self, id: &str) -> Option<&BackendEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn entries(&self) -> &[BackendEntry] {
        &self.entries
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    /// The entry with `id`, or the default entry when there is none.
    pub fn get(&self, id: &str) -> &BackendEntry {
        match self.find(id) {
            Some(entry) => entry,
            None => {
                let fallback = self.default_entry();
                warn!(backend = id, fallback = %fallback.id, "unknown base layer");
                fallback
            }
        }
    }

    pub fn create_default(
        &self,
        context: &MapContext,
        location: Box<dyn LocationClient>,
    ) -> Box<dyn MapFragment> {
        let id = self.default_entry().id.clone();
        self.create(&id, context, location)
    }

    pub fn create(
        &self,
        id: &str,
        context: &MapContext,
        location: Box<dyn LocationClient>,
    ) -> Box<dyn MapFragment> {
        let entry = self.get(id);
        let config = &context.config;
        let option = context.config.backend_styles.get(&entry.id).map(String::as_str);
        let style = entry.resolve_style(option);
        match entry.kind {
            BackendKind::Google => Box::new(configure(
                EngineMap::new(
                    GoogleEngine::new(
                        config.google_play_services,
                        style.unwrap_or("roadmap"),
                    ),
                    location,
                ),
                config,
            )),
            BackendKind::Mapbox => Box::new(configure(
                EngineMap::new(
                    MapboxEngine::new(
                        config.mapbox_access_token.clone(),
                        style.unwrap_or("mapbox://styles/mapbox/streets-v11"),
                        Arc::clone(&context.tile_server),
                    ),
                    location,
                ),
                config,
            )),
            BackendKind::Osm => Box::new(configure(
                EngineMap::new(OsmEngine::new(style.unwrap_or(OSM_TILE_URL)), location),
                config,
            )),
        }
    }
}

fn configure<E: NativeEngine + 'static>(map: EngineMap<E>, config: &MapConfig) -> EngineMap<E> {
    map.with_point_zoom(config.point_zoom)
        .with_settle_delay(config.camera_settle_delay())
}
