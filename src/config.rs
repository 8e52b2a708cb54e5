use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::map::backends::{BackendEntry, BackendKind, StyleOption};
use crate::map::POINT_ZOOM;
use crate::server::DEFAULT_PORT;

/// Settings read from a JSON file. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub tile_server_port: u16,
    pub request_timeout_ms: u64,
    pub camera_settle_delay_ms: u64,
    pub point_zoom: f64,
    pub offline_layers_dir: Option<PathBuf>,
    pub mapbox_access_token: Option<String>,
    pub google_play_services: bool,
    pub default_backend: String,
    /// Chosen style option per base layer id.
    pub backend_styles: BTreeMap<String, String>,
    pub backends: Vec<BackendEntry>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_server_port: DEFAULT_PORT,
            request_timeout_ms: 10_000,
            camera_settle_delay_ms: 100,
            point_zoom: POINT_ZOOM,
            offline_layers_dir: None,
            mapbox_access_token: None,
            google_play_services: true,
            default_backend: "google".to_string(),
            backend_styles: BTreeMap::new(),
            backends: default_backends(),
        }
    }
}

impl MapConfig {
    pub fn load_from_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("invalid config: {}", path.display()))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_json(path),
            None => Ok(Self::default()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn camera_settle_delay(&self) -> Duration {
        Duration::from_millis(self.camera_settle_delay_ms)
    }
}

pub fn default_backends() -> Vec<BackendEntry> {
    let entry = |id: &str, name: &str, kind: BackendKind, style: Option<&str>| BackendEntry {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        style: style.map(str::to_string),
        options: Vec::new(),
    };
    let usgs = |service: &str| {
        format!(
            "https://basemap.nationalmap.gov/arcgis/rest/services/{service}/MapServer/tile/{{z}}/{{y}}/{{x}}"
        )
    };
    let (topo, hybrid, imagery) = (
        usgs("USGSTopo"),
        usgs("USGSImageryTopo"),
        usgs("USGSImageryOnly"),
    );
    vec![
        with_options(
            entry("google", "Google", BackendKind::Google, None),
            &[
                ("streets", "Streets", "roadmap"),
                ("terrain", "Terrain", "terrain"),
                ("hybrid", "Hybrid", "hybrid"),
                ("satellite", "Satellite", "satellite"),
            ],
        ),
        entry(
            "mapbox",
            "Mapbox",
            BackendKind::Mapbox,
            Some("mapbox://styles/mapbox/streets-v11"),
        ),
        entry(
            "osm",
            "OpenStreetMap",
            BackendKind::Osm,
            Some("https://tile.openstreetmap.org/{z}/{x}/{y}.png"),
        ),
        with_options(
            entry("usgs", "USGS", BackendKind::Osm, None),
            &[
                ("topo", "Topographic", topo.as_str()),
                ("hybrid", "Hybrid", hybrid.as_str()),
                ("imagery", "Imagery", imagery.as_str()),
            ],
        ),
        entry(
            "stamen",
            "Stamen",
            BackendKind::Osm,
            Some("https://tile.stamen.com/terrain/{z}/{x}/{y}.jpg"),
        ),
        with_options(
            entry("carto", "Carto", BackendKind::Osm, None),
            &[
                (
                    "positron",
                    "Positron",
                    "https://basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png",
                ),
                (
                    "dark_matter",
                    "Dark Matter",
                    "https://basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png",
                ),
            ],
        ),
    ]
}

fn with_options(entry: BackendEntry, options: &[(&str, &str, &str)]) -> BackendEntry {
    BackendEntry {
        options: options
            .iter()
            .map(|(id, name, style)| StyleOption {
                id: id.to_string(),
                name: name.to_string(),
                style: style.to_string(),
            })
            .collect(),
        ..entry
    }
}
