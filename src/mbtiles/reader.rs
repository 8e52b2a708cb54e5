use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::format::{LayerType, TileFormat};
use crate::mbtiles::error::MbtilesError;
use crate::mbtiles::types::{TileBounds, TileCenter, TileCoord, TilesetInfo, VectorLayer};
use crate::server::{Tile, TileSource};

const MAX_IDLE_CONNECTIONS: usize = 4;

/// A read-only MBTiles package.
///
/// Lookups may run from several threads at once; each borrows its own SQLite
/// connection from a small pool.
#[derive(Debug)]
pub struct MbtilesFile {
    path: PathBuf,
    info: TilesetInfo,
    idle: Mutex<Vec<Connection>>,
}

impl MbtilesFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MbtilesError> {
        let path = path.as_ref().to_path_buf();
        let conn = open_readonly_mbtiles(&path)?;
        let tag = read_metadata(&conn, "format")?.unwrap_or_default();
        let format = TileFormat::from_tag(&tag).ok_or(MbtilesError::UnsupportedFormat(tag))?;
        let info = load_info(&conn, format)?;
        debug!(
            path = %path.display(),
            format = ?info.format,
            layers = info.vector_layers.len(),
            "opened mbtiles"
        );
        Ok(Self {
            path,
            info,
            idle: Mutex::new(vec![conn]),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self) -> &TilesetInfo {
        &self.info
    }

    pub fn format(&self) -> TileFormat {
        self.info.format
    }

    pub fn layer_type(&self) -> LayerType {
        self.info.layer_type
    }

    pub fn content_type(&self) -> &'static str {
        self.info.content_type
    }

    pub fn content_encoding(&self) -> Option<&'static str> {
        self.info.content_encoding
    }

    pub fn vector_layers(&self) -> &[VectorLayer] {
        &self.info.vector_layers
    }

    pub fn metadata(&self, key: &str) -> Result<Option<String>, MbtilesError> {
        self.with_connection(|conn| read_metadata(conn, key))
    }

    pub fn tile_data(&self, coord: TileCoord) -> Result<Option<Vec<u8>>, MbtilesError> {
        let Some(row) = coord.tms_row() else {
            return Ok(None);
        };
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT tile_data FROM tiles WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3",
                params![coord.zoom, coord.x, row],
                |row| row.get(0),
            )
            .optional()
            .map_err(MbtilesError::from)
        })
    }

    pub fn get_tile(&self, coord: TileCoord) -> Result<Option<Tile>, MbtilesError> {
        Ok(self.tile_data(coord)?.map(|data| Tile {
            data,
            content_type: self.info.content_type,
            content_encoding: self.info.content_encoding,
        }))
    }

    /// A TileJSON 2.2.0 document describing this package, served from
    /// `url_template`.
    pub fn tilejson(&self, url_template: &str) -> Value {
        let info = &self.info;
        let mut doc = json!({
            "tilejson": "2.2.0",
            "name": info.name,
            "scheme": "xyz",
            "format": info.format,
            "tiles": [url_template],
        });
        if let Some(min_zoom) = info.min_zoom {
            doc["minzoom"] = json!(min_zoom);
        }
        if let Some(max_zoom) = info.max_zoom {
            doc["maxzoom"] = json!(max_zoom);
        }
        if let Some(center) = info.center {
            doc["center"] = json!([center.lon, center.lat, center.zoom]);
        }
        if let Some(bounds) = info.bounds {
            doc["bounds"] = json!([bounds.west, bounds.south, bounds.east, bounds.north]);
        }
        if info.layer_type == LayerType::Vector {
            doc["vector_layers"] = json!(info
                .vector_layers
                .iter()
                .map(|layer| json!({ "id": layer.id, "description": layer.description }))
                .collect::<Vec<_>>());
        }
        doc
    }

    fn with_connection<T>(
        &self,
        query: impl FnOnce(&Connection) -> Result<T, MbtilesError>,
    ) -> Result<T, MbtilesError> {
        let pooled = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let conn = match pooled {
            Some(conn) => conn,
            None => open_readonly_mbtiles(&self.path)?,
        };
        let result = query(&conn);
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < MAX_IDLE_CONNECTIONS {
            idle.push(conn);
        }
        result
    }
}

impl TileSource for MbtilesFile {
    fn tile(&self, coord: TileCoord) -> Option<Tile> {
        match self.get_tile(coord) {
            Ok(tile) => tile,
            Err(err) => {
                warn!(path = %self.path.display(), tile = %coord, error = %err, "tile lookup failed");
                None
            }
        }
    }
}

fn open_readonly_mbtiles(path: &Path) -> Result<Connection, MbtilesError> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
        |source| MbtilesError::Open {
            path: path.to_path_buf(),
            source,
        },
    )?;
    apply_read_pragmas(&conn)?;
    Ok(conn)
}

fn apply_read_pragmas(conn: &Connection) -> Result<(), MbtilesError> {
    conn.execute_batch(
        "
        PRAGMA query_only = ON;
        PRAGMA temp_store = MEMORY;
        PRAGMA cache_size = -8000;
        ",
    )?;
    Ok(())
}

fn read_metadata(conn: &Connection, key: &str) -> Result<Option<String>, MbtilesError> {
    let value = conn
        .query_row(
            "SELECT value FROM metadata WHERE name = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn load_info(conn: &Connection, format: TileFormat) -> Result<TilesetInfo, MbtilesError> {
    let name = read_metadata(conn, "name")?.unwrap_or_default();
    let min_zoom = read_metadata(conn, "minzoom")?.and_then(|value| value.trim().parse().ok());
    let max_zoom = read_metadata(conn, "maxzoom")?.and_then(|value| value.trim().parse().ok());
    let center = read_metadata(conn, "center")?.and_then(|value| parse_center(&value));
    let bounds = read_metadata(conn, "bounds")?.and_then(|value| parse_bounds(&value));
    let vector_layers = match format.layer_type() {
        LayerType::Vector => read_metadata(conn, "json")?
            .map(|value| parse_vector_layers(&value))
            .unwrap_or_default(),
        LayerType::Raster => Vec::new(),
    };
    Ok(TilesetInfo {
        name,
        format,
        layer_type: format.layer_type(),
        content_type: format.content_type(),
        content_encoding: format.declared_encoding(),
        min_zoom,
        max_zoom,
        center,
        bounds,
        vector_layers,
    })
}

fn parse_numbers<const N: usize>(value: &str) -> Option<[f64; N]> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    parts.try_into().ok()
}

/// Parses the `center` metadata row, `lat,lon,zoom`.
pub fn parse_center(value: &str) -> Option<TileCenter> {
    let [lat, lon, zoom] = parse_numbers::<3>(value)?;
    Some(TileCenter { lat, lon, zoom })
}

pub fn parse_bounds(value: &str) -> Option<TileBounds> {
    let [west, south, east, north] = parse_numbers::<4>(value)?;
    Some(TileBounds {
        west,
        south,
        east,
        north,
    })
}

pub fn parse_vector_layers(value: &str) -> Vec<VectorLayer> {
    let doc: Value = match serde_json::from_str(value) {
        Ok(doc) => doc,
        Err(err) => {
            debug!(error = %err, "ignoring malformed json metadata");
            return Vec::new();
        }
    };
    let Some(layers) = doc.get("vector_layers").and_then(Value::as_array) else {
        return Vec::new();
    };
    layers
        .iter()
        .map(|layer| VectorLayer {
            id: string_field(layer, "id"),
            description: string_field(layer, "description"),
        })
        .collect()
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
