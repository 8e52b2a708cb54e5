pub mod google;
pub mod mapbox;
pub mod osm;

pub use self::google::GoogleEngine;
pub use self::mapbox::MapboxEngine;
pub use self::osm::OsmEngine;

use crate::map::native::Camera;
use crate::point::MapPoint;

pub const OSM_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Opacity of offline layers drawn over a base map.
pub const REFERENCE_LAYER_OPACITY: f32 = 0.5;

pub(crate) fn initial_camera() -> Camera {
    Camera {
        center: MapPoint::new(0.0, -30.0),
        zoom: 2.0,
    }
}
