//! Provider-neutral map surface used by the geo form widgets.

pub mod adapter;
pub mod backends;
pub mod engines;
pub mod location;
pub mod native;
pub mod registry;

use std::path::Path;

use anyhow::Result;

use crate::geometry::{FeatureId, Viewport};
use crate::point::MapPoint;

pub use self::adapter::EngineMap;
pub use self::backends::{BackendEntry, BackendKind, BackendRegistry, MapContext, StyleOption};
pub use self::engines::{GoogleEngine, MapboxEngine, OsmEngine};
pub use self::location::{FixSink, LocationClient, LocationFix, NoLocation, ReplayLocationClient};
pub use self::native::{
    BackendUnavailable, Camera, HandleId, LineId, LineStyle, NativeEngine, NativeEvent,
    NativeEvents, Overlay, OverlayTiles, Scene,
};

/// Zoom used when centering on a single point without an explicit zoom.
pub const POINT_ZOOM: f64 = 16.0;

pub type PointListener = Box<dyn FnMut(MapPoint)>;
pub type FeatureListener = Box<dyn FnMut(FeatureId)>;
/// Receives the map once it is usable, or `None` when the backend could not
/// start.
pub type ReadyCallback = Box<dyn FnOnce(Option<&mut dyn MapFragment>)>;

/// Callbacks run on the thread that owns the map, from inside
/// [`MapFragment::pump`], never during the call that registered them.
pub trait MapFragment {
    fn add_to(&mut self, viewport: Viewport, ready: ReadyCallback);

    fn pump(&mut self);

    fn is_available(&self) -> bool;

    fn center(&self) -> MapPoint;

    fn zoom(&self) -> f64;

    /// Sets the zoom and returns the level the backend actually applied.
    fn set_zoom(&mut self, zoom: f64, animate: bool) -> f64;

    fn set_center(&mut self, center: Option<MapPoint>, animate: bool);

    fn zoom_to_point(&mut self, center: Option<MapPoint>, zoom: Option<f64>, animate: bool);

    /// Leaves `1 / padding_factor` of the view around the points.
    fn zoom_to_bounding_box(&mut self, points: &[MapPoint], padding_factor: f64, animate: bool);

    fn add_marker(&mut self, point: MapPoint, draggable: bool) -> FeatureId;

    fn marker_point(&self, id: FeatureId) -> Option<MapPoint>;

    fn add_draggable_poly(&mut self, points: &[MapPoint], closed: bool) -> FeatureId;

    fn append_point_to_poly(&mut self, id: FeatureId, point: MapPoint);

    fn remove_poly_last_point(&mut self, id: FeatureId);

    fn poly_points(&self, id: FeatureId) -> Vec<MapPoint>;

    fn remove_feature(&mut self, id: FeatureId);

    fn clear_features(&mut self);

    fn set_click_listener(&mut self, listener: Option<PointListener>);

    fn set_long_press_listener(&mut self, listener: Option<PointListener>);

    fn set_drag_end_listener(&mut self, listener: Option<FeatureListener>);

    fn set_gps_location_listener(&mut self, listener: Option<PointListener>);

    fn set_gps_location_enabled(&mut self, enabled: bool);

    fn gps_location(&self) -> Option<MapPoint>;

    fn location_provider(&self) -> Option<String>;

    fn run_on_gps_location_ready(&mut self, listener: ReadyCallback);

    fn add_reference_layer(&mut self, path: &Path) -> Result<()>;
}
