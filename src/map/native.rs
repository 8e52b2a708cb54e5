//! The native side of a map: the objects an engine draws and the events its
//! gesture and location machinery reports.

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use serde_json::Value;
use thiserror::Error;

use crate::format::LayerType;
use crate::geometry::Viewport;
use crate::map::backends::BackendKind;
use crate::map::location::LocationFix;
use crate::mbtiles::MbtilesFile;
use crate::point::MapPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(u64);

/// Posted from any thread, applied when the map is pumped.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    Click(MapPoint),
    LongPress(MapPoint),
    DragStart(HandleId),
    Drag(HandleId, MapPoint),
    DragEnd(HandleId, MapPoint),
    LocationFix { session: u64, fix: LocationFix },
}

#[derive(Debug, Clone)]
pub struct NativeEvents {
    sender: Sender<NativeEvent>,
}

impl NativeEvents {
    pub fn post(&self, event: NativeEvent) {
        let _ = self.sender.send(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub center: MapPoint,
    pub zoom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeHandle {
    pub position: MapPoint,
    pub draggable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Polyline,
    Polygon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeLine {
    pub style: LineStyle,
    pub vertices: Vec<MapPoint>,
}

#[derive(Debug, Clone)]
pub enum OverlayTiles {
    Url { template: String, tilejson: Value },
    Package(Arc<MbtilesFile>),
}

#[derive(Debug, Clone)]
pub struct Overlay {
    pub id: String,
    pub layer_type: LayerType,
    pub tiles: OverlayTiles,
    pub style_layers: Vec<String>,
    pub opacity: f32,
}

#[derive(Debug, Error)]
#[error("{backend} map is unavailable: {reason}")]
pub struct BackendUnavailable {
    pub backend: BackendKind,
    pub reason: String,
}

/// In-memory stand-in for an engine's render tree.
#[derive(Debug)]
pub struct Scene {
    viewport: Option<Viewport>,
    camera: Camera,
    camera_moves: usize,
    last_move_animated: bool,
    base_style: String,
    handles: HashMap<HandleId, NativeHandle>,
    lines: HashMap<LineId, NativeLine>,
    overlays: Vec<Overlay>,
    next_object: u64,
    sender: Sender<NativeEvent>,
    receiver: Receiver<NativeEvent>,
}

impl Scene {
    pub fn new(camera: Camera, base_style: impl Into<String>) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            viewport: None,
            camera,
            camera_moves: 0,
            last_move_animated: false,
            base_style: base_style.into(),
            handles: HashMap::new(),
            lines: HashMap::new(),
            overlays: Vec::new(),
            next_object: 1,
            sender,
            receiver,
        }
    }

    pub fn events(&self) -> NativeEvents {
        NativeEvents {
            sender: self.sender.clone(),
        }
    }

    pub fn take_events(&self) -> Vec<NativeEvent> {
        self.receiver.try_iter().collect()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn move_camera(&mut self, camera: Camera, animate: bool) {
        self.camera = camera;
        self.camera_moves += 1;
        self.last_move_animated = animate;
    }

    pub fn camera_moves(&self) -> usize {
        self.camera_moves
    }

    pub fn last_move_animated(&self) -> bool {
        self.last_move_animated
    }

    pub fn base_style(&self) -> &str {
        &self.base_style
    }

    pub fn set_base_style(&mut self, style: impl Into<String>) {
        self.base_style = style.into();
    }

    fn next_object(&mut self) -> u64 {
        let id = self.next_object;
        self.next_object += 1;
        id
    }

    pub fn add_handle(&mut self, position: MapPoint, draggable: bool) -> HandleId {
        let id = HandleId(self.next_object());
        self.handles.insert(
            id,
            NativeHandle {
                position,
                draggable,
            },
        );
        id
    }

    pub fn handle(&self, id: HandleId) -> Option<&NativeHandle> {
        self.handles.get(&id)
    }

    pub fn move_handle(&mut self, id: HandleId, position: MapPoint) {
        if let Some(handle) = self.handles.get_mut(&id) {
            handle.position = position;
        }
    }

    pub fn remove_handle(&mut self, id: HandleId) -> bool {
        self.handles.remove(&id).is_some()
    }

    pub fn handle_ids(&self) -> Vec<HandleId> {
        let mut ids = self.handles.keys().copied().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    pub fn add_line(&mut self, style: LineStyle) -> LineId {
        let id = LineId(self.next_object());
        self.lines.insert(
            id,
            NativeLine {
                style,
                vertices: Vec::new(),
            },
        );
        id
    }

    pub fn line(&self, id: LineId) -> Option<&NativeLine> {
        self.lines.get(&id)
    }

    pub fn set_line_vertices(&mut self, id: LineId, vertices: Vec<MapPoint>) {
        if let Some(line) = self.lines.get_mut(&id) {
            line.vertices = vertices;
        }
    }

    pub fn lines(&self) -> Vec<&NativeLine> {
        let mut ids = self.lines.keys().copied().collect::<Vec<_>>();
        ids.sort();
        ids.into_iter().filter_map(|id| self.lines.get(&id)).collect()
    }

    pub fn remove_line(&mut self, id: LineId) -> bool {
        self.lines.remove(&id).is_some()
    }

    pub fn live_objects(&self) -> usize {
        self.handles.len() + self.lines.len()
    }

    pub fn add_overlay(&mut self, overlay: Overlay) {
        self.overlays.retain(|existing| existing.id != overlay.id);
        self.overlays.push(overlay);
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

pub trait NativeEngine {
    fn kind(&self) -> BackendKind;

    fn attach(&mut self, viewport: Viewport) -> Result<(), BackendUnavailable>;

    fn zoom_range(&self) -> RangeInclusive<f64>;

    fn snap_zoom(&self, zoom: f64) -> f64 {
        let range = self.zoom_range();
        zoom.clamp(*range.start(), *range.end())
    }

    /// Zoom used when fitting a rectangle, which must not crop it.
    fn snap_fit_zoom(&self, zoom: f64) -> f64 {
        self.snap_zoom(zoom)
    }

    fn line_style(&self, _closed: bool) -> LineStyle {
        LineStyle::Polyline
    }

    fn supports_layer(&self, layer_type: LayerType) -> bool {
        self.kind().supports_layer(layer_type)
    }

    fn add_reference_layer(&mut self, id: &str, file: MbtilesFile) -> anyhow::Result<()>;

    fn scene(&self) -> &Scene;

    fn scene_mut(&mut self) -> &mut Scene;
}
