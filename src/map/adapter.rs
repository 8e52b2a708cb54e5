use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::geometry::{
    fit_center, fit_zoom, Bounds, Feature, FeatureId, MarkerModel, PolyModel, Viewport,
};
use crate::map::location::{FixSink, LocationClient, LocationFix};
use crate::map::native::{Camera, HandleId, NativeEngine, NativeEvent, NativeEvents, Scene};
use crate::map::registry::{FeatureEntry, FeatureRegistry, Visuals};
use crate::map::{
    FeatureListener, MapFragment, PointListener, ReadyCallback, POINT_ZOOM,
};
use crate::mbtiles::MbtilesFile;
use crate::offline::layer_id;
use crate::point::MapPoint;

pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

const FALLBACK_VIEWPORT: Viewport = Viewport {
    width: 256,
    height: 256,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attachment {
    Detached,
    Attached,
    Unavailable,
}

#[derive(Debug, Clone, Copy)]
struct DeferredMove {
    due: Instant,
    camera: Camera,
    animate: bool,
}

/// Not `Send`: native events reach it through [`NativeEvents`].
pub struct EngineMap<E: NativeEngine> {
    engine: E,
    attachment: Attachment,
    pending_ready: Vec<ReadyCallback>,
    features: FeatureRegistry,
    point_zoom: f64,
    settle_delay: Duration,
    deferred: Vec<DeferredMove>,
    dragging: Option<FeatureId>,
    click_listener: Option<PointListener>,
    long_press_listener: Option<PointListener>,
    drag_end_listener: Option<FeatureListener>,
    gps_listener: Option<PointListener>,
    location: Box<dyn LocationClient>,
    gps_enabled: bool,
    gps_session: u64,
    last_fix: Option<LocationFix>,
    gps_ready: Vec<ReadyCallback>,
}

impl<E: NativeEngine + 'static> EngineMap<E> {
    pub fn new(engine: E, location: Box<dyn LocationClient>) -> Self {
        Self {
            engine,
            attachment: Attachment::Detached,
            pending_ready: Vec::new(),
            features: FeatureRegistry::new(),
            point_zoom: POINT_ZOOM,
            settle_delay: DEFAULT_SETTLE_DELAY,
            deferred: Vec::new(),
            dragging: None,
            click_listener: None,
            long_press_listener: None,
            drag_end_listener: None,
            gps_listener: None,
            location,
            gps_enabled: false,
            gps_session: 0,
            last_fix: None,
            gps_ready: Vec::new(),
        }
    }

    pub fn with_point_zoom(mut self, zoom: f64) -> Self {
        self.point_zoom = zoom;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn scene(&self) -> &Scene {
        self.engine.scene()
    }

    pub fn native_events(&self) -> NativeEvents {
        self.engine.scene().events()
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn pending_camera_moves(&self) -> usize {
        self.deferred.len()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    fn usable(&self) -> bool {
        self.attachment != Attachment::Unavailable
    }

    fn as_fragment(&mut self) -> &mut dyn MapFragment {
        self
    }

    fn move_camera(&mut self, camera: Camera, animate: bool) {
        self.deferred.clear();
        self.engine.scene_mut().move_camera(camera, animate);
    }

    fn apply_due_moves(&mut self) {
        if self.deferred.is_empty() {
            return;
        }
        let now = Instant::now();
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deferred)
            .into_iter()
            .partition(|pending| pending.due <= now);
        self.deferred = waiting;
        for pending in due {
            self.engine
                .scene_mut()
                .move_camera(pending.camera, pending.animate);
        }
    }

    fn dispatch(&mut self, event: NativeEvent) {
        match event {
            NativeEvent::Click(point) => {
                if self.dragging.is_some() {
                    debug!(%point, "ignoring click during drag");
                    return;
                }
                if let Some(listener) = self.click_listener.as_mut() {
                    listener(point);
                }
            }
            NativeEvent::LongPress(point) => {
                if self.dragging.is_some() {
                    debug!(%point, "ignoring long press during drag");
                    return;
                }
                if let Some(listener) = self.long_press_listener.as_mut() {
                    listener(point);
                }
            }
            NativeEvent::DragStart(handle) => {
                if let Some((id, _)) = self.features.owner(handle) {
                    self.dragging = Some(id);
                }
            }
            NativeEvent::Drag(handle, position) => {
                if let Some(id) = self.apply_drag(handle, position) {
                    self.dragging = Some(id);
                }
            }
            NativeEvent::DragEnd(handle, position) => {
                self.dragging = None;
                if let Some(id) = self.apply_drag(handle, position) {
                    if let Some(listener) = self.drag_end_listener.as_mut() {
                        listener(id);
                    }
                }
            }
            NativeEvent::LocationFix { session, fix } => self.accept_fix(session, fix),
        }
    }

    fn apply_drag(&mut self, handle: HandleId, position: MapPoint) -> Option<FeatureId> {
        let Some((id, index)) = self.features.owner(handle) else {
            debug!(%handle, "ignoring drag of a removed feature");
            return None;
        };
        let entry = self.features.get_mut(id)?;
        let position = position.position_only();
        let scene = self.engine.scene_mut();
        match (&mut entry.model, &entry.visuals) {
            (Feature::Marker(marker), Visuals::Marker { .. }) => {
                if !marker.drag_to(position) {
                    return None;
                }
                scene.move_handle(handle, position);
            }
            (Feature::Poly(poly), Visuals::Poly { line, .. }) => {
                if !poly.drag_vertex(index, position) {
                    return None;
                }
                scene.move_handle(handle, position);
                scene.set_line_vertices(*line, poly.outline());
            }
            _ => return None,
        }
        Some(id)
    }

    fn accept_fix(&mut self, session: u64, fix: LocationFix) {
        if !self.gps_enabled || session != self.gps_session {
            debug!(session, current = self.gps_session, "dropping stale location fix");
            return;
        }
        let point = fix.point;
        self.last_fix = Some(fix);
        if let Some(listener) = self.gps_listener.as_mut() {
            listener(point);
        }
    }
}

impl<E: NativeEngine + 'static> MapFragment for EngineMap<E> {
    fn add_to(&mut self, viewport: Viewport, ready: ReadyCallback) {
        if self.attachment == Attachment::Detached {
            let kind = self.engine.kind();
            match self.engine.attach(viewport) {
                Ok(()) => {
                    self.engine.scene_mut().set_viewport(viewport);
                    self.attachment = Attachment::Attached;
                    info!(backend = %kind, width = viewport.width, height = viewport.height, "map attached");
                }
                Err(err) => {
                    warn!(backend = %kind, error = %err, "map backend unavailable");
                    self.attachment = Attachment::Unavailable;
                }
            }
        } else {
            warn!(backend = %self.engine.kind(), "map is already attached");
        }
        self.pending_ready.push(ready);
    }

    fn pump(&mut self) {
        for ready in std::mem::take(&mut self.pending_ready) {
            if self.attachment == Attachment::Unavailable {
                ready(None);
            } else {
                ready(Some(self.as_fragment()));
            }
        }
        if !self.usable() {
            self.engine.scene().take_events();
            return;
        }
        for event in self.engine.scene().take_events() {
            self.dispatch(event);
        }
        if self.last_fix.is_some() {
            for listener in std::mem::take(&mut self.gps_ready) {
                listener(Some(self.as_fragment()));
            }
        }
        self.apply_due_moves();
    }

    fn is_available(&self) -> bool {
        self.attachment == Attachment::Attached
    }

    fn center(&self) -> MapPoint {
        self.engine.scene().camera().center
    }

    fn zoom(&self) -> f64 {
        self.engine.scene().camera().zoom
    }

    fn set_zoom(&mut self, zoom: f64, animate: bool) -> f64 {
        if !self.usable() {
            return self.zoom();
        }
        let applied = self.engine.snap_zoom(zoom);
        let center = self.center();
        self.move_camera(
            Camera {
                center,
                zoom: applied,
            },
            animate,
        );
        applied
    }

    fn set_center(&mut self, center: Option<MapPoint>, animate: bool) {
        let Some(center) = center else {
            return;
        };
        if !self.usable() {
            return;
        }
        let zoom = self.zoom();
        self.move_camera(
            Camera {
                center: center.position_only(),
                zoom,
            },
            animate,
        );
    }

    fn zoom_to_point(&mut self, center: Option<MapPoint>, zoom: Option<f64>, animate: bool) {
        let Some(center) = center else {
            return;
        };
        if !self.usable() {
            return;
        }
        let zoom = self.engine.snap_zoom(zoom.unwrap_or(self.point_zoom));
        self.move_camera(
            Camera {
                center: center.position_only(),
                zoom,
            },
            animate,
        );
    }

    fn zoom_to_bounding_box(&mut self, points: &[MapPoint], padding_factor: f64, animate: bool) {
        if !self.usable() {
            return;
        }
        if points.len() == 1 {
            self.zoom_to_point(Some(points[0]), None, animate);
            return;
        }
        let Some(bounds) = Bounds::enclosing(points) else {
            return;
        };
        let factor = if padding_factor.is_finite() && padding_factor > 0.0 {
            1.0 / padding_factor
        } else {
            warn!(padding_factor, "invalid padding factor, fitting without padding");
            1.0
        };
        let bounds = bounds.expand(factor);
        let viewport = self.engine.scene().viewport().unwrap_or(FALLBACK_VIEWPORT);
        let zoom = match fit_zoom(&bounds, viewport) {
            zoom if zoom.is_finite() => zoom,
            _ => *self.engine.zoom_range().end(),
        };
        let camera = Camera {
            center: fit_center(&bounds),
            zoom: self.engine.snap_fit_zoom(zoom),
        };
        debug!(?bounds, zoom = camera.zoom, "scheduled bounding box fit");
        self.deferred.push(DeferredMove {
            due: Instant::now() + self.settle_delay,
            camera,
            animate,
        });
    }

    fn add_marker(&mut self, point: MapPoint, draggable: bool) -> FeatureId {
        let id = self.features.allocate();
        if !self.usable() {
            return id;
        }
        let handle = self.engine.scene_mut().add_handle(point, draggable);
        self.features.insert(
            id,
            FeatureEntry {
                model: Feature::Marker(MarkerModel::new(point, draggable)),
                visuals: Visuals::Marker { handle },
            },
        );
        debug!(feature = %id, %point, "added marker");
        id
    }

    fn marker_point(&self, id: FeatureId) -> Option<MapPoint> {
        self.features
            .get(id)
            .and_then(|entry| entry.model.as_marker())
            .map(MarkerModel::point)
    }

    fn add_draggable_poly(&mut self, points: &[MapPoint], closed: bool) -> FeatureId {
        let id = self.features.allocate();
        if !self.usable() {
            return id;
        }
        let poly = PolyModel::new(points.iter().copied(), closed);
        let style = self.engine.line_style(closed);
        let scene = self.engine.scene_mut();
        let handles = poly
            .points()
            .iter()
            .map(|point| scene.add_handle(*point, true))
            .collect::<Vec<_>>();
        let line = scene.add_line(style);
        scene.set_line_vertices(line, poly.outline());
        self.features.insert(
            id,
            FeatureEntry {
                model: Feature::Poly(poly),
                visuals: Visuals::Poly { handles, line },
            },
        );
        debug!(feature = %id, vertices = points.len(), closed, "added poly");
        id
    }

    fn append_point_to_poly(&mut self, id: FeatureId, point: MapPoint) {
        let Some(entry) = self.features.get_mut(id) else {
            return;
        };
        let (Feature::Poly(poly), Visuals::Poly { handles, line }) =
            (&mut entry.model, &mut entry.visuals)
        else {
            return;
        };
        let index = poly.append(point);
        let scene = self.engine.scene_mut();
        let handle = scene.add_handle(point, true);
        handles.push(handle);
        scene.set_line_vertices(*line, poly.outline());
        self.features.bind_handle(handle, id, index);
    }

    fn remove_poly_last_point(&mut self, id: FeatureId) {
        let Some(entry) = self.features.get_mut(id) else {
            return;
        };
        let (Feature::Poly(poly), Visuals::Poly { handles, line }) =
            (&mut entry.model, &mut entry.visuals)
        else {
            return;
        };
        if poly.remove_last().is_none() {
            return;
        }
        let scene = self.engine.scene_mut();
        let removed = handles.pop();
        if let Some(handle) = removed {
            scene.remove_handle(handle);
        }
        scene.set_line_vertices(*line, poly.outline());
        if let Some(handle) = removed {
            self.features.unbind_handle(handle);
        }
    }

    fn poly_points(&self, id: FeatureId) -> Vec<MapPoint> {
        self.features
            .get(id)
            .and_then(|entry| entry.model.as_poly())
            .map(|poly| poly.points().to_vec())
            .unwrap_or_default()
    }

    fn remove_feature(&mut self, id: FeatureId) {
        if let Some(entry) = self.features.remove(id) {
            entry.visuals.dispose(self.engine.scene_mut());
            if self.dragging == Some(id) {
                self.dragging = None;
            }
            debug!(feature = %id, "removed feature");
        }
    }

    fn clear_features(&mut self) {
        let removed = self.features.drain();
        let count = removed.len();
        self.dragging = None;
        let scene = self.engine.scene_mut();
        for (_, entry) in removed {
            entry.visuals.dispose(scene);
        }
        debug!(count, "cleared features");
    }

    fn set_click_listener(&mut self, listener: Option<PointListener>) {
        self.click_listener = listener;
    }

    fn set_long_press_listener(&mut self, listener: Option<PointListener>) {
        self.long_press_listener = listener;
    }

    fn set_drag_end_listener(&mut self, listener: Option<FeatureListener>) {
        self.drag_end_listener = listener;
    }

    fn set_gps_location_listener(&mut self, listener: Option<PointListener>) {
        self.gps_listener = listener;
    }

    fn set_gps_location_enabled(&mut self, enabled: bool) {
        if enabled == self.gps_enabled {
            return;
        }
        if enabled {
            if !self.usable() {
                return;
            }
            self.gps_session += 1;
            let sink = FixSink::new(self.engine.scene().events(), self.gps_session);
            match self.location.start(sink) {
                Ok(()) => {
                    self.gps_enabled = true;
                    debug!(session = self.gps_session, "location updates started");
                }
                Err(err) => warn!(error = %err, "could not start location updates"),
            }
        } else {
            self.location.stop();
            self.gps_enabled = false;
            self.gps_session += 1;
            debug!("location updates stopped");
        }
    }

    fn gps_location(&self) -> Option<MapPoint> {
        self.last_fix.as_ref().map(|fix| fix.point)
    }

    fn location_provider(&self) -> Option<String> {
        self.last_fix.as_ref().map(|fix| fix.provider.clone())
    }

    fn run_on_gps_location_ready(&mut self, listener: ReadyCallback) {
        self.gps_ready.push(listener);
    }

    fn add_reference_layer(&mut self, path: &Path) -> Result<()> {
        let kind = self.engine.kind();
        if !self.usable() {
            anyhow::bail!("{kind} map is unavailable");
        }
        let id = layer_id(path)
            .with_context(|| format!("no layer name in {}", path.display()))?;
        let file = MbtilesFile::open(path)
            .with_context(|| format!("failed to open reference layer {}", path.display()))?;
        let layer_type = file.layer_type();
        if !self.engine.supports_layer(layer_type) {
            anyhow::bail!("{kind} maps cannot display {layer_type} layer {id}");
        }
        self.engine.add_reference_layer(&id, file)?;
        info!(layer = %id, backend = %kind, %layer_type, "added reference layer");
        Ok(())
    }
}

impl<E: NativeEngine> Drop for EngineMap<E> {
    fn drop(&mut self) {
        if self.gps_enabled {
            self.location.stop();
        }
    }
}
