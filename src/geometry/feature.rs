use std::fmt;

use serde::Serialize;

use crate::point::MapPoint;

/// Allocated from 1 upwards and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FeatureId(u64);

impl FeatureId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
pub struct FeatureIdAllocator {
    next: u64,
}

impl FeatureIdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate(&mut self) -> FeatureId {
        let id = FeatureId(self.next);
        self.next += 1;
        id
    }
}

impl Default for FeatureIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerModel {
    point: MapPoint,
    draggable: bool,
}

impl MarkerModel {
    pub fn new(point: MapPoint, draggable: bool) -> Self {
        Self { point, draggable }
    }

    pub fn point(&self) -> MapPoint {
        self.point
    }

    pub fn is_draggable(&self) -> bool {
        self.draggable
    }

    pub fn drag_to(&mut self, position: MapPoint) -> bool {
        if !self.draggable {
            return false;
        }
        self.point = position.position_only();
        true
    }
}

/// Insertion order is significant and repeated vertices are kept. A closed
/// poly stores each vertex once; the closing vertex only exists in
/// [`PolyModel::outline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PolyModel {
    points: Vec<MapPoint>,
    closed: bool,
}

impl PolyModel {
    pub fn new<I>(points: I, closed: bool) -> Self
    where
        I: IntoIterator<Item = MapPoint>,
    {
        Self {
            points: points.into_iter().collect(),
            closed,
        }
    }

    pub fn points(&self) -> &[MapPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn append(&mut self, point: MapPoint) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    pub fn remove_last(&mut self) -> Option<MapPoint> {
        self.points.pop()
    }

    pub fn replace(&mut self, index: usize, point: MapPoint) -> bool {
        match self.points.get_mut(index) {
            Some(slot) => {
                *slot = point;
                true
            }
            None => false,
        }
    }

    /// Clears altitude and accuracy of the moved vertex.
    pub fn drag_vertex(&mut self, index: usize, position: MapPoint) -> bool {
        self.replace(index, position.position_only())
    }

    pub fn outline(&self) -> Vec<MapPoint> {
        let mut outline = self.points.clone();
        if self.closed {
            if let Some(first) = self.points.first() {
                outline.push(*first);
            }
        }
        outline
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    Marker(MarkerModel),
    Poly(PolyModel),
}

impl Feature {
    pub fn as_marker(&self) -> Option<&MarkerModel> {
        match self {
            Feature::Marker(marker) => Some(marker),
            Feature::Poly(_) => None,
        }
    }

    pub fn as_poly(&self) -> Option<&PolyModel> {
        match self {
            Feature::Poly(poly) => Some(poly),
            Feature::Marker(_) => None,
        }
    }

    pub fn as_poly_mut(&mut self) -> Option<&mut PolyModel> {
        match self {
            Feature::Poly(poly) => Some(poly),
            Feature::Marker(_) => None,
        }
    }

    pub fn points(&self) -> Vec<MapPoint> {
        match self {
            Feature::Marker(marker) => vec![marker.point()],
            Feature::Poly(poly) => poly.points().to_vec(),
        }
    }
}
