use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::point::MapPoint;

pub const TILE_SIZE: f64 = 256.0;
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

const MAX_LON_RADIUS: f64 = 180.0 - 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A latitude/longitude rectangle. `east` may exceed 180 when the rectangle
/// crosses the antimeridian; `east >= west` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    /// Longitudes take the shorter way around the globe.
    pub fn enclosing(points: &[MapPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut south = first.lat;
        let mut north = first.lat;
        for point in points {
            south = south.min(point.lat);
            north = north.max(point.lat);
        }
        let (west, east) = enclosing_longitudes(points.iter().map(|p| p.lon));
        Some(Self {
            south,
            west,
            north,
            east,
        })
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    pub fn center(&self) -> MapPoint {
        MapPoint::new(
            (self.north + self.south) / 2.0,
            normalize_lon((self.east + self.west) / 2.0),
        )
    }

    pub fn expand(&self, factor: f64) -> Self {
        let lat_center = (self.north + self.south) / 2.0;
        let lat_radius = (self.north - self.south) / 2.0 * factor;
        let north = (lat_center + lat_radius).min(90.0);
        let south = (lat_center - lat_radius).max(-90.0);

        let west = self.west;
        let mut east = self.east;
        while east < west {
            east += 360.0;
        }
        let lon_center = (west + east) / 2.0;
        let lon_radius = ((east - west) / 2.0 * factor).min(MAX_LON_RADIUS);

        Self {
            south,
            west: lon_center - lon_radius,
            north,
            east: lon_center + lon_radius,
        }
    }
}

fn enclosing_longitudes(lons: impl Iterator<Item = f64>) -> (f64, f64) {
    let mut sorted = lons.map(normalize_lon).collect::<Vec<_>>();
    sorted.sort_by(f64::total_cmp);
    if sorted.is_empty() {
        return (0.0, 0.0);
    }
    let last = sorted.len() - 1;
    // The widest gap between neighbours is the part of the circle left out.
    let mut widest_gap = sorted[0] + 360.0 - sorted[last];
    let mut west = sorted[0];
    let mut east = sorted[last];
    for i in 0..last {
        let gap = sorted[i + 1] - sorted[i];
        if gap > widest_gap {
            widest_gap = gap;
            west = sorted[i + 1];
            east = sorted[i] + 360.0;
        }
    }
    (west, east)
}

pub fn normalize_lon(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        return lon;
    }
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    (PI / 4.0 + lat / 2.0).tan().ln()
}

fn inverse_mercator_y(y: f64) -> f64 {
    y.sinh().atan().to_degrees()
}

/// The largest Web Mercator zoom at which `bounds` fits inside `viewport`.
/// Degenerate rectangles yield `f64::INFINITY`; callers clamp to their
/// maximum zoom.
pub fn fit_zoom(bounds: &Bounds, viewport: Viewport) -> f64 {
    let lon_span = bounds.lon_span();
    let y_span = mercator_y(bounds.north) - mercator_y(bounds.south);
    let zoom_x = if lon_span > 0.0 {
        (f64::from(viewport.width) / TILE_SIZE * 360.0 / lon_span).log2()
    } else {
        f64::INFINITY
    };
    let zoom_y = if y_span > 0.0 {
        (f64::from(viewport.height) / TILE_SIZE * 2.0 * PI / y_span).log2()
    } else {
        f64::INFINITY
    };
    zoom_x.min(zoom_y)
}

pub fn fit_center(bounds: &Bounds) -> MapPoint {
    let y = (mercator_y(bounds.north) + mercator_y(bounds.south)) / 2.0;
    MapPoint::new(
        inverse_mercator_y(y),
        normalize_lon((bounds.east + bounds.west) / 2.0),
    )
}
