use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Equality and hashing compare the exact bit patterns of every field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sd: Option<f64>,
}

impl MapPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            alt: None,
            sd: None,
        }
    }

    pub fn with_accuracy(lat: f64, lon: f64, alt: f64, sd: f64) -> Self {
        Self {
            lat,
            lon,
            alt: Some(alt),
            sd: Some(sd),
        }
    }

    /// The same position with altitude and accuracy dropped.
    pub fn position_only(&self) -> Self {
        Self::new(self.lat, self.lon)
    }

    pub fn altitude(&self) -> f64 {
        self.alt.unwrap_or(0.0)
    }

    pub fn accuracy(&self) -> f64 {
        self.sd.unwrap_or(0.0)
    }

    pub fn same_position(&self, other: &MapPoint) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }

    fn key(&self) -> (u64, u64, Option<u64>, Option<u64>) {
        (
            self.lat.to_bits(),
            self.lon.to_bits(),
            self.alt.map(f64::to_bits),
            self.sd.map(f64::to_bits),
        )
    }
}

impl PartialEq for MapPoint {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for MapPoint {}

impl Hash for MapPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for MapPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MapPoint({:+.6}, {:+.6})", self.lat, self.lon)
    }
}
