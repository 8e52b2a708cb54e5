pub mod cli;
pub mod config;
pub mod format;
pub mod geometry;
pub mod map;
pub mod mbtiles;
pub mod offline;
pub mod output;
pub mod point;
pub mod server;

pub use crate::point::MapPoint;
