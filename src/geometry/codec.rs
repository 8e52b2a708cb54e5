//! Flat vertex-list strings exchanged with the form layer:
//! `"lat lon alt sd;lat lon alt sd;..."`.

use crate::point::MapPoint;

pub fn format_point(point: &MapPoint) -> String {
    format!(
        "{:.6} {:.6} {:.1} {:.1};",
        point.lat,
        point.lon,
        point.altitude(),
        point.accuracy()
    )
}

/// Serializes vertices. A closed polygon with at least two vertices is
/// written with its first vertex repeated at the end.
pub fn format_points(points: &[MapPoint], closed: bool) -> String {
    let mut result = points.iter().map(format_point).collect::<String>();
    if closed && points.len() > 1 {
        let first = &points[0];
        let last = &points[points.len() - 1];
        if !first.same_position(last) {
            result.push_str(&format_point(first));
        }
    }
    result
}

/// Parses a vertex list. Each group needs latitude and longitude; altitude
/// and accuracy default to 0. Groups that do not parse are skipped.
pub fn parse_points(text: &str) -> Vec<MapPoint> {
    text.split(';').filter_map(parse_group).collect()
}

/// Parses a stored polygon, dropping the closing vertex that duplicates the
/// first one.
pub fn parse_polygon(text: &str) -> Vec<MapPoint> {
    let mut points = parse_points(text);
    if points.len() > 1 && points[0].same_position(&points[points.len() - 1]) {
        points.pop();
    }
    points
}

fn parse_group(group: &str) -> Option<MapPoint> {
    let words = group.split_whitespace().collect::<Vec<_>>();
    if words.len() < 2 {
        return None;
    }
    let lat: f64 = words[0].parse().ok()?;
    let lon: f64 = words[1].parse().ok()?;
    let alt: f64 = match words.get(2) {
        Some(word) => word.parse().ok()?,
        None => 0.0,
    };
    let sd: f64 = match words.get(3) {
        Some(word) => word.parse().ok()?,
        None => 0.0,
    };
    Some(MapPoint::with_accuracy(lat, lon, alt, sd))
}
