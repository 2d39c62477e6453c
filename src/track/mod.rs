//! Turning GPS tracks into pages and a drawable path.

pub mod reader;
pub mod vector;

use crate::layout::route_pages;
use crate::model::{DistanceLabel, DistanceTilePoint, DrawablePoint, GeoPoint, Page, PageSize, TILE_SIZE};
use crate::projection::to_tile;
use vector::Vector;

/// Lateral distance in pixels between the track and the drawn markers
pub const PATH_OFFSET: f64 = 10.0;

/// Minimum pixel distance between two consecutive markers
pub const MIN_MARKER_SPACING: f64 = 30.0;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Distance of one track step in kilometers.
///
/// The horizontal distance (km) and the elevation change (m / 1000) are
/// combined as the sides of a right triangle. Non-finite results count as 0.
pub fn step_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let horizontal = haversine_km(a, b);
    let vertical = match (a.elevation, b.elevation) {
        (Some(from), Some(to)) => (to - from) / 1000.0,
        _ => 0.0,
    };
    let step = horizontal.hypot(vertical);
    if step.is_finite() { step } else { 0.0 }
}

/// Projects the track to exact tile space, annotating every point with the
/// distance travelled since the first one.
pub fn to_distance_tile_points(points: &[GeoPoint], zoom: u32) -> Vec<DistanceTilePoint> {
    let mut distance = 0.0;
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            if i > 0 {
                distance += step_km(&points[i - 1], point);
            }
            DistanceTilePoint {
                tile: to_tile(point.lat, point.lon, zoom),
                distance,
            }
        })
        .collect()
}

/// Pages a track passes through and the path to draw on them
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedRoute {
    pub pages: Vec<Page>,
    /// In global pixel space, subtract [`Page::pixel_origin`] to draw
    pub path: Vec<DrawablePoint>,
}

/// Rasterizes a track at the given zoom into pages of `size` tiles.
pub fn rasterize(points: &[GeoPoint], zoom: u32, size: PageSize) -> RasterizedRoute {
    let tile_points = to_distance_tile_points(points, zoom);
    let tiles: Vec<_> = tile_points.iter().map(|p| p.tile).collect();
    let pages = route_pages(&tiles, size);

    let pixels: Vec<Vector> = tile_points
        .iter()
        .map(|p| Vector::new(p.tile.x * TILE_SIZE as f64, p.tile.y * TILE_SIZE as f64))
        .collect();
    let distances: Vec<f64> = tile_points.iter().map(|p| p.distance).collect();

    let path = decimate(&offset_path(&pixels), &distances);
    RasterizedRoute { pages, path }
}

/// Direction of the track at point `i`
fn direction(points: &[Vector], i: usize) -> Vector {
    let last = points.len() - 1;
    if i == 0 {
        (points[1] - points[0]).unit()
    } else if i == last {
        (points[last] - points[last - 1]).unit()
    } else {
        let incoming = (points[i] - points[i - 1]).unit();
        let outgoing = (points[i + 1] - points[i]).unit();
        (incoming + outgoing).unit()
    }
}

/// Shifts every point sideways so markers do not cover the road underneath.
fn offset_path(points: &[Vector]) -> Vec<Vector> {
    if points.len() < 2 {
        return points.to_vec();
    }
    (0..points.len())
        .map(|i| points[i] + PATH_OFFSET * direction(points, i).normal())
        .collect()
}

/// Drops points closer than [`MIN_MARKER_SPACING`] to the last kept one.
///
/// The last point always survives; it replaces the last kept point when the
/// two are too close.
fn decimate(points: &[Vector], distances: &[f64]) -> Vec<DrawablePoint> {
    let mut kept: Vec<(Vector, f64)> = Vec::new();
    let last = points.len().saturating_sub(1);

    for (i, (&point, &distance)) in points.iter().zip(distances).enumerate() {
        let far_enough = kept
            .last()
            .is_none_or(|(previous, _)| point.distance(*previous) > MIN_MARKER_SPACING);
        if far_enough {
            kept.push((point, distance));
        } else if i == last {
            kept.pop();
            kept.push((point, distance));
        }
    }

    kept.into_iter()
        .map(|(point, distance)| DrawablePoint { x: point.x, y: point.y, distance })
        .collect()
}

/// Places a distance label wherever the path crosses the next multiple of
/// `step` kilometers, plus one at the end of the path.
pub fn distance_labels(path: &[DrawablePoint], step: f64) -> Vec<DistanceLabel> {
    let valid_step = step.is_finite() && step > 0.0;
    let mut next_mark = if valid_step { step } else { f64::INFINITY };
    let mut labels = Vec::new();

    for (i, point) in path.iter().enumerate() {
        let is_last = i + 1 == path.len();
        if point.distance >= next_mark || is_last {
            labels.push(DistanceLabel {
                x: point.x,
                y: point.y,
                text: format!("{:.1}", point.distance),
            });
        }
        if valid_step && point.distance >= next_mark {
            next_mark = ((point.distance / step).floor() + 1.0) * step;
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{lat_to_tile_y, lon_to_tile_x};

    fn straight_track(count: usize) -> Vec<GeoPoint> {
        (0..count)
            .map(|i| GeoPoint::new(50.0, 14.0 + i as f64 * 0.001))
            .collect()
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let d = haversine_km(&GeoPoint::new(0.0, 0.0), &GeoPoint::new(1.0, 0.0));
        assert!((d - 111.19).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_step_with_elevation() {
        let a = GeoPoint::with_elevation(50.0, 14.0, 100.0);
        let b = GeoPoint::with_elevation(50.0, 14.0, 400.0);
        assert!((step_km(&a, &b) - 0.3).abs() < 1e-9);

        // Elevation only counts when both points have one
        let c = GeoPoint::new(50.0, 14.0);
        assert_eq!(step_km(&a, &c), 0.0);
    }

    #[test]
    fn test_step_non_finite_is_zero() {
        let a = GeoPoint::new(f64::NAN, 14.0);
        assert_eq!(step_km(&a, &GeoPoint::new(50.0, 14.0)), 0.0);
    }

    #[test]
    fn test_cumulative_distance() {
        let points = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(1.0, 0.0),
            GeoPoint::new(1.0, 0.0),
            GeoPoint::new(2.0, 0.0),
        ];
        let annotated = to_distance_tile_points(&points, 10);
        assert_eq!(annotated[0].distance, 0.0);
        assert!((annotated[1].distance - annotated[2].distance).abs() < 1e-12);
        assert!((annotated[3].distance - 2.0 * annotated[1].distance).abs() < 1e-6);
    }

    #[test]
    fn test_empty_track() {
        let route = rasterize(&[], 12, PageSize::new(4, 5));
        assert!(route.pages.is_empty());
        assert!(route.path.is_empty());
    }

    #[test]
    fn test_single_point_track() {
        let point = GeoPoint::new(50.05, 14.95);
        let route = rasterize(&[point], 12, PageSize::new(4, 5));
        assert_eq!(route.pages.len(), 1);
        assert_eq!(route.path.len(), 1);
        let drawn = route.path[0];
        assert_eq!(drawn.distance, 0.0);
        assert!((drawn.x - lon_to_tile_x(point.lon, 12) * 256.0).abs() < 1e-9);
        assert!((drawn.y - lat_to_tile_y(point.lat, 12) * 256.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_points_in_one_page() {
        let points = vec![
            GeoPoint::new(50.09, 14.91),
            GeoPoint::new(50.08, 14.93),
            GeoPoint::new(50.07, 14.95),
        ];
        let route = rasterize(&points, 12, PageSize::new(4, 5));
        assert_eq!(route.pages.len(), 1);
    }

    #[test]
    fn test_offset_is_perpendicular() {
        // Eastward track: pixel direction (1, 0), normal (0, 1), i.e. south
        let points = vec![Vector::new(0.0, 0.0), Vector::new(100.0, 0.0), Vector::new(200.0, 0.0)];
        let offset = offset_path(&points);
        for (original, moved) in points.iter().zip(&offset) {
            assert!((moved.x - original.x).abs() < 1e-9);
            assert!((moved.y - original.y - PATH_OFFSET).abs() < 1e-9);
        }
    }

    #[test]
    fn test_offset_corner_uses_bisector() {
        let points = vec![Vector::new(0.0, 0.0), Vector::new(100.0, 0.0), Vector::new(100.0, 100.0)];
        let corner = offset_path(&points)[1];
        let expected = PATH_OFFSET / 2f64.sqrt();
        assert!((corner.x - (100.0 - expected)).abs() < 1e-9);
        assert!((corner.y - expected).abs() < 1e-9);
    }

    #[test]
    fn test_decimation_spacing() {
        let track = straight_track(400);
        let route = rasterize(&track, 16, PageSize::new(4, 5));
        let path = &route.path;
        assert!(path.len() > 2);
        for pair in path[..path.len() - 1].windows(2) {
            let gap = (pair[1].x - pair[0].x).hypot(pair[1].y - pair[0].y);
            assert!(gap > MIN_MARKER_SPACING, "markers only {} px apart", gap);
        }
        let total = to_distance_tile_points(&track, 16).last().map(|p| p.distance);
        assert_eq!(path.last().map(|p| p.distance), total);
    }

    #[test]
    fn test_decimation_short_track_keeps_only_end() {
        let points = vec![Vector::new(0.0, 0.0), Vector::new(5.0, 0.0), Vector::new(10.0, 0.0)];
        let kept = decimate(&points, &[0.0, 1.0, 2.0]);
        let distances: Vec<_> = kept.iter().map(|p| p.distance).collect();
        assert_eq!(distances, vec![2.0]);
        assert_eq!((kept[0].x, kept[0].y), (10.0, 0.0));
    }

    #[test]
    fn test_decimation_replaces_close_last_kept_point() {
        let points = vec![
            Vector::new(0.0, 0.0),
            Vector::new(40.0, 0.0),
            Vector::new(80.0, 0.0),
            Vector::new(90.0, 0.0),
        ];
        let kept = decimate(&points, &[0.0, 1.0, 2.0, 3.0]);
        let distances: Vec<_> = kept.iter().map(|p| p.distance).collect();
        assert_eq!(distances, vec![0.0, 1.0, 3.0]);
    }

    fn path_with_distances(distances: &[f64]) -> Vec<DrawablePoint> {
        distances
            .iter()
            .enumerate()
            .map(|(i, &distance)| DrawablePoint { x: i as f64, y: 0.0, distance })
            .collect()
    }

    #[test]
    fn test_distance_labels() {
        let path = path_with_distances(&[0.0, 4.0, 10.2, 12.0, 25.0, 27.34]);
        let texts: Vec<_> = distance_labels(&path, 10.0).into_iter().map(|l| l.text).collect();
        assert_eq!(texts, vec!["10.2", "25.0", "27.3"]);
    }

    #[test]
    fn test_distance_labels_always_label_end() {
        let path = path_with_distances(&[0.0, 1.0, 2.5]);
        let labels = distance_labels(&path, 10.0);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].text, "2.5");
        assert_eq!(labels[0].x, 2.0);
    }

    #[test]
    fn test_distance_labels_zero_step() {
        let path = path_with_distances(&[0.0, 5.0, 9.0]);
        let texts: Vec<_> = distance_labels(&path, 0.0).into_iter().map(|l| l.text).collect();
        assert_eq!(texts, vec!["9.0"]);
    }
}
