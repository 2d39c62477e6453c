//! Slippy-map (Web Mercator) projection between geographic and tile space.
//!
//! None of these functions validate their input. Latitudes at or beyond the
//! poles produce non-finite or meaningless tile coordinates, so callers must
//! reject them first.

use std::f64::consts::PI;

use serde::Serialize;

use crate::model::{BoundingBox, TileCoordinate};

/// Number of tiles along one axis at the given zoom
fn tiles_per_axis(zoom: u32) -> f64 {
    2f64.powi(zoom as i32)
}

/// Exact (fractional) tile x coordinate of a longitude
pub fn lon_to_tile_x(lon: f64, zoom: u32) -> f64 {
    (lon + 180.0) / 360.0 * tiles_per_axis(zoom)
}

/// Exact (fractional) tile y coordinate of a latitude
pub fn lat_to_tile_y(lat: f64, zoom: u32) -> f64 {
    let lat_rad = lat.to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * tiles_per_axis(zoom)
}

/// Index of the tile column containing the longitude
pub fn lon_to_tile_x_floor(lon: f64, zoom: u32) -> i64 {
    lon_to_tile_x(lon, zoom).floor() as i64
}

/// Index of the tile row containing the latitude
pub fn lat_to_tile_y_floor(lat: f64, zoom: u32) -> i64 {
    lat_to_tile_y(lat, zoom).floor() as i64
}

/// Longitude of the western edge of tile column `x` (fractional columns allowed)
pub fn tile_x_to_lon(x: f64, zoom: u32) -> f64 {
    x / tiles_per_axis(zoom) * 360.0 - 180.0
}

/// Latitude of the northern edge of tile row `y` (fractional rows allowed)
pub fn tile_y_to_lat(y: f64, zoom: u32) -> f64 {
    let n = PI - 2.0 * PI * y / tiles_per_axis(zoom);
    n.sinh().atan().to_degrees()
}

/// Projects a geographic position to exact tile space
pub fn to_tile(lat: f64, lon: f64, zoom: u32) -> TileCoordinate {
    TileCoordinate {
        x: lon_to_tile_x(lon, zoom),
        y: lat_to_tile_y(lat, zoom),
        zoom,
    }
}

/// Re-expresses a tile coordinate at another zoom level by going through
/// geographic space.
pub fn rezoom(tile: TileCoordinate, zoom: u32) -> TileCoordinate {
    let lon = tile_x_to_lon(tile.x, tile.zoom);
    let lat = tile_y_to_lat(tile.y, tile.zoom);
    to_tile(lat, lon, zoom)
}

/// Size of a region in whole tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileExtent {
    pub width: u32,
    pub height: u32,
}

/// Counts the tiles a bounding box touches at the given zoom.
///
/// Both edges landing in the same tile count it once, so the result is
/// never smaller than 1x1.
pub fn region_tile_size(bounds: &BoundingBox, zoom: u32) -> TileExtent {
    let left = lon_to_tile_x_floor(bounds.west, zoom);
    let right = lon_to_tile_x_floor(bounds.east, zoom);
    let top = lat_to_tile_y_floor(bounds.north, zoom);
    let bottom = lat_to_tile_y_floor(bounds.south, zoom);
    TileExtent {
        width: (left - right).unsigned_abs() as u32 + 1,
        height: (top - bottom).unsigned_abs() as u32 + 1,
    }
}
