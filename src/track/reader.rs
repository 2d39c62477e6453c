use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use thiserror::Error;

use crate::model::GeoPoint;

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse GPX: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
}

/// Reads the points of a GPX file.
///
/// All segments of all tracks are joined in file order. Files without tracks
/// fall back to their routes.
pub fn read_track<P: AsRef<Path>>(path: P) -> Result<Vec<GeoPoint>, TrackError> {
    let file = File::open(path)?;
    parse_track(BufReader::new(file))
}

pub fn parse_track<R: Read>(reader: R) -> Result<Vec<GeoPoint>, TrackError> {
    let data = gpx::read(reader)?;

    let track_points: Vec<GeoPoint> = data
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .map(to_geo_point)
        .collect();

    if !track_points.is_empty() {
        return Ok(track_points);
    }

    Ok(data
        .routes
        .iter()
        .flat_map(|route| route.points.iter())
        .map(to_geo_point)
        .collect())
}

fn to_geo_point(waypoint: &gpx::Waypoint) -> GeoPoint {
    let point = waypoint.point();
    GeoPoint {
        lat: point.y(),
        lon: point.x(),
        elevation: waypoint.elevation,
    }
}
