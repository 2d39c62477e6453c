use serde::Serialize;

/// Edge length of a single map tile in pixels.
///
/// Projection, route rasterization and link geometry all work in multiples of
/// this value; changing it in one place misaligns the others.
pub const TILE_SIZE: u32 = 256;

/// A point of a GPS track
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Elevation in meters, if the track recorded one
    pub elevation: Option<f64>,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon, elevation: None }
    }

    pub fn with_elevation(lat: f64, lon: f64, elevation: f64) -> Self {
        Self { lat, lon, elevation: Some(elevation) }
    }
}

/// Geographic bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// A position in slippy-map tile space.
///
/// `x` and `y` are fractional for exact projections and integral for floored
/// tile indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TileCoordinate {
    pub x: f64,
    pub y: f64,
    pub zoom: u32,
}

/// A tile coordinate annotated with the along-track distance (km) from the
/// first point of the track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceTilePoint {
    pub tile: TileCoordinate,
    pub distance: f64,
}

/// Number of tiles a page spans horizontally and vertically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageSize {
    pub x: u32,
    pub y: u32,
}

impl PageSize {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Page dimensions in pixels
    pub fn pixels(&self) -> (u32, u32) {
        (self.x * TILE_SIZE, self.y * TILE_SIZE)
    }
}

/// One output page: the top-left tile index and the page size in tiles.
///
/// `x` and `y` are signed because a centred overview page may start left of
/// or above the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Page {
    pub x: i64,
    pub y: i64,
    pub size_x: u32,
    pub size_y: u32,
    pub zoom: u32,
}

impl Page {
    pub fn size(&self) -> PageSize {
        PageSize::new(self.size_x, self.size_y)
    }

    /// Top-left corner of the page in global pixel space
    pub fn pixel_origin(&self) -> (f64, f64) {
        (
            self.x as f64 * TILE_SIZE as f64,
            self.y as f64 * TILE_SIZE as f64,
        )
    }

    /// Iterates the tiles of this page in row-major order
    pub fn tiles(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        (0..self.size_y as i64).flat_map(move |dy| {
            (0..self.size_x as i64).map(move |dx| (self.x + dx, self.y + dy))
        })
    }
}

/// A point of the route polyline in global pixel space, ready for drawing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawablePoint {
    pub x: f64,
    pub y: f64,
    pub distance: f64,
}

/// Text placed next to a drawable point, e.g. "12.5"
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceLabel {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// A clickable rectangle in page-pixel space (top-left origin) pointing at
/// another page of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LinkRegion {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    pub target: usize,
}

/// Link regions of every page, in document order
pub type PageLinkSet = Vec<Vec<LinkRegion>>;
