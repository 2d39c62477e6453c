//! Partitioning of tile space into fixed-size pages.

use std::collections::HashSet;

use crate::model::{BoundingBox, Page, PageSize, TileCoordinate};
use crate::projection::{lat_to_tile_y_floor, lon_to_tile_x_floor, region_tile_size};

/// Pages covering a rectangular region, with the shape of their grid
#[derive(Debug, Clone, PartialEq)]
pub struct PageGrid {
    /// Row-major, north to south and west to east
    pub pages: Vec<Page>,
    /// Pages per row
    pub width: usize,
    /// Number of rows
    pub height: usize,
}

/// Covers a bounding box with pages of `size` tiles.
///
/// The grid starts at the north-west tile of the box. The last row and column
/// may reach past the south and east edges.
pub fn region_pages(bounds: &BoundingBox, zoom: u32, size: PageSize) -> PageGrid {
    let origin_x = lon_to_tile_x_floor(bounds.west, zoom);
    let origin_y = lat_to_tile_y_floor(bounds.north, zoom);
    let extent = region_tile_size(bounds, zoom);

    let width = extent.width.div_ceil(size.x) as usize;
    let height = extent.height.div_ceil(size.y) as usize;

    let mut pages = Vec::with_capacity(width * height);
    for row in 0..height as i64 {
        for col in 0..width as i64 {
            pages.push(Page {
                x: origin_x + col * size.x as i64,
                y: origin_y + row * size.y as i64,
                size_x: size.x,
                size_y: size.y,
                zoom,
            });
        }
    }

    PageGrid { pages, width, height }
}

/// Finds a single page showing the whole bounding box.
///
/// Zooms out from `zoom` until the box fits into one page and centres it
/// there. Returns `None` when it does not fit even at zoom 0.
pub fn overview_page(bounds: &BoundingBox, zoom: u32, size: PageSize) -> Option<Page> {
    (0..=zoom).rev().find_map(|z| {
        let extent = region_tile_size(bounds, z);
        if extent.width > size.x || extent.height > size.y {
            return None;
        }
        let margin_x = ((size.x - extent.width) / 2) as i64;
        let margin_y = ((size.y - extent.height) / 2) as i64;
        Some(Page {
            x: lon_to_tile_x_floor(bounds.west, z) - margin_x,
            y: lat_to_tile_y_floor(bounds.north, z) - margin_y,
            size_x: size.x,
            size_y: size.y,
            zoom: z,
        })
    })
}

/// Origin of the page bucket containing a tile-space point
fn bucket(point: &TileCoordinate, size: PageSize) -> (i64, i64) {
    let size_x = size.x as f64;
    let size_y = size.y as f64;
    (
        ((point.x / size_x).floor() * size_x) as i64,
        ((point.y / size_y).floor() * size_y) as i64,
    )
}

/// Collects the pages a sequence of tile-space points passes through.
///
/// Pages are aligned to multiples of `size` and listed in the order the
/// points first enter them.
pub fn route_pages(points: &[TileCoordinate], size: PageSize) -> Vec<Page> {
    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    let mut pages = Vec::new();

    for point in points {
        let (x, y) = bucket(point, size);
        if seen.insert((x, y)) {
            pages.push(Page {
                x,
                y,
                size_x: size.x,
                size_y: size.y,
                zoom: point.zoom,
            });
        }
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{lat_to_tile_y_floor, lon_to_tile_x_floor};

    fn prague() -> BoundingBox {
        BoundingBox { north: 50.1, south: 50.0, east: 15.0, west: 14.9 }
    }

    #[test]
    fn test_region_pages_single_page() {
        let grid = region_pages(&prague(), 12, PageSize::new(4, 5));
        assert_eq!((grid.width, grid.height), (1, 1));
        assert_eq!(grid.pages, vec![Page { x: 2217, y: 1387, size_x: 4, size_y: 5, zoom: 12 }]);
    }

    #[test]
    fn test_region_pages_row_major() {
        let grid = region_pages(&prague(), 12, PageSize::new(1, 2));
        assert_eq!((grid.width, grid.height), (2, 2));
        let origins: Vec<_> = grid.pages.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(origins, vec![(2217, 1387), (2218, 1387), (2217, 1389), (2218, 1389)]);
    }

    #[test]
    fn test_region_pages_cover_region() {
        let bounds = BoundingBox { north: 50.3, south: 49.7, east: 15.4, west: 14.2 };
        let zoom = 13;
        let size = PageSize::new(3, 4);
        let grid = region_pages(&bounds, zoom, size);

        let mut origins = HashSet::new();
        for page in &grid.pages {
            assert!(origins.insert((page.x, page.y)), "duplicate page origin {:?}", page);
        }

        let covered: HashSet<(i64, i64)> = grid.pages.iter().flat_map(|p| p.tiles()).collect();
        let left = lon_to_tile_x_floor(bounds.west, zoom);
        let right = lon_to_tile_x_floor(bounds.east, zoom);
        let top = lat_to_tile_y_floor(bounds.north, zoom);
        let bottom = lat_to_tile_y_floor(bounds.south, zoom);
        for x in left..=right {
            for y in top..=bottom {
                assert!(covered.contains(&(x, y)), "tile {},{} not covered", x, y);
            }
        }
    }

    #[test]
    fn test_region_pages_point_box() {
        let bounds = BoundingBox { north: 50.0, south: 50.0, east: 15.0, west: 15.0 };
        let grid = region_pages(&bounds, 10, PageSize::new(4, 5));
        assert_eq!(grid.pages.len(), 1);
    }

    #[test]
    fn test_overview_page_centred() {
        let page = overview_page(&prague(), 12, PageSize::new(4, 5)).expect("region fits at zoom 12");
        assert_eq!(page, Page { x: 2216, y: 1386, size_x: 4, size_y: 5, zoom: 12 });
    }

    #[test]
    fn test_overview_page_zooms_out() {
        let bounds = BoundingBox { north: 51.0, south: 49.0, east: 17.0, west: 12.0 };
        let size = PageSize::new(2, 2);
        let page = overview_page(&bounds, 12, size).expect("region fits at some zoom");
        assert!(page.zoom < 12);
        let extent = region_tile_size(&bounds, page.zoom);
        assert!(extent.width <= size.x && extent.height <= size.y);
        let finer = region_tile_size(&bounds, page.zoom + 1);
        assert!(finer.width > size.x || finer.height > size.y, "should pick the finest fitting zoom");
    }

    #[test]
    fn test_overview_page_falls_back_to_zoom_zero() {
        let bounds = BoundingBox { north: 60.0, south: -60.0, east: 170.0, west: -170.0 };
        assert_eq!(
            overview_page(&bounds, 3, PageSize::new(1, 1)).map(|p| p.zoom),
            Some(0)
        );
    }

    #[test]
    fn test_overview_page_none_when_too_large() {
        // Past the antimeridian the box is two tiles wide even at zoom 0
        let bounds = BoundingBox { north: 10.0, south: -10.0, east: 190.0, west: -170.0 };
        assert_eq!(overview_page(&bounds, 6, PageSize::new(1, 1)), None);
    }

    #[test]
    fn test_route_pages_single_bucket() {
        let points = vec![
            TileCoordinate { x: 100.2, y: 200.1, zoom: 9 },
            TileCoordinate { x: 101.7, y: 203.9, zoom: 9 },
            TileCoordinate { x: 103.9, y: 201.0, zoom: 9 },
        ];
        let pages = route_pages(&points, PageSize::new(4, 5));
        assert_eq!(pages, vec![Page { x: 100, y: 200, size_x: 4, size_y: 5, zoom: 9 }]);
    }

    #[test]
    fn test_route_pages_first_seen_order() {
        let size = PageSize::new(2, 2);
        let points = vec![
            TileCoordinate { x: 5.0, y: 5.0, zoom: 4 },
            TileCoordinate { x: 1.0, y: 1.0, zoom: 4 },
            TileCoordinate { x: 5.5, y: 4.5, zoom: 4 },
            TileCoordinate { x: 3.0, y: 1.0, zoom: 4 },
        ];
        let origins: Vec<_> = route_pages(&points, size).iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(origins, vec![(4, 4), (0, 0), (2, 0)]);
    }

    #[test]
    fn test_route_pages_empty() {
        assert!(route_pages(&[], PageSize::new(4, 5)).is_empty());
    }
}
