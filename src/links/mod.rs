//! Clickable regions that let a document viewer move between neighbouring pages.
//!
//! Every page is divided into a 3x3 grid with boundaries at a quarter and
//! three quarters of each axis. The centre cell carries no link; each of the
//! eight surrounding cells links to the page in that direction.

use std::collections::HashMap;

use crate::model::{LinkRegion, Page, PageLinkSet, PageSize, TILE_SIZE, TileCoordinate};
use crate::projection::rezoom;

const BREAKPOINTS: [f64; 4] = [0.0, 0.25, 0.75, 1.0];

/// The eight neighbour directions, row by row
const DIRECTIONS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Pixel span of cell `d + 1` (d in -1..=1) along an axis of `length` pixels
fn span(d: i64, length: u32) -> (i64, i64) {
    let cell = (d + 1) as usize;
    let start = (BREAKPOINTS[cell] * length as f64).round() as i64;
    let end = (BREAKPOINTS[cell + 1] * length as f64).round() as i64;
    (start, end)
}

/// The region of a page that links towards direction `(dx, dy)`
pub fn link_zone(dx: i64, dy: i64, size: PageSize, target: usize) -> LinkRegion {
    let (width, height) = size.pixels();
    let (x0, x1) = span(dx, width);
    let (y0, y1) = span(dy, height);
    LinkRegion {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
        target,
    }
}

/// Links between the pages of a `width` x `height` row-major grid.
///
/// Neighbours never wrap around an edge of the grid. `offset` is added to every
/// target, e.g. 1 when an overview page precedes the grid in the document.
pub fn grid_links(width: usize, height: usize, size: PageSize, offset: usize) -> PageLinkSet {
    let (w, h) = (width as i64, height as i64);
    (0..width * height)
        .map(|index| {
            let col = index as i64 % w;
            let row = index as i64 / w;
            DIRECTIONS
                .iter()
                .filter_map(|&(dx, dy)| {
                    let (ncol, nrow) = (col + dx, row + dy);
                    if ncol < 0 || ncol >= w || nrow < 0 || nrow >= h {
                        return None;
                    }
                    let target = (nrow * w + ncol) as usize + offset;
                    Some(link_zone(dx, dy, size, target))
                })
                .collect()
        })
        .collect()
}

/// Links between route pages that happen to be spatial neighbours.
///
/// Route pages are aligned to the same page grid, so a neighbour in direction
/// `(dx, dy)` starts exactly one page size away.
pub fn route_links(pages: &[Page], offset: usize) -> PageLinkSet {
    let index: HashMap<(i64, i64), usize> = pages
        .iter()
        .enumerate()
        .map(|(i, page)| ((page.x, page.y), i))
        .collect();

    pages
        .iter()
        .map(|page| {
            DIRECTIONS
                .iter()
                .filter_map(|&(dx, dy)| {
                    let origin = (
                        page.x + dx * page.size_x as i64,
                        page.y + dy * page.size_y as i64,
                    );
                    index
                        .get(&origin)
                        .map(|&target| link_zone(dx, dy, page.size(), target + offset))
                })
                .collect()
        })
        .collect()
}

/// Position of a tile-space corner in the overview page's pixel space
fn to_overview_pixels(overview: &Page, x: i64, y: i64, zoom: u32) -> (f64, f64) {
    let corner = rezoom(TileCoordinate { x: x as f64, y: y as f64, zoom }, overview.zoom);
    (
        (corner.x - overview.x as f64) * TILE_SIZE as f64,
        (corner.y - overview.y as f64) * TILE_SIZE as f64,
    )
}

/// Footprint of every detail page drawn on the overview page, clipped to it.
///
/// Detail page `i` links to `i + offset`. Every detail page gets a region of
/// at least one pixel, even when its footprint rounds away or lies outside.
pub fn overview_links(overview: &Page, details: &[Page], offset: usize) -> Vec<LinkRegion> {
    let (width, height) = overview.size().pixels();
    let (width, height) = (width as f64, height as f64);

    details
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let (left, top) = to_overview_pixels(overview, page.x, page.y, page.zoom);
            let (right, bottom) = to_overview_pixels(
                overview,
                page.x + page.size_x as i64,
                page.y + page.size_y as i64,
                page.zoom,
            );

            let x0 = left.round().clamp(0.0, width - 1.0) as i64;
            let y0 = top.round().clamp(0.0, height - 1.0) as i64;
            let x1 = right.round().clamp(0.0, width) as i64;
            let y1 = bottom.round().clamp(0.0, height) as i64;

            LinkRegion {
                x: x0,
                y: y0,
                width: (x1 - x0).max(1),
                height: (y1 - y0).max(1),
                target: i + offset,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(links: &[LinkRegion]) -> Vec<usize> {
        let mut targets: Vec<_> = links.iter().map(|l| l.target).collect();
        targets.sort();
        targets
    }

    #[test]
    fn test_grid_neighbour_counts() {
        let links = grid_links(3, 3, PageSize::new(4, 5), 0);
        assert_eq!(links.len(), 9);
        assert_eq!(links[4].len(), 8);
        assert_eq!(links[0].len(), 3);
        assert_eq!(links[1].len(), 5);
        assert_eq!(targets(&links[0]), vec![1, 3, 4]);
        assert_eq!(targets(&links[1]), vec![0, 2, 3, 4, 5]);
    }

    #[test]
    fn test_single_row_has_no_vertical_links() {
        let links = grid_links(4, 1, PageSize::new(2, 2), 0);
        for (i, page) in links.iter().enumerate() {
            assert!(page.iter().all(|l| l.height == 2 * 256 / 2), "page {} links vertically", i);
        }
        assert_eq!(targets(&links[0]), vec![1]);
        assert_eq!(targets(&links[3]), vec![2]);
        assert_eq!(targets(&links[1]), vec![0, 2]);
    }

    #[test]
    fn test_no_wrap_to_next_row() {
        // The last page of the first row must not link east to the first page of the second row
        let links = grid_links(3, 2, PageSize::new(1, 1), 0);
        assert_eq!(targets(&links[2]), vec![1, 4, 5]);
        assert_eq!(targets(&links[3]), vec![0, 1, 4]);
    }

    #[test]
    fn test_link_zones() {
        let size = PageSize::new(4, 4);
        assert_eq!(
            link_zone(-1, -1, size, 7),
            LinkRegion { x: 0, y: 0, width: 256, height: 256, target: 7 }
        );
        assert_eq!(
            link_zone(0, 1, size, 7),
            LinkRegion { x: 256, y: 768, width: 512, height: 256, target: 7 }
        );
        assert_eq!(
            link_zone(1, 0, size, 7),
            LinkRegion { x: 768, y: 256, width: 256, height: 512, target: 7 }
        );
    }

    #[test]
    fn test_grid_links_offset() {
        let links = grid_links(2, 1, PageSize::new(1, 1), 1);
        assert_eq!(targets(&links[0]), vec![2]);
        assert_eq!(targets(&links[1]), vec![1]);
    }

    #[test]
    fn test_route_links() {
        let page = |x, y| Page { x, y, size_x: 2, size_y: 3, zoom: 10 };
        let pages = vec![page(10, 9), page(12, 9), page(12, 12), page(16, 12)];
        let links = route_links(&pages, 0);
        assert_eq!(targets(&links[0]), vec![1, 2]);
        assert_eq!(targets(&links[1]), vec![0, 2]);
        assert_eq!(targets(&links[2]), vec![0, 1]);
        assert!(links[3].is_empty());
    }

    #[test]
    fn test_overview_links_same_zoom() {
        let overview = Page { x: 2216, y: 1386, size_x: 4, size_y: 5, zoom: 12 };
        let detail = Page { x: 2217, y: 1387, size_x: 4, size_y: 5, zoom: 12 };
        let links = overview_links(&overview, &[detail], 1);
        assert_eq!(links, vec![LinkRegion { x: 256, y: 256, width: 768, height: 1024, target: 1 }]);
    }

    #[test]
    fn test_overview_links_across_zooms() {
        let overview = Page { x: 10, y: 20, size_x: 4, size_y: 4, zoom: 6 };
        let details: Vec<Page> = (0..2)
            .map(|i| Page { x: 40 + i * 4, y: 80, size_x: 4, size_y: 4, zoom: 8 })
            .collect();
        let links = overview_links(&overview, &details, 1);
        assert_eq!(
            links,
            vec![
                LinkRegion { x: 0, y: 0, width: 256, height: 256, target: 1 },
                LinkRegion { x: 256, y: 0, width: 256, height: 256, target: 2 },
            ]
        );
    }

    #[test]
    fn test_overview_links_keep_tiny_and_outside_pages() {
        let overview = Page { x: 0, y: 0, size_x: 1, size_y: 1, zoom: 0 };
        let details = vec![
            // A single tile at zoom 16 is far below one overview pixel
            Page { x: 0, y: 0, size_x: 1, size_y: 1, zoom: 16 },
            // Entirely east of the overview page
            Page { x: 2, y: 0, size_x: 1, size_y: 1, zoom: 0 },
        ];
        let links = overview_links(&overview, &details, 1);
        assert_eq!(
            links,
            vec![
                LinkRegion { x: 0, y: 0, width: 1, height: 1, target: 1 },
                LinkRegion { x: 255, y: 0, width: 1, height: 256, target: 2 },
            ]
        );
    }
}
