//! Merging tiles into page images and drawing overlays on them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_circle_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use log::{debug, warn};
use rusttype::{Font, Scale};

use crate::download::TileData;
use crate::model::{BoundingBox, DistanceLabel, DrawablePoint, LinkRegion, Page, TILE_SIZE};
use crate::projection::{lat_to_tile_y, lon_to_tile_x};

const BLANK_COLOR: Rgb<u8> = Rgb([238, 238, 238]);
const PATH_COLOR: Rgb<u8> = Rgb([220, 0, 0]);
const PATH_OUTLINE_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const BOUNDARY_COLOR: Rgb<u8> = Rgb([0, 80, 200]);
const OUTLINE_COLOR: Rgb<u8> = Rgb([200, 0, 120]);
const LABEL_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const LABEL_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

const MARKER_RADIUS: i32 = 3;
const LINE_WIDTH: i32 = 3;
const LABEL_SIZE: f32 = 18.0;

/// Fonts tried when no font is configured
const SYSTEM_FONTS: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Loads a TrueType font from `path`, or the first system font found.
///
/// Returns `None` when nothing usable is found; labels are then skipped.
pub fn load_font(path: Option<&Path>) -> Result<Option<Font<'static>>> {
    if let Some(path) = path {
        let data = fs::read(path)
            .with_context(|| format!("Failed to read font {}", path.display()))?;
        let font = Font::try_from_vec(data)
            .with_context(|| format!("Not a usable TrueType font: {}", path.display()))?;
        return Ok(Some(font));
    }

    for candidate in SYSTEM_FONTS {
        let Ok(data) = fs::read(candidate) else {
            continue;
        };
        if let Some(font) = Font::try_from_vec(data) {
            debug!("Using font {}", candidate);
            return Ok(Some(font));
        }
    }

    warn!("No font found, distance labels will not be drawn (use --font)");
    Ok(None)
}

/// Decodes one tile, scaling it to the standard tile size if needed
fn decode_tile(tile: &TileData) -> Result<RgbImage> {
    match tile {
        TileData::Blank => Ok(RgbImage::from_pixel(TILE_SIZE, TILE_SIZE, BLANK_COLOR)),
        TileData::Image(data) => {
            let image = image::load_from_memory(data)
                .context("Failed to decode tile image")?
                .to_rgb8();
            if image.dimensions() == (TILE_SIZE, TILE_SIZE) {
                Ok(image)
            } else {
                Ok(imageops::resize(&image, TILE_SIZE, TILE_SIZE, FilterType::Triangle))
            }
        }
    }
}

/// Merges a row-major grid of tiles (`rows[y][x]`) into one image
pub fn merge_tiles(rows: &[Vec<TileData>]) -> Result<RgbImage> {
    let height = rows.len() as u32;
    let width = rows.first().map_or(0, |row| row.len()) as u32;
    let mut page = RgbImage::from_pixel(width * TILE_SIZE, height * TILE_SIZE, BLANK_COLOR);

    for (y, row) in rows.iter().enumerate() {
        for (x, tile) in row.iter().enumerate() {
            let image = decode_tile(tile)
                .with_context(|| format!("Failed to merge tile at column {}, row {}", x, y))?;
            imageops::replace(
                &mut page,
                &image,
                (x as u32 * TILE_SIZE) as i64,
                (y as u32 * TILE_SIZE) as i64,
            );
        }
    }

    Ok(page)
}

/// Opens an image file, applies `draw` to it and writes it back
pub fn draw_on_file<F>(path: &Path, draw: F) -> Result<()>
where
    F: FnOnce(&mut RgbImage),
{
    let mut image = image::open(path)
        .with_context(|| format!("Failed to open page image {}", path.display()))?
        .to_rgb8();
    draw(&mut image);
    image.save(path)
        .with_context(|| format!("Failed to save page image {}", path.display()))?;
    Ok(())
}

/// Converts a page pixel coordinate to a drawing coordinate, far off-canvas
/// values are clamped so they cannot overflow
fn to_canvas(value: f64) -> i32 {
    value.round().clamp(-1_000_000.0, 1_000_000.0) as i32
}

/// Draws an axis-aligned filled rectangle, clipped to the image
fn fill_rect(image: &mut RgbImage, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb<u8>) {
    let width = (x1 - x0).max(1) as u32;
    let height = (y1 - y0).max(1) as u32;
    draw_filled_rect_mut(image, Rect::at(x0, y0).of_size(width, height), color);
}

/// Draws the outline of a rectangle as four thin filled rectangles
fn stroke_rect(image: &mut RgbImage, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb<u8>) {
    let half = LINE_WIDTH / 2;
    fill_rect(image, x0 - half, y0 - half, x1 + half + 1, y0 + half + 1, color);
    fill_rect(image, x0 - half, y1 - half, x1 + half + 1, y1 + half + 1, color);
    fill_rect(image, x0 - half, y0 - half, x0 + half + 1, y1 + half + 1, color);
    fill_rect(image, x1 - half, y0 - half, x1 + half + 1, y1 + half + 1, color);
}

/// Draws the route markers that fall on `page`
pub fn draw_path(image: &mut RgbImage, page: &Page, path: &[DrawablePoint]) {
    let (origin_x, origin_y) = page.pixel_origin();
    for point in path {
        let center = (to_canvas(point.x - origin_x), to_canvas(point.y - origin_y));
        draw_filled_circle_mut(image, center, MARKER_RADIUS, PATH_COLOR);
        draw_hollow_circle_mut(image, center, MARKER_RADIUS + 1, PATH_OUTLINE_COLOR);
    }
}

/// Writes distance labels next to their route markers
pub fn draw_labels(image: &mut RgbImage, page: &Page, labels: &[DistanceLabel], font: &Font) {
    let (origin_x, origin_y) = page.pixel_origin();
    let scale = Scale::uniform(LABEL_SIZE);
    for label in labels {
        let x = to_canvas(label.x - origin_x) + MARKER_RADIUS + 4;
        let y = to_canvas(label.y - origin_y) - LABEL_SIZE as i32 / 2;
        let (width, height) = text_size(scale, font, &label.text);
        fill_rect(image, x - 2, y - 2, x + width + 2, y + height + 2, LABEL_BACKGROUND);
        draw_text_mut(image, LABEL_COLOR, x, y, scale, font, &label.text);
    }
}

/// Outlines the requested region on a page of any zoom
pub fn draw_boundary(image: &mut RgbImage, page: &Page, bounds: &BoundingBox) {
    let (origin_x, origin_y) = page.pixel_origin();
    let tile = TILE_SIZE as f64;
    let x0 = to_canvas(lon_to_tile_x(bounds.west, page.zoom) * tile - origin_x);
    let x1 = to_canvas(lon_to_tile_x(bounds.east, page.zoom) * tile - origin_x);
    let y0 = to_canvas(lat_to_tile_y(bounds.north, page.zoom) * tile - origin_y);
    let y1 = to_canvas(lat_to_tile_y(bounds.south, page.zoom) * tile - origin_y);
    stroke_rect(image, x0, y0, x1, y1, BOUNDARY_COLOR);
}

/// Outlines the footprint of every detail page on the overview page
pub fn draw_page_outlines(image: &mut RgbImage, footprints: &[LinkRegion]) {
    for region in footprints {
        let x0 = region.x as i32;
        let y0 = region.y as i32;
        stroke_rect(image, x0, y0, x0 + region.width as i32, y0 + region.height as i32, OUTLINE_COLOR);
    }
}

/// Path of the image for page `index` inside the working directory
pub fn page_file(work_dir: &Path, index: usize) -> PathBuf {
    work_dir.join(format!("page-{:05}.png", index))
}
