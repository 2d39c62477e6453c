//! Planning and rendering a complete atlas.
//!
//! Planning is pure: it turns a region or a track into pages, overlays and
//! links. Rendering downloads the tiles, draws the overlays and writes the PDF,
//! reporting what it does through a [`Progress`] callback.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::info;
use serde::Serialize;

use crate::cache::Cache;
use crate::compose::{self, draw_on_file, load_font, merge_tiles, page_file};
use crate::download::TileFetcher;
use crate::layout::{overview_page, region_pages};
use crate::links::{grid_links, overview_links, route_links};
use crate::model::{BoundingBox, DistanceLabel, DrawablePoint, GeoPoint, Page, PageLinkSet, PageSize};
use crate::pdf::write_pdf;
use crate::tile_server::TileServer;
use crate::track::{distance_labels, rasterize};

/// Options of the region ("map") mode
#[derive(Debug, Clone, Copy)]
pub struct MapOptions {
    /// Prepend an overview page linking to every detail page
    pub overview: bool,
    /// Outline the requested region
    pub boundary: bool,
    /// Link neighbouring pages
    pub links: bool,
}

/// Options of the track ("route") mode
#[derive(Debug, Clone, Copy)]
pub struct RouteOptions {
    /// Draw the track
    pub path: bool,
    /// Label the track with distances
    pub distance: bool,
    /// Kilometers between distance labels
    pub distance_step: f64,
}

/// Everything needed to render an atlas, computed before any download
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtlasPlan {
    pub page_size: PageSize,
    /// In document order; the overview page comes first when present
    pub pages: Vec<Page>,
    pub has_overview: bool,
    pub links: PageLinkSet,
    pub boundary: Option<BoundingBox>,
    pub path: Vec<DrawablePoint>,
    pub labels: Vec<DistanceLabel>,
}

/// Lays out a rectangular region
pub fn plan_map(bounds: &BoundingBox, zoom: u32, size: PageSize, options: MapOptions) -> AtlasPlan {
    let grid = region_pages(bounds, zoom, size);
    let overview = options.overview.then(|| overview_page(bounds, zoom, size)).flatten();
    let offset = usize::from(overview.is_some());

    let mut links = Vec::new();
    if options.links {
        if let Some(overview) = &overview {
            links.push(overview_links(overview, &grid.pages, offset));
        }
        links.extend(grid_links(grid.width, grid.height, size, offset));
    }

    let pages: Vec<Page> = overview.into_iter().chain(grid.pages).collect();
    AtlasPlan {
        page_size: size,
        pages,
        has_overview: offset == 1,
        links,
        boundary: options.boundary.then_some(*bounds),
        path: Vec::new(),
        labels: Vec::new(),
    }
}

/// Lays out the pages along a track
pub fn plan_route(points: &[GeoPoint], zoom: u32, size: PageSize, options: RouteOptions) -> AtlasPlan {
    let route = rasterize(points, zoom, size);
    let labels = if options.path && options.distance {
        distance_labels(&route.path, options.distance_step)
    } else {
        Vec::new()
    };
    let links = route_links(&route.pages, 0);

    AtlasPlan {
        page_size: size,
        pages: route.pages,
        has_overview: false,
        links,
        boundary: None,
        path: if options.path { route.path } else { Vec::new() },
        labels,
    }
}

/// Where and how to render
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub tile_server: TileServer,
    pub retries: u32,
    /// Downloaded tiles and page images; kept when rendering fails so a rerun can resume
    pub work_dir: PathBuf,
    /// The PDF to create
    pub output: PathBuf,
    pub font: Option<PathBuf>,
}

/// Rendering stages reported to the caller
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Planned { pages: usize },
    Downloading { page: usize, pages: usize, tile: usize, tiles: usize },
    Drawing { page: usize, pages: usize },
    Writing { output: PathBuf },
    Finished { output: PathBuf },
}

/// Renders a plan into a PDF, returning the path of the written file
pub fn render<F>(plan: &AtlasPlan, settings: &RenderSettings, mut progress: F) -> Result<PathBuf>
where
    F: FnMut(Progress),
{
    if plan.pages.is_empty() {
        bail!("Nothing to render: the plan has no pages");
    }
    let total = plan.pages.len();
    progress(Progress::Planned { pages: total });

    fs::create_dir_all(&settings.work_dir)
        .with_context(|| format!("Failed to create working directory {}", settings.work_dir.display()))?;
    let cache = Cache::new(settings.work_dir.join("tiles"))?;
    let mut fetcher = TileFetcher::new(cache, settings.tile_server.clone(), settings.retries)?;
    let font = if plan.labels.is_empty() { None } else { load_font(settings.font.as_deref())? };

    let mut page_files = Vec::with_capacity(total);
    for (index, page) in plan.pages.iter().enumerate() {
        let path = page_file(&settings.work_dir, index);
        render_page(&mut fetcher, page, &path, |tile, tiles| {
            progress(Progress::Downloading { page: index + 1, pages: total, tile, tiles })
        })
        .with_context(|| format!("Failed to render page {}/{}", index + 1, total))?;

        progress(Progress::Drawing { page: index + 1, pages: total });
        draw_on_file(&path, |image| {
            if let Some(bounds) = &plan.boundary {
                compose::draw_boundary(image, page, bounds);
            }
            if plan.has_overview && index == 0 {
                let details = &plan.pages[1..];
                compose::draw_page_outlines(image, &overview_links(page, details, 1));
            } else {
                compose::draw_path(image, page, &plan.path);
                if let Some(font) = &font {
                    compose::draw_labels(image, page, &plan.labels, font);
                }
            }
        })?;
        page_files.push(path);
    }

    progress(Progress::Writing { output: settings.output.clone() });
    write_pdf(&settings.output, &page_files, plan.page_size, &plan.links)?;

    fs::remove_dir_all(&settings.work_dir)
        .with_context(|| format!("Failed to remove working directory {}", settings.work_dir.display()))?;
    progress(Progress::Finished { output: settings.output.clone() });
    Ok(settings.output.clone())
}

/// Downloads the tiles of one page and saves the merged image at `path`
fn render_page<F>(fetcher: &mut TileFetcher, page: &Page, path: &Path, mut on_tile: F) -> Result<()>
where
    F: FnMut(usize, usize),
{
    let tiles = (page.size_x * page.size_y) as usize;
    let mut rows = Vec::with_capacity(page.size_y as usize);
    let mut row = Vec::with_capacity(page.size_x as usize);

    for (done, (x, y)) in page.tiles().enumerate() {
        row.push(fetcher.fetch(x, y, page.zoom)?);
        on_tile(done + 1, tiles);
        if row.len() == page.size_x as usize {
            rows.push(std::mem::take(&mut row));
        }
    }

    let image = merge_tiles(&rows)?;
    image.save(path)
        .with_context(|| format!("Failed to save page image {}", path.display()))?;
    info!("Saved {}", path.display());
    Ok(())
}
