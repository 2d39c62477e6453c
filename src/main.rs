use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use osm2pdf::atlas::{self, AtlasPlan, MapOptions, Progress, RenderSettings, RouteOptions};
use osm2pdf::model::{BoundingBox, PageSize};
use osm2pdf::tile_server;
use osm2pdf::track::reader::read_track;

/// Tile servers forbid bulk downloads from this zoom on
const MAX_ZOOM: u32 = 16;

#[derive(Parser)]
#[command(author, version, about = "Export OpenStreetMap to pdf", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct AtlasArgs {
    /// Map zoom
    #[arg(long, default_value_t = 12)]
    zoom: u32,

    /// Number of a built-in tile server (see `list-tile-servers`) or a URL template
    /// such as "https://{a|b}.tile.openstreetmap.fr/hot/{z}/{x}/{y}.png"
    #[arg(long, default_value = "1")]
    tile_server: String,

    /// How many tiles per second can be downloaded (0 = no limit) [default: 10, or the server's own limit]
    #[arg(long)]
    rate_limit: Option<u32>,

    /// How often a failed tile download is retried
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// Name of the generated pdf file (".pdf" is appended, existing files are overwritten)
    #[arg(short, long)]
    output: Option<String>,

    /// Tiles per page horizontally
    #[arg(short = 'x', long, default_value_t = 4)]
    size_x: u32,

    /// Tiles per page vertically
    #[arg(short = 'y', long, default_value_t = 5)]
    size_y: u32,

    /// Folder for downloaded tiles [default: tmp<timestamp>]; reuse it to resume a
    /// failed download. It is deleted after success.
    #[arg(long)]
    tmp: Option<PathBuf>,

    /// TrueType font for distance labels [default: a common system font]
    #[arg(long)]
    font: Option<PathBuf>,

    /// Print the page layout as JSON instead of downloading anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a rectangular area, given GPS boundaries
    Map {
        #[command(flatten)]
        atlas: AtlasArgs,

        /// Latitude of the north boundary
        #[arg(short, long, allow_negative_numbers = true)]
        north: f64,

        /// Latitude of the south boundary
        #[arg(short, long, allow_negative_numbers = true)]
        south: f64,

        /// Longitude of the east boundary
        #[arg(short, long, allow_negative_numbers = true)]
        east: f64,

        /// Longitude of the west boundary
        #[arg(short, long, allow_negative_numbers = true)]
        west: f64,

        /// Don't add a page with an overview of the whole area
        #[arg(long)]
        no_content: bool,

        /// Don't draw the boundary
        #[arg(long)]
        no_boundary: bool,

        /// Don't add links between pages
        #[arg(long)]
        no_links: bool,
    },

    /// Download the pages along a route, given a GPX file
    Route {
        #[command(flatten)]
        atlas: AtlasArgs,

        /// Path to the GPX route file
        #[arg(short, long)]
        input: PathBuf,

        /// Don't draw the path
        #[arg(long)]
        no_path: bool,

        /// Don't write distance labels along the path
        #[arg(long)]
        no_distance: bool,

        /// Distance between distance labels in kilometers
        #[arg(long, default_value_t = 10.0)]
        distance_step: f64,
    },

    /// Print a list of some recommended tile servers
    ListTileServers,
}

impl AtlasArgs {
    fn validate(&self) -> Result<()> {
        if self.zoom > MAX_ZOOM {
            bail!(
                "Sorry, OSM Tile Usage Policy (https://operations.osmfoundation.org/policies/tiles/) \
                 forbids downloading tiles with zoom {} and higher.",
                MAX_ZOOM + 1
            );
        }
        if self.size_x == 0 || self.size_y == 0 {
            bail!("Pages must be at least one tile wide and high");
        }
        Ok(())
    }

    fn page_size(&self) -> PageSize {
        PageSize::new(self.size_x, self.size_y)
    }

    fn settings(&self, default_output: String) -> Result<RenderSettings> {
        let tile_server = tile_server::resolve(&self.tile_server, self.rate_limit)
            .context("Invalid tile server")?;
        let work_dir = self.tmp.clone().unwrap_or_else(|| {
            PathBuf::from(format!("tmp{}", chrono::Utc::now().timestamp_millis()))
        });
        let stem = self.output.clone().unwrap_or(default_output);
        Ok(RenderSettings {
            tile_server,
            retries: self.retries,
            work_dir,
            output: PathBuf::from(format!("{}.pdf", stem)),
            font: self.font.clone(),
        })
    }
}

fn validate_bounds(bounds: &BoundingBox) -> Result<()> {
    for lat in [bounds.north, bounds.south] {
        if !(lat.abs() < 90.0) {
            bail!("Latitude {} must be between -90 and 90 (exclusive)", lat);
        }
    }
    for lon in [bounds.east, bounds.west] {
        if !(-180.0..=180.0).contains(&lon) {
            bail!("Longitude {} must be between -180 and 180", lon);
        }
    }
    if bounds.north < bounds.south {
        bail!("North boundary {} lies south of the south boundary {}", bounds.north, bounds.south);
    }
    if bounds.east < bounds.west {
        bail!("East boundary {} lies west of the west boundary {}", bounds.east, bounds.west);
    }
    Ok(())
}

fn report(progress: Progress) {
    match progress {
        Progress::Planned { pages } => info!("Rendering {} pages", pages),
        Progress::Downloading { page, pages, tile, tiles } => {
            info!("Page {}/{}: downloaded tile {}/{}", page, pages, tile, tiles)
        }
        Progress::Drawing { page, pages } => info!("Page {}/{}: drawing", page, pages),
        Progress::Writing { output } => info!("Writing {}", output.display()),
        Progress::Finished { output } => info!("Your map was saved to {}", output.display()),
    }
}

fn run(plan: &AtlasPlan, args: &AtlasArgs, default_output: String) -> Result<()> {
    if args.dry_run {
        let json = serde_json::to_string_pretty(plan).context("Failed to serialize plan")?;
        println!("{}", json);
        return Ok(());
    }
    let settings = args.settings(default_output)?;
    let output = atlas::render(plan, &settings, report)?;
    println!("Finished! Your map was saved to {}", output.display());
    Ok(())
}

fn input_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "route".to_string())
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command line arguments
    let cli = Cli::parse();

    match &cli.command {
        Commands::Map { atlas: args, north, south, east, west, no_content, no_boundary, no_links } => {
            args.validate()?;
            let bounds = BoundingBox { north: *north, south: *south, east: *east, west: *west };
            validate_bounds(&bounds)?;

            let options = MapOptions {
                overview: !no_content,
                boundary: !no_boundary,
                links: !no_links,
            };
            let plan = atlas::plan_map(&bounds, args.zoom, args.page_size(), options);
            info!("Map covers {} pages", plan.pages.len());
            let default_output = format!("map_{}_{}_{}_{}_{}", north, west, south, east, args.zoom);
            run(&plan, args, default_output)?;
        },

        Commands::Route { atlas: args, input, no_path, no_distance, distance_step } => {
            args.validate()?;
            info!("Reading route from {}", input.display());
            let points = read_track(input)
                .with_context(|| format!("Failed to read route {}", input.display()))?;
            if points.is_empty() {
                bail!("Route {} contains no points", input.display());
            }
            if let Some(point) = points.iter().find(|p| !(p.lat.abs() < 90.0)) {
                bail!("Route point at latitude {} is outside the map", point.lat);
            }

            let options = RouteOptions {
                path: !no_path,
                distance: !no_distance,
                distance_step: *distance_step,
            };
            let plan = atlas::plan_route(&points, args.zoom, args.page_size(), options);
            info!("Route passes {} pages", plan.pages.len());
            let default_output = format!("route-{}-{}", input_stem(input), args.zoom);
            run(&plan, args, default_output)?;
        },

        Commands::ListTileServers => {
            print!("{}", tile_server::listing()?);
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(north: f64, south: f64, east: f64, west: f64) -> BoundingBox {
        BoundingBox { north, south, east, west }
    }

    #[test]
    fn test_validate_bounds_accepts_region() {
        assert!(validate_bounds(&bounds(50.1, 50.0, 15.0, 14.9)).is_ok());
        // A single point is a valid region
        assert!(validate_bounds(&bounds(50.0, 50.0, 15.0, 15.0)).is_ok());
    }

    #[test]
    fn test_validate_bounds_rejects_swapped_sides() {
        let err = validate_bounds(&bounds(50.0, 50.1, 15.0, 14.9)).expect_err("north below south");
        assert!(err.to_string().contains("North boundary"));
        let err = validate_bounds(&bounds(50.1, 50.0, 14.9, 15.0)).expect_err("east west of west");
        assert!(err.to_string().contains("East boundary"));
    }

    #[test]
    fn test_validate_bounds_rejects_out_of_range() {
        assert!(validate_bounds(&bounds(90.0, 50.0, 15.0, 14.9)).is_err());
        assert!(validate_bounds(&bounds(50.1, 50.0, 181.0, 14.9)).is_err());
        assert!(validate_bounds(&bounds(f64::NAN, 50.0, 15.0, 14.9)).is_err());
    }
}
