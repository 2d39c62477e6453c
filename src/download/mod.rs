use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::cache::Cache;
use crate::tile_server::TileServer;

const USER_AGENT: &str = concat!("osm2pdf/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Result of fetching a single tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileData {
    /// Encoded image as served
    Image(Vec<u8>),
    /// The tile lies above or below the map; draw it blank
    Blank,
}

/// Keeps requests at or below a number per second
pub struct RateLimiter {
    interval: Option<Duration>,
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// `per_second == 0` disables throttling
    pub fn new(per_second: u32) -> Self {
        let interval = (per_second > 0).then(|| Duration::from_secs_f64(1.0 / per_second as f64));
        Self { interval, last_request: None }
    }

    /// Time to wait before the next request may start
    pub fn delay(&self, now: Instant) -> Duration {
        match (self.interval, self.last_request) {
            (Some(interval), Some(last)) => interval.saturating_sub(now.duration_since(last)),
            _ => Duration::ZERO,
        }
    }

    /// Blocks until the next request may start and records it
    pub fn wait(&mut self) {
        let delay = self.delay(Instant::now());
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        self.last_request = Some(Instant::now());
    }
}

/// Whether a failed request is worth repeating
fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT
}

/// Downloader for map tiles
pub struct TileFetcher {
    cache: Cache,
    client: Client,
    server: TileServer,
    limiter: RateLimiter,
    retries: u32,
}

impl TileFetcher {
    /// Create a new fetcher for the given server, storing tiles in `cache`
    pub fn new(cache: Cache, server: TileServer, retries: u32) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        let limiter = RateLimiter::new(server.rate_limit);
        Ok(Self { cache, client, server, limiter, retries })
    }

    /// Fetch one tile. Columns wrap around the antimeridian; rows outside the
    /// map are blank.
    pub fn fetch(&mut self, x: i64, y: i64, zoom: u32) -> Result<TileData> {
        let count = 1i64 << zoom;
        if y < 0 || y >= count {
            return Ok(TileData::Blank);
        }
        let x = x.rem_euclid(count);
        let url = self.server.url(zoom, x as u64, y as u64);

        if let Some(data) = self.cache.get(&url)? {
            debug!("Using cached tile {}", url);
            return Ok(TileData::Image(data));
        }

        let data = self.download_with_retries(&url)?;
        self.cache.save_to_cache(&url, &data)
            .context("Failed to save tile to cache")?;
        Ok(TileData::Image(data))
    }

    fn download_with_retries(&mut self, url: &str) -> Result<Vec<u8>> {
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 0;
        loop {
            match self.download(url) {
                Ok(data) => return Ok(data),
                Err(err) if attempt < self.retries && err.transient => {
                    attempt += 1;
                    warn!("Retrying {} in {:?} ({}/{}): {:#}", url, backoff, attempt, self.retries, err.error);
                    thread::sleep(backoff);
                    backoff *= 2;
                }
                Err(err) => {
                    return Err(err.error).with_context(|| format!("Failed to download tile {}", url));
                }
            }
        }
    }

    fn download(&mut self, url: &str) -> std::result::Result<Vec<u8>, DownloadError> {
        self.limiter.wait();
        debug!("Downloading {}", url);

        let response = self.client.get(url)
            .send()
            .map_err(|e| DownloadError::transient(anyhow::Error::new(e).context("Failed to send request")))?;

        let status = response.status();
        if !status.is_success() {
            let error = anyhow::anyhow!("HTTP {}", status);
            return Err(if is_transient(status) {
                DownloadError::transient(error)
            } else {
                DownloadError::permanent(error)
            });
        }

        let data = response.bytes()
            .map_err(|e| DownloadError::transient(anyhow::Error::new(e).context("Failed to read response bytes")))?;
        Ok(data.to_vec())
    }
}

/// A failed attempt and whether retrying it makes sense
struct DownloadError {
    error: anyhow::Error,
    transient: bool,
}

impl DownloadError {
    fn transient(error: anyhow::Error) -> Self {
        Self { error, transient: true }
    }

    fn permanent(error: anyhow::Error) -> Self {
        Self { error, transient: false }
    }
}
