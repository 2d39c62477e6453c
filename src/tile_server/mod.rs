//! Tile server definitions and URL templates.

use std::fmt;

use anyhow::{Context, Result, bail};

/// One piece of a URL template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Subdomain,
    Zoom,
    X,
    Y,
}

/// A parsed tile URL template such as `https://{a|b|c}.tile.example.org/{z}/{x}/{y}.png`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    segments: Vec<Segment>,
    subdomains: Vec<String>,
}

impl UrlTemplate {
    /// Parses a template.
    ///
    /// Placeholders are `{z}`, `{x}`, `{y}` and either `{s}` (which requires
    /// explicit `subdomains`) or an inline alternation like `{a|b|c}`.
    pub fn parse(template: &str, subdomains: &[&str]) -> Result<Self> {
        let mut segments = Vec::new();
        let mut subdomains: Vec<String> = subdomains.iter().map(|s| s.to_string()).collect();
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let Some(close) = rest[open..].find('}') else {
                bail!("Unclosed placeholder in tile server template: {}", template);
            };
            let name = &rest[open + 1..open + close];
            let segment = match name {
                "z" => Segment::Zoom,
                "x" => Segment::X,
                "y" => Segment::Y,
                "s" => Segment::Subdomain,
                alternatives if alternatives.contains('|') => {
                    subdomains = alternatives.split('|').map(str::to_string).collect();
                    Segment::Subdomain
                }
                other => bail!("Unknown placeholder {{{}}} in tile server template: {}", other, template),
            };
            segments.push(segment);
            rest = &rest[open + close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        for required in [Segment::Zoom, Segment::X, Segment::Y] {
            if !segments.contains(&required) {
                bail!("Tile server template is missing a {:?} placeholder: {}", required, template);
            }
        }
        if segments.contains(&Segment::Subdomain) && subdomains.is_empty() {
            bail!("Tile server template uses {{s}} without subdomains: {}", template);
        }

        Ok(Self { segments, subdomains })
    }

    /// URL of one tile. Subdomains rotate with the tile position to spread load.
    pub fn url(&self, zoom: u32, x: u64, y: u64) -> String {
        let mut url = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Zoom => url.push_str(&zoom.to_string()),
                Segment::X => url.push_str(&x.to_string()),
                Segment::Y => url.push_str(&y.to_string()),
                Segment::Subdomain => {
                    let index = ((x + y) % self.subdomains.len() as u64) as usize;
                    url.push_str(&self.subdomains[index]);
                }
            }
        }
        url
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => write!(f, "{}", text)?,
                Segment::Zoom => write!(f, "{{z}}")?,
                Segment::X => write!(f, "{{x}}")?,
                Segment::Y => write!(f, "{{y}}")?,
                Segment::Subdomain => write!(f, "{{{}}}", self.subdomains.join("|"))?,
            }
        }
        Ok(())
    }
}

/// A tile server and the download rate it tolerates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileServer {
    pub name: String,
    pub template: UrlTemplate,
    /// Tiles per second; 0 means unthrottled
    pub rate_limit: u32,
}

impl TileServer {
    pub fn custom(template: &str, rate_limit: u32) -> Result<Self> {
        Ok(Self {
            name: "custom".to_string(),
            template: UrlTemplate::parse(template, &[])?,
            rate_limit,
        })
    }

    pub fn url(&self, zoom: u32, x: u64, y: u64) -> String {
        self.template.url(zoom, x, y)
    }
}

/// Known servers: (name, template, subdomains, tiles per second)
const KNOWN_SERVERS: [(&str, &str, &[&str], u32); 5] = [
    ("OpenTopoMap", "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png", &["a", "b", "c"], 1),
    ("OpenStreetMap", "https://tile.openstreetmap.org/{z}/{x}/{y}.png", &[], 2),
    ("OpenStreetMap Deutschland", "https://tile.openstreetmap.de/{z}/{x}/{y}.png", &[], 2),
    ("Humanitarian", "https://{s}.tile.openstreetmap.fr/hot/{z}/{x}/{y}.png", &["a", "b"], 2),
    ("CyclOSM", "https://{s}.tile-cyclosm.openstreetmap.fr/cyclosm/{z}/{x}/{y}.png", &["a", "b", "c"], 2),
];

/// The built-in tile servers, in the order `--tile-server <number>` refers to them
pub fn known_servers() -> Result<Vec<TileServer>> {
    KNOWN_SERVERS
        .iter()
        .map(|&(name, template, subdomains, rate_limit)| -> Result<TileServer> {
            Ok(TileServer {
                name: name.to_string(),
                template: UrlTemplate::parse(template, subdomains)
                    .with_context(|| format!("Invalid built-in tile server {}", name))?,
                rate_limit,
            })
        })
        .collect()
}

/// Resolves `--tile-server`: a 1-based index into [`known_servers`] or a URL template.
///
/// `rate_limit` overrides the rate of a known server and sets the rate of a custom one.
pub fn resolve(server: &str, rate_limit: Option<u32>) -> Result<TileServer> {
    if let Ok(number) = server.parse::<usize>() {
        let servers = known_servers()?;
        let Some(known) = number.checked_sub(1).and_then(|i| servers.get(i)) else {
            bail!("Unknown tile server {}, choose 1 to {}", number, servers.len());
        };
        let mut known = known.clone();
        if let Some(rate) = rate_limit {
            known.rate_limit = rate;
        }
        return Ok(known);
    }
    TileServer::custom(server, rate_limit.unwrap_or(10))
}

/// Text printed by `list-tile-servers`
pub fn listing() -> Result<String> {
    let mut text = String::from("Tile servers (use --tile-server <number> or --tile-server <url>):\n");
    for (i, server) in known_servers()?.iter().enumerate() {
        text.push_str(&format!(
            "{:>3}  {:<26} {} ({} tiles/s)\n",
            i + 1,
            server.name,
            server.template,
            server.rate_limit
        ));
    }
    text.push_str("\nFind more at https://wiki.openstreetmap.org/wiki/Tile_servers\n");
    text.push_str("Please respect the tile usage policy of the server you choose.\n");
    Ok(text)
}
