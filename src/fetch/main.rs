//! Command-line layer fetcher.
//!
//! Resolves a query to a perimeter, fetches the configured layers and writes
//! them as one GeoJSON FeatureCollection.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use perimap::models::LayerConfig;
use perimap::pipeline::{default_layers, PERIMETER_LAYER};
use perimap::{Config, Fetcher, Query};

#[derive(Parser, Debug)]
#[command(name = "fetch")]
#[command(about = "Fetch OpenStreetMap layers clipped to a perimeter")]
struct Args {
    /// Place name, OSM id (e.g. R123456) or "lat,lon"
    query: String,

    /// Circle/rectangle radius around the query point, metres
    #[arg(short, long)]
    radius: Option<f64>,

    /// Rectangle width / height
    #[arg(long)]
    ratio: Option<f64>,

    /// Circular perimeter instead of a rectangle
    #[arg(long)]
    circle: bool,

    /// Rectangle rotation, degrees counter-clockwise
    #[arg(long)]
    rotation: Option<f64>,

    /// Grow the perimeter by this many metres
    #[arg(long)]
    dilate: Option<f64>,

    /// Resolve the query as an OSM id
    #[arg(long)]
    by_osmid: bool,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only fetch these layers (repeatable)
    #[arg(short, long = "layer")]
    layers: Vec<String>,

    /// Output GeoJSON file (stdout when absent)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout may carry the GeoJSON
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    // Command-line perimeter options override the config file
    let perimeter = &mut config.perimeter;
    perimeter.radius = args.radius.or(perimeter.radius);
    perimeter.ratio = args.ratio.unwrap_or(perimeter.ratio);
    perimeter.circle |= args.circle;
    perimeter.rotation = args.rotation.unwrap_or(perimeter.rotation);
    perimeter.dilate = args.dilate.or(perimeter.dilate);
    perimeter.by_osmid |= args.by_osmid;

    let mut layers = if config.layers.is_empty() {
        default_layers()
    } else {
        config.layers.clone()
    };
    if !args.layers.is_empty() {
        layers = args
            .layers
            .iter()
            .map(|name| {
                let layer = layers.get(name).cloned().unwrap_or_else(LayerConfig::default);
                (name.clone(), layer)
            })
            .collect();
    }

    let query: Query = args.query.parse().context("Invalid query")?;
    info!("Query: {} ({:?})", args.query, query.kind());

    let fetcher =
        Fetcher::from_config(&config.global).context("Failed to create HTTP clients")?;

    let total = layers.keys().filter(|name| *name != PERIMETER_LAYER).count();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let result = fetcher
        .get_layers_with_progress(&query, &config.perimeter, &layers, |name| {
            pb.set_message(name.to_string());
            pb.inc(1);
        })
        .await
        .with_context(|| format!("Failed to fetch layers for '{}'", args.query))?;
    pb.finish_and_clear();

    for (name, layer) in result.iter() {
        info!("{}: {} features", name, layer.len());
    }

    let collection = result.to_geojson();
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &collection)?;
            writer.flush()?;
            info!("Wrote {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer(&mut writer, &collection)?;
            writeln!(writer)?;
        }
    }

    Ok(())
}
