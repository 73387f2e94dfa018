//! terraveg CLI - terrain and vegetation compositing

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use terraveg_algorithms::imagery::ndvi;
use terraveg_algorithms::terrain::{
    aspect, hillshade, slope, AspectOutput, AspectParams, HillshadeParams, SlopeParams, SlopeUnits,
};
use terraveg_core::io::{read_geotiff, write_geotiff, write_rgb_geotiff, GeoTiffOptions};
use terraveg_core::{Raster, Region};
use terraveg_pipeline::{
    CompositePipeline, CompositeProducts, PipelineConfig, RegionConfig, SceneCatalog, SceneManifest,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "terraveg")]
#[command(author, version, about = "Terrain and vegetation compositing", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Terrain channels from a DEM
    Terrain {
        #[command(subcommand)]
        algorithm: TerrainCommands,
    },
    /// NDVI from near-infrared and red bands
    Ndvi {
        /// Near-infrared band
        #[arg(long)]
        nir: PathBuf,
        /// Red band
        #[arg(long)]
        red: PathBuf,
        /// Output file
        output: PathBuf,
    },
    /// Render the terrain–vegetation composite
    Compose(ComposeArgs),
}

#[derive(Subcommand)]
enum TerrainCommands {
    /// Calculate slope from DEM
    Slope {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Output units
        #[arg(short, long, value_enum, default_value = "degrees")]
        units: SlopeUnitsArg,
        /// Z-factor for unit conversion
        #[arg(short, long, default_value = "1.0")]
        z_factor: f64,
    },
    /// Calculate aspect (0 = north, clockwise) from DEM
    Aspect {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value = "degrees")]
        format: AspectFormatArg,
    },
    /// Calculate hillshade from DEM
    Hillshade {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Sun azimuth in degrees (0=North, clockwise)
        #[arg(short, long, default_value = "270")]
        azimuth: f64,
        /// Sun altitude in degrees above horizon
        #[arg(short = 'l', long, default_value = "45")]
        altitude: f64,
        /// Z-factor for vertical exaggeration
        #[arg(short, long, default_value = "1.0")]
        z_factor: f64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SlopeUnitsArg {
    Degrees,
    Percent,
    Radians,
}

impl From<SlopeUnitsArg> for SlopeUnits {
    fn from(arg: SlopeUnitsArg) -> Self {
        match arg {
            SlopeUnitsArg::Degrees => SlopeUnits::Degrees,
            SlopeUnitsArg::Percent => SlopeUnits::Percent,
            SlopeUnitsArg::Radians => SlopeUnits::Radians,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AspectFormatArg {
    Degrees,
    Radians,
}

impl From<AspectFormatArg> for AspectOutput {
    fn from(arg: AspectFormatArg) -> Self {
        match arg {
            AspectFormatArg::Degrees => AspectOutput::Degrees,
            AspectFormatArg::Radians => AspectOutput::Radians,
        }
    }
}

#[derive(clap::Args)]
struct ComposeArgs {
    /// Output composite (8-bit RGB GeoTIFF)
    output: PathBuf,
    /// DEM file; overrides the manifest's elevation entry
    #[arg(long)]
    dem: Option<PathBuf>,
    /// Scene manifest (TOML)
    #[arg(long)]
    scenes: Option<PathBuf>,
    /// Pipeline configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Region as min_x,min_y,max_x,max_y; defaults to the config region,
    /// then to the DEM extent
    #[arg(long, value_delimiter = ',', num_args = 4)]
    bbox: Option<Vec<f64>>,
    /// Sun azimuth in degrees
    #[arg(long)]
    azimuth: Option<f64>,
    /// Sun elevation in degrees
    #[arg(long)]
    elevation: Option<f64>,
    /// Maximum scene cloud cover, percent
    #[arg(long)]
    cloud_threshold: Option<f64>,
    /// First acquisition date (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,
    /// End of the acquisition window, exclusive (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,
    /// Legend metadata output (JSON)
    #[arg(long)]
    legend: Option<PathBuf>,
    /// Directory for the single-band products (index, alpha, slope, aspect, hillshade)
    #[arg(long)]
    products_dir: Option<PathBuf>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn write_result(raster: &Raster<f64>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn load_config(args: &ComposeArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path).context("Failed to load configuration")?,
        None => PipelineConfig::default(),
    };

    if let Some(azimuth) = args.azimuth {
        config.terrain.sun_azimuth = azimuth;
    }
    if let Some(elevation) = args.elevation {
        config.terrain.sun_elevation = elevation;
    }
    if let Some(threshold) = args.cloud_threshold {
        config.collection.cloud_threshold = threshold;
    }
    if let Some(start) = args.start {
        config.collection.start = start;
    }
    if let Some(end) = args.end {
        config.collection.end = end;
    }
    if let Some(bbox) = &args.bbox {
        config.region = RegionConfig::from_bbox([bbox[0], bbox[1], bbox[2], bbox[3]]);
    }
    Ok(config)
}

fn load_catalog(args: &ComposeArgs) -> Result<SceneCatalog> {
    let pb = spinner("Loading scenes...");
    let mut catalog = match &args.scenes {
        Some(path) => SceneManifest::from_file(path)
            .and_then(|m| m.load())
            .with_context(|| format!("Failed to load scene manifest {}", path.display()))?,
        None => SceneCatalog::new(),
    };
    pb.finish_and_clear();

    if let Some(dem) = &args.dem {
        catalog = catalog.with_elevation(read_raster(dem)?);
    }
    info!("{} scenes in catalog", catalog.scenes().len());
    Ok(catalog)
}

fn resolve_region(config: &PipelineConfig, args: &ComposeArgs) -> Result<Region> {
    if config.region.is_set() {
        return config.region.to_region().context("Invalid region");
    }
    let Some(dem) = &args.dem else {
        anyhow::bail!("No region given: pass --bbox, set [region] in the config, or pass --dem");
    };
    let grid = read_geotiff::<f64, _>(dem)
        .with_context(|| format!("Failed to read raster {}", dem.display()))?
        .grid();
    Region::covering(&grid).context("DEM has no extent")
}

fn write_products(products: &CompositeProducts, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let layers = [
        ("ndvi.tif", &products.vegetation_index),
        ("alpha.tif", &products.alpha),
        ("slope.tif", &products.slope),
        ("aspect.tif", &products.aspect),
        ("hillshade.tif", &products.hillshade),
    ];
    for (name, raster) in layers {
        write_result(raster, &dir.join(name))?;
    }
    write_rgb_geotiff(&products.terrain_rgb, dir.join("terrain_rgb.tif"), None)
        .context("Failed to write terrain RGB")?;
    Ok(())
}

fn compose(args: ComposeArgs) -> Result<()> {
    let config = load_config(&args)?;
    let region = resolve_region(&config, &args)?;
    let catalog = load_catalog(&args)?;
    let pipeline = CompositePipeline::new(config, Arc::new(catalog))
        .context("Invalid pipeline configuration")?;

    let pb = spinner("Compositing...");
    let start = Instant::now();
    let products = pipeline.run(&region).context("Failed to build composite")?;
    let elapsed = start.elapsed();
    pb.finish_and_clear();

    match products.bounds {
        Some(b) => info!("Hillshade stretch: {:.2} .. {:.2} ({} samples)", b.low, b.high, b.samples),
        None => warn!("Hillshade stretch undefined, base rendered mid-gray"),
    }

    let pb = spinner("Writing composite...");
    write_rgb_geotiff(&products.composite, &args.output, Some(GeoTiffOptions::default()))
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    pb.finish_and_clear();

    if let Some(path) = &args.legend {
        let json = products.metadata.to_json().context("Failed to serialize legend")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Legend saved to: {}", path.display());
    }
    if let Some(dir) = &args.products_dir {
        write_products(&products, dir)?;
        println!("Products saved to: {}", dir.display());
    }

    done("Composite", &args.output, elapsed);
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len() as f64
            );
        }

        // ── Terrain ──────────────────────────────────────────────────
        Commands::Terrain { algorithm } => match algorithm {
            TerrainCommands::Slope {
                input,
                output,
                units,
                z_factor,
            } => {
                let dem = read_raster(&input)?;
                let start = Instant::now();
                let params = SlopeParams {
                    units: units.into(),
                    z_factor,
                };
                let result = slope(&dem, &params).context("Failed to calculate slope")?;
                let elapsed = start.elapsed();
                write_result(&result, &output)?;
                done("Slope", &output, elapsed);
            }

            TerrainCommands::Aspect {
                input,
                output,
                format,
            } => {
                let dem = read_raster(&input)?;
                let start = Instant::now();
                let params = AspectParams {
                    output: format.into(),
                    ..Default::default()
                };
                let result = aspect(&dem, &params).context("Failed to calculate aspect")?;
                let elapsed = start.elapsed();
                write_result(&result, &output)?;
                done("Aspect", &output, elapsed);
            }

            TerrainCommands::Hillshade {
                input,
                output,
                azimuth,
                altitude,
                z_factor,
            } => {
                let dem = read_raster(&input)?;
                let start = Instant::now();
                let params = HillshadeParams {
                    azimuth,
                    altitude,
                    z_factor,
                    normalized: false,
                };
                let result = hillshade(&dem, &params).context("Failed to calculate hillshade")?;
                let elapsed = start.elapsed();
                write_result(&result, &output)?;
                done("Hillshade", &output, elapsed);
            }
        },

        // ── Vegetation ───────────────────────────────────────────────
        Commands::Ndvi { nir, red, output } => {
            let nir = read_raster(&nir)?;
            let red = read_raster(&red)?;
            let start = Instant::now();
            let result = ndvi(&nir, &red).context("Failed to calculate NDVI")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("NDVI", &output, elapsed);
        }

        // ── Composite ────────────────────────────────────────────────
        Commands::Compose(args) => compose(args)?,
    }

    Ok(())
}
