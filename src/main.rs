use anyhow::Context;
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

use stipple::dithering::{DbsOptions, ScanMode, MAX_HALFTONE_RADIUS};
use stipple::image::convert;
use stipple::kernel::{build_bayer, DiffusionKernel};
use stipple::strategy::Strategy;

use image as imagex; // external, for IO

#[derive(Clone, Copy, Debug, PartialEq, clap::ValueEnum)]
enum Method {
    Random,
    Diffusion,
    Ostromoukhov,
    Ordered,
    Halftone,
    Dbs,
}

#[derive(Parser, Debug)]
#[command(about = "Convert a grayscale image into a black and white dithered one")]
struct Args {
    input: PathBuf,
    output: PathBuf,

    #[arg(short, long, default_value = "diffusion")]
    method: Method,

    /// Read the strategy from a file instead, e.g. "stucki serpentine"
    #[arg(long)]
    strategy_file: Option<PathBuf>,

    #[arg(short, long, default_value = "floyd-steinberg")]
    kernel: DiffusionKernel,

    #[arg(long, default_value_t = false)]
    serpentine: bool,

    #[arg(long, default_value_t = 4)]
    bayer_size: i32,

    #[arg(long, default_value_t = 1.0)]
    scale: f32,

    /// Screen angle in degrees
    #[arg(long, default_value_t = 0.0)]
    angle: f32,

    /// Halftone dot radius in pixels
    #[arg(long, default_value_t = 4)]
    radius: u32,

    #[arg(long, default_value_t = 64)]
    max_passes: u32,

    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn strategy(&self) -> anyhow::Result<Strategy> {
        if let Some(path) = &self.strategy_file {
            return Strategy::read_from_file(path);
        }

        let scan_mode = if self.serpentine {
            ScanMode::Serpentine
        } else {
            ScanMode::Raster
        };
        let angle = self.angle.to_radians();
        let strategy = match self.method {
            Method::Random => Strategy::Random,
            Method::Diffusion => Strategy::ErrorDiffusion {
                kernel: self.kernel.kernel(),
                scan_mode,
            },
            Method::Ostromoukhov => Strategy::Ostromoukhov { scan_mode },
            Method::Ordered => {
                if self.bayer_size <= 0 {
                    anyhow::bail!("Invalid bayer size: {}", self.bayer_size);
                }
                Strategy::Ordered {
                    screen: build_bayer((self.bayer_size, self.bayer_size).into()),
                    scale: self.scale,
                    angle,
                }
            }
            Method::Halftone => {
                if self.radius == 0 || self.radius > MAX_HALFTONE_RADIUS {
                    anyhow::bail!(
                        "Invalid halftone radius {}, expected 1..={}",
                        self.radius,
                        MAX_HALFTONE_RADIUS
                    );
                }
                Strategy::Halftone {
                    radius: self.radius,
                    angle,
                }
            }
            Method::Dbs => Strategy::Dbs(DbsOptions {
                max_passes: self.max_passes,
                ..Default::default()
            }),
        };
        Ok(strategy)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_default_env()
        .format_timestamp_micros()
        .init();
    let args = Args::parse();
    let strategy = args.strategy()?;

    let img_x = imagex::open(&args.input)
        .with_context(|| format!("Cannot open {}", args.input.display()))?
        .to_luma8();
    let (width, height) = img_x.dimensions();
    let mut img = convert::from_luma8(img_x.as_raw(), width as i32, height as i32, None);

    let t_start = std::time::Instant::now();
    match args.seed {
        Some(seed) => strategy.apply_with_rng(&mut img, &mut StdRng::seed_from_u64(seed)),
        None => strategy.apply(&mut img),
    }
    info!(
        "Dithered {}x{} image with {} in {:?}",
        width,
        height,
        strategy.name(),
        t_start.elapsed()
    );

    let out = imagex::GrayImage::from_raw(width, height, convert::to_luma8(&img))
        .context("Dithered image does not match its dimensions")?;
    out.save(&args.output)
        .with_context(|| format!("Cannot write {}", args.output.display()))?;
    Ok(())
}
