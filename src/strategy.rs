use std::f32::consts::PI;
use std::str::FromStr;

use anyhow::{bail, Context};
use rand::Rng;

use crate::dithering::{self, DbsOptions, ScanMode, MAX_HALFTONE_RADIUS};
use crate::image::GrayImage;
use crate::kernel::{build_bayer, DiffusionKernel, Grid, Kernel};

/// A dithering algorithm together with its parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum Strategy {
    Random,
    ErrorDiffusion { kernel: Kernel, scan_mode: ScanMode },
    Ostromoukhov { scan_mode: ScanMode },
    /// `angle` in radians
    Ordered { screen: Grid<f32>, scale: f32, angle: f32 },
    /// `angle` in radians
    Halftone { radius: u32, angle: f32 },
    Dbs(DbsOptions),
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Ordered {
            screen: build_bayer((4, 4).into()),
            scale: 1.0,
            angle: 0.0,
        }
    }
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::ErrorDiffusion { .. } => "error diffusion",
            Self::Ostromoukhov { .. } => "ostromoukhov",
            Self::Ordered { .. } => "ordered",
            Self::Halftone { .. } => "halftone",
            Self::Dbs(_) => "dbs",
        }
    }

    pub fn apply<T: GrayImage + ?Sized>(&self, img: &mut T) {
        self.apply_with_rng(img, &mut rand::rng())
    }

    /// Same as `apply`, drawing random numbers from `rng` where the strategy needs them.
    pub fn apply_with_rng<T, R>(&self, img: &mut T, rng: &mut R)
    where
        T: GrayImage + ?Sized,
        R: Rng,
    {
        match self {
            Self::Random => dithering::dither_random_with(img, rng),
            Self::ErrorDiffusion { kernel, scan_mode } => dithering::diffuse(img, kernel, *scan_mode),
            Self::Ostromoukhov { scan_mode } => dithering::diffuse_ostromoukhov(img, *scan_mode),
            Self::Ordered {
                screen,
                scale,
                angle,
            } => dithering::dither_ordered(img, screen, *scale, *angle),
            Self::Halftone { radius, angle } => dithering::dither_halftone(img, *radius, *angle),
            Self::Dbs(options) => {
                dithering::run_dbs_with_rng(img, rng, *options);
            }
        }
    }

    pub fn read_from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read strategy from {}", path.display()))?;
        content.trim_end().parse()
    }
}

fn parse_scan_mode(token: Option<&str>) -> anyhow::Result<ScanMode> {
    let scan_mode = match token {
        None | Some("raster") => ScanMode::Raster,
        Some("serpentine") => ScanMode::Serpentine,
        Some(other) => bail!("Unsupported scan mode: {}", other),
    };
    Ok(scan_mode)
}

fn parse_arg<T: FromStr>(token: Option<&str>, default: T, what: &str) -> anyhow::Result<T> {
    match token {
        None => Ok(default),
        Some(token) => match token.parse() {
            Ok(v) => Ok(v),
            Err(_) => bail!("Invalid {}: {}", what, token),
        },
    }
}

/// Parses the one-line form `<method> [args...]`; angles are given in degrees:
///
/// ```text
/// random
/// floyd_steinberg serpentine
/// ostromoukhov raster
/// bayer 8 [scale] [angle]
/// halftone 4 [angle]
/// dbs [max_passes]
/// ```
impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let mut tokens = s.split_whitespace();
        let method = tokens.next().context("Empty strategy")?;

        let strategy = match method {
            "random" => Strategy::Random,
            "ostromoukhov" => Strategy::Ostromoukhov {
                scan_mode: parse_scan_mode(tokens.next())?,
            },
            "bayer" => {
                let size: i32 = parse_arg(tokens.next(), 4, "bayer size")?;
                if size <= 0 {
                    bail!("Invalid bayer size: {}", size);
                }
                Strategy::Ordered {
                    screen: build_bayer((size, size).into()),
                    scale: parse_arg(tokens.next(), 1.0, "scale")?,
                    angle: parse_arg(tokens.next(), 0.0f32, "angle")? * PI / 180.0,
                }
            }
            "halftone" => {
                let radius: u32 = parse_arg(tokens.next(), 4, "radius")?;
                if radius == 0 || radius > MAX_HALFTONE_RADIUS {
                    bail!("Invalid halftone radius: {}", radius);
                }
                Strategy::Halftone {
                    radius,
                    angle: parse_arg(tokens.next(), 0.0f32, "angle")? * PI / 180.0,
                }
            }
            "dbs" => Strategy::Dbs(DbsOptions {
                max_passes: parse_arg(tokens.next(), DbsOptions::default().max_passes, "max passes")?,
                ..Default::default()
            }),
            name => match DiffusionKernel::from_name(name) {
                Some(kernel) => Strategy::ErrorDiffusion {
                    kernel: kernel.kernel(),
                    scan_mode: parse_scan_mode(tokens.next())?,
                },
                None => bail!("Unsupported strategy: {}", s),
            },
        };
        if let Some(extra) = tokens.next() {
            bail!("Unexpected argument '{}' in strategy: {}", extra, s);
        }
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ConstGrayImage, ImageBuffer};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse() {
        assert_eq!("random".parse::<Strategy>().unwrap(), Strategy::Random);
        assert_eq!(
            "floyd_steinberg serpentine".parse::<Strategy>().unwrap(),
            Strategy::ErrorDiffusion {
                kernel: Kernel::floyd_steinberg(),
                scan_mode: ScanMode::Serpentine,
            }
        );
        assert_eq!(
            "ostromoukhov".parse::<Strategy>().unwrap(),
            Strategy::Ostromoukhov {
                scan_mode: ScanMode::Raster
            }
        );
        assert_eq!("bayer".parse::<Strategy>().unwrap(), Strategy::default());
        match "halftone 6 90".parse::<Strategy>().unwrap() {
            Strategy::Halftone { radius, angle } => {
                assert_eq!(radius, 6);
                assert!((angle - PI / 2.0).abs() < 1e-6);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            "dbs 10".parse::<Strategy>().unwrap(),
            Strategy::Dbs(DbsOptions {
                max_passes: 10,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            "",
            "magic",
            "bayer -2",
            "bayer x",
            "halftone 0",
            "halftone 100000",
            "stucki sideways",
            "random 3",
        ] {
            assert!(bad.parse::<Strategy>().is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn test_read_from_file() {
        let path = std::env::temp_dir().join(format!("stipple-strategy-{}", std::process::id()));
        std::fs::write(&path, "atkinson serpentine\n").unwrap();
        let strategy = Strategy::read_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            strategy,
            Strategy::ErrorDiffusion {
                kernel: Kernel::atkinson(),
                scan_mode: ScanMode::Serpentine,
            }
        );

        assert!(Strategy::read_from_file(&path).is_err());
    }

    #[test]
    fn test_every_strategy_binarizes() {
        for text in [
            "random",
            "sierra_lite",
            "jarvis_judice_ninke serpentine",
            "ostromoukhov serpentine",
            "bayer 8 2 30",
            "halftone 2 15",
            "dbs 4",
        ] {
            let strategy: Strategy = text.parse().unwrap();
            let mut img = ImageBuffer::from_fn(24, 18, |x, y| ((x + y) % 12) as f32 / 11.0);
            strategy.apply_with_rng(&mut img, &mut StdRng::seed_from_u64(4));
            assert!(
                img.data().iter().all(|v| *v == 0.0 || *v == 1.0),
                "{} left gray pixels",
                strategy.name()
            );
        }
    }
}
