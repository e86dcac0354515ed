pub mod dbs;
pub mod diffusion;
pub mod ordered;
pub mod ostromoukhov;
pub mod random;

pub use dbs::{refine_dbs, run_dbs, run_dbs_with_rng, DbsOptions, DbsStats};
pub use diffusion::diffuse;
pub use ordered::{dither_halftone, dither_ordered, MAX_HALFTONE_RADIUS};
pub use ostromoukhov::{diffuse_ostromoukhov, get_diffusion};
pub use random::{dither_random, dither_random_with};

use crate::image::GrayImage;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ScanMode {
    #[default]
    Raster,
    /// odd rows run right-to-left
    Serpentine,
}

impl ScanMode {
    /// Horizontal step of the given row: 1 for left-to-right, -1 for right-to-left.
    pub fn direction(&self, row: i32) -> i32 {
        match self {
            Self::Serpentine if row % 2 == 1 => -1,
            _ => 1,
        }
    }
}

/// Binary quantization against the 0.5 threshold.
pub fn quantize(value: f32) -> f32 {
    if value >= 0.5 {
        1.0
    } else {
        0.0
    }
}

// Visits every pixel exactly once, rows top-to-bottom. The callback gets the pixel
// position and the row direction so it can mirror its propagation offsets.
fn scan<T, F>(img: &mut T, scan_mode: ScanMode, mut visit: F)
where
    T: GrayImage + ?Sized,
    F: FnMut(&mut T, i32, i32, i32),
{
    let width = img.width();
    for y in 0..img.height() {
        let dir = scan_mode.direction(y);
        for i in 0..width {
            let x = if dir > 0 { i } else { width - 1 - i };
            visit(img, x, y, dir);
        }
    }
}

// Adds `err * weight` to a pixel, silently dropping targets outside the image.
fn spread_error<T: GrayImage + ?Sized>(img: &mut T, x: i32, y: i32, err: f32, weight: f32) {
    if img.size().contains((x, y).into()) {
        let val = img.get(x, y);
        img.set(x, y, val + err * weight);
    }
}
