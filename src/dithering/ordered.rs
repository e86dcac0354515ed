use log::{debug, warn};
use std::f32::consts::FRAC_PI_4;

use crate::image::GrayImage;
use crate::kernel::{build_halftone_dot, Grid};

// screen cells per output pixel used by halftone screening
const HALFTONE_SUPERSAMPLE: u32 = 4;
/// Largest accepted halftone radius; the screen grows with its square.
pub const MAX_HALFTONE_RADIUS: u32 = 256;

/// Thresholds each pixel against an infinitely tiled screen.
///
/// Pixel `(x, y)` samples the screen at `(x cos a - y sin a, x sin a + y cos a) / scale`,
/// `angle` in radians. A pixel turns white only if it is strictly brighter than the sample.
pub fn dither_ordered<T: GrayImage + ?Sized>(img: &mut T, kernel: &Grid<f32>, scale: f32, angle: f32) {
    if kernel.is_empty() || img.size().is_empty() {
        return;
    }
    if !(scale.is_finite() && scale > 0.0) || !angle.is_finite() {
        warn!("Ignoring ordered dithering with scale {} and angle {}", scale, angle);
        return;
    }

    let (sin, cos) = angle.sin_cos();
    let (sin, cos) = (sin / scale, cos / scale);
    for y in 0..img.height() {
        let fy = y as f32;
        for (x, px) in img.mut_row(y).iter_mut().enumerate() {
            let fx = x as f32;
            let u = (fx * cos - fy * sin).floor() as i32;
            let v = (fx * sin + fy * cos).floor() as i32;
            *px = if *px > kernel.get_wrapped(u, v) { 1.0 } else { 0.0 };
        }
    }
}

/// Clustered-dot screening with dots `radius` pixels apart per half period.
///
/// The screen is built at 4x resolution and sampled every 4 cells, rotated by
/// `angle + 45°`. Near a total rotation of 0° the samples keep hitting the same
/// screen cells and gray levels drift toward 0.5.
pub fn dither_halftone<T: GrayImage + ?Sized>(img: &mut T, radius: u32, angle: f32) {
    if radius == 0 || radius > MAX_HALFTONE_RADIUS {
        warn!(
            "Ignoring halftone with radius {}, expected 1..={}",
            radius, MAX_HALFTONE_RADIUS
        );
        return;
    }
    let t_start = std::time::Instant::now();

    // bounded above, cannot overflow
    let side = (radius * HALFTONE_SUPERSAMPLE) as i32;
    let screen = build_halftone_dot((side, side).into());
    dither_ordered(
        img,
        &screen,
        1.0 / HALFTONE_SUPERSAMPLE as f32,
        angle + FRAC_PI_4,
    );

    debug!(
        "Halftone (radius {}, screen {:?}) of {:?} done in {:?}",
        radius,
        screen.size(),
        img.size(),
        t_start.elapsed()
    );
}
