//! Variable-coefficient error diffusion after V. Ostromoukhov, "A Simple and Efficient
//! Error-Diffusion Algorithm", SIGGRAPH 2001.

use log::debug;

use super::{quantize, scan, spread_error, ScanMode};
use crate::image::{ConstGrayImage, GrayImage, ImageBuffer};

/// Weights of the three propagation targets. They always sum to 1.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Diffusion {
    /// next pixel in scan direction
    pub right: f32,
    /// next row, one pixel behind the scan direction
    pub below_left: f32,
    /// next row, same column
    pub below: f32,
}

// Key levels on a 0-255 scale with their (right, below_left, below) coefficients.
// Levels above 127 mirror onto this half.
const KEY_LEVELS: [(u8, [u32; 3]); 9] = [
    (0, [13, 0, 5]),
    (44, [177, 120, 95]),
    (64, [11, 10, 0]),
    (85, [4, 1, 1]),
    (95, [5, 3, 2]),
    (102, [5, 3, 2]),
    (107, [5, 3, 2]),
    (112, [65, 32, 23]),
    (127, [4, 1, 1]),
];

fn normalized(coeffs: &[u32; 3]) -> [f32; 3] {
    let sum = (coeffs[0] + coeffs[1] + coeffs[2]) as f32;
    [
        coeffs[0] as f32 / sum,
        coeffs[1] as f32 / sum,
        coeffs[2] as f32 / sum,
    ]
}

/// Diffusion weights for an input intensity in `[0, 1]`.
pub fn get_diffusion(value: f32) -> Diffusion {
    let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    let level = value.min(1.0 - value) * 255.0;

    let segment = KEY_LEVELS
        .windows(2)
        .find(|w| level < w[1].0 as f32)
        .unwrap_or(&KEY_LEVELS[KEY_LEVELS.len() - 2..]);
    let (lo_level, lo) = (segment[0].0 as f32, normalized(&segment[0].1));
    let (hi_level, hi) = (segment[1].0 as f32, normalized(&segment[1].1));
    let t = ((level - lo_level) / (hi_level - lo_level)).clamp(0.0, 1.0);

    let below_left = lo[1] + (hi[1] - lo[1]) * t;
    let below = lo[2] + (hi[2] - lo[2]) * t;
    Diffusion {
        right: 1.0 - below_left - below,
        below_left,
        below,
    }
}

// Quantizes one pixel and spreads its residual with the weights of `original_value`.
// `dir` is the horizontal step of the current row.
fn diffuse_pixel<T>(img: &mut T, original_value: f32, x: i32, y: i32, dir: i32)
where
    T: GrayImage + ?Sized,
{
    let value = img.get(x, y);
    let quantized = quantize(value);
    img.set(x, y, quantized);

    let err = value - quantized;
    let diffusion = get_diffusion(original_value);
    spread_error(img, x + dir, y, err, diffusion.right);
    spread_error(img, x - dir, y + 1, err, diffusion.below_left);
    spread_error(img, x, y + 1, err, diffusion.below);
}

/// Error diffusion whose weights follow the original intensity of each pixel.
pub fn diffuse_ostromoukhov<T: GrayImage + ?Sized>(img: &mut T, scan_mode: ScanMode) {
    let t_start = std::time::Instant::now();
    let original = ImageBuffer::from_image(&*img);

    scan(img, scan_mode, |img, x, y, dir| {
        diffuse_pixel(img, original.get(x, y), x, y, dir)
    });

    debug!(
        "Ostromoukhov diffusion ({:?}) of {:?} done in {:?}",
        scan_mode,
        img.size(),
        t_start.elapsed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        for i in 0..=1000 {
            let d = get_diffusion(i as f32 / 1000.0);
            assert!((d.right + d.below_left + d.below - 1.0).abs() < 1e-6, "{:?}", d);
            assert!(d.right >= 0.0 && d.below_left >= -1e-6 && d.below >= -1e-6, "{:?}", d);
        }
    }

    #[test]
    fn test_key_levels() {
        let d = get_diffusion(0.0);
        assert!((d.right - 13.0 / 18.0).abs() < 1e-6);
        assert_eq!(d.below_left, 0.0);
        assert!((d.below - 5.0 / 18.0).abs() < 1e-6);

        let d = get_diffusion(64.0 / 255.0);
        assert!((d.below_left - 10.0 / 21.0).abs() < 1e-5);
        assert!(d.below.abs() < 1e-5);

        // mid-gray sits past the last key level
        let d = get_diffusion(0.5);
        assert!((d.right - 4.0 / 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_symmetric_around_half() {
        for v in [0.05, 0.2, 0.31, 0.44] {
            let (a, b) = (get_diffusion(v), get_diffusion(1.0 - v));
            assert!((a.below_left - b.below_left).abs() < 1e-5);
            assert!((a.below - b.below).abs() < 1e-5);
        }
    }

    #[test]
    fn test_interpolates_between_key_levels() {
        let lo = get_diffusion(95.0 / 255.0);
        let hi = get_diffusion(85.0 / 255.0);
        let mid = get_diffusion(90.0 / 255.0);
        assert!((mid.below - (lo.below + hi.below) / 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_out_of_range_input() {
        assert_eq!(get_diffusion(-2.0), get_diffusion(0.0));
        assert_eq!(get_diffusion(3.0), get_diffusion(0.0));
        assert_eq!(get_diffusion(f32::NAN), get_diffusion(0.0));
    }

    #[test]
    fn test_diffuse_binary_and_tone() {
        for scan_mode in [ScanMode::Raster, ScanMode::Serpentine] {
            let mut img = ImageBuffer::filled(32, 32, 0.25);
            diffuse_ostromoukhov(&mut img, scan_mode);
            assert!(img.data().iter().all(|v| *v == 0.0 || *v == 1.0));
            let ones = img.data().iter().filter(|v| **v == 1.0).count() as f32;
            assert!((ones - 256.0).abs() <= 96.0, "{} ones", ones);
        }
    }

    #[test]
    fn test_error_targets() {
        let d = get_diffusion(0.25);
        let err = 0.25;

        // raster: row 1 runs left to right
        let mut img = ImageBuffer::filled(3, 3, 0.0);
        img.set(1, 1, 0.25);
        diffuse_pixel(&mut img, 0.25, 1, 1, ScanMode::Raster.direction(1));
        #[rustfmt::skip]
        let expected = [
            0.0, 0.0, 0.0,
            0.0, 0.0, err * d.right,
            err * d.below_left, err * d.below, 0.0,
        ];
        assert_eq!(img.data(), &expected);

        // serpentine: row 1 runs right to left, so the targets mirror
        let mut img = ImageBuffer::filled(3, 3, 0.0);
        img.set(1, 1, 0.25);
        diffuse_pixel(&mut img, 0.25, 1, 1, ScanMode::Serpentine.direction(1));
        #[rustfmt::skip]
        let expected = [
            0.0, 0.0, 0.0,
            err * d.right, 0.0, 0.0,
            0.0, err * d.below, err * d.below_left,
        ];
        assert_eq!(img.data(), &expected);
    }

    #[test]
    fn test_error_targets_dropped_at_edges() {
        let d = get_diffusion(0.25);
        let err = 0.25;

        // serpentine row 1 ends at the left edge: the right target falls outside
        let mut img = ImageBuffer::filled(3, 3, 0.0);
        img.set(0, 1, 0.25);
        diffuse_pixel(&mut img, 0.25, 0, 1, ScanMode::Serpentine.direction(1));
        #[rustfmt::skip]
        let expected = [
            0.0, 0.0, 0.0,
            0.0, 0.0, 0.0,
            err * d.below, err * d.below_left, 0.0,
        ];
        assert_eq!(img.data(), &expected);

        // raster at the left edge: below_left falls outside
        let mut img = ImageBuffer::filled(3, 3, 0.0);
        img.set(0, 1, 0.25);
        diffuse_pixel(&mut img, 0.25, 0, 1, ScanMode::Raster.direction(1));
        #[rustfmt::skip]
        let expected = [
            0.0, 0.0, 0.0,
            0.0, err * d.right, 0.0,
            err * d.below, 0.0, 0.0,
        ];
        assert_eq!(img.data(), &expected);

        // last row: only the right target is left
        let mut img = ImageBuffer::filled(3, 3, 0.0);
        img.set(1, 2, 0.25);
        diffuse_pixel(&mut img, 0.25, 1, 2, ScanMode::Raster.direction(2));
        assert_eq!(img.get(2, 2), err * d.right);
        assert_eq!(img.data().iter().filter(|v| **v != 0.0).count(), 1);
    }

    #[test]
    fn test_uses_original_intensity() {
        // a pixel that already received error still uses its own original weights
        let d = get_diffusion(0.0);
        let mut img = ImageBuffer::filled(2, 2, 0.0);
        img.set(0, 0, 0.3);
        diffuse_pixel(&mut img, 0.0, 0, 0, 1);
        assert_eq!(img.get(1, 0), 0.3 * d.right);
        assert_eq!(img.get(0, 1), 0.3 * d.below);
    }

    #[test]
    fn test_extremes_are_flat() {
        let mut img = ImageBuffer::filled(8, 8, 1.0);
        diffuse_ostromoukhov(&mut img, ScanMode::Serpentine);
        assert!(img.data().iter().all(|v| *v == 1.0));

        let mut img = ImageBuffer::filled(8, 8, 0.0);
        diffuse_ostromoukhov(&mut img, ScanMode::Raster);
        assert!(img.data().iter().all(|v| *v == 0.0));
    }
}
