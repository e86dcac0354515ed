use log::debug;

use super::{quantize, scan, spread_error, ScanMode};
use crate::image::GrayImage;
use crate::kernel::Kernel;

/// Error diffusion with an arbitrary kernel.
///
/// Each pixel is quantized in place and its residual is pushed to the kernel cells
/// ahead of the origin. In serpentine mode the kernel is mirrored on right-to-left rows.
pub fn diffuse<T: GrayImage + ?Sized>(img: &mut T, kernel: &Kernel, scan_mode: ScanMode) {
    let t_start = std::time::Instant::now();
    let taps = kernel.forward_taps();

    scan(img, scan_mode, |img, x, y, dir| {
        let value = img.get(x, y);
        let quantized = quantize(value);
        img.set(x, y, quantized);

        let err = value - quantized;
        for tap in taps.iter() {
            spread_error(img, x + tap.dx * dir, y + tap.dy, err, tap.weight);
        }
    });

    debug!(
        "Error diffusion ({} taps, {:?}) of {:?} done in {:?}",
        taps.len(),
        scan_mode,
        img.size(),
        t_start.elapsed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ConstGrayImage, ImageBuffer};
    use crate::kernel::{DiffusionKernel, Grid};

    fn assert_binary(img: &ImageBuffer) {
        assert!(img.data().iter().all(|v| *v == 0.0 || *v == 1.0));
    }

    #[test]
    fn test_two_tap_checkerboard() {
        let kernel = Kernel::from_weights(Grid::from_vec(
            (2, 2).into(),
            vec![1.0, 0.5, 0.5, 0.0],
        ));
        assert_eq!(kernel.origin, (0, 0).into());

        let mut img = ImageBuffer::filled(4, 4, 0.5);
        diffuse(&mut img, &kernel, ScanMode::Raster);
        #[rustfmt::skip]
        let expected = [
            1.0, 0.0, 1.0, 0.0,
            0.0, 1.0, 0.0, 1.0,
            1.0, 0.0, 1.0, 0.0,
            0.0, 1.0, 0.0, 1.0,
        ];
        assert_eq!(img.data(), &expected);
    }

    #[test]
    fn test_binary_output() {
        for kernel in [
            DiffusionKernel::FloydSteinberg,
            DiffusionKernel::JarvisJudiceNinke,
            DiffusionKernel::Atkinson,
        ] {
            for scan_mode in [ScanMode::Raster, ScanMode::Serpentine] {
                let mut img = ImageBuffer::from_fn(23, 17, |x, y| ((x * 7 + y * 3) % 29) as f32 / 28.0);
                diffuse(&mut img, &kernel.kernel(), scan_mode);
                assert_binary(&img);
            }
        }
    }

    #[test]
    fn test_energy_conservation() {
        let (w, h) = (16, 16);
        // the residual lost per pixel is bounded by 1
        let tolerance = (w + 2 * h) as f32;
        for tone in [0.3, 0.5, 0.8] {
            for scan_mode in [ScanMode::Raster, ScanMode::Serpentine] {
                let mut img = ImageBuffer::filled(w, h, tone);
                diffuse(&mut img, &Kernel::floyd_steinberg(), scan_mode);
                let sum: f32 = img.data().iter().sum();
                let expected = tone * (w * h) as f32;
                assert!(
                    (sum - expected).abs() <= tolerance,
                    "tone {} {:?}: {} vs {}",
                    tone,
                    scan_mode,
                    sum,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_serpentine_mirrors_kernel() {
        // everything goes to the right neighbour; on odd rows that is x - 1
        let kernel = Kernel::with_origin(Grid::from_vec((2, 1).into(), vec![0.0, 1.0]), (0, 0).into());
        let mut img = ImageBuffer::from_fn(3, 2, |x, _| if x == 0 { 0.7 } else { 0.3 });
        diffuse(&mut img, &kernel, ScanMode::Serpentine);
        // row 0: 0.7 -> 1, 0.3 - 0.3 -> 0, 0.3 -> 0
        assert_eq!(img.row(0), &[1.0, 0.0, 0.0]);
        // row 1 starts at x = 2: 0.3 -> 0, 0.3 + 0.3 -> 1, 0.7 - 0.4 -> 0
        assert_eq!(img.row(1), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_degenerate_kernel_thresholds() {
        let kernel = Kernel::from_weights(Grid::from_vec((3, 3).into(), vec![0.0; 9]));
        let mut img = ImageBuffer::from_fn(4, 3, |x, _| x as f32 / 3.0);
        diffuse(&mut img, &kernel, ScanMode::Serpentine);
        for y in 0..3 {
            assert_eq!(img.row(y), &[0.0, 0.0, 1.0, 1.0]);
        }
    }

    #[test]
    fn test_empty_image() {
        let mut img = ImageBuffer::new(0, 0, None);
        diffuse(&mut img, &Kernel::floyd_steinberg(), ScanMode::Raster);
        assert!(img.data().is_empty());
    }
}
