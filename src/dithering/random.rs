use rand::Rng;

use crate::image::GrayImage;

/// Thresholds every pixel against its own uniform draw, so a pixel of intensity `v`
/// turns white with probability `v`.
pub fn dither_random<T: GrayImage + ?Sized>(img: &mut T) {
    dither_random_with(img, &mut rand::rng());
}

pub fn dither_random_with<T, R>(img: &mut T, rng: &mut R)
where
    T: GrayImage + ?Sized,
    R: Rng,
{
    for y in 0..img.height() {
        for px in img.mut_row(y).iter_mut() {
            let threshold: f32 = rng.random();
            *px = if *px > threshold { 1.0 } else { 0.0 };
        }
    }
}
