use super::*;

/// Builds a normalized buffer from 8-bit luma rows.
pub fn from_luma8(data: &[u8], width: i32, height: i32, pitch: Option<i32>) -> ImageBuffer {
    let pitch = pitch.unwrap_or(width);
    // validates the layout against the slice
    ImageHeader::new(data.len(), width, height, Some(pitch));

    let mut buf = ImageBuffer::new(width, height, None);
    for y in 0..height {
        let src_row = &data[(y * pitch) as usize..][..width as usize];
        for (dst, src) in buf.mut_row(y).iter_mut().zip(src_row) {
            *dst = *src as f32 / 255.0;
        }
    }
    buf
}

/// Packs a normalized buffer into continuous 8-bit luma rows, clamping out-of-range values.
pub fn to_luma8<T: ConstGrayImage + ?Sized>(image: &T) -> Vec<u8> {
    let mut packed = Vec::with_capacity(image.size().area());
    for y in 0..image.height() {
        packed.extend(
            image
                .row(y)
                .iter()
                .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8),
        );
    }
    packed
}
