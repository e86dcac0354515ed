#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl<T> From<(T, T)> for Point
where
    T: Into<i32>,
{
    fn from(value: (T, T)) -> Self {
        Point {
            x: value.0.into(),
            y: value.1.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl<T> From<(T, T)> for Size
where
    T: Into<i32>,
{
    fn from(value: (T, T)) -> Self {
        Size {
            width: value.0.into(),
            height: value.1.into(),
        }
    }
}

impl Size {
    pub fn area(&self) -> usize {
        (self.width.max(0) as usize) * (self.height.max(0) as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= 0 && pt.x < self.width && pt.y >= 0 && pt.y < self.height
    }
}

/// Layout of a row-major grayscale raster. `pitch` is counted in pixels, not bytes.
#[derive(Clone, Copy, Debug)]
pub struct ImageHeader {
    width: i32,
    pitch: i32,
    height: i32,
}

impl ImageHeader {
    pub fn new(data_len: usize, width: i32, height: i32, pitch: Option<i32>) -> Self {
        let pitch = pitch.unwrap_or(width);
        assert!(
            pitch >= width,
            "invalid pitch {} for width {}",
            pitch,
            width
        );
        assert!(
            width >= 0 && height >= 0,
            "invalid width {} and height {}",
            width,
            height
        );
        // the last row does not need to be padded up to the pitch
        let required_len = if width == 0 || height == 0 {
            0
        } else {
            ((height - 1) * pitch + width) as usize
        };
        assert!(
            data_len >= required_len,
            "invalid data len {} for height {} and pitch {}",
            data_len,
            height,
            pitch
        );
        ImageHeader {
            width,
            pitch,
            height,
        }
    }

    fn offset(&self, x: i32, y: i32) -> usize {
        assert!(
            x >= 0 && x < self.width && y >= 0 && y < self.height,
            "pixel ({}, {}) out of bounds for {}x{} image",
            x,
            y,
            self.width,
            self.height
        );
        (y * self.pitch + x) as usize
    }
}

pub trait HasImageHeader {
    fn header(&self) -> ImageHeader;
}

/// Read access to a grayscale raster of normalized `f32` intensities.
pub trait ConstGrayImage: HasImageHeader {
    fn data(&self) -> &[f32];

    fn width(&self) -> i32 {
        self.header().width
    }
    fn height(&self) -> i32 {
        self.header().height
    }
    fn pitch(&self) -> i32 {
        self.header().pitch
    }
    fn size(&self) -> Size {
        (self.width(), self.height()).into()
    }
    fn get(&self, x: i32, y: i32) -> f32 {
        self.data()[self.header().offset(x, y)]
    }
    fn row(&self, y: i32) -> &[f32] {
        assert!(y >= 0 && y < self.height(), "row {} out of bounds", y);
        let start = (y * self.pitch()) as usize;
        &self.data()[start..start + self.width() as usize]
    }
}

pub trait GrayImage: ConstGrayImage {
    fn mut_data(&mut self) -> &mut [f32];

    fn set(&mut self, x: i32, y: i32, val: f32) {
        let offset = self.header().offset(x, y);
        self.mut_data()[offset] = val;
    }
    fn mut_row(&mut self, y: i32) -> &mut [f32] {
        assert!(y >= 0 && y < self.height(), "row {} out of bounds", y);
        let start = (y * self.pitch()) as usize;
        let width = self.width() as usize;
        &mut self.mut_data()[start..start + width]
    }
    fn copy_from<T: ConstGrayImage + ?Sized>(&mut self, src: &T) {
        assert_eq!(self.size(), src.size());
        for y in 0..self.height() {
            self.mut_row(y).copy_from_slice(src.row(y));
        }
    }
    fn fill(&mut self, val: f32) {
        for y in 0..self.height() {
            self.mut_row(y).fill(val);
        }
    }
}

pub struct ConstImageView<'a> {
    header: ImageHeader,
    data: &'a [f32],
}

impl<'a> ConstImageView<'a> {
    pub fn new(data: &'a [f32], width: i32, height: i32, pitch: Option<i32>) -> Self {
        let header = ImageHeader::new(data.len(), width, height, pitch);
        ConstImageView { header, data }
    }
}

impl<'a> HasImageHeader for ConstImageView<'a> {
    fn header(&self) -> ImageHeader {
        self.header
    }
}

impl<'a> ConstGrayImage for ConstImageView<'a> {
    fn data(&self) -> &[f32] {
        self.data
    }
}

pub struct ImageView<'a> {
    header: ImageHeader,
    data: &'a mut [f32],
}

impl<'a> ImageView<'a> {
    pub fn new(data: &'a mut [f32], width: i32, height: i32, pitch: Option<i32>) -> Self {
        let header = ImageHeader::new(data.len(), width, height, pitch);
        ImageView { header, data }
    }
}

impl<'a> HasImageHeader for ImageView<'a> {
    fn header(&self) -> ImageHeader {
        self.header
    }
}

impl<'a> ConstGrayImage for ImageView<'a> {
    fn data(&self) -> &[f32] {
        self.data
    }
}

impl<'a> GrayImage for ImageView<'a> {
    fn mut_data(&mut self) -> &mut [f32] {
        self.data
    }
}

#[derive(Clone, Debug)]
pub struct ImageBuffer {
    data: Vec<f32>,
    header: ImageHeader,
}

impl ImageBuffer {
    pub fn new(width: i32, height: i32, pitch: Option<i32>) -> Self {
        let pitch = pitch.unwrap_or(width);
        let data = vec![0.0; (pitch.max(0) * height.max(0)) as usize];
        let header = ImageHeader::new(data.len(), width, height, Some(pitch));
        Self { data, header }
    }

    pub fn filled(width: i32, height: i32, val: f32) -> Self {
        let mut buf = Self::new(width, height, None);
        buf.fill(val);
        buf
    }

    pub fn from_fn(width: i32, height: i32, f: impl Fn(i32, i32) -> f32) -> Self {
        let mut buf = Self::new(width, height, None);
        for y in 0..height {
            for x in 0..width {
                buf.set(x, y, f(x, y));
            }
        }
        buf
    }

    /// Copies any gray image into a new, continuous buffer.
    pub fn from_image<T: ConstGrayImage + ?Sized>(src: &T) -> Self {
        let mut buf = Self::new(src.width(), src.height(), None);
        buf.copy_from(src);
        buf
    }
}

impl HasImageHeader for ImageBuffer {
    fn header(&self) -> ImageHeader {
        self.header
    }
}

impl ConstGrayImage for ImageBuffer {
    fn data(&self) -> &[f32] {
        self.data.as_slice()
    }
}

impl GrayImage for ImageBuffer {
    fn mut_data(&mut self) -> &mut [f32] {
        self.data.as_mut_slice()
    }
}


pub mod convert;
