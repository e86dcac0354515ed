use std::f32::consts::PI;

use crate::image::{Point, Size};

/// Row-major grid of coefficients, indexed by `(x, y)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    size: Size,
    data: Vec<T>,
}

impl<T: Copy + Default> Grid<T> {
    pub fn new(size: Size) -> Self {
        Grid {
            size,
            data: vec![T::default(); size.area()],
        }
    }

    pub fn from_vec(size: Size, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            size.area(),
            "grid data does not match size {:?}",
            size
        );
        Grid { size, data }
    }

    pub fn size(&self) -> Size {
        self.size
    }
    pub fn width(&self) -> i32 {
        self.size.width
    }
    pub fn height(&self) -> i32 {
        self.size.height
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn data(&self) -> &[T] {
        &self.data
    }

    fn index(&self, x: i32, y: i32) -> usize {
        assert!(
            self.size.contains((x, y).into()),
            "cell ({}, {}) out of bounds for grid {:?}",
            x,
            y,
            self.size
        );
        (y * self.size.width + x) as usize
    }

    pub fn get(&self, x: i32, y: i32) -> T {
        self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: i32, y: i32, val: T) {
        let idx = self.index(x, y);
        self.data[idx] = val;
    }

    /// Samples the grid as if it were tiled infinitely in both directions.
    pub fn get_wrapped(&self, x: i32, y: i32) -> T {
        self.get(x.rem_euclid(self.size.width), y.rem_euclid(self.size.height))
    }
}

/// Error diffusion kernel. `origin` marks the cell of the pixel being quantized;
/// every other non-zero cell is a propagation weight relative to it.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    pub weights: Grid<f32>,
    pub origin: Point,
}

/// A single propagation target, relative to the pixel being quantized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tap {
    pub dx: i32,
    pub dy: i32,
    pub weight: f32,
}

impl Kernel {
    pub fn with_origin(weights: Grid<f32>, origin: Point) -> Self {
        assert!(
            weights.is_empty() || weights.size().contains(origin),
            "kernel origin {:?} outside of {:?}",
            origin,
            weights.size()
        );
        Kernel { weights, origin }
    }

    /// Uses the first positive cell in raster order as the origin, or the first cell
    /// if there is none.
    pub fn from_weights(weights: Grid<f32>) -> Self {
        let index = weights.data().iter().position(|w| *w > 0.0).unwrap_or(0) as i32;
        let width = weights.width().max(1);
        let origin = (index % width, index / width).into();
        Self::with_origin(weights, origin)
    }

    fn from_table(width: i32, height: i32, origin: (i32, i32), table: &[u8], divisor: f32) -> Self {
        let weights = table.iter().map(|w| *w as f32 / divisor).collect();
        Self::with_origin(Grid::from_vec((width, height).into(), weights), origin.into())
    }

    pub fn floyd_steinberg() -> Self {
        #[rustfmt::skip]
        let table = [
            0, 0, 7,
            3, 5, 1,
        ];
        Self::from_table(3, 2, (1, 0), &table, 16.0)
    }

    pub fn jarvis_judice_ninke() -> Self {
        #[rustfmt::skip]
        let table = [
            0, 0, 0, 7, 5,
            3, 5, 7, 5, 3,
            1, 3, 5, 3, 1,
        ];
        Self::from_table(5, 3, (2, 0), &table, 48.0)
    }

    pub fn stucki() -> Self {
        #[rustfmt::skip]
        let table = [
            0, 0, 0, 8, 4,
            2, 4, 8, 4, 2,
            1, 2, 4, 2, 1,
        ];
        Self::from_table(5, 3, (2, 0), &table, 42.0)
    }

    // deliberately loses 1/4 of the error
    pub fn atkinson() -> Self {
        #[rustfmt::skip]
        let table = [
            0, 0, 1, 1,
            1, 1, 1, 0,
            0, 1, 0, 0,
        ];
        Self::from_table(4, 3, (1, 0), &table, 8.0)
    }

    pub fn sierra() -> Self {
        #[rustfmt::skip]
        let table = [
            0, 0, 0, 5, 3,
            2, 4, 5, 4, 2,
            0, 2, 3, 2, 0,
        ];
        Self::from_table(5, 3, (2, 0), &table, 32.0)
    }

    pub fn sierra_lite() -> Self {
        #[rustfmt::skip]
        let table = [
            0, 0, 2,
            1, 1, 0,
        ];
        Self::from_table(3, 2, (1, 0), &table, 4.0)
    }

    /// Non-zero cells strictly after the origin in raster order.
    /// Cells before the origin would point at pixels that were already quantized.
    pub fn forward_taps(&self) -> Vec<Tap> {
        let mut taps = Vec::new();
        for ky in 0..self.weights.height() {
            for kx in 0..self.weights.width() {
                let weight = self.weights.get(kx, ky);
                let (dx, dy) = (kx - self.origin.x, ky - self.origin.y);
                if weight != 0.0 && (dy > 0 || (dy == 0 && dx > 0)) {
                    taps.push(Tap { dx, dy, weight });
                }
            }
        }
        taps
    }
}

#[derive(Clone, Copy, Debug, PartialEq, clap::ValueEnum)]
pub enum DiffusionKernel {
    FloydSteinberg,
    JarvisJudiceNinke,
    Stucki,
    Atkinson,
    Sierra,
    SierraLite,
}

impl DiffusionKernel {
    pub fn kernel(&self) -> Kernel {
        match self {
            Self::FloydSteinberg => Kernel::floyd_steinberg(),
            Self::JarvisJudiceNinke => Kernel::jarvis_judice_ninke(),
            Self::Stucki => Kernel::stucki(),
            Self::Atkinson => Kernel::atkinson(),
            Self::Sierra => Kernel::sierra(),
            Self::SierraLite => Kernel::sierra_lite(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FloydSteinberg => "floyd_steinberg",
            Self::JarvisJudiceNinke => "jarvis_judice_ninke",
            Self::Stucki => "stucki",
            Self::Atkinson => "atkinson",
            Self::Sierra => "sierra",
            Self::SierraLite => "sierra_lite",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::FloydSteinberg,
            Self::JarvisJudiceNinke,
            Self::Stucki,
            Self::Atkinson,
            Self::Sierra,
            Self::SierraLite,
        ]
        .into_iter()
        .find(|k| k.name() == name)
    }
}

// 2x2 Bayer ranks, indexed by [y][x]. Each bit plane of the coordinates picks one
// of these, least significant plane first.
const BAYER_2X2: [[u32; 2]; 2] = [[0, 2], [3, 1]];

fn bayer_rank(x: u32, y: u32, bits: u32) -> u32 {
    (0..bits).fold(0, |rank, bit| {
        let plane = BAYER_2X2[((y >> bit) & 1) as usize][((x >> bit) & 1) as usize];
        rank | (plane << (2 * (bits - 1 - bit)))
    })
}

/// Bayer threshold matrix. The ranks come from the smallest power-of-two matrix
/// covering `size`, mapped to `(rank + 1) / (N² + 1)` so no threshold is 0 or 1.
pub fn build_bayer(size: Size) -> Grid<f32> {
    let mut grid = Grid::new(size);
    if size.is_empty() {
        return grid;
    }

    let n = (size.width.max(size.height) as u32).next_power_of_two();
    let bits = n.trailing_zeros();
    let levels = (n * n) as f32 + 1.0;
    for y in 0..size.height {
        for x in 0..size.width {
            let rank = bayer_rank(x as u32, y as u32, bits);
            grid.set(x, y, (rank + 1) as f32 / levels);
        }
    }
    grid
}

/// Clustered-dot screen of `2 * size`.
///
/// The four `size` quadrants form a checkerboard: the "paper" quadrants (top-left,
/// bottom-right) hold even ranks growing from the cell centre, the "ink" quadrants
/// hold odd ranks shrinking toward it. As the tone rises, white dots grow out of the
/// paper centres while the black dots contract onto the ink centres.
pub fn build_halftone_dot(size: Size) -> Grid<f32> {
    let out_size: Size = (size.width.max(0) * 2, size.height.max(0) * 2).into();
    let mut grid = Grid::new(out_size);
    if size.is_empty() {
        return grid;
    }

    let (w, h) = (size.width, size.height);
    let mut cells: Vec<(f32, usize)> = (0..size.area())
        .map(|i| {
            let dx = ((i as i32 % w) as f32 + 0.5) / w as f32 - 0.5;
            let dy = ((i as i32 / w) as f32 + 0.5) / h as f32 - 0.5;
            let r = -(PI * (dx - dy)).cos() - (PI * (dx + dy)).cos();
            (r, i)
        })
        .collect();
    // equal distances keep raster order
    cells.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let n = cells.len();
    let levels = (2 * n + 1) as f32;
    for (order, (_, i)) in cells.into_iter().enumerate() {
        let (x, y) = (i as i32 % w, i as i32 / w);
        let paper = (2 * order + 1) as f32 / levels;
        let ink = (2 * n - 2 * order) as f32 / levels;
        grid.set(x, y, paper);
        grid.set(x + w, y + h, paper);
        grid.set(x + w, y, ink);
        grid.set(x, y + h, ink);
    }
    grid
}

/// Human visual system weighting: two isotropic Gaussians (sigma 1.6 and 0.6 cells)
/// over a `(2 * radius + 1)²` window, normalized to sum 1.
pub fn build_hvs_kernel(radius: i32) -> Grid<f32> {
    assert!(radius >= 0, "invalid hvs kernel radius {}", radius);

    let side = 2 * radius + 1;
    let gaussian = |d2: f32, sigma: f32| (-d2 / (2.0 * sigma * sigma)).exp();
    let weights: Vec<f32> = (0..side * side)
        .map(|i| {
            let (dx, dy) = ((i % side - radius) as f32, (i / side - radius) as f32);
            let d2 = dx * dx + dy * dy;
            gaussian(d2, 1.6) + gaussian(d2, 0.6)
        })
        .collect();
    let sum: f32 = weights.iter().sum();
    Grid::from_vec(
        (side, side).into(),
        weights.into_iter().map(|w| w / sum).collect(),
    )
}
