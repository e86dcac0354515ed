//! Direct binary search: local refinement of a binary image so that its blurred
//! version (through a model of the human visual system) matches the blurred original.

use log::debug;
use rand::Rng;

use super::random::dither_random_with;
use crate::image::{ConstGrayImage, GrayImage, ImageBuffer, Point, Size};
use crate::kernel::{build_hvs_kernel, Grid};

/// Side of the square blocks whose staleness is tracked.
pub const CELL_SIZE: i32 = 16;
pub const DEFAULT_HVS_RADIUS: i32 = 7;

// a cell that failed this many consecutive visits is never visited again
const FROZEN: u8 = 2;
// improvements smaller than this are float noise
const MIN_IMPROVEMENT: f64 = 1e-9;

const NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DbsOptions {
    pub hvs_radius: i32,
    /// Upper bound of the search, in full passes over the cell grid.
    pub max_passes: u32,
}

impl Default for DbsOptions {
    fn default() -> Self {
        DbsOptions {
            hvs_radius: DEFAULT_HVS_RADIUS,
            max_passes: 64,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DbsStats {
    pub cell_visits: u64,
    pub accepted_moves: u64,
    /// false if the search stopped at `max_passes` instead of a full pass without change
    pub converged: bool,
}

// HVS kernel centred on a pixel, clipped to the image.
struct Footprint {
    kernel: Grid<f32>,
    radius: i32,
}

impl Footprint {
    fn new(kernel: Grid<f32>) -> Self {
        assert!(
            kernel.width() == kernel.height() && kernel.width() % 2 == 1,
            "hvs kernel must be square with odd side, got {:?}",
            kernel.size()
        );
        let radius = kernel.width() / 2;
        Footprint { kernel, radius }
    }

    fn weight(&self, dx: i32, dy: i32) -> f64 {
        if dx.abs() > self.radius || dy.abs() > self.radius {
            return 0.0;
        }
        self.kernel.get(dx + self.radius, dy + self.radius) as f64
    }

    // Visits the in-bounds positions within kernel reach of `a` or `b`.
    fn for_each_near(&self, size: Size, a: Point, b: Point, mut f: impl FnMut(Point)) {
        let x0 = (a.x.min(b.x) - self.radius).max(0);
        let x1 = (a.x.max(b.x) + self.radius).min(size.width - 1);
        let y0 = (a.y.min(b.y) - self.radius).max(0);
        let y1 = (a.y.max(b.y) + self.radius).min(size.height - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                f(Point { x, y });
            }
        }
    }

    fn convolve<T: ConstGrayImage + ?Sized>(&self, img: &T) -> Grid<f64> {
        let mut out = Grid::new(img.size());
        for y in 0..img.height() {
            for x in 0..img.width() {
                let val = img.get(x, y) as f64;
                if val == 0.0 {
                    continue;
                }
                let pos = Point { x, y };
                self.for_each_near(img.size(), pos, pos, |q| {
                    let acc = out.get(q.x, q.y) + val * self.weight(q.x - x, q.y - y);
                    out.set(q.x, q.y, acc);
                });
            }
        }
        out
    }
}

/// Blurred original and blurred binary image.
///
/// `estimate` always equals the convolution of the binary image with the HVS kernel;
/// every change of the binary image has to go through `apply_delta` or `apply_swap`.
pub struct CostField {
    hvs: Footprint,
    target: Grid<f64>,
    estimate: Grid<f64>,
}

impl CostField {
    pub fn new<O, B>(original: &O, binary: &B, kernel: Grid<f32>) -> Self
    where
        O: ConstGrayImage + ?Sized,
        B: ConstGrayImage + ?Sized,
    {
        assert_eq!(original.size(), binary.size());
        let hvs = Footprint::new(kernel);
        let target = hvs.convolve(original);
        let estimate = hvs.convolve(binary);
        CostField {
            hvs,
            target,
            estimate,
        }
    }

    fn size(&self) -> Size {
        self.target.size()
    }

    fn error_at(&self, q: Point) -> f64 {
        self.estimate.get(q.x, q.y) - self.target.get(q.x, q.y)
    }

    /// Sum of squared differences between `estimate` and `target`.
    pub fn total_error(&self) -> f64 {
        self.estimate
            .data()
            .iter()
            .zip(self.target.data())
            .map(|(e, t)| (e - t) * (e - t))
            .sum()
    }

    /// Change of the total error if the pixel at `pos` changed by `delta`.
    pub fn flip_gain(&self, pos: Point, delta: f32) -> f64 {
        let delta = delta as f64;
        let mut gain = 0.0;
        self.hvs.for_each_near(self.size(), pos, pos, |q| {
            let d = delta * self.hvs.weight(q.x - pos.x, q.y - pos.y);
            gain += d * (2.0 * self.error_at(q) + d);
        });
        gain
    }

    /// Change of the total error if `a` changed by `delta_a` and `b` by `-delta_a`.
    pub fn swap_gain(&self, a: Point, b: Point, delta_a: f32) -> f64 {
        let delta_a = delta_a as f64;
        let mut gain = 0.0;
        self.hvs.for_each_near(self.size(), a, b, |q| {
            let d = delta_a
                * (self.hvs.weight(q.x - a.x, q.y - a.y) - self.hvs.weight(q.x - b.x, q.y - b.y));
            gain += d * (2.0 * self.error_at(q) + d);
        });
        gain
    }

    /// Adds `delta` to the pixel at `pos` and to its footprint in `estimate`.
    pub fn apply_delta<T: GrayImage + ?Sized>(&mut self, img: &mut T, pos: Point, delta: f32) {
        img.set(pos.x, pos.y, img.get(pos.x, pos.y) + delta);

        let size = self.size();
        let (hvs, estimate) = (&self.hvs, &mut self.estimate);
        hvs.for_each_near(size, pos, pos, |q| {
            let acc = estimate.get(q.x, q.y) + delta as f64 * hvs.weight(q.x - pos.x, q.y - pos.y);
            estimate.set(q.x, q.y, acc);
        });
    }

    /// Exchanges the pixels at `a` and `b`.
    pub fn apply_swap<T: GrayImage + ?Sized>(&mut self, img: &mut T, a: Point, b: Point) {
        let delta_a = img.get(b.x, b.y) - img.get(a.x, a.y);
        self.apply_delta(img, a, delta_a);
        self.apply_delta(img, b, -delta_a);
    }
}

struct CellGrid {
    cols: i32,
    size: Size,
    stale: Vec<u8>,
}

impl CellGrid {
    fn new(size: Size) -> Self {
        let cols = (size.width + CELL_SIZE - 1) / CELL_SIZE;
        let rows = (size.height + CELL_SIZE - 1) / CELL_SIZE;
        CellGrid {
            cols,
            size,
            stale: vec![0; (cols * rows).max(0) as usize],
        }
    }

    fn len(&self) -> usize {
        self.stale.len()
    }

    fn is_frozen(&self, idx: usize) -> bool {
        self.stale[idx] >= FROZEN
    }

    fn mark_stale(&mut self, idx: usize) {
        self.stale[idx] = (self.stale[idx] + 1).min(FROZEN);
    }

    fn reset(&mut self, idx: usize) {
        self.stale[idx] = 0;
    }

    /// Pixel range `[start, end)` covered by the cell.
    fn bounds(&self, idx: usize) -> (Point, Point) {
        let (cx, cy) = (idx as i32 % self.cols, idx as i32 / self.cols);
        let start = Point {
            x: cx * CELL_SIZE,
            y: cy * CELL_SIZE,
        };
        let end = Point {
            x: (start.x + CELL_SIZE).min(self.size.width),
            y: (start.y + CELL_SIZE).min(self.size.height),
        };
        (start, end)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Move {
    Flip,
    Swap(Point),
}

// Best strictly improving move for the pixel at `pos`, with its gain.
fn best_move<T: ConstGrayImage + ?Sized>(img: &T, cost: &CostField, pos: Point) -> Option<(Move, f64)> {
    let value = img.get(pos.x, pos.y);
    let mut best: Option<(Move, f64)> = None;
    let mut consider = |mv: Move, gain: f64| {
        if gain < -MIN_IMPROVEMENT && best.map_or(true, |(_, g)| gain < g) {
            best = Some((mv, gain));
        }
    };

    consider(Move::Flip, cost.flip_gain(pos, 1.0 - 2.0 * value));
    for (dx, dy) in NEIGHBORS {
        let other = Point {
            x: pos.x + dx,
            y: pos.y + dy,
        };
        if !img.size().contains(other) {
            continue;
        }
        let other_value = img.get(other.x, other.y);
        if other_value != value {
            consider(Move::Swap(other), cost.swap_gain(pos, other, other_value - value));
        }
    }
    best
}

fn apply_move<T: GrayImage + ?Sized>(img: &mut T, cost: &mut CostField, pos: Point, mv: Move) {
    match mv {
        Move::Flip => {
            let delta = 1.0 - 2.0 * img.get(pos.x, pos.y);
            cost.apply_delta(img, pos, delta);
        }
        Move::Swap(other) => cost.apply_swap(img, pos, other),
    }
}

// Tries every pixel of a cell once; returns the number of accepted moves.
fn visit_cell<T: GrayImage + ?Sized>(img: &mut T, cost: &mut CostField, cells: &CellGrid, idx: usize) -> u64 {
    let (start, end) = cells.bounds(idx);
    let mut accepted = 0;
    for y in start.y..end.y {
        for x in start.x..end.x {
            let pos = Point { x, y };
            if let Some((mv, _)) = best_move(&*img, cost, pos) {
                apply_move(img, cost, pos, mv);
                accepted += 1;
            }
        }
    }
    accepted
}

/// Refines the binary image `img` toward `original`.
pub fn refine_dbs<O, T>(original: &O, img: &mut T, options: DbsOptions) -> DbsStats
where
    O: ConstGrayImage + ?Sized,
    T: GrayImage + ?Sized,
{
    assert_eq!(original.size(), img.size());
    let mut stats = DbsStats::default();
    if img.size().is_empty() {
        stats.converged = true;
        return stats;
    }
    let t_start = std::time::Instant::now();

    let mut cost = CostField::new(original, &*img, build_hvs_kernel(options.hvs_radius));
    let mut cells = CellGrid::new(img.size());
    let max_visits = cells.len() as u64 * options.max_passes as u64;
    let initial_error = cost.total_error();

    let mut idle_visits = 0;
    let mut idx = 0;
    while idle_visits <= cells.len() {
        if stats.cell_visits >= max_visits {
            break;
        }
        stats.cell_visits += 1;

        let accepted = if cells.is_frozen(idx) {
            0
        } else {
            visit_cell(img, &mut cost, &cells, idx)
        };
        if accepted > 0 {
            cells.reset(idx);
            stats.accepted_moves += accepted;
            idle_visits = 0;
        } else {
            cells.mark_stale(idx);
            idle_visits += 1;
        }
        idx = (idx + 1) % cells.len();
    }
    stats.converged = idle_visits > cells.len();

    debug!(
        "DBS of {:?}: {:?}, error {:.4} -> {:.4}, took {:?}",
        img.size(),
        stats,
        initial_error,
        cost.total_error(),
        t_start.elapsed()
    );
    stats
}

/// Dithers the continuous image `img` in place: seeds it with random dithering,
/// then refines it against its own original content.
pub fn run_dbs<T: GrayImage + ?Sized>(img: &mut T) -> DbsStats {
    run_dbs_with_rng(img, &mut rand::rng(), DbsOptions::default())
}

pub fn run_dbs_with_rng<T, R>(img: &mut T, rng: &mut R, options: DbsOptions) -> DbsStats
where
    T: GrayImage + ?Sized,
    R: Rng,
{
    let original = ImageBuffer::from_image(&*img);
    dither_random_with(img, rng);
    refine_dbs(&original, img, options)
}
