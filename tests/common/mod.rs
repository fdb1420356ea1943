#![allow(dead_code)]

use geomosaic::core::scale_value;
use geomosaic::{MosaicError, MosaicResult, PyramidSource, Raster};
use ndarray::Array2;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Pyramid stub: level images are generated on demand, fetches are counted,
/// selected levels fail and images can be trimmed to force padding.
pub struct StubSource {
    pub width: usize,
    pub height: usize,
    pub tile: (usize, usize),
    pub levels: usize,
    pub failing_levels: HashSet<usize>,
    pub trim: (usize, usize),
    pub no_data: Option<f64>,
    pub fetches: AtomicUsize,
    pub releases: AtomicUsize,
}

impl StubSource {
    pub fn new(width: usize, height: usize, tile: (usize, usize), levels: usize) -> Self {
        Self {
            width,
            height,
            tile,
            levels,
            failing_levels: HashSet::new(),
            trim: (0, 0),
            no_data: None,
            fetches: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    pub fn failing_at(mut self, level: usize) -> Self {
        self.failing_levels.insert(level);
        self
    }

    /// Return level images `dx` columns and `dy` rows short of the level size
    pub fn trimmed(mut self, dx: usize, dy: usize) -> Self {
        self.trim = (dx, dy);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// Pixel value pattern shared by stubs: unique per (level, row, col)
pub fn pattern(level: usize, row: usize, col: usize) -> f32 {
    (level * 1_000_000 + row * 1000 + col) as f32
}

impl PyramidSource for StubSource {
    fn fetch_level_image(&self, level: usize) -> MosaicResult<Arc<Raster>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing_levels.contains(&level) {
            return Err(MosaicError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("truncated codestream at level {}", level),
            )));
        }
        let cols = scale_value(self.width, level).saturating_sub(self.trim.0).max(1);
        let rows = scale_value(self.height, level).saturating_sub(self.trim.1).max(1);
        Ok(Arc::new(Array2::from_shape_fn((rows, cols), |(r, c)| pattern(level, r, c))))
    }

    fn base_dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn tile_dimensions(&self) -> (usize, usize) {
        self.tile
    }

    fn level_count(&self) -> usize {
        self.levels
    }

    fn no_data_value(&self) -> Option<f64> {
        self.no_data
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
