use crate::types::{MosaicResult, Raster};
use std::sync::Arc;

/// Multi-resolution raster store backing one band.
///
/// Implemented per product format. `fetch_level_image` may block on decoding
/// and may fail; implementors own their decode cache and keep it thread-safe.
pub trait PyramidSource: Send + Sync {
    /// Full raster at `level`
    fn fetch_level_image(&self, level: usize) -> MosaicResult<Arc<Raster>>;

    /// (width, height) at level 0
    fn base_dimensions(&self) -> (usize, usize);

    /// (width, height) of a decode tile
    fn tile_dimensions(&self) -> (usize, usize);

    fn level_count(&self) -> usize;

    fn no_data_value(&self) -> Option<f64> {
        None
    }

    /// Drop decoded buffers; later fetches decode again
    fn release(&self) {}
}

impl<S: PyramidSource + ?Sized> PyramidSource for Arc<S> {
    fn fetch_level_image(&self, level: usize) -> MosaicResult<Arc<Raster>> {
        (**self).fetch_level_image(level)
    }

    fn base_dimensions(&self) -> (usize, usize) {
        (**self).base_dimensions()
    }

    fn tile_dimensions(&self) -> (usize, usize) {
        (**self).tile_dimensions()
    }

    fn level_count(&self) -> usize {
        (**self).level_count()
    }

    fn no_data_value(&self) -> Option<f64> {
        (**self).no_data_value()
    }

    fn release(&self) {
        (**self).release()
    }
}
