//! Overlay compositing and border padding of level rasters.

use crate::types::{MosaicError, MosaicResult, Rectangle};
use ndarray::{s, Array2, ArrayView2, Zip};
use num_traits::Float;

/// A raster placed at a pixel offset in the level coordinate space
#[derive(Debug, Clone)]
pub struct PlacedTile<'a, T> {
    pub image: ArrayView2<'a, T>,
    pub x: usize,
    pub y: usize,
    /// Sentinel of the tile's own source, transparent in addition to NaN
    pub no_data: Option<T>,
}

impl<'a, T> PlacedTile<'a, T> {
    pub fn new(image: ArrayView2<'a, T>, x: usize, y: usize) -> Self {
        Self {
            image,
            x,
            y,
            no_data: None,
        }
    }

    pub fn at_origin(image: ArrayView2<'a, T>) -> Self {
        Self::new(image, 0, 0)
    }

    pub fn with_no_data(mut self, no_data: Option<T>) -> Self {
        self.no_data = no_data;
        self
    }

    pub fn bounds(&self) -> Rectangle {
        let (rows, cols) = self.image.dim();
        Rectangle::new(self.x, self.y, cols, rows)
    }
}

/// NaN is always transparent; `no_data` adds a second sentinel
pub fn is_no_data<T: Float>(value: T, no_data: Option<T>) -> bool {
    if value.is_nan() {
        return true;
    }
    match no_data {
        Some(nd) if !nd.is_nan() => value == nd,
        _ => false,
    }
}

/// Smallest origin-anchored rectangle covering every tile
pub fn composite_bounds<T>(tiles: &[PlacedTile<'_, T>]) -> Rectangle {
    tiles
        .iter()
        .map(|t| t.bounds())
        .filter(|b| !b.is_empty())
        .fold(Rectangle::sized(0, 0), |acc, b| {
            Rectangle::sized(acc.width.max(b.max_x()), acc.height.max(b.max_y()))
        })
}

/// Overlay mosaic: tiles are painted in order, later tiles winning wherever
/// they hold data. A pixel is transparent when it is NaN, equals the tile's
/// own sentinel or equals the mosaic-wide `no_data`. Pixels no tile covers
/// keep `background`.
pub fn overlay<T: Float>(
    tiles: &[PlacedTile<'_, T>],
    background: T,
    no_data: Option<T>,
) -> Array2<T> {
    let bounds = composite_bounds(tiles);
    let mut canvas = Array2::from_elem((bounds.height, bounds.width), background);

    for tile in tiles {
        let b = tile.bounds();
        if b.is_empty() {
            continue;
        }
        let mut region = canvas.slice_mut(s![b.y..b.max_y(), b.x..b.max_x()]);
        Zip::from(&mut region).and(&tile.image).for_each(|dst, &src| {
            if !is_no_data(src, tile.no_data) && !is_no_data(src, no_data) {
                *dst = src;
            }
        });
    }

    canvas
}

/// Extend `image` to `width x height` by repeating its last column and row.
///
/// An image already of the target size is returned unchanged. An image larger
/// than the target in either dimension is rejected.
pub fn pad_border_copy<T: Copy>(image: Array2<T>, width: usize, height: usize) -> MosaicResult<Array2<T>> {
    let (rows, cols) = image.dim();
    if cols > width || rows > height {
        return Err(MosaicError::InvalidArgument(format!(
            "image {}x{} exceeds padding target {}x{}",
            cols, rows, width, height
        )));
    }
    if cols == width && rows == height {
        return Ok(image);
    }
    if rows == 0 || cols == 0 {
        return Err(MosaicError::InvalidArgument(
            "cannot border-extend an empty image".to_string(),
        ));
    }

    Ok(Array2::from_shape_fn((height, width), |(r, c)| {
        image[[r.min(rows - 1), c.min(cols - 1)]]
    }))
}

/// Raster filled with a constant value
pub fn constant_tile<T: Copy>(width: usize, height: usize, value: T) -> Array2<T> {
    Array2::from_elem((height, width), value)
}
