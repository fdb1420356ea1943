use crate::config::MosaicConfig;
use crate::geo::AffineTransform;
use crate::types::{MosaicError, MosaicResult, Rectangle};

/// Size of `source` at pyramid level `level`, rounded up.
///
/// Computed by shifting so that results agree with pyramids produced by other
/// tools reading the same files.
pub fn scale_value(source: usize, level: usize) -> usize {
    if level >= usize::BITS as usize {
        return usize::from(source > 0);
    }
    let mut size = source >> level;
    if (size << level) < source {
        size += 1;
    }
    size
}

/// Geometry of a multi-resolution raster: per-level size and image-to-model transform
#[derive(Debug, Clone, PartialEq)]
pub struct MultiLevelModel {
    level_count: usize,
    width: usize,
    height: usize,
    image_to_model: AffineTransform,
    model_to_image: AffineTransform,
}

impl MultiLevelModel {
    pub fn new(
        level_count: usize,
        image_to_model: AffineTransform,
        width: usize,
        height: usize,
    ) -> MosaicResult<Self> {
        if level_count == 0 {
            return Err(MosaicError::InvalidArgument(
                "level count must be at least 1".to_string(),
            ));
        }
        if width == 0 || height == 0 {
            return Err(MosaicError::InvalidArgument(format!(
                "base raster must be non-empty, got {}x{}",
                width, height
            )));
        }
        let model_to_image = image_to_model.inverse()?;

        Ok(Self {
            level_count,
            width,
            height,
            image_to_model,
            model_to_image,
        })
    }

    pub fn level_count(&self) -> usize {
        self.level_count
    }

    pub fn base_dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn check_level(&self, level: usize) -> MosaicResult<()> {
        if level >= self.level_count {
            return Err(MosaicError::LevelOutOfRange {
                level,
                level_count: self.level_count,
            });
        }
        Ok(())
    }

    /// (width, height) at `level`
    pub fn level_dimensions(&self, level: usize) -> MosaicResult<(usize, usize)> {
        self.check_level(level)?;
        Ok((scale_value(self.width, level), scale_value(self.height, level)))
    }

    /// Bounds of the level image, anchored at the origin
    pub fn level_bounds(&self, level: usize) -> MosaicResult<Rectangle> {
        let (width, height) = self.level_dimensions(level)?;
        Ok(Rectangle::sized(width, height))
    }

    /// Scale factor between level-0 and `level` pixels
    pub fn scale(&self, level: usize) -> f64 {
        2f64.powi(level as i32)
    }

    /// Level-0 transform applied to level pixels scaled by 2^level
    pub fn image_to_model_transform(&self, level: usize) -> MosaicResult<AffineTransform> {
        self.check_level(level)?;
        let s = self.scale(level);
        Ok(self.image_to_model.concatenate(&AffineTransform::scale(s, s)))
    }

    pub fn model_to_image_transform(&self, level: usize) -> MosaicResult<AffineTransform> {
        self.check_level(level)?;
        let s = 1.0 / self.scale(level);
        Ok(AffineTransform::scale(s, s).concatenate(&self.model_to_image))
    }

    /// Coarsest level whose pixel is no finer than `scale` level-0 pixels
    pub fn level_for_scale(&self, scale: f64) -> usize {
        if !(scale > 1.0) {
            return 0;
        }
        let level = scale.log2().floor() as usize;
        level.min(self.level_count - 1)
    }
}

/// Tile edge for a raster edge of `size` pixels.
///
/// Rasters no larger than the configured maximum form a single tile.
/// Otherwise candidates from maximum down to minimum are tried, keeping the one
/// that wastes the fewest pixels in the last tile (larger tiles win ties).
pub fn preferred_tile_size(size: usize, config: &MosaicConfig) -> usize {
    if size == 0 {
        return config.min_tile_size.max(1);
    }
    if size <= config.max_tile_size {
        return size;
    }

    let mut best = config.max_tile_size;
    let mut best_waste = waste(size, best);
    let mut candidate = config.max_tile_size;
    while candidate >= config.min_tile_size && candidate > 0 {
        let w = waste(size, candidate);
        if w < best_waste {
            best = candidate;
            best_waste = w;
        }
        if w == 0 {
            break;
        }
        if candidate < config.tile_granularity {
            break;
        }
        candidate -= config.tile_granularity;
    }
    best
}

fn waste(size: usize, tile: usize) -> usize {
    let tiles = size.div_ceil(tile);
    tiles * tile - size
}
