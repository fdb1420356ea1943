use crate::config::MosaicConfig;
use crate::core::compositor::{composite_bounds, constant_tile, overlay, pad_border_copy, PlacedTile};
use crate::core::level_cache::LevelCache;
use crate::core::level_model::MultiLevelModel;
use crate::geo::AffineTransform;
use crate::io::PyramidSource;
use crate::types::{MosaicError, MosaicResult, Raster, Rectangle, Sample};
use ndarray::s;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One source raster of a mosaic, placed at a level-0 pixel offset
#[derive(Debug, Clone)]
pub struct MosaicComponent<S> {
    pub source: S,
    pub offset_x: usize,
    pub offset_y: usize,
}

impl<S> MosaicComponent<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            offset_x: 0,
            offset_y: 0,
        }
    }

    pub fn at(source: S, offset_x: usize, offset_y: usize) -> Self {
        Self {
            source,
            offset_x,
            offset_y,
        }
    }

    fn level_offset(&self, level: usize) -> (usize, usize) {
        if level >= usize::BITS as usize {
            return (0, 0);
        }
        (self.offset_x >> level, self.offset_y >> level)
    }
}

/// Single banded multi-level mosaic image source.
///
/// Every level is synthesized on first request from the component sources:
/// overlay composite, then border-replicated up to the level size. Results
/// are cached per level until [`reset`](Self::reset).
pub struct MosaicMultiLevelSource<S: PyramidSource> {
    components: Vec<MosaicComponent<S>>,
    model: MultiLevelModel,
    tile_width: usize,
    tile_height: usize,
    no_data: Option<Sample>,
    config: MosaicConfig,
    cache: LevelCache,
    disposed: AtomicBool,
}

impl<S: PyramidSource> MosaicMultiLevelSource<S> {
    /// Mosaic over a single source band
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: S,
        image_width: usize,
        image_height: usize,
        tile_width: usize,
        tile_height: usize,
        levels: usize,
        transform: AffineTransform,
        config: MosaicConfig,
    ) -> MosaicResult<Self> {
        Self::with_components(
            vec![MosaicComponent::new(source)],
            image_width,
            image_height,
            tile_width,
            tile_height,
            levels,
            transform,
            config,
        )
    }

    /// Mosaic over several sources; later components take precedence.
    ///
    /// Each component's own no-data value is transparent in its tiles. The
    /// mosaic-wide no-data value, used for empty-level fillers and applied to
    /// every tile, starts as the first component's and can be replaced with
    /// [`with_no_data`](Self::with_no_data).
    #[allow(clippy::too_many_arguments)]
    pub fn with_components(
        components: Vec<MosaicComponent<S>>,
        image_width: usize,
        image_height: usize,
        tile_width: usize,
        tile_height: usize,
        levels: usize,
        transform: AffineTransform,
        config: MosaicConfig,
    ) -> MosaicResult<Self> {
        if components.is_empty() {
            return Err(MosaicError::InvalidArgument(
                "mosaic needs at least one component".to_string(),
            ));
        }
        if tile_width == 0 || tile_height == 0 {
            return Err(MosaicError::InvalidArgument(format!(
                "tile size must be positive, got {}x{}",
                tile_width, tile_height
            )));
        }
        config.validate()?;
        let model = MultiLevelModel::new(levels, transform, image_width, image_height)?;
        let no_data = components[0].source.no_data_value().map(|v| v as Sample);

        log::debug!(
            "Mosaic source {}x{} with {} component(s), {} levels, tiles {}x{}",
            image_width,
            image_height,
            components.len(),
            levels,
            tile_width,
            tile_height
        );

        Ok(Self {
            components,
            model,
            tile_width,
            tile_height,
            no_data,
            config,
            cache: LevelCache::new(levels),
            disposed: AtomicBool::new(false),
        })
    }

    pub fn with_no_data(mut self, no_data: Option<f64>) -> Self {
        self.no_data = no_data.map(|v| v as Sample);
        self
    }

    pub fn model(&self) -> &MultiLevelModel {
        &self.model
    }

    pub fn level_count(&self) -> usize {
        self.model.level_count()
    }

    pub fn tile_dimensions(&self) -> (usize, usize) {
        (self.tile_width, self.tile_height)
    }

    pub fn no_data_value(&self) -> Option<Sample> {
        self.no_data
    }

    pub fn components(&self) -> &[MosaicComponent<S>] {
        &self.components
    }

    pub fn level_dimensions(&self, level: usize) -> MosaicResult<(usize, usize)> {
        self.model.level_dimensions(level)
    }

    pub fn model_transform(&self, level: usize) -> MosaicResult<AffineTransform> {
        self.model.image_to_model_transform(level)
    }

    /// Number of levels currently materialized
    pub fn cached_levels(&self) -> usize {
        self.cache.cached_count()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Level image of exactly `level_dimensions(level)` pixels.
    ///
    /// Decode failures degrade to filler pixels. Errors are reserved for
    /// contract violations: level out of range, disposed source, or a composite
    /// larger than the level.
    pub fn get_image(&self, level: usize) -> MosaicResult<Arc<Raster>> {
        if self.is_disposed() {
            return Err(MosaicError::Disposed);
        }
        self.model.check_level(level)?;
        self.cache.get_or_compute(level, || self.create_image(level))
    }

    /// Tile `(tile_x, tile_y)` of a level image, clipped at the right and bottom edges
    pub fn get_tile(&self, level: usize, tile_x: usize, tile_y: usize) -> MosaicResult<Raster> {
        let image = self.get_image(level)?;
        let (rows, cols) = image.dim();
        let x = tile_x * self.tile_width;
        let y = tile_y * self.tile_height;
        if x >= cols || y >= rows {
            return Err(MosaicError::InvalidArgument(format!(
                "tile ({}, {}) outside level {} image {}x{}",
                tile_x, tile_y, level, cols, rows
            )));
        }
        let x_end = (x + self.tile_width).min(cols);
        let y_end = (y + self.tile_height).min(rows);
        Ok(image.slice(s![y..y_end, x..x_end]).to_owned())
    }

    /// Materialize every level
    pub fn prefetch_levels(&self) -> MosaicResult<Vec<Arc<Raster>>> {
        let levels = self.level_count();

        #[cfg(feature = "parallel")]
        if self.config.parallel_prefetch {
            use rayon::prelude::*;
            return (0..levels).into_par_iter().map(|level| self.get_image(level)).collect();
        }

        (0..levels).map(|level| self.get_image(level)).collect()
    }

    /// Invalidate cached levels and release the sources' decode buffers.
    ///
    /// Level requests made while the reset runs wait for it and then decode
    /// from the released sources.
    pub fn reset(&self) {
        self.cache.reset_with(|| {
            for component in &self.components {
                component.source.release();
            }
        });
        log::debug!("Mosaic source reset ({} levels invalidated)", self.level_count());
    }

    /// Reset and refuse further level requests
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.reset();
            log::debug!("Mosaic source disposed");
        }
    }

    fn create_image(&self, level: usize) -> MosaicResult<Raster> {
        let fitting = self.model.level_bounds(level)?;

        let mut fetched: Vec<(Arc<Raster>, usize, usize, Option<Sample>)> =
            Vec::with_capacity(self.components.len());
        for (index, component) in self.components.iter().enumerate() {
            let (x, y) = component.level_offset(level);
            match component.source.fetch_level_image(level) {
                Ok(image) => {
                    let no_data = component.source.no_data_value().map(|v| v as Sample);
                    fetched.push((image, x, y, no_data));
                }
                Err(e) => {
                    log::warn!(
                        "Level {} of mosaic component {} unavailable, substituting filler: {}",
                        level,
                        index,
                        e
                    );
                    let width = self.tile_width.min(fitting.width.saturating_sub(x));
                    let height = self.tile_height.min(fitting.height.saturating_sub(y));
                    if width > 0 && height > 0 {
                        let filler = constant_tile(width, height, self.config.fill_value);
                        fetched.push((Arc::new(filler), x, y, None));
                    }
                }
            }
        }

        let tiles: Vec<PlacedTile<'_, Sample>> = fetched
            .iter()
            .map(|(image, x, y, no_data)| PlacedTile::new(image.view(), *x, *y).with_no_data(*no_data))
            .collect();

        let bounds = composite_bounds(&tiles);
        if bounds.is_empty() {
            log::warn!("No tile images for mosaic at level {}", level);
            return Ok(self.no_data_filler(fitting));
        }
        if !fitting.contains(&bounds) {
            return Err(MosaicError::OversizedComposite {
                level,
                composite: bounds,
                fitting,
            });
        }

        let composite = overlay(&tiles, self.config.background(), self.no_data);
        if bounds.width < fitting.width || bounds.height < fitting.height {
            log::debug!(
                "Padding level {} composite {} to {} (right {}, bottom {})",
                level,
                bounds,
                fitting,
                fitting.width - bounds.width,
                fitting.height - bounds.height
            );
        }
        pad_border_copy(composite, fitting.width, fitting.height)
    }

    fn no_data_filler(&self, fitting: Rectangle) -> Raster {
        let value = self.no_data.unwrap_or(Sample::NAN);
        constant_tile(fitting.width, fitting.height, value)
    }
}
