use crate::core::level_model::scale_value;
use crate::io::source::PyramidSource;
use crate::types::{MosaicError, MosaicResult, Raster, Sample};
use ndarray::Array2;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory pyramid built from a full resolution raster.
///
/// Level `L` is decoded on first request by averaging `2^L x 2^L` windows
/// (no-data and NaN pixels excluded) and kept in the source's own cache
/// until [`PyramidSource::release`].
pub struct DecimatedSource {
    base: Arc<Raster>,
    tile_width: usize,
    tile_height: usize,
    level_count: usize,
    no_data: Option<f64>,
    levels: Mutex<Vec<Option<Arc<Raster>>>>,
    decode_count: AtomicUsize,
}

impl DecimatedSource {
    pub fn new(
        base: Raster,
        tile_width: usize,
        tile_height: usize,
        level_count: usize,
        no_data: Option<f64>,
    ) -> MosaicResult<Self> {
        let (rows, cols) = base.dim();
        if rows == 0 || cols == 0 {
            return Err(MosaicError::InvalidArgument(
                "Decimated source needs a non-empty raster".to_string(),
            ));
        }
        if tile_width == 0 || tile_height == 0 {
            return Err(MosaicError::InvalidArgument(format!(
                "Tile size must be positive, got {}x{}",
                tile_width, tile_height
            )));
        }
        if level_count == 0 {
            return Err(MosaicError::InvalidArgument(
                "level count must be at least 1".to_string(),
            ));
        }

        let base = Arc::new(base);
        let mut levels = vec![None; level_count];
        levels[0] = Some(Arc::clone(&base));

        Ok(Self {
            base,
            tile_width,
            tile_height,
            level_count,
            no_data,
            levels: Mutex::new(levels),
            decode_count: AtomicUsize::new(0),
        })
    }

    /// Number of level decodes performed so far
    pub fn decode_count(&self) -> usize {
        self.decode_count.load(Ordering::Relaxed)
    }

    /// Number of levels currently held in the decode cache
    pub fn cached_levels(&self) -> usize {
        let levels = self.levels.lock().unwrap_or_else(|p| p.into_inner());
        levels.iter().filter(|l| l.is_some()).count()
    }

    fn is_valid(&self, value: Sample) -> bool {
        if value.is_nan() {
            return false;
        }
        match self.no_data {
            Some(nd) => value as f64 != nd,
            None => true,
        }
    }

    fn decimate(&self, level: usize) -> Raster {
        let (rows, cols) = self.base.dim();
        let out_rows = scale_value(rows, level);
        let out_cols = scale_value(cols, level);
        let window = 1usize << level;
        let empty = self.no_data.map(|nd| nd as Sample).unwrap_or(Sample::NAN);

        log::debug!(
            "Decimating {}x{} raster to level {} ({}x{})",
            cols, rows, level, out_cols, out_rows
        );

        Array2::from_shape_fn((out_rows, out_cols), |(r, c)| {
            let row_end = ((r + 1) * window).min(rows);
            let col_end = ((c + 1) * window).min(cols);

            let mut sum = 0.0f64;
            let mut count = 0usize;
            for in_row in (r * window)..row_end {
                for in_col in (c * window)..col_end {
                    let value = self.base[[in_row, in_col]];
                    if self.is_valid(value) {
                        sum += value as f64;
                        count += 1;
                    }
                }
            }

            if count > 0 {
                (sum / count as f64) as Sample
            } else {
                empty
            }
        })
    }
}

impl PyramidSource for DecimatedSource {
    fn fetch_level_image(&self, level: usize) -> MosaicResult<Arc<Raster>> {
        if level >= self.level_count {
            return Err(MosaicError::LevelOutOfRange {
                level,
                level_count: self.level_count,
            });
        }

        {
            let levels = self.levels.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(image) = &levels[level] {
                return Ok(Arc::clone(image));
            }
        }

        // Decode outside the lock; a concurrent decode of the same level is idempotent
        let image = Arc::new(self.decimate(level));
        self.decode_count.fetch_add(1, Ordering::Relaxed);

        let mut levels = self.levels.lock().unwrap_or_else(|p| p.into_inner());
        let cached = levels[level].get_or_insert_with(|| Arc::clone(&image));
        Ok(Arc::clone(cached))
    }

    fn base_dimensions(&self) -> (usize, usize) {
        let (rows, cols) = self.base.dim();
        (cols, rows)
    }

    fn tile_dimensions(&self) -> (usize, usize) {
        (self.tile_width, self.tile_height)
    }

    fn level_count(&self) -> usize {
        self.level_count
    }

    fn no_data_value(&self) -> Option<f64> {
        self.no_data
    }

    fn release(&self) {
        let mut levels = self.levels.lock().unwrap_or_else(|p| p.into_inner());
        for slot in levels.iter_mut().skip(1) {
            *slot = None;
        }
        log::debug!("Released decoded levels of {}-level source", self.level_count);
    }
}
