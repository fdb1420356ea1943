use crate::types::{MosaicError, MosaicResult, Sample};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Mosaic synthesis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    /// Value of the filler tile substituted when a source level cannot be decoded
    pub fill_value: Sample,
    /// Value of composite pixels no tile covers (None = NaN)
    pub background_value: Option<Sample>,
    /// Smallest tile edge considered by the preferred tile size search
    pub min_tile_size: usize,
    /// Largest tile edge considered by the preferred tile size search
    pub max_tile_size: usize,
    /// Step between candidate tile edges
    pub tile_granularity: usize,
    /// Materialize levels in parallel when prefetching
    pub parallel_prefetch: bool,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            fill_value: 0.0,
            background_value: None,
            min_tile_size: 256,
            max_tile_size: 512,
            tile_granularity: 1,
            parallel_prefetch: true,
        }
    }
}

impl MosaicConfig {
    /// Background value of uncovered composite pixels
    pub fn background(&self) -> Sample {
        self.background_value.unwrap_or(Sample::NAN)
    }

    pub fn validate(&self) -> MosaicResult<()> {
        if self.min_tile_size == 0 {
            return Err(MosaicError::Config("min_tile_size must be positive".to_string()));
        }
        if self.max_tile_size < self.min_tile_size {
            return Err(MosaicError::Config(format!(
                "max_tile_size ({}) is smaller than min_tile_size ({})",
                self.max_tile_size, self.min_tile_size
            )));
        }
        if self.tile_granularity == 0 {
            return Err(MosaicError::Config("tile_granularity must be positive".to_string()));
        }
        if !self.fill_value.is_finite() {
            return Err(MosaicError::Config("fill_value must be finite".to_string()));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> MosaicResult<Self> {
        let config: MosaicConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> MosaicResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loading mosaic configuration from {}", path.as_ref().display());
        Self::from_json_str(&content)
    }
}
