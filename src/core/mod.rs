//! Core mosaic synthesis modules

pub mod band;
pub mod compositor;
pub mod level_cache;
pub mod level_model;
pub mod mosaic;

// Re-export main types
pub use band::{BandMetadata, MosaicBand, MosaicProduct};
pub use compositor::{overlay, pad_border_copy, PlacedTile};
pub use level_cache::LevelCache;
pub use level_model::{preferred_tile_size, scale_value, MultiLevelModel};
pub use mosaic::{MosaicComponent, MosaicMultiLevelSource};
