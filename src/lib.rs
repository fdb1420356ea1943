//! geomosaic: lazy multi-resolution mosaics for satellite raster products
//!
//! This library synthesizes seamless level images from one or more pyramid
//! sources, padding each level to its exact size, and derives the geocoding
//! (map CRS or corner tie points) that anchors every band in model space.

pub mod config;
pub mod core;
pub mod geo;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use config::MosaicConfig;
pub use crate::core::{
    scale_value, BandMetadata, MosaicBand, MosaicComponent, MosaicMultiLevelSource, MosaicProduct,
    MultiLevelModel,
};
pub use geo::{AffineTransform, GeoCoding, GeoReferenceResolver};
pub use io::{DecimatedSource, PyramidSource};
pub use types::{GeoPos, MosaicError, MosaicResult, PixelPos, Raster, Rectangle};
