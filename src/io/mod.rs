//! Raster sources feeding the mosaic

pub mod memory;
pub mod source;

pub use memory::DecimatedSource;
pub use source::PyramidSource;
