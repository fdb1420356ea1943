use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Real-valued raster sample
pub type Sample = f32;

/// 2D raster (rows x columns, i.e. height x width)
pub type Raster = Array2<Sample>;

/// Integer pixel rectangle in level image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Rectangle {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle anchored at the origin
    pub fn sized(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn max_x(&self) -> usize {
        self.x + self.width
    }

    pub fn max_y(&self) -> usize {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rectangle) -> Rectangle {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rectangle::new(
            x,
            y,
            self.max_x().max(other.max_x()) - x,
            self.max_y().max(other.max_y()) - y,
        )
    }

    /// Overlapping area, empty when disjoint
    pub fn intersection(&self, other: &Rectangle) -> Rectangle {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());
        if max_x <= x || max_y <= y {
            return Rectangle::new(x, y, 0, 0);
        }
        Rectangle::new(x, y, max_x - x, max_y - y)
    }

    pub fn contains(&self, other: &Rectangle) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }
}

impl std::fmt::Display for Rectangle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{} {}x{}]", self.x, self.y, self.width, self.height)
    }
}

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPos {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPos {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Pixel position (x = column, y = row), fractional
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPos {
    pub x: f64,
    pub y: f64,
}

impl PixelPos {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Error types for mosaic synthesis and geocoding
#[derive(Debug, thiserror::Error)]
pub enum MosaicError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("CRS error: {0}")]
    Crs(String),

    #[error("Level {level} out of range (level count {level_count})")]
    LevelOutOfRange { level: usize, level_count: usize },

    #[error("Composite {composite} exceeds fitting rectangle {fitting} at level {level}")]
    OversizedComposite {
        level: usize,
        composite: Rectangle,
        fitting: Rectangle,
    },

    #[error("Mosaic source has been disposed")]
    Disposed,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for mosaic operations
pub type MosaicResult<T> = Result<T, MosaicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_union_and_intersection() {
        let a = Rectangle::new(0, 0, 10, 10);
        let b = Rectangle::new(5, 5, 10, 10);

        assert_eq!(a.union(&b), Rectangle::new(0, 0, 15, 15));
        assert_eq!(a.intersection(&b), Rectangle::new(5, 5, 5, 5));
        assert!(a.intersection(&Rectangle::new(20, 20, 2, 2)).is_empty());
        assert!(a.contains(&Rectangle::new(2, 2, 8, 8)));
        assert!(!a.contains(&b));
    }

    #[test]
    fn test_union_with_empty() {
        let a = Rectangle::new(3, 4, 2, 2);
        assert_eq!(Rectangle::sized(0, 0).union(&a), a);
        assert_eq!(a.union(&Rectangle::sized(0, 5)), a);
    }
}
