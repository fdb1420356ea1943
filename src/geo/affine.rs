use crate::types::{MosaicError, MosaicResult};
use approx::AbsDiffEq;
use serde::{Deserialize, Serialize};

/// 2D affine transform mapping image (pixel) coordinates to model coordinates.
///
/// ```text
/// x' = scale_x * x + shear_x * y + translate_x
/// y' = shear_y * x + scale_y * y + translate_y
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub scale_x: f64,
    pub shear_x: f64,
    pub translate_x: f64,
    pub shear_y: f64,
    pub scale_y: f64,
    pub translate_y: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub fn new(
        scale_x: f64,
        shear_x: f64,
        translate_x: f64,
        shear_y: f64,
        scale_y: f64,
        translate_y: f64,
    ) -> Self {
        Self {
            scale_x,
            shear_x,
            translate_x,
            shear_y,
            scale_y,
            translate_y,
        }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, 0.0, sy, 0.0)
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, tx, 0.0, 1.0, ty)
    }

    /// Create from GDAL-style array [origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self::new(coeffs[1], coeffs[2], coeffs[0], coeffs[4], coeffs[5], coeffs[3])
    }

    /// Convert to GDAL-style array
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.translate_x,
            self.scale_x,
            self.shear_x,
            self.translate_y,
            self.shear_y,
            self.scale_y,
        ]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    /// Transform applying `other` first, then `self`
    pub fn concatenate(&self, other: &AffineTransform) -> AffineTransform {
        AffineTransform {
            scale_x: self.scale_x * other.scale_x + self.shear_x * other.shear_y,
            shear_x: self.scale_x * other.shear_x + self.shear_x * other.scale_y,
            translate_x: self.scale_x * other.translate_x
                + self.shear_x * other.translate_y
                + self.translate_x,
            shear_y: self.shear_y * other.scale_x + self.scale_y * other.shear_y,
            scale_y: self.shear_y * other.shear_x + self.scale_y * other.scale_y,
            translate_y: self.shear_y * other.translate_x
                + self.scale_y * other.translate_y
                + self.translate_y,
        }
    }

    /// Transform applying `self` first, then `other`
    pub fn pre_concatenate(&self, other: &AffineTransform) -> AffineTransform {
        other.concatenate(self)
    }

    pub fn determinant(&self) -> f64 {
        self.scale_x * self.scale_y - self.shear_x * self.shear_y
    }

    pub fn inverse(&self) -> MosaicResult<AffineTransform> {
        let det = self.determinant();
        if det.abs() < f64::EPSILON || !det.is_finite() {
            return Err(MosaicError::InvalidArgument(format!(
                "Affine transform is not invertible (determinant {})",
                det
            )));
        }

        let scale_x = self.scale_y / det;
        let shear_x = -self.shear_x / det;
        let shear_y = -self.shear_y / det;
        let scale_y = self.scale_x / det;
        Ok(AffineTransform {
            scale_x,
            shear_x,
            translate_x: -(scale_x * self.translate_x + shear_x * self.translate_y),
            shear_y,
            scale_y,
            translate_y: -(shear_y * self.translate_x + scale_y * self.translate_y),
        })
    }

    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.scale_x * x + self.shear_x * y + self.translate_x,
            self.shear_y * x + self.scale_y * y + self.translate_y,
        )
    }

    fn coefficients(&self) -> [f64; 6] {
        [
            self.scale_x,
            self.shear_x,
            self.translate_x,
            self.shear_y,
            self.scale_y,
            self.translate_y,
        ]
    }
}

impl AbsDiffEq for AffineTransform {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.coefficients()
            .iter()
            .zip(other.coefficients().iter())
            .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}
