use crate::geo::affine::AffineTransform;
use crate::geo::crs::{resolve_crs, CrsDefinition};
use crate::geo::tie_point::TiePointGeoCoding;
use crate::types::{GeoPos, MosaicError, MosaicResult, PixelPos};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Explicit raster anchor: model coordinates of the reference pixel and the pixel step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsertionPoint {
    pub x: f64,
    pub y: f64,
    pub step_x: f64,
    pub step_y: f64,
}

/// Corner samples ordered upper-left, upper-right, lower-left, lower-right
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerCoordinates {
    pub lats: [f64; 4],
    pub lons: [f64; 4],
}

impl CornerCoordinates {
    /// Corners derived from a lower-left origin and pixel step over a raster
    pub fn from_lower_left_origin(origin: &InsertionPoint, width: usize, height: usize) -> Self {
        let h = height as f64 * origin.step_y;
        let w = width as f64 * origin.step_x;
        Self {
            lats: [origin.y + h, origin.y + h, origin.y, origin.y],
            lons: [origin.x, origin.x + w, origin.x, origin.x + w],
        }
    }
}

/// Tie-point grid offset derived from the spread of insertion points over the step size
pub fn tie_point_offset_from_extent(
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
    step_x: f64,
    step_y: f64,
) -> (f64, f64) {
    let offset_x = if step_x != 0.0 { (max_x - min_x) / step_x } else { 0.0 };
    let offset_y = if step_y != 0.0 { (max_y - min_y) / step_y } else { 0.0 };
    (offset_x, offset_y)
}

/// Geocoding anchored in a map CRS through an affine image-to-map transform
#[derive(Debug, Clone, PartialEq)]
pub struct CrsGeoCoding {
    crs: CrsDefinition,
    width: usize,
    height: usize,
    image_to_map: AffineTransform,
}

impl CrsGeoCoding {
    /// `x = easting + (px - ref_x) * pixel_size_x`, `y = northing - (py - ref_y) * pixel_size_y`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        crs: CrsDefinition,
        width: usize,
        height: usize,
        easting: f64,
        northing: f64,
        pixel_size_x: f64,
        pixel_size_y: f64,
        reference_pixel_x: f64,
        reference_pixel_y: f64,
    ) -> MosaicResult<Self> {
        if width == 0 || height == 0 {
            return Err(MosaicError::InvalidArgument(format!(
                "CRS geocoding needs a non-empty raster, got {}x{}",
                width, height
            )));
        }
        if pixel_size_x == 0.0 || pixel_size_y == 0.0 {
            return Err(MosaicError::InvalidArgument(format!(
                "CRS geocoding needs non-zero pixel size, got ({}, {})",
                pixel_size_x, pixel_size_y
            )));
        }

        let image_to_map = AffineTransform::new(
            pixel_size_x,
            0.0,
            easting - reference_pixel_x * pixel_size_x,
            0.0,
            -pixel_size_y,
            northing + reference_pixel_y * pixel_size_y,
        );

        Ok(Self {
            crs,
            width,
            height,
            image_to_map,
        })
    }

    /// Zero-based geocoding from an insertion point
    pub fn from_insertion_point(
        crs: CrsDefinition,
        width: usize,
        height: usize,
        point: &InsertionPoint,
    ) -> MosaicResult<Self> {
        Self::new(crs, width, height, point.x, point.y, point.step_x, point.step_y, 0.0, 0.0)
    }

    pub fn crs(&self) -> &CrsDefinition {
        &self.crs
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn image_to_map(&self) -> AffineTransform {
        self.image_to_map
    }

    pub fn pixel_to_geo(&self, pixel: PixelPos) -> MosaicResult<GeoPos> {
        let (x, y) = self.image_to_map.transform_point(pixel.x, pixel.y);
        self.crs.to_wgs84(x, y)
    }

    pub fn geo_to_pixel(&self, geo: GeoPos) -> MosaicResult<PixelPos> {
        let (x, y) = self.crs.from_wgs84(geo)?;
        let (px, py) = self.image_to_map.inverse()?.transform_point(x, y);
        Ok(PixelPos::new(px, py))
    }
}

/// Geocoding of a scene or band: either map-anchored or tie-point interpolated
#[derive(Debug, Clone, PartialEq)]
pub enum GeoCoding {
    Crs(CrsGeoCoding),
    TiePoint(TiePointGeoCoding),
}

impl GeoCoding {
    pub fn pixel_to_geo(&self, pixel: PixelPos) -> Option<GeoPos> {
        match self {
            GeoCoding::Crs(gc) => match gc.pixel_to_geo(pixel) {
                Ok(pos) => Some(pos),
                Err(e) => {
                    log::debug!("pixel_to_geo failed: {}", e);
                    None
                }
            },
            GeoCoding::TiePoint(gc) => Some(gc.pixel_to_geo(pixel)),
        }
    }

    pub fn geo_to_pixel(&self, geo: GeoPos) -> Option<PixelPos> {
        match self {
            GeoCoding::Crs(gc) => gc.geo_to_pixel(geo).ok(),
            GeoCoding::TiePoint(gc) => gc.geo_to_pixel(geo),
        }
    }

    /// Image-to-model transform; identity for tie-point geocodings
    pub fn image_to_model_transform(&self) -> AffineTransform {
        match self {
            GeoCoding::Crs(gc) => gc.image_to_map(),
            GeoCoding::TiePoint(_) => AffineTransform::identity(),
        }
    }

    pub fn crs_code(&self) -> Option<String> {
        match self {
            GeoCoding::Crs(gc) => Some(gc.crs().code()),
            GeoCoding::TiePoint(_) => None,
        }
    }
}

/// Scene-level inputs for geocoding resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneGeometry {
    pub width: usize,
    pub height: usize,
    pub crs_code: Option<String>,
    pub origin: Option<InsertionPoint>,
    pub corners: Option<CornerCoordinates>,
    pub tie_point_offset: (f64, f64),
}

/// Band-level inputs for geocoding resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BandGeometry {
    pub width: usize,
    pub height: usize,
    /// Falls back to the scene CRS code when absent
    pub crs_code: Option<String>,
    pub insertion_point: Option<InsertionPoint>,
    pub tie_point_offset: (f64, f64),
}

/// Geocoding resolved for one band
#[derive(Debug, Clone, Default)]
pub struct BandGeoReference {
    /// None means the band inherits the scene geocoding
    pub geocoding: Option<Arc<GeoCoding>>,
    /// Band image-to-model transform when the band raster is scaled against the scene
    pub image_to_model: Option<AffineTransform>,
}

/// Derives scene and band geocodings from insertion points or corner coordinates
pub struct GeoReferenceResolver;

impl GeoReferenceResolver {
    /// Scene geocoding. An unresolvable CRS code yields `None` with a warning.
    pub fn resolve_scene(scene: &SceneGeometry) -> Option<Arc<GeoCoding>> {
        if let Some(origin) = &scene.origin {
            let Some(code) = scene.crs_code.as_deref() else {
                log::warn!("Scene insertion point present but no CRS code; leaving scene without geocoding");
                return None;
            };
            return match Self::crs_geocoding(code, scene.width, scene.height, origin) {
                Ok(gc) => {
                    log::debug!("Scene geocoded in {}", code);
                    Some(Arc::new(GeoCoding::Crs(gc)))
                }
                Err(e) => {
                    log::warn!("Scene geocoding failed: {}", e);
                    None
                }
            };
        }

        let corners = scene.corners.as_ref()?;
        let (offset_x, offset_y) = scene.tie_point_offset;
        match TiePointGeoCoding::from_corners(
            corners.lats,
            corners.lons,
            offset_x,
            offset_y,
            scene.width,
            scene.height,
        ) {
            Ok(gc) => {
                log::debug!("Scene geocoded from corner tie points");
                Some(Arc::new(GeoCoding::TiePoint(gc)))
            }
            Err(e) => {
                log::warn!("Scene tie-point geocoding failed: {}", e);
                None
            }
        }
    }

    /// Band geocoding and scaling against the scene raster
    pub fn resolve_band(band: &BandGeometry, scene: &SceneGeometry) -> BandGeoReference {
        if let Some(point) = &band.insertion_point {
            let code = band.crs_code.as_deref().or(scene.crs_code.as_deref());
            let geocoding = match code {
                Some(code) => match Self::crs_geocoding(code, band.width, band.height, point) {
                    Ok(gc) => Some(Arc::new(GeoCoding::Crs(gc))),
                    Err(e) => {
                        log::warn!("Band geocoding failed: {}", e);
                        None
                    }
                },
                None => {
                    log::warn!("Band insertion point present but no CRS code");
                    None
                }
            };
            return BandGeoReference {
                geocoding,
                image_to_model: None,
            };
        }

        if band.width == scene.width && band.height == scene.height {
            return BandGeoReference::default();
        }

        let Some(scaling) = Self::scaling_transform(scene.width, scene.height, band.width, band.height)
        else {
            log::warn!("Band raster {}x{} cannot be scaled to the scene", band.width, band.height);
            return BandGeoReference::default();
        };

        let geocoding = scene.corners.as_ref().and_then(|corners| {
            let (offset_x, offset_y) = band.tie_point_offset;
            match TiePointGeoCoding::from_corners(
                corners.lats,
                corners.lons,
                offset_x,
                offset_y,
                band.width,
                band.height,
            ) {
                Ok(gc) => Some(Arc::new(GeoCoding::TiePoint(gc))),
                Err(e) => {
                    log::warn!("Band tie-point geocoding failed: {}", e);
                    None
                }
            }
        });

        BandGeoReference {
            geocoding,
            image_to_model: Some(scaling),
        }
    }

    /// Scale mapping band pixels onto scene pixels
    pub fn scaling_transform(
        scene_width: usize,
        scene_height: usize,
        band_width: usize,
        band_height: usize,
    ) -> Option<AffineTransform> {
        if band_width == 0 || band_height == 0 {
            return None;
        }
        Some(AffineTransform::scale(
            scene_width as f64 / band_width as f64,
            scene_height as f64 / band_height as f64,
        ))
    }

    fn crs_geocoding(
        code: &str,
        width: usize,
        height: usize,
        point: &InsertionPoint,
    ) -> MosaicResult<CrsGeoCoding> {
        let crs = resolve_crs(code)?;
        CrsGeoCoding::from_insertion_point(crs, width, height, point)
    }
}
