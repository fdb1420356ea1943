//! Geocoding: affine transforms, CRS resolution and tie-point interpolation

pub mod affine;
pub mod crs;
pub mod georef;
pub mod tie_point;

pub use affine::AffineTransform;
pub use crs::{parse_epsg_code, resolve_crs, utm_crs_code, CrsDefinition, Hemisphere};
pub use georef::{
    tie_point_offset_from_extent, BandGeoReference, BandGeometry, CornerCoordinates, CrsGeoCoding,
    GeoCoding, GeoReferenceResolver, InsertionPoint, SceneGeometry,
};
pub use tie_point::{TiePointGeoCoding, TiePointGrid};
