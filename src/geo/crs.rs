//! Coordinate reference system resolution.
//!
//! CRS codes found in product metadata come in several spellings
//! (`EPSG:32633`, `EPSG::32633`, `urn:ogc:def:crs:EPSG::32633`, `32633`).
//! They are normalised to an EPSG number and resolved against the embedded
//! crs-definitions database. Projection to and from WGS84 uses proj4rs.

use crate::types::{GeoPos, MosaicError, MosaicResult};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const WGS84_PROJ: &str = "+proj=longlat +datum=WGS84 +no_defs";

static EPSG_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:urn:ogc:def:crs:)?epsg:(?:[0-9.]*:)?(\d+)$").expect("valid EPSG pattern")
});

/// A CRS resolved from the EPSG database
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrsDefinition {
    pub epsg: u16,
    pub proj4: &'static str,
    pub geographic: bool,
}

impl CrsDefinition {
    /// Canonical `EPSG:n` code
    pub fn code(&self) -> String {
        format!("EPSG:{}", self.epsg)
    }

    /// Project model coordinates of this CRS to WGS84 latitude/longitude
    pub fn to_wgs84(&self, x: f64, y: f64) -> MosaicResult<GeoPos> {
        if self.geographic {
            return Ok(GeoPos::new(y, x));
        }

        let source = self.proj()?;
        let target = wgs84()?;
        let mut point = (x, y, 0.0);
        transform(&source, &target, &mut point).map_err(|e| {
            MosaicError::Crs(format!("Transform from {} to WGS84 failed: {:?}", self.code(), e))
        })?;

        // proj4rs uses radians for geographic coordinates
        Ok(GeoPos::new(point.1.to_degrees(), point.0.to_degrees()))
    }

    /// Project WGS84 latitude/longitude to model coordinates of this CRS
    pub fn from_wgs84(&self, pos: GeoPos) -> MosaicResult<(f64, f64)> {
        if self.geographic {
            return Ok((pos.lon, pos.lat));
        }

        let source = wgs84()?;
        let target = self.proj()?;
        let mut point = (pos.lon.to_radians(), pos.lat.to_radians(), 0.0);
        transform(&source, &target, &mut point).map_err(|e| {
            MosaicError::Crs(format!("Transform from WGS84 to {} failed: {:?}", self.code(), e))
        })?;

        Ok((point.0, point.1))
    }

    fn proj(&self) -> MosaicResult<Proj> {
        Proj::from_proj_string(self.proj4)
            .map_err(|e| MosaicError::Crs(format!("Invalid projection {}: {:?}", self.code(), e)))
    }
}

fn wgs84() -> MosaicResult<Proj> {
    Proj::from_proj_string(WGS84_PROJ)
        .map_err(|e| MosaicError::Crs(format!("Invalid WGS84 projection: {:?}", e)))
}

/// Extract the EPSG number from a metadata CRS code
pub fn parse_epsg_code(code: &str) -> MosaicResult<u16> {
    let trimmed = code.trim();
    let digits = if trimmed.chars().all(|c| c.is_ascii_digit()) && !trimmed.is_empty() {
        trimmed
    } else {
        EPSG_CODE
            .captures(trimmed)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| MosaicError::Crs(format!("Unsupported CRS code '{}'", code)))?
    };

    digits
        .parse::<u16>()
        .map_err(|_| MosaicError::Crs(format!("EPSG code out of range in '{}'", code)))
}

/// Resolve a metadata CRS code against the EPSG database
pub fn resolve_crs(code: &str) -> MosaicResult<CrsDefinition> {
    let epsg = parse_epsg_code(code)?;
    let proj4 = crs_definitions::from_code(epsg)
        .map(|def| def.proj4)
        .ok_or_else(|| MosaicError::Crs(format!("EPSG:{} is not in the crs-definitions database", epsg)))?;

    Ok(CrsDefinition {
        epsg,
        proj4,
        geographic: proj4.contains("+proj=longlat"),
    })
}

/// Hemisphere of a UTM zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hemisphere {
    North,
    South,
}

impl Hemisphere {
    /// Parse a map hemisphere designator; anything but "S" is northern
    pub fn from_designator(designator: &str) -> Hemisphere {
        if designator.trim().eq_ignore_ascii_case("S") {
            Hemisphere::South
        } else {
            Hemisphere::North
        }
    }
}

/// WGS84 / UTM CRS code for a zone (EPSG:326zz north, EPSG:327zz south)
pub fn utm_crs_code(zone: u8, hemisphere: Hemisphere) -> MosaicResult<String> {
    if !(1..=60).contains(&zone) {
        return Err(MosaicError::InvalidArgument(format!(
            "UTM zone {} outside 1..=60",
            zone
        )));
    }
    let prefix = match hemisphere {
        Hemisphere::North => 326,
        Hemisphere::South => 327,
    };
    Ok(format!("EPSG:{}{:02}", prefix, zone))
}
