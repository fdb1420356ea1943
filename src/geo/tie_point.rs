use crate::types::{GeoPos, MosaicError, MosaicResult, PixelPos};
use ndarray::Array2;

const MAX_INVERSE_ITERATIONS: usize = 20;
const INVERSE_TOLERANCE: f64 = 1e-6;

/// Sparse grid of samples over a raster, bilinearly interpolated (and
/// extrapolated past the outermost tie points).
#[derive(Debug, Clone, PartialEq)]
pub struct TiePointGrid {
    pub name: String,
    pub offset_x: f64,
    pub offset_y: f64,
    pub sub_sampling_x: f64,
    pub sub_sampling_y: f64,
    /// Samples, shape (grid height, grid width)
    pub points: Array2<f64>,
    /// Values wrap at +/-180 (longitude grids)
    pub discontinuous_at_180: bool,
}

impl TiePointGrid {
    pub fn new(
        name: &str,
        offset_x: f64,
        offset_y: f64,
        sub_sampling_x: f64,
        sub_sampling_y: f64,
        points: Array2<f64>,
    ) -> MosaicResult<Self> {
        let (rows, cols) = points.dim();
        if rows < 2 || cols < 2 {
            return Err(MosaicError::InvalidArgument(format!(
                "Tie-point grid '{}' needs at least 2x2 points, got {}x{}",
                name, cols, rows
            )));
        }
        if !(sub_sampling_x > 0.0 && sub_sampling_y > 0.0) {
            return Err(MosaicError::InvalidArgument(format!(
                "Tie-point grid '{}' sub-sampling must be positive ({}, {})",
                name, sub_sampling_x, sub_sampling_y
            )));
        }
        Ok(Self {
            name: name.to_string(),
            offset_x,
            offset_y,
            sub_sampling_x,
            sub_sampling_y,
            points,
            discontinuous_at_180: false,
        })
    }

    /// Grid of `grid_width x grid_height` samples spanning a raster of
    /// `raster_width x raster_height` pixels, the first sample at (`offset_x`, `offset_y`).
    pub fn spanning(
        name: &str,
        grid_width: usize,
        grid_height: usize,
        offset_x: f64,
        offset_y: f64,
        raster_width: usize,
        raster_height: usize,
        samples: &[f64],
    ) -> MosaicResult<Self> {
        if grid_width < 2 || grid_height < 2 {
            return Err(MosaicError::InvalidArgument(format!(
                "Tie-point grid '{}' needs at least 2x2 points",
                name
            )));
        }
        if raster_width == 0 || raster_height == 0 {
            return Err(MosaicError::InvalidArgument(format!(
                "Tie-point grid '{}' spans an empty raster",
                name
            )));
        }
        let points = Array2::from_shape_vec((grid_height, grid_width), samples.to_vec())
            .map_err(|e| {
                MosaicError::InvalidArgument(format!("Tie-point grid '{}' samples: {}", name, e))
            })?;

        Self::new(
            name,
            offset_x,
            offset_y,
            raster_width as f64 / (grid_width - 1) as f64,
            raster_height as f64 / (grid_height - 1) as f64,
            points,
        )
    }

    pub fn with_discontinuity(mut self) -> Self {
        self.discontinuous_at_180 = true;
        self
    }

    pub fn grid_width(&self) -> usize {
        self.points.ncols()
    }

    pub fn grid_height(&self) -> usize {
        self.points.nrows()
    }

    fn same_geometry(&self, other: &TiePointGrid) -> bool {
        self.points.dim() == other.points.dim()
            && self.offset_x == other.offset_x
            && self.offset_y == other.offset_y
            && self.sub_sampling_x == other.sub_sampling_x
            && self.sub_sampling_y == other.sub_sampling_y
    }

    /// Sample value at a pixel position
    pub fn value_at(&self, x: f64, y: f64) -> f64 {
        let (value, _, _) = self.interpolate(x, y);
        if self.discontinuous_at_180 {
            wrap_longitude(value)
        } else {
            value
        }
    }

    /// Bilinear value and its pixel-space gradient (d/dx, d/dy)
    fn interpolate(&self, x: f64, y: f64) -> (f64, f64, f64) {
        let fi = (x - self.offset_x) / self.sub_sampling_x;
        let fj = (y - self.offset_y) / self.sub_sampling_y;

        let i0 = (fi.floor().max(0.0) as usize).min(self.grid_width() - 2);
        let j0 = (fj.floor().max(0.0) as usize).min(self.grid_height() - 2);
        let wi = fi - i0 as f64;
        let wj = fj - j0 as f64;

        let mut p00 = self.points[[j0, i0]];
        let mut p10 = self.points[[j0, i0 + 1]];
        let mut p01 = self.points[[j0 + 1, i0]];
        let mut p11 = self.points[[j0 + 1, i0 + 1]];

        if self.discontinuous_at_180 {
            let cell = [p00, p10, p01, p11];
            let min = cell.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = cell.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            if max - min > 180.0 {
                for p in [&mut p00, &mut p10, &mut p01, &mut p11] {
                    if *p < 0.0 {
                        *p += 360.0;
                    }
                }
            }
        }

        let value = (1.0 - wi) * (1.0 - wj) * p00
            + wi * (1.0 - wj) * p10
            + (1.0 - wi) * wj * p01
            + wi * wj * p11;
        let d_wi = (1.0 - wj) * (p10 - p00) + wj * (p11 - p01);
        let d_wj = (1.0 - wi) * (p01 - p00) + wi * (p11 - p10);

        (value, d_wi / self.sub_sampling_x, d_wj / self.sub_sampling_y)
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    let mut wrapped = lon;
    while wrapped > 180.0 {
        wrapped -= 360.0;
    }
    while wrapped < -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// Geocoding interpolated from latitude and longitude tie-point grids
#[derive(Debug, Clone, PartialEq)]
pub struct TiePointGeoCoding {
    lat_grid: TiePointGrid,
    lon_grid: TiePointGrid,
}

impl TiePointGeoCoding {
    pub fn new(lat_grid: TiePointGrid, lon_grid: TiePointGrid) -> MosaicResult<Self> {
        if !lat_grid.same_geometry(&lon_grid) {
            return Err(MosaicError::InvalidArgument(
                "Latitude and longitude tie-point grids differ in geometry".to_string(),
            ));
        }
        Ok(Self {
            lat_grid,
            lon_grid: lon_grid.with_discontinuity(),
        })
    }

    /// 2x2 geocoding from corner samples ordered upper-left, upper-right,
    /// lower-left, lower-right.
    pub fn from_corners(
        lats: [f64; 4],
        lons: [f64; 4],
        offset_x: f64,
        offset_y: f64,
        raster_width: usize,
        raster_height: usize,
    ) -> MosaicResult<Self> {
        let lat_grid = TiePointGrid::spanning(
            "latitude", 2, 2, offset_x, offset_y, raster_width, raster_height, &lats,
        )?;
        let lon_grid = TiePointGrid::spanning(
            "longitude", 2, 2, offset_x, offset_y, raster_width, raster_height, &lons,
        )?;
        Self::new(lat_grid, lon_grid)
    }

    pub fn lat_grid(&self) -> &TiePointGrid {
        &self.lat_grid
    }

    pub fn lon_grid(&self) -> &TiePointGrid {
        &self.lon_grid
    }

    pub fn pixel_to_geo(&self, pixel: PixelPos) -> GeoPos {
        GeoPos::new(
            self.lat_grid.value_at(pixel.x, pixel.y),
            self.lon_grid.value_at(pixel.x, pixel.y),
        )
    }

    /// Invert the interpolation with Newton iterations. Returns `None` when
    /// the grid is degenerate around the solution or fails to converge.
    pub fn geo_to_pixel(&self, geo: GeoPos) -> Option<PixelPos> {
        if !geo.is_valid() {
            return None;
        }

        let mut x = self.lat_grid.offset_x
            + self.lat_grid.sub_sampling_x * (self.lat_grid.grid_width() - 1) as f64 / 2.0;
        let mut y = self.lat_grid.offset_y
            + self.lat_grid.sub_sampling_y * (self.lat_grid.grid_height() - 1) as f64 / 2.0;

        for _ in 0..MAX_INVERSE_ITERATIONS {
            let (lat, dlat_dx, dlat_dy) = self.lat_grid.interpolate(x, y);
            let (lon, dlon_dx, dlon_dy) = self.lon_grid.interpolate(x, y);

            let r_lat = geo.lat - lat;
            let r_lon = wrap_longitude(geo.lon - lon);

            let det = dlat_dx * dlon_dy - dlat_dy * dlon_dx;
            if det.abs() < 1e-15 {
                return None;
            }

            let dx = (r_lat * dlon_dy - r_lon * dlat_dy) / det;
            let dy = (dlat_dx * r_lon - dlon_dx * r_lat) / det;
            x += dx;
            y += dy;

            if dx.abs() < INVERSE_TOLERANCE && dy.abs() < INVERSE_TOLERANCE {
                return Some(PixelPos::new(x, y));
            }
        }

        log::debug!("Tie-point inverse did not converge for ({}, {})", geo.lat, geo.lon);
        None
    }
}
