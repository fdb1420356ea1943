use crate::config::MosaicConfig;
use crate::core::compositor::is_no_data;
use crate::core::level_model::preferred_tile_size;
use crate::core::mosaic::MosaicMultiLevelSource;
use crate::geo::{AffineTransform, BandGeometry, GeoCoding, GeoReferenceResolver, SceneGeometry};
use crate::io::PyramidSource;
use crate::types::{MosaicError, MosaicResult, Raster, Sample};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Pass-through band metadata supplied by a format reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandMetadata {
    pub name: String,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub scaling_factor: f64,
    pub scaling_offset: f64,
    pub no_data_value: Option<f64>,
    pub spectral_band_index: Option<usize>,
    pub spectral_wavelength: Option<f64>,
    /// Geocoding inputs; zero width/height are taken from the source raster
    pub geometry: BandGeometry,
}

impl Default for BandMetadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            unit: None,
            description: None,
            scaling_factor: 1.0,
            scaling_offset: 0.0,
            no_data_value: None,
            spectral_band_index: None,
            spectral_wavelength: None,
            geometry: BandGeometry::default(),
        }
    }
}

/// A product band backed by a lazy multi-level mosaic
pub struct MosaicBand<S: PyramidSource> {
    metadata: BandMetadata,
    geocoding: Option<Arc<GeoCoding>>,
    image_to_model: AffineTransform,
    source: MosaicMultiLevelSource<S>,
}

impl<S: PyramidSource> MosaicBand<S> {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn metadata(&self) -> &BandMetadata {
        &self.metadata
    }

    /// Band geocoding, or the scene geocoding the band inherits
    pub fn geocoding(&self) -> Option<&Arc<GeoCoding>> {
        self.geocoding.as_ref()
    }

    pub fn image_to_model(&self) -> AffineTransform {
        self.image_to_model
    }

    pub fn source(&self) -> &MosaicMultiLevelSource<S> {
        &self.source
    }

    pub fn raster_dimensions(&self) -> (usize, usize) {
        self.source.model().base_dimensions()
    }

    /// Raw level image
    pub fn get_image(&self, level: usize) -> MosaicResult<Arc<Raster>> {
        self.source.get_image(level)
    }

    /// Level image in geophysical units (`raw * factor + offset`), no-data as NaN
    pub fn geophysical_image(&self, level: usize) -> MosaicResult<Raster> {
        let raw = self.source.get_image(level)?;
        let no_data = self.source.no_data_value();
        let factor = self.metadata.scaling_factor;
        let offset = self.metadata.scaling_offset;
        Ok(raw.mapv(|v| {
            if is_no_data(v, no_data) {
                Sample::NAN
            } else {
                (v as f64 * factor + offset) as Sample
            }
        }))
    }
}

/// Scene-level container: geocoding plus mosaic-backed bands
pub struct MosaicProduct<S: PyramidSource> {
    name: String,
    width: usize,
    height: usize,
    scene_geocoding: Option<Arc<GeoCoding>>,
    bands: Vec<MosaicBand<S>>,
}

impl<S: PyramidSource> MosaicProduct<S> {
    /// Resolve scene and band geocodings and build one mosaic source per band
    pub fn assemble(
        name: &str,
        scene: &SceneGeometry,
        bands: Vec<(BandMetadata, S)>,
        config: &MosaicConfig,
    ) -> MosaicResult<Self> {
        config.validate()?;
        if bands.is_empty() {
            return Err(MosaicError::InvalidArgument(format!(
                "No raster found for product '{}'",
                name
            )));
        }
        if scene.width == 0 || scene.height == 0 {
            return Err(MosaicError::InvalidArgument(format!(
                "Scene raster must be non-empty, got {}x{}",
                scene.width, scene.height
            )));
        }

        let scene_geocoding = GeoReferenceResolver::resolve_scene(scene);
        let scene_transform = scene_geocoding
            .as_ref()
            .map(|gc| gc.image_to_model_transform())
            .unwrap_or_default();

        let mut assembled = Vec::with_capacity(bands.len());
        for (mut metadata, source) in bands {
            let (band_width, band_height) = source.base_dimensions();
            if metadata.geometry.width == 0 || metadata.geometry.height == 0 {
                metadata.geometry.width = band_width;
                metadata.geometry.height = band_height;
            }

            let levels = source.level_count();
            let tile_width = preferred_tile_size(band_width, config);
            let tile_height = preferred_tile_size(band_height, config);
            let no_data = metadata.no_data_value.or_else(|| source.no_data_value());

            let band_ref = GeoReferenceResolver::resolve_band(&metadata.geometry, scene);
            let image_to_model = band_ref
                .image_to_model
                .or_else(|| band_ref.geocoding.as_ref().map(|gc| gc.image_to_model_transform()))
                .unwrap_or(scene_transform);
            let geocoding = band_ref.geocoding.or_else(|| scene_geocoding.clone());

            log::debug!(
                "Band '{}': {}x{}, {} levels, tiles {}x{}",
                metadata.name,
                band_width,
                band_height,
                levels,
                tile_width,
                tile_height
            );

            let mosaic = MosaicMultiLevelSource::new(
                source,
                band_width,
                band_height,
                tile_width,
                tile_height,
                levels,
                image_to_model,
                config.clone(),
            )?
            .with_no_data(no_data);

            assembled.push(MosaicBand {
                metadata,
                geocoding,
                image_to_model,
                source: mosaic,
            });
        }

        log::info!(
            "Assembled product '{}' ({}x{}) with {} band(s), scene geocoding: {}",
            name,
            scene.width,
            scene.height,
            assembled.len(),
            scene_geocoding
                .as_ref()
                .map(|gc| gc.crs_code().unwrap_or_else(|| "tie-point".to_string()))
                .unwrap_or_else(|| "none".to_string())
        );

        Ok(Self {
            name: name.to_string(),
            width: scene.width,
            height: scene.height,
            scene_geocoding,
            bands: assembled,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scene_dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn scene_geocoding(&self) -> Option<&Arc<GeoCoding>> {
        self.scene_geocoding.as_ref()
    }

    pub fn bands(&self) -> &[MosaicBand<S>] {
        &self.bands
    }

    pub fn band(&self, name: &str) -> Option<&MosaicBand<S>> {
        self.bands.iter().find(|b| b.name() == name)
    }

    /// Invalidate every band's cached levels
    pub fn reset(&self) {
        for band in &self.bands {
            band.source.reset();
        }
    }

    pub fn dispose(&self) {
        for band in &self.bands {
            band.source.dispose();
        }
        log::debug!("Disposed product '{}'", self.name);
    }
}
