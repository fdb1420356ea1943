mod common;

use common::{init_logging, pattern, StubSource};
use geomosaic::{
    AffineTransform, DecimatedSource, MosaicComponent, MosaicConfig, MosaicMultiLevelSource,
    MosaicResult, PyramidSource, Raster,
};
use ndarray::Array2;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn single(source: StubSource) -> MosaicMultiLevelSource<StubSource> {
    let (width, height) = source.base_dimensions();
    let (tile_width, tile_height) = source.tile_dimensions();
    let levels = source.level_count();
    MosaicMultiLevelSource::new(
        source,
        width,
        height,
        tile_width,
        tile_height,
        levels,
        AffineTransform::identity(),
        MosaicConfig::default(),
    )
    .expect("valid mosaic")
}

#[test]
fn test_every_level_has_exact_dimensions() {
    init_logging();
    let mosaic = single(StubSource::new(2049, 1537, (512, 512), 6));

    for level in 0..6 {
        let (width, height) = mosaic.level_dimensions(level).unwrap();
        let image = mosaic.get_image(level).unwrap();
        assert_eq!(image.dim(), (height, width), "level {}", level);
    }
    assert_eq!(mosaic.level_dimensions(1).unwrap(), (1025, 769));
}

#[test]
fn test_repeated_requests_are_identical() {
    init_logging();
    let mosaic = single(StubSource::new(300, 200, (128, 128), 3));

    let first = mosaic.get_image(2).unwrap();
    let second = mosaic.get_image(2).unwrap();
    assert_eq!(*first, *second);
    assert_eq!(mosaic.components()[0].source.fetch_count(), 1);
}

#[test]
fn test_padding_replicates_edge_pixels() {
    init_logging();
    let (dx, dy) = (3, 2);
    let mosaic = single(StubSource::new(40, 30, (16, 16), 1).trimmed(dx, dy));
    let image = mosaic.get_image(0).unwrap();
    assert_eq!(image.dim(), (30, 40));

    let inner_cols = 40 - dx;
    let inner_rows = 30 - dy;
    for r in 0..30 {
        for c in 0..40 {
            let expected = pattern(0, r.min(inner_rows - 1), c.min(inner_cols - 1));
            assert_eq!(image[[r, c]], expected, "pixel ({}, {})", r, c);
        }
    }
}

#[test]
fn test_decode_failure_scenario_level_five() {
    init_logging();
    let mosaic = single(StubSource::new(10980, 10980, (512, 512), 6).failing_at(5));

    assert_eq!(mosaic.level_dimensions(5).unwrap(), (344, 344));
    let image = mosaic.get_image(5).unwrap();
    assert_eq!(image.dim(), (344, 344));
    assert!(image.iter().all(|&v| v == 0.0));
}

#[test]
fn test_decode_failure_with_small_tiles_still_fills_level() {
    init_logging();
    let mosaic = single(StubSource::new(100, 60, (16, 16), 2).failing_at(0));
    let image = mosaic.get_image(0).unwrap();
    assert_eq!(image.dim(), (60, 100));
    assert!(image.iter().all(|&v| v == 0.0));
}

#[test]
fn test_reset_triggers_fresh_fetch() {
    init_logging();
    let mosaic = single(StubSource::new(64, 64, (32, 32), 3));

    mosaic.get_image(1).unwrap();
    mosaic.get_image(1).unwrap();
    assert_eq!(mosaic.components()[0].source.fetch_count(), 1);

    mosaic.reset();
    assert_eq!(mosaic.components()[0].source.release_count(), 1);
    mosaic.get_image(1).unwrap();
    assert_eq!(mosaic.components()[0].source.fetch_count(), 2);
}

#[test]
fn test_later_component_overlays_earlier() {
    init_logging();
    let mut lower = Array2::from_elem((4, 4), 1.0f32);
    lower[[0, 0]] = 5.0;
    let mut upper = Array2::from_elem((4, 4), 2.0f32);
    upper[[0, 0]] = f32::NAN;
    upper[[1, 1]] = -1.0;

    let components = vec![
        MosaicComponent::new(DecimatedSource::new(lower, 4, 4, 1, None).unwrap()),
        MosaicComponent::new(DecimatedSource::new(upper, 4, 4, 1, Some(-1.0)).unwrap()),
    ];
    let mosaic = MosaicMultiLevelSource::with_components(
        components,
        4,
        4,
        4,
        4,
        1,
        AffineTransform::identity(),
        MosaicConfig::default(),
    )
    .unwrap();

    // The upper component's -1 sentinel is transparent without a mosaic-wide override
    assert_eq!(mosaic.no_data_value(), None);
    let image = mosaic.get_image(0).unwrap();
    assert_eq!(image[[0, 0]], 5.0);
    assert_eq!(image[[1, 1]], 1.0);
    assert_eq!(image[[2, 3]], 2.0);
}

#[test]
fn test_offset_components_tile_the_scene() {
    init_logging();
    let left = Array2::from_elem((8, 8), 1.0f32);
    let right = Array2::from_elem((8, 8), 2.0f32);
    let components = vec![
        MosaicComponent::new(DecimatedSource::new(left, 8, 8, 2, None).unwrap()),
        MosaicComponent::at(DecimatedSource::new(right, 8, 8, 2, None).unwrap(), 8, 0),
    ];
    let mosaic = MosaicMultiLevelSource::with_components(
        components,
        16,
        8,
        8,
        8,
        2,
        AffineTransform::identity(),
        MosaicConfig::default(),
    )
    .unwrap();

    let level0 = mosaic.get_image(0).unwrap();
    assert_eq!(level0.dim(), (8, 16));
    assert_eq!(level0[[3, 7]], 1.0);
    assert_eq!(level0[[3, 8]], 2.0);

    let level1 = mosaic.get_image(1).unwrap();
    assert_eq!(level1.dim(), (4, 8));
    assert_eq!(level1[[0, 3]], 1.0);
    assert_eq!(level1[[0, 4]], 2.0);
}

#[test]
fn test_level_transforms_follow_scale() {
    let base = AffineTransform::new(10.0, 0.0, 600_000.0, 0.0, -10.0, 5_200_000.0);
    let source = StubSource::new(1000, 1000, (256, 256), 4);
    let mosaic = MosaicMultiLevelSource::new(
        source,
        1000,
        1000,
        256,
        256,
        4,
        base,
        MosaicConfig::default(),
    )
    .unwrap();

    for level in 0..4 {
        let t = mosaic.model_transform(level).unwrap();
        let s = (1 << level) as f64;
        assert_eq!(t.transform_point(7.0, 9.0), base.transform_point(7.0 * s, 9.0 * s));
    }
    assert!(mosaic.model_transform(4).is_err());
}

#[test]
fn test_prefetch_materializes_all_levels() {
    init_logging();
    let mosaic = single(StubSource::new(513, 257, (128, 128), 5));
    let images = mosaic.prefetch_levels().unwrap();
    assert_eq!(images.len(), 5);
    assert_eq!(mosaic.cached_levels(), 5);
    for (level, image) in images.iter().enumerate() {
        let (w, h) = mosaic.level_dimensions(level).unwrap();
        assert_eq!(image.dim(), (h, w));
    }
}

#[test]
fn test_concurrent_requests_share_one_computation() {
    init_logging();
    let mosaic = Arc::new(single(StubSource::new(256, 256, (64, 64), 3)));

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let mosaic = Arc::clone(&mosaic);
            std::thread::spawn(move || mosaic.get_image(i % 3).unwrap())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(mosaic.cached_levels(), 3);
    assert_eq!(mosaic.components()[0].source.fetch_count(), 3);
}

#[test]
fn test_reset_during_reads_does_not_crash() {
    init_logging();
    let mosaic = Arc::new(single(StubSource::new(512, 512, (128, 128), 4)));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let mosaic = Arc::clone(&mosaic);
            std::thread::spawn(move || {
                for level in 0..4 {
                    let image = mosaic.get_image(level).unwrap();
                    let (w, h) = mosaic.level_dimensions(level).unwrap();
                    assert_eq!(image.dim(), (h, w));
                }
            })
        })
        .collect();
    for _ in 0..10 {
        mosaic.reset();
    }
    for reader in readers {
        reader.join().unwrap();
    }
}

/// Serves its decode generation as pixel value; `release` is slow and bumps the generation
struct SlowReleaseSource {
    version: AtomicUsize,
    release_started: Mutex<Option<Sender<()>>>,
}

impl PyramidSource for SlowReleaseSource {
    fn fetch_level_image(&self, _level: usize) -> MosaicResult<Arc<Raster>> {
        let version = self.version.load(Ordering::SeqCst) as f32;
        Ok(Arc::new(Array2::from_elem((4, 4), version)))
    }

    fn base_dimensions(&self) -> (usize, usize) {
        (4, 4)
    }

    fn tile_dimensions(&self) -> (usize, usize) {
        (4, 4)
    }

    fn level_count(&self) -> usize {
        1
    }

    fn release(&self) {
        if let Some(tx) = self.release_started.lock().unwrap().take() {
            tx.send(()).unwrap();
        }
        std::thread::sleep(Duration::from_millis(200));
        self.version.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_request_during_reset_sees_released_source() {
    init_logging();
    let (tx, rx) = channel();
    let source = SlowReleaseSource {
        version: AtomicUsize::new(0),
        release_started: Mutex::new(Some(tx)),
    };
    let mosaic = Arc::new(
        MosaicMultiLevelSource::new(source, 4, 4, 4, 4, 1, AffineTransform::identity(), MosaicConfig::default())
            .unwrap(),
    );
    assert_eq!(mosaic.get_image(0).unwrap()[[0, 0]], 0.0);

    let resetter = {
        let mosaic = Arc::clone(&mosaic);
        std::thread::spawn(move || mosaic.reset())
    };

    rx.recv().unwrap();
    let during = mosaic.get_image(0).unwrap();
    resetter.join().unwrap();

    assert_eq!(during[[0, 0]], 1.0);
    assert_eq!(mosaic.get_image(0).unwrap()[[0, 0]], 1.0);
}
