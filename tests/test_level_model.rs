use geomosaic::core::preferred_tile_size;
use geomosaic::{scale_value, AffineTransform, MosaicConfig, MultiLevelModel};

#[test]
fn test_scale_value_is_ceiling_division() {
    for source in [1usize, 2, 3, 255, 256, 257, 1000, 10980, 65535] {
        for level in 0..12 {
            let divisor = 1usize << level;
            let expected = (source + divisor - 1) / divisor;
            assert_eq!(scale_value(source, level), expected, "{} >> {}", source, level);
        }
    }
}

#[test]
fn test_scale_value_monotone_in_level() {
    for source in [7usize, 513, 10980] {
        for level in 1..16 {
            assert!(scale_value(source, level) <= scale_value(source, level - 1));
            assert!(scale_value(source, level) >= 1);
        }
    }
}

#[test]
fn test_sentinel2_level_sizes() {
    let expected = [10980, 5490, 2745, 1373, 687, 344];
    for (level, size) in expected.iter().enumerate() {
        assert_eq!(scale_value(10980, level), *size);
    }
}

#[test]
fn test_huge_level_does_not_overflow() {
    assert_eq!(scale_value(10980, 64), 1);
    assert_eq!(scale_value(10980, 200), 1);
    assert_eq!(scale_value(0, 3), 0);
}

#[test]
fn test_model_level_geometry() {
    let base = AffineTransform::new(20.0, 0.0, 300_000.0, 0.0, -20.0, 4_000_000.0);
    let model = MultiLevelModel::new(6, base, 5490, 5490).unwrap();

    assert_eq!(model.level_count(), 6);
    assert_eq!(model.level_dimensions(0).unwrap(), (5490, 5490));
    assert_eq!(model.level_dimensions(5).unwrap(), (172, 172));
    assert!(model.level_dimensions(6).is_err());

    let t3 = model.image_to_model_transform(3).unwrap();
    assert_eq!(t3.scale_x, 160.0);
    assert_eq!(t3.scale_y, -160.0);
    assert_eq!(t3.translate_x, 300_000.0);

    let inv = model.model_to_image_transform(3).unwrap();
    let (x, y) = t3.transform_point(12.0, 34.0);
    let (px, py) = inv.transform_point(x, y);
    assert!((px - 12.0).abs() < 1e-9);
    assert!((py - 34.0).abs() < 1e-9);
}

#[test]
fn test_level_for_scale_clamps() {
    let model = MultiLevelModel::new(4, AffineTransform::identity(), 1024, 1024).unwrap();
    assert_eq!(model.level_for_scale(0.5), 0);
    assert_eq!(model.level_for_scale(1.0), 0);
    assert_eq!(model.level_for_scale(2.0), 1);
    assert_eq!(model.level_for_scale(5.0), 2);
    assert_eq!(model.level_for_scale(1000.0), 3);
}

#[test]
fn test_invalid_models_rejected() {
    assert!(MultiLevelModel::new(0, AffineTransform::identity(), 10, 10).is_err());
    assert!(MultiLevelModel::new(2, AffineTransform::identity(), 0, 10).is_err());
    assert!(MultiLevelModel::new(2, AffineTransform::scale(0.0, 1.0), 10, 10).is_err());
}

#[test]
fn test_preferred_tile_size() {
    let config = MosaicConfig::default();
    assert_eq!(preferred_tile_size(300, &config), 300);
    assert_eq!(preferred_tile_size(512, &config), 512);
    assert_eq!(preferred_tile_size(10980, &config), 366);
    assert_eq!(preferred_tile_size(1024, &config), 512);
}
