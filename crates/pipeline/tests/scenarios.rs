//! End-to-end composites over small synthetic regions.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use std::sync::Arc;
use terraveg_core::io::write_geotiff;
use terraveg_core::{GeoTransform, MultiBandRaster, Raster, Region, RgbImage};
use terraveg_pipeline::{
    CompositePipeline, CompositeProducts, DisplayLayer, PipelineConfig, Scene, SceneCatalog,
    SceneManifest,
};

const CELL: f64 = 30.0;

fn georef(mut raster: Raster<f64>) -> Raster<f64> {
    let rows = raster.rows() as f64;
    raster.set_transform(GeoTransform::new(0.0, rows * CELL, CELL, -CELL));
    raster
}

fn region_for(rows: usize, cols: usize) -> Region {
    Region::from_bbox(0.0, 0.0, cols as f64 * CELL, rows as f64 * CELL).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn scene(id: &str, acquired: NaiveDate, cloud: f64, red: Raster<f64>, nir: Raster<f64>) -> Scene {
    Scene {
        id: id.to_string(),
        acquired,
        cloud_cover: cloud,
        bands: MultiBandRaster::new(vec![("B4", red), ("B8", nir)]).unwrap(),
    }
}

fn hilly_dem(rows: usize, cols: usize) -> Raster<f64> {
    georef(Raster::from_array(ndarray::Array2::from_shape_fn((rows, cols), |(r, c)| {
        let (x, y) = (c as f64, r as f64);
        100.0 + 12.0 * (x * 0.7).sin() + 8.0 * (y * 0.5).cos() + 3.0 * x
    })))
}

fn run(catalog: SceneCatalog, region: &Region) -> CompositeProducts {
    CompositePipeline::new(PipelineConfig::default(), Arc::new(catalog))
        .unwrap()
        .run(region)
        .unwrap()
}

fn assert_same_image(a: &RgbImage, b: &RgbImage) {
    for (x, y) in a.bands().iter().zip(b.bands()) {
        assert_eq!(x.shape(), y.shape());
        for (u, v) in x.data().iter().zip(y.data().iter()) {
            assert!(u == v || (u.is_nan() && v.is_nan()), "{u} != {v}");
        }
    }
}

#[test]
fn flat_dem_renders_uniform_gray() {
    let dem = georef(Raster::filled(8, 8, 250.0));
    let products = run(SceneCatalog::new().with_elevation(dem), &region_for(8, 8));

    let bounds = products.bounds.expect("bounds defined over a valid DEM");
    assert!(bounds.is_degenerate());

    let gray = 0.5_f64.powf(1.2);
    for row in 0..8 {
        for col in 0..8 {
            let [r, g, b] = products.composite.pixel(row, col).unwrap().unwrap();
            assert_relative_eq!(r, gray, epsilon = 1e-9);
            assert_relative_eq!(g, gray, epsilon = 1e-9);
            assert_relative_eq!(b, gray, epsilon = 1e-9);
            assert_eq!(products.slope.get(row, col).unwrap(), 0.0);
        }
    }
}

#[test]
fn alpha_follows_vegetation_index() {
    let red = georef(Raster::from_vec(vec![1.0, 3.0, 1.0, 1.0, 0.0], 1, 5).unwrap());
    let nir = georef(Raster::from_vec(vec![0.0, 1.0, 1.0, 3.0, 1.0], 1, 5).unwrap());
    let catalog = SceneCatalog::new()
        .with_elevation(georef(Raster::filled(1, 5, 10.0)))
        .with_scene(scene("s", date(2023, 5, 1), 2.0, red, nir));

    let products = run(catalog, &region_for(1, 5));

    let ndvi = [-1.0, -0.5, 0.0, 0.5, 1.0];
    let alpha = [0.0, 0.0, 0.0, 0.35 / 0.6 * 0.55, 0.55];
    for col in 0..5 {
        assert_relative_eq!(products.vegetation_index.get(0, col).unwrap(), ndvi[col], epsilon = 1e-12);
        assert_relative_eq!(products.alpha.get(0, col).unwrap(), alpha[col], epsilon = 1e-12);
    }
    assert_relative_eq!(products.alpha.get(0, 3).unwrap(), 0.3208, epsilon = 1e-4);

    let base = products.terrain_rgb.pixel(0, 0).unwrap().unwrap();
    assert_eq!(products.composite.pixel(0, 0).unwrap().unwrap(), base);

    // Dense vegetation: 55% pure green over the base
    let base = products.terrain_rgb.pixel(0, 4).unwrap().unwrap();
    let [r, g, b] = products.composite.pixel(0, 4).unwrap().unwrap();
    assert_relative_eq!(r, 0.45 * base[0], epsilon = 1e-9);
    assert_relative_eq!(g, 0.55 + 0.45 * base[1], epsilon = 1e-9);
    assert_relative_eq!(b, 0.45 * base[2], epsilon = 1e-9);
}

#[test]
fn empty_collection_leaves_terrain_untouched() {
    let (rows, cols) = (10, 12);
    let ones = georef(Raster::filled(rows, cols, 1.0));
    let catalog = SceneCatalog::new()
        .with_elevation(hilly_dem(rows, cols))
        .with_scene(scene("cloudy", date(2023, 6, 1), 85.0, ones.clone(), ones.clone()))
        .with_scene(scene("too-early", date(2022, 6, 1), 0.0, ones.clone(), ones));

    let products = run(catalog, &region_for(rows, cols));

    assert_eq!(products.vegetation_index.valid_count(), 0);
    assert_eq!(products.alpha.valid_count(), 0);
    assert_same_image(&products.composite, &products.terrain_rgb);
}

#[test]
fn median_composite_feeds_the_index() {
    let band = |v: f64| georef(Raster::filled(2, 2, v));
    let catalog = SceneCatalog::new()
        .with_elevation(georef(Raster::filled(2, 2, 5.0)))
        .with_scene(scene("a", date(2023, 2, 1), 1.0, band(0.1), band(0.5)))
        .with_scene(scene("b", date(2023, 4, 1), 5.0, band(0.2), band(0.9)))
        .with_scene(scene("c", date(2023, 8, 1), 9.0, band(0.6), band(0.6)))
        .with_scene(scene("cloudy", date(2023, 9, 1), 50.0, band(0.9), band(0.0)));

    let products = run(catalog, &region_for(2, 2));

    // median red 0.2, median nir 0.6
    let expected = (0.6 - 0.2) / (0.6 + 0.2);
    assert_relative_eq!(products.vegetation_index.get(1, 1).unwrap(), expected, epsilon = 1e-12);
}

#[test]
fn cells_outside_region_are_nodata() {
    let (rows, cols) = (6, 6);
    let band = |v: f64| georef(Raster::filled(rows, cols, v));
    let catalog = SceneCatalog::new()
        .with_elevation(hilly_dem(rows, cols))
        .with_scene(scene("a", date(2023, 2, 1), 1.0, band(0.1), band(0.8)));

    // Left half of the grid
    let region = Region::from_bbox(0.0, 0.0, 3.0 * CELL, 6.0 * CELL).unwrap();
    let products = run(catalog, &region);

    for row in 0..rows {
        assert!(products.composite.pixel(row, 1).unwrap().is_some());
        assert!(products.composite.pixel(row, 4).unwrap().is_none());
        assert!(products.vegetation_index.get(row, 5).unwrap().is_nan());
    }
    assert!(products.bounds.unwrap().samples <= rows * 3);
}

#[test]
fn sun_position_changes_the_base() {
    let dem = hilly_dem(8, 8);
    let region = region_for(8, 8);
    let west = run(SceneCatalog::new().with_elevation(dem.clone()), &region);

    let mut config = PipelineConfig::default();
    config.terrain.sun_azimuth = 90.0;
    let east = CompositePipeline::new(config, Arc::new(SceneCatalog::new().with_elevation(dem)))
        .unwrap()
        .run(&region)
        .unwrap();

    assert_ne!(west.hillshade.data(), east.hillshade.data());
    assert_eq!(west.slope.data(), east.slope.data());
}

#[test]
fn display_layers_and_legend() {
    let products = run(SceneCatalog::new().with_elevation(hilly_dem(4, 4)), &region_for(4, 4));

    let ndvi = products.display_layer(DisplayLayer::Vegetation);
    assert!(ndvi.chunks(4).all(|px| px[3] == 0));
    let aspect = products.display_layer(DisplayLayer::Aspect);
    assert!(aspect.chunks(4).all(|px| px[3] == 255));

    let json = products.metadata.to_json().unwrap();
    assert!(json.contains("Hue = Aspect • Saturation = Slope • Value = Hillshade"));
    let value_bounds = products.metadata.encoding.value_bounds.unwrap();
    let bounds = products.bounds.unwrap();
    assert_eq!(value_bounds, (bounds.low, bounds.high));
}

#[test]
fn manifest_on_disk_drives_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let band = |v: f64| georef(Raster::filled(3, 3, v));
    write_geotiff(&hilly_dem(3, 3), dir.path().join("dem.tif"), None).unwrap();
    write_geotiff(&band(0.25), dir.path().join("a_B4.tif"), None).unwrap();
    write_geotiff(&band(0.75), dir.path().join("a_B8.tif"), None).unwrap();

    let manifest_path = dir.path().join("scenes.toml");
    std::fs::write(
        &manifest_path,
        r#"
elevation = "dem.tif"

[[scene]]
id = "a"
date = "2023-07-04"
cloud_cover = 2.0

[scene.bands]
B4 = "a_B4.tif"
B8 = "a_B8.tif"
"#,
    )
    .unwrap();

    let catalog = SceneManifest::from_file(&manifest_path).unwrap().load().unwrap();
    assert_eq!(catalog.scenes().len(), 1);

    let products = run(catalog, &region_for(3, 3));
    assert_relative_eq!(products.vegetation_index.get(1, 1).unwrap(), 0.5, epsilon = 1e-6);
}

#[test]
fn projected_rasters_on_disk_keep_their_footprint() {
    // UTM-like origin, far from (0, 0)
    let transform = GeoTransform::new(500_000.0, 4_100_180.0, CELL, -CELL);
    let at_origin = |mut r: Raster<f64>| {
        r.set_transform(transform);
        r
    };

    let dir = tempfile::tempdir().unwrap();
    write_geotiff(&at_origin(hilly_dem(6, 6)), dir.path().join("dem.tif"), None).unwrap();
    write_geotiff(&at_origin(Raster::filled(6, 6, 0.1)), dir.path().join("s_B4.tif"), None).unwrap();
    write_geotiff(&at_origin(Raster::filled(6, 6, 0.7)), dir.path().join("s_B8.tif"), None).unwrap();

    let manifest = SceneManifest::from_toml_str(
        r#"
elevation = "dem.tif"

[[scene]]
id = "s"
date = "2023-03-14"
cloud_cover = 4.0

[scene.bands]
B4 = "s_B4.tif"
B8 = "s_B8.tif"
"#,
        dir.path(),
    )
    .unwrap();
    let catalog = manifest.load().unwrap();

    let footprint = Region::from_bbox(500_000.0, 4_100_000.0, 500_180.0, 4_100_180.0).unwrap();
    let products = run(catalog, &footprint);

    assert_eq!(products.slope.transform(), &transform);
    assert_eq!(products.slope.shape(), (6, 6));
    assert_eq!(products.hillshade.valid_count(), 36);
    assert!(!products.bounds.unwrap().is_degenerate());
    for row in 0..6 {
        for col in 0..6 {
            assert!(products.composite.pixel(row, col).unwrap().is_some());
        }
    }
    assert_relative_eq!(products.vegetation_index.get(3, 3).unwrap(), 0.75, epsilon = 1e-6);
}
