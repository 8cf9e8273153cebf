use ndarray::{array, Array1, Array2, Array3};
use netcdf::{create, open};
use remapnc::prelude::*;
use remapnc::sampler::WeightedTarget;
use std::path::Path;
use tempfile::tempdir;

/// Writes a `pr(time, lat, lon)` file whose values encode
/// `1000 * year_offset + 100 * time + 10 * lat_index + lon_index`.
fn write_forcing_file(path: &Path, year_offset: usize, steps: usize) {
    let lat = array![10.0, 20.0, 30.0];
    let lon = array![100.0, 110.0, 120.0, 130.0];

    let mut file = create(path).expect("Failed to create NetCDF file");
    file.add_dimension("time", steps)
        .expect("Failed to add dimension time");
    file.add_dimension("lat", lat.len())
        .expect("Failed to add dimension lat");
    file.add_dimension("lon", lon.len())
        .expect("Failed to add dimension lon");

    let mut lat_var = file
        .add_variable::<f64>("lat", &["lat"])
        .expect("Failed to add lat");
    lat_var.put(lat.view(), ..).expect("Failed to write lat");
    let mut lon_var = file
        .add_variable::<f64>("lon", &["lon"])
        .expect("Failed to add lon");
    lon_var.put(lon.view(), ..).expect("Failed to write lon");

    let data = Array3::from_shape_fn((steps, lat.len(), lon.len()), |(t, i, j)| {
        (1000 * year_offset + 100 * t + 10 * i + j) as f64
    });
    let mut pr = file
        .add_variable::<f64>("pr", &["time", "lat", "lon"])
        .expect("Failed to add pr");
    pr.put(data.view(), ..).expect("Failed to write pr");
}

#[test]
fn test_sample_files_concatenates_in_lexical_order() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    // Written out of order on purpose
    write_forcing_file(&temp_dir.path().join("data_2001.nc"), 1, 2);
    write_forcing_file(&temp_dir.path().join("data_2000.nc"), 0, 3);

    let pattern = format!("{}/data_*.nc", temp_dir.path().display());
    let sampler = SeriesSampler::new(DatasetShape::Grid1d, FieldNames::standard("pr"));
    let series = sampler.sample_files(&pattern, 19.0, 122.0).unwrap();

    // lat index 1, lon index 2
    assert_eq!(series, array![12.0, 112.0, 212.0, 1012.0, 1112.0]);
}

#[test]
fn test_aggregate_files_weights_targets() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_forcing_file(&temp_dir.path().join("data_2000.nc"), 0, 2);

    let pattern = format!("{}/*.nc", temp_dir.path().display());
    let sampler = SeriesSampler::new(DatasetShape::Grid1d, FieldNames::standard("pr"));
    let targets = [
        WeightedTarget::new(10.0, 100.0, 0.5),
        WeightedTarget::new(30.0, 130.0, 0.5),
    ];
    let series = sampler.aggregate_files(&pattern, &targets).unwrap();

    // 0.5 * (0, 100) + 0.5 * (23, 123)
    let expected = array![11.5, 111.5];
    for (a, b) in series.iter().zip(expected.iter()) {
        assert!((a - b).abs() < 1e-12);
    }
}

#[test]
fn test_pattern_without_matches() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let pattern = format!("{}/missing_*.nc", temp_dir.path().display());

    let sampler = SeriesSampler::new(DatasetShape::Grid1d, FieldNames::standard("pr"));
    let err = sampler.sample_files(&pattern, 0.0, 0.0).unwrap_err();
    assert!(matches!(err, RemapError::NoData { .. }));
}

#[test]
fn test_grid_from_netcdf_builds_interior_cells() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("forcing.nc");
    write_forcing_file(&file_path, 0, 1);

    let set = grid_from_netcdf(&file_path, "lat", "lon", &BuildOptions::default()).unwrap();
    // 4 lon rows x 3 lat cols -> 2 x 1 interior cells
    assert_eq!(set.name, "forcing");
    assert_eq!(set.len(), 2);
    assert_eq!(set.polygons[0].center(), Some((20.0, 110.0)));
    assert_eq!(set.polygons[1].center(), Some((20.0, 120.0)));

    let err = grid_from_netcdf(&file_path, "latitude", "lon", &BuildOptions::default()).unwrap_err();
    assert!(matches!(err, RemapError::MissingField { .. }));
}

#[test]
fn test_polygon_set_json_round_trip_feeds_overlay() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("forcing.nc");
    write_forcing_file(&file_path, 0, 1);

    let set = grid_from_netcdf(&file_path, "lat", "lon", &BuildOptions::default()).unwrap();
    let json_path = temp_dir.path().join("forcing.json");
    set.write_json(&json_path).unwrap();
    let restored = PolygonSet::read_json(&json_path).unwrap();
    assert_eq!(restored.len(), set.len());

    let result = overlay(&restored, &restored, &OverlayOptions::default()).unwrap();
    // Identical meshes only overlap cell-for-cell
    assert_eq!(result.records.len(), 2);
    for r in &result.records {
        assert_eq!(r.cell_id_1, r.cell_id_2);
        assert!((r.frac_1_normalized - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_write_series_round_trip() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("series.nc");

    let data = Array2::from_shape_fn((2, 3), |(n, t)| (10 * n + t) as f64);
    let output = SeriesOutput {
        variable_name: "pr".to_string(),
        units: "mm".to_string(),
        long_name: "precipitation".to_string(),
        data: data.clone(),
        ids: vec![1.0, 2.0],
        lat: vec![45.0, 46.0],
        lon: vec![-75.0, -74.0],
        time: vec![0.0, 1.0, 2.0],
        time_units: "hours since 2000-01-01 00:00:00".to_string(),
    };
    // Writing twice replaces the file
    write_series_to_netcdf(&output, &file_path).unwrap();
    write_series_to_netcdf(&output, &file_path).unwrap();

    let file = open(&file_path).expect("Failed to open NetCDF file");
    assert_eq!(file.dimension("n").map(|d| d.len()), Some(2));
    assert_eq!(file.dimension("time").map(|d| d.len()), Some(3));

    let pr = file.variable("pr").expect("Variable not found");
    let values = pr.get::<f64, _>(..).expect("Failed to read pr");
    assert_eq!(values, data.into_dyn());

    let ids: Array1<f64> = Array1::from(
        file.variable("ID")
            .expect("Variable not found")
            .get_values::<f64, _>(..)
            .expect("Failed to read ID"),
    );
    assert_eq!(ids, array![1.0, 2.0]);

    let conventions = file
        .attribute("Conventions")
        .expect("Attribute not found")
        .value()
        .expect("Failed to read attribute");
    assert!(matches!(conventions, netcdf::AttributeValue::Str(ref s) if s == "CF-1.6"));
}

#[test]
fn test_write_series_rejects_mismatched_lengths() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let output = SeriesOutput {
        variable_name: "pr".to_string(),
        units: "mm".to_string(),
        long_name: "precipitation".to_string(),
        data: Array2::zeros((2, 3)),
        ids: vec![1.0],
        lat: vec![45.0, 46.0],
        lon: vec![-75.0, -74.0],
        time: vec![0.0, 1.0, 2.0],
        time_units: "hours since 2000-01-01 00:00:00".to_string(),
    };
    let err = write_series_to_netcdf(&output, &temp_dir.path().join("bad.nc")).unwrap_err();
    assert!(matches!(err, RemapError::ShapeMismatch { .. }));
}

#[test]
fn test_missing_time_dimension_in_files() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    write_forcing_file(&temp_dir.path().join("data_2000.nc"), 0, 2);

    let mut names = FieldNames::standard("pr");
    names.time_dim = "t".to_string();
    let pattern = format!("{}/*.nc", temp_dir.path().display());
    let err = SeriesSampler::new(DatasetShape::Grid1d, names)
        .sample_files(&pattern, 10.0, 100.0)
        .unwrap_err();
    assert!(matches!(err, RemapError::MissingField { ref field, .. } if field == "t"));
}

#[test]
fn test_netcdf_source_dimension_len() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("forcing.nc");
    write_forcing_file(&file_path, 0, 5);

    let source = NetcdfSource::open(&file_path).unwrap();
    assert_eq!(source.dimension_len("time").unwrap(), 5);
    assert_eq!(source.dimension_len("lon").unwrap(), 4);
    assert!(matches!(
        source.dimension_len("depth"),
        Err(RemapError::MissingField { .. })
    ));
}
