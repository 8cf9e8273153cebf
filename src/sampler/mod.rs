//! Nearest-cell time series extraction and weighted aggregation
//!
//! For each target coordinate the sampler finds the nearest grid cell, pulls
//! the time series at that cell whatever the position of the time axis, and
//! sums the series of several targets with their weights. Multi-file datasets
//! are read one file at a time in lexical file-name order and concatenated
//! along time; files are assumed to cover disjoint, ordered time ranges.
//!
//! # Organization
//!
//! - [`source`]: the [`GriddedSource`] trait and an in-memory implementation

pub mod source;

pub use source::{GriddedSource, MemorySource, NamedArray};

use crate::errors::{RemapError, Result};
use crate::netcdf_io::NetcdfSource;
use ndarray::{Array1, ArrayView1, ArrayViewD, Axis, Dimension, Ix1};
use std::collections::HashMap;
use std::path::PathBuf;

/// Layout of the sampled variable and its coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetShape {
    /// 3-D variable with 1-D latitude and longitude; each axis searched on its own
    Grid1d,
    /// 3-D variable with 2-D latitude and longitude; joint search over both axes
    Grid2d,
    /// 2-D variable over time and a flattened spatial index with 1-D coordinates
    Flattened,
}

/// Variable and dimension names of the sampled dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    pub variable: String,
    pub time_dim: String,
    pub lat_var: String,
    pub lon_var: String,
    pub lat_dim: String,
    pub lon_dim: String,
}

impl FieldNames {
    /// Names for the common `time`, `lat`, `lon` layout
    pub fn standard(variable: &str) -> Self {
        Self {
            variable: variable.to_string(),
            time_dim: "time".to_string(),
            lat_var: "lat".to_string(),
            lon_var: "lon".to_string(),
            lat_dim: "lat".to_string(),
            lon_dim: "lon".to_string(),
        }
    }
}

/// A target location with its aggregation weight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedTarget {
    pub lat: f64,
    pub lon: f64,
    pub weight: f64,
}

impl WeightedTarget {
    pub fn new(lat: f64, lon: f64, weight: f64) -> Self {
        Self { lat, lon, weight }
    }
}

/// Index of the value closest to `target`; the first one wins on ties.
/// NaN entries are never selected.
pub fn nearest_index(values: ArrayView1<f64>, target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        let d = (v - target).abs();
        if d.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// Multi-dimensional index minimizing `|lat - lat_t| + |lon - lon_t|`
pub fn nearest_index_joint(
    lat: ArrayViewD<f64>,
    lon: ArrayViewD<f64>,
    lat_target: f64,
    lon_target: f64,
) -> Result<Option<Vec<usize>>> {
    if lat.shape() != lon.shape() {
        return Err(RemapError::ShapeMismatch {
            expected: lat.shape().to_vec(),
            found: lon.shape().to_vec(),
        });
    }

    let mut best: Option<(Vec<usize>, f64)> = None;
    for ((idx, &la), &lo) in lat.indexed_iter().zip(lon.iter()) {
        let d = (la - lat_target).abs() + (lo - lon_target).abs();
        if d.is_nan() {
            continue;
        }
        if best.as_ref().map_or(true, |(_, bd)| d < *bd) {
            best = Some((idx.slice().to_vec(), d));
        }
    }
    Ok(best.map(|(i, _)| i))
}

/// Pull the series along `time_dim`, fixing every other axis.
///
/// Axes missing from `fixed` must have length one.
pub fn extract_series(
    array: &NamedArray,
    time_dim: &str,
    fixed: &HashMap<String, usize>,
) -> Result<Array1<f64>> {
    let time_axis = array
        .axis_of(time_dim)
        .ok_or_else(|| RemapError::missing(time_dim, "variable dimensions"))?;

    let mut view = array.data.view();
    for axis in (0..array.dims.len()).rev() {
        if axis == time_axis {
            continue;
        }
        let name = &array.dims[axis];
        let len = array.data.len_of(Axis(axis));
        let index = match fixed.get(name) {
            Some(&i) => i,
            None if len == 1 => 0,
            None => {
                return Err(RemapError::InvalidArgument(format!(
                    "no index for dimension '{name}' of length {len}"
                )))
            }
        };
        if index >= len {
            return Err(RemapError::InvalidArgument(format!(
                "index {index} out of range for dimension '{name}' of length {len}"
            )));
        }
        view = view.index_axis_move(Axis(axis), index);
    }

    Ok(view.to_owned().into_dimensionality::<Ix1>()?)
}

/// Coordinate variables read once per source and shared by all targets
#[derive(Debug, Clone)]
pub struct GridCoordinates {
    pub lat: NamedArray,
    pub lon: NamedArray,
    source_name: String,
}

/// Samples one variable of a gridded dataset at target locations
#[derive(Debug, Clone)]
pub struct SeriesSampler {
    pub shape: DatasetShape,
    pub names: FieldNames,
}

impl SeriesSampler {
    pub fn new(shape: DatasetShape, names: FieldNames) -> Self {
        Self { shape, names }
    }

    /// Latitude and longitude coordinate variables of one source
    pub fn read_coordinates(&self, source: &dyn GriddedSource) -> Result<GridCoordinates> {
        Ok(GridCoordinates {
            lat: source.read_variable(&self.names.lat_var)?,
            lon: source.read_variable(&self.names.lon_var)?,
            source_name: source.source_name(),
        })
    }

    /// Dimension name to index of the grid cell nearest to the target
    pub fn locate(
        &self,
        source: &dyn GriddedSource,
        lat_target: f64,
        lon_target: f64,
    ) -> Result<HashMap<String, usize>> {
        let coords = self.read_coordinates(source)?;
        self.locate_in(&coords, lat_target, lon_target)
    }

    /// Like [`SeriesSampler::locate`], over coordinates already read
    pub fn locate_in(
        &self,
        coords: &GridCoordinates,
        lat_target: f64,
        lon_target: f64,
    ) -> Result<HashMap<String, usize>> {
        let no_cell = || {
            RemapError::InvalidArgument(format!(
                "no finite coordinates in {}",
                coords.source_name
            ))
        };

        let mut fixed = HashMap::new();
        match self.shape {
            DatasetShape::Grid1d => {
                let lat_values = coords.lat.data.view().into_dimensionality::<Ix1>()?;
                let lon_values = coords.lon.data.view().into_dimensionality::<Ix1>()?;
                let i = nearest_index(lat_values, lat_target).ok_or_else(no_cell)?;
                let j = nearest_index(lon_values, lon_target).ok_or_else(no_cell)?;
                fixed.insert(self.names.lat_dim.clone(), i);
                fixed.insert(self.names.lon_dim.clone(), j);
            }
            DatasetShape::Grid2d | DatasetShape::Flattened => {
                let index = nearest_index_joint(
                    coords.lat.data.view(),
                    coords.lon.data.view(),
                    lat_target,
                    lon_target,
                )?
                .ok_or_else(no_cell)?;
                for (dim, i) in coords.lat.dims.iter().zip(index) {
                    fixed.insert(dim.clone(), i);
                }
            }
        }
        Ok(fixed)
    }

    /// Time series of one source at the cell nearest to the target
    pub fn sample(
        &self,
        source: &dyn GriddedSource,
        lat_target: f64,
        lon_target: f64,
    ) -> Result<Array1<f64>> {
        let fixed = self.locate(source, lat_target, lon_target)?;
        let data = self.read_data(source)?;
        extract_series(&data, &self.names.time_dim, &fixed)
    }

    /// Weighted sum of the series at every target: `Σ series_i * w_i`
    pub fn aggregate(
        &self,
        source: &dyn GriddedSource,
        targets: &[WeightedTarget],
    ) -> Result<Array1<f64>> {
        let coords = self.read_coordinates(source)?;
        let data = self.read_data(source)?;
        let series = self.series_at_targets(&coords, &data, targets)?;
        weighted_sum(&series, targets)
    }

    /// Series at one target across every file matching `pattern`
    pub fn sample_files(&self, pattern: &str, lat_target: f64, lon_target: f64) -> Result<Array1<f64>> {
        self.aggregate_files(pattern, &[WeightedTarget::new(lat_target, lon_target, 1.0)])
    }

    /// Weighted sum across every file matching `pattern`, concatenated in
    /// lexical file-name order
    pub fn aggregate_files(&self, pattern: &str, targets: &[WeightedTarget]) -> Result<Array1<f64>> {
        let paths = matching_files(pattern)?;

        let mut per_target: Vec<Vec<f64>> = vec![Vec::new(); targets.len()];
        for path in &paths {
            // One file open at a time
            let source = NetcdfSource::open(path)?;
            let steps = source.dimension_len(&self.names.time_dim)?;
            let coords = self.read_coordinates(&source)?;
            let data = self.read_data(&source)?;

            for (series, extracted) in per_target
                .iter_mut()
                .zip(self.series_at_targets(&coords, &data, targets)?)
            {
                if extracted.len() != steps {
                    return Err(RemapError::ShapeMismatch {
                        expected: vec![steps],
                        found: vec![extracted.len()],
                    });
                }
                series.extend(extracted.iter().copied());
            }
            tracing::debug!(file = %path.display(), steps, "sampled file");
        }

        let series: Vec<Array1<f64>> = per_target.into_iter().map(Array1::from_vec).collect();
        tracing::info!(files = paths.len(), targets = targets.len(), "aggregated series");
        weighted_sum(&series, targets)
    }

    fn series_at_targets(
        &self,
        coords: &GridCoordinates,
        data: &NamedArray,
        targets: &[WeightedTarget],
    ) -> Result<Vec<Array1<f64>>> {
        targets
            .iter()
            .map(|target| {
                let fixed = self.locate_in(coords, target.lat, target.lon)?;
                extract_series(data, &self.names.time_dim, &fixed)
            })
            .collect()
    }

    fn read_data(&self, source: &dyn GriddedSource) -> Result<NamedArray> {
        let data = source.read_variable(&self.names.variable)?;
        if data.axis_of(&self.names.time_dim).is_none() {
            return Err(RemapError::missing(
                &self.names.time_dim,
                format!("{} variable '{}'", source.source_name(), self.names.variable),
            ));
        }
        if self.shape == DatasetShape::Grid1d {
            for dim in [&self.names.lat_dim, &self.names.lon_dim] {
                if data.axis_of(dim).is_none() {
                    return Err(RemapError::missing(
                        dim,
                        format!("{} variable '{}'", source.source_name(), self.names.variable),
                    ));
                }
            }
        }
        Ok(data)
    }
}

/// Files matching a glob pattern, sorted lexically
pub fn matching_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = glob::glob(pattern)?.filter_map(|p| p.ok()).collect();
    paths.sort();
    if paths.is_empty() {
        return Err(RemapError::NoData {
            pattern: pattern.to_string(),
        });
    }
    Ok(paths)
}

fn weighted_sum(series: &[Array1<f64>], targets: &[WeightedTarget]) -> Result<Array1<f64>> {
    let Some(first) = series.first() else {
        return Err(RemapError::InvalidArgument("no targets to aggregate".to_string()));
    };
    let mut total = Array1::<f64>::zeros(first.len());
    for (s, target) in series.iter().zip(targets) {
        if s.len() != total.len() {
            return Err(RemapError::ShapeMismatch {
                expected: vec![total.len()],
                found: vec![s.len()],
            });
        }
        total.scaled_add(target.weight, s);
    }
    Ok(total)
}
