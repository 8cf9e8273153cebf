//! NetCDF I/O: dataset reading for the sampler, grid construction from
//! coordinate variables, and writing of aggregated series.

use crate::cells::{build_cell_polygons, BuildOptions};
use crate::errors::{RemapError, Result};
use crate::grid::CoordinateGrid;
use crate::polygons::PolygonSet;
use crate::sampler::{GriddedSource, NamedArray};
use chrono::Utc;
use ndarray::{Array2, ArrayD};
use netcdf::{create, File};
use std::{fs, path::Path};

/// A NetCDF file opened for reading; the file is closed when this is dropped
pub struct NetcdfSource {
    file: File,
    name: String,
}

impl NetcdfSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = netcdf::open(path)?;
        Ok(Self {
            file,
            name: path.display().to_string(),
        })
    }

    /// Length of a named dimension
    pub fn dimension_len(&self, name: &str) -> Result<usize> {
        self.file
            .dimension(name)
            .map(|d| d.len())
            .ok_or_else(|| RemapError::missing(name, &self.name))
    }
}

impl GriddedSource for NetcdfSource {
    fn source_name(&self) -> String {
        self.name.clone()
    }

    fn read_variable(&self, name: &str) -> Result<NamedArray> {
        let var = self
            .file
            .variable(name)
            .ok_or_else(|| RemapError::missing(name, &self.name))?;

        let dims: Vec<String> = var
            .dimensions()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        let shape: Vec<usize> = var
            .dimensions()
            .iter()
            .map(netcdf::Dimension::len)
            .collect();
        let values = var.get_values::<f64, _>(..)?;

        Ok(NamedArray {
            dims,
            data: ArrayD::from_shape_vec(shape, values)?,
        })
    }
}

/// Builds the cell polygons of the grid stored in a NetCDF file.
///
/// 1-D coordinate variables are expanded to a full grid first; 2-D
/// coordinates are used as they are.
pub fn grid_from_netcdf(
    path: &Path,
    lat_var: &str,
    lon_var: &str,
    options: &BuildOptions,
) -> Result<PolygonSet> {
    let source = NetcdfSource::open(path)?;
    let lat = source.read_variable(lat_var)?;
    let lon = source.read_variable(lon_var)?;
    let grid = CoordinateGrid::from_dyn(lat.data, lon.data)?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| source.source_name());
    tracing::info!(file = %path.display(), shape = ?grid.shape(), "building grid polygons");
    build_cell_polygons(&grid, &name, options)
}

/// An aggregated series per entity, ready to be written
#[derive(Debug, Clone)]
pub struct SeriesOutput {
    pub variable_name: String,
    pub units: String,
    pub long_name: String,
    /// Values with shape `[n, time]`
    pub data: Array2<f64>,
    pub ids: Vec<f64>,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    /// Time offsets, one per column of `data`
    pub time: Vec<f64>,
    /// CF units of the time axis, e.g. `"hours since 2010-01-01 00:00:00"`
    pub time_units: String,
}

impl SeriesOutput {
    fn check_shape(&self) -> Result<()> {
        let (n, t) = self.data.dim();
        for (len, expected) in [
            (self.ids.len(), n),
            (self.lat.len(), n),
            (self.lon.len(), n),
            (self.time.len(), t),
        ] {
            if len != expected {
                return Err(RemapError::ShapeMismatch {
                    expected: vec![n, t],
                    found: vec![len],
                });
            }
        }
        Ok(())
    }
}

/// Writes an aggregated series as a CF-1.6 NetCDF file with dimensions
/// `n` and unlimited `time`, replacing any existing file.
pub fn write_series_to_netcdf(output: &SeriesOutput, path: &Path) -> Result<()> {
    output.check_shape()?;
    let (n, t) = output.data.dim();

    if path.exists() {
        fs::remove_file(path)?;
    }
    let mut file = create(path)?;

    file.add_dimension("n", n)?;
    file.add_unlimited_dimension("time")?;

    let mut time_var = file.add_variable::<f64>("time", &["time"])?;
    time_var.put_attribute("long_name", "time")?;
    time_var.put_attribute("units", output.time_units.as_str())?;
    time_var.put_attribute("calendar", "gregorian")?;
    time_var.put_attribute("standard_name", "time")?;
    time_var.put_attribute("axis", "T")?;
    time_var.put_values(output.time.as_slice(), 0..t)?;

    for (name, long_name, units, values) in [
        ("lat", "latitude", "degrees_north", &output.lat),
        ("lon", "longitude", "degrees_east", &output.lon),
        ("ID", "ID", "1", &output.ids),
    ] {
        let mut var = file.add_variable::<f64>(name, &["n"])?;
        var.put_attribute("long_name", long_name)?;
        var.put_attribute("units", units)?;
        if name != "ID" {
            var.put_attribute("standard_name", long_name)?;
        }
        var.put_values(values.as_slice(), ..)?;
    }

    let mut data_var = file.add_variable::<f64>(&output.variable_name, &["n", "time"])?;
    data_var.put_attribute("long_name", output.long_name.as_str())?;
    data_var.put_attribute("units", output.units.as_str())?;
    data_var.put(output.data.view(), (0..n, 0..t))?;

    file.add_attribute("Conventions", "CF-1.6")?;
    file.add_attribute(
        "history",
        format!("Created by remapnc on {}", Utc::now().to_rfc3339()),
    )?;

    tracing::info!(file = %path.display(), entities = n, steps = t, "wrote series");
    Ok(())
}
