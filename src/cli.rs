//! Defines command-line interface options using `clap` for the remapnc application.

use clap::{Parser, Subcommand, ValueEnum};
use remapnc::polygons::BoundingBox;
use remapnc::sampler::WeightedTarget;
use std::path::PathBuf;

/// A CLI tool for conservative remapping weights and weighted series extraction
#[derive(Parser, Debug)]
#[command(
    version = "0.1.0",
    name = "remapnc",
    about = "Remapping weights between grids and polygons, and area-weighted NetCDF series"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build cell polygons from the coordinates of a NetCDF file
    Grid {
        /// Path to the NetCDF file
        #[arg(short, long)]
        file: PathBuf,

        /// Name of the latitude variable
        #[arg(long, default_value = "lat")]
        lat_var: String,

        /// Name of the longitude variable
        #[arg(long, default_value = "lon")]
        lon_var: String,

        /// Keep only cells inside a box, formatted as <minlat>,<maxlat>,<minlon>,<maxlon>
        #[arg(long = "box", value_parser = parse_box_arg)]
        bounds: Option<BoundingBox>,

        /// Shift longitudes above 180 degrees to negative values
        #[arg(long, default_value_t = false)]
        correct_360: bool,

        /// Path of the polygon JSON file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Intersect two polygon sets and write normalized weights
    Overlay {
        /// First polygon set (JSON)
        #[arg(long)]
        first: PathBuf,

        /// Second polygon set (JSON)
        #[arg(long)]
        second: PathBuf,

        /// Projection used to measure areas
        #[arg(long, value_enum, default_value_t = ProjectionArg::PlateCarree)]
        projection: ProjectionArg,

        /// Path of the weight table JSON file to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Extract and aggregate nearest-cell series from NetCDF files
    Sample {
        /// File name pattern, e.g. 'data/*_2010*.nc'
        #[arg(short, long)]
        pattern: String,

        /// Name of the variable to sample
        #[arg(long)]
        variable: String,

        /// Layout of the variable and its coordinates
        #[arg(long, value_enum, default_value_t = ShapeArg::Grid1d)]
        shape: ShapeArg,

        /// Target and weight, formatted as <lat>,<lon>,<weight>; repeatable
        #[arg(long = "target", value_parser = parse_target_arg, required = true)]
        targets: Vec<WeightedTarget>,

        #[arg(long, default_value = "time")]
        time_dim: String,

        #[arg(long, default_value = "lat")]
        lat_var: String,

        #[arg(long, default_value = "lon")]
        lon_var: String,

        #[arg(long, default_value = "lat")]
        lat_dim: String,

        #[arg(long, default_value = "lon")]
        lon_dim: String,

        /// Units of the time axis in the written file
        #[arg(long, default_value = "hours since 1900-01-01 00:00:00")]
        time_units: String,

        /// Units of the sampled variable
        #[arg(long, default_value = "1")]
        units: String,

        /// Path to save the aggregated series as NetCDF. If not set, prints to terminal.
        #[arg(long)]
        output_netcdf: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProjectionArg {
    /// Square degrees
    PlateCarree,
    /// Lambert cylindrical equal-area, square metres
    EqualArea,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShapeArg {
    /// 3-D variable, 1-D lat and lon
    Grid1d,
    /// 3-D variable, 2-D lat and lon
    Grid2d,
    /// 2-D variable over time and a flattened spatial index
    Flattened,
}

fn parse_floats(s: &str, count: usize, format: &str) -> Result<Vec<f64>, String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("Invalid number in '{s}': Expected '{format}'."))?;
    if values.len() != count {
        return Err(format!("Invalid format: Expected '{format}'."));
    }
    Ok(values)
}

fn parse_box_arg(s: &str) -> Result<BoundingBox, String> {
    let v = parse_floats(s, 4, "<minlat>,<maxlat>,<minlon>,<maxlon>")?;
    Ok(BoundingBox::new(v[0], v[1], v[2], v[3]))
}

fn parse_target_arg(s: &str) -> Result<WeightedTarget, String> {
    let v = parse_floats(s, 3, "<lat>,<lon>,<weight>")?;
    Ok(WeightedTarget::new(v[0], v[1], v[2]))
}
