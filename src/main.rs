//! Entry point for the remapnc application.
//! Handles CLI parsing, logging setup, and dispatches grid building, overlay and sampling.

use clap::Parser;
use ndarray::Array2;
use remapnc::prelude::*;
use remapnc::parallel::ParallelInfo;
use remapnc::sampler::WeightedTarget;
use std::fs;
use std::path::Path;

mod cli;

use cli::{Args, Command, ProjectionArg, ShapeArg};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    ParallelConfig::new(args.threads).setup_global_pool()?;
    ParallelInfo::current().log();

    match args.command {
        Command::Grid {
            file,
            lat_var,
            lon_var,
            bounds,
            correct_360,
            output,
        } => {
            let options = BuildOptions {
                bounds,
                correct_360,
            };
            let set = grid_from_netcdf(&file, &lat_var, &lon_var, &options)?;
            set.write_json(&output)?;
            println!("Saved {} cell polygons to {}", set.len(), output.display());
        }
        Command::Overlay {
            first,
            second,
            projection,
            output,
        } => {
            let first = PolygonSet::read_json(&first)?;
            let second = PolygonSet::read_json(&second)?;
            let options = match projection {
                ProjectionArg::PlateCarree => OverlayOptions::with_projection(PlateCarree),
                ProjectionArg::EqualArea => {
                    OverlayOptions::with_projection(LambertEqualArea::default())
                }
            };

            let result = overlay(&first, &second, &options)?;
            fs::write(&output, serde_json::to_string(&result.records)?)?;
            println!(
                "Saved {} overlap records to {}",
                result.records.len(),
                output.display()
            );
            if !result.report.is_conservative() {
                println!(
                    "Unnormalized groups: {} in {}, {} in {}",
                    result.report.degenerate_1.len(),
                    first.name,
                    result.report.degenerate_2.len(),
                    second.name
                );
            }
        }
        Command::Sample {
            pattern,
            variable,
            shape,
            targets,
            time_dim,
            lat_var,
            lon_var,
            lat_dim,
            lon_dim,
            time_units,
            units,
            output_netcdf,
        } => {
            let shape = match shape {
                ShapeArg::Grid1d => DatasetShape::Grid1d,
                ShapeArg::Grid2d => DatasetShape::Grid2d,
                ShapeArg::Flattened => DatasetShape::Flattened,
            };
            let names = FieldNames {
                variable: variable.clone(),
                time_dim,
                lat_var,
                lon_var,
                lat_dim,
                lon_dim,
            };
            let series = SeriesSampler::new(shape, names).aggregate_files(&pattern, &targets)?;

            if let Some(output_path) = output_netcdf {
                write_aggregate(&output_path, &variable, &units, &time_units, &targets, series.to_vec())?;
                println!("Saved result to {}", output_path.display());
            } else {
                println!("Aggregated series: {:?}", series);
            }
        }
    }

    Ok(())
}

/// Writes the aggregate as a single entity located at the weighted mean of its targets
fn write_aggregate(
    path: &Path,
    variable: &str,
    units: &str,
    time_units: &str,
    targets: &[WeightedTarget],
    series: Vec<f64>,
) -> Result<()> {
    let total_weight: f64 = targets.iter().map(|t| t.weight).sum();
    let (lat, lon) = if total_weight != 0.0 {
        (
            targets.iter().map(|t| t.lat * t.weight).sum::<f64>() / total_weight,
            targets.iter().map(|t| t.lon * t.weight).sum::<f64>() / total_weight,
        )
    } else {
        (targets[0].lat, targets[0].lon)
    };

    let steps = series.len();
    let output = SeriesOutput {
        variable_name: variable.to_string(),
        units: units.to_string(),
        long_name: format!("area-weighted {variable}"),
        data: Array2::from_shape_vec((1, steps), series)?,
        ids: vec![1.0],
        lat: vec![lat],
        lon: vec![lon],
        time: (0..steps).map(|t| t as f64).collect(),
        time_units: time_units.to_string(),
    };
    write_series_to_netcdf(&output, path)
}
