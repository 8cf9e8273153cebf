//! remapnc: conservative areal remapping between gridded and polygon meshes
//!
//! remapnc derives cell polygons from the center coordinates of a (regular or
//! curvilinear) grid, intersects them with another polygon mesh and turns the
//! overlap areas into weights that redistribute a field between the meshes
//! while conserving its total. It also extracts nearest-cell time series from
//! NetCDF datasets and aggregates several of them with area weights.
//!
//! ## Module Organization
//!
//! - [`grid`]: expansion of 1-D coordinate vectors into 2-D grids
//! - [`cells`]: cell polygon construction from cell centers
//! - [`polygons`]: polygon sets, attribute bags and bounding boxes
//! - [`projection`]: area projections applied before measuring
//! - [`overlay`]: repaired, index-accelerated pairwise intersection
//! - [`weights`]: dual normalization of overlap fractions
//! - [`sampler`]: nearest-cell series extraction and weighted aggregation
//! - [`netcdf_io`]: NetCDF reading and series writing
//! - [`parallel`]: parallel processing configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage Example
//! ```rust,no_run
//! use remapnc::prelude::*;
//! use std::path::Path;
//!
//! let source = grid_from_netcdf(
//!     Path::new("forcing.nc"),
//!     "lat",
//!     "lon",
//!     &BuildOptions::default().with_correct_360(true),
//! ).unwrap();
//! let catchments = PolygonSet::read_json(Path::new("catchments.json")).unwrap();
//!
//! let result = overlay(&source, &catchments, &OverlayOptions::with_projection(LambertEqualArea::default())).unwrap();
//! assert!(result.report.is_conservative());
//! ```

pub mod cells;
pub mod errors;
pub mod grid;
pub mod netcdf_io;
pub mod overlay;
pub mod parallel;
pub mod polygons;
pub mod projection;
pub mod sampler;
pub mod weights;

pub use errors::{RemapError, Result};

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::cells::{build_cell_polygons, BuildOptions};
    pub use crate::errors::{RemapError, Result};
    pub use crate::grid::{expand_coordinates, CoordinateGrid};
    pub use crate::netcdf_io::{grid_from_netcdf, write_series_to_netcdf, NetcdfSource, SeriesOutput};
    pub use crate::overlay::{intersect_sets, overlay, OverlapRecord, Overlay, OverlayOptions};
    pub use crate::parallel::ParallelConfig;
    pub use crate::polygons::{AttributeValue, Attributes, BoundingBox, CellPolygon, PolygonSet};
    pub use crate::projection::{LambertEqualArea, PlateCarree, Projection};
    pub use crate::sampler::{
        DatasetShape, FieldNames, GriddedSource, MemorySource, NamedArray, SeriesSampler,
        WeightedTarget,
    };
    pub use crate::weights::{normalize, remap_field, NormalizationReport};
}
