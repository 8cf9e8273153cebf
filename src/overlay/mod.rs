//! Pairwise intersection of two polygon sets
//!
//! The overlay prefixes each mesh's attributes (`S_1_`, `S_2_`), measures and
//! numbers every polygon, repairs the geometry, prunes candidate pairs through
//! an R-tree over the second mesh and intersects only those candidates. The
//! per-cell loop over the first mesh runs on the rayon pool; output order is
//! the first mesh's order, then ascending position in the second mesh.
//!
//! # Organization
//!
//! - [`repair`]: ring cleaning and boolean-union repair
//! - [`index`]: R-tree over polygon envelopes

pub mod index;
pub mod repair;

use crate::errors::{RemapError, Result};
use crate::polygons::{Attributes, PolygonSet, GEOGRAPHIC_CRS};
use crate::projection::{projection_for_crs, reproject, Projection};
use crate::weights::{normalize, NormalizationReport};
use geo::{Area, BooleanOps, BoundingRect, MultiPolygon};
use index::EnvelopeIndex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Attribute prefix for the first mesh
pub const PREFIX_1: &str = "S_1_";
/// Attribute prefix for the second mesh
pub const PREFIX_2: &str = "S_2_";

/// Caller choices for an overlay
#[derive(Clone, Default)]
pub struct OverlayOptions {
    /// Projection applied to both meshes before any area is measured.
    /// Without one, a geographic second mesh is reprojected into the first
    /// mesh's system when that system is a known projection target; any other
    /// pair of differing systems is rejected. Areas are taken in the planar
    /// units of the shared system.
    pub projection: Option<Arc<dyn Projection>>,
}

impl OverlayOptions {
    pub fn with_projection(projection: impl Projection + 'static) -> Self {
        Self {
            projection: Some(Arc::new(projection)),
        }
    }
}

impl std::fmt::Debug for OverlayOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayOptions")
            .field(
                "projection",
                &self.projection.as_ref().map(|p| p.target_crs().to_string()),
            )
            .finish()
    }
}

/// One non-empty intersection between a cell of each mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapRecord {
    /// Row identifier in the first mesh (position + 1)
    pub id_1: u64,
    /// Row identifier in the second mesh (position + 1)
    pub id_2: u64,
    /// The cells' own identifiers
    pub cell_id_1: u64,
    pub cell_id_2: u64,
    pub geometry: MultiPolygon<f64>,
    /// Area of the first-mesh cell
    pub area_1: f64,
    /// Area of the second-mesh cell
    pub area_2: f64,
    pub overlap_area: f64,
    /// `overlap_area / area_1`
    pub frac_1: f64,
    /// `overlap_area / area_2`
    pub frac_2: f64,
    /// `frac_1` rescaled to sum to one over each `id_1`
    pub frac_1_normalized: f64,
    /// `frac_2` rescaled to sum to one over each `id_2`
    pub frac_2_normalized: f64,
    /// Prefixed attributes of both cells
    pub attributes: Attributes,
}

/// Overlay output: the records and any groups that could not be normalized
#[derive(Debug, Clone)]
pub struct Overlay {
    pub records: Vec<OverlapRecord>,
    pub report: NormalizationReport,
}

/// A polygon ready for intersection
struct PreparedCell {
    row_id: u64,
    cell_id: u64,
    geometry: MultiPolygon<f64>,
    area: f64,
    attributes: Attributes,
}

/// Intersect two meshes and normalize the resulting weights.
pub fn overlay(first: &PolygonSet, second: &PolygonSet, options: &OverlayOptions) -> Result<Overlay> {
    let mut records = intersect_sets(first, second, options)?;
    let report = normalize(&mut records);
    Ok(Overlay { records, report })
}

/// Intersect two meshes without normalizing.
///
/// `frac_1_normalized` and `frac_2_normalized` hold the raw fractions until
/// [`normalize`] is run over the records.
pub fn intersect_sets(
    first: &PolygonSet,
    second: &PolygonSet,
    options: &OverlayOptions,
) -> Result<Vec<OverlapRecord>> {
    let (first, second) = match &options.projection {
        Some(projection) => (
            reproject(first, projection.as_ref())?,
            reproject(second, projection.as_ref())?,
        ),
        None if first.crs != second.crs => {
            let to_first = projection_for_crs(&first.crs)
                .filter(|_| second.crs == GEOGRAPHIC_CRS)
                .ok_or_else(|| RemapError::CrsMismatch {
                    first: first.crs.clone(),
                    second: second.crs.clone(),
                })?;
            tracing::warn!(
                mesh = %second.name,
                from = %second.crs,
                to = %first.crs,
                "reprojecting second polygon set to match the first"
            );
            (first.clone(), reproject(second, to_first.as_ref())?)
        }
        None => (first.clone(), second.clone()),
    };

    let cells_1 = prepare(&first, PREFIX_1)?;
    let cells_2 = prepare(&second, PREFIX_2)?;
    let index = EnvelopeIndex::bulk_load(cells_2.iter().map(|c| &c.geometry));

    tracing::info!(
        first = %first.name,
        second = %second.name,
        cells_1 = cells_1.len(),
        cells_2 = cells_2.len(),
        "intersecting polygon sets"
    );

    let per_cell: Vec<Vec<OverlapRecord>> = cells_1
        .par_iter()
        .map(|cell| intersect_cell(cell, &cells_2, &index))
        .collect::<Result<_>>()?;
    let records: Vec<OverlapRecord> = per_cell.into_iter().flatten().collect();

    tracing::debug!(pairs = records.len(), "non-empty intersections");
    Ok(records)
}

/// Prefix attributes, number rows, repair and measure every polygon.
fn prepare(set: &PolygonSet, prefix: &str) -> Result<Vec<PreparedCell>> {
    set.polygons
        .par_iter()
        .enumerate()
        .map(|(pos, cell)| {
            let geometry = repair::repair(&cell.geometry).map_err(|e| match e {
                RemapError::GeometryType { message } => RemapError::GeometryType {
                    message: format!("{} cell {}: {message}", set.name, cell.id),
                },
                other => other,
            })?;
            Ok(PreparedCell {
                row_id: pos as u64 + 1,
                cell_id: cell.id,
                area: geometry.unsigned_area(),
                geometry,
                attributes: cell.attributes.prefixed(prefix),
            })
        })
        .collect()
}

fn intersect_cell(
    cell: &PreparedCell,
    others: &[PreparedCell],
    index: &EnvelopeIndex,
) -> Result<Vec<OverlapRecord>> {
    let Some(rect) = cell.geometry.bounding_rect() else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    for pos in index.candidates(&rect) {
        let other = &others[pos];
        let geometry = repair::repair_multi(&cell.geometry.intersection(&other.geometry))?;
        let overlap_area = geometry.unsigned_area();
        if geometry.0.is_empty() || overlap_area <= 0.0 {
            continue;
        }

        let frac_1 = overlap_area / cell.area;
        let frac_2 = overlap_area / other.area;
        out.push(OverlapRecord {
            id_1: cell.row_id,
            id_2: other.row_id,
            cell_id_1: cell.cell_id,
            cell_id_2: other.cell_id,
            geometry,
            area_1: cell.area,
            area_2: other.area,
            overlap_area,
            frac_1,
            frac_2,
            frac_1_normalized: frac_1,
            frac_2_normalized: frac_2,
            attributes: cell.attributes.merged(&other.attributes),
        });
    }
    Ok(out)
}
