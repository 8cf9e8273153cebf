//! Area projections applied before measuring overlaps
//!
//! Areas are planar, so weights are only as good as the projection used to
//! measure them. [`PlateCarree`] keeps geographic coordinates and measures in
//! square degrees (an approximation away from the equator);
//! [`LambertEqualArea`] maps to an equal-area cylinder in square metres.

use crate::errors::{RemapError, Result};
use crate::polygons::{PolygonSet, GEOGRAPHIC_CRS};
use geo::{Coord, MapCoords};

/// Radius of the sphere with the same surface area as the WGS84 ellipsoid, metres
pub const AUTHALIC_RADIUS: f64 = 6_371_007.181;

/// A forward map from geographic coordinates (x = lon, y = lat, degrees)
pub trait Projection: Send + Sync {
    /// Reference-system tag of the projected coordinates
    fn target_crs(&self) -> &str;

    fn project(&self, coord: Coord<f64>) -> Coord<f64>;
}

/// Identity projection; areas come out in square degrees
#[derive(Debug, Clone, Copy, Default)]
pub struct PlateCarree;

impl Projection for PlateCarree {
    fn target_crs(&self) -> &str {
        GEOGRAPHIC_CRS
    }

    fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        coord
    }
}

/// Lambert cylindrical equal-area on the authalic sphere
#[derive(Debug, Clone, Copy)]
pub struct LambertEqualArea {
    pub radius: f64,
}

impl Default for LambertEqualArea {
    fn default() -> Self {
        Self {
            radius: AUTHALIC_RADIUS,
        }
    }
}

impl Projection for LambertEqualArea {
    fn target_crs(&self) -> &str {
        "EPSG:6933"
    }

    fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.radius * coord.x.to_radians(),
            y: self.radius * coord.y.to_radians().sin(),
        }
    }
}

/// The built-in projection whose target system is `crs`, if any
pub fn projection_for_crs(crs: &str) -> Option<Box<dyn Projection>> {
    let known: [Box<dyn Projection>; 2] = [Box::new(PlateCarree), Box::new(LambertEqualArea::default())];
    known.into_iter().find(|p| p.target_crs() == crs)
}

/// Bring `set` into the projection's reference system.
///
/// Sets already tagged with the target system are returned unchanged;
/// geographic sets are projected vertex by vertex; anything else cannot be
/// converted here.
pub fn reproject(set: &PolygonSet, projection: &dyn Projection) -> Result<PolygonSet> {
    let target = projection.target_crs();
    if set.crs == target {
        return Ok(set.clone());
    }
    if set.crs != GEOGRAPHIC_CRS {
        return Err(RemapError::CrsMismatch {
            first: set.crs.clone(),
            second: target.to_string(),
        });
    }

    tracing::debug!(mesh = %set.name, from = %set.crs, to = target, "reprojecting polygon set");
    let mut out = set.clone();
    out.crs = target.to_string();
    for cell in &mut out.polygons {
        cell.geometry = cell.geometry.map_coords(|c| projection.project(c));
    }
    Ok(out)
}
