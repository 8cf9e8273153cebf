//! Geometry repair before and after intersection
//!
//! Rings are cleaned of repeated vertices and then passed through a boolean
//! union with an empty set, which rebuilds them as valid, non-self-intersecting
//! polygons. For valid input the enclosed area is unchanged.

use crate::errors::{RemapError, Result};
use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};

/// Repair a single polygon into a valid multipolygon.
///
/// Rings that collapse to fewer than three distinct vertices are dropped; a
/// collapsed exterior yields an empty result. Non-finite coordinates cannot be
/// repaired and are reported as a geometry error.
pub fn repair(polygon: &Polygon<f64>) -> Result<MultiPolygon<f64>> {
    repair_multi(&MultiPolygon::new(vec![polygon.clone()]))
}

pub fn repair_multi(geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
    let mut cleaned = Vec::with_capacity(geometry.0.len());
    for polygon in &geometry.0 {
        let Some(exterior) = clean_ring(polygon.exterior())? else {
            continue;
        };
        let mut interiors = Vec::with_capacity(polygon.interiors().len());
        for ring in polygon.interiors() {
            if let Some(ring) = clean_ring(ring)? {
                interiors.push(ring);
            }
        }
        cleaned.push(Polygon::new(exterior, interiors));
    }

    if cleaned.is_empty() {
        return Ok(MultiPolygon::new(vec![]));
    }
    Ok(MultiPolygon::new(cleaned).union(&MultiPolygon::new(vec![])))
}

fn clean_ring(ring: &LineString<f64>) -> Result<Option<LineString<f64>>> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for &c in &ring.0 {
        if !c.x.is_finite() || !c.y.is_finite() {
            return Err(RemapError::GeometryType {
                message: format!("non-finite vertex ({}, {})", c.x, c.y),
            });
        }
        if coords.last() != Some(&c) {
            coords.push(c);
        }
    }
    if coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return Ok(None);
    }
    // Polygon::new closes the ring again
    Ok(Some(LineString::new(coords)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    #[test]
    fn test_valid_polygon_keeps_area() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0)];
        let repaired = repair(&square).unwrap();
        assert!((repaired.unsigned_area() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_bowtie_is_split_without_cancelling() {
        // Signed shoelace area of this ring is zero
        let bowtie = polygon![(x: 0.0, y: 0.0), (x: 2.0, y: 2.0), (x: 2.0, y: 0.0), (x: 0.0, y: 2.0)];
        let repaired = repair(&bowtie).unwrap();
        assert!((repaired.unsigned_area() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_collapsed_ring_is_empty() {
        let sliver = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)];
        assert!(repair(&sliver).unwrap().0.is_empty());
    }

    #[test]
    fn test_non_finite_vertex_rejected() {
        let bad = polygon![(x: 0.0, y: 0.0), (x: f64::NAN, y: 1.0), (x: 1.0, y: 0.0)];
        assert!(matches!(repair(&bad), Err(RemapError::GeometryType { .. })));
    }
}
