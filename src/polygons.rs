//! Polygon sets and their attribute bags
//!
//! A [`PolygonSet`] is one mesh: an ordered list of cell polygons, each with a
//! positive integer identifier and an ordered bag of caller attributes that
//! travels through prefixing and overlay untouched.

use crate::errors::Result;
use geo::{BoundingRect, Polygon};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default reference-system tag for geographic latitude/longitude coordinates
pub const GEOGRAPHIC_CRS: &str = "EPSG:4326";

/// Numeric or text attribute value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
}

impl AttributeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(v) => Some(*v),
            AttributeValue::Text(_) => None,
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Number(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

/// Insertion-ordered key/value attribute bag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes(Vec<(String, AttributeValue)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace a value, keeping the original position on replace
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy with every key renamed to `prefix + key`
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self(
            self.0
                .iter()
                .map(|(k, v)| (format!("{prefix}{k}"), v.clone()))
                .collect(),
        )
    }

    /// Concatenate two bags; keys are assumed disjoint (see [`Attributes::prefixed`])
    pub fn merged(&self, other: &Self) -> Self {
        let mut out = self.0.clone();
        out.extend(other.0.iter().cloned());
        Self(out)
    }
}

/// One cell of a mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellPolygon {
    /// Positive identifier, unique within its mesh
    pub id: u64,
    pub geometry: Polygon<f64>,
    pub attributes: Attributes,
}

impl CellPolygon {
    pub fn new(id: u64, geometry: Polygon<f64>) -> Self {
        Self {
            id,
            geometry,
            attributes: Attributes::new(),
        }
    }

    /// Center coordinates recorded by the cell builder, when present
    pub fn center(&self) -> Option<(f64, f64)> {
        let lat = self.attributes.get("lat")?.as_f64()?;
        let lon = self.attributes.get("lon")?.as_f64()?;
        Some((lat, lon))
    }
}

/// Latitude/longitude box `{min_lat, max_lat, min_lon, max_lon}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// True when the point lies strictly inside the box (edges excluded)
    pub fn contains_strict(&self, lat: f64, lon: f64) -> bool {
        lat > self.min_lat && lat < self.max_lat && lon > self.min_lon && lon < self.max_lon
    }

    /// Grow every side by `amount`
    pub fn expand(&self, amount: f64) -> Self {
        Self {
            min_lat: self.min_lat - amount,
            max_lat: self.max_lat + amount,
            min_lon: self.min_lon - amount,
            max_lon: self.max_lon + amount,
        }
    }
}

/// An ordered collection of cell polygons forming one mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonSet {
    /// Mesh tag, used in logs and for attribute prefixes
    pub name: String,
    /// Reference-system tag of the vertex coordinates
    pub crs: String,
    pub polygons: Vec<CellPolygon>,
}

impl PolygonSet {
    pub fn new(name: impl Into<String>, crs: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            crs: crs.into(),
            polygons: Vec::new(),
        }
    }

    /// A geographic set from already-built polygons
    pub fn from_polygons(name: impl Into<String>, polygons: Vec<CellPolygon>) -> Self {
        Self {
            name: name.into(),
            crs: GEOGRAPHIC_CRS.to_string(),
            polygons,
        }
    }

    pub fn push(&mut self, polygon: CellPolygon) {
        self.polygons.push(polygon);
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellPolygon> {
        self.polygons.iter()
    }

    /// Bounding box of every polygon, expanded by an additive `buffer`.
    ///
    /// Returns `None` for an empty set.
    pub fn bounding_box(&self, buffer: f64) -> Option<BoundingBox> {
        if self.polygons.len() > 1 {
            tracing::warn!(
                mesh = %self.name,
                count = self.polygons.len(),
                "bounding box taken over more than one polygon"
            );
        }

        let mut rects = self.polygons.iter().filter_map(|p| p.geometry.bounding_rect());
        let first = rects.next()?;
        let bbox = rects.fold(
            BoundingBox::new(first.min().y, first.max().y, first.min().x, first.max().x),
            |acc, r| BoundingBox {
                min_lat: acc.min_lat.min(r.min().y),
                max_lat: acc.max_lat.max(r.max().y),
                min_lon: acc.min_lon.min(r.min().x),
                max_lon: acc.max_lon.max(r.max().x),
            },
        );
        Some(bbox.expand(buffer))
    }

    /// Load a set previously written with [`PolygonSet::write_json`]
    pub fn read_json(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn unit_square(x: f64, y: f64) -> Polygon<f64> {
        polygon![(x: x, y: y), (x: x + 1.0, y: y), (x: x + 1.0, y: y + 1.0), (x: x, y: y + 1.0)]
    }

    #[test]
    fn test_attribute_prefix_and_replace() {
        let mut attrs = Attributes::new();
        attrs.insert("ID", 3.0);
        attrs.insert("name", "basin");
        attrs.insert("ID", 4.0);

        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get("ID"), Some(&AttributeValue::Number(4.0)));

        let prefixed = attrs.prefixed("S_1_");
        let keys: Vec<&str> = prefixed.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["S_1_ID", "S_1_name"]);
    }

    #[test]
    fn test_bounding_box_with_buffer() {
        let set = PolygonSet::from_polygons(
            "mesh",
            vec![
                CellPolygon::new(1, unit_square(0.0, 0.0)),
                CellPolygon::new(2, unit_square(2.0, 5.0)),
            ],
        );
        let bbox = set.bounding_box(0.5).unwrap();
        assert_eq!(bbox, BoundingBox::new(-0.5, 6.5, -0.5, 3.5));
        assert!(PolygonSet::new("empty", GEOGRAPHIC_CRS).bounding_box(1.0).is_none());
    }

    #[test]
    fn test_strict_containment() {
        let bbox = BoundingBox::new(0.0, 1.0, 0.0, 1.0);
        assert!(bbox.contains_strict(0.5, 0.5));
        assert!(!bbox.contains_strict(0.0, 0.5));
        assert!(!bbox.contains_strict(0.5, 1.0));
    }
}
