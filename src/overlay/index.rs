//! R-tree over polygon envelopes
//!
//! Only bounding boxes are indexed; the index answers "which polygons might
//! touch this rectangle" and exact intersection decides the rest.

use geo::{BoundingRect, MultiPolygon, Rect};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

type Entry = GeomWithData<Rectangle<[f64; 2]>, usize>;

pub struct EnvelopeIndex {
    tree: RTree<Entry>,
}

impl EnvelopeIndex {
    /// Bulk-load the envelopes of `geometries`, keyed by their position.
    /// Empty geometries have no envelope and are never returned as candidates.
    pub fn bulk_load<'a, I>(geometries: I) -> Self
    where
        I: IntoIterator<Item = &'a MultiPolygon<f64>>,
    {
        let entries: Vec<Entry> = geometries
            .into_iter()
            .enumerate()
            .filter_map(|(pos, geometry)| {
                let rect = geometry.bounding_rect()?;
                Some(GeomWithData::new(
                    Rectangle::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                    pos,
                ))
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Positions whose envelope intersects `rect`, in ascending order
    pub fn candidates(&self, rect: &Rect<f64>) -> Vec<usize> {
        let envelope: AABB<[f64; 2]> =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);
        let mut found: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .collect();
        found.sort_unstable();
        found
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, polygon};

    #[test]
    fn test_candidates_by_envelope() {
        let a = MultiPolygon::new(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)]]);
        let b = MultiPolygon::new(vec![polygon![(x: 5.0, y: 5.0), (x: 6.0, y: 5.0), (x: 6.0, y: 6.0)]]);
        let empty = MultiPolygon::new(vec![]);
        let index = EnvelopeIndex::bulk_load([&a, &empty, &b]);
        assert_eq!(index.len(), 2);

        let probe = Rect::new(coord! { x: 0.5, y: 0.5 }, coord! { x: 5.5, y: 5.5 });
        assert_eq!(index.candidates(&probe), vec![0, 2]);

        let miss = Rect::new(coord! { x: 2.0, y: 2.0 }, coord! { x: 3.0, y: 3.0 });
        assert!(index.candidates(&miss).is_empty());
    }
}
