//! Cell polygon construction from cell-center coordinates
//!
//! Every interior grid cell becomes an octagon-shaped ring through the
//! midpoints to its four edge neighbours and the centroids of its four corner
//! windows. Adjacent cells compute their shared vertices from the same
//! neighbour windows, so a built mesh tiles the grid without gaps or overlaps.
//! Border rows and columns only contribute neighbours and are never emitted.
//! Neighbour longitudes are unwrapped around each cell's center, so a cell
//! next to the ±180 seam keeps its width on the center's side of the seam.

use crate::errors::{RemapError, Result};
use crate::grid::CoordinateGrid;
use crate::polygons::{BoundingBox, CellPolygon, PolygonSet, GEOGRAPHIC_CRS};
use geo::{Coord, LineString, Polygon};
use ndarray::Array2;

/// Ring traversal as `(row, col)` offsets from the cell: the edge neighbour
/// along the row axis first, then its corner window, and so on around the cell.
const RING_OFFSETS: [(isize, isize); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

/// Options for [`build_cell_polygons`]
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Only cells whose center lies strictly inside this box are emitted
    pub bounds: Option<BoundingBox>,
    /// Shift longitudes above 180 degrees by -360 before building
    pub correct_360: bool,
}

impl BuildOptions {
    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_correct_360(mut self, correct_360: bool) -> Self {
        self.correct_360 = correct_360;
        self
    }
}

/// Builds one polygon per interior cell of `grid`.
///
/// Identifiers count interior cells in row-major order starting at 1, so a
/// cell keeps its identifier whatever bounding box is applied. Each polygon
/// carries `ID`, `lat` and `lon` attributes; `lon` is the center longitude in
/// the caller's original convention even when `correct_360` shifted it for
/// the corner geometry.
pub fn build_cell_polygons(
    grid: &CoordinateGrid,
    name: &str,
    options: &BuildOptions,
) -> Result<PolygonSet> {
    if grid.lat.shape() != grid.lon.shape() {
        return Err(RemapError::ShapeMismatch {
            expected: grid.lat.shape().to_vec(),
            found: grid.lon.shape().to_vec(),
        });
    }

    let (rows, cols) = grid.shape();
    let lat = &grid.lat;
    let lon = if options.correct_360 {
        grid.lon.mapv(|x| if x > 180.0 { x - 360.0 } else { x })
    } else {
        grid.lon.clone()
    };

    let mut set = PolygonSet::new(name, GEOGRAPHIC_CRS);
    let mut next_id: u64 = 0;

    for i in 1..rows.saturating_sub(1) {
        for j in 1..cols.saturating_sub(1) {
            next_id += 1;

            let center_lat = lat[[i, j]];
            let center_lon = lon[[i, j]];
            if let Some(bounds) = &options.bounds {
                if !bounds.contains_strict(center_lat, center_lon) {
                    continue;
                }
            }

            let mut ring: Vec<Coord<f64>> = RING_OFFSETS
                .iter()
                .map(|&(di, dj)| Coord {
                    x: window_mean(&lon, i, j, di, dj, |x| unwrap_lon(x, center_lon)),
                    y: window_mean(lat, i, j, di, dj, |y| y),
                })
                .collect();
            ring.push(ring[0]);

            let mut cell = CellPolygon::new(next_id, Polygon::new(LineString::new(ring), vec![]));
            cell.attributes.insert("ID", next_id as f64);
            cell.attributes.insert("lat", center_lat);
            cell.attributes.insert("lon", grid.lon[[i, j]]);
            set.push(cell);
        }
    }

    tracing::debug!(
        mesh = name,
        rows,
        cols,
        emitted = set.len(),
        "built cell polygons"
    );
    Ok(set)
}

/// Mean of the cell and its neighbours spanned by the offset: two values for an
/// edge offset, four for a corner offset.
///
/// The window is always summed in ascending index order so that neighbouring
/// cells produce bit-identical shared vertices. Each value passes through
/// `adjust` before summing.
fn window_mean(
    values: &Array2<f64>,
    i: usize,
    j: usize,
    di: isize,
    dj: isize,
    adjust: impl Fn(f64) -> f64,
) -> f64 {
    let rows = ascending_pair(i, di);
    let cols = ascending_pair(j, dj);
    let rows = if di == 0 { &rows[..1] } else { &rows[..] };
    let cols = if dj == 0 { &cols[..1] } else { &cols[..] };

    let mut sum = 0.0;
    for &r in rows {
        for &c in cols {
            sum += adjust(values[[r, c]]);
        }
    }
    sum / (rows.len() * cols.len()) as f64
}

/// Neighbour longitude moved onto the same side of the seam as the center
fn unwrap_lon(lon: f64, center: f64) -> f64 {
    if lon - center > 180.0 {
        lon - 360.0
    } else if lon - center < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

fn ascending_pair(k: usize, offset: isize) -> [usize; 2] {
    if offset < 0 {
        [k - 1, k]
    } else {
        [k, k + offset as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, BoundingRect};
    use ndarray::Array1;

    fn regular_grid(n_lat: usize, n_lon: usize, step: f64, lon0: f64) -> CoordinateGrid {
        let lat = Array1::from_iter((0..n_lat).map(|k| k as f64 * step));
        let lon = Array1::from_iter((0..n_lon).map(|k| lon0 + k as f64 * step));
        CoordinateGrid::from_vectors(lat.view(), lon.view())
    }

    #[test]
    fn test_interior_cells_only() {
        let grid = regular_grid(5, 4, 1.0, 0.0);
        let set = build_cell_polygons(&grid, "src", &BuildOptions::default()).unwrap();
        // 4 lon rows x 5 lat cols -> 2 x 3 interior cells
        assert_eq!(set.len(), 6);
        let ids: Vec<u64> = set.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
        for cell in set.iter() {
            assert_eq!(cell.geometry.exterior().0.len(), 9);
            assert!((cell.geometry.unsigned_area() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cells_tile_center_envelope() {
        let grid = regular_grid(6, 7, 0.5, 10.0);
        let set = build_cell_polygons(&grid, "src", &BuildOptions::default()).unwrap();

        let total: f64 = set.iter().map(|c| c.geometry.unsigned_area()).sum();
        let bbox = set.bounding_box(0.0).unwrap();
        let envelope = (bbox.max_lat - bbox.min_lat) * (bbox.max_lon - bbox.min_lon);
        assert!((total - envelope).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_keep_stable_ids() {
        let grid = regular_grid(5, 5, 1.0, 0.0);
        let bounds = BoundingBox::new(1.5, 3.5, 0.5, 1.5);
        let set = build_cell_polygons(&grid, "src", &BuildOptions::default().with_bounds(bounds))
            .unwrap();

        // Row i=1 (lon 1), cols j=2,3 (lat 2,3): interior ids 2 and 3
        let ids: Vec<u64> = set.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(set.polygons[0].center(), Some((2.0, 1.0)));
    }

    #[test]
    fn test_correct_360_keeps_original_centers() {
        let grid = regular_grid(4, 6, 1.0, 178.0);
        let options = BuildOptions::default().with_correct_360(true);
        let set = build_cell_polygons(&grid, "src", &options).unwrap();

        let centers: Vec<f64> = set
            .iter()
            .map(|c| {
                let (_, lon) = c.center().unwrap();
                if lon < 0.0 {
                    lon + 360.0
                } else {
                    lon
                }
            })
            .collect();
        let expected: Vec<f64> = (1..5)
            .flat_map(|i| std::iter::repeat(178.0 + i as f64).take(2))
            .collect();
        assert_eq!(centers, expected);

        // Corner geometry lives in the shifted domain
        let shifted = set.polygons.last().unwrap().geometry.bounding_rect().unwrap();
        assert!(shifted.max().x < 0.0);
    }

    #[test]
    fn test_cells_across_the_seam_keep_unit_area() {
        // 178..183 shifts to 178, 179, 180, -179, -178, -177
        let grid = regular_grid(4, 6, 1.0, 178.0);
        let options = BuildOptions::default().with_correct_360(true);
        let set = build_cell_polygons(&grid, "src", &options).unwrap();
        assert_eq!(set.len(), 8);

        for cell in set.iter() {
            let area = cell.geometry.unsigned_area();
            assert!((area - 1.0).abs() < 1e-9, "cell {} has area {area}", cell.id);

            let rect = cell.geometry.bounding_rect().unwrap();
            assert!((rect.width() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unwrap_lon() {
        assert_eq!(unwrap_lon(-179.0, 180.0), 181.0);
        assert_eq!(unwrap_lon(180.0, -179.0), -180.0);
        assert_eq!(unwrap_lon(10.0, 12.0), 10.0);
    }

    #[test]
    fn test_bounds_compare_shifted_longitudes() {
        let grid = regular_grid(4, 6, 1.0, 178.0);
        let bounds = BoundingBox::new(-90.0, 90.0, -180.0, 0.0);
        let options = BuildOptions::default()
            .with_bounds(bounds)
            .with_correct_360(true);
        let set = build_cell_polygons(&grid, "src", &options).unwrap();
        // lon 181 and 182 shift to -179 and -178
        assert_eq!(set.len(), 4);
        assert!(set.iter().all(|c| c.center().unwrap().1 > 180.0));
    }
}
