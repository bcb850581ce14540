//! Delaunay/Voronoi back end.
//!
//! The grid never triangulates points itself. It asks a [`GeometryBackend`]
//! for a [`Tessellation`]: the Delaunay triangles with their neighbors, plus
//! the dual Voronoi diagram with one region per input point and one ridge per
//! Delaunay edge. Indices in the result always refer to positions in the
//! slice handed to [`GeometryBackend::tessellate`].
//!
//! [`SpadeBackend`] is the default implementation. It triangulates with
//! [`spade`], whose exact predicates cope with the collinear and cocircular
//! configurations that regular lattices are full of, and derives the Voronoi
//! diagram from triangle circumcenters. Circumcenters that coincide within a
//! tolerance (four or more cocircular points) are merged into one Voronoi
//! vertex, and the zero-length ridges between them are dropped, so a square
//! lattice produces the square Voronoi diagram rather than one cluttered with
//! diagonal slivers.
//!
//! # Examples
//!
//! ```
//! use dualgrid::geometry::backend::{GeometryBackend, SpadeBackend};
//!
//! let points = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.5, 0.4]];
//! let tessellation = SpadeBackend::default().tessellate(&points).unwrap();
//!
//! assert_eq!(tessellation.triangulation.simplices.len(), 4);
//! assert_eq!(tessellation.voronoi.regions.len(), 5);
//! assert!(tessellation.voronoi.regions[4].bounded);
//! assert!(!tessellation.voronoi.regions[0].bounded);
//! ```

use crate::core::collections::{FastHashMap, SmallBuffer};
use spade::{DelaunayTriangulation, Point2, Triangulation as _};
use thiserror::Error;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by a geometry back end.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GeometryError {
    /// The triangulator rejected a point.
    #[error("point {index} could not be inserted into the triangulation: {message}")]
    InsertionFailed {
        /// Index of the rejected point.
        index: usize,
        /// Back-end description of the failure.
        message: String,
    },
    /// The back end produced indices that do not match the input.
    #[error("inconsistent tessellation: {message}")]
    Inconsistent {
        /// Description of the inconsistency.
        message: String,
    },
}

// =============================================================================
// TESSELLATION TYPES
// =============================================================================

/// Delaunay triangles and their adjacency.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Triangulation {
    /// Point indices of each triangle.
    pub simplices: Vec<[usize; 3]>,
    /// `neighbors[t][k]` is the triangle across the edge opposite vertex `k`
    /// of triangle `t`, or `None` on the hull.
    pub neighbors: Vec<[Option<usize>; 3]>,
}

impl Triangulation {
    /// Builds a triangulation from its simplices, deriving the neighbor table.
    ///
    /// # Examples
    ///
    /// ```
    /// use dualgrid::geometry::backend::Triangulation;
    ///
    /// let tri = Triangulation::from_simplices(vec![[0, 1, 2], [1, 3, 2]]);
    /// assert_eq!(tri.neighbors[0], [Some(1), None, None]);
    /// assert_eq!(tri.neighbors[1], [None, None, Some(0)]);
    /// ```
    #[must_use]
    pub fn from_simplices(simplices: Vec<[usize; 3]>) -> Self {
        let mut triangles_at_edge: FastHashMap<(usize, usize), SmallBuffer<usize, 2>> =
            FastHashMap::default();
        for (t, simplex) in simplices.iter().enumerate() {
            for k in 0..3 {
                triangles_at_edge
                    .entry(edge_key(simplex[(k + 1) % 3], simplex[(k + 2) % 3]))
                    .or_default()
                    .push(t);
            }
        }

        let neighbors = simplices
            .iter()
            .enumerate()
            .map(|(t, simplex)| {
                std::array::from_fn(|k| {
                    triangles_at_edge
                        .get(&edge_key(simplex[(k + 1) % 3], simplex[(k + 2) % 3]))
                        .and_then(|ts| ts.iter().copied().find(|&other| other != t))
                })
            })
            .collect();

        Self {
            simplices,
            neighbors,
        }
    }
}

#[inline]
const fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

/// Voronoi region of one input point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoronoiRegion {
    /// Finite Voronoi vertices of the region, ordered by angle around the point.
    pub vertices: Vec<usize>,
    /// `false` when the region extends to infinity.
    pub bounded: bool,
}

impl VoronoiRegion {
    /// Number of region corners, counting the point at infinity of an open
    /// region once.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.vertices.len() + usize::from(!self.bounded)
    }
}

/// Voronoi ridge separating two input points.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Ridge {
    /// The two points the ridge separates.
    pub points: [usize; 2],
    /// Ridge end vertices; `None` for an end at infinity.
    pub vertices: [Option<usize>; 2],
}

/// Voronoi diagram dual to a [`Triangulation`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VoronoiDiagram {
    /// Vertex coordinates. Vertices of nearly degenerate triangles may be huge
    /// or non-finite.
    pub vertices: Vec<[f64; 2]>,
    /// One region per input point.
    pub regions: Vec<VoronoiRegion>,
    /// One ridge per Delaunay edge of non-zero Voronoi length.
    pub ridges: Vec<Ridge>,
}

/// Result of tessellating a point set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tessellation {
    /// Delaunay triangulation of the points.
    pub triangulation: Triangulation,
    /// Voronoi diagram of the points.
    pub voronoi: VoronoiDiagram,
}

// =============================================================================
// BACKEND TRAIT
// =============================================================================

/// Source of Delaunay/Voronoi tessellations.
pub trait GeometryBackend {
    /// Tessellates `points`.
    ///
    /// Exactly duplicated points keep their index but receive an empty,
    /// unbounded region and no ridges.
    ///
    /// # Errors
    ///
    /// Returns a [`GeometryError`] if the back end cannot tessellate the input.
    fn tessellate(&self, points: &[[f64; 2]]) -> Result<Tessellation, GeometryError>;
}

// =============================================================================
// SPADE BACKEND
// =============================================================================

/// Default tolerance for merging coincident circumcenters, relative to the
/// extent of the point set.
pub const DEFAULT_VERTEX_MERGE_TOLERANCE: f64 = 1e-9;

/// [`GeometryBackend`] built on spade's Delaunay triangulation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpadeBackend {
    /// Circumcenters closer than this, relative to the point-set extent, are
    /// one Voronoi vertex.
    pub vertex_merge_tolerance: f64,
}

impl Default for SpadeBackend {
    fn default() -> Self {
        Self {
            vertex_merge_tolerance: DEFAULT_VERTEX_MERGE_TOLERANCE,
        }
    }
}

impl SpadeBackend {
    /// Creates a back end with the given merge tolerance.
    #[must_use]
    pub const fn new(vertex_merge_tolerance: f64) -> Self {
        Self {
            vertex_merge_tolerance,
        }
    }
}

/// Triangle pair on either side of a Delaunay edge.
struct EdgeFaces {
    points: [usize; 2],
    faces: [Option<usize>; 2],
}

impl GeometryBackend for SpadeBackend {
    fn tessellate(&self, points: &[[f64; 2]]) -> Result<Tessellation, GeometryError> {
        let mut dt: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
        // spade vertex index -> input point index; duplicates keep the first
        let mut point_at_vertex: FastHashMap<usize, usize> = FastHashMap::default();
        for (index, &[x, y]) in points.iter().enumerate() {
            let handle = dt.insert(Point2::new(x, y)).map_err(|err| {
                GeometryError::InsertionFailed {
                    index,
                    message: format!("{err:?}"),
                }
            })?;
            if let Some(&first) = point_at_vertex.get(&handle.index()) {
                tracing::debug!(index, first, "duplicate point left out of the triangulation");
            } else {
                point_at_vertex.insert(handle.index(), index);
            }
        }
        let point_of = |vertex: usize| {
            point_at_vertex
                .get(&vertex)
                .copied()
                .ok_or_else(|| GeometryError::Inconsistent {
                    message: format!("triangulation vertex {vertex} has no input point"),
                })
        };

        let mut simplices = Vec::with_capacity(dt.num_inner_faces());
        let mut circumcenters = Vec::with_capacity(dt.num_inner_faces());
        let mut slot_of_face: FastHashMap<usize, usize> = FastHashMap::default();
        for face in dt.inner_faces() {
            let [a, b, c] = face.vertices();
            simplices.push([
                point_of(a.fix().index())?,
                point_of(b.fix().index())?,
                point_of(c.fix().index())?,
            ]);
            let center = face.circumcenter();
            circumcenters.push([center.x, center.y]);
            slot_of_face.insert(face.fix().index(), simplices.len() - 1);
        }

        let mut edges = Vec::with_capacity(dt.num_undirected_edges());
        for edge in dt.undirected_edges() {
            let [v0, v1] = edge.vertices();
            let directed = edge.as_directed();
            let left = directed.face().as_inner().map(|f| f.fix().index());
            let right = directed.rev().face().as_inner().map(|f| f.fix().index());
            edges.push(EdgeFaces {
                points: [point_of(v0.fix().index())?, point_of(v1.fix().index())?],
                faces: [
                    left.and_then(|f| slot_of_face.get(&f).copied()),
                    right.and_then(|f| slot_of_face.get(&f).copied()),
                ],
            });
        }

        let voronoi = dual_voronoi(
            points,
            &simplices,
            &circumcenters,
            &edges,
            self.vertex_merge_tolerance * extent(points),
        );
        tracing::debug!(
            points = points.len(),
            triangles = simplices.len(),
            voronoi_vertices = voronoi.vertices.len(),
            ridges = voronoi.ridges.len(),
            "tessellated point set"
        );

        Ok(Tessellation {
            triangulation: Triangulation::from_simplices(simplices),
            voronoi,
        })
    }
}

fn extent(points: &[[f64; 2]]) -> f64 {
    let mut lo = [f64::INFINITY; 2];
    let mut hi = [f64::NEG_INFINITY; 2];
    for p in points {
        for k in 0..2 {
            lo[k] = lo[k].min(p[k]);
            hi[k] = hi[k].max(p[k]);
        }
    }
    (hi[0] - lo[0]).max(hi[1] - lo[1]).max(0.0)
}

/// Derives the Voronoi diagram from triangle circumcenters.
fn dual_voronoi(
    points: &[[f64; 2]],
    simplices: &[[usize; 3]],
    circumcenters: &[[f64; 2]],
    edges: &[EdgeFaces],
    merge_distance: f64,
) -> VoronoiDiagram {
    // group triangles whose circumcenters coincide across a shared edge
    let mut groups = DisjointSet::new(simplices.len());
    for edge in edges {
        if let [Some(a), Some(b)] = edge.faces {
            let (p, q) = (circumcenters[a], circumcenters[b]);
            if (p[0] - q[0]).hypot(p[1] - q[1]) <= merge_distance {
                groups.union(a, b);
            }
        }
    }

    let mut vertex_of_root: FastHashMap<usize, usize> = FastHashMap::default();
    let mut vertices = Vec::new();
    let vertex_at_simplex: Vec<usize> = (0..simplices.len())
        .map(|t| {
            let root = groups.find(t);
            *vertex_of_root.entry(root).or_insert_with(|| {
                vertices.push(circumcenters[root]);
                vertices.len() - 1
            })
        })
        .collect();

    let mut on_hull = vec![false; points.len()];
    let mut ridges = Vec::with_capacity(edges.len());
    for edge in edges {
        let ends = edge.faces.map(|f| f.map(|t| vertex_at_simplex[t]));
        if let [Some(a), Some(b)] = ends
            && a == b
        {
            continue;
        }
        if ends.iter().any(Option::is_none) {
            on_hull[edge.points[0]] = true;
            on_hull[edge.points[1]] = true;
        }
        ridges.push(Ridge {
            points: edge.points,
            vertices: ends,
        });
    }

    let mut vertices_at_point: Vec<SmallBuffer<usize, 8>> = vec![SmallBuffer::new(); points.len()];
    for (t, simplex) in simplices.iter().enumerate() {
        for &p in simplex {
            let v = vertex_at_simplex[t];
            if !vertices_at_point[p].contains(&v) {
                vertices_at_point[p].push(v);
            }
        }
    }

    let regions = vertices_at_point
        .into_iter()
        .enumerate()
        .map(|(p, mut ring)| {
            let [px, py] = points[p];
            let angle = |v: &usize| (vertices[*v][1] - py).atan2(vertices[*v][0] - px);
            ring.sort_by(|a, b| angle(a).total_cmp(&angle(b)));
            // a duplicate point has no triangles and no ridges
            let bounded = !on_hull[p] && !ring.is_empty();
            VoronoiRegion {
                vertices: ring.into_vec(),
                bounded,
            }
        })
        .collect();

    VoronoiDiagram {
        vertices,
        regions,
        ridges,
    }
}

/// Union-find over triangle indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // lower index wins so vertex numbering follows triangle order
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lattice(rows: usize, cols: usize) -> Vec<[f64; 2]> {
        (0..rows)
            .flat_map(|r| (0..cols).map(move |c| [c as f64, r as f64]))
            .collect()
    }

    fn has_ridge(voronoi: &VoronoiDiagram, a: usize, b: usize) -> bool {
        voronoi
            .ridges
            .iter()
            .any(|r| r.points == [a, b] || r.points == [b, a])
    }

    #[test]
    fn square_lattice_drops_diagonal_ridges() {
        let points = lattice(3, 4);
        let tess = SpadeBackend::default().tessellate(&points).unwrap();
        let voronoi = &tess.voronoi;

        assert_eq!(tess.triangulation.simplices.len(), 12);
        // one vertex per lattice square
        assert_eq!(voronoi.vertices.len(), 6);
        assert_eq!(voronoi.ridges.len(), 17);
        assert!(has_ridge(voronoi, 5, 6));
        assert!(has_ridge(voronoi, 1, 5));
        assert!(!has_ridge(voronoi, 0, 5));
        assert!(!has_ridge(voronoi, 1, 4));
    }

    #[test]
    fn interior_lattice_regions_are_unit_squares() {
        let points = lattice(3, 4);
        let voronoi = SpadeBackend::default().tessellate(&points).unwrap().voronoi;
        for p in [5, 6] {
            let region = &voronoi.regions[p];
            assert!(region.bounded);
            assert_eq!(region.degree(), 4);
            let ring: Vec<[f64; 2]> = region.vertices.iter().map(|&v| voronoi.vertices[v]).collect();
            assert_relative_eq!(
                crate::geometry::measures::polygon_area(&ring),
                1.0,
                epsilon = 1e-9
            );
        }
        assert!(!voronoi.regions[0].bounded);
        assert!(!voronoi.regions[1].bounded);
    }

    #[test]
    fn hull_ridges_have_an_infinite_end() {
        let points = lattice(2, 2);
        let voronoi = SpadeBackend::default().tessellate(&points).unwrap().voronoi;
        assert_eq!(voronoi.ridges.len(), 4);
        assert!(
            voronoi
                .ridges
                .iter()
                .all(|r| r.vertices.iter().filter(|v| v.is_none()).count() == 1)
        );
    }

    #[test]
    fn neighbors_are_symmetric() {
        let points = lattice(4, 5);
        let tri = SpadeBackend::default().tessellate(&points).unwrap().triangulation;
        for (t, row) in tri.neighbors.iter().enumerate() {
            for other in row.iter().flatten() {
                assert!(tri.neighbors[*other].contains(&Some(t)));
            }
        }
        let hull_edges: usize = tri
            .neighbors
            .iter()
            .map(|row| row.iter().filter(|n| n.is_none()).count())
            .sum();
        assert_eq!(hull_edges, 2 * (3 + 4));
    }

    #[test]
    fn duplicate_points_get_empty_regions() {
        let points = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 0.0]];
        let voronoi = SpadeBackend::default().tessellate(&points).unwrap().voronoi;
        assert!(voronoi.regions[3].vertices.is_empty());
        assert!(!voronoi.regions[3].bounded);
        assert!(voronoi.ridges.iter().all(|r| !r.points.contains(&3)));
    }

    #[test]
    fn collinear_points_have_no_triangles() {
        let points = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];
        let tess = SpadeBackend::default().tessellate(&points).unwrap();
        assert!(tess.triangulation.simplices.is_empty());
        assert!(tess.voronoi.regions.iter().all(|r| !r.bounded));
    }

    #[test]
    fn non_finite_points_are_rejected() {
        let points = [[0.0, 0.0], [f64::NAN, 1.0], [2.0, 0.0]];
        let err = SpadeBackend::default().tessellate(&points).unwrap_err();
        assert!(matches!(err, GeometryError::InsertionFailed { index: 1, .. }));
    }

    #[test]
    fn disjoint_set_prefers_lower_roots() {
        let mut set = DisjointSet::new(4);
        set.union(3, 1);
        set.union(2, 3);
        assert_eq!(set.find(2), 1);
        assert_eq!(set.find(0), 0);
    }
}
