//! Links, faces and cells from a Voronoi diagram.
//!
//! Each Voronoi ridge between two generator points becomes one link. A ridge
//! is *valid* when both of its ends are finite vertices whose coordinates stay
//! within [`GridOptions::ridge_magnitude_limit`](crate::core::grid::GridOptions);
//! invalid ridges still produce a link, but that link never carries flux.
//! Links are put into canonical midpoint order and, optionally, oriented to
//! point up and to the right.

use crate::core::ids::{FaceId, LinkId, NodeId};
use crate::core::status::{LinkStatus, NodeStatus};
use crate::geometry::backend::{Ridge, VoronoiDiagram, VoronoiRegion};
use crate::geometry::measures::{distance, needs_reorientation, polygon_area};
use crate::geometry::sorting::argsort_links_by_midpoint;
use serde::{Deserialize, Serialize};

/// Default bound on Voronoi vertex coordinates for a ridge to count as valid.
///
/// Nearly degenerate triangles on the perimeter have circumcenters far away
/// from the grid; ridges reaching that far are treated as unbounded.
pub const DEFAULT_RIDGE_MAGNITUDE_LIMIT: f64 = 4.0e7;

/// Degeneracies absorbed during construction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegeneracyReport {
    /// Ridges with two finite-index ends that failed the validity check.
    pub suspicious_ridges: usize,
    /// Nodes that the hull test classified as core but whose Voronoi region
    /// could not serve as a control volume.
    pub promoted_nodes: Vec<NodeId>,
    /// Number of links flipped by reorientation.
    pub reoriented_links: usize,
}

#[inline]
fn is_valid_vertex(voronoi: &VoronoiDiagram, vertex: usize, limit: f64) -> bool {
    voronoi
        .vertices
        .get(vertex)
        .is_some_and(|&[x, y]| x.is_finite() && y.is_finite() && x.abs() < limit && y.abs() < limit)
}

/// Returns `true` when both ends of `ridge` are finite and within `limit`.
#[must_use]
pub fn is_valid_ridge(voronoi: &VoronoiDiagram, ridge: &Ridge, limit: f64) -> bool {
    ridge
        .vertices
        .iter()
        .all(|v| v.is_some_and(|v| is_valid_vertex(voronoi, v, limit)))
}

/// Returns `true` when `region` is closed and every corner is within `limit`.
#[must_use]
pub fn is_control_volume(voronoi: &VoronoiDiagram, region: &VoronoiRegion, limit: f64) -> bool {
    region.bounded
        && region.vertices.len() >= 3
        && region
            .vertices
            .iter()
            .all(|&v| is_valid_vertex(voronoi, v, limit))
}

/// Area of a Voronoi region.
#[must_use]
pub fn region_area(voronoi: &VoronoiDiagram, region: &VoronoiRegion) -> f64 {
    let ring: Vec<[f64; 2]> = region
        .vertices
        .iter()
        .filter_map(|&v| voronoi.vertices.get(v).copied())
        .collect();
    polygon_area(&ring)
}

/// Link arrays in canonical order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkTable {
    /// Tail node of each link.
    pub node_at_link_tail: Vec<NodeId>,
    /// Head node of each link.
    pub node_at_link_head: Vec<NodeId>,
    /// Voronoi ridge length for links with a valid ridge.
    pub ridge_width_at_link: Vec<Option<f64>>,
    /// Euclidean length of each link.
    pub length_of_link: Vec<f64>,
}

impl LinkTable {
    /// Number of links.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.node_at_link_tail.len()
    }

    /// Returns `true` when there are no links.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_at_link_tail.is_empty()
    }
}

/// Creates one link per Voronoi ridge, sorted by midpoint and optionally
/// reoriented. `points` must be in node order.
pub fn create_links_from_voronoi(
    points: &[[f64; 2]],
    voronoi: &VoronoiDiagram,
    ridge_magnitude_limit: f64,
    reorient: bool,
    report: &mut DegeneracyReport,
) -> LinkTable {
    let mut pairs = Vec::with_capacity(voronoi.ridges.len());
    let mut widths = Vec::with_capacity(voronoi.ridges.len());
    for ridge in &voronoi.ridges {
        pairs.push(ridge.points);
        if is_valid_ridge(voronoi, ridge, ridge_magnitude_limit) {
            let [a, b] = ridge.vertices.map(|v| v.map_or([0.0; 2], |v| voronoi.vertices[v]));
            widths.push(Some(distance(a, b)));
        } else {
            if ridge.vertices.iter().all(Option::is_some) {
                report.suspicious_ridges += 1;
            }
            widths.push(None);
        }
    }

    let order = argsort_links_by_midpoint(points, &pairs);
    let mut tails: Vec<NodeId> = order.iter().map(|&i| NodeId::new(pairs[i][0])).collect();
    let mut heads: Vec<NodeId> = order.iter().map(|&i| NodeId::new(pairs[i][1])).collect();
    let ridge_width_at_link = order.iter().map(|&i| widths[i]).collect();

    if reorient {
        report.reoriented_links = reorient_links_upper_right(points, &mut tails, &mut heads);
    }
    let length_of_link = calculate_link_lengths(points, &tails, &heads);

    if report.suspicious_ridges > 0 {
        tracing::debug!(
            count = report.suspicious_ridges,
            limit = ridge_magnitude_limit,
            "ridges beyond the magnitude limit treated as unbounded"
        );
    }

    LinkTable {
        node_at_link_tail: tails,
        node_at_link_head: heads,
        ridge_width_at_link,
        length_of_link,
    }
}

/// Flips links so that each points within `[-45, 135)` degrees clockwise of
/// north. Returns the number of links flipped.
///
/// Applying it twice flips nothing the second time.
///
/// # Examples
///
/// ```
/// use dualgrid::core::ids::NodeId;
/// use dualgrid::core::topology::reorient_links_upper_right;
///
/// let points = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
/// let mut tails = vec![NodeId::new(1), NodeId::new(2)];
/// let mut heads = vec![NodeId::new(0), NodeId::new(0)];
/// assert_eq!(reorient_links_upper_right(&points, &mut tails, &mut heads), 2);
/// assert_eq!(tails, vec![NodeId::new(0), NodeId::new(0)]);
/// ```
pub fn reorient_links_upper_right(
    points: &[[f64; 2]],
    tails: &mut [NodeId],
    heads: &mut [NodeId],
) -> usize {
    let mut flipped = 0;
    for (tail, head) in tails.iter_mut().zip(heads.iter_mut()) {
        if needs_reorientation(points[tail.index()], points[head.index()]) {
            std::mem::swap(tail, head);
            flipped += 1;
        }
    }
    flipped
}

/// Euclidean length of each link.
#[must_use]
pub fn calculate_link_lengths(points: &[[f64; 2]], tails: &[NodeId], heads: &[NodeId]) -> Vec<f64> {
    tails
        .iter()
        .zip(heads)
        .map(|(t, h)| distance(points[t.index()], points[h.index()]))
        .collect()
}

/// The active subset of the links and the faces they own.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActiveLinkSet {
    /// Status of each link.
    pub status_at_link: Vec<LinkStatus>,
    /// Active links in ascending id order; position `i` owns `FaceId(i)`.
    pub active_links: Vec<LinkId>,
    /// Face owned by each link, if active.
    pub face_at_link: Vec<Option<FaceId>>,
    /// Width of each face.
    pub width_of_face: Vec<f64>,
}

impl ActiveLinkSet {
    /// Determines which links are active: a link is active when its ridge is
    /// valid and neither end node is closed.
    #[must_use]
    pub fn compute(links: &LinkTable, status_at_node: &[NodeStatus]) -> Self {
        let mut set = Self {
            status_at_link: Vec::with_capacity(links.len()),
            face_at_link: Vec::with_capacity(links.len()),
            ..Self::default()
        };
        for (i, width) in links.ridge_width_at_link.iter().enumerate() {
            let tail = status_at_node[links.node_at_link_tail[i].index()];
            let head = status_at_node[links.node_at_link_head[i].index()];
            match width {
                Some(width) if !tail.is_closed() && !head.is_closed() => {
                    set.status_at_link.push(LinkStatus::Active);
                    set.face_at_link.push(Some(FaceId::new(set.active_links.len())));
                    set.active_links.push(LinkId::new(i));
                    set.width_of_face.push(*width);
                }
                _ => {
                    set.status_at_link.push(LinkStatus::Inactive);
                    set.face_at_link.push(None);
                }
            }
        }
        set
    }

    /// Number of active links, which is also the number of faces.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.active_links.len()
    }

    /// Returns `true` when no link is active.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active_links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::backend::{GeometryBackend, SpadeBackend};
    use approx::assert_relative_eq;

    fn lattice(rows: usize, cols: usize) -> Vec<[f64; 2]> {
        (0..rows)
            .flat_map(|r| (0..cols).map(move |c| [c as f64, r as f64]))
            .collect()
    }

    fn lattice_links() -> LinkTable {
        let points = lattice(3, 4);
        let voronoi = SpadeBackend::default().tessellate(&points).unwrap().voronoi;
        create_links_from_voronoi(
            &points,
            &voronoi,
            DEFAULT_RIDGE_MAGNITUDE_LIMIT,
            true,
            &mut DegeneracyReport::default(),
        )
    }

    #[test]
    fn lattice_links_follow_midpoint_order() {
        let links = lattice_links();
        let tails: Vec<usize> = links.node_at_link_tail.iter().map(|n| n.index()).collect();
        let heads: Vec<usize> = links.node_at_link_head.iter().map(|n| n.index()).collect();
        assert_eq!(tails, vec![0, 1, 2, 0, 1, 2, 3, 4, 5, 6, 4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(heads, vec![1, 2, 3, 4, 5, 6, 7, 5, 6, 7, 8, 9, 10, 11, 9, 10, 11]);
        assert!(links.length_of_link.iter().all(|&l| (l - 1.0).abs() < 1e-12));
    }

    #[test]
    fn only_interior_ridges_are_valid() {
        let links = lattice_links();
        let valid: Vec<usize> = (0..links.len())
            .filter(|&i| links.ridge_width_at_link[i].is_some())
            .collect();
        assert_eq!(valid, vec![4, 5, 7, 8, 9, 11, 12]);
        for w in links.ridge_width_at_link.iter().flatten() {
            assert_relative_eq!(*w, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn closed_nodes_deactivate_their_links() {
        let links = lattice_links();
        let mut status = vec![NodeStatus::FixedValue; 12];
        status[5] = NodeStatus::Core;
        status[6] = NodeStatus::Core;
        let open = ActiveLinkSet::compute(&links, &status);
        assert_eq!(open.len(), 7);
        assert_eq!(open.face_at_link[7], Some(FaceId::new(2)));

        status[1] = NodeStatus::Closed;
        let closed = ActiveLinkSet::compute(&links, &status);
        assert_eq!(closed.len(), 6);
        assert_eq!(closed.status_at_link[4], LinkStatus::Inactive);
        assert_eq!(closed.face_at_link[4], None);
        assert_eq!(closed.active_links[0], LinkId::new(5));
    }

    #[test]
    fn reorientation_is_idempotent() {
        let points = lattice(3, 3);
        let mut tails: Vec<NodeId> = [4, 4, 4, 4, 0, 8].map(NodeId::new).to_vec();
        let mut heads: Vec<NodeId> = [1, 3, 5, 7, 4, 4].map(NodeId::new).to_vec();
        assert_eq!(reorient_links_upper_right(&points, &mut tails, &mut heads), 3);
        let snapshot = (tails.clone(), heads.clone());
        assert_eq!(reorient_links_upper_right(&points, &mut tails, &mut heads), 0);
        assert_eq!((tails, heads), snapshot);
    }

    #[test]
    fn far_vertices_invalidate_ridges() {
        let voronoi = VoronoiDiagram {
            vertices: vec![[0.0, 0.0], [5.0e7, 0.0], [f64::NAN, 0.0], [1.0, 0.0]],
            regions: Vec::new(),
            ridges: Vec::new(),
        };
        let ridge = |a, b| Ridge {
            points: [0, 1],
            vertices: [a, b],
        };
        assert!(is_valid_ridge(&voronoi, &ridge(Some(0), Some(3)), DEFAULT_RIDGE_MAGNITUDE_LIMIT));
        assert!(!is_valid_ridge(&voronoi, &ridge(Some(0), Some(1)), DEFAULT_RIDGE_MAGNITUDE_LIMIT));
        assert!(!is_valid_ridge(&voronoi, &ridge(Some(2), Some(3)), DEFAULT_RIDGE_MAGNITUDE_LIMIT));
        assert!(!is_valid_ridge(&voronoi, &ridge(None, Some(3)), DEFAULT_RIDGE_MAGNITUDE_LIMIT));
        assert!(is_valid_ridge(&voronoi, &ridge(Some(0), Some(1)), 1.0e8));
    }

    #[test]
    fn control_volumes_need_closed_rings() {
        let voronoi = VoronoiDiagram {
            vertices: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            regions: Vec::new(),
            ridges: Vec::new(),
        };
        let closed = VoronoiRegion {
            vertices: vec![0, 1, 2, 3],
            bounded: true,
        };
        let open = VoronoiRegion {
            vertices: vec![0, 1, 2],
            bounded: false,
        };
        assert!(is_control_volume(&voronoi, &closed, DEFAULT_RIDGE_MAGNITUDE_LIMIT));
        assert!(!is_control_volume(&voronoi, &open, DEFAULT_RIDGE_MAGNITUDE_LIMIT));
        assert_relative_eq!(region_area(&voronoi, &closed), 1.0);
    }
}
