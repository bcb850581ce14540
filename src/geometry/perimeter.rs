//! Perimeter detection and the initial core/boundary split.
//!
//! Nodes on the convex hull of the point set, including nodes lying on a hull
//! edge, are perimeter nodes. Detection uses Andrew's monotone chain with a
//! relative collinearity tolerance so that lattice rows which are straight up
//! to rounding stay on the hull.
//!
//! Points strictly inside the hull but numerically indistinguishable from a
//! hull edge can still be misclassified as core. The grid guards against the
//! consequence, a core node whose Voronoi region is open or reaches out to an
//! absurdly distant vertex, by promoting such nodes to boundary after
//! tessellation.

use crate::core::ids::{CellId, NodeId};
use crate::core::status::NodeStatus;
use crate::geometry::{measures::cross, sorting::argsort_points_by_x_then_y};

/// Default relative tolerance for treating three perimeter points as collinear.
pub const DEFAULT_COLLINEAR_TOLERANCE: f64 = 1e-9;

/// Marks every point on the convex hull, including collinear hull points.
///
/// `tolerance` is relative to the squared extent of the point set: a turn
/// whose cross product magnitude is at most `tolerance * extent^2` counts as
/// straight.
///
/// # Examples
///
/// ```
/// use dualgrid::geometry::perimeter::find_perimeter_nodes;
///
/// let points = [[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [1.0, 1.0], [0.0, 2.0], [2.0, 2.0]];
/// let on_hull = find_perimeter_nodes(&points, 1e-9);
/// assert_eq!(on_hull, vec![true, true, true, false, true, true]);
/// ```
#[must_use]
pub fn find_perimeter_nodes(points: &[[f64; 2]], tolerance: f64) -> Vec<bool> {
    let mut on_hull = vec![false; points.len()];
    if points.len() < 3 {
        on_hull.fill(true);
        return on_hull;
    }

    let threshold = tolerance * extent(points).powi(2);
    let order = argsort_points_by_x_then_y(points);

    let mut chain: Vec<usize> = Vec::with_capacity(points.len());
    for pass in [order.clone(), order.into_iter().rev().collect()] {
        chain.clear();
        for i in pass {
            while let &[.., a, b] = chain.as_slice()
                && cross(points[a], points[b], points[i]) < -threshold
            {
                chain.pop();
            }
            chain.push(i);
        }
        for &i in &chain {
            on_hull[i] = true;
        }
    }
    on_hull
}

fn extent(points: &[[f64; 2]]) -> f64 {
    let (mut xmin, mut xmax, mut ymin, mut ymax) = (
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
    );
    for &[x, y] in points {
        xmin = xmin.min(x);
        xmax = xmax.max(x);
        ymin = ymin.min(y);
        ymax = ymax.max(y);
    }
    (xmax - xmin).max(ymax - ymin)
}

/// Core/boundary split of the nodes and the cells owned by core nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PerimeterClassification {
    /// Status of every node.
    pub status_at_node: Vec<NodeStatus>,
    /// Core nodes in ascending id order.
    pub core_nodes: Vec<NodeId>,
    /// Boundary nodes in ascending id order.
    pub boundary_nodes: Vec<NodeId>,
    /// Cell owned by each node, if any.
    pub cell_at_node: Vec<Option<CellId>>,
    /// Node owning each cell; identical to `core_nodes`.
    pub node_at_cell: Vec<NodeId>,
}

impl PerimeterClassification {
    /// Classifies points by hull membership: hull nodes become fixed-value
    /// boundary nodes, everything else is core.
    #[must_use]
    pub fn from_points(points: &[[f64; 2]], tolerance: f64) -> Self {
        let on_hull = find_perimeter_nodes(points, tolerance);
        Self::from_statuses(
            on_hull
                .into_iter()
                .map(|b| {
                    if b {
                        NodeStatus::FixedValue
                    } else {
                        NodeStatus::Core
                    }
                })
                .collect(),
        )
    }

    /// Derives core/boundary lists and cell numbering from node statuses.
    ///
    /// Cells are numbered in ascending order of their core node.
    #[must_use]
    pub fn from_statuses(status_at_node: Vec<NodeStatus>) -> Self {
        let mut core_nodes = Vec::new();
        let mut boundary_nodes = Vec::new();
        let mut cell_at_node = Vec::with_capacity(status_at_node.len());
        for (i, status) in status_at_node.iter().enumerate() {
            if status.is_boundary() {
                boundary_nodes.push(NodeId::new(i));
                cell_at_node.push(None);
            } else {
                cell_at_node.push(Some(CellId::new(core_nodes.len())));
                core_nodes.push(NodeId::new(i));
            }
        }
        Self {
            node_at_cell: core_nodes.clone(),
            status_at_node,
            core_nodes,
            boundary_nodes,
            cell_at_node,
        }
    }

    /// Turns the given core nodes into fixed-value boundary nodes and
    /// renumbers the cells. Returns the nodes that actually changed.
    pub fn promote_to_boundary(&mut self, nodes: &[NodeId]) -> Vec<NodeId> {
        let mut promoted = Vec::new();
        let mut statuses = std::mem::take(&mut self.status_at_node);
        for &node in nodes {
            if let Some(status) = statuses.get_mut(node.index())
                && !status.is_boundary()
            {
                *status = NodeStatus::FixedValue;
                promoted.push(node);
            }
        }
        *self = Self::from_statuses(statuses);
        promoted
    }

    /// Number of cells.
    #[inline]
    #[must_use]
    pub fn number_of_cells(&self) -> usize {
        self.node_at_cell.len()
    }
}
