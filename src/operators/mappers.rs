//! Mapping values between element kinds.
//!
//! Link-from-node mappers read the two end nodes of every link. Node-from-link
//! mappers read every link at a node. The upwind/downwind family reads link
//! values as gradients, so flow runs against the sign: a positive value
//! moves material from head to tail. At a node a link brings in `value * dir`
//! and carries away `-value * dir`, with `dir` taken from
//! [`link_dirs_at_node`](VoronoiDelaunayGrid::link_dirs_at_node).
//!
//! Every mapper writes into a caller-provided slice and checks lengths first.

use crate::core::grid::VoronoiDelaunayGrid;
use crate::operators::validation::{OperatorInputError, check_length};

fn check_node_to_link(
    grid: &VoronoiDelaunayGrid,
    values_at_node: &[f64],
    out: &[f64],
) -> Result<(), OperatorInputError> {
    check_length("values_at_node", values_at_node.len(), grid.number_of_nodes())?;
    check_length("out", out.len(), grid.number_of_links())
}

fn check_link_to_node(
    grid: &VoronoiDelaunayGrid,
    values_at_link: &[f64],
    out: &[f64],
) -> Result<(), OperatorInputError> {
    check_length("values_at_link", values_at_link.len(), grid.number_of_links())?;
    check_length("out", out.len(), grid.number_of_nodes())
}

/// Applies `f(tail value, head value)` to every link.
fn map_link_ends(
    grid: &VoronoiDelaunayGrid,
    values_at_node: &[f64],
    out: &mut [f64],
    f: impl Fn(f64, f64) -> f64,
) -> Result<(), OperatorInputError> {
    check_node_to_link(grid, values_at_node, out)?;
    for ((value, tail), head) in out
        .iter_mut()
        .zip(grid.node_at_link_tail())
        .zip(grid.node_at_link_head())
    {
        *value = f(values_at_node[tail.index()], values_at_node[head.index()]);
    }
    Ok(())
}

/// Value at each link's head node.
///
/// # Errors
///
/// Returns [`OperatorInputError::LengthMismatch`] if `values_at_node` is not
/// one value per node or `out` is not one value per link.
///
/// # Examples
///
/// ```
/// use dualgrid::prelude::*;
///
/// let grid = VoronoiDelaunayGrid::rectangular_lattice((3, 4), 1.0, &GridOptions::default())
///     .unwrap();
/// let z: Vec<f64> = (0..12).map(f64::from).collect();
/// let mut out = vec![0.0; grid.number_of_links()];
/// map_link_head_node_to_link(&grid, &z, &mut out).unwrap();
/// assert_eq!(&out[..4], &[1.0, 2.0, 3.0, 4.0]);
/// ```
pub fn map_link_head_node_to_link(
    grid: &VoronoiDelaunayGrid,
    values_at_node: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_link_ends(grid, values_at_node, out, |_, head| head)
}

/// Value at each link's tail node.
///
/// # Errors
///
/// See [`map_link_head_node_to_link`].
pub fn map_link_tail_node_to_link(
    grid: &VoronoiDelaunayGrid,
    values_at_node: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_link_ends(grid, values_at_node, out, |tail, _| tail)
}

/// Smaller of each link's two node values.
///
/// # Errors
///
/// See [`map_link_head_node_to_link`].
pub fn map_min_of_link_nodes_to_link(
    grid: &VoronoiDelaunayGrid,
    values_at_node: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_link_ends(grid, values_at_node, out, f64::min)
}

/// Larger of each link's two node values.
///
/// # Errors
///
/// See [`map_link_head_node_to_link`].
pub fn map_max_of_link_nodes_to_link(
    grid: &VoronoiDelaunayGrid,
    values_at_node: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_link_ends(grid, values_at_node, out, f64::max)
}

/// Mean of each link's two node values.
///
/// # Errors
///
/// See [`map_link_head_node_to_link`].
pub fn map_mean_of_link_nodes_to_link(
    grid: &VoronoiDelaunayGrid,
    values_at_node: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_link_ends(grid, values_at_node, out, |tail, head| 0.5 * (tail + head))
}

/// Applies `pick(tail control, head control)`; `true` selects the tail value.
fn map_value_at_control_node(
    grid: &VoronoiDelaunayGrid,
    control_at_node: &[f64],
    values_at_node: &[f64],
    out: &mut [f64],
    pick_tail: impl Fn(f64, f64) -> bool,
) -> Result<(), OperatorInputError> {
    check_length("control_at_node", control_at_node.len(), grid.number_of_nodes())?;
    check_node_to_link(grid, values_at_node, out)?;
    for ((value, tail), head) in out
        .iter_mut()
        .zip(grid.node_at_link_tail())
        .zip(grid.node_at_link_head())
    {
        let (t, h) = (tail.index(), head.index());
        *value = if pick_tail(control_at_node[t], control_at_node[h]) {
            values_at_node[t]
        } else {
            values_at_node[h]
        };
    }
    Ok(())
}

/// Value at whichever end node has the smaller control value; ties take the
/// head.
///
/// # Errors
///
/// Returns [`OperatorInputError::LengthMismatch`] if either node slice is not
/// one value per node or `out` is not one value per link.
pub fn map_value_at_min_node_to_link(
    grid: &VoronoiDelaunayGrid,
    control_at_node: &[f64],
    values_at_node: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_value_at_control_node(grid, control_at_node, values_at_node, out, |t, h| t < h)
}

/// Value at whichever end node has the larger control value; ties take the
/// head.
///
/// # Errors
///
/// See [`map_value_at_min_node_to_link`].
pub fn map_value_at_max_node_to_link(
    grid: &VoronoiDelaunayGrid,
    control_at_node: &[f64],
    values_at_node: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_value_at_control_node(grid, control_at_node, values_at_node, out, |t, h| t > h)
}

/// Value at each cell's node.
///
/// # Errors
///
/// Returns [`OperatorInputError::LengthMismatch`] if `values_at_node` is not
/// one value per node or `out` is not one value per cell.
pub fn map_node_to_cell(
    grid: &VoronoiDelaunayGrid,
    values_at_node: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    check_length("values_at_node", values_at_node.len(), grid.number_of_nodes())?;
    check_length("out", out.len(), grid.number_of_cells())?;
    for (value, node) in out.iter_mut().zip(grid.node_at_cell()) {
        *value = values_at_node[node.index()];
    }
    Ok(())
}

/// Applies `f(link values, directions)` to the links of every node.
fn map_node_links(
    grid: &VoronoiDelaunayGrid,
    values_at_link: &[f64],
    out: &mut [f64],
    f: impl Fn(&mut dyn Iterator<Item = (usize, f64, f64)>) -> f64,
) -> Result<(), OperatorInputError> {
    check_link_to_node(grid, values_at_link, out)?;
    let links = grid.links_at_node();
    let dirs = grid.link_dirs_at_node();
    for (node, value) in out.iter_mut().enumerate() {
        let entries: &mut dyn Iterator<Item = (usize, f64, f64)> = &mut links
            .row(node)
            .iter()
            .zip(dirs.row(node))
            .map(|(link, &dir)| (link.index(), values_at_link[link.index()], f64::from(dir)));
        *value = f(entries);
    }
    Ok(())
}

/// Smallest value among the links at each node.
///
/// # Errors
///
/// Returns [`OperatorInputError::LengthMismatch`] if `values_at_link` is not
/// one value per link or `out` is not one value per node.
pub fn map_min_of_node_links_to_node(
    grid: &VoronoiDelaunayGrid,
    values_at_link: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_node_links(grid, values_at_link, out, |entries| {
        entries.map(|(_, v, _)| v).fold(f64::MAX, f64::min)
    })
}

/// Largest value among the links at each node.
///
/// # Errors
///
/// See [`map_min_of_node_links_to_node`].
pub fn map_max_of_node_links_to_node(
    grid: &VoronoiDelaunayGrid,
    values_at_link: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_node_links(grid, values_at_link, out, |entries| {
        entries.map(|(_, v, _)| v).fold(-f64::MAX, f64::max)
    })
}

/// Which way a flux is counted at a node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Flow {
    /// Flux entering the node.
    Upwind,
    /// Flux leaving the node.
    Downwind,
}

impl Flow {
    #[inline]
    fn magnitude(self, value: f64, dir: f64) -> f64 {
        match self {
            Self::Upwind => value * dir,
            Self::Downwind => -value * dir,
        }
    }
}

/// Largest positive flow magnitude at a node and the link carrying it.
fn strongest(flow: Flow, entries: &mut dyn Iterator<Item = (usize, f64, f64)>) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (link, value, dir) in entries {
        let magnitude = flow.magnitude(value, dir);
        if magnitude > 0.0 && best.is_none_or(|(_, m)| magnitude > m) {
            best = Some((link, magnitude));
        }
    }
    best
}

fn mean_positive(flow: Flow, entries: &mut dyn Iterator<Item = (usize, f64, f64)>) -> f64 {
    let (sum, count) = entries
        .map(|(_, value, dir)| flow.magnitude(value, dir))
        .filter(|&m| m > 0.0)
        .fold((0.0, 0_u32), |(s, c), m| (s + m, c + 1));
    if count == 0 { 0.0 } else { sum / f64::from(count) }
}

/// Largest inflow at each node, or zero when nothing flows in.
///
/// # Errors
///
/// See [`map_min_of_node_links_to_node`].
///
/// # Examples
///
/// ```
/// use dualgrid::prelude::*;
///
/// let grid = VoronoiDelaunayGrid::rectangular_lattice((3, 4), 1.0, &GridOptions::default())
///     .unwrap();
/// let mut grad = vec![0.0; grid.number_of_links()];
/// grad[0] = -2.0; // downhill from node 0 to node 1
/// let mut out = vec![0.0; grid.number_of_nodes()];
/// map_upwind_node_link_max_to_node(&grid, &grad, &mut out).unwrap();
/// assert_eq!(out[1], 2.0);
/// assert_eq!(out[0], 0.0);
/// ```
pub fn map_upwind_node_link_max_to_node(
    grid: &VoronoiDelaunayGrid,
    values_at_link: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_node_links(grid, values_at_link, out, |entries| {
        strongest(Flow::Upwind, entries).map_or(0.0, |(_, m)| m)
    })
}

/// Largest outflow at each node, or zero when nothing flows out.
///
/// # Errors
///
/// See [`map_min_of_node_links_to_node`].
pub fn map_downwind_node_link_max_to_node(
    grid: &VoronoiDelaunayGrid,
    values_at_link: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_node_links(grid, values_at_link, out, |entries| {
        strongest(Flow::Downwind, entries).map_or(0.0, |(_, m)| m)
    })
}

/// Mean of the positive inflows at each node, or zero when nothing flows in.
///
/// # Errors
///
/// See [`map_min_of_node_links_to_node`].
pub fn map_upwind_node_link_mean_to_node(
    grid: &VoronoiDelaunayGrid,
    values_at_link: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_node_links(grid, values_at_link, out, |entries| {
        mean_positive(Flow::Upwind, entries)
    })
}

/// Mean of the positive outflows at each node, or zero when nothing flows out.
///
/// # Errors
///
/// See [`map_min_of_node_links_to_node`].
pub fn map_downwind_node_link_mean_to_node(
    grid: &VoronoiDelaunayGrid,
    values_at_link: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_node_links(grid, values_at_link, out, |entries| {
        mean_positive(Flow::Downwind, entries)
    })
}

fn map_value_at_strongest(
    flow: Flow,
    grid: &VoronoiDelaunayGrid,
    control_at_link: &[f64],
    values_at_link: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    check_length("values_at_link", values_at_link.len(), grid.number_of_links())?;
    map_node_links(grid, control_at_link, out, |entries| {
        strongest(flow, entries).map_or(0.0, |(link, _)| values_at_link[link])
    })
}

/// Value of `values_at_link` on the link carrying the largest inflow (per
/// `control_at_link`) into each node; zero when nothing flows in.
///
/// # Errors
///
/// Returns [`OperatorInputError::LengthMismatch`] if either link slice is not
/// one value per link or `out` is not one value per node.
pub fn map_value_at_upwind_node_link_max_to_node(
    grid: &VoronoiDelaunayGrid,
    control_at_link: &[f64],
    values_at_link: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_value_at_strongest(Flow::Upwind, grid, control_at_link, values_at_link, out)
}

/// Value of `values_at_link` on the link carrying the largest outflow from
/// each node; zero when nothing flows out.
///
/// # Errors
///
/// See [`map_value_at_upwind_node_link_max_to_node`].
pub fn map_value_at_downwind_node_link_max_to_node(
    grid: &VoronoiDelaunayGrid,
    control_at_link: &[f64],
    values_at_link: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    map_value_at_strongest(Flow::Downwind, grid, control_at_link, values_at_link, out)
}
