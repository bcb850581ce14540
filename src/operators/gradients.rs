//! Gradients along links and across patches.

use crate::core::grid::VoronoiDelaunayGrid;
use crate::geometry::measures::plane_gradient;
use crate::operators::validation::{OperatorInputError, check_length};

/// Gradient `(z_head - z_tail) / length` along every link.
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
/// let grid = VoronoiDelaunayGrid::rectangular_lattice((3, 3), 2.0, &GridOptions::default())
///     .unwrap();
/// let z: Vec<f64> = grid.node_x().iter().map(|x| 3.0 * x).collect();
/// let mut grad = vec![0.0; grid.number_of_links()];
/// calc_grad_at_link(&grid, &z, &mut grad).unwrap();
/// assert!((grad[0] - 3.0).abs() < 1e-12);
/// ```
pub fn calc_grad_at_link(
    grid: &VoronoiDelaunayGrid,
    values_at_node: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    check_length("values_at_node", values_at_node.len(), grid.number_of_nodes())?;
    check_length("out", out.len(), grid.number_of_links())?;
    for (((g, tail), head), length) in out
        .iter_mut()
        .zip(grid.node_at_link_tail())
        .zip(grid.node_at_link_head())
        .zip(grid.length_of_link())
    {
        *g = (values_at_node[head.index()] - values_at_node[tail.index()]) / length;
    }
    Ok(())
}

/// Gradient along every active link, in face order.
///
/// # Errors
///
/// Returns [`OperatorInputError::LengthMismatch`] if `values_at_node` is not
/// one value per node or `out` is not one value per active link.
pub fn calc_grad_at_active_link(
    grid: &VoronoiDelaunayGrid,
    values_at_node: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    check_length("values_at_node", values_at_node.len(), grid.number_of_nodes())?;
    check_length("out", out.len(), grid.number_of_active_links())?;
    let (tails, heads, lengths) = (
        grid.node_at_link_tail(),
        grid.node_at_link_head(),
        grid.length_of_link(),
    );
    for (g, link) in out.iter_mut().zip(grid.active_links()) {
        let i = link.index();
        *g = (values_at_node[heads[i].index()] - values_at_node[tails[i].index()]) / lengths[i];
    }
    Ok(())
}

/// Unit vector `(dx, dy) / length` of one link.
fn unit_vector(grid: &VoronoiDelaunayGrid, link: usize) -> [f64; 2] {
    let xy = grid.xy_of_node();
    let tail = xy[grid.node_at_link_tail()[link].index()];
    let head = xy[grid.node_at_link_head()[link].index()];
    let length = grid.length_of_link()[link];
    [(head[0] - tail[0]) / length, (head[1] - tail[1]) / length]
}

/// Splits a value on every link into x and y components along the link's
/// unit vector.
///
/// # Errors
///
/// Returns [`OperatorInputError::LengthMismatch`] unless all three slices
/// hold one value per link.
pub fn resolve_values_on_links(
    grid: &VoronoiDelaunayGrid,
    values_at_link: &[f64],
    out_x: &mut [f64],
    out_y: &mut [f64],
) -> Result<(), OperatorInputError> {
    let n = grid.number_of_links();
    check_length("values_at_link", values_at_link.len(), n)?;
    check_length("out_x", out_x.len(), n)?;
    check_length("out_y", out_y.len(), n)?;
    for (link, value) in values_at_link.iter().enumerate() {
        let [ux, uy] = unit_vector(grid, link);
        out_x[link] = value * ux;
        out_y[link] = value * uy;
    }
    Ok(())
}

/// Splits a value on every active link into x and y components.
///
/// # Errors
///
/// Returns [`OperatorInputError::LengthMismatch`] unless all three slices
/// hold one value per active link.
pub fn resolve_values_on_active_links(
    grid: &VoronoiDelaunayGrid,
    values_at_active_link: &[f64],
    out_x: &mut [f64],
    out_y: &mut [f64],
) -> Result<(), OperatorInputError> {
    let n = grid.number_of_active_links();
    check_length("values_at_active_link", values_at_active_link.len(), n)?;
    check_length("out_x", out_x.len(), n)?;
    check_length("out_y", out_y.len(), n)?;
    for (face, (link, value)) in grid
        .active_links()
        .iter()
        .zip(values_at_active_link)
        .enumerate()
    {
        let [ux, uy] = unit_vector(grid, link.index());
        out_x[face] = value * ux;
        out_y[face] = value * uy;
    }
    Ok(())
}

/// Gradient of the plane through the three corners of every patch.
///
/// # Errors
///
/// Returns [`OperatorInputError::LengthMismatch`] if `values_at_node` is not
/// one value per node or the outputs are not one value per patch.
pub fn calc_grad_at_patch(
    grid: &VoronoiDelaunayGrid,
    values_at_node: &[f64],
    out_x: &mut [f64],
    out_y: &mut [f64],
) -> Result<(), OperatorInputError> {
    check_length("values_at_node", values_at_node.len(), grid.number_of_nodes())?;
    check_length("out_x", out_x.len(), grid.number_of_patches())?;
    check_length("out_y", out_y.len(), grid.number_of_patches())?;
    let xy = grid.xy_of_node();
    for (patch, nodes) in grid.nodes_at_patch().iter().enumerate() {
        let corners = nodes.map(|n| xy[n.index()]);
        let z = nodes.map(|n| values_at_node[n.index()]);
        // back-end triangles are never degenerate
        let [gx, gy] = plane_gradient(corners, z).unwrap_or([0.0; 2]);
        out_x[patch] = gx;
        out_y[patch] = gy;
    }
    Ok(())
}

/// Mean slope angle (radians) of the patches around every node; zero for
/// nodes without patches.
///
/// # Errors
///
/// Returns [`OperatorInputError::LengthMismatch`] unless both slices hold one
/// value per node.
pub fn calc_slope_at_node(
    grid: &VoronoiDelaunayGrid,
    values_at_node: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    check_length("out", out.len(), grid.number_of_nodes())?;
    let mut gx = vec![0.0; grid.number_of_patches()];
    let mut gy = vec![0.0; grid.number_of_patches()];
    calc_grad_at_patch(grid, values_at_node, &mut gx, &mut gy)?;
    let slope_at_patch: Vec<f64> = gx.iter().zip(&gy).map(|(x, y)| x.hypot(*y).atan()).collect();

    for (value, patches) in out.iter_mut().zip(grid.patches().patches_at_node().rows()) {
        *value = if patches.is_empty() {
            0.0
        } else {
            let sum: f64 = patches.iter().map(|p| slope_at_patch[p.index()]).sum();
            sum / num_traits::cast::<usize, f64>(patches.len()).unwrap_or(f64::NAN)
        };
    }
    Ok(())
}
