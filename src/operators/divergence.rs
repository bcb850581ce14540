//! Control-volume flux divergence.
//!
//! Fluxes are given per active link (equivalently per face) as a flux per
//! unit face width, positive in the link's tail-to-head direction. The total
//! flux through a face is the unit flux times the face width; the divergence at
//! a core node is the net outflow through the faces of its cell divided by the
//! cell area. Nodes without a cell get zero.
//!
//! The in/out matrices are padded with absent entries. Absent entries read a
//! trailing zero slot of the face-flux buffer, so every row is summed without
//! branching on padding.

use crate::core::grid::VoronoiDelaunayGrid;
use crate::core::ids::FaceId;
use crate::operators::validation::{OperatorInputError, check_length};

/// Reusable buffer for repeated divergence evaluations on one grid.
///
/// # Examples
///
/// ```
/// use dualgrid::prelude::*;
///
/// let grid = VoronoiDelaunayGrid::rectangular_lattice((3, 4), 1.0, &GridOptions::default())
///     .unwrap();
/// let mut workspace = DivergenceWorkspace::new();
/// let flux = vec![1.0; grid.number_of_active_links()];
/// let mut div = vec![0.0; grid.number_of_nodes()];
///
/// for _ in 0..3 {
///     workspace.calc_flux_div_at_node(&grid, &flux, &mut div).unwrap();
/// }
/// // node 5 loses flux to the right and upwards, gains from the left and below
/// assert!(div[5].abs() < 1e-9);
/// ```
#[derive(Clone, Debug, Default)]
pub struct DivergenceWorkspace {
    face_flux: Vec<f64>,
}

impl DivergenceWorkspace {
    /// Creates an empty workspace.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            face_flux: Vec::new(),
        }
    }

    /// Loads `unit_flux_at_active_link * width_of_face` plus a trailing zero.
    fn load(
        &mut self,
        grid: &VoronoiDelaunayGrid,
        unit_flux_at_active_link: &[f64],
    ) -> Result<(), OperatorInputError> {
        check_length(
            "unit_flux_at_active_link",
            unit_flux_at_active_link.len(),
            grid.number_of_active_links(),
        )?;
        self.face_flux.clear();
        self.face_flux.extend(
            unit_flux_at_active_link
                .iter()
                .zip(grid.width_of_face())
                .map(|(q, w)| q * w),
        );
        self.face_flux.push(0.0);
        Ok(())
    }

    /// Net outflow at `node` from the loaded face fluxes.
    fn net_outflow(&self, grid: &VoronoiDelaunayGrid, node: usize) -> f64 {
        let zero_slot = self.face_flux.len() - 1;
        let slot = |face: &Option<FaceId>| face.map_or(zero_slot, FaceId::index);
        let out: f64 = grid
            .active_outlinks_at_node()
            .row(node)
            .iter()
            .map(|f| self.face_flux[slot(f)])
            .sum();
        let inflow: f64 = grid
            .active_inlinks_at_node()
            .row(node)
            .iter()
            .map(|f| self.face_flux[slot(f)])
            .sum();
        out - inflow
    }

    /// Flux divergence at every node, written into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorInputError::LengthMismatch`] if the flux slice is not
    /// one value per active link or `out` is not one value per node.
    pub fn calc_flux_div_at_node(
        &mut self,
        grid: &VoronoiDelaunayGrid,
        unit_flux_at_active_link: &[f64],
        out: &mut [f64],
    ) -> Result<(), OperatorInputError> {
        check_length("out", out.len(), grid.number_of_nodes())?;
        self.load(grid, unit_flux_at_active_link)?;
        out.fill(0.0);
        for (node, area) in grid.node_at_cell().iter().zip(grid.area_of_cell()) {
            out[node.index()] = self.net_outflow(grid, node.index()) / area;
        }
        Ok(())
    }

    /// Net outflow through the faces of every cell, written into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`OperatorInputError::LengthMismatch`] if the flux slice is not
    /// one value per active link or `out` is not one value per cell.
    pub fn calc_net_flux_at_cell(
        &mut self,
        grid: &VoronoiDelaunayGrid,
        unit_flux_at_active_link: &[f64],
        out: &mut [f64],
    ) -> Result<(), OperatorInputError> {
        check_length("out", out.len(), grid.number_of_cells())?;
        self.load(grid, unit_flux_at_active_link)?;
        for (value, node) in out.iter_mut().zip(grid.node_at_cell()) {
            *value = self.net_outflow(grid, node.index());
        }
        Ok(())
    }
}

/// Flux divergence at every node with a temporary workspace.
///
/// # Errors
///
/// See [`DivergenceWorkspace::calc_flux_div_at_node`].
pub fn calc_flux_div_at_node(
    grid: &VoronoiDelaunayGrid,
    unit_flux_at_active_link: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    DivergenceWorkspace::new().calc_flux_div_at_node(grid, unit_flux_at_active_link, out)
}

/// Net flux through every cell with a temporary workspace.
///
/// # Errors
///
/// See [`DivergenceWorkspace::calc_net_flux_at_cell`].
pub fn calc_net_flux_at_cell(
    grid: &VoronoiDelaunayGrid,
    unit_flux_at_active_link: &[f64],
    out: &mut [f64],
) -> Result<(), OperatorInputError> {
    DivergenceWorkspace::new().calc_net_flux_at_cell(grid, unit_flux_at_active_link, out)
}
