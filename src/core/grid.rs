//! The Voronoi/Delaunay dual-mesh grid.
//!
//! [`VoronoiDelaunayGrid`] owns the fixed skeleton of an unstructured mesh
//! built from scattered points:
//!
//! - **nodes**, numbered in row-major order of their coordinates;
//! - **links**, one per Delaunay edge, in midpoint order and (by default)
//!   pointing up and to the right;
//! - **cells**, the Voronoi polygons of interior (core) nodes;
//! - **faces**, the Voronoi ridges crossed by active links;
//! - **patches**, the Delaunay triangles, built lazily.
//!
//! Construction runs eagerly through every stage except patches. After
//! construction only boundary statuses may change, and each change rebuilds
//! the active-link subset and everything derived from it.
//!
//! # Examples
//!
//! ```
//! use dualgrid::prelude::*;
//!
//! let x = [0.0, 1.0, 2.0, 0.0, 1.0, 2.0, 0.0, 1.0, 2.0];
//! let y = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0];
//! let grid = VoronoiDelaunayGrid::new(&x, &y).unwrap();
//!
//! assert_eq!(grid.number_of_nodes(), 9);
//! assert_eq!(grid.number_of_links(), 12);
//! assert_eq!(grid.number_of_cells(), 1);
//! assert_eq!(grid.number_of_active_links(), 4);
//! assert!((grid.area_of_cell()[0] - 1.0).abs() < 1e-9);
//! ```

use crate::core::collections::{NoDataPolicy, PaddedTable, RaggedArray, UnknownPolicyError};
use crate::core::connectivity::{ActiveLinkMatrices, NodeLinks};
use crate::core::ids::{CellId, FaceId, LinkId, NodeId};
use crate::core::patches::PatchTables;
use crate::core::status::{LinkStatus, NodeStatus};
use crate::core::topology::{
    ActiveLinkSet, DEFAULT_RIDGE_MAGNITUDE_LIMIT, DegeneracyReport, LinkTable,
    calculate_link_lengths, create_links_from_voronoi, is_control_volume, region_area,
};
use crate::geometry::backend::{
    DEFAULT_VERTEX_MERGE_TOLERANCE, GeometryBackend, GeometryError, SpadeBackend, VoronoiRegion,
};
use crate::geometry::perimeter::{DEFAULT_COLLINEAR_TOLERANCE, PerimeterClassification};
use crate::geometry::point_generation::{
    PointGenerationError, RadialLayout, hex_points, rectangular_lattice,
};
use crate::geometry::sorting::argsort_points_by_x_then_y;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that abort grid construction.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum ConstructionError {
    /// The x and y coordinate arrays differ in length.
    #[error("coordinate arrays differ in length: {x_len} x values, {y_len} y values")]
    CoordinateLengthMismatch {
        /// Number of x values.
        x_len: usize,
        /// Number of y values.
        y_len: usize,
    },
    /// A coordinate is NaN or infinite.
    #[error("point {index} has a non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate {
        /// Index of the point in the input arrays.
        index: usize,
        /// x coordinate.
        x: f64,
        /// y coordinate.
        y: f64,
    },
    /// Fewer points than a triangulation needs.
    #[error("{count} points supplied, at least {minimum} are required")]
    TooFewPoints {
        /// Number of points supplied.
        count: usize,
        /// Minimum number of points.
        minimum: usize,
    },
    /// Every node lies on the perimeter, so no control volume exists.
    #[error("none of the {number_of_nodes} nodes owns a Voronoi cell")]
    NoCells {
        /// Number of nodes.
        number_of_nodes: usize,
    },
    /// A node is not connected to any other node.
    #[error("{node} has no links (duplicate point?)")]
    IsolatedNode {
        /// The isolated node.
        node: NodeId,
    },
    /// The geometry back end failed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    /// A point generator rejected its parameters.
    #[error(transparent)]
    PointGeneration(#[from] PointGenerationError),
}

/// Errors raised by boundary-status changes.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum BoundaryStatusError {
    /// The node id is outside the grid.
    #[error("{node} is out of range for a grid of {number_of_nodes} nodes")]
    NodeOutOfRange {
        /// The offending node.
        node: NodeId,
        /// Number of nodes in the grid.
        number_of_nodes: usize,
    },
    /// Core nodes keep their cell and status for the lifetime of the grid.
    #[error("{node} is a core node and its status cannot change")]
    CoreNode {
        /// The offending node.
        node: NodeId,
    },
    /// Boundary nodes cannot become core nodes.
    #[error("{node} cannot be made a core node")]
    ToCore {
        /// The offending node.
        node: NodeId,
    },
}

/// Errors raised when restoring a grid from a [`GridSnapshot`].
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum SnapshotError {
    /// A table has the wrong length.
    #[error("snapshot table {what} has length {actual}, expected {expected}")]
    LengthMismatch {
        /// Name of the table.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// A table refers to a node that does not exist.
    #[error("snapshot table {what} refers to {node}, but the grid has {number_of_nodes} nodes")]
    NodeOutOfRange {
        /// Name of the table.
        what: &'static str,
        /// The offending node.
        node: NodeId,
        /// Number of nodes.
        number_of_nodes: usize,
    },
    /// A coordinate is NaN or infinite.
    #[error("snapshot coordinate of {node} is not finite")]
    NonFiniteCoordinate {
        /// The offending node.
        node: NodeId,
    },
    /// A cell area is not a positive finite number.
    #[error("snapshot area of {cell} is {area}")]
    InvalidCellArea {
        /// The offending cell.
        cell: CellId,
        /// The stored area.
        area: f64,
    },
    /// A link joins a node to itself or to a coincident node.
    #[error("snapshot {link} has zero length")]
    DegenerateLink {
        /// The offending link.
        link: LinkId,
    },
    /// A ridge width is negative or not finite.
    #[error("snapshot ridge width of {link} is {width}")]
    InvalidRidgeWidth {
        /// The offending link.
        link: LinkId,
        /// The stored width.
        width: f64,
    },
    /// The region degree cannot be larger than the number of nodes.
    #[error("snapshot region degree {max_region_degree} exceeds the {number_of_nodes} nodes")]
    RegionDegreeOutOfRange {
        /// The stored degree.
        max_region_degree: usize,
        /// Number of nodes.
        number_of_nodes: usize,
    },
    /// The snapshot has no core node.
    #[error("snapshot has no cells")]
    NoCells,
    /// Rebuilding the derived tables failed.
    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Reads the ridge magnitude limit, honouring the
/// `DUALGRID_RIDGE_MAGNITUDE_LIMIT` environment variable.
fn default_ridge_magnitude_limit() -> f64 {
    if let Ok(v) = std::env::var("DUALGRID_RIDGE_MAGNITUDE_LIMIT")
        && let Ok(limit) = v.parse::<f64>()
        && limit > 0.0
        && limit.is_finite()
    {
        return limit;
    }
    DEFAULT_RIDGE_MAGNITUDE_LIMIT
}

/// Grid construction options.
///
/// # Examples
///
/// ```
/// use dualgrid::core::grid::GridOptionsBuilder;
///
/// let options = GridOptionsBuilder::default()
///     .reorient_links(false)
///     .ridge_magnitude_limit(1.0e6)
///     .build()
///     .unwrap();
/// assert!(!options.reorient_links);
///
/// assert!(GridOptionsBuilder::default().collinear_tolerance(-1.0).build().is_err());
/// ```
#[derive(Builder, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct GridOptions {
    /// Point every link up and to the right.
    #[builder(default = "true")]
    pub reorient_links: bool,
    /// Voronoi vertices with a coordinate magnitude at or beyond this bound
    /// are treated as lying at infinity.
    #[builder(default = "default_ridge_magnitude_limit()")]
    pub ridge_magnitude_limit: f64,
    /// Relative tolerance under which three perimeter points count as collinear.
    #[builder(default = "DEFAULT_COLLINEAR_TOLERANCE")]
    pub collinear_tolerance: f64,
    /// Relative distance under which circumcenters merge into one Voronoi vertex.
    #[builder(default = "DEFAULT_VERTEX_MERGE_TOLERANCE")]
    pub vertex_merge_tolerance: f64,
}

impl GridOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(limit) = self.ridge_magnitude_limit
            && !(limit > 0.0 && limit.is_finite())
        {
            return Err(format!("ridge_magnitude_limit must be positive, got {limit}"));
        }
        for (name, value) in [
            ("collinear_tolerance", self.collinear_tolerance),
            ("vertex_merge_tolerance", self.vertex_merge_tolerance),
        ] {
            if let Some(value) = value
                && !(value >= 0.0 && value.is_finite())
            {
                return Err(format!("{name} must be non-negative, got {value}"));
            }
        }
        Ok(())
    }
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            reorient_links: true,
            ridge_magnitude_limit: default_ridge_magnitude_limit(),
            collinear_tolerance: DEFAULT_COLLINEAR_TOLERANCE,
            vertex_merge_tolerance: DEFAULT_VERTEX_MERGE_TOLERANCE,
        }
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Serializable state from which a grid can be rebuilt without re-running the
/// geometry back end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Options the grid was built with.
    pub options: GridOptions,
    /// Node x coordinates.
    pub node_x: Vec<f64>,
    /// Node y coordinates.
    pub node_y: Vec<f64>,
    /// Node statuses.
    pub status_at_node: Vec<NodeStatus>,
    /// Link tails.
    pub node_at_link_tail: Vec<NodeId>,
    /// Link heads.
    pub node_at_link_head: Vec<NodeId>,
    /// Ridge widths of links with a valid ridge.
    pub ridge_width_at_link: Vec<Option<f64>>,
    /// Cell areas.
    pub area_of_cell: Vec<f64>,
    /// Patch corners.
    pub nodes_at_patch: Vec<[NodeId; 3]>,
    /// Largest Voronoi region degree.
    pub max_region_degree: usize,
    /// Degeneracies absorbed at construction.
    pub degeneracies: DegeneracyReport,
}

// =============================================================================
// GRID
// =============================================================================

/// Everything construction computes before the derived tables.
struct Skeleton {
    points: Vec<[f64; 2]>,
    classification: PerimeterClassification,
    area_of_cell: Vec<f64>,
    links: LinkTable,
    nodes_at_patch: Vec<[NodeId; 3]>,
    max_region_degree: usize,
    degeneracies: DegeneracyReport,
}

/// Unstructured Voronoi/Delaunay dual mesh.
///
/// See the [module documentation](self) for an overview.
#[derive(Clone, Debug)]
pub struct VoronoiDelaunayGrid {
    options: GridOptions,
    node_x: Vec<f64>,
    node_y: Vec<f64>,
    xy_of_node: Vec<[f64; 2]>,
    classification: PerimeterClassification,
    area_of_cell: Vec<f64>,
    links: LinkTable,
    active: ActiveLinkSet,
    node_links: NodeLinks,
    matrices: ActiveLinkMatrices,
    nodes_at_patch: Vec<[NodeId; 3]>,
    max_region_degree: usize,
    degeneracies: DegeneracyReport,
    patches: OnceLock<PatchTables>,
}

impl VoronoiDelaunayGrid {
    /// Builds a grid from coordinate arrays with default options.
    ///
    /// # Errors
    ///
    /// See [`with_backend`](Self::with_backend).
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, ConstructionError> {
        Self::with_options(x, y, &GridOptions::default())
    }

    /// Builds a grid from coordinate arrays.
    ///
    /// # Errors
    ///
    /// See [`with_backend`](Self::with_backend).
    pub fn with_options(
        x: &[f64],
        y: &[f64],
        options: &GridOptions,
    ) -> Result<Self, ConstructionError> {
        let backend = SpadeBackend::new(options.vertex_merge_tolerance);
        Self::with_backend(x, y, options, &backend)
    }

    /// Builds a grid from `[x, y]` points, for use with the generators in
    /// [`point_generation`](crate::geometry::point_generation).
    ///
    /// # Errors
    ///
    /// See [`with_backend`](Self::with_backend).
    pub fn from_points(
        points: &[[f64; 2]],
        options: &GridOptions,
    ) -> Result<Self, ConstructionError> {
        let (x, y): (Vec<f64>, Vec<f64>) = points.iter().map(|&[x, y]| (x, y)).unzip();
        Self::with_options(&x, &y, options)
    }

    /// Rectangular lattice grid of `shape = (rows, columns)` nodes.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::PointGeneration`] for invalid parameters,
    /// or any other construction error.
    pub fn rectangular_lattice(
        shape: (usize, usize),
        spacing: f64,
        options: &GridOptions,
    ) -> Result<Self, ConstructionError> {
        Self::from_points(&rectangular_lattice(shape, spacing)?, options)
    }

    /// Hexagon-shaped grid of a triangular lattice; see
    /// [`hex_points`](crate::geometry::point_generation::hex_points).
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::PointGeneration`] for invalid parameters,
    /// or any other construction error.
    pub fn hex(
        num_rows: usize,
        base_num_cols: usize,
        spacing: f64,
        options: &GridOptions,
    ) -> Result<Self, ConstructionError> {
        Self::from_points(&hex_points(num_rows, base_num_cols, spacing)?, options)
    }

    /// Grid of concentric rings; see [`RadialLayout`]. Build the layout
    /// yourself and use [`from_radial_layout`](Self::from_radial_layout) to
    /// keep the shell structure.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::PointGeneration`] for invalid parameters,
    /// or any other construction error.
    pub fn radial(
        num_shells: usize,
        spacing: f64,
        center: [f64; 2],
        options: &GridOptions,
    ) -> Result<Self, ConstructionError> {
        Self::from_radial_layout(&RadialLayout::new(num_shells, spacing, center)?, options)
    }

    /// Grid of the nodes of a [`RadialLayout`].
    ///
    /// # Errors
    ///
    /// Returns any construction error.
    ///
    /// # Examples
    ///
    /// ```
    /// use dualgrid::geometry::point_generation::RadialLayout;
    /// use dualgrid::prelude::*;
    ///
    /// let layout = RadialLayout::new(1, 1.0, [0.0, 0.0]).unwrap();
    /// let grid = VoronoiDelaunayGrid::from_radial_layout(&layout, &GridOptions::default())
    ///     .unwrap();
    /// let radius = layout.radius_at_node(grid.xy_of_node());
    /// assert_eq!(radius.iter().filter(|&&r| r == 0.0).count(), 1);
    /// assert_eq!(radius.iter().filter(|&&r| r == 1.0).count(), 6);
    /// ```
    pub fn from_radial_layout(
        layout: &RadialLayout,
        options: &GridOptions,
    ) -> Result<Self, ConstructionError> {
        Self::from_points(&layout.points(), options)
    }

    /// Builds a grid with an explicit geometry back end.
    ///
    /// Points are sorted into row-major order, split into core and perimeter
    /// nodes, tessellated, and turned into links, faces and cells. Core nodes
    /// whose Voronoi region cannot serve as a control volume are promoted to
    /// the boundary and recorded in [`degeneracies`](Self::degeneracies).
    ///
    /// # Errors
    ///
    /// - [`ConstructionError::CoordinateLengthMismatch`] if `x` and `y` differ
    ///   in length.
    /// - [`ConstructionError::NonFiniteCoordinate`] for NaN or infinite input.
    /// - [`ConstructionError::TooFewPoints`] for fewer than three points.
    /// - [`ConstructionError::Geometry`] if the back end fails.
    /// - [`ConstructionError::NoCells`] if no node owns a cell, e.g. for
    ///   collinear input.
    /// - [`ConstructionError::IsolatedNode`] if a node has no link, e.g. a
    ///   duplicated point.
    pub fn with_backend<B>(
        x: &[f64],
        y: &[f64],
        options: &GridOptions,
        backend: &B,
    ) -> Result<Self, ConstructionError>
    where
        B: GeometryBackend + ?Sized,
    {
        if x.len() != y.len() {
            return Err(ConstructionError::CoordinateLengthMismatch {
                x_len: x.len(),
                y_len: y.len(),
            });
        }
        if let Some(index) = x
            .iter()
            .zip(y)
            .position(|(a, b)| !a.is_finite() || !b.is_finite())
        {
            return Err(ConstructionError::NonFiniteCoordinate {
                index,
                x: x[index],
                y: y[index],
            });
        }
        if x.len() < 3 {
            return Err(ConstructionError::TooFewPoints {
                count: x.len(),
                minimum: 3,
            });
        }

        let raw: Vec<[f64; 2]> = x.iter().zip(y).map(|(&a, &b)| [a, b]).collect();
        let points: Vec<[f64; 2]> = argsort_points_by_x_then_y(&raw)
            .into_iter()
            .map(|i| raw[i])
            .collect();

        let mut classification =
            PerimeterClassification::from_points(&points, options.collinear_tolerance);
        let tessellation = backend.tessellate(&points)?;
        let voronoi = &tessellation.voronoi;
        if voronoi.regions.len() != points.len() {
            return Err(GeometryError::Inconsistent {
                message: format!(
                    "{} Voronoi regions for {} points",
                    voronoi.regions.len(),
                    points.len()
                ),
            }
            .into());
        }

        let mut degeneracies = DegeneracyReport::default();
        let limit = options.ridge_magnitude_limit;
        let unusable: Vec<NodeId> = classification
            .core_nodes
            .iter()
            .copied()
            .filter(|node| {
                let region = &voronoi.regions[node.index()];
                !is_control_volume(voronoi, region, limit) || region_area(voronoi, region) <= 0.0
            })
            .collect();
        if !unusable.is_empty() {
            tracing::warn!(
                count = unusable.len(),
                nodes = ?unusable,
                "core nodes without a closed Voronoi cell promoted to boundary"
            );
            degeneracies.promoted_nodes = classification.promote_to_boundary(&unusable);
        }
        if classification.number_of_cells() == 0 {
            return Err(ConstructionError::NoCells {
                number_of_nodes: points.len(),
            });
        }

        let area_of_cell = classification
            .node_at_cell
            .iter()
            .map(|node| region_area(voronoi, &voronoi.regions[node.index()]))
            .collect();
        let max_region_degree = voronoi
            .regions
            .iter()
            .map(VoronoiRegion::degree)
            .max()
            .unwrap_or(0);
        let links = create_links_from_voronoi(
            &points,
            voronoi,
            limit,
            options.reorient_links,
            &mut degeneracies,
        );
        let nodes_at_patch = tessellation
            .triangulation
            .simplices
            .iter()
            .map(|simplex| simplex.map(NodeId::new))
            .collect();

        let grid = Self::from_skeleton(
            *options,
            Skeleton {
                points,
                classification,
                area_of_cell,
                links,
                nodes_at_patch,
                max_region_degree,
                degeneracies,
            },
        )?;
        tracing::debug!(
            nodes = grid.number_of_nodes(),
            links = grid.number_of_links(),
            active_links = grid.number_of_active_links(),
            cells = grid.number_of_cells(),
            patches = grid.number_of_patches(),
            "constructed Voronoi-Delaunay grid"
        );
        Ok(grid)
    }

    fn from_skeleton(options: GridOptions, skeleton: Skeleton) -> Result<Self, ConstructionError> {
        let Skeleton {
            points,
            classification,
            area_of_cell,
            links,
            nodes_at_patch,
            max_region_degree,
            degeneracies,
        } = skeleton;

        let node_links = NodeLinks::build(points.len(), &links)?;
        let active = ActiveLinkSet::compute(&links, &classification.status_at_node);
        let matrices = ActiveLinkMatrices::build(points.len(), &links, &active);

        Ok(Self {
            options,
            node_x: points.iter().map(|p| p[0]).collect(),
            node_y: points.iter().map(|p| p[1]).collect(),
            xy_of_node: points,
            classification,
            area_of_cell,
            links,
            active,
            node_links,
            matrices,
            nodes_at_patch,
            max_region_degree,
            degeneracies,
            patches: OnceLock::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Counts
    // -------------------------------------------------------------------------

    /// Number of nodes.
    #[inline]
    #[must_use]
    pub fn number_of_nodes(&self) -> usize {
        self.xy_of_node.len()
    }

    /// Number of links.
    #[inline]
    #[must_use]
    pub fn number_of_links(&self) -> usize {
        self.links.len()
    }

    /// Number of active links.
    #[inline]
    #[must_use]
    pub fn number_of_active_links(&self) -> usize {
        self.active.len()
    }

    /// Number of faces; always equal to the number of active links.
    #[inline]
    #[must_use]
    pub fn number_of_faces(&self) -> usize {
        self.active.len()
    }

    /// Number of cells; always equal to the number of core nodes.
    #[inline]
    #[must_use]
    pub fn number_of_cells(&self) -> usize {
        self.classification.number_of_cells()
    }

    /// Number of core nodes.
    #[inline]
    #[must_use]
    pub fn number_of_core_nodes(&self) -> usize {
        self.classification.core_nodes.len()
    }

    /// Number of patches. Does not build the patch tables.
    #[inline]
    #[must_use]
    pub fn number_of_patches(&self) -> usize {
        self.nodes_at_patch.len()
    }

    // -------------------------------------------------------------------------
    // Nodes and cells
    // -------------------------------------------------------------------------

    /// Node x coordinates.
    #[inline]
    #[must_use]
    pub fn node_x(&self) -> &[f64] {
        &self.node_x
    }

    /// Node y coordinates.
    #[inline]
    #[must_use]
    pub fn node_y(&self) -> &[f64] {
        &self.node_y
    }

    /// Node coordinates as `[x, y]` pairs.
    #[inline]
    #[must_use]
    pub fn xy_of_node(&self) -> &[[f64; 2]] {
        &self.xy_of_node
    }

    /// Status of each node.
    #[inline]
    #[must_use]
    pub fn status_at_node(&self) -> &[NodeStatus] {
        &self.classification.status_at_node
    }

    /// Core nodes in ascending order.
    #[inline]
    #[must_use]
    pub fn core_nodes(&self) -> &[NodeId] {
        &self.classification.core_nodes
    }

    /// Boundary nodes in ascending order.
    #[inline]
    #[must_use]
    pub fn boundary_nodes(&self) -> &[NodeId] {
        &self.classification.boundary_nodes
    }

    /// Cell of each node.
    #[inline]
    #[must_use]
    pub fn cell_at_node(&self) -> &[Option<CellId>] {
        &self.classification.cell_at_node
    }

    /// Node of each cell.
    #[inline]
    #[must_use]
    pub fn node_at_cell(&self) -> &[NodeId] {
        &self.classification.node_at_cell
    }

    /// Area of each cell.
    #[inline]
    #[must_use]
    pub fn area_of_cell(&self) -> &[f64] {
        &self.area_of_cell
    }

    // -------------------------------------------------------------------------
    // Links and faces
    // -------------------------------------------------------------------------

    /// Tail node of each link.
    #[inline]
    #[must_use]
    pub fn node_at_link_tail(&self) -> &[NodeId] {
        &self.links.node_at_link_tail
    }

    /// Head node of each link.
    #[inline]
    #[must_use]
    pub fn node_at_link_head(&self) -> &[NodeId] {
        &self.links.node_at_link_head
    }

    /// Length of each link.
    #[inline]
    #[must_use]
    pub fn length_of_link(&self) -> &[f64] {
        &self.links.length_of_link
    }

    /// Status of each link.
    #[inline]
    #[must_use]
    pub fn status_at_link(&self) -> &[LinkStatus] {
        &self.active.status_at_link
    }

    /// Active links in ascending order.
    #[inline]
    #[must_use]
    pub fn active_links(&self) -> &[LinkId] {
        &self.active.active_links
    }

    /// Face of each link, if active.
    #[inline]
    #[must_use]
    pub fn face_at_link(&self) -> &[Option<FaceId>] {
        &self.active.face_at_link
    }

    /// Link owning each face; the same sequence as [`active_links`](Self::active_links).
    #[inline]
    #[must_use]
    pub fn link_at_face(&self) -> &[LinkId] {
        &self.active.active_links
    }

    /// Width of each face.
    #[inline]
    #[must_use]
    pub fn width_of_face(&self) -> &[f64] {
        &self.active.width_of_face
    }

    // -------------------------------------------------------------------------
    // Connectivity
    // -------------------------------------------------------------------------

    /// Links at each node, in ascending link order.
    #[inline]
    #[must_use]
    pub const fn links_at_node(&self) -> &RaggedArray<LinkId> {
        self.node_links.links_at_node()
    }

    /// Direction of each link at each node: `+1` outgoing, `-1` incoming.
    #[inline]
    #[must_use]
    pub const fn link_dirs_at_node(&self) -> &RaggedArray<i8> {
        self.node_links.link_dirs_at_node()
    }

    /// Links at each node padded to the largest node degree.
    #[must_use]
    pub fn links_at_node_padded(&self) -> PaddedTable<LinkId> {
        self.node_links.links_at_node_padded()
    }

    /// Integer export of [`links_at_node_padded`](Self::links_at_node_padded);
    /// `None` for [`NoDataPolicy::Nan`].
    #[must_use]
    pub fn links_at_node_indices(&self, policy: NoDataPolicy) -> Option<Vec<i64>> {
        self.node_links.links_at_node_indices(policy)
    }

    /// Link directions padded to the largest node degree with `0`.
    #[must_use]
    pub fn link_dirs_at_node_padded(&self) -> Vec<i8> {
        self.node_links.link_dirs_at_node_padded()
    }

    /// Faces of active links entering each node.
    #[inline]
    #[must_use]
    pub const fn active_inlinks_at_node(&self) -> &PaddedTable<FaceId> {
        self.matrices.inlinks()
    }

    /// Faces of active links leaving each node.
    #[inline]
    #[must_use]
    pub const fn active_outlinks_at_node(&self) -> &PaddedTable<FaceId> {
        self.matrices.outlinks()
    }

    // -------------------------------------------------------------------------
    // Patches
    // -------------------------------------------------------------------------

    /// Corners of each patch.
    #[inline]
    #[must_use]
    pub fn nodes_at_patch(&self) -> &[[NodeId; 3]] {
        &self.nodes_at_patch
    }

    /// Patch tables, built on first call and cached.
    #[must_use]
    pub fn patches(&self) -> &PatchTables {
        self.patches.get_or_init(|| {
            PatchTables::build(
                &self.nodes_at_patch,
                &self.classification.status_at_node,
                self.max_region_degree,
            )
        })
    }

    /// Row-major padded patches around each node, absent entries written per
    /// the named no-data policy (`"-1"`, `"bad_value"` or `"nan"`).
    ///
    /// Only `"nan"` needs floating point; the integer policies are also
    /// available exactly from [`patches_at_node_indices`](Self::patches_at_node_indices).
    ///
    /// # Errors
    ///
    /// Returns [`UnknownPolicyError`] for any other policy name.
    pub fn patches_at_node(&self, nodata: &str) -> Result<Vec<f64>, UnknownPolicyError> {
        let policy: NoDataPolicy = nodata.parse()?;
        Ok(self.patches().patches_at_node_filled(policy))
    }

    /// Integer export of the padded patches around each node; `None` for
    /// [`NoDataPolicy::Nan`].
    #[must_use]
    pub fn patches_at_node_indices(&self, policy: NoDataPolicy) -> Option<Vec<i64>> {
        self.patches().patches_at_node_indices(policy)
    }

    /// Drops the cached patch tables.
    pub fn clear_patch_cache(&mut self) {
        self.patches.take();
    }

    // -------------------------------------------------------------------------
    // Boundary status
    // -------------------------------------------------------------------------

    /// Changes the status of one boundary node.
    ///
    /// # Errors
    ///
    /// See [`set_status_at_nodes`](Self::set_status_at_nodes).
    pub fn set_status_at_node(
        &mut self,
        node: NodeId,
        status: NodeStatus,
    ) -> Result<(), BoundaryStatusError> {
        self.set_status_at_nodes(&[(node, status)])
    }

    /// Changes the status of several boundary nodes, then rebuilds the active
    /// links, faces and in/out matrices once and drops the patch cache.
    ///
    /// Either every update is applied or none is.
    ///
    /// # Errors
    ///
    /// - [`BoundaryStatusError::NodeOutOfRange`] for an unknown node.
    /// - [`BoundaryStatusError::CoreNode`] when the node is a core node.
    /// - [`BoundaryStatusError::ToCore`] when the new status is core.
    pub fn set_status_at_nodes(
        &mut self,
        updates: &[(NodeId, NodeStatus)],
    ) -> Result<(), BoundaryStatusError> {
        let number_of_nodes = self.number_of_nodes();
        for &(node, status) in updates {
            let Some(current) = self.classification.status_at_node.get(node.index()) else {
                return Err(BoundaryStatusError::NodeOutOfRange {
                    node,
                    number_of_nodes,
                });
            };
            if !current.is_boundary() {
                return Err(BoundaryStatusError::CoreNode { node });
            }
            if !status.is_boundary() {
                return Err(BoundaryStatusError::ToCore { node });
            }
        }
        for &(node, status) in updates {
            self.classification.status_at_node[node.index()] = status;
        }
        self.refresh_active_links();
        Ok(())
    }

    /// Closes every boundary node.
    pub fn close_boundary(&mut self) {
        for &node in &self.classification.boundary_nodes {
            self.classification.status_at_node[node.index()] = NodeStatus::Closed;
        }
        self.refresh_active_links();
    }

    fn refresh_active_links(&mut self) {
        self.active = ActiveLinkSet::compute(&self.links, &self.classification.status_at_node);
        self.matrices = ActiveLinkMatrices::build(self.number_of_nodes(), &self.links, &self.active);
        self.patches.take();
        tracing::debug!(
            active_links = self.active.len(),
            "recomputed active links after a boundary status change"
        );
    }

    // -------------------------------------------------------------------------
    // Diagnostics and persistence
    // -------------------------------------------------------------------------

    /// Options the grid was built with.
    #[inline]
    #[must_use]
    pub const fn options(&self) -> &GridOptions {
        &self.options
    }

    /// Degeneracies absorbed during construction.
    #[inline]
    #[must_use]
    pub const fn degeneracies(&self) -> &DegeneracyReport {
        &self.degeneracies
    }

    /// Largest Voronoi region degree, counting an open region's point at
    /// infinity once.
    #[inline]
    #[must_use]
    pub const fn max_region_degree(&self) -> usize {
        self.max_region_degree
    }

    /// Captures the state needed to rebuild this grid.
    #[must_use]
    pub fn to_snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            options: self.options,
            node_x: self.node_x.clone(),
            node_y: self.node_y.clone(),
            status_at_node: self.classification.status_at_node.clone(),
            node_at_link_tail: self.links.node_at_link_tail.clone(),
            node_at_link_head: self.links.node_at_link_head.clone(),
            ridge_width_at_link: self.links.ridge_width_at_link.clone(),
            area_of_cell: self.area_of_cell.clone(),
            nodes_at_patch: self.nodes_at_patch.clone(),
            max_region_degree: self.max_region_degree,
            degeneracies: self.degeneracies.clone(),
        }
    }

    /// Rebuilds a grid from a snapshot, validating it first.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] describing the first inconsistency found.
    pub fn from_snapshot(snapshot: GridSnapshot) -> Result<Self, SnapshotError> {
        let number_of_nodes = snapshot.node_x.len();
        let expect_len = |what, actual: usize, expected: usize| {
            if actual == expected {
                Ok(())
            } else {
                Err(SnapshotError::LengthMismatch {
                    what,
                    expected,
                    actual,
                })
            }
        };
        expect_len("node_y", snapshot.node_y.len(), number_of_nodes)?;
        expect_len("status_at_node", snapshot.status_at_node.len(), number_of_nodes)?;
        let number_of_links = snapshot.node_at_link_tail.len();
        expect_len("node_at_link_head", snapshot.node_at_link_head.len(), number_of_links)?;
        expect_len(
            "ridge_width_at_link",
            snapshot.ridge_width_at_link.len(),
            number_of_links,
        )?;

        let points: Vec<[f64; 2]> = snapshot
            .node_x
            .iter()
            .zip(&snapshot.node_y)
            .map(|(&x, &y)| [x, y])
            .collect();
        if let Some(node) = points
            .iter()
            .position(|p| !p[0].is_finite() || !p[1].is_finite())
        {
            return Err(SnapshotError::NonFiniteCoordinate {
                node: NodeId::new(node),
            });
        }

        for (what, out_of_range) in [
            (
                "node_at_link_tail",
                first_out_of_range(snapshot.node_at_link_tail.iter(), number_of_nodes),
            ),
            (
                "node_at_link_head",
                first_out_of_range(snapshot.node_at_link_head.iter(), number_of_nodes),
            ),
            (
                "nodes_at_patch",
                first_out_of_range(snapshot.nodes_at_patch.iter().flatten(), number_of_nodes),
            ),
        ] {
            if let Some(node) = out_of_range {
                return Err(SnapshotError::NodeOutOfRange {
                    what,
                    node,
                    number_of_nodes,
                });
            }
        }

        if snapshot.max_region_degree > number_of_nodes {
            return Err(SnapshotError::RegionDegreeOutOfRange {
                max_region_degree: snapshot.max_region_degree,
                number_of_nodes,
            });
        }
        if let Some((link, width)) = snapshot
            .ridge_width_at_link
            .iter()
            .enumerate()
            .find_map(|(link, w)| {
                (*w).filter(|w| !(*w >= 0.0 && w.is_finite()))
                    .map(|w| (link, w))
            })
        {
            return Err(SnapshotError::InvalidRidgeWidth {
                link: LinkId::new(link),
                width,
            });
        }

        let classification = PerimeterClassification::from_statuses(snapshot.status_at_node);
        if classification.number_of_cells() == 0 {
            return Err(SnapshotError::NoCells);
        }
        expect_len(
            "area_of_cell",
            snapshot.area_of_cell.len(),
            classification.number_of_cells(),
        )?;
        if let Some((cell, &area)) = snapshot
            .area_of_cell
            .iter()
            .enumerate()
            .find(|(_, a)| !(**a > 0.0 && a.is_finite()))
        {
            return Err(SnapshotError::InvalidCellArea {
                cell: CellId::new(cell),
                area,
            });
        }

        let length_of_link = calculate_link_lengths(
            &points,
            &snapshot.node_at_link_tail,
            &snapshot.node_at_link_head,
        );
        if let Some(link) = length_of_link.iter().position(|&l| !(l > 0.0)) {
            return Err(SnapshotError::DegenerateLink {
                link: LinkId::new(link),
            });
        }
        let links = LinkTable {
            node_at_link_tail: snapshot.node_at_link_tail,
            node_at_link_head: snapshot.node_at_link_head,
            ridge_width_at_link: snapshot.ridge_width_at_link,
            length_of_link,
        };

        Ok(Self::from_skeleton(
            snapshot.options,
            Skeleton {
                points,
                classification,
                area_of_cell: snapshot.area_of_cell,
                links,
                nodes_at_patch: snapshot.nodes_at_patch,
                max_region_degree: snapshot.max_region_degree,
                degeneracies: snapshot.degeneracies,
            },
        )?)
    }
}

fn first_out_of_range<'a>(
    mut nodes: impl Iterator<Item = &'a NodeId>,
    number_of_nodes: usize,
) -> Option<NodeId> {
    nodes.find(|n| n.index() >= number_of_nodes).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::core::ids::BAD_INDEX_VALUE;

    fn lattice_grid() -> VoronoiDelaunayGrid {
        VoronoiDelaunayGrid::rectangular_lattice((3, 4), 1.0, &GridOptions::default()).unwrap()
    }

    #[test]
    fn lattice_counts() {
        let grid = lattice_grid();
        assert_eq!(grid.number_of_nodes(), 12);
        assert_eq!(grid.number_of_links(), 17);
        assert_eq!(grid.number_of_cells(), 2);
        assert_eq!(grid.number_of_core_nodes(), 2);
        assert_eq!(grid.number_of_active_links(), 7);
        assert_eq!(grid.number_of_faces(), 7);
        assert_eq!(grid.number_of_patches(), 12);
        assert_eq!(grid.core_nodes(), &[NodeId::new(5), NodeId::new(6)]);
        for &area in grid.area_of_cell() {
            assert_relative_eq!(area, 1.0, epsilon = 1e-9);
        }
        for &width in grid.width_of_face() {
            assert_relative_eq!(width, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn input_order_does_not_matter() {
        let x = [3.0, 0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0, 0.0, 1.0, 2.0, 3.0];
        let y = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0];
        let grid = VoronoiDelaunayGrid::new(&x, &y).unwrap();
        assert_eq!(grid.node_x(), lattice_grid().node_x());
        assert_eq!(grid.node_at_link_head(), lattice_grid().node_at_link_head());
    }

    #[test]
    fn coordinate_errors() {
        assert_eq!(
            VoronoiDelaunayGrid::new(&[0.0, 1.0], &[0.0]).unwrap_err(),
            ConstructionError::CoordinateLengthMismatch { x_len: 2, y_len: 1 }
        );
        assert!(matches!(
            VoronoiDelaunayGrid::new(&[0.0, 1.0, f64::INFINITY], &[0.0, 1.0, 0.0]),
            Err(ConstructionError::NonFiniteCoordinate { index: 2, .. })
        ));
        assert_eq!(
            VoronoiDelaunayGrid::new(&[0.0, 1.0], &[0.0, 1.0]).unwrap_err(),
            ConstructionError::TooFewPoints {
                count: 2,
                minimum: 3
            }
        );
    }

    #[test]
    fn collinear_points_have_no_cells() {
        let err = VoronoiDelaunayGrid::new(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, ConstructionError::NoCells { number_of_nodes: 4 });
    }

    #[test]
    fn duplicate_points_are_isolated() {
        let mut points = crate::geometry::point_generation::rectangular_lattice((3, 3), 1.0).unwrap();
        points.push([2.0, 2.0]);
        let err = VoronoiDelaunayGrid::from_points(&points, &GridOptions::default()).unwrap_err();
        assert!(matches!(err, ConstructionError::IsolatedNode { .. }));
    }

    #[test]
    fn options_builder_defaults_match_default() {
        let built = GridOptionsBuilder::default().build().unwrap();
        assert_eq!(built, GridOptions::default());
        assert!(built.reorient_links);
        assert!(GridOptionsBuilder::default().ridge_magnitude_limit(0.0).build().is_err());
        assert!(
            GridOptionsBuilder::default()
                .vertex_merge_tolerance(f64::NAN)
                .build()
                .is_err()
        );
    }

    #[test]
    fn status_changes_are_restricted_to_boundary_nodes() {
        let mut grid = lattice_grid();
        assert_eq!(
            grid.set_status_at_node(NodeId::new(5), NodeStatus::Closed),
            Err(BoundaryStatusError::CoreNode {
                node: NodeId::new(5)
            })
        );
        assert_eq!(
            grid.set_status_at_node(NodeId::new(0), NodeStatus::Core),
            Err(BoundaryStatusError::ToCore {
                node: NodeId::new(0)
            })
        );
        assert!(matches!(
            grid.set_status_at_node(NodeId::new(40), NodeStatus::Closed),
            Err(BoundaryStatusError::NodeOutOfRange { .. })
        ));
        // a failed batch leaves every status untouched
        assert!(
            grid.set_status_at_nodes(&[
                (NodeId::new(1), NodeStatus::Closed),
                (NodeId::new(6), NodeStatus::Closed),
            ])
            .is_err()
        );
        assert_eq!(grid.status_at_node()[1], NodeStatus::FixedValue);
        assert_eq!(grid.number_of_active_links(), 7);
    }

    #[test]
    fn closing_a_node_rebuilds_the_active_set() {
        let mut grid = lattice_grid();
        let patches_before = grid.patches().patches_at_node().row(1).len();
        assert!(patches_before > 0);

        grid.set_status_at_node(NodeId::new(1), NodeStatus::Closed).unwrap();
        assert_eq!(grid.number_of_active_links(), 6);
        assert_eq!(grid.number_of_faces(), 6);
        assert_eq!(grid.status_at_link()[4], LinkStatus::Inactive);
        assert!(grid.patches().patches_at_node().row(1).is_empty());

        grid.set_status_at_node(NodeId::new(1), NodeStatus::FixedGradient).unwrap();
        assert_eq!(grid.number_of_active_links(), 7);
        assert_eq!(grid.patches().patches_at_node().row(1).len(), patches_before);
    }

    #[test]
    fn close_boundary_leaves_only_core_to_core_links() {
        let mut grid = lattice_grid();
        grid.close_boundary();
        assert!(grid.boundary_nodes().iter().all(|n| grid.status_at_node()[n.index()].is_closed()));
        assert_eq!(grid.active_links(), &[LinkId::new(8)]);
    }

    #[test]
    fn patch_policies() {
        let grid = lattice_grid();
        let width = grid.patches().padded_width();
        let sentinel = grid.patches_at_node("-1").unwrap();
        assert_eq!(sentinel.len(), 12 * width);
        assert!(grid.patches_at_node("nan").unwrap().iter().any(|v| v.is_nan()));
        assert!(grid.patches_at_node("bad_value").unwrap().iter().any(|&v| v > 1.0e9));
        let indices = grid.patches_at_node_indices(NoDataPolicy::BadIndex).unwrap();
        assert_eq!(indices.len(), 12 * width);
        assert!(indices.contains(&BAD_INDEX_VALUE));
        let sentinel_indices = grid.patches_at_node_indices(NoDataPolicy::Sentinel).unwrap();
        for (index, float) in sentinel_indices.iter().zip(&sentinel) {
            assert_eq!(*index as f64, *float);
        }
        assert_eq!(grid.patches_at_node_indices(NoDataPolicy::Nan), None);
        assert_eq!(
            grid.patches_at_node("none").unwrap_err(),
            UnknownPolicyError {
                name: "none".to_owned()
            }
        );
    }

    #[test]
    fn clearing_the_patch_cache_rebuilds_equal_tables() {
        let mut grid = lattice_grid();
        let first = grid.patches().clone();
        assert_eq!(grid.patches(), &first);
        grid.clear_patch_cache();
        assert_eq!(grid.patches(), &first);
    }

    #[test]
    fn snapshot_validation() {
        let grid = lattice_grid();
        let mut snapshot = grid.to_snapshot();
        snapshot.node_y.pop();
        assert!(matches!(
            VoronoiDelaunayGrid::from_snapshot(snapshot),
            Err(SnapshotError::LengthMismatch { what: "node_y", .. })
        ));

        let mut snapshot = grid.to_snapshot();
        snapshot.node_at_link_head[3] = NodeId::new(99);
        assert!(matches!(
            VoronoiDelaunayGrid::from_snapshot(snapshot),
            Err(SnapshotError::NodeOutOfRange { .. })
        ));

        let mut snapshot = grid.to_snapshot();
        snapshot.area_of_cell[1] = -1.0;
        assert!(matches!(
            VoronoiDelaunayGrid::from_snapshot(snapshot),
            Err(SnapshotError::InvalidCellArea { .. })
        ));

        let mut snapshot = grid.to_snapshot();
        snapshot.node_at_link_head[8] = snapshot.node_at_link_tail[8];
        assert_eq!(
            VoronoiDelaunayGrid::from_snapshot(snapshot).unwrap_err(),
            SnapshotError::DegenerateLink {
                link: LinkId::new(8)
            }
        );

        let mut snapshot = grid.to_snapshot();
        snapshot.max_region_degree = usize::MAX / 2;
        assert!(matches!(
            VoronoiDelaunayGrid::from_snapshot(snapshot),
            Err(SnapshotError::RegionDegreeOutOfRange { .. })
        ));

        let restored = VoronoiDelaunayGrid::from_snapshot(grid.to_snapshot()).unwrap();
        assert_eq!(restored.to_snapshot(), grid.to_snapshot());
        assert_eq!(restored.active_links(), grid.active_links());
    }
}
