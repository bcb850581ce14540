//! # dualgrid
//!
//! Unstructured Voronoi/Delaunay dual meshes for finite-volume calculations
//! on scattered 2-D points.
//!
//! A grid is built once from a set of points. Delaunay edges become **links**
//! and Delaunay triangles become **patches**. Voronoi polygons of interior
//! nodes become **cells**, and the Voronoi ridges crossed by active links
//! become **faces**. Every element kind gets a dense, contiguous numbering
//! and the connectivity tables between kinds are precomputed, so numerical
//! operators reduce to indexed array arithmetic.
//!
//! # Features
//!
//! - Deterministic numbering: nodes in row-major coordinate order, links by
//!   midpoint, optionally reoriented to point up and to the right
//! - Perimeter detection with a collinearity tolerance, plus automatic
//!   demotion of interior nodes whose Voronoi region is not a usable
//!   control volume
//! - Node boundary statuses that can be changed after construction
//! - Gradients, flux divergence, patch slopes and node/link/cell mappers
//! - Lattice, hexagonal, radial and seeded random point generators
//! - Serialization of the finished grid with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! ```rust
//! use dualgrid::prelude::*;
//!
//! let grid = VoronoiDelaunayGrid::rectangular_lattice((4, 5), 1.0, &GridOptions::default())
//!     .unwrap();
//! assert_eq!(grid.number_of_nodes(), 20);
//! assert_eq!(grid.number_of_cells(), 6);
//!
//! // A uniform field sloping up to the east.
//! let z: Vec<f64> = grid.node_x().iter().map(|x| 2.0 * x).collect();
//! let mut grad = vec![0.0; grid.number_of_active_links()];
//! calc_grad_at_active_link(&grid, &z, &mut grad).unwrap();
//!
//! // Its flux has no divergence in any cell.
//! let flux: Vec<f64> = grad.iter().map(|g| -g).collect();
//! let mut div = vec![0.0; grid.number_of_nodes()];
//! calc_flux_div_at_node(&grid, &flux, &mut div).unwrap();
//! assert!(div.iter().all(|d| d.abs() < 1e-9));
//! ```
//!
//! # Changing boundaries
//!
//! ```rust
//! use dualgrid::prelude::*;
//!
//! let mut grid = VoronoiDelaunayGrid::rectangular_lattice((3, 3), 1.0, &GridOptions::default())
//!     .unwrap();
//! assert_eq!(grid.number_of_active_links(), 4);
//!
//! grid.close_boundary();
//! assert_eq!(grid.number_of_active_links(), 0);
//! assert_eq!(grid.number_of_cells(), 1);
//! ```

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// Element ids, statuses, connectivity tables and the grid itself.
pub mod core {
    /// Flat and ragged index tables plus the hash/buffer aliases
    pub mod collections;
    /// Node-to-link and active-link connectivity
    pub mod connectivity;
    pub mod grid;
    pub mod ids;
    /// Delaunay-triangle (patch) tables
    pub mod patches;
    pub mod status;
    /// Link derivation from the Voronoi diagram
    pub mod topology;

    pub use grid::*;
    pub use ids::*;
    pub use status::*;
}

/// Point geometry: tessellation back ends, perimeter detection, sorting,
/// point generators and small planar measures.
pub mod geometry {
    /// Delaunay/Voronoi tessellation behind a pluggable trait
    pub mod backend;
    pub mod measures;
    pub mod perimeter;
    /// Structured and random point sets
    pub mod point_generation;
    pub mod sorting;

    pub use backend::*;
}

/// Numerical operators over a finished grid.
///
/// Every operator writes into a caller-supplied output slice and validates
/// input lengths before touching it.
pub mod operators {
    pub mod divergence;
    pub mod gradients;
    pub mod mappers;
    pub mod validation;

    pub use divergence::*;
    pub use gradients::*;
    pub use mappers::*;
    pub use validation::*;
}

/// A prelude module that re-exports commonly used types and functions.
pub mod prelude {
    pub use crate::core::collections::{
        FastHashMap, FastHashSet, NoDataPolicy, PaddedTable, RaggedArray, SmallBuffer,
    };
    pub use crate::core::grid::{
        BoundaryStatusError, ConstructionError, GridOptions, GridOptionsBuilder, GridSnapshot,
        SnapshotError, VoronoiDelaunayGrid,
    };
    pub use crate::core::ids::{BAD_INDEX_VALUE, CellId, FaceId, LinkId, NodeId, PatchId};
    pub use crate::core::status::{LinkStatus, NodeStatus};
    pub use crate::core::topology::DegeneracyReport;

    pub use crate::geometry::backend::{GeometryBackend, SpadeBackend, Tessellation};
    pub use crate::geometry::point_generation::{RadialLayout, random_points_seeded};

    pub use crate::operators::divergence::{
        DivergenceWorkspace, calc_flux_div_at_node, calc_net_flux_at_cell,
    };
    pub use crate::operators::gradients::*;
    pub use crate::operators::mappers::*;
    pub use crate::operators::validation::OperatorInputError;
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
