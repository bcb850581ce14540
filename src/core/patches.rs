//! Patch (Delaunay triangle) membership tables.
//!
//! Built on demand by [`VoronoiDelaunayGrid::patches`](crate::core::grid::VoronoiDelaunayGrid::patches)
//! and cached until the grid's boundary statuses change.

use crate::core::collections::{NoDataPolicy, PaddedTable, RaggedArray};
use crate::core::ids::{NodeId, PatchId};
use crate::core::status::NodeStatus;

/// Nodes of every patch and patches around every node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchTables {
    nodes_at_patch: Vec<[NodeId; 3]>,
    patches_at_node: RaggedArray<PatchId>,
    padded_width: usize,
}

impl PatchTables {
    /// Builds the tables.
    ///
    /// Closed nodes get no patches. `min_width` is the narrowest padded export
    /// width; the widest row wins if it is wider.
    #[must_use]
    pub fn build(
        nodes_at_patch: &[[NodeId; 3]],
        status_at_node: &[NodeStatus],
        min_width: usize,
    ) -> Self {
        let mut rows: Vec<Vec<PatchId>> = vec![Vec::new(); status_at_node.len()];
        for (patch, nodes) in nodes_at_patch.iter().enumerate() {
            for node in nodes {
                if !status_at_node[node.index()].is_closed() {
                    rows[node.index()].push(PatchId::new(patch));
                }
            }
        }
        let patches_at_node = RaggedArray::from_rows(rows);
        let padded_width = min_width.max(patches_at_node.max_row_len());
        tracing::debug!(
            patches = nodes_at_patch.len(),
            padded_width,
            "built patch tables"
        );
        Self {
            nodes_at_patch: nodes_at_patch.to_vec(),
            patches_at_node,
            padded_width,
        }
    }

    /// Number of patches.
    #[inline]
    #[must_use]
    pub fn number_of_patches(&self) -> usize {
        self.nodes_at_patch.len()
    }

    /// The three nodes of each patch.
    #[inline]
    #[must_use]
    pub fn nodes_at_patch(&self) -> &[[NodeId; 3]] {
        &self.nodes_at_patch
    }

    /// Patches around each node, in ascending id order.
    #[inline]
    #[must_use]
    pub const fn patches_at_node(&self) -> &RaggedArray<PatchId> {
        &self.patches_at_node
    }

    /// Width of the padded export.
    #[inline]
    #[must_use]
    pub const fn padded_width(&self) -> usize {
        self.padded_width
    }

    /// Patches around each node padded to [`padded_width`](Self::padded_width).
    #[must_use]
    pub fn patches_at_node_padded(&self) -> PaddedTable<PatchId> {
        self.patches_at_node.to_padded(self.padded_width)
    }

    /// Row-major floating-point export of the padded table, absent entries
    /// written per `policy`.
    #[must_use]
    pub fn patches_at_node_filled(&self, policy: NoDataPolicy) -> Vec<f64> {
        self.patches_at_node_padded().to_floats(policy)
    }

    /// Row-major integer export of the padded table; `None` for
    /// [`NoDataPolicy::Nan`].
    #[must_use]
    pub fn patches_at_node_indices(&self, policy: NoDataPolicy) -> Option<Vec<i64>> {
        let nodata = policy.integer_value()?;
        Some(self.patches_at_node_padded().to_indices(nodata))
    }
}
