//! Per-node connectivity tables.
//!
//! [`NodeLinks`] lists every link touching a node together with the direction
//! in which the link meets it. [`ActiveLinkMatrices`] lists, per node, the
//! faces of the active links entering and leaving it; the flux divergence
//! operator walks these rows.

use crate::core::collections::{NoDataPolicy, PaddedTable, RaggedArray};
use crate::core::grid::ConstructionError;
use crate::core::ids::{FaceId, LinkId, NodeId};
use crate::core::topology::{ActiveLinkSet, LinkTable};

/// Links at each node, in ascending link id order, with their directions.
///
/// A direction is `+1` when the node is the link's tail (the link leaves the
/// node) and `-1` when it is the head.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeLinks {
    links_at_node: RaggedArray<LinkId>,
    link_dirs_at_node: RaggedArray<i8>,
}

impl NodeLinks {
    /// Builds the tables for `number_of_nodes` nodes.
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::IsolatedNode`] for the first node that no
    /// link touches.
    pub fn build(number_of_nodes: usize, links: &LinkTable) -> Result<Self, ConstructionError> {
        let mut rows: Vec<Vec<(LinkId, i8)>> = vec![Vec::new(); number_of_nodes];
        for (i, (tail, head)) in links
            .node_at_link_tail
            .iter()
            .zip(&links.node_at_link_head)
            .enumerate()
        {
            rows[tail.index()].push((LinkId::new(i), 1));
            rows[head.index()].push((LinkId::new(i), -1));
        }
        if let Some(node) = rows.iter().position(Vec::is_empty) {
            return Err(ConstructionError::IsolatedNode {
                node: NodeId::new(node),
            });
        }

        Ok(Self {
            links_at_node: RaggedArray::from_rows(
                rows.iter().map(|row| row.iter().map(|&(link, _)| link)),
            ),
            link_dirs_at_node: RaggedArray::from_rows(
                rows.iter().map(|row| row.iter().map(|&(_, dir)| dir)),
            ),
        })
    }

    /// Links at each node.
    #[inline]
    #[must_use]
    pub const fn links_at_node(&self) -> &RaggedArray<LinkId> {
        &self.links_at_node
    }

    /// Direction of each entry of [`links_at_node`](Self::links_at_node).
    #[inline]
    #[must_use]
    pub const fn link_dirs_at_node(&self) -> &RaggedArray<i8> {
        &self.link_dirs_at_node
    }

    /// Largest number of links at any node.
    #[must_use]
    pub fn max_degree(&self) -> usize {
        self.links_at_node.max_row_len()
    }

    /// Links at each node padded to [`max_degree`](Self::max_degree).
    #[must_use]
    pub fn links_at_node_padded(&self) -> PaddedTable<LinkId> {
        self.links_at_node.to_padded(self.max_degree())
    }

    /// Row-major integer export of the padded links with absent entries
    /// written per `policy`.
    ///
    /// Returns `None` for [`NoDataPolicy::Nan`], which has no integer form.
    #[must_use]
    pub fn links_at_node_indices(&self, policy: NoDataPolicy) -> Option<Vec<i64>> {
        let nodata = policy.integer_value()?;
        Some(self.links_at_node_padded().to_indices(nodata))
    }

    /// Row-major directions padded to [`max_degree`](Self::max_degree), with
    /// `0` in unused slots.
    #[must_use]
    pub fn link_dirs_at_node_padded(&self) -> Vec<i8> {
        let width = self.max_degree();
        let mut out = Vec::with_capacity(self.link_dirs_at_node.number_of_rows() * width);
        for row in self.link_dirs_at_node.rows() {
            out.extend_from_slice(row);
            out.extend(std::iter::repeat_n(0, width - row.len()));
        }
        out
    }
}

/// Faces of the active links entering and leaving each node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveLinkMatrices {
    inlinks: PaddedTable<FaceId>,
    outlinks: PaddedTable<FaceId>,
}

impl ActiveLinkMatrices {
    /// Builds the matrices from the active subset of `links`.
    #[must_use]
    pub fn build(number_of_nodes: usize, links: &LinkTable, active: &ActiveLinkSet) -> Self {
        let mut inlinks: Vec<Vec<FaceId>> = vec![Vec::new(); number_of_nodes];
        let mut outlinks: Vec<Vec<FaceId>> = vec![Vec::new(); number_of_nodes];
        for (face, link) in active.active_links.iter().enumerate() {
            let face = FaceId::new(face);
            outlinks[links.node_at_link_tail[link.index()].index()].push(face);
            inlinks[links.node_at_link_head[link.index()].index()].push(face);
        }
        let width = |rows: &[Vec<FaceId>]| rows.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            inlinks: PaddedTable::from_rows(width(&inlinks), inlinks),
            outlinks: PaddedTable::from_rows(width(&outlinks), outlinks),
        }
    }

    /// Faces of active links whose head is each node.
    #[inline]
    #[must_use]
    pub const fn inlinks(&self) -> &PaddedTable<FaceId> {
        &self.inlinks
    }

    /// Faces of active links whose tail is each node.
    #[inline]
    #[must_use]
    pub const fn outlinks(&self) -> &PaddedTable<FaceId> {
        &self.outlinks
    }
}
