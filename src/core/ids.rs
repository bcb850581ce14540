//! Typed element identifiers.
//!
//! Every grid element kind gets its own id newtype so that a link id can never
//! be used to index a node array, and absence is spelled `Option<Id>` rather
//! than a magic integer. Padded exports for consumers that need a fixed-width
//! integer table convert `None` to a caller-selected no-data value at the very
//! edge of the API (see [`NoDataPolicy`](crate::core::collections::NoDataPolicy)).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer written into padded exports for absent entries under
/// [`NoDataPolicy::BadIndex`](crate::core::collections::NoDataPolicy::BadIndex).
///
/// The value lies far outside any index a grid can produce.
pub const BAD_INDEX_VALUE: i64 = i32::MAX as i64;

macro_rules! element_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Wraps a raw element index.
            #[inline]
            #[must_use]
            pub const fn new(index: usize) -> Self {
                Self(index)
            }

            /// Returns the raw index of this element.
            #[inline]
            #[must_use]
            pub const fn index(self) -> usize {
                self.0
            }
        }

        impl From<$name> for usize {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} {}", $label, self.0)
            }
        }
    };
}

element_id!(
    /// Identifier of a grid node (a generator point of the Voronoi diagram).
    ///
    /// Node ids are assigned once, from the canonical sorted point order, and
    /// never change afterwards.
    NodeId,
    "node"
);

element_id!(
    /// Identifier of a link (a Delaunay edge joining two nodes).
    LinkId,
    "link"
);

element_id!(
    /// Identifier of a face (the Voronoi ridge crossed by an active link).
    ///
    /// Faces are numbered in active-link order: `FaceId(i)` is owned by the
    /// i-th active link, so per-active-link arrays are indexed by face id.
    FaceId,
    "face"
);

element_id!(
    /// Identifier of a cell (the Voronoi polygon owned by a core node).
    CellId,
    "cell"
);

element_id!(
    /// Identifier of a patch (a Delaunay triangle).
    PatchId,
    "patch"
);
