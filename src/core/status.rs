//! Node and link status codes.
//!
//! Node statuses use the integer codes shared by the wider grid-modelling
//! ecosystem (0 core, 1 fixed value, 2 fixed gradient, 4 closed) so that padded
//! exports and snapshots stay interchangeable with other tools.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Boundary condition attached to a node.
///
/// Core nodes own a Voronoi cell and receive computed values; every other
/// status marks a perimeter node that carries a boundary condition instead.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeStatus {
    /// Interior node with a Voronoi cell.
    #[default]
    Core = 0,
    /// Boundary node whose value is held fixed.
    FixedValue = 1,
    /// Boundary node whose gradient is held fixed.
    FixedGradient = 2,
    /// Boundary node that neither sends nor receives flux.
    Closed = 4,
}

impl NodeStatus {
    /// Integer status code.
    ///
    /// # Examples
    ///
    /// ```
    /// use dualgrid::core::status::NodeStatus;
    ///
    /// assert_eq!(NodeStatus::Closed.code(), 4);
    /// assert_eq!(NodeStatus::from_code(1), Some(NodeStatus::FixedValue));
    /// assert_eq!(NodeStatus::from_code(3), None);
    /// ```
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Parses an integer status code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Core),
            1 => Some(Self::FixedValue),
            2 => Some(Self::FixedGradient),
            4 => Some(Self::Closed),
            _ => None,
        }
    }

    /// Returns `true` for every status other than [`NodeStatus::Core`].
    #[inline]
    #[must_use]
    pub const fn is_boundary(self) -> bool {
        !matches!(self, Self::Core)
    }

    /// Returns `true` for [`NodeStatus::Closed`].
    #[inline]
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Core => "core",
            Self::FixedValue => "fixed-value",
            Self::FixedGradient => "fixed-gradient",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Whether a link carries flux.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkStatus {
    /// Link crosses a finite Voronoi ridge and neither endpoint is closed.
    Active,
    /// Link carries no flux.
    Inactive,
}

impl LinkStatus {
    /// Returns `true` for [`LinkStatus::Active`].
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}
