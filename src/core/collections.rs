//! Collection types shared across the grid.
//!
//! Connectivity that varies in length per element (links around a node,
//! patches around a node) is stored as a compressed ragged array. Consumers
//! that want a rectangular table get a [`PaddedTable`] with `None` in unused
//! slots, and pick how `None` is written out through a [`NoDataPolicy`] only
//! when they export it.

use crate::core::ids::BAD_INDEX_VALUE;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::{fmt, str::FromStr};
use thiserror::Error;

// =============================================================================
// TYPE ALIASES
// =============================================================================

/// Hash map used for internal lookups keyed by small integers or id pairs.
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Hash set companion to [`FastHashMap`].
pub type FastHashSet<T> = FxHashSet<T>;

/// Stack-allocated buffer for short per-element lists.
///
/// Delaunay edges have at most two adjacent triangles and most nodes have
/// fewer than eight links, so the common cases never touch the heap.
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Error returned when a no-data policy name is not recognised.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown no-data policy {name:?}; expected one of \"-1\", \"bad_value\", \"nan\"")]
pub struct UnknownPolicyError {
    /// The rejected policy name.
    pub name: String,
}

// =============================================================================
// NO-DATA POLICY
// =============================================================================

/// How absent entries are written when a [`PaddedTable`] is exported.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoDataPolicy {
    /// Write `-1`.
    #[default]
    Sentinel,
    /// Write [`BAD_INDEX_VALUE`].
    BadIndex,
    /// Write NaN. Only meaningful for floating-point exports.
    Nan,
}

impl NoDataPolicy {
    /// Integer written for absent entries, or `None` for [`NoDataPolicy::Nan`].
    #[must_use]
    pub const fn integer_value(self) -> Option<i64> {
        match self {
            Self::Sentinel => Some(-1),
            Self::BadIndex => Some(BAD_INDEX_VALUE),
            Self::Nan => None,
        }
    }

    /// Floating-point value written for absent entries.
    #[must_use]
    pub fn float_value(self) -> f64 {
        match self {
            Self::Sentinel => -1.0,
            Self::BadIndex => f64::from(i32::MAX),
            Self::Nan => f64::NAN,
        }
    }
}

impl FromStr for NoDataPolicy {
    type Err = UnknownPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-1" => Ok(Self::Sentinel),
            "bad_value" => Ok(Self::BadIndex),
            "nan" => Ok(Self::Nan),
            other => Err(UnknownPolicyError {
                name: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for NoDataPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sentinel => "-1",
            Self::BadIndex => "bad_value",
            Self::Nan => "nan",
        };
        f.write_str(name)
    }
}

// =============================================================================
// RAGGED ARRAY
// =============================================================================

/// Compressed rows of varying length.
///
/// Row `i` occupies `values[offsets[i]..offsets[i + 1]]`.
///
/// # Examples
///
/// ```
/// use dualgrid::core::collections::RaggedArray;
///
/// let rows = RaggedArray::from_rows(vec![vec![1, 2], vec![], vec![3]]);
/// assert_eq!(rows.number_of_rows(), 3);
/// assert_eq!(rows.row(0), &[1, 2]);
/// assert!(rows.row(1).is_empty());
/// assert_eq!(rows.max_row_len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaggedArray<T> {
    offsets: Vec<usize>,
    values: Vec<T>,
}

impl<T> Default for RaggedArray<T> {
    fn default() -> Self {
        Self {
            offsets: vec![0],
            values: Vec::new(),
        }
    }
}

impl<T> RaggedArray<T> {
    /// Builds a ragged array from an iterator of rows.
    pub fn from_rows<I, R>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = T>,
    {
        let mut offsets = vec![0];
        let mut values = Vec::new();
        for row in rows {
            values.extend(row);
            offsets.push(values.len());
        }
        Self { offsets, values }
    }

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn number_of_rows(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Entries of row `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range.
    #[inline]
    #[must_use]
    pub fn row(&self, i: usize) -> &[T] {
        &self.values[self.offsets[i]..self.offsets[i + 1]]
    }

    /// Length of row `i`.
    #[inline]
    #[must_use]
    pub fn row_len(&self, i: usize) -> usize {
        self.offsets[i + 1] - self.offsets[i]
    }

    /// Iterates over all rows in order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[T]> + '_ {
        self.offsets
            .windows(2)
            .map(move |w| &self.values[w[0]..w[1]])
    }

    /// Length of the longest row, or 0 when there are no rows.
    #[must_use]
    pub fn max_row_len(&self) -> usize {
        self.offsets
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0)
    }

    /// Flat storage of every row, concatenated.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Row offsets into [`values`](Self::values); one longer than the row count.
    #[inline]
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }
}

impl<T: Copy> RaggedArray<T> {
    /// Pads every row to `width` slots with `None`.
    ///
    /// Rows longer than `width` are truncated; callers pass
    /// [`max_row_len`](Self::max_row_len) or wider.
    #[must_use]
    pub fn to_padded(&self, width: usize) -> PaddedTable<T> {
        let mut entries = Vec::with_capacity(self.number_of_rows() * width);
        for row in self.rows() {
            entries.extend(row.iter().take(width).map(|&v| Some(v)));
            entries.extend(std::iter::repeat_n(None, width.saturating_sub(row.len())));
        }
        PaddedTable {
            width,
            rows: self.number_of_rows(),
            entries,
        }
    }
}

// =============================================================================
// PADDED TABLE
// =============================================================================

/// Rectangular table whose unused slots are `None`.
///
/// Present entries are packed to the front of each row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddedTable<T> {
    width: usize,
    rows: usize,
    entries: Vec<Option<T>>,
}

impl<T: Copy> PaddedTable<T> {
    /// Builds a table from rows of present entries, padded to `width`.
    pub fn from_rows<I, R>(width: usize, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = T>,
    {
        RaggedArray::from_rows(rows).to_padded(width)
    }

    /// Number of slots per row.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn number_of_rows(&self) -> usize {
        self.rows
    }

    /// Slots of row `i`.
    #[inline]
    #[must_use]
    pub fn row(&self, i: usize) -> &[Option<T>] {
        &self.entries[i * self.width..(i + 1) * self.width]
    }

    /// Slot `(row, col)`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if col >= self.width {
            return None;
        }
        self.entries.get(row * self.width + col).copied().flatten()
    }

    /// Iterates over rows in order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[Option<T>]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// Row-major flat slots.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[Option<T>] {
        &self.entries
    }

    /// Row-major mask, `true` where the slot is absent.
    #[must_use]
    pub fn mask(&self) -> Vec<bool> {
        self.entries.iter().map(Option::is_none).collect()
    }
}

impl<T: Copy + Into<usize>> PaddedTable<T> {
    /// Row-major integer export with absent slots written as `nodata`.
    #[must_use]
    pub fn to_indices(&self, nodata: i64) -> Vec<i64> {
        self.entries
            .iter()
            .map(|slot| slot.map_or(nodata, |id| i64::try_from(id.into()).unwrap_or(nodata)))
            .collect()
    }

    /// Row-major floating-point export with absent slots written per `policy`.
    #[must_use]
    pub fn to_floats(&self, policy: NoDataPolicy) -> Vec<f64> {
        let nodata = policy.float_value();
        self.entries
            .iter()
            .map(|slot| {
                slot.map_or(nodata, |id| {
                    num_traits::cast::<usize, f64>(id.into()).unwrap_or(nodata)
                })
            })
            .collect()
    }
}
