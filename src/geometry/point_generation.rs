//! Generators for common node layouts.
//!
//! Every generator returns plain `[x, y]` coordinates in no particular order;
//! the grid sorts nodes itself. Feed the result to
//! [`VoronoiDelaunayGrid::from_points`](crate::core::grid::VoronoiDelaunayGrid::from_points).

use crate::geometry::measures::distance;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;
use thiserror::Error;

/// Default cap on the number of points a single generator call may produce.
///
/// Override with the `DUALGRID_MAX_GENERATED_POINTS` environment variable.
const MAX_GENERATED_POINTS_DEFAULT: usize = 50_000_000;

fn max_generated_points() -> usize {
    if let Ok(v) = std::env::var("DUALGRID_MAX_GENERATED_POINTS")
        && let Ok(n) = v.parse::<usize>()
    {
        return n;
    }
    MAX_GENERATED_POINTS_DEFAULT
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the point generators.
#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum PointGenerationError {
    /// A count parameter was zero.
    #[error("{what} must be positive")]
    ZeroCount {
        /// Name of the offending parameter.
        what: &'static str,
    },
    /// Spacing was not a positive finite number.
    #[error("spacing must be positive and finite, got {spacing}")]
    InvalidSpacing {
        /// The rejected spacing.
        spacing: f64,
    },
    /// A coordinate range was empty or non-finite.
    #[error("invalid range [{min}, {max})")]
    InvalidRange {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// The request would exceed the point safety cap.
    #[error("requested {requested} points, more than the cap of {cap}")]
    TooManyPoints {
        /// Number of points requested.
        requested: usize,
        /// Active cap.
        cap: usize,
    },
}

fn check_spacing(spacing: f64) -> Result<(), PointGenerationError> {
    if spacing > 0.0 && spacing.is_finite() {
        Ok(())
    } else {
        Err(PointGenerationError::InvalidSpacing { spacing })
    }
}

fn check_count(requested: usize) -> Result<(), PointGenerationError> {
    let cap = max_generated_points();
    if requested > cap {
        return Err(PointGenerationError::TooManyPoints { requested, cap });
    }
    Ok(())
}

#[inline]
fn as_f64(n: usize) -> f64 {
    num_traits::cast(n).unwrap_or(f64::NAN)
}

/// Rectangular lattice with `shape = (rows, columns)` and equal spacing,
/// lower-left node at the origin.
///
/// # Errors
///
/// Returns [`PointGenerationError`] for zero dimensions, bad spacing, or a
/// request over the safety cap.
///
/// # Examples
///
/// ```
/// use dualgrid::geometry::point_generation::rectangular_lattice;
///
/// let points = rectangular_lattice((3, 4), 1.0).unwrap();
/// assert_eq!(points.len(), 12);
/// assert_eq!(points[5], [1.0, 1.0]);
/// ```
pub fn rectangular_lattice(
    shape: (usize, usize),
    spacing: f64,
) -> Result<Vec<[f64; 2]>, PointGenerationError> {
    let (rows, cols) = shape;
    if rows == 0 {
        return Err(PointGenerationError::ZeroCount { what: "rows" });
    }
    if cols == 0 {
        return Err(PointGenerationError::ZeroCount { what: "columns" });
    }
    check_spacing(spacing)?;
    check_count(rows.saturating_mul(cols))?;

    Ok((0..rows)
        .flat_map(|r| (0..cols).map(move |c| [as_f64(c) * spacing, as_f64(r) * spacing]))
        .collect())
}

/// Hexagon-shaped patch of a triangular lattice.
///
/// The bottom and top rows hold `base_num_cols` nodes; each row towards the
/// middle gains one node, shifted half a spacing to the left. Rows are
/// `spacing * sqrt(3) / 2` apart.
///
/// # Errors
///
/// Returns [`PointGenerationError`] for zero dimensions, bad spacing, or a
/// request over the safety cap.
///
/// # Examples
///
/// ```
/// use dualgrid::geometry::point_generation::hex_points;
///
/// let points = hex_points(3, 2, 1.0).unwrap();
/// assert_eq!(points.len(), 7);
/// ```
pub fn hex_points(
    num_rows: usize,
    base_num_cols: usize,
    spacing: f64,
) -> Result<Vec<[f64; 2]>, PointGenerationError> {
    if num_rows == 0 {
        return Err(PointGenerationError::ZeroCount { what: "rows" });
    }
    if base_num_cols == 0 {
        return Err(PointGenerationError::ZeroCount { what: "columns" });
    }
    check_spacing(spacing)?;
    let growth = |r: usize| r.min(num_rows - 1 - r);
    check_count((0..num_rows).map(|r| base_num_cols + growth(r)).sum())?;

    let dy = spacing * 3.0_f64.sqrt() / 2.0;
    let mut points = Vec::new();
    for r in 0..num_rows {
        let shift = -0.5 * spacing * as_f64(growth(r));
        let y = as_f64(r) * dy;
        points.extend((0..base_num_cols + growth(r)).map(|c| [shift + as_f64(c) * spacing, y]));
    }
    Ok(points)
}

/// Shell structure of a set of concentric rings around a center node.
///
/// Shell `i` (1-based) has radius `i * shell_spacing` and `round(2 * PI * i)`
/// nodes. Rings are rotated by a shell-dependent offset so that nodes of
/// neighbouring shells do not line up.
///
/// # Examples
///
/// ```
/// use dualgrid::geometry::point_generation::RadialLayout;
///
/// let layout = RadialLayout::new(2, 1.5, [0.0, 0.0]).unwrap();
/// assert_eq!(layout.number_of_nodes_in_shell(), &[6, 13]);
/// assert_eq!(layout.radius_to_shell(), vec![1.5, 3.0]);
/// assert_eq!(layout.number_of_points(), 20);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RadialLayout {
    center: [f64; 2],
    shell_spacing: f64,
    number_of_nodes_in_shell: Vec<usize>,
}

impl RadialLayout {
    /// Lays out `num_shells` shells `spacing` apart around `center`.
    ///
    /// # Errors
    ///
    /// Returns [`PointGenerationError`] for zero shells, bad spacing, or a
    /// request over the safety cap.
    pub fn new(
        num_shells: usize,
        spacing: f64,
        center: [f64; 2],
    ) -> Result<Self, PointGenerationError> {
        if num_shells == 0 {
            return Err(PointGenerationError::ZeroCount { what: "shells" });
        }
        check_spacing(spacing)?;
        let number_of_nodes_in_shell: Vec<usize> = (1..=num_shells)
            .map(|i| num_traits::cast((TAU * as_f64(i)).round()).unwrap_or(usize::MAX))
            .collect();
        let total = number_of_nodes_in_shell
            .iter()
            .try_fold(1_usize, |acc, &n| acc.checked_add(n))
            .unwrap_or(usize::MAX);
        check_count(total)?;
        Ok(Self {
            center,
            shell_spacing: spacing,
            number_of_nodes_in_shell,
        })
    }

    /// Center node position.
    #[must_use]
    pub const fn center(&self) -> [f64; 2] {
        self.center
    }

    /// Number of shells, not counting the center node.
    #[must_use]
    pub fn number_of_shells(&self) -> usize {
        self.number_of_nodes_in_shell.len()
    }

    /// Distance between neighbouring shells.
    #[must_use]
    pub const fn shell_spacing(&self) -> f64 {
        self.shell_spacing
    }

    /// Nodes on each shell, innermost first.
    #[must_use]
    pub fn number_of_nodes_in_shell(&self) -> &[usize] {
        &self.number_of_nodes_in_shell
    }

    /// Distance from the center to each shell, innermost first.
    #[must_use]
    pub fn radius_to_shell(&self) -> Vec<f64> {
        (1..=self.number_of_shells())
            .map(|i| as_f64(i) * self.shell_spacing)
            .collect()
    }

    /// Total node count, center included.
    #[must_use]
    pub fn number_of_points(&self) -> usize {
        1 + self.number_of_nodes_in_shell.iter().sum::<usize>()
    }

    /// Coordinates of every node, center first, then shell by shell.
    #[must_use]
    pub fn points(&self) -> Vec<[f64; 2]> {
        let mut points = Vec::with_capacity(self.number_of_points());
        points.push(self.center);
        for (i, (&count, radius)) in self
            .number_of_nodes_in_shell
            .iter()
            .zip(self.radius_to_shell())
            .enumerate()
        {
            let dtheta = TAU / as_f64(count);
            let offset = dtheta / as_f64(i + 2);
            points.extend((0..count).map(|k| {
                let theta = dtheta.mul_add(as_f64(k), offset);
                [
                    radius.mul_add(theta.cos(), self.center[0]),
                    radius.mul_add(theta.sin(), self.center[1]),
                ]
            }));
        }
        points
    }

    /// Shell radius of each node in `xy_of_node`, 0 for the center.
    ///
    /// Works in whatever order the nodes are given, so it accepts the
    /// row-major order of a grid built from [`points`](Self::points).
    #[must_use]
    pub fn radius_at_node(&self, xy_of_node: &[[f64; 2]]) -> Vec<f64> {
        xy_of_node
            .iter()
            .map(|&xy| {
                let shell = (distance(xy, self.center) / self.shell_spacing).round();
                shell * self.shell_spacing
            })
            .collect()
    }
}

/// Concentric rings of nodes around `center`, plus the center itself; see
/// [`RadialLayout`].
///
/// # Errors
///
/// Returns [`PointGenerationError`] for zero shells, bad spacing, or a request
/// over the safety cap.
///
/// # Examples
///
/// ```
/// use dualgrid::geometry::point_generation::radial_points;
///
/// assert_eq!(radial_points(1, 1.0, [0.0, 0.0]).unwrap().len(), 7);
/// assert_eq!(radial_points(2, 1.0, [0.0, 0.0]).unwrap().len(), 20);
/// ```
pub fn radial_points(
    num_shells: usize,
    spacing: f64,
    center: [f64; 2],
) -> Result<Vec<[f64; 2]>, PointGenerationError> {
    Ok(RadialLayout::new(num_shells, spacing, center)?.points())
}

/// Uniformly scattered points in `[x_range.0, x_range.1) x [y_range.0, y_range.1)`
/// from a seeded generator.
///
/// # Errors
///
/// Returns [`PointGenerationError`] for a zero count, an empty or non-finite
/// range, or a request over the safety cap.
pub fn random_points_seeded(
    n_points: usize,
    x_range: (f64, f64),
    y_range: (f64, f64),
    seed: u64,
) -> Result<Vec<[f64; 2]>, PointGenerationError> {
    if n_points == 0 {
        return Err(PointGenerationError::ZeroCount { what: "n_points" });
    }
    for (min, max) in [x_range, y_range] {
        if !(min < max && min.is_finite() && max.is_finite()) {
            return Err(PointGenerationError::InvalidRange { min, max });
        }
    }
    check_count(n_points)?;

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    Ok((0..n_points)
        .map(|_| {
            [
                rng.random_range(x_range.0..x_range.1),
                rng.random_range(y_range.0..y_range.1),
            ]
        })
        .collect())
}
