//! Canonical row-major ordering of points and links.
//!
//! Nodes are numbered bottom row first, left to right within a row: the
//! primary key is `y`, ties are broken by `x`. Links use the same key applied
//! to their midpoints. Sorting is stable, so exactly coincident keys keep their
//! input order.

use std::cmp::Ordering;

/// Compares two points by `y`, then `x`.
///
/// Coordinates are assumed finite; `-0.0` and `0.0` compare equal.
#[inline]
#[must_use]
pub fn compare_row_major(a: [f64; 2], b: [f64; 2]) -> Ordering {
    a[1].partial_cmp(&b[1])
        .unwrap_or(Ordering::Equal)
        .then_with(|| a[0].partial_cmp(&b[0]).unwrap_or(Ordering::Equal))
}

/// Returns the permutation that sorts `points` into row-major order.
///
/// # Examples
///
/// ```
/// use dualgrid::geometry::sorting::argsort_points_by_x_then_y;
///
/// let points = [[1.0, 1.0], [0.0, 1.0], [5.0, 0.0]];
/// assert_eq!(argsort_points_by_x_then_y(&points), vec![2, 1, 0]);
/// ```
#[must_use]
pub fn argsort_points_by_x_then_y(points: &[[f64; 2]]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| compare_row_major(points[a], points[b]));
    order
}

/// Returns a row-major sorted copy of `points`.
#[must_use]
pub fn sort_points_by_x_then_y(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    argsort_points_by_x_then_y(points)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// Returns the permutation that sorts node pairs by the row-major order of
/// their midpoints, breaking exact ties by `(min node, max node)`.
#[must_use]
pub fn argsort_links_by_midpoint(points: &[[f64; 2]], node_pairs: &[[usize; 2]]) -> Vec<usize> {
    let midpoint = |[a, b]: [usize; 2]| {
        [
            0.5 * (points[a][0] + points[b][0]),
            0.5 * (points[a][1] + points[b][1]),
        ]
    };
    let key = |[a, b]: [usize; 2]| (a.min(b), a.max(b));

    let mut order: Vec<usize> = (0..node_pairs.len()).collect();
    order.sort_by(|&i, &j| {
        compare_row_major(midpoint(node_pairs[i]), midpoint(node_pairs[j]))
            .then_with(|| key(node_pairs[i]).cmp(&key(node_pairs[j])))
    });
    order
}
