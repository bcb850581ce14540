//! Planar measures: lengths, areas, orientations and plane fits.

use std::f64::consts::{FRAC_PI_4, PI, TAU};

/// Euclidean distance between two points.
#[inline]
#[must_use]
pub fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (b[0] - a[0]).hypot(b[1] - a[1])
}

/// Twice the signed area of triangle `(o, a, b)`.
///
/// Positive when the points turn counter-clockwise.
#[inline]
#[must_use]
pub fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]).mul_add(b[1] - o[1], -((a[1] - o[1]) * (b[0] - o[0])))
}

/// Area of a simple polygon given by its vertices in ring order.
///
/// The ring may be clockwise or counter-clockwise; fewer than three vertices
/// yield zero.
///
/// # Examples
///
/// ```
/// use dualgrid::geometry::measures::polygon_area;
///
/// let square = [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]];
/// assert!((polygon_area(&square) - 4.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn polygon_area(ring: &[[f64; 2]]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let twice: f64 = ring
        .iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(p, q)| p[0].mul_add(q[1], -(q[0] * p[1])))
        .sum();
    0.5 * twice.abs()
}

/// Angle of the vector `(dx, dy)` measured clockwise from north, shifted by
/// 45 degrees and wrapped into `[-PI, PI)`.
///
/// A link whose vector has a negative shifted angle points into the lower-left
/// half-plane and is flipped by link reorientation.
#[must_use]
pub fn shifted_angle_from_north(dx: f64, dy: f64) -> f64 {
    let angle = dx.atan2(dy) + FRAC_PI_4;
    if angle >= PI { angle - TAU } else { angle }
}

/// Returns `true` when a link from `tail` to `head` should be flipped so that
/// it points up and to the right.
///
/// Links within `[-45, 135)` degrees clockwise of north keep their direction,
/// the window where [`shifted_angle_from_north`] is non-negative. The test
/// uses the sign of `dx + dy` instead of the angle so that a link and its
/// reverse always get opposite answers; rounding in `atan2` near the window
/// edges could otherwise flip a link twice.
#[inline]
#[must_use]
pub fn needs_reorientation(tail: [f64; 2], head: [f64; 2]) -> bool {
    let (dx, dy) = (head[0] - tail[0], head[1] - tail[1]);
    let along = dx + dy;
    along < 0.0 || (along == 0.0 && dy < 0.0)
}

/// Gradient `(dz/dx, dz/dy)` of the plane through three points.
///
/// Returns `None` when the triangle is degenerate.
#[must_use]
pub fn plane_gradient(points: [[f64; 2]; 3], z: [f64; 3]) -> Option<[f64; 2]> {
    let [p0, p1, p2] = points;
    let (dx1, dy1, dz1) = (p1[0] - p0[0], p1[1] - p0[1], z[1] - z[0]);
    let (dx2, dy2, dz2) = (p2[0] - p0[0], p2[1] - p0[1], z[2] - z[0]);
    let det = dx1.mul_add(dy2, -(dy1 * dx2));
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    let gx = dz1.mul_add(dy2, -(dy1 * dz2)) / det;
    let gy = dx1.mul_add(dz2, -(dz1 * dx2)) / det;
    Some([gx, gy])
}
