// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry primitives: facet normals, planar distances, buffer tests and
//! bounding boxes.

use crate::error::{Error, Result};
use microclimate_core::Facet;
use nalgebra::{Point3, Vector3};

/// Relative threshold below which a cross product is treated as zero
const DEGENERATE_EPSILON: f64 = 1e-12;

/// Unit normal of a facet from its first three vertices.
///
/// `normalize((p2 - p1) × (p3 - p1))`. Collinear or coincident leading
/// vertices produce a [`Error::DegenerateGeometry`] instead of a NaN normal.
pub fn facet_normal(facet: &Facet) -> Result<Vector3<f64>> {
    let [a, b, c] = facet.leading_triangle();
    let p1 = Point3::new(a[0], a[1], a[2]);
    let p2 = Point3::new(b[0], b[1], b[2]);
    let p3 = Point3::new(c[0], c[1], c[2]);

    let edge1 = p2 - p1;
    let edge2 = p3 - p1;
    let cross = edge1.cross(&edge2);
    let norm = cross.norm();

    // Scale-aware: compare against the product of edge lengths
    let scale = edge1.norm() * edge2.norm();
    if scale == 0.0 || norm <= DEGENERATE_EPSILON * scale {
        return Err(Error::DegenerateGeometry {
            facet: facet.id,
            reason: "leading vertices are collinear or coincident".to_string(),
        });
    }

    Ok(cross / norm)
}

/// Horizontal Euclidean distance between two points.
#[inline]
pub fn planar_distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

/// Distance of a point from a slice origin, measured in the horizontal plane.
#[inline]
pub fn distance_from_origin(origin: [f64; 2], point: [f64; 2]) -> f64 {
    planar_distance(origin, point)
}

/// Shortest distance from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return planar_distance(p, a);
    }

    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len_sq).clamp(0.0, 1.0);
    planar_distance(p, [a[0] + t * dx, a[1] + t * dy])
}

/// Shortest distance from `p` to any segment of the polyline.
pub fn distance_to_polyline(p: [f64; 2], polyline: &[[f64; 2]]) -> f64 {
    match polyline {
        [] => f64::INFINITY,
        [only] => planar_distance(p, *only),
        _ => polyline
            .windows(2)
            .map(|w| distance_to_segment(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// True if `p` lies strictly inside the buffer of radius `radius` around the
/// polyline.
#[inline]
pub fn within_buffer(p: [f64; 2], polyline: &[[f64; 2]], radius: f64) -> bool {
    distance_to_polyline(p, polyline) < radius
}

/// Axis-aligned 2D bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2D {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Bounds2D {
    /// Bounds of the given points; `None` when there are none.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.update(p);
        }
        Some(bounds)
    }

    #[inline]
    pub fn update(&mut self, p: [f64; 2]) {
        self.min[0] = self.min[0].min(p[0]);
        self.min[1] = self.min[1].min(p[1]);
        self.max[0] = self.max[0].max(p[0]);
        self.max[1] = self.max[1].max(p[1]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn facet(vertices: [[f64; 3]; 3]) -> Facet {
        Facet::new(0, vertices).unwrap()
    }

    #[test]
    fn test_normal_of_horizontal_facet() {
        let n = facet_normal(&facet([[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])).unwrap();
        assert_eq!(n, Vector3::new(0.0, 0.0, 1.0));

        // Reversed winding flips the normal
        let n = facet_normal(&facet([[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]])).unwrap();
        assert_eq!(n, Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_normal_is_unit_length() {
        let n = facet_normal(&facet([[0.0, 0.0, 0.0], [4.0, 0.0, 1.0], [0.0, 3.0, 2.0]])).unwrap();
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_collinear_facet_is_degenerate() {
        let err = facet_normal(&facet([[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0]]))
            .unwrap_err();
        assert!(matches!(err, Error::DegenerateGeometry { facet: 0, .. }));

        let err = facet_normal(&facet([[1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [2.0, 0.0, 0.0]]))
            .unwrap_err();
        assert!(matches!(err, Error::DegenerateGeometry { .. }));
    }

    #[test]
    fn test_distance_to_polyline() {
        let line = [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]];
        assert_relative_eq!(distance_to_polyline([5.0, 2.0], &line), 2.0);
        assert_relative_eq!(distance_to_polyline([12.0, 5.0], &line), 2.0);
        assert_relative_eq!(distance_to_polyline([-3.0, -4.0], &line), 5.0);
    }

    #[test]
    fn test_within_buffer_is_strict() {
        let line = [[0.0, 0.0], [10.0, 0.0]];
        assert!(within_buffer([5.0, 0.5], &line, 1.0));
        assert!(!within_buffer([5.0, 1.0], &line, 1.0));
    }

    #[test]
    fn test_bounds() {
        let bounds = Bounds2D::from_points([[1.0, 5.0], [-2.0, 3.0], [4.0, 4.0]]).unwrap();
        assert_eq!(bounds.min, [-2.0, 3.0]);
        assert_eq!(bounds.max, [4.0, 5.0]);
        assert!(Bounds2D::from_points(Vec::<[f64; 2]>::new()).is_none());
    }
}
