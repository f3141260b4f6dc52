// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar polygons with holes

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Minimum area threshold - contours smaller than this are considered degenerate
pub const MIN_AREA_THRESHOLD: f64 = 1e-10;

/// A polygon in the horizontal plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon2D {
    /// Outer boundary (counter-clockwise, not closed)
    pub exterior: Vec<[f64; 2]>,
    /// Holes (clockwise, not closed)
    pub holes: Vec<Vec<[f64; 2]>>,
}

impl Polygon2D {
    /// Create a polygon without holes, normalising the winding.
    pub fn new(exterior: Vec<[f64; 2]>) -> Self {
        Self {
            exterior: ensure_ccw(exterior),
            holes: Vec::new(),
        }
    }

    /// Like [`Polygon2D::new`], but rejects rings that enclose no area.
    pub fn try_new(exterior: Vec<[f64; 2]>) -> Result<Self> {
        if !is_valid_contour(&exterior) {
            return Err(Error::InvalidPolygon(format!(
                "ring of {} vertices encloses no area",
                exterior.len()
            )));
        }
        Ok(Self::new(exterior))
    }

    pub fn with_holes(exterior: Vec<[f64; 2]>, holes: Vec<Vec<[f64; 2]>>) -> Self {
        Self {
            exterior: ensure_ccw(exterior),
            holes: holes.into_iter().map(ensure_cw).collect(),
        }
    }

    /// Area of the exterior minus the holes.
    pub fn area(&self) -> f64 {
        let holes: f64 = self.holes.iter().map(|h| signed_area(h).abs()).sum();
        signed_area(&self.exterior).abs() - holes
    }

    /// Even-odd containment test against exterior and holes.
    pub fn contains(&self, p: [f64; 2]) -> bool {
        point_in_contour(p, &self.exterior) && !self.holes.iter().any(|h| point_in_contour(p, h))
    }
}

/// Total area of a multi-part polygon.
pub fn multi_area(polygons: &[Polygon2D]) -> f64 {
    polygons.iter().map(Polygon2D::area).sum()
}

/// Compute the signed area of a 2D contour
/// Positive = counter-clockwise, Negative = clockwise
pub fn signed_area(contour: &[[f64; 2]]) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }

    let n = contour.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += contour[i][0] * contour[j][1];
        area -= contour[j][0] * contour[i][1];
    }

    area * 0.5
}

/// Check if a contour encloses a non-negligible area
pub fn is_valid_contour(contour: &[[f64; 2]]) -> bool {
    contour.len() >= 3 && signed_area(contour).abs() > MIN_AREA_THRESHOLD
}

/// Ensure contour has counter-clockwise winding (positive area)
pub fn ensure_ccw(mut contour: Vec<[f64; 2]>) -> Vec<[f64; 2]> {
    if signed_area(&contour) < 0.0 {
        contour.reverse();
    }
    contour
}

/// Ensure contour has clockwise winding (for holes)
pub fn ensure_cw(mut contour: Vec<[f64; 2]>) -> Vec<[f64; 2]> {
    if signed_area(&contour) > 0.0 {
        contour.reverse();
    }
    contour
}

/// Check if a point is inside a contour using ray casting
pub fn point_in_contour(point: [f64; 2], contour: &[[f64; 2]]) -> bool {
    if contour.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = contour.len();

    let mut j = n - 1;
    for i in 0..n {
        let pi = contour[i];
        let pj = contour[j];

        if ((pi[1] > point[1]) != (pj[1] > point[1]))
            && (point[0] < (pj[0] - pi[0]) * (point[1] - pi[1]) / (pj[1] - pi[1]) + pi[0])
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}
