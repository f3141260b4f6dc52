// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D Boolean Operations for Footprint Dissolve
//!
//! This module merges facet footprints into (multi-part) polygons using the
//! i_overlay crate, and inflates footprints by a small buffer so adjoining
//! wall triangles, whose footprints are degenerate slivers, close into
//! connected outlines.

use crate::polygon::{ensure_ccw, is_valid_contour, Polygon2D};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;

/// Edges shorter than this contribute no buffer rectangle
const EPSILON_2D: f64 = 1e-12;

/// Union all contours into one (possibly multi-part) polygon.
///
/// Contours are normalised to counter-clockwise winding and combined with the
/// non-zero fill rule, so overlapping inputs merge instead of cancelling.
/// Contours without area are ignored.
pub fn dissolve(contours: &[Vec<[f64; 2]>]) -> Vec<Polygon2D> {
    let subject: Vec<Vec<[f64; 2]>> = contours
        .iter()
        .filter(|c| is_valid_contour(c))
        .map(|c| ensure_ccw(c.clone()))
        .collect();

    if subject.is_empty() {
        return Vec::new();
    }

    let clip: Vec<Vec<[f64; 2]>> = Vec::new();

    // Result is Vec<Vec<Vec<[f64; 2]>>> - Vec of shapes, each shape is Vec of contours
    let shapes = subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero);

    shapes_to_polygons(shapes)
}

/// Inflate a footprint by `radius`.
///
/// Returns the footprint itself (when it has area) plus one rectangle per edge
/// extended by `radius` on every side. The union of the parts covers the
/// Minkowski sum of the footprint with a disk of `radius`, overshooting only at
/// the square corners.
pub fn buffer_footprint(footprint: &[[f64; 2]], radius: f64) -> Vec<Vec<[f64; 2]>> {
    let mut parts = Vec::with_capacity(footprint.len() + 1);

    if is_valid_contour(footprint) {
        parts.push(ensure_ccw(footprint.to_vec()));
    }

    let n = footprint.len();
    for i in 0..n {
        let a = footprint[i];
        let b = footprint[(i + 1) % n];
        let dx = b[0] - a[0];
        let dy = b[1] - a[1];
        let len = dx.hypot(dy);
        if len <= EPSILON_2D {
            continue;
        }

        // Along-edge and left-normal offsets, both of length `radius`
        let (ux, uy) = (dx / len * radius, dy / len * radius);
        let (nx, ny) = (-uy, ux);

        parts.push(vec![
            [a[0] - ux - nx, a[1] - uy - ny],
            [b[0] + ux - nx, b[1] + uy - ny],
            [b[0] + ux + nx, b[1] + uy + ny],
            [a[0] - ux + nx, a[1] - uy + ny],
        ]);
    }

    // A footprint collapsed to a single point still gets a square
    if parts.is_empty() {
        if let Some(p) = footprint.first() {
            parts.push(vec![
                [p[0] - radius, p[1] - radius],
                [p[0] + radius, p[1] - radius],
                [p[0] + radius, p[1] + radius],
                [p[0] - radius, p[1] + radius],
            ]);
        }
    }

    parts
}

/// Convert i_overlay result shapes to polygons
///
/// i_overlay returns Vec<Vec<Vec<[f64; 2]>>> where:
/// - Outer Vec: list of shapes
/// - Middle Vec: list of contours per shape (first is outer, rest are holes)
/// - Inner Vec: list of points per contour
fn shapes_to_polygons(shapes: Vec<Vec<Vec<[f64; 2]>>>) -> Vec<Polygon2D> {
    shapes
        .into_iter()
        .filter_map(|shape| {
            let mut contours = shape.into_iter();
            let exterior = contours.next()?;
            if !is_valid_contour(&exterior) {
                return None;
            }
            let holes = contours.filter(|h| is_valid_contour(h)).collect();
            Some(Polygon2D::with_holes(exterior, holes))
        })
        .collect()
}
