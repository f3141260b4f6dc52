// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Spatial index for horizontal radius and nearest-point queries.
//!
//! Uses a grid-based spatial hash over `(x, y)`. Radius queries scan the
//! cells overlapping the query disk; nearest queries scan square rings of
//! cells outward from the query cell until no unvisited cell can hold a
//! closer point.

use microclimate_core::SpatialPoint;
use rustc_hash::FxHashMap;

/// A spatial hash grid over the horizontal positions of a point slice.
///
/// The index stores positions into the slice it was built from; queries take
/// the same slice back.
#[derive(Debug)]
pub struct PlanarIndex {
    cell_size: f64,
    grid: FxHashMap<(i64, i64), Vec<usize>>,
    extent: Option<CellExtent>,
}

impl PlanarIndex {
    /// Creates an empty index with the given cell size.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: cell_size.max(1e-9),
            grid: FxHashMap::default(),
            extent: None,
        }
    }

    /// Builds an index over all points.
    pub fn build(points: &[SpatialPoint], cell_size: f64) -> Self {
        let mut index = Self::new(cell_size);
        for (i, p) in points.iter().enumerate() {
            index.insert(i, p.x, p.y);
        }
        index
    }

    /// Inserts a point position at the given coordinates.
    pub fn insert(&mut self, position: usize, x: f64, y: f64) {
        let cell = self.cell_coords(x, y);
        match self.extent.as_mut() {
            Some(extent) => extent.include(cell),
            None => self.extent = Some(CellExtent::new(cell)),
        }
        self.grid.entry(cell).or_default().push(position);
    }

    /// Finds all points within `radius` (inclusive) of `(x, y)`.
    pub fn within_radius(
        &self,
        points: &[SpatialPoint],
        x: f64,
        y: f64,
        radius: f64,
    ) -> Vec<usize> {
        let Some(extent) = self.extent else {
            return Vec::new();
        };
        if !(radius >= 0.0) {
            return Vec::new();
        }

        let center = self.cell_coords(x, y);
        let (_, far) = extent.ring_span(center);
        let reach = self.ring_limit(radius, far) as i128;
        let (cx, cy) = (center.0 as i128, center.1 as i128);
        let xs = (cx - reach).max(extent.min.0 as i128)..=(cx + reach).min(extent.max.0 as i128);
        let ys = (cy - reach).max(extent.min.1 as i128)..=(cy + reach).min(extent.max.1 as i128);

        let radius_sq = radius * radius;
        let mut result = Vec::new();
        for gx in xs {
            for gy in ys.clone() {
                // Both coordinates lie inside the occupied extent
                let Some(positions) = self.grid.get(&(gx as i64, gy as i64)) else {
                    continue;
                };
                for &i in positions {
                    let p = &points[i];
                    let dist_sq = (p.x - x).powi(2) + (p.y - y).powi(2);
                    if dist_sq <= radius_sq {
                        result.push(i);
                    }
                }
            }
        }

        result
    }

    /// Finds the point nearest to `(x, y)` no further than `max_distance`.
    ///
    /// Returns the position and the horizontal distance. Ties go to the lower
    /// position so results do not depend on hash order. Only rings that
    /// intersect the occupied cells are scanned, so a huge `max_distance` or
    /// a far-off query costs no more than the extent of the data.
    pub fn nearest(
        &self,
        points: &[SpatialPoint],
        x: f64,
        y: f64,
        max_distance: f64,
    ) -> Option<(usize, f64)> {
        let extent = self.extent?;
        let center = self.cell_coords(x, y);
        let (near, far) = extent.ring_span(center);
        let last = self.ring_limit(max_distance, far).saturating_add(1).min(far);
        let mut best: Option<(usize, f64)> = None;

        for ring in near..=last {
            extent.visit_ring(center, ring, |cell| {
                let Some(positions) = self.grid.get(&cell) else {
                    return;
                };
                for &i in positions {
                    let p = &points[i];
                    let dist_sq = (p.x - x).powi(2) + (p.y - y).powi(2);
                    let better = match best {
                        None => true,
                        Some((bi, bd)) => dist_sq < bd || (dist_sq == bd && i < bi),
                    };
                    if better {
                        best = Some((i, dist_sq));
                    }
                }
            });

            // Cells beyond this ring are at least `ring * cell_size` away
            if let Some((_, bd)) = best {
                let reach = ring as f64 * self.cell_size;
                if bd < reach * reach {
                    break;
                }
            }
        }

        best.map(|(i, d)| (i, d.sqrt()))
            .filter(|&(_, d)| d <= max_distance)
    }

    /// Rings needed to cover `distance`, capped at `far`.
    fn ring_limit(&self, distance: f64, far: u64) -> u64 {
        let rings = (distance / self.cell_size).ceil();
        if rings >= far as f64 || rings.is_nan() {
            far
        } else {
            rings.max(0.0) as u64
        }
    }

    fn cell_coords(&self, x: f64, y: f64) -> (i64, i64) {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }
}

/// Bounding box of the occupied grid cells, inclusive.
#[derive(Debug, Clone, Copy)]
struct CellExtent {
    min: (i64, i64),
    max: (i64, i64),
}

impl CellExtent {
    fn new(cell: (i64, i64)) -> Self {
        Self { min: cell, max: cell }
    }

    fn include(&mut self, (x, y): (i64, i64)) {
        self.min = (self.min.0.min(x), self.min.1.min(y));
        self.max = (self.max.0.max(x), self.max.1.max(y));
    }

    /// Chebyshev ring distances from `cell` to the closest and the farthest
    /// occupied row or column.
    fn ring_span(&self, (cx, cy): (i64, i64)) -> (u64, u64) {
        let gap = |c: i64, lo: i64, hi: i64| {
            if c < lo {
                lo.abs_diff(c)
            } else if c > hi {
                c.abs_diff(hi)
            } else {
                0
            }
        };
        let near = gap(cx, self.min.0, self.max.0).max(gap(cy, self.min.1, self.max.1));
        let far = cx
            .abs_diff(self.min.0)
            .max(cx.abs_diff(self.max.0))
            .max(cy.abs_diff(self.min.1))
            .max(cy.abs_diff(self.max.1));
        (near, far)
    }

    /// Calls `visit` for every cell of the square ring at Chebyshev distance
    /// `ring` around `center` that falls inside the extent.
    fn visit_ring(&self, center: (i64, i64), ring: u64, mut visit: impl FnMut((i64, i64))) {
        let (cx, cy, r) = (center.0 as i128, center.1 as i128, ring as i128);
        let (x0, x1) = ((cx - r).max(self.min.0 as i128), (cx + r).min(self.max.0 as i128));
        let (y0, y1) = ((cy - r).max(self.min.1 as i128), (cy + r).min(self.max.1 as i128));
        if x0 > x1 || y0 > y1 {
            return;
        }

        let rows = [cy - r, cy + r];
        let row_count = if r == 0 { 1 } else { 2 };
        for &gy in rows[..row_count].iter().filter(|&&gy| (y0..=y1).contains(&gy)) {
            for gx in x0..=x1 {
                visit((gx as i64, gy as i64));
            }
        }
        for &gx in [cx - r, cx + r].iter().filter(|&&gx| r > 0 && (x0..=x1).contains(&gx)) {
            for gy in (cy - r + 1).max(y0)..=(cy + r - 1).min(y1) {
                visit((gx as i64, gy as i64));
            }
        }
    }
}
